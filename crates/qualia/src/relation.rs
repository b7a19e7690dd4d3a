// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

use crate::error::ApiError;
use crate::executor::authorise;
use crate::permission::Capability;
use crate::resource::{RelationFamily, ResourceDescriptor};
use crate::store::ProcedureConnection;
use serde_json::{Map, Value};

/// Executes the many-to-many "affects" family linking a quale to
/// moods. Construction fails for resources without a relation, so the
/// dispatch below can assume one exists.
pub struct RelationExecutor<'a> {
    resource: &'a ResourceDescriptor,
    relation: &'a RelationFamily,
    conn: &'a mut (dyn ProcedureConnection + 'a),
}

impl<'a> RelationExecutor<'a> {
    pub fn new(
        resource: &'a ResourceDescriptor,
        conn: &'a mut (dyn ProcedureConnection + 'a),
    ) -> Option<Self> {
        let relation = resource.relation()?;
        Some(Self {
            resource,
            relation,
            conn,
        })
    }

    /// Four-way dispatch on which filters are present. Subject and
    /// mood together select the combined variant, never two calls.
    pub async fn query(
        &mut self,
        subject: Option<&Value>,
        mood: Option<&Value>,
    ) -> Result<Vec<Map<String, Value>>, ApiError> {
        let result = match (subject, mood) {
            (Some(subject), Some(mood)) => {
                self.conn
                    .invoke(
                        self.relation.query_both(),
                        &[subject.clone(), mood.clone()],
                    )
                    .await?
            }
            (Some(subject), None) => {
                self.conn
                    .invoke(self.relation.query_subject(), std::slice::from_ref(subject))
                    .await?
            }
            (None, Some(mood)) => {
                self.conn
                    .invoke(self.relation.query_mood(), std::slice::from_ref(mood))
                    .await?
            }
            (None, None) => self.conn.invoke(self.relation.query_all(), &[]).await?,
        };
        Ok(result.all())
    }

    /// Links a quale value to a mood. Connection creation is open to
    /// survey respondents and therefore not permission-gated.
    pub async fn create(&mut self, subject: &Value, mood: &Value) -> Result<(), ApiError> {
        self.conn
            .invoke(self.relation.create(), &[subject.clone(), mood.clone()])
            .await?;
        Ok(())
    }

    /// Unlinks a pair. Gated the same way as a resource delete.
    pub async fn delete(
        &mut self,
        subject: &Value,
        mood: &Value,
        admin: Option<i64>,
    ) -> Result<(), ApiError> {
        if self.resource.gated() {
            authorise(&mut *self.conn, admin, Capability::Delete).await?;
        }
        self.conn
            .invoke(self.relation.delete(), &[subject.clone(), mood.clone()])
            .await?;
        Ok(())
    }
}
