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
use crate::permission::{Capability, PermissionGate};
use crate::registry::registry;
use crate::resource::ResourceDescriptor;
use crate::store::ProcedureConnection;
use serde_json::{Map, Value};

/// Runs the canonical CRUD family for one resource over a single
/// borrowed connection. Mutations are authorised before any procedure
/// runs, so a forbidden request never reaches the store.
pub struct ResourceExecutor<'a> {
    resource: &'a ResourceDescriptor,
    conn: &'a mut (dyn ProcedureConnection + 'a),
}

impl<'a> ResourceExecutor<'a> {
    pub fn new(
        resource: &'a ResourceDescriptor,
        conn: &'a mut (dyn ProcedureConnection + 'a),
    ) -> Self {
        Self { resource, conn }
    }

    /// All key values, in the store's order. An empty collection is a
    /// valid answer, not an error.
    pub async fn list_keys(&mut self) -> Result<Vec<Value>, ApiError> {
        let result = self.conn.invoke(self.resource.family().list(), &[]).await?;
        Ok(result.vertical(0))
    }

    /// One full record woven from headers, or `None` when absent.
    pub async fn get(&mut self, key: &Value) -> Result<Option<Map<String, Value>>, ApiError> {
        let result = self
            .conn
            .invoke(self.resource.family().get(), std::slice::from_ref(key))
            .await?;
        Ok(result.one(0))
    }

    /// Upsert keyed on the path key. The body must supply every
    /// non-key attribute; extras are ignored.
    pub async fn put(
        &mut self,
        key: &Value,
        attrs: Option<&Map<String, Value>>,
        admin: Option<i64>,
    ) -> Result<(), ApiError> {
        self.check(admin, Capability::Create).await?;
        let args = self.put_arguments(key, attrs)?;
        self.conn.invoke(self.resource.family().put(), &args).await?;
        Ok(())
    }

    /// Idempotent delete by key.
    pub async fn delete(&mut self, key: &Value, admin: Option<i64>) -> Result<(), ApiError> {
        self.check(admin, Capability::Delete).await?;
        self.conn
            .invoke(self.resource.family().delete(), std::slice::from_ref(key))
            .await?;
        Ok(())
    }

    fn put_arguments(
        &self,
        key: &Value,
        attrs: Option<&Map<String, Value>>,
    ) -> Result<Vec<Value>, ApiError> {
        let others = self.resource.others();
        let mut args = Vec::with_capacity(others.len() + 1);
        args.push(key.clone());
        if others.is_empty() {
            return Ok(args);
        }
        let Some(attrs) = attrs else {
            return Err(ApiError::Validation(format!(
                "{} requires an attribute body",
                self.resource.name()
            )));
        };
        for name in others {
            let value = attrs
                .get(*name)
                .ok_or_else(|| ApiError::Validation(format!("missing attribute {name}")))?;
            args.push(value.clone());
        }
        Ok(args)
    }

    async fn check(&mut self, admin: Option<i64>, capability: Capability) -> Result<(), ApiError> {
        if !self.resource.gated() {
            return Ok(());
        }
        authorise(&mut *self.conn, admin, capability).await
    }
}

/// Shared gate check for gated mutations. Runs the admin lookup on the
/// same connection the mutation would use.
pub(crate) async fn authorise(
    conn: &mut (dyn ProcedureConnection + '_),
    admin: Option<i64>,
    capability: Capability,
) -> Result<(), ApiError> {
    let Some(admin_id) = admin else {
        return Err(ApiError::Forbidden("admin identifier required".to_string()));
    };
    let gate = PermissionGate::new(registry().admin());
    let Some(permissions) = gate.resolve(conn, admin_id).await? else {
        return Err(ApiError::Forbidden(format!("unknown admin {admin_id}")));
    };
    if permissions.allows(capability) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(format!(
            "admin {admin_id} lacks the {capability} permission"
        )))
    }
}
