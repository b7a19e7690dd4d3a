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

use crate::resource::ResourceDescriptor;
use crate::store::{ProcedureConnection, StoreError};
use serde_json::Value;
use std::fmt;

/// Mutation capabilities encoded in the stored admin bitmask. The two
/// bit positions are a persisted contract; any further bits in a mask
/// are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Create,
    Delete,
}

impl Capability {
    const fn mask(self) -> i64 {
        match self {
            Self::Create => 0b10,
            Self::Delete => 0b01,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Create => "create",
            Self::Delete => "delete",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Permissions {
    pub can_create: bool,
    pub can_delete: bool,
}

impl Permissions {
    pub const fn from_mask(mask: i64) -> Self {
        Self {
            can_create: mask & Capability::Create.mask() != 0,
            can_delete: mask & Capability::Delete.mask() != 0,
        }
    }

    pub const fn allows(&self, capability: Capability) -> bool {
        match capability {
            Capability::Create => self.can_create,
            Capability::Delete => self.can_delete,
        }
    }
}

/// Resolves an admin identifier to decoded permissions through the
/// admin resource's lookup procedure, on the caller's connection.
pub struct PermissionGate<'a> {
    admin: &'a ResourceDescriptor,
}

impl<'a> PermissionGate<'a> {
    pub fn new(admin: &'a ResourceDescriptor) -> Self {
        Self { admin }
    }

    /// `None` when the identifier matches no admin record. A record
    /// with a missing or non-integer mask decodes as no permissions.
    pub async fn resolve(
        &self,
        conn: &mut (dyn ProcedureConnection + '_),
        admin_id: i64,
    ) -> Result<Option<Permissions>, StoreError> {
        let result = conn
            .invoke(self.admin.family().get(), &[Value::from(admin_id)])
            .await?;
        let Some(record) = result.one(0) else {
            return Ok(None);
        };
        let mask = record
            .get("permissions")
            .and_then(Value::as_i64)
            .unwrap_or(0);
        Ok(Some(Permissions::from_mask(mask)))
    }
}
