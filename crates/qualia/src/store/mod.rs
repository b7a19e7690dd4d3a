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

pub mod memory;
pub mod mysql;
mod result;

pub use memory::MemoryStore;
pub use mysql::MySqlStore;
pub use result::ProcedureResult;

use crate::config::{Backend, DatabaseConfig};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("procedure call failed: {0}")]
    Procedure(String),
    #[error("unknown procedure: {0}")]
    UnknownProcedure(String),
}

/// Hands out one connection per unit of work. There is no pooling:
/// every request connects, runs its calls sequentially, and drops the
/// connection on every exit path.
#[async_trait]
pub trait ProcedureStore: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn ProcedureConnection>, StoreError>;
}

/// One exclusively owned connection. The single operation invokes a
/// named procedure with positional arguments and returns the
/// normalised tabular result. "No rows", "no headers" and "no further
/// result sets" are successful outcomes here, never errors.
#[async_trait]
pub trait ProcedureConnection: Send {
    async fn invoke(&mut self, name: &str, args: &[Value]) -> Result<ProcedureResult, StoreError>;
}

pub fn open(config: &DatabaseConfig) -> Arc<dyn ProcedureStore> {
    match config.backend {
        Backend::Memory => Arc::new(MemoryStore::seeded()),
        Backend::Mysql => Arc::new(MySqlStore::new(config)),
    }
}
