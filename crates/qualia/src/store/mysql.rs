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

use super::{ProcedureConnection, ProcedureResult, ProcedureStore, StoreError};
use crate::config::DatabaseConfig;
use async_trait::async_trait;
use futures::TryStreamExt;
use serde_json::{Number, Value};
use sqlx::mysql::{MySqlArguments, MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::query::Query;
use sqlx::{Column, ConnectOptions, Either, MySql, Row, TypeInfo, ValueRef};
use tracing::debug;

/// MySQL-backed procedure store. Holds connect options only; each
/// `connect` opens a fresh connection so requests never share one.
pub struct MySqlStore {
    options: MySqlConnectOptions,
}

impl MySqlStore {
    pub fn new(config: &DatabaseConfig) -> Self {
        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.database);
        Self { options }
    }
}

#[async_trait]
impl ProcedureStore for MySqlStore {
    async fn connect(&self) -> Result<Box<dyn ProcedureConnection>, StoreError> {
        let conn = self
            .options
            .connect()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(Box::new(MySqlProcedureConnection { conn }))
    }
}

struct MySqlProcedureConnection {
    conn: MySqlConnection,
}

#[async_trait]
impl ProcedureConnection for MySqlProcedureConnection {
    /// Runs `CALL name(?, ...)` and folds the multi-result-set stream
    /// into one `ProcedureResult`. The first result set supplies headers
    /// and rows; later sets (procedures emit a trailing status set) are
    /// drained so the connection is left clean. Column metadata only
    /// arrives with rows, so an empty first set leaves the headers
    /// empty too; zero rows project to nothing either way. Autocommit
    /// is on, so each invocation is its own committed unit of work.
    async fn invoke(&mut self, name: &str, args: &[Value]) -> Result<ProcedureResult, StoreError> {
        let statement = call_statement(name, args.len());
        debug!(procedure = name, arity = args.len(), "invoking procedure");

        let mut query = sqlx::query(&statement);
        for arg in args {
            query = bind_argument(query, arg);
        }

        let mut headers: Vec<String> = Vec::new();
        let mut rows: Vec<Vec<Value>> = Vec::new();
        let mut generated_key = None;
        let mut first_set_open = true;

        // An exhausted stream is the end-of-results signal, so no
        // sentinel error needs swallowing here.
        let mut results = query.fetch_many(&mut self.conn);
        while let Some(step) = results
            .try_next()
            .await
            .map_err(|e| StoreError::Procedure(e.to_string()))?
        {
            match step {
                Either::Left(done) => {
                    if done.last_insert_id() != 0 {
                        generated_key = Some(done.last_insert_id());
                    }
                    first_set_open = false;
                }
                Either::Right(row) => {
                    if first_set_open {
                        if headers.is_empty() {
                            headers = row
                                .columns()
                                .iter()
                                .map(|column| column.name().to_string())
                                .collect();
                        }
                        rows.push(decode_row(&row)?);
                    }
                }
            }
        }

        Ok(ProcedureResult::new(headers, rows, generated_key))
    }
}

fn call_statement(name: &str, arity: usize) -> String {
    let placeholders = vec!["?"; arity].join(", ");
    format!("CALL {name}({placeholders})")
}

fn bind_argument<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    value: &'q Value,
) -> Query<'q, MySql, MySqlArguments> {
    match value {
        Value::Null => query.bind(Option::<String>::None),
        Value::Bool(flag) => query.bind(*flag),
        Value::Number(number) => {
            if let Some(int) = number.as_i64() {
                query.bind(int)
            } else if let Some(float) = number.as_f64() {
                query.bind(float)
            } else {
                query.bind(number.to_string())
            }
        }
        Value::String(text) => query.bind(text.as_str()),
        other => query.bind(other.to_string()),
    }
}

fn decode_row(row: &MySqlRow) -> Result<Vec<Value>, StoreError> {
    (0..row.columns().len())
        .map(|index| decode_column(row, index))
        .collect()
}

/// Decodes one cell to JSON by column type name. Integer families map
/// to numbers, floats to numbers, everything else falls back to text.
fn decode_column(row: &MySqlRow, index: usize) -> Result<Value, StoreError> {
    let raw = row
        .try_get_raw(index)
        .map_err(|e| StoreError::Procedure(e.to_string()))?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let type_name = raw.type_info().name().to_string();
    drop(raw);

    let decoded = match type_name.as_str() {
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
            row.try_get::<i64, _>(index).map(Value::from)
        }
        "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
        | "BIGINT UNSIGNED" => row.try_get::<u64, _>(index).map(Value::from),
        "FLOAT" | "DOUBLE" => row.try_get::<f64, _>(index).map(|float| {
            Number::from_f64(float).map_or(Value::Null, Value::Number)
        }),
        "BOOLEAN" => row.try_get::<bool, _>(index).map(Value::from),
        _ => row.try_get::<String, _>(index).map(Value::from),
    };
    decoded.map_err(|e| StoreError::Procedure(e.to_string()))
}
