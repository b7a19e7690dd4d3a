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

use serde_json::{Map, Value};

/// Tabular result of one stored-procedure invocation.
///
/// Procedures may be pure queries, pure mutations, or emit several
/// result sets; the connection layer normalises all of them into this
/// one shape. Headers are empty for non-query statements, and the
/// generated key is only present when the statement assigned one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcedureResult {
    headers: Vec<String>,
    rows: Vec<Vec<Value>>,
    generated_key: Option<u64>,
}

impl ProcedureResult {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Value>>, generated_key: Option<u64>) -> Self {
        Self {
            headers,
            rows,
            generated_key,
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn generated_key(&self) -> Option<u64> {
        self.generated_key
    }

    /// Projects one column across all rows, preserving row order. Rows
    /// without that column contribute nothing.
    pub fn vertical(&self, column: usize) -> Vec<Value> {
        self.rows
            .iter()
            .filter_map(|row| row.get(column).cloned())
            .collect()
    }

    /// Zips headers and one row into a mapping, truncating to the
    /// shorter of the two. The truncation is deliberate: ragged results
    /// are tolerated, never escalated.
    pub fn weave(headers: &[String], row: &[Value]) -> Map<String, Value> {
        headers
            .iter()
            .zip(row.iter())
            .map(|(header, value)| (header.clone(), value.clone()))
            .collect()
    }

    /// Woven single row; `None` when the index is out of range.
    pub fn one(&self, index: usize) -> Option<Map<String, Value>> {
        self.rows
            .get(index)
            .map(|row| Self::weave(&self.headers, row))
    }

    /// Woven projection of every row, order preserved.
    pub fn all(&self) -> Vec<Map<String, Value>> {
        self.rows
            .iter()
            .map(|row| Self::weave(&self.headers, row))
            .collect()
    }
}
