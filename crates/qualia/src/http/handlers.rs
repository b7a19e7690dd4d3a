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

use super::AppState;
use crate::error::ApiError;
use crate::executor::ResourceExecutor;
use crate::registry::registry;
use crate::relation::RelationExecutor;
use crate::resource::ResourceDescriptor;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::Html;
use axum::Json;
use serde_json::{json, Map, Value};
use std::collections::HashMap;

/// Admins identify themselves per request; there are no sessions.
const ADMIN_HEADER: &str = "x-admin-id";

pub async fn index() -> Html<&'static str> {
    Html("<p>Qualia survey API. Resources live under <code>/api</code>.</p>")
}

pub async fn health(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    state.store.connect().await?;
    Ok(Json(json!({ "status": "ok" })))
}

pub async fn list_keys(
    State(state): State<AppState>,
    index: usize,
) -> Result<Json<Value>, ApiError> {
    let resource = resource(index);
    let mut conn = state.store.connect().await?;
    let mut executor = ResourceExecutor::new(resource, conn.as_mut());
    let keys = executor.list_keys().await?;
    Ok(Json(Value::Array(keys)))
}

pub async fn get_one(
    State(state): State<AppState>,
    index: usize,
    Path(key): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let resource = resource(index);
    let key = coerce(&key);
    let mut conn = state.store.connect().await?;
    let mut executor = ResourceExecutor::new(resource, conn.as_mut());
    let record = executor.get(&key).await?.ok_or(ApiError::NotFound)?;
    Ok(Json(Value::Object(record)))
}

pub async fn put_one(
    State(state): State<AppState>,
    index: usize,
    headers: HeaderMap,
    Path(key): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let resource = resource(index);
    let key = coerce(&key);
    let attrs = parse_body(&body)?;
    let mut conn = state.store.connect().await?;
    let mut executor = ResourceExecutor::new(resource, conn.as_mut());
    executor
        .put(&key, attrs.as_ref(), admin_id(&headers))
        .await?;
    Ok(key_object(resource, key))
}

pub async fn delete_one(
    State(state): State<AppState>,
    index: usize,
    headers: HeaderMap,
    Path(key): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let resource = resource(index);
    let key = coerce(&key);
    let mut conn = state.store.connect().await?;
    let mut executor = ResourceExecutor::new(resource, conn.as_mut());
    executor.delete(&key, admin_id(&headers)).await?;
    Ok(key_object(resource, key))
}

pub async fn query_connections(
    State(state): State<AppState>,
    index: usize,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    let resource = resource(index);
    let subject = params.get(resource.name()).map(|raw| coerce(raw));
    let mood = params.get("mood").map(|raw| coerce(raw));
    let mut conn = state.store.connect().await?;
    let mut executor = relation_executor(resource, conn.as_mut())?;
    let rows = executor.query(subject.as_ref(), mood.as_ref()).await?;
    Ok(Json(Value::Array(
        rows.into_iter().map(Value::Object).collect(),
    )))
}

pub async fn create_connection(
    State(state): State<AppState>,
    index: usize,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let resource = resource(index);
    let (subject, mood) = connection_pair(resource, &body)?;
    let mut conn = state.store.connect().await?;
    let mut executor = relation_executor(resource, conn.as_mut())?;
    executor.create(&subject, &mood).await?;
    Ok(echo_pair(resource, subject, mood))
}

pub async fn delete_connection(
    State(state): State<AppState>,
    index: usize,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let resource = resource(index);
    let (subject, mood) = connection_pair(resource, &body)?;
    let mut conn = state.store.connect().await?;
    let mut executor = relation_executor(resource, conn.as_mut())?;
    executor.delete(&subject, &mood, admin_id(&headers)).await?;
    Ok(echo_pair(resource, subject, mood))
}

fn resource(index: usize) -> &'static ResourceDescriptor {
    &registry().resources()[index]
}

fn relation_executor<'a>(
    resource: &'a ResourceDescriptor,
    conn: &'a mut (dyn crate::store::ProcedureConnection + 'a),
) -> Result<RelationExecutor<'a>, ApiError> {
    RelationExecutor::new(resource, conn).ok_or(ApiError::NotFound)
}

fn admin_id(headers: &HeaderMap) -> Option<i64> {
    headers.get(ADMIN_HEADER)?.to_str().ok()?.trim().parse().ok()
}

/// Path and query values arrive as text; integer keys are recovered so
/// comparisons against typed columns behave.
fn coerce(raw: &str) -> Value {
    raw.parse::<i64>()
        .map_or_else(|_| Value::String(raw.to_string()), Value::from)
}

/// An empty body means "no attributes", which key-only resources
/// accept. A present body must be a JSON object.
fn parse_body(body: &Bytes) -> Result<Option<Map<String, Value>>, ApiError> {
    if body.is_empty() {
        return Ok(None);
    }
    let parsed: Map<String, Value> = serde_json::from_slice(body)
        .map_err(|e| ApiError::Validation(format!("malformed body: {e}")))?;
    Ok(Some(parsed))
}

fn connection_pair(
    resource: &ResourceDescriptor,
    body: &Bytes,
) -> Result<(Value, Value), ApiError> {
    let Some(mut attrs) = parse_body(body)? else {
        return Err(ApiError::Validation("connection body required".to_string()));
    };
    let subject = attrs
        .remove(resource.name())
        .ok_or_else(|| ApiError::Validation(format!("missing field {}", resource.name())))?;
    let mood = attrs
        .remove("mood")
        .ok_or_else(|| ApiError::Validation("missing field mood".to_string()))?;
    Ok((subject, mood))
}

fn key_object(resource: &ResourceDescriptor, key: Value) -> Json<Value> {
    let mut reply = Map::new();
    reply.insert(resource.key().to_string(), key);
    Json(Value::Object(reply))
}

fn echo_pair(resource: &ResourceDescriptor, subject: Value, mood: Value) -> Json<Value> {
    let mut reply = Map::new();
    reply.insert(resource.name().to_string(), subject);
    reply.insert("mood".to_string(), mood);
    Json(Value::Object(reply))
}
