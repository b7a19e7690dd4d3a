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

pub mod handlers;

use crate::registry::registry;
use crate::store::ProcedureStore;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::routing::get;
use axum::Router;
use std::collections::HashMap;
use std::sync::Arc;

/// Shared route state. Just the store handle; every request opens its
/// own connection and drops it on every exit path.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ProcedureStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn ProcedureStore>) -> Self {
        Self { store }
    }
}

/// Builds the REST surface from the resource registry: a list route
/// and a keyed route per routed resource, a connections route per
/// related resource, plus the index and health endpoints. Routes are
/// registered literally, never pattern-matched against the resource
/// name at request time.
pub fn build_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/", get(handlers::index))
        .route("/api/health", get(handlers::health));

    for (index, resource) in registry().resources().iter().enumerate() {
        if !resource.routed() {
            continue;
        }
        let base = format!("/api/{}s", resource.name());
        router = router
            .route(
                &format!("{base}/"),
                get(move |state: State<AppState>| handlers::list_keys(state, index)),
            )
            .route(
                &format!("{base}/{{key}}"),
                get(move |state: State<AppState>, key: Path<String>| {
                    handlers::get_one(state, index, key)
                })
                .put(
                    move |state: State<AppState>,
                          headers: HeaderMap,
                          key: Path<String>,
                          body: Bytes| {
                        handlers::put_one(state, index, headers, key, body)
                    },
                )
                .delete(
                    move |state: State<AppState>, headers: HeaderMap, key: Path<String>| {
                        handlers::delete_one(state, index, headers, key)
                    },
                ),
            );
        if resource.relation().is_some() {
            router = router.route(
                &format!("{base}_connections"),
                get(
                    move |state: State<AppState>, params: Query<HashMap<String, String>>| {
                        handlers::query_connections(state, index, params)
                    },
                )
                .post(move |state: State<AppState>, body: Bytes| {
                    handlers::create_connection(state, index, body)
                })
                .delete(
                    move |state: State<AppState>, headers: HeaderMap, body: Bytes| {
                        handlers::delete_connection(state, index, headers, body)
                    },
                ),
            );
        }
    }

    router.with_state(state)
}
