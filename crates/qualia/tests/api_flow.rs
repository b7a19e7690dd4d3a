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

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use qualia::http::{build_router, AppState};
use qualia::store::MemoryStore;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn app(store: MemoryStore) -> Router {
    build_router(AppState::new(Arc::new(store)))
}

fn admin_store(mask: i64) -> MemoryStore {
    let store = MemoryStore::new();
    store.put_row("admin", vec![json!(7), json!(mask)]);
    store
}

fn request(method: Method, uri: &str, admin: Option<i64>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(admin) = admin {
        builder = builder.header("x-admin-id", admin.to_string());
    }
    let body = body.map_or_else(Body::empty, |value| Body::from(value.to_string()));
    builder.body(body).expect("request")
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.expect("infallible");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, value)
}

#[tokio::test]
async fn mood_put_get_delete_cycle() {
    let app = app(admin_store(0b11));

    let (status, body) = send(&app, request(Method::PUT, "/api/moods/Happy", Some(7), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "name": "Happy" }));

    let (status, body) = send(&app, request(Method::GET, "/api/moods/Happy", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "name": "Happy" }));

    let (status, body) = send(
        &app,
        request(Method::DELETE, "/api/moods/Happy", Some(7), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "name": "Happy" }));

    let (status, _) = send(&app, request(Method::GET, "/api/moods/Happy", None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_keys_returns_every_key() {
    let store = admin_store(0b11);
    store.put_row("mood", vec![json!("Calm")]);
    store.put_row("mood", vec![json!("Tense")]);
    let app = app(store);

    let (status, body) = send(&app, request(Method::GET, "/api/moods/", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    let keys = body.as_array().expect("array");
    assert!(keys.contains(&json!("Calm")));
    assert!(keys.contains(&json!("Tense")));
    assert_eq!(keys.len(), 2);
}

#[tokio::test]
async fn put_with_full_attribute_body() {
    let app = app(admin_store(0b11));

    let (status, body) = send(
        &app,
        request(
            Method::PUT,
            "/api/colors/Crimson%20Red",
            Some(7),
            Some(json!({ "hue": 0, "saturation": 100, "brightness": 30 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "name": "Crimson Red" }));

    let (status, body) = send(
        &app,
        request(Method::GET, "/api/colors/Crimson%20Red", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "name": "Crimson Red", "hue": 0, "saturation": 100, "brightness": 30 })
    );
}

#[tokio::test]
async fn put_missing_attribute_is_rejected() {
    let app = app(admin_store(0b11));
    let (status, body) = send(
        &app,
        request(
            Method::PUT,
            "/api/colors/Red",
            Some(7),
            Some(json!({ "hue": 0, "saturation": 100 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().expect("message").contains("brightness"));
}

#[tokio::test]
async fn put_without_body_needs_no_attributes_for_key_only_resources() {
    let app = app(admin_store(0b11));

    let (status, _) = send(&app, request(Method::PUT, "/api/tastes/Sweet", Some(7), None)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, request(Method::PUT, "/api/shapes/Square", Some(7), None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn mutations_without_admin_header_are_forbidden() {
    let store = admin_store(0b11);
    store.put_row("mood", vec![json!("Calm")]);
    let app = app(store);

    let (status, _) = send(&app, request(Method::PUT, "/api/moods/Tense", None, None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, request(Method::DELETE, "/api/moods/Calm", None, None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // The gated row is untouched.
    let (status, _) = send(&app, request(Method::GET, "/api/moods/Calm", None, None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn capability_bits_gate_put_and_delete_independently() {
    let store = admin_store(0b01);
    store.put_row("mood", vec![json!("Calm")]);
    let app = app(store);

    let (status, _) = send(&app, request(Method::PUT, "/api/moods/Tense", Some(7), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        request(Method::DELETE, "/api/moods/Calm", Some(7), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn unknown_admin_is_forbidden() {
    let app = app(admin_store(0b11));
    let (status, _) = send(&app, request(Method::PUT, "/api/moods/Calm", Some(99), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn connections_post_then_filtered_get() {
    let app = app(admin_store(0b11));

    for (color, mood) in [("Red", "Sad"), ("Red", "Happy"), ("Blue", "Sad")] {
        let (status, body) = send(
            &app,
            request(
                Method::POST,
                "/api/colors_connections",
                None,
                Some(json!({ "color": color, "mood": mood })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "color": color, "mood": mood }));
    }

    let (status, body) = send(
        &app,
        request(Method::GET, "/api/colors_connections", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().expect("array").len(), 3);

    let (status, body) = send(
        &app,
        request(Method::GET, "/api/colors_connections?color=Red", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().expect("array").len(), 2);

    let (status, body) = send(
        &app,
        request(Method::GET, "/api/colors_connections?mood=Sad", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let sad = body.as_array().expect("array");
    assert_eq!(sad.len(), 2);
    assert!(sad.contains(&json!({ "color": "Red", "mood": "Sad" })));
    assert!(sad.contains(&json!({ "color": "Blue", "mood": "Sad" })));

    let (status, body) = send(
        &app,
        request(
            Method::GET,
            "/api/colors_connections?color=Red&mood=Sad",
            None,
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([{ "color": "Red", "mood": "Sad" }]));
}

#[tokio::test]
async fn connection_delete_is_gated_but_post_is_not() {
    let app = app(admin_store(0b11));

    let pair = json!({ "shape": "Square", "mood": "Content" });
    let (status, _) = send(
        &app,
        request(Method::POST, "/api/shapes_connections", None, Some(pair.clone())),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        request(Method::DELETE, "/api/shapes_connections", None, Some(pair.clone())),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        request(Method::DELETE, "/api/shapes_connections", Some(7), Some(pair)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        request(Method::GET, "/api/shapes_connections", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn connection_post_requires_both_fields() {
    let app = app(admin_store(0b11));
    let (status, _) = send(
        &app,
        request(
            Method::POST,
            "/api/scents_connections",
            None,
            Some(json!({ "scent": "Floral" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_body_is_rejected() {
    let app = app(admin_store(0b11));
    let request = Request::builder()
        .method(Method::PUT)
        .uri("/api/colors/Red")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-admin-id", "7")
        .body(Body::from("not json"))
        .expect("request");
    let response = app.clone().oneshot(request).await.expect("infallible");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn admin_resource_is_not_routed() {
    let app = app(admin_store(0b11));
    let (status, _) = send(&app, request(Method::GET, "/api/admins/1", None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn seeded_store_serves_the_vocabulary() {
    let app = app(MemoryStore::seeded());

    let (status, body) = send(&app, request(Method::GET, "/api/moods/", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().expect("array").contains(&json!("Joyful")));

    let (status, body) = send(
        &app,
        request(Method::GET, "/api/media_genres/Fantasy", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "name": "Fantasy" }));
}

#[tokio::test]
async fn index_and_health_respond() {
    let app = app(MemoryStore::new());

    let response = app
        .clone()
        .oneshot(request(Method::GET, "/", None, None))
        .await
        .expect("infallible");
    assert_eq!(response.status(), StatusCode::OK);

    let (status, body) = send(&app, request(Method::GET, "/api/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}
