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
use crate::registry::registry;
use crate::resource::{ProcedureKind, ResourceDescriptor};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// In-memory stand-in for the procedure store. Backs mock mode and the
/// integration tests, honouring the same procedure-name contract as
/// the database: upsert semantics, idempotent deletes, generated keys
/// and the four relation query variants.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    tables: HashMap<String, BTreeMap<String, Vec<Value>>>,
    relations: HashMap<String, BTreeMap<(String, String), (Value, Value)>>,
    next_key: u64,
}

impl MemoryState {
    fn allocate_key(&mut self) -> u64 {
        self.next_key += 1;
        self.next_key
    }
}

const SEED_MOODS: &[&str] = &[
    "Relaxed", "Focused", "Intense", "Vibrant", "Sensual", "Somber", "Zany", "Content", "Joyful",
];

const SEED_SHAPES: &[(&str, i64)] = &[
    ("Square", 4),
    ("Triangle", 3),
    ("Circle", 1),
    ("Oval", 1),
    ("Rectangle", 4),
    ("Pentagon", 5),
];

const SEED_SCENTS: &[(&str, &str)] = &[
    ("Floral", "Floral"),
    ("Fruity", "Floral and Fresh"),
    ("Citrus", "Fresh"),
    ("Woody", "Woody"),
    ("Herbal", "Fresh"),
    ("Musky", "Amber"),
];

const SEED_TASTES: &[&str] = &["Sweet", "Sour", "Salty", "Bitter", "Spicy", "Umami"];

const SEED_MUSIC: &[&str] = &[
    "Pop",
    "Rhythm and Blues",
    "Rap",
    "Hip hop",
    "Rock",
    "Classical",
    "Jazz",
    "Country",
    "Folk",
    "Metal",
    "EDM",
    "Hyperpop",
];

const SEED_MEDIA: &[&str] = &[
    "Fantasy",
    "Action",
    "Horror",
    "Science Fiction",
    "Historical Fiction",
    "Documentary",
    "Drama",
    "Comedy",
    "Tragedy",
    "Thriller",
    "Musical",
    "Romance",
];

const SEED_COLORS: &[(&str, i64, i64, i64)] = &[
    ("Crimson Red", 0, 100, 30),
    ("Sunset Orange", 25, 100, 50),
    ("Golden Yellow", 50, 100, 50),
    ("Forest Green", 120, 60, 25),
    ("Sky Blue", 200, 100, 70),
    ("Midnight Blue", 240, 100, 40),
    ("Lavendar Purple", 270, 50, 70),
];

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with the survey vocabulary and a root admin
    /// (identifier 1, full permissions), mirroring a freshly seeded
    /// database.
    pub fn seeded() -> Self {
        let store = Self::new();
        store.put_row("admin", vec![json!(1), json!(0b11)]);
        for mood in SEED_MOODS {
            store.put_row("mood", vec![json!(mood)]);
        }
        for (name, hue, saturation, brightness) in SEED_COLORS {
            store.put_row(
                "color",
                vec![json!(name), json!(hue), json!(saturation), json!(brightness)],
            );
        }
        for (name, sides) in SEED_SHAPES {
            store.put_row("shape", vec![json!(name), json!(sides)]);
        }
        for (name, family) in SEED_SCENTS {
            store.put_row("scent", vec![json!(name), json!(family)]);
        }
        for taste in SEED_TASTES {
            store.put_row("taste", vec![json!(taste)]);
        }
        for genre in SEED_MUSIC {
            store.put_row("music_genre", vec![json!(genre)]);
        }
        for genre in SEED_MEDIA {
            store.put_row("media_genre", vec![json!(genre)]);
        }
        store
    }

    /// Inserts or replaces a row directly, keyed on its first value.
    /// Seeding and test setup go through here.
    pub fn put_row(&self, resource: &str, row: Vec<Value>) {
        let Some(first) = row.first() else {
            return;
        };
        let key = value_key(first);
        self.lock()
            .tables
            .entry(resource.to_string())
            .or_default()
            .insert(key, row);
    }

    /// Links a quale value to a mood directly.
    pub fn link(&self, resource: &str, subject: Value, mood: Value) {
        let pair = (value_key(&subject), value_key(&mood));
        self.lock()
            .relations
            .entry(resource.to_string())
            .or_default()
            .insert(pair, (subject, mood));
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ProcedureStore for MemoryStore {
    async fn connect(&self) -> Result<Box<dyn ProcedureConnection>, StoreError> {
        Ok(Box::new(MemoryConnection {
            store: self.clone(),
        }))
    }
}

struct MemoryConnection {
    store: MemoryStore,
}

#[async_trait]
impl ProcedureConnection for MemoryConnection {
    /// Interprets the catalogued procedure name instead of running SQL.
    /// Names outside the catalogue fail the same way an undefined
    /// stored procedure would.
    async fn invoke(&mut self, name: &str, args: &[Value]) -> Result<ProcedureResult, StoreError> {
        let (resource, kind) = registry()
            .lookup(name)
            .ok_or_else(|| StoreError::UnknownProcedure(name.to_string()))?;
        debug!(procedure = name, resource = resource.name(), "memory call");
        let mut state = self.store.lock();
        match kind {
            ProcedureKind::ListKeys => {
                expect_arity(name, args, 0)?;
                let rows = state
                    .tables
                    .get(resource.name())
                    .map(|table| {
                        table
                            .values()
                            .filter_map(|row| row.first().cloned())
                            .map(|key| vec![key])
                            .collect()
                    })
                    .unwrap_or_default();
                Ok(ProcedureResult::new(
                    vec![resource.key().to_string()],
                    rows,
                    None,
                ))
            }
            ProcedureKind::Get => {
                expect_arity(name, args, 1)?;
                let rows = state
                    .tables
                    .get(resource.name())
                    .and_then(|table| table.get(&value_key(&args[0])))
                    .map(|row| vec![row.clone()])
                    .unwrap_or_default();
                Ok(ProcedureResult::new(headers_for(resource), rows, None))
            }
            ProcedureKind::Put => {
                expect_arity(name, args, resource.attrs().len())?;
                let key = value_key(&args[0]);
                let generated = state.allocate_key();
                state
                    .tables
                    .entry(resource.name().to_string())
                    .or_default()
                    .insert(key, args.to_vec());
                Ok(ProcedureResult::new(Vec::new(), Vec::new(), Some(generated)))
            }
            ProcedureKind::Delete => {
                expect_arity(name, args, 1)?;
                if let Some(table) = state.tables.get_mut(resource.name()) {
                    table.remove(&value_key(&args[0]));
                }
                Ok(ProcedureResult::default())
            }
            ProcedureKind::RelationQueryAll => {
                expect_arity(name, args, 0)?;
                Ok(relation_rows(&state, resource, None, None))
            }
            ProcedureKind::RelationQuerySubject => {
                expect_arity(name, args, 1)?;
                Ok(relation_rows(&state, resource, Some(&args[0]), None))
            }
            ProcedureKind::RelationQueryMood => {
                expect_arity(name, args, 1)?;
                Ok(relation_rows(&state, resource, None, Some(&args[0])))
            }
            ProcedureKind::RelationQueryBoth => {
                expect_arity(name, args, 2)?;
                Ok(relation_rows(
                    &state,
                    resource,
                    Some(&args[0]),
                    Some(&args[1]),
                ))
            }
            ProcedureKind::RelationCreate => {
                expect_arity(name, args, 2)?;
                let pair = (value_key(&args[0]), value_key(&args[1]));
                let generated = state.allocate_key();
                state
                    .relations
                    .entry(resource.name().to_string())
                    .or_default()
                    .insert(pair, (args[0].clone(), args[1].clone()));
                Ok(ProcedureResult::new(Vec::new(), Vec::new(), Some(generated)))
            }
            ProcedureKind::RelationDelete => {
                expect_arity(name, args, 2)?;
                let pair = (value_key(&args[0]), value_key(&args[1]));
                if let Some(pairs) = state.relations.get_mut(resource.name()) {
                    pairs.remove(&pair);
                }
                Ok(ProcedureResult::default())
            }
        }
    }
}

fn expect_arity(name: &str, args: &[Value], expected: usize) -> Result<(), StoreError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(StoreError::Procedure(format!(
            "{name} expects {expected} arguments, got {}",
            args.len()
        )))
    }
}

fn headers_for(resource: &ResourceDescriptor) -> Vec<String> {
    resource.attrs().iter().map(ToString::to_string).collect()
}

fn relation_rows(
    state: &MemoryState,
    resource: &ResourceDescriptor,
    subject: Option<&Value>,
    mood: Option<&Value>,
) -> ProcedureResult {
    let subject_key = subject.map(value_key);
    let mood_key = mood.map(value_key);
    let rows = state
        .relations
        .get(resource.name())
        .map(|pairs| {
            pairs
                .iter()
                .filter(|((row_subject, row_mood), _)| {
                    subject_key.as_ref().map_or(true, |key| key == row_subject)
                        && mood_key.as_ref().map_or(true, |key| key == row_mood)
                })
                .map(|(_, (subject, mood))| vec![subject.clone(), mood.clone()])
                .collect()
        })
        .unwrap_or_default();
    ProcedureResult::new(
        vec![resource.name().to_string(), "mood".to_string()],
        rows,
        None,
    )
}

/// Canonical map key for a JSON value, so "4" the string and 4 the
/// number collide the way a typed database column would make them.
fn value_key(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn connect(store: &MemoryStore) -> Box<dyn ProcedureConnection> {
        store.connect().await.expect("memory connect")
    }

    #[tokio::test]
    async fn put_get_delete_cycle() {
        let store = MemoryStore::new();
        let mut conn = connect(&store).await;

        let put = conn
            .invoke("put_mood", &[json!("Happy")])
            .await
            .expect("put");
        assert!(put.generated_key().is_some());

        let got = conn.invoke("get_mood", &[json!("Happy")]).await.expect("get");
        assert_eq!(got.one(0).and_then(|row| row.get("name").cloned()), Some(json!("Happy")));

        conn.invoke("delete_mood", &[json!("Happy")])
            .await
            .expect("delete");
        let gone = conn.invoke("get_mood", &[json!("Happy")]).await.expect("get");
        assert!(gone.one(0).is_none());
    }

    #[tokio::test]
    async fn put_is_an_upsert() {
        let store = MemoryStore::new();
        let mut conn = connect(&store).await;

        conn.invoke("put_shape", &[json!("Hexagon"), json!(5)])
            .await
            .expect("put");
        conn.invoke("put_shape", &[json!("Hexagon"), json!(6)])
            .await
            .expect("put");

        let got = conn
            .invoke("get_shape", &[json!("Hexagon")])
            .await
            .expect("get");
        assert_eq!(
            got.one(0).and_then(|row| row.get("sides").cloned()),
            Some(json!(6))
        );
        let keys = conn.invoke("get_shapes", &[]).await.expect("list");
        assert_eq!(keys.vertical(0), vec![json!("Hexagon")]);
    }

    #[tokio::test]
    async fn delete_of_missing_row_is_quiet() {
        let store = MemoryStore::new();
        let mut conn = connect(&store).await;
        conn.invoke("delete_mood", &[json!("Nonexistent")])
            .await
            .expect("idempotent delete");
    }

    #[tokio::test]
    async fn relation_queries_filter_on_both_axes() {
        let store = MemoryStore::new();
        store.link("color", json!("Red"), json!("Sad"));
        store.link("color", json!("Red"), json!("Happy"));
        store.link("color", json!("Blue"), json!("Sad"));
        let mut conn = connect(&store).await;

        let all = conn.invoke("get_coloraffects", &[]).await.expect("all");
        assert_eq!(all.rows().len(), 3);

        let red = conn
            .invoke("get_coloraffects_color", &[json!("Red")])
            .await
            .expect("subject");
        assert_eq!(red.rows().len(), 2);

        let sad = conn
            .invoke("get_coloraffects_mood", &[json!("Sad")])
            .await
            .expect("mood");
        assert_eq!(sad.rows().len(), 2);

        let both = conn
            .invoke("get_coloraffects_color_mood", &[json!("Red"), json!("Sad")])
            .await
            .expect("both");
        assert_eq!(both.rows().len(), 1);
        assert_eq!(
            both.one(0).and_then(|row| row.get("color").cloned()),
            Some(json!("Red"))
        );
    }

    #[tokio::test]
    async fn unknown_procedure_is_an_error() {
        let store = MemoryStore::new();
        let mut conn = connect(&store).await;
        let outcome = conn.invoke("get_unicorns", &[]).await;
        assert!(matches!(outcome, Err(StoreError::UnknownProcedure(_))));
    }

    #[tokio::test]
    async fn arity_mismatch_is_an_error() {
        let store = MemoryStore::new();
        let mut conn = connect(&store).await;
        let outcome = conn.invoke("put_shape", &[json!("Hexagon")]).await;
        assert!(matches!(outcome, Err(StoreError::Procedure(_))));
    }

    #[tokio::test]
    async fn seeded_store_has_the_vocabulary() {
        let store = MemoryStore::seeded();
        let mut conn = connect(&store).await;

        let moods = conn.invoke("get_moods", &[]).await.expect("moods");
        assert_eq!(moods.rows().len(), 9);
        assert!(moods.vertical(0).contains(&json!("Relaxed")));

        let admin = conn.invoke("get_admin", &[json!(1)]).await.expect("admin");
        assert_eq!(
            admin.one(0).and_then(|row| row.get("permissions").cloned()),
            Some(json!(3))
        );

        let tastes = conn.invoke("get_tastes", &[]).await.expect("tastes");
        assert!(tastes.vertical(0).contains(&json!("Umami")));
    }
}
