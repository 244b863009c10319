//! Document-store seam. Everything above this module talks to the database
//! through [`DocumentStore`]; the backends below only move JSON documents.
pub mod http;
pub mod memory;

pub use http::HttpStore;
pub use memory::MemoryStore;

use crate::{LeagueError, LeagueResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::path::PathBuf;
use std::time::Duration;

pub mod collections {
    pub const TEAMS: &str = "teams";
    pub const POULES: &str = "navetane_poules";
    pub const COUPE_MATCHES: &str = "navetane_coupe_matches";
    pub const ARTICLES: &str = "articles";
    pub const POLLS: &str = "polls";
    pub const SPONSORS: &str = "sponsors";
}

/// Address of a singleton document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocRef {
    pub collection: &'static str,
    pub id: &'static str,
}

pub const PRELIMINARY_MATCH: DocRef =
    DocRef { collection: "navetane_preliminary_match", id: "main_prelim" };
pub const NAVETANE_PUBLIC_VIEW: DocRef = DocRef { collection: "navetane_public_views", id: "live" };
pub const FINALS_ADMIN: DocRef = DocRef { collection: "finals_admin_data", id: "current" };
pub const FINALS_PUBLIC_VIEW: DocRef = DocRef { collection: "finals_public_view", id: "live" };
pub const TEAMS_PUBLIC_VIEW: DocRef = DocRef { collection: "teams_public_view", id: "live" };
pub const SPONSORS_PUBLIC_VIEW: DocRef = DocRef { collection: "sponsors_public_view", id: "live" };
pub const STATS_ADMIN: DocRef = DocRef { collection: "navetane_stats", id: "admin_data" };
pub const STATS_PUBLIC_VIEW: DocRef = DocRef { collection: "navetane_stats", id: "public_view" };

/// A stored document: its id plus the JSON body (which never repeats the id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

impl Document {
    /// Decode into a domain type, exposing the document id as an `id` field.
    pub fn decode<T: DeserializeOwned>(self) -> LeagueResult<T> {
        let mut data = self.data;
        if let Value::Object(map) = &mut data {
            map.insert("id".to_owned(), Value::String(self.id));
        }
        Ok(serde_json::from_value(data)?)
    }
}

/// Serialize a domain value into a document body. A top-level `id` is
/// dropped since the store keys documents by id already.
pub fn encode<T: Serialize>(value: &T) -> LeagueResult<Value> {
    let mut data = serde_json::to_value(value)?;
    if let Value::Object(map) = &mut data {
        map.remove("id");
    }
    Ok(data)
}

pub fn decode_all<T: DeserializeOwned>(docs: Vec<Document>) -> LeagueResult<Vec<T>> {
    docs.into_iter().map(Document::decode).collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self { field: field.into(), direction: Direction::Asc }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self { field: field.into(), direction: Direction::Desc }
    }
}

/// Read-modify-write callback for [`DocumentStore::update_with`]. It may be
/// invoked more than once when a backend retries after a conflicting write;
/// that conflict retry is the only retry any backend performs.
pub type Mutator<'a> = &'a (dyn Fn(Option<&Value>) -> LeagueResult<Value> + Send + Sync);

/// Collection-scoped CRUD over JSON documents.
///
/// Writes are last-write-wins at the document level. Only `update_with` is
/// atomic with respect to concurrent writers.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> LeagueResult<Option<Document>>;

    /// All documents of a collection. With an ordering, documents lacking the
    /// order field are left out.
    async fn list(&self, collection: &str, order: Option<&OrderBy>) -> LeagueResult<Vec<Document>>;

    /// Documents whose (dotted) `field` equals `value`.
    async fn find_eq(&self, collection: &str, field: &str, value: &Value) -> LeagueResult<Vec<Document>>;

    /// Insert under a fresh id and return it.
    async fn create(&self, collection: &str, data: Value) -> LeagueResult<String>;

    /// Overwrite the whole document, creating it if needed.
    async fn set(&self, collection: &str, id: &str, data: Value) -> LeagueResult<()>;

    /// Deep-merge `patch` into the document, creating it if needed. Nested
    /// objects merge key by key; arrays and scalars are replaced. Entity
    /// edits go through [`merge_existing`] instead.
    async fn merge(&self, collection: &str, id: &str, patch: Value) -> LeagueResult<()>;

    /// Deleting a missing document is not an error.
    async fn delete(&self, collection: &str, id: &str) -> LeagueResult<()>;

    /// Atomically replace a document with `mutator(current)` and return the
    /// value written.
    async fn update_with(&self, collection: &str, id: &str, mutator: Mutator<'_>) -> LeagueResult<Value>;
}

/// Typed convenience reads shared by every desk.
pub async fn load_one<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    collection: &str,
    id: &str,
) -> LeagueResult<Option<T>> {
    store.get(collection, id).await?.map(Document::decode).transpose()
}

pub async fn load_required<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    collection: &str,
    id: &str,
) -> LeagueResult<T> {
    load_one(store, collection, id)
        .await?
        .ok_or_else(|| LeagueError::not_found(format!("{collection}/{id}")))
}

pub async fn load_all<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    collection: &str,
    order: Option<&OrderBy>,
) -> LeagueResult<Vec<T>> {
    decode_all(store.list(collection, order).await?)
}

/// Merge `patch` into an existing document. Unlike [`DocumentStore::merge`]
/// a missing document is `NotFound` and nothing is written.
pub async fn merge_existing(
    store: &dyn DocumentStore,
    collection: &str,
    id: &str,
    patch: Value,
) -> LeagueResult<()> {
    let apply = |current: Option<&Value>| -> LeagueResult<Value> {
        let mut next = current
            .cloned()
            .ok_or_else(|| LeagueError::not_found(format!("{collection}/{id}")))?;
        merge_json(&mut next, patch.clone());
        Ok(next)
    };
    store.update_with(collection, id, &apply).await?;
    Ok(())
}

/// Short random id, used for documents and for bracket matches embedded in
/// the finals document.
pub fn new_id(len: usize) -> String {
    uuid::Uuid::new_v4().simple().to_string().chars().take(len).collect()
}

/// Look up a dotted path such as `category.id`.
pub fn field<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(data, |current, key| current.get(key))
}

/// Ordering used by `list`: numbers numerically, strings lexically, then by
/// JSON type (null < bool < number < string < other).
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or_default(), y.as_f64().unwrap_or_default());
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Merge `patch` into `target` with document-store merge semantics.
pub fn merge_json(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(existing), Value::Object(incoming)) => {
            for (key, value) in incoming {
                let nested = value.is_object() && existing.get(&key).is_some_and(Value::is_object);
                if !nested {
                    existing.insert(key, value);
                } else if let Some(slot) = existing.get_mut(&key) {
                    merge_json(slot, value);
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

/// Which backend to open.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreConfig {
    /// REST document gateway.
    Http { base_url: String, token: Option<String>, timeout: Duration },
    /// In-memory store seeded from (and flushed back to) a JSON snapshot.
    File(PathBuf),
    /// Empty, process-local store.
    Memory,
}

/// An opened backend.
pub enum Backend {
    Http(HttpStore),
    Memory { store: MemoryStore, path: Option<PathBuf> },
}

impl Backend {
    pub async fn open(config: &StoreConfig) -> LeagueResult<Self> {
        match config {
            StoreConfig::Http { base_url, token, timeout } => {
                let mut store = HttpStore::new(base_url.clone()).with_timeout(*timeout);
                if let Some(token) = token {
                    store = store.with_token(token.clone());
                }
                Ok(Backend::Http(store))
            }
            StoreConfig::File(path) => Ok(Backend::Memory {
                store: MemoryStore::load(path).await?,
                path: Some(path.clone()),
            }),
            StoreConfig::Memory => Ok(Backend::Memory { store: MemoryStore::new(), path: None }),
        }
    }

    pub fn store(&self) -> &dyn DocumentStore {
        match self {
            Backend::Http(store) => store,
            Backend::Memory { store, .. } => store,
        }
    }

    /// Persist file-backed stores. Remote stores are written through already.
    pub async fn flush(&self) -> LeagueResult<()> {
        match self {
            Backend::Memory { store, path: Some(path) } => store.save(path).await,
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_replaces_arrays_and_merges_objects() {
        let mut doc = json!({
            "championnat": { "quarters": [1, 2], "semis": [3] },
            "coupe": { "final": [] }
        });
        merge_json(&mut doc, json!({ "championnat": { "quarters": [9] } }));
        assert_eq!(doc["championnat"]["quarters"], json!([9]));
        assert_eq!(doc["championnat"]["semis"], json!([3]));
        assert_eq!(doc["coupe"]["final"], json!([]));
    }

    #[test]
    fn merge_keeps_unspecified_fields() {
        let mut doc = json!({ "teamA": "Jaraaf", "teamB": "Niary Tally", "winnerPlaysAgainst": "Gorée" });
        merge_json(&mut doc, json!({ "teamB": "Casa Sports" }));
        assert_eq!(doc, json!({ "teamA": "Jaraaf", "teamB": "Casa Sports", "winnerPlaysAgainst": "Gorée" }));
    }

    #[test]
    fn decode_injects_document_id() {
        let doc = Document { id: "abc".into(), data: json!({ "name": "Poule A" }) };
        let poule: crate::Poule = doc.decode().unwrap();
        assert_eq!(poule.id, "abc");
        assert_eq!(poule.name, "Poule A");
        assert!(poule.teams.is_empty());
    }

    #[test]
    fn encode_drops_top_level_id_only() {
        let poule = crate::Poule {
            id: "abc".into(),
            name: "Poule B".into(),
            teams: vec![crate::PouleTeamRecord { id: "t1".into(), team: "Jaraaf".into(), ..Default::default() }],
            qualified_count: None,
        };
        let data = encode(&poule).unwrap();
        assert!(data.get("id").is_none());
        assert_eq!(data["teams"][0]["id"], "t1");
    }

    #[test]
    fn dotted_field_lookup() {
        let data = json!({ "category": { "id": "sport" } });
        assert_eq!(field(&data, "category.id"), Some(&json!("sport")));
        assert_eq!(field(&data, "category.slug"), None);
    }

    #[test]
    fn compare_values_orders_numbers_numerically() {
        assert_eq!(compare_values(&json!(9), &json!(10)), Ordering::Less);
        assert_eq!(compare_values(&json!("b"), &json!("a")), Ordering::Greater);
        assert_eq!(compare_values(&json!(null), &json!("a")), Ordering::Less);
    }

    #[tokio::test]
    async fn merge_existing_refuses_missing_documents() {
        let store = MemoryStore::new();
        store.set("teams", "t1", json!({ "name": "Gorée", "logoUrl": "g.png" })).await.unwrap();
        merge_existing(&store, "teams", "t1", json!({ "name": "US Gorée" })).await.unwrap();
        let doc = store.get("teams", "t1").await.unwrap().unwrap();
        assert_eq!(doc.data, json!({ "name": "US Gorée", "logoUrl": "g.png" }));

        let err = merge_existing(&store, "teams", "ghost", json!({ "name": "X" })).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(store.get("teams", "ghost").await.unwrap().is_none());
    }

    #[test]
    fn new_id_has_requested_length() {
        assert_eq!(new_id(8).len(), 8);
        assert_ne!(new_id(20), new_id(20));
    }
}
