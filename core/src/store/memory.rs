use super::{DocumentStore, Document, Mutator, OrderBy, Direction, compare_values, field, merge_json, new_id};
use crate::LeagueResult;
use async_trait::async_trait;
use log::debug;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tokio::sync::RwLock;

type Collections = BTreeMap<String, BTreeMap<String, Value>>;

const ID_LEN: usize = 20;

/// Process-local document store. Also backs offline use by loading from and
/// saving to a `{collection: {id: document}}` JSON file.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: Value) -> LeagueResult<Self> {
        let collections: Collections = serde_json::from_value(snapshot)?;
        Ok(Self { collections: RwLock::new(collections) })
    }

    /// Load a snapshot file. A missing file yields an empty store.
    pub async fn load(path: &Path) -> LeagueResult<Self> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => {
                debug!("loading store snapshot from {}", path.display());
                Self::from_snapshot(serde_json::from_str(&content)?)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::new()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn snapshot(&self) -> Value {
        let collections = self.collections.read().await;
        serde_json::to_value(&*collections).unwrap_or_default()
    }

    pub async fn save(&self, path: &Path) -> LeagueResult<()> {
        let content = serde_json::to_string_pretty(&self.snapshot().await)?;
        tokio::fs::write(path, content).await?;
        debug!("saved store snapshot to {}", path.display());
        Ok(())
    }

    pub async fn count(&self, collection: &str) -> usize {
        self.collections.read().await.get(collection).map_or(0, BTreeMap::len)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> LeagueResult<Option<Document>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|data| Document { id: id.to_owned(), data: data.clone() }))
    }

    async fn list(&self, collection: &str, order: Option<&OrderBy>) -> LeagueResult<Vec<Document>> {
        let collections = self.collections.read().await;
        let Some(docs) = collections.get(collection) else {
            return Ok(Vec::new());
        };
        let mut out: Vec<Document> = docs
            .iter()
            .map(|(id, data)| Document { id: id.clone(), data: data.clone() })
            .collect();
        if let Some(order) = order {
            out.retain(|doc| field(&doc.data, &order.field).is_some());
            out.sort_by(|a, b| {
                let ord = compare_values(
                    field(&a.data, &order.field).unwrap_or(&Value::Null),
                    field(&b.data, &order.field).unwrap_or(&Value::Null),
                );
                match order.direction {
                    Direction::Asc => ord,
                    Direction::Desc => ord.reverse(),
                }
            });
        }
        Ok(out)
    }

    async fn find_eq(&self, collection: &str, path: &str, value: &Value) -> LeagueResult<Vec<Document>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .into_iter()
            .flatten()
            .filter(|(_, data)| field(data, path) == Some(value))
            .map(|(id, data)| Document { id: id.clone(), data: data.clone() })
            .collect())
    }

    async fn create(&self, collection: &str, data: Value) -> LeagueResult<String> {
        let id = new_id(ID_LEN);
        let mut collections = self.collections.write().await;
        collections.entry(collection.to_owned()).or_default().insert(id.clone(), data);
        debug!("created {collection}/{id}");
        Ok(id)
    }

    async fn set(&self, collection: &str, id: &str, data: Value) -> LeagueResult<()> {
        let mut collections = self.collections.write().await;
        collections.entry(collection.to_owned()).or_default().insert(id.to_owned(), data);
        Ok(())
    }

    async fn merge(&self, collection: &str, id: &str, patch: Value) -> LeagueResult<()> {
        let mut collections = self.collections.write().await;
        let doc = collections
            .entry(collection.to_owned())
            .or_default()
            .entry(id.to_owned())
            .or_insert_with(|| Value::Object(Default::default()));
        merge_json(doc, patch);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> LeagueResult<()> {
        let mut collections = self.collections.write().await;
        if let Some(docs) = collections.get_mut(collection) {
            docs.remove(id);
        }
        Ok(())
    }

    async fn update_with(&self, collection: &str, id: &str, mutator: Mutator<'_>) -> LeagueResult<Value> {
        // The write lock is held across read and write, so this cannot race.
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_owned()).or_default();
        let next = mutator(docs.get(id))?;
        docs.insert(id.to_owned(), next.clone());
        Ok(next)
    }
}
