use crate::publish::Aggregate;
use crate::store::{self, DocumentStore, SPONSORS_PUBLIC_VIEW, DocRef, collections};
use crate::{LeagueError, LeagueResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sponsor {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub logo_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewSponsor {
    pub name: String,
    pub logo_url: String,
    pub website_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsorPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website_url: Option<String>,
}

/// Published sponsor list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SponsorBoard {
    #[serde(default)]
    pub sponsors: Vec<Sponsor>,
}

#[async_trait]
impl Aggregate for SponsorBoard {
    const PUBLIC: DocRef = SPONSORS_PUBLIC_VIEW;

    async fn load_draft(store: &dyn DocumentStore) -> LeagueResult<Self> {
        Ok(SponsorBoard { sponsors: SponsorDesk::new(store).list().await? })
    }
}

pub struct SponsorDesk<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> SponsorDesk<'a> {
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    /// Newest first.
    pub async fn list(&self) -> LeagueResult<Vec<Sponsor>> {
        let mut sponsors: Vec<Sponsor> = store::load_all(self.store, collections::SPONSORS, None).await?;
        sponsors.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sponsors)
    }

    pub async fn create(&self, sponsor: NewSponsor) -> LeagueResult<String> {
        if sponsor.name.trim().is_empty() {
            return Err(LeagueError::validation("sponsor name is required"));
        }
        let record = Sponsor {
            id: String::new(),
            name: sponsor.name,
            logo_url: sponsor.logo_url,
            website_url: sponsor.website_url.filter(|url| !url.is_empty()),
            created_at: Utc::now(),
        };
        let id = self.store.create(collections::SPONSORS, store::encode(&record)?).await?;
        info!("sponsor \"{}\" created as {id}", record.name);
        Ok(id)
    }

    pub async fn update(&self, id: &str, patch: SponsorPatch) -> LeagueResult<()> {
        if patch.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
            return Err(LeagueError::validation("sponsor name is required"));
        }
        store::merge_existing(self.store, collections::SPONSORS, id, store::encode(&patch)?).await
    }

    pub async fn delete(&self, id: &str) -> LeagueResult<()> {
        self.store.delete(collections::SPONSORS, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publish::Publisher;
    use crate::store::MemoryStore;
    use chrono::TimeZone;
    use serde_json::json;

    #[tokio::test]
    async fn list_is_newest_first() {
        let store = MemoryStore::new();
        let old = Utc.with_ymd_and_hms(2025, 7, 1, 10, 0, 0).unwrap();
        let new = Utc.with_ymd_and_hms(2025, 8, 1, 10, 0, 0).unwrap();
        store.set("sponsors", "a", json!({ "name": "Orange", "createdAt": old })).await.unwrap();
        store.set("sponsors", "b", json!({ "name": "Wave", "createdAt": new })).await.unwrap();

        let sponsors = SponsorDesk::new(&store).list().await.unwrap();
        let names: Vec<_> = sponsors.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Wave", "Orange"]);
    }

    #[tokio::test]
    async fn crud_and_publish() {
        let store = MemoryStore::new();
        let desk = SponsorDesk::new(&store);
        assert!(desk.create(NewSponsor::default()).await.unwrap_err().is_validation());

        let id = desk
            .create(NewSponsor { name: "Orange".into(), logo_url: "o.png".into(), website_url: Some(String::new()) })
            .await
            .unwrap();
        desk.update(&id, SponsorPatch { website_url: Some("https://orange.sn".into()), ..Default::default() })
            .await
            .unwrap();

        let snapshot = Publisher::new(&store).publish_sponsors().await.unwrap();
        assert_eq!(snapshot.view.sponsors.len(), 1);
        assert_eq!(snapshot.view.sponsors[0].website_url.as_deref(), Some("https://orange.sn"));
        assert_eq!(snapshot.view.sponsors[0].logo_url, "o.png");

        desk.delete(&id).await.unwrap();
        assert!(desk.list().await.unwrap().is_empty());
        let live = crate::publish::Publishable::<SponsorBoard>::new(&store).public().await.unwrap().unwrap();
        assert_eq!(live.view.sponsors.len(), 1);
    }

    #[tokio::test]
    async fn editing_a_deleted_sponsor_leaves_no_partial_document() {
        let store = MemoryStore::new();
        let desk = SponsorDesk::new(&store);
        let id = desk.create(NewSponsor { name: "Wave".into(), ..Default::default() }).await.unwrap();
        desk.delete(&id).await.unwrap();

        let patch = SponsorPatch { logo_url: Some("wave.png".into()), ..Default::default() };
        assert!(desk.update(&id, patch).await.unwrap_err().is_not_found());
        assert_eq!(store.count(collections::SPONSORS).await, 0);
        let snapshot = Publisher::new(&store).publish_sponsors().await.unwrap();
        assert!(snapshot.view.sponsors.is_empty());
    }
}
