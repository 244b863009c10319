//! Draft → public snapshot pipeline.
//!
//! Public pages only ever read the `*_public_view/live` documents. A publish
//! reads the team registry and the drafts (two separate reads, not a
//! transaction), denormalizes team display data into the draft, and writes
//! the result as one document.
use crate::draft::NavetaneDesk;
use crate::registry::{TeamIndex, TeamRegistry};
use crate::store::{
    self, DocRef, DocumentStore, FINALS_PUBLIC_VIEW, NAVETANE_PUBLIC_VIEW, OrderBy, TEAMS_PUBLIC_VIEW,
    collections,
};
use crate::sponsors::SponsorBoard;
use crate::stats::{NavetaneStats, StatsPageData, enrich_stats};
use crate::{BracketMatch, CompetitionFinals, LeagueResult, NavetaneBoard, TeamRoster};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;

/// A draft/public document pair.
#[async_trait]
pub trait Aggregate: Serialize + DeserializeOwned + Default + Clone + Send + Sync + 'static {
    /// Where the published snapshot lives.
    const PUBLIC: DocRef;

    /// Assemble the current draft from the admin collections.
    async fn load_draft(store: &dyn DocumentStore) -> LeagueResult<Self>;
}

/// A published view: the aggregate plus when it was published.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot<T> {
    #[serde(flatten)]
    pub view: T,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_published: Option<DateTime<Utc>>,
}

pub struct Publishable<'a, T> {
    store: &'a dyn DocumentStore,
    _aggregate: PhantomData<T>,
}

impl<'a, T: Aggregate> Publishable<'a, T> {
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store, _aggregate: PhantomData }
    }

    pub async fn draft(&self) -> LeagueResult<T> {
        T::load_draft(self.store).await
    }

    /// The last published snapshot, if any.
    pub async fn public(&self) -> LeagueResult<Option<Snapshot<T>>> {
        store::load_one(self.store, T::PUBLIC.collection, T::PUBLIC.id).await
    }

    /// The published snapshot, or an empty one when nothing was published yet.
    pub async fn public_or_default(&self) -> LeagueResult<Snapshot<T>> {
        Ok(self.public().await?.unwrap_or_default())
    }

    /// Overwrite the public document with the enriched draft. If the write
    /// fails the previous snapshot stays in place.
    pub async fn publish(&self, enrich: impl FnOnce(T) -> T + Send) -> LeagueResult<Snapshot<T>> {
        let draft = self.draft().await?;
        let snapshot = Snapshot { view: enrich(draft), last_published: Some(Utc::now()) };
        self.store
            .set(T::PUBLIC.collection, T::PUBLIC.id, store::encode(&snapshot)?)
            .await?;
        info!("published {}/{}", T::PUBLIC.collection, T::PUBLIC.id);
        Ok(snapshot)
    }
}

#[async_trait]
impl Aggregate for NavetaneBoard {
    const PUBLIC: DocRef = NAVETANE_PUBLIC_VIEW;

    async fn load_draft(store: &dyn DocumentStore) -> LeagueResult<Self> {
        let desk = NavetaneDesk::new(store);
        Ok(NavetaneBoard {
            poules: desk.list_poules().await?,
            coupe_matches: desk.list_coupe_matches().await?,
            preliminary_match: desk.preliminary_match().await?,
        })
    }
}

#[async_trait]
impl Aggregate for CompetitionFinals {
    const PUBLIC: DocRef = FINALS_PUBLIC_VIEW;

    async fn load_draft(store: &dyn DocumentStore) -> LeagueResult<Self> {
        NavetaneDesk::new(store).finals().await
    }
}

#[async_trait]
impl Aggregate for TeamRoster {
    const PUBLIC: DocRef = TEAMS_PUBLIC_VIEW;

    async fn load_draft(store: &dyn DocumentStore) -> LeagueResult<Self> {
        let teams = store::load_all(store, collections::TEAMS, Some(&OrderBy::asc("name"))).await?;
        Ok(TeamRoster { teams })
    }
}

// ---------------------------------------------------------------------------
// Enrichment
// ---------------------------------------------------------------------------

/// Resolve cup and preliminary team names to display data. Poules already
/// carry their own snapshot and are copied unchanged.
pub fn enrich_board(mut board: NavetaneBoard, index: &TeamIndex) -> NavetaneBoard {
    for fixture in &mut board.coupe_matches {
        fixture.team_a_data = Some(index.team_data(&fixture.team_a));
        fixture.team_b_data = Some(index.team_data(&fixture.team_b));
    }
    if let Some(prelim) = &mut board.preliminary_match {
        prelim.team_a_data = Some(index.team_data(&prelim.team_a));
        prelim.team_b_data = Some(index.team_data(&prelim.team_b));
        prelim.winner_plays_against_data = Some(index.team_data(&prelim.winner_plays_against));
    }
    board
}

/// Resolve bracket team ids. Ids that no longer resolve clear the name and
/// logo, so stale values from an earlier publish never survive.
pub fn enrich_finals(mut finals: CompetitionFinals, index: &TeamIndex) -> CompetitionFinals {
    for bracket in [&mut finals.championnat, &mut finals.coupe] {
        for m in bracket.matches_mut() {
            enrich_bracket_match(m, index);
        }
    }
    finals
}

fn enrich_bracket_match(m: &mut BracketMatch, index: &TeamIndex) {
    let a = m.team_a_id.as_deref().and_then(|id| index.by_id(id));
    let b = m.team_b_id.as_deref().and_then(|id| index.by_id(id));
    m.team_a_name = a.map(|t| t.name.clone());
    m.team_a_logo_url = a.map(|t| t.logo_url.clone());
    m.team_b_name = b.map(|t| t.name.clone());
    m.team_b_logo_url = b.map(|t| t.logo_url.clone());
}

/// Both documents the public Navétane page needs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NavetanePageData {
    pub navetane: Snapshot<NavetaneBoard>,
    pub finals: Snapshot<CompetitionFinals>,
}

/// The publish actions, one per public view.
pub struct Publisher<'a> {
    store: &'a dyn DocumentStore,
    registry: TeamRegistry<'a>,
}

impl<'a> Publisher<'a> {
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store, registry: TeamRegistry::new(store) }
    }

    async fn team_index(&self) -> LeagueResult<TeamIndex> {
        Ok(TeamIndex::new(self.registry.refresh().await?))
    }

    pub async fn publish_navetane(&self) -> LeagueResult<Snapshot<NavetaneBoard>> {
        let index = self.team_index().await?;
        Publishable::<NavetaneBoard>::new(self.store)
            .publish(|board| enrich_board(board, &index))
            .await
    }

    pub async fn publish_finals(&self) -> LeagueResult<Snapshot<CompetitionFinals>> {
        let index = self.team_index().await?;
        Publishable::<CompetitionFinals>::new(self.store)
            .publish(|finals| enrich_finals(finals, &index))
            .await
    }

    pub async fn publish_teams(&self) -> LeagueResult<Snapshot<TeamRoster>> {
        Publishable::<TeamRoster>::new(self.store).publish(|roster| roster).await
    }

    pub async fn publish_sponsors(&self) -> LeagueResult<Snapshot<SponsorBoard>> {
        Publishable::<SponsorBoard>::new(self.store).publish(|board| board).await
    }

    pub async fn publish_stats(&self) -> LeagueResult<Snapshot<NavetaneStats>> {
        let index = self.team_index().await?;
        Publishable::<NavetaneStats>::new(self.store)
            .publish(|stats| enrich_stats(stats, &index))
            .await
    }

    /// Published statistics, or the admin copy when nothing readable was
    /// published yet, plus the published preliminary match. A failed
    /// preliminary match read only drops that part.
    pub async fn stats_page_data(&self) -> LeagueResult<StatsPageData> {
        let published = Publishable::<NavetaneStats>::new(self.store);
        let stats = match published.public().await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => Snapshot { view: published.draft().await?, last_published: None },
            Err(e) => {
                warn!("public statistics unreadable, showing the admin copy: {e}");
                Snapshot { view: published.draft().await?, last_published: None }
            }
        };
        let preliminary_match = match Publishable::<NavetaneBoard>::new(self.store).public().await {
            Ok(board) => board.and_then(|snapshot| snapshot.view.preliminary_match),
            Err(e) => {
                warn!("preliminary match unreadable for the statistics page: {e}");
                None
            }
        };
        Ok(StatsPageData { stats, preliminary_match })
    }

    /// Public reads only; never touches a draft collection.
    pub async fn navetane_page_data(&self) -> LeagueResult<NavetanePageData> {
        let board = Publishable::<NavetaneBoard>::new(self.store);
        let brackets = Publishable::<CompetitionFinals>::new(self.store);
        let (navetane, finals) = tokio::try_join!(board.public_or_default(), brackets.public_or_default())?;
        Ok(NavetanePageData { navetane, finals })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::{BracketMatchPatch, PreliminaryMatchPatch};
    use crate::registry::NewTeam;
    use crate::store::{Document, MemoryStore, Mutator};
    use crate::{Competition, LeagueError, PouleStats, Stage, Team, TeamData};
    use serde_json::{Value, json};

    async fn seed(store: &MemoryStore) -> (String, String) {
        let registry = TeamRegistry::new(store);
        let goree = registry.create(NewTeam { name: "Gorée".into(), logo_url: "goree.png".into() }).await.unwrap();
        let jaraaf = registry.create(NewTeam { name: "Jaraaf".into(), logo_url: "jaraaf.png".into() }).await.unwrap();
        (goree, jaraaf)
    }

    #[tokio::test]
    async fn drafts_stay_private_until_published() {
        let store = MemoryStore::new();
        seed(&store).await;
        let desk = NavetaneDesk::new(&store);
        desk.create_poule("Poule A").await.unwrap();

        let publisher = Publisher::new(&store);
        let before = publisher.navetane_page_data().await.unwrap();
        assert!(before.navetane.view.poules.is_empty());
        assert!(before.navetane.last_published.is_none());

        publisher.publish_navetane().await.unwrap();
        let after = publisher.navetane_page_data().await.unwrap();
        assert_eq!(after.navetane.view.poules[0].name, "Poule A");
        assert!(after.navetane.last_published.is_some());

        desk.create_poule("Poule B").await.unwrap();
        assert_eq!(publisher.navetane_page_data().await.unwrap().navetane.view.poules.len(), 1);
    }

    #[tokio::test]
    async fn cup_and_preliminary_resolve_by_name_with_fallback() {
        let store = MemoryStore::new();
        seed(&store).await;
        let desk = NavetaneDesk::new(&store);
        desk.create_coupe_match("Gorée", "ASC Fantôme").await.unwrap();
        desk.update_preliminary_match(PreliminaryMatchPatch {
            team_a: Some("Jaraaf".into()),
            team_b: Some("Gorée".into()),
            winner_plays_against: Some("Inconnu".into()),
        })
        .await
        .unwrap();

        let snapshot = Publisher::new(&store).publish_navetane().await.unwrap();
        let fixture = &snapshot.view.coupe_matches[0];
        assert_eq!(fixture.team_a_data.as_ref().unwrap().logo_url, "goree.png");
        assert_eq!(
            fixture.team_b_data,
            Some(TeamData { name: "ASC Fantôme".into(), logo_url: String::new() })
        );
        let prelim = snapshot.view.preliminary_match.unwrap();
        assert_eq!(prelim.team_a_data.unwrap().logo_url, "jaraaf.png");
        assert_eq!(prelim.winner_plays_against_data.unwrap().logo_url, "");
    }

    #[tokio::test]
    async fn poules_are_copied_verbatim() {
        let store = MemoryStore::new();
        seed(&store).await;
        let desk = NavetaneDesk::new(&store);
        let id = desk.create_poule("Poule A").await.unwrap();
        let stale = Team { id: "gone".into(), name: "Ancien Nom".into(), logo_url: String::new() };
        desk.add_team_to_poule(&id, &stale, PouleStats { points: 4, ..Default::default() }).await.unwrap();

        let snapshot = Publisher::new(&store).publish_navetane().await.unwrap();
        assert_eq!(snapshot.view.poules, desk.list_poules().await.unwrap());
    }

    #[tokio::test]
    async fn brackets_resolve_by_id_and_clear_deleted_teams() {
        let store = MemoryStore::new();
        let (goree, jaraaf) = seed(&store).await;
        let desk = NavetaneDesk::new(&store);
        let qf = desk.add_bracket_match(Competition::Coupe, Stage::Quarters).await.unwrap();
        let patch = BracketMatchPatch {
            team_a_id: Some(Some(goree.clone())),
            team_b_id: Some(Some(jaraaf.clone())),
            ..Default::default()
        };
        desk.update_bracket_match(Competition::Coupe, Stage::Quarters, &qf.id, patch).await.unwrap();
        desk.add_bracket_match(Competition::Championnat, Stage::Final).await.unwrap();

        let publisher = Publisher::new(&store);
        let first = publisher.publish_finals().await.unwrap();
        let m = &first.view.coupe.quarters[0];
        assert_eq!(m.team_a_name.as_deref(), Some("Gorée"));
        assert_eq!(m.team_b_logo_url.as_deref(), Some("jaraaf.png"));
        let tbd = &first.view.championnat.r#final[0];
        assert!(tbd.is_to_be_determined());
        assert!(tbd.team_a_name.is_none());

        TeamRegistry::new(&store).delete(&jaraaf).await.unwrap();
        let second = publisher.publish_finals().await.unwrap();
        let m = &second.view.coupe.quarters[0];
        assert_eq!(m.team_b_id.as_deref(), Some(jaraaf.as_str()));
        assert_eq!(m.team_b_name, None);
        assert_eq!(m.team_b_logo_url, None);
        assert_eq!(m.team_a_name.as_deref(), Some("Gorée"));
    }

    #[tokio::test]
    async fn publishing_twice_differs_only_in_timestamp() {
        let store = MemoryStore::new();
        seed(&store).await;
        NavetaneDesk::new(&store).create_coupe_match("Gorée", "Jaraaf").await.unwrap();
        let publisher = Publisher::new(&store);
        let first = publisher.publish_navetane().await.unwrap();
        let second = publisher.publish_navetane().await.unwrap();
        assert_eq!(first.view, second.view);
        assert!(second.last_published >= first.last_published);
    }

    #[tokio::test]
    async fn roster_is_published_sorted() {
        let store = MemoryStore::new();
        seed(&store).await;
        let snapshot = Publisher::new(&store).publish_teams().await.unwrap();
        let names: Vec<_> = snapshot.view.teams.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Gorée", "Jaraaf"]);
        let stored = store.get("teams_public_view", "live").await.unwrap().unwrap();
        assert!(stored.data.get("lastPublished").is_some());
        assert_eq!(stored.data["teams"][1]["name"], "Jaraaf");
    }

    /// Reads pass through; whole-document writes fail.
    struct RejectingSet(MemoryStore);

    #[async_trait]
    impl DocumentStore for RejectingSet {
        async fn get(&self, c: &str, id: &str) -> LeagueResult<Option<Document>> {
            self.0.get(c, id).await
        }
        async fn list(&self, c: &str, order: Option<&OrderBy>) -> LeagueResult<Vec<Document>> {
            self.0.list(c, order).await
        }
        async fn find_eq(&self, c: &str, f: &str, v: &Value) -> LeagueResult<Vec<Document>> {
            self.0.find_eq(c, f, v).await
        }
        async fn create(&self, c: &str, data: Value) -> LeagueResult<String> {
            self.0.create(c, data).await
        }
        async fn set(&self, c: &str, id: &str, _data: Value) -> LeagueResult<()> {
            Err(LeagueError::Conflict(format!("{c}/{id}")))
        }
        async fn merge(&self, c: &str, id: &str, patch: Value) -> LeagueResult<()> {
            self.0.merge(c, id, patch).await
        }
        async fn delete(&self, c: &str, id: &str) -> LeagueResult<()> {
            self.0.delete(c, id).await
        }
        async fn update_with(&self, c: &str, id: &str, m: Mutator<'_>) -> LeagueResult<Value> {
            self.0.update_with(c, id, m).await
        }
    }

    #[tokio::test]
    async fn page_data_reads_both_published_views() {
        let store = MemoryStore::new();
        seed(&store).await;
        let desk = NavetaneDesk::new(&store);
        desk.create_poule("Poule A").await.unwrap();
        desk.add_bracket_match(Competition::Championnat, Stage::Semis).await.unwrap();

        let publisher = Publisher::new(&store);
        publisher.publish_navetane().await.unwrap();
        publisher.publish_finals().await.unwrap();
        let page = publisher.navetane_page_data().await.unwrap();
        assert_eq!(page.navetane.view.poules.len(), 1);
        assert_eq!(page.finals.view.championnat.semis.len(), 1);
        assert!(page.finals.last_published.is_some());
    }

    #[tokio::test]
    async fn failed_write_keeps_previous_snapshot() {
        let inner = MemoryStore::new();
        let previous = json!({ "poules": [{ "name": "Poule A", "teams": [] }], "coupeMatches": [] });
        inner.set("navetane_public_views", "live", previous.clone()).await.unwrap();
        let store = RejectingSet(inner);
        NavetaneDesk::new(&store).create_poule("Poule Z").await.unwrap();

        assert!(Publisher::new(&store).publish_navetane().await.is_err());
        let live = store.get("navetane_public_views", "live").await.unwrap().unwrap();
        assert_eq!(live.data, previous);
    }
}
