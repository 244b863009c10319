use crate::cache::ListCache;
use crate::store::{self, DocumentStore, OrderBy, collections};
use crate::{LeagueError, LeagueResult, Team, TeamData};
use log::{debug, info};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTeam {
    pub name: String,
    pub logo_url: String,
}

/// Fields an admin may change on a team. `None` leaves the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
}

/// The canonical list of clubs.
///
/// Deleting a team does not touch poules, cup fixtures or brackets that
/// mention it; those fall back to placeholder data when published.
pub struct TeamRegistry<'a> {
    store: &'a dyn DocumentStore,
    cache: ListCache<Team>,
}

impl<'a> TeamRegistry<'a> {
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store, cache: ListCache::new() }
    }

    /// All teams ordered by name, served from the cache when warm.
    pub async fn list(&self) -> LeagueResult<Vec<Team>> {
        if let Some(teams) = self.cache.get().await {
            return Ok(teams);
        }
        self.refresh().await
    }

    /// Reload from the store regardless of the cache.
    pub async fn refresh(&self) -> LeagueResult<Vec<Team>> {
        let teams: Vec<Team> =
            store::load_all(self.store, collections::TEAMS, Some(&OrderBy::asc("name"))).await?;
        debug!("loaded {} teams", teams.len());
        self.cache.fill(teams.clone()).await;
        Ok(teams)
    }

    pub async fn get(&self, id: &str) -> LeagueResult<Option<Team>> {
        store::load_one(self.store, collections::TEAMS, id).await
    }

    pub async fn index(&self) -> LeagueResult<TeamIndex> {
        Ok(TeamIndex::new(self.list().await?))
    }

    pub async fn create(&self, team: NewTeam) -> LeagueResult<String> {
        require_name(&team.name)?;
        let id = self.store.create(collections::TEAMS, store::encode(&team)?).await?;
        self.cache.invalidate().await;
        info!("team \"{}\" created as {id}", team.name);
        Ok(id)
    }

    pub async fn update(&self, id: &str, patch: TeamPatch) -> LeagueResult<()> {
        if let Some(name) = &patch.name {
            require_name(name)?;
        }
        store::merge_existing(self.store, collections::TEAMS, id, store::encode(&patch)?).await?;
        self.cache.invalidate().await;
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> LeagueResult<()> {
        self.store.delete(collections::TEAMS, id).await?;
        self.cache.invalidate().await;
        info!("team {id} deleted");
        Ok(())
    }
}

fn require_name(name: &str) -> LeagueResult<()> {
    if name.trim().is_empty() {
        return Err(LeagueError::validation("team name is required"));
    }
    Ok(())
}

/// Lookup table used while enriching public views.
#[derive(Debug, Clone, Default)]
pub struct TeamIndex {
    teams: Vec<Team>,
    by_id: HashMap<String, usize>,
    by_name: HashMap<String, usize>,
}

impl TeamIndex {
    pub fn new(teams: Vec<Team>) -> Self {
        let mut by_id = HashMap::with_capacity(teams.len());
        let mut by_name = HashMap::with_capacity(teams.len());
        for (i, team) in teams.iter().enumerate() {
            by_id.insert(team.id.clone(), i);
            // First team wins on duplicate names.
            by_name.entry(team.name.clone()).or_insert(i);
        }
        Self { teams, by_id, by_name }
    }

    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    pub fn by_id(&self, id: &str) -> Option<&Team> {
        self.by_id.get(id).map(|&i| &self.teams[i])
    }

    pub fn by_name(&self, name: &str) -> Option<&Team> {
        self.by_name.get(name).map(|&i| &self.teams[i])
    }

    /// Display data for a team referenced by name. Unknown names resolve to
    /// the raw name with an empty logo.
    pub fn team_data(&self, name: &str) -> TeamData {
        self.by_name(name)
            .map(Team::data)
            .unwrap_or_else(|| TeamData { name: name.to_owned(), logo_url: String::new() })
    }
}
