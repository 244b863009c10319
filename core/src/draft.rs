use crate::store::{self, DocumentStore, FINALS_ADMIN, OrderBy, PRELIMINARY_MATCH, collections};
use crate::{
    BracketMatch, Competition, CompetitionFinals, CoupeMatch, LeagueError, LeagueResult, MatchStatus,
    Poule, PouleStats, PouleTeamRecord, PreliminaryMatch, Stage, Team,
};
use log::{debug, info};
use serde::Serialize;
use serde_json::{Value, json};

const BRACKET_ID_LEN: usize = 8;

// ---------------------------------------------------------------------------
// Patches: exactly the fields an admin may change
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoulePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// `Some(None)` clears the override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qualified_count: Option<Option<usize>>,
}

/// Changes to one team line of a poule. Setting `team` re-points the line
/// (and refreshes its name and logo snapshot).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PouleTeamPatch {
    pub team: Option<Team>,
    pub points: Option<i32>,
    pub played: Option<u32>,
    pub won: Option<u32>,
    pub drawn: Option<u32>,
    pub lost: Option<u32>,
    pub goals_for: Option<u32>,
    pub goals_against: Option<u32>,
    pub goal_balance: Option<i32>,
}

impl PouleTeamPatch {
    pub fn stats(stats: PouleStats) -> Self {
        Self {
            team: None,
            points: Some(stats.points),
            played: Some(stats.played),
            won: Some(stats.won),
            drawn: Some(stats.drawn),
            lost: Some(stats.lost),
            goals_for: Some(stats.goals_for),
            goals_against: Some(stats.goals_against),
            goal_balance: Some(stats.goal_balance),
        }
    }

    fn apply(&self, record: &mut PouleTeamRecord) {
        if let Some(team) = &self.team {
            record.id = team.id.clone();
            record.team = team.name.clone();
            record.logo_url = (!team.logo_url.is_empty()).then(|| team.logo_url.clone());
        }
        record.points = self.points.unwrap_or(record.points);
        record.played = self.played.unwrap_or(record.played);
        record.won = self.won.unwrap_or(record.won);
        record.drawn = self.drawn.unwrap_or(record.drawn);
        record.lost = self.lost.unwrap_or(record.lost);
        record.goals_for = self.goals_for.unwrap_or(record.goals_for);
        record.goals_against = self.goals_against.unwrap_or(record.goals_against);
        record.goal_balance = self.goal_balance.unwrap_or(record.goal_balance);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoupeMatchPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_a: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_b: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreliminaryMatchPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_a: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_b: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner_plays_against: Option<String>,
}

/// Inner `None` clears a field (e.g. un-assigning a team).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BracketMatchPatch {
    pub team_a_id: Option<Option<String>>,
    pub team_b_id: Option<Option<String>>,
    pub score_a: Option<Option<u32>>,
    pub score_b: Option<Option<u32>>,
    pub date: Option<Option<String>>,
    pub status: Option<MatchStatus>,
}

impl BracketMatchPatch {
    fn apply(&self, m: &mut BracketMatch) {
        if let Some(v) = &self.team_a_id {
            m.team_a_id = v.clone();
        }
        if let Some(v) = &self.team_b_id {
            m.team_b_id = v.clone();
        }
        if let Some(v) = self.score_a {
            m.score_a = v;
        }
        if let Some(v) = self.score_b {
            m.score_b = v;
        }
        if let Some(v) = &self.date {
            m.date = v.clone();
        }
        if let Some(v) = self.status {
            m.status = v;
        }
    }
}

// ---------------------------------------------------------------------------
// Desk
// ---------------------------------------------------------------------------

/// Admin-side editing of the draft competition documents. Nothing written
/// here is visible publicly until a publish.
pub struct NavetaneDesk<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> NavetaneDesk<'a> {
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    // --- poules ---

    pub async fn list_poules(&self) -> LeagueResult<Vec<Poule>> {
        store::load_all(self.store, collections::POULES, Some(&OrderBy::asc("name"))).await
    }

    pub async fn get_poule(&self, id: &str) -> LeagueResult<Poule> {
        store::load_required(self.store, collections::POULES, id).await
    }

    pub async fn create_poule(&self, name: &str) -> LeagueResult<String> {
        require("poule name", name)?;
        let poule = Poule { name: name.to_owned(), ..Poule::default() };
        let id = self.store.create(collections::POULES, store::encode(&poule)?).await?;
        info!("poule \"{name}\" created as {id}");
        Ok(id)
    }

    pub async fn update_poule(&self, id: &str, patch: PoulePatch) -> LeagueResult<()> {
        if let Some(name) = &patch.name {
            require("poule name", name)?;
        }
        store::merge_existing(self.store, collections::POULES, id, store::encode(&patch)?).await
    }

    pub async fn delete_poule(&self, id: &str) -> LeagueResult<()> {
        self.store.delete(collections::POULES, id).await
    }

    // --- teams inside a poule ---

    /// Append a team line. A team may appear only once per poule.
    pub async fn add_team_to_poule(&self, poule_id: &str, team: &Team, stats: PouleStats) -> LeagueResult<()> {
        let mut poule = self.get_poule(poule_id).await?;
        if poule.contains_team(&team.id) {
            return Err(LeagueError::validation(format!(
                "team \"{}\" is already in {}",
                team.name, poule.name
            )));
        }
        poule.teams.push(PouleTeamRecord::new(team, stats));
        self.write_teams(&poule).await
    }

    pub async fn update_team_in_poule(
        &self,
        poule_id: &str,
        team_id: &str,
        patch: PouleTeamPatch,
    ) -> LeagueResult<()> {
        let mut poule = self.get_poule(poule_id).await?;
        if let Some(team) = &patch.team
            && team.id != team_id
            && poule.contains_team(&team.id)
        {
            return Err(LeagueError::validation(format!(
                "team \"{}\" is already in {}",
                team.name, poule.name
            )));
        }
        let record = poule
            .teams
            .iter_mut()
            .find(|t| t.id == team_id)
            .ok_or_else(|| LeagueError::not_found(format!("team {team_id} in poule {poule_id}")))?;
        patch.apply(record);
        self.write_teams(&poule).await
    }

    pub async fn remove_team_from_poule(&self, poule_id: &str, team_id: &str) -> LeagueResult<()> {
        let mut poule = self.get_poule(poule_id).await?;
        let before = poule.teams.len();
        poule.teams.retain(|t| t.id != team_id);
        if poule.teams.len() == before {
            return Err(LeagueError::not_found(format!("team {team_id} in poule {poule_id}")));
        }
        self.write_teams(&poule).await
    }

    async fn write_teams(&self, poule: &Poule) -> LeagueResult<()> {
        debug!("rewriting {} team lines of {}", poule.teams.len(), poule.id);
        let teams = serde_json::to_value(&poule.teams)?;
        store::merge_existing(self.store, collections::POULES, &poule.id, json!({ "teams": teams })).await
    }

    // --- cup fixtures ---

    pub async fn list_coupe_matches(&self) -> LeagueResult<Vec<CoupeMatch>> {
        store::load_all(self.store, collections::COUPE_MATCHES, None).await
    }

    pub async fn create_coupe_match(&self, team_a: &str, team_b: &str) -> LeagueResult<String> {
        require("team A", team_a)?;
        require("team B", team_b)?;
        let fixture = CoupeMatch { team_a: team_a.to_owned(), team_b: team_b.to_owned(), ..CoupeMatch::default() };
        self.store.create(collections::COUPE_MATCHES, store::encode(&fixture)?).await
    }

    pub async fn update_coupe_match(&self, id: &str, patch: CoupeMatchPatch) -> LeagueResult<()> {
        for name in [&patch.team_a, &patch.team_b].into_iter().flatten() {
            require("team name", name)?;
        }
        store::merge_existing(self.store, collections::COUPE_MATCHES, id, store::encode(&patch)?).await
    }

    pub async fn delete_coupe_match(&self, id: &str) -> LeagueResult<()> {
        self.store.delete(collections::COUPE_MATCHES, id).await
    }

    // --- preliminary match ---

    pub async fn preliminary_match(&self) -> LeagueResult<Option<PreliminaryMatch>> {
        store::load_one(self.store, PRELIMINARY_MATCH.collection, PRELIMINARY_MATCH.id).await
    }

    /// Upsert, the only draft edit that creates its document; fields left
    /// `None` keep their stored value.
    pub async fn update_preliminary_match(&self, patch: PreliminaryMatchPatch) -> LeagueResult<()> {
        self.store
            .merge(PRELIMINARY_MATCH.collection, PRELIMINARY_MATCH.id, store::encode(&patch)?)
            .await
    }

    // --- finals ---

    pub async fn finals(&self) -> LeagueResult<CompetitionFinals> {
        Ok(store::load_one(self.store, FINALS_ADMIN.collection, FINALS_ADMIN.id)
            .await?
            .unwrap_or_default())
    }

    pub async fn save_finals(&self, finals: &CompetitionFinals) -> LeagueResult<()> {
        self.store
            .set(FINALS_ADMIN.collection, FINALS_ADMIN.id, store::encode(finals)?)
            .await
    }

    /// Append an empty pending match to a stage and return it.
    pub async fn add_bracket_match(&self, competition: Competition, stage: Stage) -> LeagueResult<BracketMatch> {
        let finals = self.finals().await?;
        let mut matches = finals.bracket(competition).stage(stage).to_vec();
        let created = BracketMatch::pending(store::new_id(BRACKET_ID_LEN));
        matches.push(created.clone());
        self.replace_stage(competition, stage, &matches).await?;
        Ok(created)
    }

    pub async fn update_bracket_match(
        &self,
        competition: Competition,
        stage: Stage,
        match_id: &str,
        patch: BracketMatchPatch,
    ) -> LeagueResult<BracketMatch> {
        let finals = self.finals().await?;
        let mut matches = finals.bracket(competition).stage(stage).to_vec();
        let target = matches
            .iter_mut()
            .find(|m| m.id == match_id)
            .ok_or_else(|| bracket_not_found(competition, stage, match_id))?;
        patch.apply(target);
        let updated = target.clone();
        self.replace_stage(competition, stage, &matches).await?;
        Ok(updated)
    }

    pub async fn remove_bracket_match(&self, competition: Competition, stage: Stage, match_id: &str) -> LeagueResult<()> {
        let finals = self.finals().await?;
        let mut matches = finals.bracket(competition).stage(stage).to_vec();
        let before = matches.len();
        matches.retain(|m| m.id != match_id);
        if matches.len() == before {
            return Err(bracket_not_found(competition, stage, match_id));
        }
        self.replace_stage(competition, stage, &matches).await
    }

    /// Replace one stage array in a single write. Other stages are untouched.
    pub async fn replace_stage(&self, competition: Competition, stage: Stage, matches: &[BracketMatch]) -> LeagueResult<()> {
        let mut inner = serde_json::Map::new();
        inner.insert(stage.key().to_owned(), serde_json::to_value(matches)?);
        let mut outer = serde_json::Map::new();
        outer.insert(competition.key().to_owned(), Value::Object(inner));
        self.store
            .merge(FINALS_ADMIN.collection, FINALS_ADMIN.id, Value::Object(outer))
            .await
    }
}

fn bracket_not_found(competition: Competition, stage: Stage, match_id: &str) -> LeagueError {
    LeagueError::not_found(format!("match {match_id} in {} {}", competition.key(), stage.key()))
}

fn require(what: &str, value: &str) -> LeagueResult<()> {
    if value.trim().is_empty() {
        return Err(LeagueError::validation(format!("{what} is required")));
    }
    Ok(())
}
