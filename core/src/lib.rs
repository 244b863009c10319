pub mod articles;
pub mod cache;
pub mod draft;
pub mod error;
pub mod publish;
pub mod registry;
pub mod sponsors;
pub mod standings;
pub mod stats;
pub mod store;

pub use error::{LeagueError, LeagueResult};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Domain types: document shapes shared by draft and public copies
// ---------------------------------------------------------------------------

/// A club in the Team Registry. Poules, cup fixtures and brackets only
/// ever reference teams; they never own them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub logo_url: String,
}

impl Team {
    pub fn data(&self) -> TeamData {
        TeamData { name: self.name.clone(), logo_url: self.logo_url.clone() }
    }
}

/// Display snapshot of a team, resolved at publish time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamData {
    pub name: String,
    #[serde(default)]
    pub logo_url: String,
}

/// One team's line in a poule table. The name and logo are a snapshot taken
/// when the admin added the team, so the poule renders without a registry join.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PouleTeamRecord {
    pub id: String, // team id in the registry
    pub team: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    #[serde(default, rename = "pts")]
    pub points: i32,
    #[serde(default, rename = "mj")]
    pub played: u32,
    #[serde(default, rename = "g")]
    pub won: u32,
    #[serde(default, rename = "n")]
    pub drawn: u32,
    #[serde(default, rename = "p")]
    pub lost: u32,
    #[serde(default, rename = "bp")]
    pub goals_for: u32,
    #[serde(default, rename = "bc")]
    pub goals_against: u32,
    #[serde(default, rename = "diff")]
    pub goal_balance: i32,
}

/// Admin-entered statistics for a team inside a poule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PouleStats {
    pub points: i32,
    pub played: u32,
    pub won: u32,
    pub drawn: u32,
    pub lost: u32,
    pub goals_for: u32,
    pub goals_against: u32,
    pub goal_balance: i32,
}

impl PouleTeamRecord {
    pub fn new(team: &Team, stats: PouleStats) -> Self {
        let logo_url = (!team.logo_url.is_empty()).then(|| team.logo_url.clone());
        Self {
            id: team.id.clone(),
            team: team.name.clone(),
            logo_url,
            points: stats.points,
            played: stats.played,
            won: stats.won,
            drawn: stats.drawn,
            lost: stats.lost,
            goals_for: stats.goals_for,
            goals_against: stats.goals_against,
            goal_balance: stats.goal_balance,
        }
    }
}

/// A round-robin group. Team entries are unique by team id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Poule {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub teams: Vec<PouleTeamRecord>,
    /// How many teams qualify from this poule. `None` defers to the
    /// league-wide qualification policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualified_count: Option<usize>,
}

impl Poule {
    pub fn contains_team(&self, team_id: &str) -> bool {
        self.teams.iter().any(|t| t.id == team_id)
    }
}

/// A "Coupe du Maire" fixture. Teams are referenced by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoupeMatch {
    #[serde(default)]
    pub id: String,
    pub team_a: String,
    pub team_b: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_a_data: Option<TeamData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_b_data: Option<TeamData>,
}

/// The single play-in fixture; its winner meets `winner_plays_against`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreliminaryMatch {
    #[serde(default)]
    pub team_a: String,
    #[serde(default)]
    pub team_b: String,
    #[serde(default)]
    pub winner_plays_against: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_a_data: Option<TeamData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_b_data: Option<TeamData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner_plays_against_data: Option<TeamData>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    #[default]
    Pending,
    Played,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    A,
    B,
}

/// A knockout fixture. Teams are referenced by registry id; the name and
/// logo fields are only filled in on the published copy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BracketMatch {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_a_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_b_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_a_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_b_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_a_logo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_b_logo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_a: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_b: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default)]
    pub status: MatchStatus,
}

impl BracketMatch {
    pub fn pending(id: impl Into<String>) -> Self {
        Self { id: id.into(), ..Self::default() }
    }

    /// No team assigned yet on either side.
    pub fn is_to_be_determined(&self) -> bool {
        self.team_a_id.is_none() && self.team_b_id.is_none()
    }

    /// Display-only: the side with the higher score of a played match.
    /// Nothing here is checked against the next stage's entrants.
    pub fn winner_side(&self) -> Option<Side> {
        if self.status != MatchStatus::Played {
            return None;
        }
        let (a, b) = self.score_a.zip(self.score_b)?;
        match a.cmp(&b) {
            std::cmp::Ordering::Greater => Some(Side::A),
            std::cmp::Ordering::Less => Some(Side::B),
            std::cmp::Ordering::Equal => None,
        }
    }
}

/// Knockout stage, ordered from earliest to latest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    #[default]
    Quarters,
    Semis,
    Final,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Quarters, Stage::Semis, Stage::Final];

    pub fn label(&self) -> &'static str {
        match self {
            Stage::Quarters => "Quarts de finale",
            Stage::Semis => "Demi-finales",
            Stage::Final => "Finale",
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Stage::Quarters => "quarters",
            Stage::Semis => "semis",
            Stage::Final => "final",
        }
    }

    pub fn prev(self) -> Option<Self> {
        match self {
            Stage::Quarters => None,
            Stage::Semis => Some(Stage::Quarters),
            Stage::Final => Some(Stage::Semis),
        }
    }

    pub fn next(self) -> Option<Self> {
        match self {
            Stage::Quarters => Some(Stage::Semis),
            Stage::Semis => Some(Stage::Final),
            Stage::Final => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Competition {
    #[default]
    Championnat,
    Coupe,
}

impl Competition {
    pub fn label(&self) -> &'static str {
        match self {
            Competition::Championnat => "Championnat",
            Competition::Coupe => "Coupe du Maire",
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Competition::Championnat => "championnat",
            Competition::Coupe => "coupe",
        }
    }

    pub fn toggle(self) -> Self {
        match self {
            Competition::Championnat => Competition::Coupe,
            Competition::Coupe => Competition::Championnat,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalsBracket {
    #[serde(default)]
    pub quarters: Vec<BracketMatch>,
    #[serde(default)]
    pub semis: Vec<BracketMatch>,
    #[serde(default)]
    pub r#final: Vec<BracketMatch>,
}

impl FinalsBracket {
    pub fn stage(&self, stage: Stage) -> &[BracketMatch] {
        match stage {
            Stage::Quarters => &self.quarters,
            Stage::Semis => &self.semis,
            Stage::Final => &self.r#final,
        }
    }

    pub fn stage_mut(&mut self, stage: Stage) -> &mut Vec<BracketMatch> {
        match stage {
            Stage::Quarters => &mut self.quarters,
            Stage::Semis => &mut self.semis,
            Stage::Final => &mut self.r#final,
        }
    }

    pub fn matches_mut(&mut self) -> impl Iterator<Item = &mut BracketMatch> {
        self.quarters
            .iter_mut()
            .chain(self.semis.iter_mut())
            .chain(self.r#final.iter_mut())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetitionFinals {
    #[serde(default)]
    pub championnat: FinalsBracket,
    #[serde(default)]
    pub coupe: FinalsBracket,
}

impl CompetitionFinals {
    pub fn bracket(&self, competition: Competition) -> &FinalsBracket {
        match competition {
            Competition::Championnat => &self.championnat,
            Competition::Coupe => &self.coupe,
        }
    }

    pub fn bracket_mut(&mut self, competition: Competition) -> &mut FinalsBracket {
        match competition {
            Competition::Championnat => &mut self.championnat,
            Competition::Coupe => &mut self.coupe,
        }
    }
}

/// Everything the public Navétane page shows apart from the finals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavetaneBoard {
    #[serde(default)]
    pub poules: Vec<Poule>,
    #[serde(default)]
    pub coupe_matches: Vec<CoupeMatch>,
    #[serde(default)]
    pub preliminary_match: Option<PreliminaryMatch>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamRoster {
    #[serde(default)]
    pub teams: Vec<Team>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn poule_record_uses_short_column_names() {
        let record: PouleTeamRecord = serde_json::from_value(json!({
            "id": "t1", "team": "ASC Jaraaf", "pts": 7, "mj": 3, "g": 2, "n": 1, "p": 0,
            "bp": 5, "bc": 1, "diff": 4
        }))
        .unwrap();
        assert_eq!(record.points, 7);
        assert_eq!(record.played, 3);
        assert_eq!(record.goal_balance, 4);
        assert!(record.logo_url.is_none());
    }

    #[test]
    fn bracket_without_teams_is_to_be_determined() {
        let m = BracketMatch::pending("qf1");
        assert!(m.is_to_be_determined());
        assert_eq!(m.status, MatchStatus::Pending);
        assert_eq!(m.winner_side(), None);
    }

    #[test]
    fn winner_side_needs_played_status_and_both_scores() {
        let mut m = BracketMatch {
            id: "sf1".into(),
            team_a_id: Some("a".into()),
            team_b_id: Some("b".into()),
            score_a: Some(2),
            score_b: Some(1),
            ..Default::default()
        };
        assert_eq!(m.winner_side(), None);
        m.status = MatchStatus::Played;
        assert_eq!(m.winner_side(), Some(Side::A));
        m.score_b = Some(2);
        assert_eq!(m.winner_side(), None);
        m.score_b = None;
        assert_eq!(m.winner_side(), None);
    }

    #[test]
    fn finals_bracket_missing_stages_default_to_empty() {
        let finals: CompetitionFinals = serde_json::from_value(json!({
            "championnat": { "quarters": [{ "id": "qf1", "status": "played" }] }
        }))
        .unwrap();
        assert_eq!(finals.championnat.quarters.len(), 1);
        assert!(finals.championnat.r#final.is_empty());
        assert!(finals.coupe.semis.is_empty());
    }

    #[test]
    fn final_stage_serializes_under_final_key() {
        let mut bracket = FinalsBracket::default();
        bracket.stage_mut(Stage::Final).push(BracketMatch::pending("f"));
        let value = serde_json::to_value(&bracket).unwrap();
        assert_eq!(value["final"][0]["id"], "f");
        assert_eq!(value["final"][0]["status"], "pending");
    }

    #[test]
    fn stage_navigation() {
        assert_eq!(Stage::Quarters.next(), Some(Stage::Semis));
        assert_eq!(Stage::Final.next(), None);
        assert_eq!(Stage::Quarters.prev(), None);
        assert!(Stage::Quarters < Stage::Final);
        assert_eq!(Competition::Coupe.toggle(), Competition::Championnat);
    }
}
