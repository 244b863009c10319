//! Player rankings and the result/fixture lists of the statistics page.
//!
//! The admin copy is a single document edited in place; publishing copies it
//! to the public document the same way the other views do.
use crate::publish::{Aggregate, Snapshot};
use crate::registry::TeamIndex;
use crate::store::{self, DocRef, DocumentStore, STATS_ADMIN, STATS_PUBLIC_VIEW};
use crate::{LeagueError, LeagueResult, PreliminaryMatch, Team};
use async_trait::async_trait;
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRank {
    /// 1-based position in its ranking, kept equal to the list order.
    pub rank: u32,
    pub name: String,
    #[serde(default)]
    pub team_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_logo_url: Option<String>,
    /// Points for the player awards, goals for the scorer tables.
    #[serde(default)]
    pub points: u32,
}

/// A result or upcoming fixture, entered by hand by the admin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsMatch {
    #[serde(default)]
    pub team_a: String,
    #[serde(default)]
    pub score_a: u32,
    #[serde(default)]
    pub team_b: String,
    #[serde(default)]
    pub score_b: u32,
    #[serde(default)]
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poule: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stadium: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time2: Option<String>,
    #[serde(default, rename = "teamALogoUrl", skip_serializing_if = "Option::is_none")]
    pub team_a_logo_url: Option<String>,
    #[serde(default, rename = "teamBLogoUrl", skip_serializing_if = "Option::is_none")]
    pub team_b_logo_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ranking {
    BallonDor,
    GoldenBoy,
    TopScorersChampionnat,
    TopScorersCoupe,
}

impl Ranking {
    pub const ALL: [Ranking; 4] = [
        Ranking::BallonDor,
        Ranking::GoldenBoy,
        Ranking::TopScorersChampionnat,
        Ranking::TopScorersCoupe,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Ranking::BallonDor => "Ballon d'Or",
            Ranking::GoldenBoy => "Golden Boy (U20)",
            Ranking::TopScorersChampionnat => "Meilleurs Buteurs (Championnat)",
            Ranking::TopScorersCoupe => "Meilleurs Buteurs (Coupe)",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Ranking::BallonDor | Ranking::GoldenBoy => "points",
            Ranking::TopScorersChampionnat | Ranking::TopScorersCoupe => "buts",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchList {
    LastResults,
    Upcoming,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavetaneStats {
    #[serde(default)]
    pub ballon_dor: Vec<PlayerRank>,
    #[serde(default)]
    pub golden_boy: Vec<PlayerRank>,
    #[serde(default)]
    pub top_scorers_championnat: Vec<PlayerRank>,
    #[serde(default)]
    pub top_scorers_coupe: Vec<PlayerRank>,
    #[serde(default)]
    pub last_results: Vec<StatsMatch>,
    #[serde(default)]
    pub upcoming_matches: Vec<StatsMatch>,
}

impl NavetaneStats {
    pub fn ranking(&self, ranking: Ranking) -> &[PlayerRank] {
        match ranking {
            Ranking::BallonDor => &self.ballon_dor,
            Ranking::GoldenBoy => &self.golden_boy,
            Ranking::TopScorersChampionnat => &self.top_scorers_championnat,
            Ranking::TopScorersCoupe => &self.top_scorers_coupe,
        }
    }

    pub fn ranking_mut(&mut self, ranking: Ranking) -> &mut Vec<PlayerRank> {
        match ranking {
            Ranking::BallonDor => &mut self.ballon_dor,
            Ranking::GoldenBoy => &mut self.golden_boy,
            Ranking::TopScorersChampionnat => &mut self.top_scorers_championnat,
            Ranking::TopScorersCoupe => &mut self.top_scorers_coupe,
        }
    }

    pub fn matches(&self, list: MatchList) -> &[StatsMatch] {
        match list {
            MatchList::LastResults => &self.last_results,
            MatchList::Upcoming => &self.upcoming_matches,
        }
    }

    fn matches_mut(&mut self, list: MatchList) -> &mut Vec<StatsMatch> {
        match list {
            MatchList::LastResults => &mut self.last_results,
            MatchList::Upcoming => &mut self.upcoming_matches,
        }
    }

    fn renumber(&mut self) {
        for ranking in Ranking::ALL {
            for (idx, player) in self.ranking_mut(ranking).iter_mut().enumerate() {
                player.rank = idx as u32 + 1;
            }
        }
    }
}

#[async_trait]
impl Aggregate for NavetaneStats {
    const PUBLIC: DocRef = STATS_PUBLIC_VIEW;

    async fn load_draft(store: &dyn DocumentStore) -> LeagueResult<Self> {
        StatsDesk::new(store).stats().await
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewPlayerRank {
    pub name: String,
    pub team: Option<Team>,
    pub points: u32,
}

/// `None` leaves the stored value. Setting `team` also refreshes the
/// team name snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerRankPatch {
    pub name: Option<String>,
    pub team: Option<Team>,
    pub points: Option<u32>,
}

impl PlayerRankPatch {
    fn apply(&self, player: &mut PlayerRank) {
        if let Some(name) = &self.name {
            player.name = name.clone();
        }
        if let Some(team) = &self.team {
            set_team(player, team);
        }
        if let Some(points) = self.points {
            player.points = points;
        }
    }
}

fn set_team(player: &mut PlayerRank, team: &Team) {
    player.team_id = team.id.clone();
    player.team_name = Some(team.name.clone());
}

/// Edits the admin copy of the statistics.
pub struct StatsDesk<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> StatsDesk<'a> {
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    pub async fn stats(&self) -> LeagueResult<NavetaneStats> {
        Ok(store::load_one(self.store, STATS_ADMIN.collection, STATS_ADMIN.id)
            .await?
            .unwrap_or_default())
    }

    /// Replace the whole admin copy. Ranks are renumbered from list order.
    pub async fn save(&self, stats: &NavetaneStats) -> LeagueResult<()> {
        let mut stats = stats.clone();
        stats.renumber();
        self.store
            .set(STATS_ADMIN.collection, STATS_ADMIN.id, store::encode(&stats)?)
            .await
    }

    /// Append a player at the bottom of `ranking`.
    pub async fn add_player(&self, ranking: Ranking, player: NewPlayerRank) -> LeagueResult<PlayerRank> {
        require_player_name(&player.name)?;
        let stats = self
            .edit(&|stats: &mut NavetaneStats| {
                let mut record = PlayerRank { name: player.name.clone(), points: player.points, ..Default::default() };
                if let Some(team) = &player.team {
                    set_team(&mut record, team);
                }
                stats.ranking_mut(ranking).push(record);
                Ok(())
            })
            .await?;
        let added = stats.ranking(ranking).last().cloned().unwrap_or_default();
        info!("{} #{}: {}", ranking.label(), added.rank, added.name);
        Ok(added)
    }

    pub async fn update_player(&self, ranking: Ranking, rank: u32, patch: PlayerRankPatch) -> LeagueResult<PlayerRank> {
        if let Some(name) = &patch.name {
            require_player_name(name)?;
        }
        let stats = self
            .edit(&|stats: &mut NavetaneStats| {
                let player = player_at(stats.ranking_mut(ranking), ranking, rank)?;
                patch.apply(player);
                Ok(())
            })
            .await?;
        let mut players = stats.ranking(ranking).to_vec();
        Ok(player_at(&mut players, ranking, rank)?.clone())
    }

    /// Remove the player at `rank`; the players below move up one place.
    pub async fn remove_player(&self, ranking: Ranking, rank: u32) -> LeagueResult<()> {
        self.edit(&|stats: &mut NavetaneStats| {
            let players = stats.ranking_mut(ranking);
            player_at(players, ranking, rank)?;
            players.remove(rank as usize - 1);
            Ok(())
        })
        .await?;
        Ok(())
    }

    pub async fn replace_matches(&self, list: MatchList, matches: Vec<StatsMatch>) -> LeagueResult<()> {
        self.edit(&|stats: &mut NavetaneStats| {
            *stats.matches_mut(list) = matches.clone();
            Ok(())
        })
        .await?;
        Ok(())
    }

    /// Atomic read-modify-write of the admin document. A missing document
    /// starts out empty.
    async fn edit(
        &self,
        apply: &(dyn Fn(&mut NavetaneStats) -> LeagueResult<()> + Send + Sync),
    ) -> LeagueResult<NavetaneStats> {
        let mutator = |current: Option<&Value>| -> LeagueResult<Value> {
            let mut stats: NavetaneStats = match current {
                Some(value) => serde_json::from_value(value.clone())?,
                None => NavetaneStats::default(),
            };
            apply(&mut stats)?;
            stats.renumber();
            store::encode(&stats)
        };
        let written = self.store.update_with(STATS_ADMIN.collection, STATS_ADMIN.id, &mutator).await?;
        Ok(serde_json::from_value(written)?)
    }
}

fn player_at(players: &mut [PlayerRank], ranking: Ranking, rank: u32) -> LeagueResult<&mut PlayerRank> {
    let idx = (rank as usize).checked_sub(1);
    idx.and_then(|idx| players.get_mut(idx))
        .ok_or_else(|| LeagueError::not_found(format!("rank {rank} in {}", ranking.label())))
}

fn require_player_name(name: &str) -> LeagueResult<()> {
    if name.trim().is_empty() {
        return Err(LeagueError::validation("player name is required"));
    }
    Ok(())
}

/// Players resolve their team by id. A team that no longer resolves keeps
/// the name captured when it was picked and loses its logo. Match lines
/// resolve logos by team name.
pub fn enrich_stats(mut stats: NavetaneStats, index: &TeamIndex) -> NavetaneStats {
    for ranking in Ranking::ALL {
        for player in stats.ranking_mut(ranking) {
            match index.by_id(&player.team_id) {
                Some(team) => {
                    player.team_name = Some(team.name.clone());
                    player.team_logo_url = Some(team.logo_url.clone());
                }
                None => player.team_logo_url = None,
            }
        }
    }
    for m in stats.last_results.iter_mut().chain(stats.upcoming_matches.iter_mut()) {
        m.team_a_logo_url = index.by_name(&m.team_a).map(|t| t.logo_url.clone());
        m.team_b_logo_url = index.by_name(&m.team_b).map(|t| t.logo_url.clone());
    }
    stats
}

/// What the public statistics page shows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsPageData {
    /// `last_published` is `None` when the page fell back to the admin copy.
    pub stats: Snapshot<NavetaneStats>,
    pub preliminary_match: Option<PreliminaryMatch>,
}
