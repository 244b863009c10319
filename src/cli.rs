use crate::state::app_settings::Settings;
use anyhow::Context;
use log::info;
use navetane_core::draft::NavetaneDesk;
use navetane_core::publish::{Publishable, Publisher};
use navetane_core::standings::{QualificationPolicy, standings};
use navetane_core::stats::{MatchList, Ranking};
use navetane_core::store::{Backend, StoreConfig};
use navetane_core::{NavetaneBoard, Poule};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishTarget {
    Navetane,
    Finals,
    Teams,
    Stats,
    All,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Version,
    Publish(PublishTarget),
    Standings { draft: bool, json: bool },
}

/// `Ok(None)` means no arguments: start the viewer.
pub fn parse_args<I>(args: I) -> Result<Option<Command>, String>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let Some(arg) = args.next() else {
        return Ok(None);
    };

    let command = match arg.as_str() {
        "-h" | "--help" => Command::Help,
        "-V" | "--version" => Command::Version,
        "publish" => Command::Publish(PublishTarget::Navetane),
        "publish-finals" => Command::Publish(PublishTarget::Finals),
        "publish-teams" => Command::Publish(PublishTarget::Teams),
        "publish-stats" => Command::Publish(PublishTarget::Stats),
        "publish-all" => Command::Publish(PublishTarget::All),
        "standings" => {
            let (mut draft, mut json) = (false, false);
            for flag in args.by_ref() {
                match flag.as_str() {
                    "--draft" => draft = true,
                    "--json" => json = true,
                    other => return Err(format!("Unknown flag for standings: {other}")),
                }
            }
            Command::Standings { draft, json }
        }
        _ => return Err(format!("Unknown argument: {arg}")),
    };

    if let Some(extra) = args.next() {
        return Err(format!("Unexpected argument: {extra}"));
    }
    Ok(Some(command))
}

pub fn usage_text() -> &'static str {
    "navetane - Navétane league board

Usage:
  navetane                       open the viewer on the published views
  navetane publish               publish poules, cup fixtures and the preliminary match
  navetane publish-finals        publish both finals brackets
  navetane publish-teams         publish the team roster
  navetane publish-stats         publish the player rankings and result lists
  navetane publish-all           publish every public view, sponsors included
  navetane standings [--draft] [--json]
                                 print poule standings (published unless --draft)
  navetane --help
  navetane --version

Environment:
  NAVETANE_STORE_URL          Document gateway base URL
  NAVETANE_STORE_TOKEN        Bearer token for the gateway
  NAVETANE_STORE_FILE         JSON snapshot file used when no URL is set
  NAVETANE_QUALIFIED_DEFAULT  Teams qualifying from a poule without a rule (default 2)
  NAVETANE_LOG                Log level for the viewer's log pane (default error)
  NAVETANE_REFRESH_SECS       Viewer refresh period in seconds (default 60)"
}

pub async fn run(command: Command, settings: &Settings) -> anyhow::Result<()> {
    match command {
        Command::Help => println!("{}", usage_text()),
        Command::Version => println!("navetane {}", env!("CARGO_PKG_VERSION")),
        Command::Publish(target) => {
            if settings.store == StoreConfig::Memory {
                eprintln!("warning: no NAVETANE_STORE_URL or NAVETANE_STORE_FILE set; publishing to an empty in-memory store");
            }
            let backend = Backend::open(&settings.store).await.context("opening document store")?;
            for line in publish(&backend, target).await? {
                println!("{line}");
            }
            backend.flush().await.context("saving document store")?;
        }
        Command::Standings { draft, json } => {
            let backend = Backend::open(&settings.store).await.context("opening document store")?;
            let poules = if draft {
                NavetaneDesk::new(backend.store()).list_poules().await?
            } else {
                let snapshot = Publishable::<NavetaneBoard>::new(backend.store()).public_or_default().await?;
                snapshot.view.poules
            };
            let tables = standings_tables(&poules, &settings.qualification);
            if json {
                println!("{}", serde_json::to_string_pretty(&tables)?);
            } else {
                print!("{}", render_tables(&tables));
            }
        }
    }
    Ok(())
}

/// Runs the publish actions for `target` and describes what was written.
pub async fn publish(backend: &Backend, target: PublishTarget) -> anyhow::Result<Vec<String>> {
    let publisher = Publisher::new(backend.store());
    let mut report = Vec::new();

    if matches!(target, PublishTarget::Navetane | PublishTarget::All) {
        let snapshot = publisher.publish_navetane().await.context("publishing the navétane view")?;
        report.push(format!(
            "navetane: {} poules, {} cup fixtures, preliminary match {}",
            snapshot.view.poules.len(),
            snapshot.view.coupe_matches.len(),
            if snapshot.view.preliminary_match.is_some() { "set" } else { "unset" },
        ));
    }
    if matches!(target, PublishTarget::Finals | PublishTarget::All) {
        let snapshot = publisher.publish_finals().await.context("publishing the finals view")?;
        let count = |b: &navetane_core::FinalsBracket| b.quarters.len() + b.semis.len() + b.r#final.len();
        report.push(format!(
            "finals: {} championnat matches, {} coupe matches",
            count(&snapshot.view.championnat),
            count(&snapshot.view.coupe),
        ));
    }
    if matches!(target, PublishTarget::Teams | PublishTarget::All) {
        let snapshot = publisher.publish_teams().await.context("publishing the team roster")?;
        report.push(format!("teams: {} teams", snapshot.view.teams.len()));
    }
    if matches!(target, PublishTarget::Stats | PublishTarget::All) {
        let snapshot = publisher.publish_stats().await.context("publishing the statistics")?;
        let players: usize = Ranking::ALL.iter().map(|r| snapshot.view.ranking(*r).len()).sum();
        report.push(format!(
            "stats: {players} ranked players, {} results, {} upcoming",
            snapshot.view.matches(MatchList::LastResults).len(),
            snapshot.view.matches(MatchList::Upcoming).len(),
        ));
    }
    if target == PublishTarget::All {
        let snapshot = publisher.publish_sponsors().await.context("publishing the sponsor list")?;
        report.push(format!("sponsors: {} sponsors", snapshot.view.sponsors.len()));
    }

    info!("published {target:?}");
    Ok(report)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StandingsTable {
    pub poule: String,
    pub qualified_count: usize,
    pub rows: Vec<StandingRow>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StandingRow {
    pub rank: usize,
    pub team: String,
    pub points: i32,
    pub played: u32,
    pub won: u32,
    pub drawn: u32,
    pub lost: u32,
    pub goals_for: u32,
    pub goals_against: u32,
    pub goal_balance: i32,
    pub qualified: bool,
}

pub fn standings_tables(poules: &[Poule], policy: &QualificationPolicy) -> Vec<StandingsTable> {
    poules
        .iter()
        .map(|poule| StandingsTable {
            poule: poule.name.clone(),
            qualified_count: policy.qualified_count(poule),
            rows: standings(poule, policy)
                .into_iter()
                .map(|s| StandingRow {
                    rank: s.rank,
                    team: s.record.team,
                    points: s.record.points,
                    played: s.record.played,
                    won: s.record.won,
                    drawn: s.record.drawn,
                    lost: s.record.lost,
                    goals_for: s.record.goals_for,
                    goals_against: s.record.goals_against,
                    goal_balance: s.record.goal_balance,
                    qualified: s.qualified,
                })
                .collect(),
        })
        .collect()
}

fn render_tables(tables: &[StandingsTable]) -> String {
    if tables.is_empty() {
        return "no poules\n".to_string();
    }
    let mut out = String::new();
    for table in tables {
        out.push_str(&format!("{} ({} qualify)\n", table.poule, table.qualified_count));
        out.push_str("   #  Team                  Pts  MJ   G   N   P  BP  BC  Diff\n");
        for row in &table.rows {
            let marker = if row.qualified { '*' } else { ' ' };
            let team: String = row.team.chars().take(20).collect();
            out.push_str(&format!(
                "{marker}{:>3}  {team:<20} {:>4} {:>3} {:>3} {:>3} {:>3} {:>3} {:>3} {:>+5}\n",
                row.rank, row.points, row.played, row.won, row.drawn, row.lost, row.goals_for,
                row.goals_against, row.goal_balance,
            ));
        }
        out.push('\n');
    }
    out
}
