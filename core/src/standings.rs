// Ranking of a poule's team records for display.

use crate::{Poule, PouleTeamRecord};
use std::collections::HashMap;

pub const DEFAULT_QUALIFIED: usize = 2;

/// Decides how many teams qualify out of a poule.
///
/// An explicit `qualified_count` on the poule wins; otherwise a rule keyed by
/// poule name applies, then the league-wide default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualificationPolicy {
    pub default_count: usize,
    pub named: HashMap<String, usize>,
}

impl Default for QualificationPolicy {
    fn default() -> Self {
        let named = [("Poule A", 3), ("Poule B", 3)]
            .into_iter()
            .map(|(name, count)| (name.to_owned(), count))
            .collect();
        Self { default_count: DEFAULT_QUALIFIED, named }
    }
}

impl QualificationPolicy {
    pub fn with_default(mut self, count: usize) -> Self {
        self.default_count = count;
        self
    }

    pub fn with_rule(mut self, poule_name: impl Into<String>, count: usize) -> Self {
        self.named.insert(poule_name.into(), count);
        self
    }

    pub fn qualified_count(&self, poule: &Poule) -> usize {
        poule
            .qualified_count
            .or_else(|| self.named.get(&poule.name).copied())
            .unwrap_or(self.default_count)
    }
}

/// A ranked line of a poule table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Standing {
    pub rank: usize,
    pub record: PouleTeamRecord,
    pub qualified: bool,
}

/// Rank a poule by points, highest first. Ties keep their stored order.
pub fn standings(poule: &Poule, policy: &QualificationPolicy) -> Vec<Standing> {
    let mut records = poule.teams.clone();
    // sort_by is stable
    records.sort_by(|a, b| b.points.cmp(&a.points));

    let cutoff = policy.qualified_count(poule);
    records
        .into_iter()
        .enumerate()
        .map(|(i, record)| Standing { rank: i + 1, record, qualified: i < cutoff })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, points: i32) -> PouleTeamRecord {
        PouleTeamRecord { id: id.into(), team: id.to_uppercase(), points, ..Default::default() }
    }

    fn poule(name: &str, teams: Vec<PouleTeamRecord>) -> Poule {
        Poule { id: "p".into(), name: name.into(), teams, qualified_count: None }
    }

    fn ids(table: &[Standing]) -> Vec<&str> {
        table.iter().map(|s| s.record.id.as_str()).collect()
    }

    #[test]
    fn ties_keep_input_order_and_poule_a_qualifies_three() {
        let p = poule("Poule A", vec![record("t1", 4), record("t2", 9), record("t3", 9)]);
        let table = standings(&p, &QualificationPolicy::default());
        assert_eq!(ids(&table), vec!["t2", "t3", "t1"]);
        assert!(table.iter().all(|s| s.qualified));
        assert_eq!(table.iter().map(|s| s.rank).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn other_poules_qualify_two() {
        let p = poule("Poule C", vec![record("a", 1), record("b", 7), record("c", 3), record("d", 0)]);
        let table = standings(&p, &QualificationPolicy::default());
        assert_eq!(ids(&table), vec!["b", "c", "a", "d"]);
        let qualified: Vec<_> = table.iter().map(|s| s.qualified).collect();
        assert_eq!(qualified, vec![true, true, false, false]);
    }

    #[test]
    fn named_rule_matches_exact_name_only() {
        let policy = QualificationPolicy::default();
        assert_eq!(policy.qualified_count(&poule("Poule B", vec![])), 3);
        assert_eq!(policy.qualified_count(&poule("poule a", vec![])), 2);
    }

    #[test]
    fn explicit_count_overrides_rules() {
        let mut p = poule("Poule A", vec![record("a", 3), record("b", 2), record("c", 1)]);
        p.qualified_count = Some(1);
        let table = standings(&p, &QualificationPolicy::default());
        assert_eq!(table.iter().filter(|s| s.qualified).count(), 1);
    }

    #[test]
    fn configurable_default_and_rules() {
        let policy = QualificationPolicy::default().with_default(4).with_rule("Poule D", 1);
        assert_eq!(policy.qualified_count(&poule("Poule Z", vec![])), 4);
        assert_eq!(policy.qualified_count(&poule("Poule D", vec![])), 1);
    }

    #[test]
    fn negative_points_sort_last_and_empty_poule_is_empty() {
        let p = poule("Poule C", vec![record("x", -1), record("y", 0)]);
        assert_eq!(ids(&standings(&p, &QualificationPolicy::default())), vec!["y", "x"]);
        assert!(standings(&poule("Poule C", vec![]), &QualificationPolicy::default()).is_empty());
    }
}
