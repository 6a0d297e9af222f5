use chrono::NaiveDate;
use std::collections::BTreeSet;

use super::filters::{Dimension, Logic};
use super::predicate::Constraint;

/// Episodes that survive the combined filter, before ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidates {
    /// No dimension was constrained.
    All,
    Only(BTreeSet<i64>),
}

impl Candidates {
    pub fn contains(&self, id: i64) -> bool {
        match self {
            Candidates::All => true,
            Candidates::Only(ids) => ids.contains(&id),
        }
    }
}

/// Merge per-dimension constraints. Unconstrained dimensions never take part;
/// with nothing constrained every episode is a candidate, in either mode.
pub fn combine(constraints: &[(Dimension, Constraint)], logic: Logic) -> Candidates {
    let mut present = constraints.iter().filter_map(|(_, c)| match c {
        Constraint::Matches(ids) => Some(ids),
        Constraint::Unconstrained => None,
    });

    let Some(first) = present.next() else {
        return Candidates::All;
    };

    let merged = present.fold(first.clone(), |acc, ids| match logic {
        Logic::And => acc.intersection(ids).copied().collect(),
        Logic::Or => acc.union(ids).copied().collect(),
    });

    Candidates::Only(merged)
}

/// Order candidates by air date ascending (undated last), then id ascending.
pub fn order_candidates(
    sort_keys: Vec<(i64, Option<NaiveDate>)>,
    candidates: &Candidates,
) -> Vec<i64> {
    let mut keyed: Vec<(i64, Option<NaiveDate>)> = sort_keys
        .into_iter()
        .filter(|(id, _)| candidates.contains(*id))
        .collect();
    keyed.sort_by(|(a_id, a_date), (b_id, b_date)| {
        (a_date.is_none(), a_date, a_id).cmp(&(b_date.is_none(), b_date, b_id))
    });
    keyed.dedup_by_key(|(id, _)| *id);
    keyed.into_iter().map(|(id, _)| id).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(ids: &[i64]) -> Constraint {
        Constraint::Matches(ids.iter().copied().collect())
    }

    fn constraints(month: Constraint, tool: Constraint) -> Vec<(Dimension, Constraint)> {
        vec![
            (Dimension::Month, month),
            (Dimension::Color, Constraint::Unconstrained),
            (Dimension::Subject, Constraint::Unconstrained),
            (Dimension::Tool, tool),
            (Dimension::Technique, Constraint::Unconstrained),
        ]
    }

    #[test]
    fn nothing_constrained_means_everything() {
        let none = constraints(Constraint::Unconstrained, Constraint::Unconstrained);
        assert_eq!(combine(&none, Logic::And), Candidates::All);
        assert_eq!(combine(&none, Logic::Or), Candidates::All);
    }

    #[test]
    fn and_intersects_or_unions() {
        let c = constraints(matches(&[1, 2]), matches(&[1, 3]));
        assert_eq!(combine(&c, Logic::And), Candidates::Only(BTreeSet::from([1])));
        assert_eq!(
            combine(&c, Logic::Or),
            Candidates::Only(BTreeSet::from([1, 2, 3]))
        );
    }

    #[test]
    fn empty_dimension_empties_an_and_query() {
        let c = constraints(matches(&[1, 2]), matches(&[]));
        assert_eq!(combine(&c, Logic::And), Candidates::Only(BTreeSet::new()));
        assert_eq!(
            combine(&c, Logic::Or),
            Candidates::Only(BTreeSet::from([1, 2]))
        );
    }

    #[test]
    fn single_dimension_is_mode_independent() {
        let c = constraints(Constraint::Unconstrained, matches(&[3, 1]));
        assert_eq!(combine(&c, Logic::And), combine(&c, Logic::Or));
    }

    #[test]
    fn ordering_is_by_date_then_id_with_undated_last() {
        let d = |m, day| NaiveDate::from_ymd_opt(1984, m, day);
        let keys = vec![
            (5, None),
            (4, d(2, 1)),
            (1, d(3, 1)),
            (3, None),
            (2, d(2, 1)),
        ];
        assert_eq!(order_candidates(keys.clone(), &Candidates::All), vec![2, 4, 1, 3, 5]);

        let only = Candidates::Only(BTreeSet::from([5, 1, 4]));
        assert_eq!(order_candidates(keys, &only), vec![4, 1, 5]);
    }
}
