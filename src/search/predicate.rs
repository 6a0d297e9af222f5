//! Per-request filter plan: one predicate per constrained dimension under a
//! single AND/OR node, evaluated dimension by dimension against the store.

use rusqlite::types::Value;
use std::collections::BTreeSet;
use tracing::debug;

use super::deadline::Deadline;
use super::filters::{Dimension, FilterSpec, Logic};
use super::store::{Association, EntityKey};
use crate::db::Database;
use crate::error::QueryError;

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Air date falls in any of these months.
    AiredIn(Vec<u32>),
    /// Linked to any row whose name contains one of these needles, compared
    /// case-insensitively.
    NameContains {
        association: Association,
        needles: Vec<String>,
    },
    /// Episode id is one of these.
    EpisodeIn(Vec<i64>),
    /// Season number is one of these.
    SeasonIn(Vec<i64>),
    /// Title contains any needle, case-insensitively.
    TitleContains(Vec<String>),
    /// Linked to any of these exact rows.
    LinkedTo {
        association: Association,
        keys: Vec<EntityKey>,
    },
}

impl Predicate {
    pub fn dimension(&self) -> Dimension {
        match self {
            Predicate::AiredIn(_) => Dimension::Month,
            Predicate::NameContains { association, .. } => match association {
                Association::Color => Dimension::Color,
                Association::Subject => Dimension::Subject,
                Association::Tool => Dimension::Tool,
                Association::Technique => Dimension::Technique,
            },
            Predicate::EpisodeIn(_) => Dimension::Episode,
            Predicate::SeasonIn(_) => Dimension::Season,
            Predicate::TitleContains(_) => Dimension::Title,
            Predicate::LinkedTo { association, .. } => match association {
                Association::Color => Dimension::ColorId,
                Association::Subject => Dimension::SubjectId,
                Association::Tool => Dimension::ToolId,
                Association::Technique => Dimension::TechniqueId,
            },
        }
    }
}

/// The filter plan for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterPlan {
    pub logic: Logic,
    pub predicates: Vec<Predicate>,
}

fn integer_keys(ids: &[i64]) -> Vec<EntityKey> {
    ids.iter().map(|id| Value::Integer(*id)).collect()
}

fn text_keys(codes: &[String]) -> Vec<EntityKey> {
    codes.iter().map(|code| Value::Text(code.clone())).collect()
}

impl FilterPlan {
    /// Build from a normalized `FilterSpec`, in `Dimension::ALL` order.
    /// Dimensions without values get no predicate.
    pub fn from_spec(spec: &FilterSpec) -> Self {
        let mut predicates = Vec::new();
        if !spec.months.is_empty() {
            predicates.push(Predicate::AiredIn(spec.months.clone()));
        }
        let named = [
            (Association::Color, &spec.colors),
            (Association::Subject, &spec.subjects),
            (Association::Tool, &spec.tools),
            (Association::Technique, &spec.techniques),
        ];
        for (association, values) in named {
            if !values.is_empty() {
                predicates.push(Predicate::NameContains {
                    association,
                    needles: values.clone(),
                });
            }
        }

        if !spec.episode_ids.is_empty() {
            predicates.push(Predicate::EpisodeIn(spec.episode_ids.clone()));
        }
        if !spec.seasons.is_empty() {
            predicates.push(Predicate::SeasonIn(spec.seasons.clone()));
        }
        if !spec.titles.is_empty() {
            predicates.push(Predicate::TitleContains(spec.titles.clone()));
        }

        let exact = [
            (Association::Color, integer_keys(&spec.color_ids)),
            (Association::Subject, integer_keys(&spec.subject_ids)),
            (Association::Tool, text_keys(&spec.tool_ids)),
            (Association::Technique, text_keys(&spec.technique_ids)),
        ];
        for (association, keys) in exact {
            if !keys.is_empty() {
                predicates.push(Predicate::LinkedTo { association, keys });
            }
        }

        FilterPlan {
            logic: spec.logic,
            predicates,
        }
    }

    pub fn is_unconstrained(&self) -> bool {
        self.predicates.is_empty()
    }
}

/// Outcome of evaluating one dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    /// No values were supplied; the dimension does not take part.
    Unconstrained,
    /// Episodes satisfying the dimension. May be empty.
    Matches(BTreeSet<i64>),
}

/// Keys of rows whose name contains any needle (case-insensitive).
pub fn matching_keys<K>(rows: Vec<(K, String)>, needles: &[String]) -> Vec<K> {
    let needles: Vec<String> = needles.iter().map(|n| n.to_lowercase()).collect();
    rows.into_iter()
        .filter(|(_, name)| {
            let name = name.to_lowercase();
            needles.iter().any(|n| name.contains(n.as_str()))
        })
        .map(|(key, _)| key)
        .collect()
}

impl Database {
    /// Evaluate one predicate to its matching episode set.
    pub fn evaluate_predicate(&self, predicate: &Predicate) -> Result<BTreeSet<i64>, QueryError> {
        match predicate {
            Predicate::AiredIn(months) => Ok(self.episode_ids_aired_in(months)?),
            Predicate::NameContains {
                association,
                needles,
            } => {
                let keys = matching_keys(self.dimension_names(*association)?, needles);
                debug!(
                    dimension = ?association,
                    matched_rows = keys.len(),
                    "Resolved name filter"
                );
                Ok(self.episode_ids_linked(*association, &keys)?)
            }
            Predicate::EpisodeIn(ids) => Ok(self.existing_episode_ids(ids)?),
            Predicate::SeasonIn(seasons) => Ok(self.episode_ids_in_seasons(seasons)?),
            Predicate::TitleContains(needles) => {
                Ok(matching_keys(self.episode_titles()?, needles).into_iter().collect())
            }
            Predicate::LinkedTo { association, keys } => {
                Ok(self.episode_ids_linked(*association, keys)?)
            }
        }
    }

    /// Evaluate the plan into one constraint per dimension, in
    /// `Dimension::ALL` order.
    pub fn evaluate_plan(
        &self,
        plan: &FilterPlan,
        deadline: &Deadline,
    ) -> Result<Vec<(Dimension, Constraint)>, QueryError> {
        let mut out = Vec::with_capacity(Dimension::ALL.len());
        for dimension in Dimension::ALL {
            deadline.check()?;
            let constraint = match plan.predicates.iter().find(|p| p.dimension() == dimension) {
                Some(predicate) => Constraint::Matches(self.evaluate_predicate(predicate)?),
                None => Constraint::Unconstrained,
            };
            out.push((dimension, constraint));
        }
        Ok(out)
    }
}
