//! Read-only typed access to the catalog tables used by the query engine.
//!
//! Every statement is static. Value lists are bound as a single JSON array
//! and expanded with `json_each`, so the SQL text never depends on request
//! input.

use chrono::NaiveDate;
use rusqlite::types::Value;
use std::collections::{BTreeSet, HashMap};

use crate::db::models::Episode;
use crate::db::{episode_from_row, Database};

/// A junction-backed dimension: an entity table linked to episodes through a
/// many-to-many table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Association {
    Color,
    Subject,
    Tool,
    Technique,
}

impl Association {
    fn names_sql(self) -> &'static str {
        match self {
            Association::Color => "SELECT id, name FROM colors",
            Association::Subject => "SELECT id, name FROM subjects",
            Association::Tool => "SELECT id, name FROM tools",
            Association::Technique => "SELECT id, name FROM techniques",
        }
    }

    fn linked_episodes_sql(self) -> &'static str {
        match self {
            Association::Color => {
                "SELECT DISTINCT episode_id FROM episode_colors
                 WHERE color_id IN (SELECT value FROM json_each(?1))"
            }
            Association::Subject => {
                "SELECT DISTINCT episode_id FROM episode_subjects
                 WHERE subject_id IN (SELECT value FROM json_each(?1))"
            }
            Association::Tool => {
                "SELECT DISTINCT episode_id FROM episode_tools
                 WHERE tool_id IN (SELECT value FROM json_each(?1))"
            }
            Association::Technique => {
                "SELECT DISTINCT episode_id FROM episode_techniques
                 WHERE technique_id IN (SELECT value FROM json_each(?1))"
            }
        }
    }

    fn episode_names_sql(self) -> &'static str {
        match self {
            Association::Color => {
                "SELECT j.episode_id, d.name FROM episode_colors j
                 JOIN colors d ON d.id = j.color_id
                 WHERE j.episode_id IN (SELECT value FROM json_each(?1))
                 ORDER BY j.episode_id, d.name"
            }
            Association::Subject => {
                "SELECT j.episode_id, d.name FROM episode_subjects j
                 JOIN subjects d ON d.id = j.subject_id
                 WHERE j.episode_id IN (SELECT value FROM json_each(?1))
                 ORDER BY j.episode_id, d.name"
            }
            Association::Tool => {
                "SELECT j.episode_id, d.name FROM episode_tools j
                 JOIN tools d ON d.id = j.tool_id
                 WHERE j.episode_id IN (SELECT value FROM json_each(?1))
                 ORDER BY j.episode_id, d.name"
            }
            Association::Technique => {
                "SELECT j.episode_id, d.name FROM episode_techniques j
                 JOIN techniques d ON d.id = j.technique_id
                 WHERE j.episode_id IN (SELECT value FROM json_each(?1))
                 ORDER BY j.episode_id, d.name"
            }
        }
    }
}

/// Key of a dimension row: integer for colors/subjects, code for tools/techniques.
pub type EntityKey = Value;

fn json_ids(ids: &[i64]) -> String {
    serde_json::Value::from(ids.to_vec()).to_string()
}

fn json_keys(keys: &[EntityKey]) -> String {
    let values: Vec<serde_json::Value> = keys
        .iter()
        .filter_map(|k| match k {
            Value::Integer(i) => Some(serde_json::Value::from(*i)),
            Value::Text(s) => Some(serde_json::Value::from(s.as_str())),
            _ => None,
        })
        .collect();
    serde_json::Value::Array(values).to_string()
}

impl Database {
    /// Ids of episodes whose air_date falls in any of the given months.
    pub fn episode_ids_aired_in(&self, months: &[u32]) -> rusqlite::Result<BTreeSet<i64>> {
        let months = serde_json::Value::from(months.to_vec()).to_string();
        let mut stmt = self.conn.prepare_cached(
            "SELECT id FROM episodes
             WHERE air_date IS NOT NULL
               AND CAST(strftime('%m', air_date) AS INTEGER) IN (SELECT value FROM json_each(?1))",
        )?;
        let rows = stmt.query_map([months], |row| row.get(0))?;
        rows.collect()
    }

    /// The subset of `ids` that name stored episodes.
    pub fn existing_episode_ids(&self, ids: &[i64]) -> rusqlite::Result<BTreeSet<i64>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT id FROM episodes WHERE id IN (SELECT value FROM json_each(?1))",
        )?;
        let rows = stmt.query_map([json_ids(ids)], |row| row.get(0))?;
        rows.collect()
    }

    /// Ids of episodes in any of the given seasons.
    pub fn episode_ids_in_seasons(&self, seasons: &[i64]) -> rusqlite::Result<BTreeSet<i64>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT id FROM episodes
             WHERE season_number IN (SELECT value FROM json_each(?1))",
        )?;
        let rows = stmt.query_map([json_ids(seasons)], |row| row.get(0))?;
        rows.collect()
    }

    /// Every (id, title) episode row.
    pub fn episode_titles(&self) -> rusqlite::Result<Vec<(i64, String)>> {
        let mut stmt = self.conn.prepare_cached("SELECT id, title FROM episodes")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        rows.collect()
    }

    /// Every (key, name) row of a dimension's entity table.
    pub fn dimension_names(&self, assoc: Association) -> rusqlite::Result<Vec<(EntityKey, String)>> {
        let mut stmt = self.conn.prepare_cached(assoc.names_sql())?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        rows.collect()
    }

    /// Ids of episodes linked to any of the given dimension rows.
    pub fn episode_ids_linked(
        &self,
        assoc: Association,
        keys: &[EntityKey],
    ) -> rusqlite::Result<BTreeSet<i64>> {
        if keys.is_empty() {
            return Ok(BTreeSet::new());
        }
        let mut stmt = self.conn.prepare_cached(assoc.linked_episodes_sql())?;
        let rows = stmt.query_map([json_keys(keys)], |row| row.get(0))?;
        rows.collect()
    }

    /// (id, air_date) for every episode, in storage order.
    pub fn episode_sort_keys(&self) -> rusqlite::Result<Vec<(i64, Option<NaiveDate>)>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT id, air_date FROM episodes")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        rows.collect()
    }

    /// Episode rows for the given ids, keyed by id.
    pub fn episodes_by_ids(&self, ids: &[i64]) -> rusqlite::Result<HashMap<i64, Episode>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let mut stmt = self.conn.prepare_cached(
            "SELECT id, title, season_number, episode_number, air_date, youtube_url, image_url
             FROM episodes WHERE id IN (SELECT value FROM json_each(?1))",
        )?;
        let rows = stmt.query_map([json_ids(ids)], episode_from_row)?;
        let mut episodes = HashMap::with_capacity(ids.len());
        for row in rows {
            let ep = row?;
            episodes.insert(ep.id, ep);
        }
        Ok(episodes)
    }

    /// Name-sorted associated names for each of the given episodes.
    pub fn association_names(
        &self,
        assoc: Association,
        episode_ids: &[i64],
    ) -> rusqlite::Result<HashMap<i64, Vec<String>>> {
        let mut names: HashMap<i64, Vec<String>> = HashMap::new();
        if episode_ids.is_empty() {
            return Ok(names);
        }
        let mut stmt = self.conn.prepare_cached(assoc.episode_names_sql())?;
        let rows = stmt.query_map([json_ids(episode_ids)], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;
        for row in rows {
            let (id, name) = row?;
            names.entry(id).or_default().push(name);
        }
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::sample_catalog;

    #[test]
    fn months_match_on_air_date() {
        let (db, _temp) = sample_catalog();
        assert_eq!(db.episode_ids_aired_in(&[12]).unwrap(), BTreeSet::from([1, 2]));
        assert_eq!(db.episode_ids_aired_in(&[1, 12]).unwrap(), BTreeSet::from([1, 2, 3]));
        assert!(db.episode_ids_aired_in(&[6]).unwrap().is_empty());
    }

    #[test]
    fn undated_episodes_never_match_a_month() {
        let (db, _temp) = sample_catalog();
        db.upsert_episode_date("Undated", 2, 1, None).unwrap();
        let all: Vec<u32> = (1..=12).collect();
        assert_eq!(db.episode_ids_aired_in(&all).unwrap().len(), 3);
    }

    #[test]
    fn links_resolve_text_and_integer_keys() {
        let (db, _temp) = sample_catalog();

        let tools = db.dimension_names(Association::Tool).unwrap();
        let fan: Vec<EntityKey> = tools
            .into_iter()
            .filter(|(_, name)| name == "Fan Brush")
            .map(|(k, _)| k)
            .collect();
        assert_eq!(fan, vec![Value::Text("TL001".into())]);
        assert_eq!(
            db.episode_ids_linked(Association::Tool, &fan).unwrap(),
            BTreeSet::from([1, 3])
        );

        let colors = db.dimension_names(Association::Color).unwrap();
        let brown: Vec<EntityKey> = colors
            .into_iter()
            .filter(|(_, name)| name == "Van Dyke Brown")
            .map(|(k, _)| k)
            .collect();
        assert!(matches!(brown[0], Value::Integer(_)));
        assert_eq!(
            db.episode_ids_linked(Association::Color, &brown).unwrap(),
            BTreeSet::from([2, 3])
        );
    }

    #[test]
    fn association_names_are_sorted_per_episode() {
        let (db, _temp) = sample_catalog();
        let subjects = db.association_names(Association::Subject, &[1, 3]).unwrap();
        assert_eq!(subjects[&1], vec!["Mountain", "Trees"]);
        assert_eq!(subjects[&3], vec!["Cabin"]);
        assert!(!subjects.contains_key(&2));
    }

    #[test]
    fn seasons_and_ids_select_episode_rows() {
        let (db, _temp) = sample_catalog();
        db.upsert_episode_date("Second Season", 2, 1, None).unwrap();
        assert_eq!(db.episode_ids_in_seasons(&[2]).unwrap(), BTreeSet::from([4]));
        assert_eq!(db.episode_ids_in_seasons(&[1, 2]).unwrap().len(), 4);
        assert_eq!(db.existing_episode_ids(&[2, 99]).unwrap(), BTreeSet::from([2]));
        assert_eq!(db.episode_titles().unwrap().len(), 4);
    }

    #[test]
    fn episodes_by_ids_ignores_unknown_ids() {
        let (db, _temp) = sample_catalog();
        let eps = db.episodes_by_ids(&[3, 99]).unwrap();
        assert_eq!(eps.len(), 1);
        assert_eq!(eps[&3].title, "Snowy Cabin");
    }
}
