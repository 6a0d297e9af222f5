//! Air-date listing parser.
//!
//! One episode per line, in broadcast order:
//!
//! ```text
//! "A Walk in the Woods" (January 11, 1983)
//! "Mt. McKinley" (January 11, 1983) Special guest Steve Ross
//! ```
//!
//! Season and episode derive from the line number, 13 episodes per season.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use regex::Regex;
use tracing::warn;

use crate::db::Database;

pub const EPISODES_PER_SEASON: usize = 13;

#[derive(Debug, Clone, PartialEq)]
pub struct AirDateEntry {
    pub title: String,
    pub air_date: Option<NaiveDate>,
    pub season_number: i64,
    pub episode_number: i64,
}

/// Parse the listing. Unparseable lines are skipped with a warning but still
/// occupy their slot in the season/episode numbering; an unreadable date
/// yields an entry without one.
pub fn parse_air_dates(content: &str) -> Result<Vec<AirDateEntry>> {
    let line_re = Regex::new(r#"^"([^"]+)"\s+\(([^)]+)\)"#)?;
    let guest_re = Regex::new(r"\s*(Guest Artist|Special guest|featuring|Footage with).*")?;

    let mut entries = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let Some(cap) = line_re.captures(line) else {
            warn!(line = idx + 1, text = line, "Skipping unparseable air-date line");
            continue;
        };

        let title = cap[1].trim().to_string();
        let date_str = guest_re.replace(&cap[2], "");
        let date_str = date_str.trim();
        let air_date = match NaiveDate::parse_from_str(date_str, "%B %d, %Y") {
            Ok(d) => Some(d),
            Err(_) => {
                warn!(line = idx + 1, date = date_str, "Invalid air date");
                None
            }
        };

        entries.push(AirDateEntry {
            title,
            air_date,
            season_number: (idx / EPISODES_PER_SEASON) as i64 + 1,
            episode_number: (idx % EPISODES_PER_SEASON) as i64 + 1,
        });
    }
    Ok(entries)
}

/// Apply parsed entries in one transaction. Returns the number of episodes
/// written.
pub fn apply_air_dates(db: &Database, entries: &[AirDateEntry]) -> Result<usize> {
    let tx = db.conn.unchecked_transaction()?;
    for e in entries {
        db.upsert_episode_date(&e.title, e.season_number, e.episode_number, e.air_date)
            .with_context(|| format!("Failed to store air date for \"{}\"", e.title))?;
    }
    tx.commit()?;
    Ok(entries.len())
}
