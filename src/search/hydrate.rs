use chrono::NaiveDate;
use serde::Serialize;
use tracing::error;

use super::deadline::Deadline;
use super::store::Association;
use crate::db::Database;
use crate::error::QueryError;

/// One episode as returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpisodeRecord {
    pub id: i64,
    pub title: String,
    pub season: i64,
    pub episode: i64,
    pub air_date: Option<NaiveDate>,
    pub youtube_url: Option<String>,
    pub image_url: Option<String>,
    pub colors: Vec<String>,
    pub subjects: Vec<String>,
    pub tools: Vec<String>,
    pub techniques: Vec<String>,
}

impl Database {
    /// Load full records for `window`, in exactly that order.
    ///
    /// Associations are shown in full, not narrowed by the filter that
    /// selected the episode. An id without an episode row fails the whole
    /// query.
    pub fn hydrate(&self, window: &[i64], deadline: &Deadline) -> Result<Vec<EpisodeRecord>, QueryError> {
        if window.is_empty() {
            return Ok(Vec::new());
        }

        let mut rows = self.episodes_by_ids(window)?;
        deadline.check()?;

        let mut colors = self.association_names(Association::Color, window)?;
        let mut subjects = self.association_names(Association::Subject, window)?;
        deadline.check()?;
        let mut tools = self.association_names(Association::Tool, window)?;
        let mut techniques = self.association_names(Association::Technique, window)?;
        deadline.check()?;

        let mut records = Vec::with_capacity(window.len());
        for id in window {
            let Some(ep) = rows.remove(id) else {
                error!(episode_id = *id, "Windowed episode id has no episode row");
                return Err(QueryError::InternalConsistency(format!(
                    "episode {id} selected by the filter has no episode row"
                )));
            };
            records.push(EpisodeRecord {
                id: ep.id,
                title: ep.title,
                season: ep.season_number,
                episode: ep.episode_number,
                air_date: ep.air_date,
                youtube_url: ep.youtube_url,
                image_url: ep.image_url,
                colors: colors.remove(id).unwrap_or_default(),
                subjects: subjects.remove(id).unwrap_or_default(),
                tools: tools.remove(id).unwrap_or_default(),
                techniques: techniques.remove(id).unwrap_or_default(),
            });
        }
        Ok(records)
    }
}
