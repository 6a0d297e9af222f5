use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A row of the `episodes` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub id: i64,
    pub title: String,
    pub season_number: i64,
    pub episode_number: i64,
    pub air_date: Option<NaiveDate>,
    pub youtube_url: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub id: i64,
    pub name: String,
    pub hex_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    pub id: String,
    pub name: String,
    pub category: Option<String>,
    pub primary_uses: Option<String>,
    pub compatible_colors: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Technique {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub primary_colors_used: Option<String>,
    pub common_subjects: Option<String>,
    pub difficulty_level: Option<String>,
}

/// Data needed to upsert an episode with its associations.
///
/// Colors and subjects are referenced by name, tools and techniques by code.
#[derive(Debug, Clone, Default)]
pub struct NewEpisode {
    pub title: String,
    pub season_number: i64,
    pub episode_number: i64,
    pub air_date: Option<NaiveDate>,
    pub youtube_url: Option<String>,
    pub image_url: Option<String>,
    pub colors: Vec<NewLink>,
    pub subjects: Vec<NewLink>,
    pub tools: Vec<NewLink>,
    pub techniques: Vec<NewLink>,
}

/// One association from an episode to a dimension row, with its junction flag
/// (`is_used` for colors/tools, `is_featured` for subjects/techniques).
#[derive(Debug, Clone, PartialEq)]
pub struct NewLink {
    pub key: String,
    pub flag: bool,
}

impl NewLink {
    pub fn new(key: impl Into<String>) -> Self {
        NewLink {
            key: key.into(),
            flag: true,
        }
    }
}

/// Stats returned by `jop stats`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbStats {
    pub episodes: i64,
    pub colors: i64,
    pub subjects: i64,
    pub tools: i64,
    pub techniques: i64,
    pub episode_colors: i64,
    pub episode_subjects: i64,
    pub episode_tools: i64,
    pub episode_techniques: i64,
    pub tool_techniques: i64,
    pub undated_episodes: i64,
    pub seasons: Vec<SeasonCount>,
    pub db_size_bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonCount {
    pub season: i64,
    pub count: i64,
}
