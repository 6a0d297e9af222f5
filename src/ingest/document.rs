use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::db::models::{NewEpisode, NewLink, Technique, Tool};

/// A catalog document: any mix of reference rows and episodes.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CatalogDocument {
    pub colors: Vec<ColorEntry>,
    pub subjects: Vec<LinkRef>,
    pub tools: Vec<ToolEntry>,
    pub techniques: Vec<TechniqueEntry>,
    pub episodes: Vec<EpisodeEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ColorEntry {
    Name(String),
    Detailed {
        name: String,
        #[serde(default, alias = "hex")]
        hex_code: Option<String>,
    },
}

impl ColorEntry {
    pub fn name(&self) -> &str {
        match self {
            ColorEntry::Name(n) | ColorEntry::Detailed { name: n, .. } => n.trim(),
        }
    }

    pub fn hex_code(&self) -> Option<&str> {
        match self {
            ColorEntry::Name(_) => None,
            ColorEntry::Detailed { hex_code, .. } => hex_code.as_deref(),
        }
    }
}

/// Reference from an episode to a color/subject (by name) or tool/technique
/// (by code). The object form carries the junction qualifier.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum LinkRef {
    Key(String),
    Detailed {
        #[serde(alias = "id")]
        name: String,
        #[serde(default = "default_flag", alias = "featured")]
        used: bool,
    },
}

fn default_flag() -> bool {
    true
}

impl LinkRef {
    pub fn key(&self) -> &str {
        match self {
            LinkRef::Key(k) | LinkRef::Detailed { name: k, .. } => k.trim(),
        }
    }

    fn to_link(&self) -> NewLink {
        match self {
            LinkRef::Key(k) => NewLink::new(k.trim()),
            LinkRef::Detailed { name, used } => NewLink {
                key: name.trim().to_string(),
                flag: *used,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ToolEntry {
    pub id: String,
    pub name: String,
    pub category: Option<String>,
    pub primary_uses: Option<String>,
    pub compatible_colors: Option<String>,
    /// Codes of techniques this tool can paint.
    #[serde(default)]
    pub techniques: Vec<String>,
}

impl ToolEntry {
    pub fn to_tool(&self) -> Tool {
        Tool {
            id: self.id.trim().to_string(),
            name: self.name.trim().to_string(),
            category: self.category.clone(),
            primary_uses: self.primary_uses.clone(),
            compatible_colors: self.compatible_colors.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TechniqueEntry {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub primary_colors_used: Option<String>,
    pub common_subjects: Option<String>,
    pub difficulty_level: Option<String>,
}

impl TechniqueEntry {
    pub fn to_technique(&self) -> Technique {
        Technique {
            id: self.id.trim().to_string(),
            name: self.name.trim().to_string(),
            description: self.description.clone(),
            primary_colors_used: self.primary_colors_used.clone(),
            common_subjects: self.common_subjects.clone(),
            difficulty_level: self.difficulty_level.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct EpisodeEntry {
    pub title: String,
    #[serde(alias = "season_number")]
    pub season: i64,
    #[serde(alias = "episode_number")]
    pub episode: i64,
    pub air_date: Option<NaiveDate>,
    #[serde(alias = "youtube_src")]
    pub youtube_url: Option<String>,
    #[serde(alias = "img_src")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub colors: Vec<LinkRef>,
    #[serde(default)]
    pub subjects: Vec<LinkRef>,
    #[serde(default)]
    pub tools: Vec<LinkRef>,
    #[serde(default)]
    pub techniques: Vec<LinkRef>,
}

impl EpisodeEntry {
    pub fn to_new_episode(&self) -> NewEpisode {
        let links = |refs: &[LinkRef]| -> Vec<NewLink> {
            refs.iter()
                .filter(|r| !r.key().is_empty())
                .map(LinkRef::to_link)
                .collect()
        };
        NewEpisode {
            title: self.title.trim().to_string(),
            season_number: self.season,
            episode_number: self.episode,
            air_date: self.air_date,
            youtube_url: self.youtube_url.clone(),
            image_url: self.image_url.clone(),
            colors: links(&self.colors),
            subjects: links(&self.subjects),
            tools: links(&self.tools),
            techniques: links(&self.techniques),
        }
    }
}

impl CatalogDocument {
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Failed to parse JSON catalog document")
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse YAML catalog document")
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
            && self.subjects.is_empty()
            && self.tools.is_empty()
            && self.techniques.is_empty()
            && self.episodes.is_empty()
    }
}
