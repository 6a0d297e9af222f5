use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::QueryError;

/// One independently filterable facet of an episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Dimension {
    Month,
    Color,
    Subject,
    Tool,
    Technique,
    Episode,
    Season,
    Title,
    ColorId,
    SubjectId,
    ToolId,
    TechniqueId,
}

impl Dimension {
    pub const ALL: [Dimension; 12] = [
        Dimension::Month,
        Dimension::Color,
        Dimension::Subject,
        Dimension::Tool,
        Dimension::Technique,
        Dimension::Episode,
        Dimension::Season,
        Dimension::Title,
        Dimension::ColorId,
        Dimension::SubjectId,
        Dimension::ToolId,
        Dimension::TechniqueId,
    ];

    /// Field name in `filters_applied` and in error reports.
    pub fn field(self) -> &'static str {
        match self {
            Dimension::Month => "months",
            Dimension::Color => "colors",
            Dimension::Subject => "subjects",
            Dimension::Tool => "tools",
            Dimension::Technique => "techniques",
            Dimension::Episode => "episode_ids",
            Dimension::Season => "seasons",
            Dimension::Title => "titles",
            Dimension::ColorId => "color_ids",
            Dimension::SubjectId => "subject_ids",
            Dimension::ToolId => "tool_ids",
            Dimension::TechniqueId => "technique_ids",
        }
    }

    /// Repeatable query-string key.
    pub fn param(self) -> &'static str {
        match self {
            Dimension::Month => "month",
            Dimension::Color => "color",
            Dimension::Subject => "subject",
            Dimension::Tool => "tool",
            Dimension::Technique => "technique",
            Dimension::Episode => "episode_id",
            Dimension::Season => "season",
            Dimension::Title => "title",
            Dimension::ColorId => "color_id",
            Dimension::SubjectId => "subject_id",
            Dimension::ToolId => "tool_id",
            Dimension::TechniqueId => "technique_id",
        }
    }

    fn from_param(key: &str) -> Option<Self> {
        Dimension::ALL
            .into_iter()
            .find(|d| d.param() == key || d.field() == key)
    }
}

/// How constrained dimensions combine with each other. Values within a single
/// dimension are always ORed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Logic {
    #[default]
    And,
    Or,
}

impl FromStr for Logic {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AND" => Ok(Logic::And),
            "OR" => Ok(Logic::Or),
            other => Err(QueryError::invalid_filter(
                "logic",
                format!("expected AND or OR, got {other:?}"),
            )),
        }
    }
}

impl fmt::Display for Logic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Logic::And => f.write_str("AND"),
            Logic::Or => f.write_str("OR"),
        }
    }
}

/// Typed filter request. Serializes as the `filters_applied` echo.
///
/// The five browse dimensions are always echoed; episode and id filters only
/// when they carry values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterSpec {
    pub months: Vec<u32>,
    pub colors: Vec<String>,
    pub subjects: Vec<String>,
    pub tools: Vec<String>,
    pub techniques: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub episode_ids: Vec<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub seasons: Vec<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub titles: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub color_ids: Vec<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subject_ids: Vec<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tool_ids: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub technique_ids: Vec<String>,
    pub logic: Logic,
}

fn extend_strings<S: Into<String>>(target: &mut Vec<String>, values: impl IntoIterator<Item = S>) {
    target.extend(values.into_iter().map(Into::into));
}

impl FilterSpec {
    pub fn new(logic: Logic) -> Self {
        FilterSpec {
            logic,
            ..Default::default()
        }
    }

    pub fn months(mut self, months: impl IntoIterator<Item = u32>) -> Self {
        self.months.extend(months);
        self
    }

    pub fn colors<S: Into<String>>(mut self, values: impl IntoIterator<Item = S>) -> Self {
        extend_strings(&mut self.colors, values);
        self
    }

    pub fn subjects<S: Into<String>>(mut self, values: impl IntoIterator<Item = S>) -> Self {
        extend_strings(&mut self.subjects, values);
        self
    }

    pub fn tools<S: Into<String>>(mut self, values: impl IntoIterator<Item = S>) -> Self {
        extend_strings(&mut self.tools, values);
        self
    }

    pub fn techniques<S: Into<String>>(mut self, values: impl IntoIterator<Item = S>) -> Self {
        extend_strings(&mut self.techniques, values);
        self
    }

    pub fn episode_ids(mut self, ids: impl IntoIterator<Item = i64>) -> Self {
        self.episode_ids.extend(ids);
        self
    }

    pub fn seasons(mut self, seasons: impl IntoIterator<Item = i64>) -> Self {
        self.seasons.extend(seasons);
        self
    }

    pub fn titles<S: Into<String>>(mut self, values: impl IntoIterator<Item = S>) -> Self {
        extend_strings(&mut self.titles, values);
        self
    }

    pub fn color_ids(mut self, ids: impl IntoIterator<Item = i64>) -> Self {
        self.color_ids.extend(ids);
        self
    }

    pub fn subject_ids(mut self, ids: impl IntoIterator<Item = i64>) -> Self {
        self.subject_ids.extend(ids);
        self
    }

    pub fn tool_ids<S: Into<String>>(mut self, values: impl IntoIterator<Item = S>) -> Self {
        extend_strings(&mut self.tool_ids, values);
        self
    }

    pub fn technique_ids<S: Into<String>>(mut self, values: impl IntoIterator<Item = S>) -> Self {
        extend_strings(&mut self.technique_ids, values);
        self
    }

    /// Whether the dimension carries at least one value.
    pub fn constrains(&self, dimension: Dimension) -> bool {
        match dimension {
            Dimension::Month => !self.months.is_empty(),
            Dimension::Color => !self.colors.is_empty(),
            Dimension::Subject => !self.subjects.is_empty(),
            Dimension::Tool => !self.tools.is_empty(),
            Dimension::Technique => !self.techniques.is_empty(),
            Dimension::Episode => !self.episode_ids.is_empty(),
            Dimension::Season => !self.seasons.is_empty(),
            Dimension::Title => !self.titles.is_empty(),
            Dimension::ColorId => !self.color_ids.is_empty(),
            Dimension::SubjectId => !self.subject_ids.is_empty(),
            Dimension::ToolId => !self.tool_ids.is_empty(),
            Dimension::TechniqueId => !self.technique_ids.is_empty(),
        }
    }

    /// Number of constrained dimensions.
    pub fn dimension_count(&self) -> usize {
        Dimension::ALL.iter().filter(|d| self.constrains(**d)).count()
    }

    /// Validate and canonicalize: months must be 1–12 and seasons at least 1,
    /// strings are trimmed, blanks dropped, duplicates removed keeping the
    /// first occurrence.
    pub fn normalized(&self) -> Result<FilterSpec, QueryError> {
        if let Some(m) = self.months.iter().find(|m| !(1..=12).contains(*m)) {
            return Err(QueryError::invalid_filter(
                Dimension::Month.field(),
                format!("{m} is not a month (expected 1-12)"),
            ));
        }
        if let Some(s) = self.seasons.iter().find(|s| **s < 1) {
            return Err(QueryError::invalid_filter(
                Dimension::Season.field(),
                format!("season must be at least 1, got {s}"),
            ));
        }

        Ok(FilterSpec {
            months: dedup(&self.months),
            colors: normalize_names(&self.colors),
            subjects: normalize_names(&self.subjects),
            tools: normalize_names(&self.tools),
            techniques: normalize_names(&self.techniques),
            episode_ids: dedup(&self.episode_ids),
            seasons: dedup(&self.seasons),
            titles: normalize_names(&self.titles),
            color_ids: dedup(&self.color_ids),
            subject_ids: dedup(&self.subject_ids),
            tool_ids: normalize_names(&self.tool_ids),
            technique_ids: normalize_names(&self.technique_ids),
            logic: self.logic,
        })
    }
}

fn dedup<T: Copy + PartialEq>(values: &[T]) -> Vec<T> {
    let mut out: Vec<T> = Vec::with_capacity(values.len());
    for v in values {
        if !out.contains(v) {
            out.push(*v);
        }
    }
    out
}

fn normalize_names(values: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(values.len());
    for v in values {
        let v = v.trim();
        if !v.is_empty() && !out.iter().any(|seen| seen == v) {
            out.push(v.to_string());
        }
    }
    out
}

/// Stringly-typed filter and paging values as they arrive from a query string
/// or the command line.
#[derive(Debug, Clone, Default)]
pub struct RawFilters {
    pub months: Vec<String>,
    pub colors: Vec<String>,
    pub subjects: Vec<String>,
    pub tools: Vec<String>,
    pub techniques: Vec<String>,
    pub episode_ids: Vec<String>,
    pub seasons: Vec<String>,
    pub titles: Vec<String>,
    pub color_ids: Vec<String>,
    pub subject_ids: Vec<String>,
    pub tool_ids: Vec<String>,
    pub technique_ids: Vec<String>,
    pub logic: Option<String>,
    pub page: Option<String>,
    pub per_page: Option<String>,
}

impl RawFilters {
    /// Collect repeated `key=value` pairs. Unknown keys are ignored.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut raw = RawFilters::default();
        for (key, value) in pairs {
            let key = key.as_ref();
            let value = value.into();
            match key {
                "mode" | "logic" | "filter_type" => raw.logic = Some(value),
                "page" => raw.page = Some(value),
                "per_page" => raw.per_page = Some(value),
                _ => {
                    if let Some(dimension) = Dimension::from_param(key) {
                        raw.values_mut(dimension).push(value);
                    }
                }
            }
        }
        raw
    }

    fn values_mut(&mut self, dimension: Dimension) -> &mut Vec<String> {
        match dimension {
            Dimension::Month => &mut self.months,
            Dimension::Color => &mut self.colors,
            Dimension::Subject => &mut self.subjects,
            Dimension::Tool => &mut self.tools,
            Dimension::Technique => &mut self.techniques,
            Dimension::Episode => &mut self.episode_ids,
            Dimension::Season => &mut self.seasons,
            Dimension::Title => &mut self.titles,
            Dimension::ColorId => &mut self.color_ids,
            Dimension::SubjectId => &mut self.subject_ids,
            Dimension::ToolId => &mut self.tool_ids,
            Dimension::TechniqueId => &mut self.technique_ids,
        }
    }

    /// Convert into a typed, normalized FilterSpec.
    pub fn parse(&self) -> Result<FilterSpec, QueryError> {
        let logic = match self.logic.as_deref().map(str::trim) {
            None | Some("") => Logic::default(),
            Some(s) => s.parse()?,
        };

        FilterSpec {
            months: parse_integers(Dimension::Month, &self.months)?,
            colors: self.colors.clone(),
            subjects: self.subjects.clone(),
            tools: self.tools.clone(),
            techniques: self.techniques.clone(),
            episode_ids: parse_integers(Dimension::Episode, &self.episode_ids)?,
            seasons: parse_integers(Dimension::Season, &self.seasons)?,
            titles: self.titles.clone(),
            color_ids: parse_integers(Dimension::ColorId, &self.color_ids)?,
            subject_ids: parse_integers(Dimension::SubjectId, &self.subject_ids)?,
            tool_ids: self.tool_ids.clone(),
            technique_ids: self.technique_ids.clone(),
            logic,
        }
        .normalized()
    }
}

/// Parse integer values for a dimension, skipping blanks.
fn parse_integers<T: FromStr>(dimension: Dimension, raw: &[String]) -> Result<Vec<T>, QueryError> {
    let mut out = Vec::with_capacity(raw.len());
    for value in raw {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            continue;
        }
        let parsed = trimmed.parse().map_err(|_| {
            QueryError::invalid_filter(
                dimension.field(),
                format!("{trimmed:?} is not an integer"),
            )
        })?;
        out.push(parsed);
    }
    Ok(out)
}
