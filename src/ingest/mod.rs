pub mod dates;
pub mod document;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::io::Read;
use std::ops::AddAssign;
use std::path::Path;
use tracing::{info, warn};

use crate::db::Database;
use document::CatalogDocument;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Format {
    Json,
    Yaml,
}

impl Format {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(Format::Json),
            "yaml" | "yml" => Some(Format::Yaml),
            _ => None,
        }
    }

    pub fn detect_from_extension(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Some(Format::Json),
            Some("yaml" | "yml") => Some(Format::Yaml),
            _ => None,
        }
    }
}

/// Rows written (or, for a dry run, that would be written).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    pub documents: usize,
    pub colors: usize,
    pub subjects: usize,
    pub tools: usize,
    pub techniques: usize,
    pub tool_techniques: usize,
    pub episodes: usize,
}

impl AddAssign for IngestSummary {
    fn add_assign(&mut self, rhs: Self) {
        self.documents += rhs.documents;
        self.colors += rhs.colors;
        self.subjects += rhs.subjects;
        self.tools += rhs.tools;
        self.techniques += rhs.techniques;
        self.tool_techniques += rhs.tool_techniques;
        self.episodes += rhs.episodes;
    }
}

/// Ingest one or more paths (files, directories or glob patterns).
pub fn ingest_paths(
    db: &Database,
    paths: &[String],
    format_override: Option<Format>,
    dry_run: bool,
) -> Result<IngestSummary> {
    let mut summary = IngestSummary::default();

    for path_str in paths {
        let path = Path::new(path_str);
        if path.is_dir() {
            summary += ingest_directory(db, path, format_override, dry_run)?;
        } else if path.is_file() {
            summary += ingest_file(db, path, format_override, dry_run)?;
        } else {
            // Try glob pattern
            let matches: Vec<_> = glob::glob(path_str)
                .with_context(|| format!("Invalid path or glob pattern: {path_str}"))?
                .filter_map(|r| r.ok())
                .collect();

            if matches.is_empty() {
                bail!("No files found matching: {path_str}");
            }

            for entry in matches {
                if entry.is_file() {
                    summary += ingest_file(db, &entry, format_override, dry_run)?;
                }
            }
        }
    }

    Ok(summary)
}

/// Ingest one document from stdin.
pub fn ingest_stdin(
    db: &Database,
    format_override: Option<Format>,
    dry_run: bool,
) -> Result<IngestSummary> {
    let mut content = String::new();
    std::io::stdin()
        .read_to_string(&mut content)
        .context("Failed to read from stdin")?;

    if content.trim().is_empty() {
        bail!("Empty input from stdin");
    }

    // JSON documents start with `{`; anything else is treated as YAML.
    let format = format_override.unwrap_or_else(|| {
        if content.trim_start().starts_with('{') {
            Format::Json
        } else {
            Format::Yaml
        }
    });

    let doc = parse_content(&content, format)?;
    ingest_document(db, &doc, "stdin", dry_run)
}

fn ingest_directory(
    db: &Database,
    dir: &Path,
    format_override: Option<Format>,
    dry_run: bool,
) -> Result<IngestSummary> {
    let mut summary = IngestSummary::default();

    let mut entries: Vec<_> = std::fs::read_dir(dir)?.filter_map(|e| e.ok()).collect();
    entries.sort_by_key(|e| e.path());

    for entry in entries {
        let path = entry.path();
        if path.is_dir() {
            summary += ingest_directory(db, &path, format_override, dry_run)?;
        } else if path.is_file() {
            // Only process known extensions unless format is overridden
            if format_override.is_some() || Format::detect_from_extension(&path).is_some() {
                summary += ingest_file(db, &path, format_override, dry_run)?;
            }
        }
    }

    Ok(summary)
}

fn ingest_file(
    db: &Database,
    path: &Path,
    format_override: Option<Format>,
    dry_run: bool,
) -> Result<IngestSummary> {
    let format = format_override
        .or_else(|| Format::detect_from_extension(path))
        .with_context(|| format!("Cannot determine format for: {}", path.display()))?;

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read: {}", path.display()))?;

    let doc = parse_content(&content, format)
        .with_context(|| format!("Invalid catalog document: {}", path.display()))?;

    ingest_document(db, &doc, &path.display().to_string(), dry_run)
}

fn parse_content(content: &str, format: Format) -> Result<CatalogDocument> {
    match format {
        Format::Json => CatalogDocument::from_json(content),
        Format::Yaml => CatalogDocument::from_yaml(content),
    }
}

/// Write one document in a single transaction. Techniques and tools land
/// before episodes so episode links can resolve against them.
pub fn ingest_document(
    db: &Database,
    doc: &CatalogDocument,
    origin: &str,
    dry_run: bool,
) -> Result<IngestSummary> {
    if doc.is_empty() {
        warn!(origin, "Catalog document has nothing to ingest");
    }

    if dry_run {
        let mut updates = 0;
        for e in &doc.episodes {
            if db.episode_exists(e.season, e.episode)? {
                updates += 1;
            }
        }
        println!(
            "  [dry-run] {origin}: {} colors, {} subjects, {} tools, {} techniques, {} episodes ({updates} already stored)",
            doc.colors.len(),
            doc.subjects.len(),
            doc.tools.len(),
            doc.techniques.len(),
            doc.episodes.len(),
        );
        return Ok(IngestSummary {
            documents: 1,
            colors: doc.colors.len(),
            subjects: doc.subjects.len(),
            tools: doc.tools.len(),
            techniques: doc.techniques.len(),
            tool_techniques: doc.tools.iter().map(|t| t.techniques.len()).sum(),
            episodes: doc.episodes.len(),
        });
    }

    let tx = db.conn.unchecked_transaction()?;
    let mut summary = IngestSummary {
        documents: 1,
        ..Default::default()
    };

    for t in &doc.techniques {
        db.upsert_technique(&t.to_technique())?;
        summary.techniques += 1;
    }

    for t in &doc.tools {
        db.upsert_tool(&t.to_tool())?;
        summary.tools += 1;
    }
    for t in &doc.tools {
        for technique in &t.techniques {
            if db.link_tool_technique(t.id.trim(), technique.trim())? {
                summary.tool_techniques += 1;
            } else {
                warn!(tool = %t.id, technique = %technique, "Unknown technique code, compatibility skipped");
            }
        }
    }

    for c in &doc.colors {
        if c.name().is_empty() {
            continue;
        }
        db.upsert_color(c.name(), c.hex_code())?;
        summary.colors += 1;
    }

    for s in &doc.subjects {
        if s.key().is_empty() {
            continue;
        }
        db.upsert_subject(s.key())?;
        summary.subjects += 1;
    }

    for e in &doc.episodes {
        db.upsert_episode(&e.to_new_episode())
            .with_context(|| format!("Failed to store episode \"{}\"", e.title))?;
        summary.episodes += 1;
    }

    tx.commit()?;
    info!(
        origin,
        episodes = summary.episodes,
        tools = summary.tools,
        techniques = summary.techniques,
        "Ingested catalog document"
    );
    Ok(summary)
}
