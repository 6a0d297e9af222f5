pub mod migrations;
pub mod models;
pub mod schema;

use anyhow::{Context, Result};
use rusqlite::{Connection, OpenFlags, OptionalExtension};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use models::*;

pub struct Database {
    pub conn: Connection,
    pub path: PathBuf,
}

impl Database {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;

        // Performance pragmas
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA cache_size = -64000;",
        )?;

        schema::create_schema(&conn)?;
        migrations::run_migrations(&conn)?;

        info!("Opened database: {}", path.display());

        Ok(Database {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// Open a short-lived, query-only handle on an existing catalog.
    ///
    /// Used once per search request; the connection closes when the handle is
    /// dropped. Never creates the file or the schema.
    pub fn open_query_handle(path: &Path) -> rusqlite::Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX
                | OpenFlags::SQLITE_OPEN_URI,
        )?;
        conn.execute_batch(
            "PRAGMA query_only = ON;
             PRAGMA busy_timeout = 5000;",
        )?;

        Ok(Database {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// Default database path: ~/.jop/jop.db
    pub fn default_db_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".jop").join("jop.db"))
    }

    /// Insert or update a color by name. Returns its id.
    pub fn upsert_color(&self, name: &str, hex_code: Option<&str>) -> Result<i64> {
        let id = self.conn.query_row(
            "INSERT INTO colors (name, hex_code) VALUES (?1, ?2)
             ON CONFLICT(name) DO UPDATE SET hex_code = COALESCE(excluded.hex_code, colors.hex_code)
             RETURNING id",
            rusqlite::params![name, hex_code],
            |r| r.get(0),
        )?;
        Ok(id)
    }

    /// Insert a subject by name if it doesn't exist. Returns its id.
    pub fn upsert_subject(&self, name: &str) -> Result<i64> {
        let id = self.conn.query_row(
            "INSERT INTO subjects (name) VALUES (?1)
             ON CONFLICT(name) DO UPDATE SET name = excluded.name
             RETURNING id",
            [name],
            |r| r.get(0),
        )?;
        Ok(id)
    }

    pub fn upsert_tool(&self, tool: &Tool) -> Result<()> {
        self.conn.execute(
            "INSERT INTO tools (id, name, category, primary_uses, compatible_colors)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                category = excluded.category,
                primary_uses = excluded.primary_uses,
                compatible_colors = excluded.compatible_colors",
            rusqlite::params![
                tool.id,
                tool.name,
                tool.category,
                tool.primary_uses,
                tool.compatible_colors,
            ],
        )?;
        Ok(())
    }

    pub fn upsert_technique(&self, t: &Technique) -> Result<()> {
        self.conn.execute(
            "INSERT INTO techniques (id, name, description, primary_colors_used, common_subjects, difficulty_level)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                primary_colors_used = excluded.primary_colors_used,
                common_subjects = excluded.common_subjects,
                difficulty_level = excluded.difficulty_level",
            rusqlite::params![
                t.id,
                t.name,
                t.description,
                t.primary_colors_used,
                t.common_subjects,
                t.difficulty_level,
            ],
        )?;
        Ok(())
    }

    /// Record that a tool is compatible with a technique. Returns false when
    /// either side is unknown.
    pub fn link_tool_technique(&self, tool_id: &str, technique_id: &str) -> Result<bool> {
        let linked = self.conn.execute(
            "INSERT OR IGNORE INTO tool_techniques (tool_id, technique_id)
             SELECT t.id, tc.id FROM tools t, techniques tc WHERE t.id = ?1 AND tc.id = ?2",
            rusqlite::params![tool_id, technique_id],
        )?;
        Ok(linked > 0 || self.tool_technique_exists(tool_id, technique_id)?)
    }

    fn tool_technique_exists(&self, tool_id: &str, technique_id: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM tool_techniques WHERE tool_id = ?1 AND technique_id = ?2",
            rusqlite::params![tool_id, technique_id],
            |r| r.get(0),
        )?;
        Ok(count > 0)
    }

    /// Upsert an episode keyed by (season, episode) and attach its associations.
    ///
    /// Runs in its own transaction unless one is already open. Missing colors and subjects are created by name. Unknown tool or
    /// technique codes are skipped with a warning. Returns the episode id.
    pub fn upsert_episode(&self, e: &NewEpisode) -> Result<i64> {
        // Join the caller's transaction when there is one.
        let tx = if self.conn.is_autocommit() {
            Some(self.conn.unchecked_transaction()?)
        } else {
            None
        };
        let conn = &self.conn;

        let episode_id: i64 = conn.query_row(
            "INSERT INTO episodes (title, season_number, episode_number, air_date, youtube_url, image_url)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(season_number, episode_number) DO UPDATE SET
                title = excluded.title,
                air_date = COALESCE(excluded.air_date, episodes.air_date),
                youtube_url = COALESCE(excluded.youtube_url, episodes.youtube_url),
                image_url = COALESCE(excluded.image_url, episodes.image_url)
             RETURNING id",
            rusqlite::params![
                e.title,
                e.season_number,
                e.episode_number,
                e.air_date,
                e.youtube_url,
                e.image_url,
            ],
            |r| r.get(0),
        )?;

        // Colors
        for link in &e.colors {
            conn.execute("INSERT OR IGNORE INTO colors (name) VALUES (?1)", [&link.key])?;
            conn.execute(
                "INSERT INTO episode_colors (episode_id, color_id, is_used)
                 SELECT ?1, id, ?3 FROM colors WHERE name = ?2
                 ON CONFLICT(episode_id, color_id) DO UPDATE SET is_used = excluded.is_used",
                rusqlite::params![episode_id, link.key, link.flag],
            )?;
        }

        // Subjects
        for link in &e.subjects {
            conn.execute("INSERT OR IGNORE INTO subjects (name) VALUES (?1)", [&link.key])?;
            conn.execute(
                "INSERT INTO episode_subjects (episode_id, subject_id, is_featured)
                 SELECT ?1, id, ?3 FROM subjects WHERE name = ?2
                 ON CONFLICT(episode_id, subject_id) DO UPDATE SET is_featured = excluded.is_featured",
                rusqlite::params![episode_id, link.key, link.flag],
            )?;
        }

        // Tools
        for link in &e.tools {
            let linked = conn.execute(
                "INSERT INTO episode_tools (episode_id, tool_id, is_used)
                 SELECT ?1, id, ?3 FROM tools WHERE id = ?2
                 ON CONFLICT(episode_id, tool_id) DO UPDATE SET is_used = excluded.is_used",
                rusqlite::params![episode_id, link.key, link.flag],
            )?;
            if linked == 0 {
                warn!(tool = %link.key, episode = %e.title, "Unknown tool code, link skipped");
            }
        }

        // Techniques
        for link in &e.techniques {
            let linked = conn.execute(
                "INSERT INTO episode_techniques (episode_id, technique_id, is_featured)
                 SELECT ?1, id, ?3 FROM techniques WHERE id = ?2
                 ON CONFLICT(episode_id, technique_id) DO UPDATE SET is_featured = excluded.is_featured",
                rusqlite::params![episode_id, link.key, link.flag],
            )?;
            if linked == 0 {
                warn!(technique = %link.key, episode = %e.title, "Unknown technique code, link skipped");
            }
        }

        if let Some(tx) = tx {
            tx.commit()?;
        }
        Ok(episode_id)
    }

    /// Set title and air date for the episode at (season, episode), creating it
    /// when absent. Returns the episode id.
    pub fn upsert_episode_date(
        &self,
        title: &str,
        season_number: i64,
        episode_number: i64,
        air_date: Option<chrono::NaiveDate>,
    ) -> Result<i64> {
        let id = self.conn.query_row(
            "INSERT INTO episodes (title, season_number, episode_number, air_date)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(season_number, episode_number) DO UPDATE SET
                title = excluded.title,
                air_date = COALESCE(excluded.air_date, episodes.air_date)
             RETURNING id",
            rusqlite::params![title, season_number, episode_number, air_date],
            |r| r.get(0),
        )?;
        Ok(id)
    }

    /// Check if an episode exists at (season, episode).
    pub fn episode_exists(&self, season_number: i64, episode_number: i64) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM episodes WHERE season_number = ?1 AND episode_number = ?2",
            [season_number, episode_number],
            |r| r.get(0),
        )?;
        Ok(count > 0)
    }

    /// Get a single episode by id.
    pub fn get_episode(&self, id: i64) -> Result<Option<Episode>> {
        let episode = self
            .conn
            .query_row(
                "SELECT id, title, season_number, episode_number, air_date, youtube_url, image_url
                 FROM episodes WHERE id = ?1",
                [id],
                episode_from_row,
            )
            .optional()?;
        Ok(episode)
    }

    /// All colors, sorted by name.
    pub fn list_colors(&self) -> rusqlite::Result<Vec<Color>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, hex_code FROM colors ORDER BY name, id")?;
        let rows = stmt.query_map([], |row| {
            Ok(Color {
                id: row.get(0)?,
                name: row.get(1)?,
                hex_code: row.get(2)?,
            })
        })?;
        rows.collect()
    }

    /// All subjects, sorted by name.
    pub fn list_subjects(&self) -> rusqlite::Result<Vec<Subject>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM subjects ORDER BY name, id")?;
        let rows = stmt.query_map([], |row| {
            Ok(Subject {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;
        rows.collect()
    }

    /// All tools, sorted by name.
    pub fn list_tools(&self) -> rusqlite::Result<Vec<Tool>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, category, primary_uses, compatible_colors
             FROM tools ORDER BY name, id",
        )?;
        let rows = stmt.query_map([], tool_from_row)?;
        rows.collect()
    }

    /// All techniques, sorted by name.
    pub fn list_techniques(&self) -> rusqlite::Result<Vec<Technique>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, description, primary_colors_used, common_subjects, difficulty_level
             FROM techniques ORDER BY name, id",
        )?;
        let rows = stmt.query_map([], technique_from_row)?;
        rows.collect()
    }

    pub fn get_tool(&self, id: &str) -> rusqlite::Result<Option<Tool>> {
        self.conn
            .query_row(
                "SELECT id, name, category, primary_uses, compatible_colors FROM tools WHERE id = ?1",
                [id],
                tool_from_row,
            )
            .optional()
    }

    /// Techniques compatible with a tool, sorted by name.
    pub fn techniques_for_tool(&self, tool_id: &str) -> rusqlite::Result<Vec<Technique>> {
        let mut stmt = self.conn.prepare(
            "SELECT tc.id, tc.name, tc.description, tc.primary_colors_used, tc.common_subjects, tc.difficulty_level
             FROM tool_techniques tt
             JOIN techniques tc ON tc.id = tt.technique_id
             WHERE tt.tool_id = ?1
             ORDER BY tc.name, tc.id",
        )?;
        let rows = stmt.query_map([tool_id], technique_from_row)?;
        rows.collect()
    }

    /// Get database statistics.
    pub fn stats(&self) -> Result<DbStats> {
        let count = |sql: &str| -> Result<i64> {
            Ok(self.conn.query_row(sql, [], |r| r.get(0))?)
        };

        let mut stmt = self.conn.prepare(
            "SELECT season_number, COUNT(*) FROM episodes GROUP BY season_number ORDER BY season_number",
        )?;
        let season_rows = stmt.query_map([], |row| {
            Ok(SeasonCount {
                season: row.get(0)?,
                count: row.get(1)?,
            })
        })?;
        let mut seasons = Vec::new();
        for row in season_rows {
            seasons.push(row?);
        }

        let db_size_bytes = std::fs::metadata(&self.path)
            .map(|m| m.len())
            .unwrap_or(0);

        Ok(DbStats {
            episodes: count("SELECT COUNT(*) FROM episodes")?,
            colors: count("SELECT COUNT(*) FROM colors")?,
            subjects: count("SELECT COUNT(*) FROM subjects")?,
            tools: count("SELECT COUNT(*) FROM tools")?,
            techniques: count("SELECT COUNT(*) FROM techniques")?,
            episode_colors: count("SELECT COUNT(*) FROM episode_colors")?,
            episode_subjects: count("SELECT COUNT(*) FROM episode_subjects")?,
            episode_tools: count("SELECT COUNT(*) FROM episode_tools")?,
            episode_techniques: count("SELECT COUNT(*) FROM episode_techniques")?,
            tool_techniques: count("SELECT COUNT(*) FROM tool_techniques")?,
            undated_episodes: count("SELECT COUNT(*) FROM episodes WHERE air_date IS NULL")?,
            seasons,
            db_size_bytes,
        })
    }

    /// Stored schema version, if the meta table has one.
    pub fn schema_version(&self) -> Result<Option<String>> {
        let version = self
            .conn
            .query_row(
                "SELECT value FROM jop_meta WHERE key = 'schema_version'",
                [],
                |r| r.get(0),
            )
            .optional()?;
        Ok(version)
    }
}

pub(crate) fn episode_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Episode> {
    Ok(Episode {
        id: row.get(0)?,
        title: row.get(1)?,
        season_number: row.get(2)?,
        episode_number: row.get(3)?,
        air_date: row.get(4)?,
        youtube_url: row.get(5)?,
        image_url: row.get(6)?,
    })
}

fn tool_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Tool> {
    Ok(Tool {
        id: row.get(0)?,
        name: row.get(1)?,
        category: row.get(2)?,
        primary_uses: row.get(3)?,
        compatible_colors: row.get(4)?,
    })
}

fn technique_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Technique> {
    Ok(Technique {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        primary_colors_used: row.get(3)?,
        common_subjects: row.get(4)?,
        difficulty_level: row.get(5)?,
    })
}
