use anyhow::Result;
use rusqlite::Connection;

pub const SCHEMA_VERSION: &str = "1";

pub fn create_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        -- Version tracking
        CREATE TABLE IF NOT EXISTS jop_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        -- Entity tables
        CREATE TABLE IF NOT EXISTS episodes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            season_number INTEGER NOT NULL,
            episode_number INTEGER NOT NULL,
            air_date TEXT,
            youtube_url TEXT,
            image_url TEXT,
            UNIQUE(season_number, episode_number)
        );

        CREATE TABLE IF NOT EXISTS colors (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            hex_code TEXT
        );

        CREATE TABLE IF NOT EXISTS subjects (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS tools (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            category TEXT,
            primary_uses TEXT,
            compatible_colors TEXT
        );

        CREATE TABLE IF NOT EXISTS techniques (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT,
            primary_colors_used TEXT,
            common_subjects TEXT,
            difficulty_level TEXT
        );

        -- Junction tables
        CREATE TABLE IF NOT EXISTS episode_colors (
            episode_id INTEGER NOT NULL REFERENCES episodes(id) ON DELETE CASCADE,
            color_id INTEGER NOT NULL REFERENCES colors(id) ON DELETE CASCADE,
            is_used INTEGER NOT NULL DEFAULT 1,
            PRIMARY KEY (episode_id, color_id)
        );

        CREATE TABLE IF NOT EXISTS episode_subjects (
            episode_id INTEGER NOT NULL REFERENCES episodes(id) ON DELETE CASCADE,
            subject_id INTEGER NOT NULL REFERENCES subjects(id) ON DELETE CASCADE,
            is_featured INTEGER NOT NULL DEFAULT 1,
            PRIMARY KEY (episode_id, subject_id)
        );

        CREATE TABLE IF NOT EXISTS episode_tools (
            episode_id INTEGER NOT NULL REFERENCES episodes(id) ON DELETE CASCADE,
            tool_id TEXT NOT NULL REFERENCES tools(id) ON DELETE CASCADE,
            is_used INTEGER NOT NULL DEFAULT 1,
            PRIMARY KEY (episode_id, tool_id)
        );

        CREATE TABLE IF NOT EXISTS episode_techniques (
            episode_id INTEGER NOT NULL REFERENCES episodes(id) ON DELETE CASCADE,
            technique_id TEXT NOT NULL REFERENCES techniques(id) ON DELETE CASCADE,
            is_featured INTEGER NOT NULL DEFAULT 1,
            PRIMARY KEY (episode_id, technique_id)
        );

        CREATE TABLE IF NOT EXISTS tool_techniques (
            tool_id TEXT NOT NULL REFERENCES tools(id) ON DELETE CASCADE,
            technique_id TEXT NOT NULL REFERENCES techniques(id) ON DELETE CASCADE,
            PRIMARY KEY (tool_id, technique_id)
        );
        ",
    )?;

    conn.execute(
        "INSERT OR REPLACE INTO jop_meta (key, value) VALUES ('schema_version', ?1)",
        [SCHEMA_VERSION],
    )?;

    Ok(())
}
