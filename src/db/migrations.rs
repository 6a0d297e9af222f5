use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

/// Run all pending migrations against a freshly created v1 schema.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS jop_migrations (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
        );",
    )?;

    // Reverse junction lookups used by the name and id filters.
    run_migration(conn, 1, "filter_indexes", |c| {
        c.execute_batch(
            "CREATE INDEX IF NOT EXISTS idx_episodes_air_date ON episodes(air_date);
             CREATE INDEX IF NOT EXISTS idx_episode_colors_color ON episode_colors(color_id);
             CREATE INDEX IF NOT EXISTS idx_episode_subjects_subject ON episode_subjects(subject_id);
             CREATE INDEX IF NOT EXISTS idx_episode_tools_tool ON episode_tools(tool_id);
             CREATE INDEX IF NOT EXISTS idx_episode_techniques_technique
                ON episode_techniques(technique_id);",
        )?;
        Ok(())
    })?;

    Ok(())
}

fn run_migration<F>(conn: &Connection, id: i64, name: &str, f: F) -> Result<()>
where
    F: FnOnce(&Connection) -> Result<()>,
{
    let already_applied: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM jop_migrations WHERE id = ?1",
        [id],
        |row| row.get(0),
    )?;

    if already_applied {
        return Ok(());
    }

    f(conn)?;

    conn.execute(
        "INSERT INTO jop_migrations (id, name) VALUES (?1, ?2)",
        rusqlite::params![id, name],
    )?;

    info!("Applied migration {id}: {name}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::schema::create_schema(&conn).unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let applied: i64 = conn
            .query_row("SELECT COUNT(*) FROM jop_migrations", [], |r| r.get(0))
            .unwrap();
        assert_eq!(applied, 1);
    }

    fn index_names(conn: &Connection) -> Vec<String> {
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'index' AND name LIKE 'idx_%' ORDER BY name")
            .unwrap();
        let names = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<String>, _>>()
            .unwrap();
        names
    }

    #[test]
    fn filter_indexes_are_created_once() {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::schema::create_schema(&conn).unwrap();
        assert!(index_names(&conn).is_empty());

        run_migrations(&conn).unwrap();
        assert_eq!(
            index_names(&conn),
            vec![
                "idx_episode_colors_color",
                "idx_episode_subjects_subject",
                "idx_episode_techniques_technique",
                "idx_episode_tools_tool",
                "idx_episodes_air_date",
            ]
        );

        // A recorded migration is not replayed.
        conn.execute_batch("DROP INDEX idx_episodes_air_date").unwrap();
        run_migrations(&conn).unwrap();
        assert_eq!(index_names(&conn).len(), 4);
    }
}
