//! Shared fixtures for unit tests.

use chrono::NaiveDate;
use tempfile::TempDir;

use crate::db::models::{NewEpisode, NewLink, Technique, Tool};
use crate::db::Database;

pub fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d)
}

pub fn setup_test_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let db = Database::open(&db_path).unwrap();
    (db, temp_dir)
}

fn links(keys: &[&str]) -> Vec<NewLink> {
    keys.iter().map(|k| NewLink::new(*k)).collect()
}

fn tool(id: &str, name: &str) -> Tool {
    Tool {
        id: id.into(),
        name: name.into(),
        category: Some("Brush".into()),
        primary_uses: None,
        compatible_colors: None,
    }
}

fn technique(id: &str, name: &str) -> Technique {
    Technique {
        id: id.into(),
        name: name.into(),
        description: None,
        primary_colors_used: None,
        common_subjects: None,
        difficulty_level: Some("Beginner".into()),
    }
}

/// Three episodes:
/// - E1 (1983-12-06): Bright Red, Fan Brush, Wet-on-Wet, Mountain + Trees
/// - E2 (1983-12-13): Phthalo Blue + Van Dyke Brown, Palette Knife, Knife Painting, Trees
/// - E3 (1984-01-03): Bright Red + Van Dyke Brown, Fan Brush, Wet-on-Wet, Cabin
pub fn sample_catalog() -> (Database, TempDir) {
    let (db, temp) = setup_test_db();

    db.upsert_tool(&tool("TL001", "Fan Brush")).unwrap();
    db.upsert_tool(&tool("TL002", "Palette Knife")).unwrap();
    db.upsert_technique(&technique("T001", "Wet-on-Wet")).unwrap();
    db.upsert_technique(&technique("T002", "Knife Painting")).unwrap();
    db.link_tool_technique("TL001", "T001").unwrap();
    db.link_tool_technique("TL002", "T002").unwrap();

    db.upsert_episode(&NewEpisode {
        title: "Winter Sun".into(),
        season_number: 1,
        episode_number: 1,
        air_date: date(1983, 12, 6),
        youtube_url: Some("https://www.youtube.com/embed/e1".into()),
        image_url: Some("https://example.org/e1.png".into()),
        colors: links(&["Bright Red"]),
        subjects: links(&["Trees", "Mountain"]),
        tools: links(&["TL001"]),
        techniques: links(&["T001"]),
    })
    .unwrap();

    db.upsert_episode(&NewEpisode {
        title: "Quiet Stream".into(),
        season_number: 1,
        episode_number: 2,
        air_date: date(1983, 12, 13),
        youtube_url: Some("https://www.youtube.com/embed/e2".into()),
        image_url: None,
        colors: links(&["Phthalo Blue", "Van Dyke Brown"]),
        subjects: links(&["Trees"]),
        tools: links(&["TL002"]),
        techniques: links(&["T002"]),
    })
    .unwrap();

    db.upsert_episode(&NewEpisode {
        title: "Snowy Cabin".into(),
        season_number: 1,
        episode_number: 3,
        air_date: date(1984, 1, 3),
        youtube_url: None,
        image_url: None,
        colors: links(&["Bright Red", "Van Dyke Brown"]),
        subjects: links(&["Cabin"]),
        tools: links(&["TL001"]),
        techniques: links(&["T001"]),
    })
    .unwrap();

    (db, temp)
}
