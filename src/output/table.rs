use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::db::models::*;
use crate::ingest::IngestSummary;
use crate::search::ResultEnvelope;

/// Truncate a string to fit within max_width (respecting unicode width).
fn truncate(s: &str, max_width: usize) -> String {
    if UnicodeWidthStr::width(s) <= max_width {
        return s.to_string();
    }
    let mut result = String::new();
    let mut width = 0;
    for ch in s.chars() {
        let cw = UnicodeWidthChar::width(ch).unwrap_or(0);
        if width + cw + 3 > max_width {
            result.push_str("...");
            break;
        }
        result.push(ch);
        width += cw;
    }
    result
}

/// Left-align to a display width; `{:<n}` pads by chars, not columns.
fn pad(s: &str, width: usize) -> String {
    let s = truncate(s, width);
    let fill = width.saturating_sub(UnicodeWidthStr::width(s.as_str()));
    format!("{s}{}", " ".repeat(fill))
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

/// Format one page of episode results.
pub fn print_episode_page(envelope: &ResultEnvelope) {
    let p = &envelope.pagination;
    let f = &envelope.filters_applied;

    if p.total == 0 {
        println!("No episodes match.");
        return;
    }

    println!(
        "{} episode{} ({} mode), page {} of {}:\n",
        p.total,
        plural(p.total),
        f.logic,
        p.page,
        p.pages.max(1),
    );

    if envelope.episodes.is_empty() {
        println!("  (page {} is past the last page)", p.page);
        return;
    }

    println!("  {} {:<8} {:<12}", pad("TITLE", 36), "EPISODE", "AIRED");
    println!("  {}", "-".repeat(58));

    for e in &envelope.episodes {
        let aired = e
            .air_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {} {:<8} {:<12}",
            pad(&e.title, 36),
            format!("S{:02}E{:02}", e.season, e.episode),
            aired,
        );
        if !e.colors.is_empty() {
            println!("    colors:     {}", truncate(&e.colors.join(", "), 68));
        }
        if !e.subjects.is_empty() {
            println!("    subjects:   {}", truncate(&e.subjects.join(", "), 68));
        }
        if !e.tools.is_empty() {
            println!("    tools:      {}", truncate(&e.tools.join(", "), 68));
        }
        if !e.techniques.is_empty() {
            println!("    techniques: {}", truncate(&e.techniques.join(", "), 68));
        }
        println!("    id: {}\n", e.id);
    }
}

pub fn print_colors(colors: &[Color]) {
    println!("{} color{}:\n", colors.len(), plural(colors.len()));
    for c in colors {
        println!(
            "  {:>4}  {} {}",
            c.id,
            pad(&c.name, 28),
            c.hex_code.as_deref().unwrap_or("")
        );
    }
}

pub fn print_subjects(subjects: &[Subject]) {
    println!("{} subject{}:\n", subjects.len(), plural(subjects.len()));
    for s in subjects {
        println!("  {:>4}  {}", s.id, truncate(&s.name, 60));
    }
}

pub fn print_tools(tools: &[Tool]) {
    println!("{} tool{}:\n", tools.len(), plural(tools.len()));
    for t in tools {
        println!(
            "  {:<8} {} {}",
            t.id,
            pad(&t.name, 30),
            t.category.as_deref().unwrap_or("")
        );
    }
}

pub fn print_techniques(techniques: &[Technique]) {
    println!("{} technique{}:\n", techniques.len(), plural(techniques.len()));
    for t in techniques {
        println!(
            "  {:<8} {} {}",
            t.id,
            pad(&t.name, 30),
            t.difficulty_level.as_deref().unwrap_or("")
        );
        if let Some(ref desc) = t.description {
            println!("           {}", truncate(desc, 68));
        }
    }
}

pub fn print_ingest_summary(summary: &IngestSummary, dry_run: bool) {
    let action = if dry_run { "Would ingest" } else { "Ingested" };
    println!(
        "{action} {} document{}: {} episodes, {} colors, {} subjects, {} tools, {} techniques, {} tool/technique links",
        summary.documents,
        plural(summary.documents),
        summary.episodes,
        summary.colors,
        summary.subjects,
        summary.tools,
        summary.techniques,
        summary.tool_techniques,
    );
}

/// Print database stats.
pub fn print_stats(stats: &DbStats) {
    println!("Catalog Statistics:");
    println!("  Episodes:   {} ({} undated)", stats.episodes, stats.undated_episodes);
    println!("  Colors:     {}", stats.colors);
    println!("  Subjects:   {}", stats.subjects);
    println!("  Tools:      {}", stats.tools);
    println!("  Techniques: {}", stats.techniques);
    println!("  DB Size:    {}", format_bytes(stats.db_size_bytes));
    println!("\n  Links:");
    println!("    episode/color      {}", stats.episode_colors);
    println!("    episode/subject    {}", stats.episode_subjects);
    println!("    episode/tool       {}", stats.episode_tools);
    println!("    episode/technique  {}", stats.episode_techniques);
    println!("    tool/technique     {}", stats.tool_techniques);
    if !stats.seasons.is_empty() {
        println!("\n  Seasons:");
        for sc in &stats.seasons {
            println!("    {:<4} {}", sc.season, sc.count);
        }
    }
}

pub fn format_bytes(bytes: u64) -> String {
    if bytes >= 1_073_741_824 {
        format!("{:.1} GB", bytes as f64 / 1_073_741_824.0)
    } else if bytes >= 1_048_576 {
        format!("{:.1} MB", bytes as f64 / 1_048_576.0)
    } else if bytes >= 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{bytes} B")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_display_width() {
        assert_eq!(truncate("Happy Little Trees", 40), "Happy Little Trees");
        assert_eq!(truncate("Happy Little Trees", 10), "Happy L...");
        // Wide characters count double.
        assert_eq!(truncate("山山山山山山", 8), "山山...");
    }

    #[test]
    fn pad_fills_to_width() {
        assert_eq!(pad("ab", 5), "ab   ");
        assert_eq!(UnicodeWidthStr::width(pad("山", 5).as_str()), 5);
    }

    #[test]
    fn bytes_are_humanized() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1_048_576), "5.0 MB");
    }
}
