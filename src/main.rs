use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

use jop::config::{self, JopConfig};
use jop::db::Database;
use jop::ingest;
use jop::output::{print_json, table};
use jop::search::deadline::Deadline;
use jop::search::filters::{FilterSpec, Logic};
use jop::search::{search_catalog, SearchRequest};
use jop::server::{self, AppState};

#[derive(Parser)]
#[command(name = "jop", version, about = "Joy of Painting catalog: filter episodes by month, color, subject, tool and technique")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Path to database file (default: ~/.jop/jop.db)
    #[arg(long, global = true, env = "JOP_DB")]
    db: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum ReferenceKind {
    Colors,
    Subjects,
    Tools,
    Techniques,
}

#[derive(Subcommand)]
enum Commands {
    /// Filter episodes
    Search {
        /// Broadcast month, 1-12 (repeatable)
        #[arg(long = "month")]
        months: Vec<u32>,

        /// Color name, case-insensitive substring (repeatable)
        #[arg(long = "color")]
        colors: Vec<String>,

        /// Subject name, case-insensitive substring (repeatable)
        #[arg(long = "subject")]
        subjects: Vec<String>,

        /// Tool name, case-insensitive substring (repeatable)
        #[arg(long = "tool")]
        tools: Vec<String>,

        /// Technique name, case-insensitive substring (repeatable)
        #[arg(long = "technique")]
        techniques: Vec<String>,

        /// Episode id (repeatable)
        #[arg(long = "episode-id")]
        episode_ids: Vec<i64>,

        /// Season number (repeatable)
        #[arg(long = "season")]
        seasons: Vec<i64>,

        /// Title, case-insensitive substring (repeatable)
        #[arg(long = "title")]
        titles: Vec<String>,

        /// Exact color id (repeatable)
        #[arg(long = "color-id")]
        color_ids: Vec<i64>,

        /// Exact subject id (repeatable)
        #[arg(long = "subject-id")]
        subject_ids: Vec<i64>,

        /// Exact tool code, e.g. TL001 (repeatable)
        #[arg(long = "tool-id")]
        tool_ids: Vec<String>,

        /// Exact technique code, e.g. T001 (repeatable)
        #[arg(long = "technique-id")]
        technique_ids: Vec<String>,

        /// How dimensions combine: and, or
        #[arg(long, default_value = "and")]
        mode: String,

        /// Page number, starting at 1
        #[arg(long, default_value = "1")]
        page: i64,

        /// Episodes per page (clamped to 1-100)
        #[arg(long, default_value = "20")]
        per_page: i64,

        /// Abort the query after this many milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
    },

    /// List a reference table
    Reference {
        #[arg(value_enum)]
        kind: ReferenceKind,
    },

    /// Techniques compatible with a tool
    Compat {
        /// Tool code, e.g. TL001
        tool_id: String,
    },

    /// Ingest catalog documents (JSON or YAML) from files or stdin
    Ingest {
        /// File, directory or glob paths to ingest
        paths: Vec<String>,

        /// Read from stdin
        #[arg(long)]
        stdin: bool,

        /// Force format: json, yaml
        #[arg(long)]
        format: Option<String>,

        /// Preview without importing
        #[arg(long)]
        dry_run: bool,
    },

    /// Load air dates from a `"Title" (Month Day, Year)` listing
    IngestDates {
        /// Listing file, one episode per line in broadcast order
        file: PathBuf,

        /// Preview without importing
        #[arg(long)]
        dry_run: bool,
    },

    /// Serve the HTTP API
    Serve {
        /// Address to bind (default: 127.0.0.1:5000)
        #[arg(long, env = "JOP_BIND")]
        bind: Option<String>,

        /// Per-request query timeout in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
    },

    /// Show database statistics
    Stats,

    /// Show database info
    Info,

    /// Show or create ~/.jop/config.toml
    Config {
        /// Write the default template if no config exists
        #[arg(long)]
        init: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let json_output = cli.json;

    let cfg = JopConfig::load()?;
    let db_path = cfg.resolve_db_path(cli.db)?;

    match cli.command {
        Commands::Search {
            months,
            colors,
            subjects,
            tools,
            techniques,
            episode_ids,
            seasons,
            titles,
            color_ids,
            subject_ids,
            tool_ids,
            technique_ids,
            mode,
            page,
            per_page,
            timeout_ms,
        } => {
            let logic: Logic = mode.parse()?;
            let filters = FilterSpec {
                months,
                colors,
                subjects,
                tools,
                techniques,
                episode_ids,
                seasons,
                titles,
                color_ids,
                subject_ids,
                tool_ids,
                technique_ids,
                logic,
            };
            let request = SearchRequest::new(&filters, page, per_page)?;

            // Make sure the catalog exists before opening a query-only handle.
            drop(Database::open(&db_path)?);

            let deadline = match timeout_ms {
                Some(ms) => Deadline::after(Duration::from_millis(ms)),
                None => Deadline::none(),
            };
            let envelope = search_catalog(&db_path, &request, &deadline)?;

            if json_output {
                print_json(&envelope)?;
            } else {
                table::print_episode_page(&envelope);
            }
        }

        Commands::Reference { kind } => {
            let db = Database::open(&db_path)?;
            match kind {
                ReferenceKind::Colors => {
                    let colors = db.list_colors()?;
                    if json_output {
                        print_json(&colors)?;
                    } else {
                        table::print_colors(&colors);
                    }
                }
                ReferenceKind::Subjects => {
                    let subjects = db.list_subjects()?;
                    if json_output {
                        print_json(&subjects)?;
                    } else {
                        table::print_subjects(&subjects);
                    }
                }
                ReferenceKind::Tools => {
                    let tools = db.list_tools()?;
                    if json_output {
                        print_json(&tools)?;
                    } else {
                        table::print_tools(&tools);
                    }
                }
                ReferenceKind::Techniques => {
                    let techniques = db.list_techniques()?;
                    if json_output {
                        print_json(&techniques)?;
                    } else {
                        table::print_techniques(&techniques);
                    }
                }
            }
        }

        Commands::Compat { tool_id } => {
            let db = Database::open(&db_path)?;
            let tool = db
                .get_tool(&tool_id)?
                .with_context(|| format!("Tool not found: {tool_id}"))?;
            let techniques = db.techniques_for_tool(&tool.id)?;

            if json_output {
                print_json(&serde_json::json!({
                    "tool": tool,
                    "techniques": techniques,
                }))?;
            } else {
                println!("Tool: {} ({})\n", tool.name, tool.id);
                table::print_techniques(&techniques);
            }
        }

        Commands::Ingest {
            paths,
            stdin,
            format,
            dry_run,
        } => {
            let db = Database::open(&db_path)?;
            let format_enum = format
                .as_deref()
                .map(|f| {
                    ingest::Format::from_str(f)
                        .with_context(|| format!("Unknown format: {f}. Use: json, yaml"))
                })
                .transpose()?;

            let summary = if stdin {
                ingest::ingest_stdin(&db, format_enum, dry_run)?
            } else if paths.is_empty() {
                bail!("No paths provided. Use --stdin to read from stdin.");
            } else {
                ingest::ingest_paths(&db, &paths, format_enum, dry_run)?
            };

            if json_output {
                print_json(&summary)?;
            } else {
                table::print_ingest_summary(&summary, dry_run);
            }
        }

        Commands::IngestDates { file, dry_run } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read: {}", file.display()))?;
            let entries = ingest::dates::parse_air_dates(&content)?;
            let undated = entries.iter().filter(|e| e.air_date.is_none()).count();

            let written = if dry_run {
                0
            } else {
                let db = Database::open(&db_path)?;
                ingest::dates::apply_air_dates(&db, &entries)?
            };

            if json_output {
                print_json(&serde_json::json!({
                    "parsed": entries.len(),
                    "undated": undated,
                    "written": written,
                    "dry_run": dry_run,
                }))?;
            } else {
                let action = if dry_run { "Would update" } else { "Updated" };
                println!(
                    "{action} {} episode{} ({undated} without a readable date)",
                    entries.len(),
                    if entries.len() == 1 { "" } else { "s" }
                );
            }
        }

        Commands::Serve { bind, timeout_ms } => {
            // Create the schema up front so request handles only ever read.
            drop(Database::open(&db_path)?);

            let bind = cfg.resolve_bind(bind.as_deref());
            let state = AppState::new(db_path, cfg.resolve_timeout(timeout_ms));

            let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
            runtime.block_on(server::serve(&bind, state))?;
        }

        Commands::Stats => {
            let db = Database::open(&db_path)?;
            let stats = db.stats()?;
            if json_output {
                print_json(&stats)?;
            } else {
                table::print_stats(&stats);
            }
        }

        Commands::Info => {
            let db = Database::open(&db_path)?;
            let stats = db.stats()?;
            let schema_ver = db
                .schema_version()?
                .unwrap_or_else(|| "unknown".to_string());

            if json_output {
                print_json(&serde_json::json!({
                    "version": env!("CARGO_PKG_VERSION"),
                    "schema_version": schema_ver,
                    "db_path": db.path.display().to_string(),
                    "db_size_bytes": stats.db_size_bytes,
                    "episodes": stats.episodes,
                    "colors": stats.colors,
                    "tools": stats.tools,
                }))?;
            } else {
                println!("jop v{}", env!("CARGO_PKG_VERSION"));
                println!("  Schema:   v{schema_ver}");
                println!("  Database: {}", db.path.display());
                println!("  Size:     {}", table::format_bytes(stats.db_size_bytes));
                println!("  Episodes: {}", stats.episodes);
            }
        }

        Commands::Config { init } => {
            if init {
                if config::init_config()? {
                    println!("Created {}", config::config_path()?.display());
                } else {
                    println!("Config already exists: {}", config::config_path()?.display());
                }
            }
            if json_output {
                print_json(&cfg)?;
            } else {
                println!("# {}", config::config_path()?.display());
                println!("{}", cfg.display());
                println!("\nEffective database: {}", db_path.display());
            }
        }
    }

    Ok(())
}
