use std::io::{BufRead, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chartnotes_config::AppConfig;
use chartnotes_data::{open_backend, PointStore, SettingsStore};
use chartnotes_renderer::{render_svg, LayoutOptions};
use chartnotes_shared::{DataPoint, PointDraft, PointPatch};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "chartnotes")]
#[command(about = "Manage chart points, notes and settings", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List points in series order
    List,
    /// Add a point
    Add {
        month: String,
        #[arg(allow_hyphen_values = true)]
        value: f64,
        #[arg(short, long)]
        note: Option<String>,
    },
    /// Change fields of an existing point
    Update {
        id: i64,
        #[arg(short, long)]
        month: Option<String>,
        #[arg(short, long, allow_hyphen_values = true)]
        value: Option<f64>,
        /// Pass an empty string to remove the note
        #[arg(short, long)]
        note: Option<String>,
    },
    /// Remove a point
    Remove { id: i64 },
    /// Import tab-separated rows (label, value, note) from a file or `-` for stdin
    Import { source: String },
    /// Delete every point
    Clear {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Render the chart to an SVG file
    Render {
        #[arg(short, long, default_value = "chart.svg")]
        out: PathBuf,
        #[command(flatten)]
        view: ViewArgs,
    },
    /// Show or change chart settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Report which point a click at (x, y) selects
    Pick {
        x: f64,
        y: f64,
        #[command(flatten)]
        view: ViewArgs,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    Show,
    /// Set one field by name, e.g. `lineStyle straight`
    Set { key: String, value: String },
}

#[derive(clap::Args)]
struct ViewArgs {
    #[arg(long, default_value_t = 800.0)]
    width: f64,
    #[arg(long, default_value_t = 400.0)]
    height: f64,
    /// Draw note bubbles
    #[arg(long)]
    notes: bool,
}

impl ViewArgs {
    fn options(&self) -> LayoutOptions {
        LayoutOptions {
            width: self.width,
            height: self.height,
            show_notes: self.notes,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = AppConfig::load(cli.config.as_deref())?;
    let backend = open_backend(&config.backend_kind())?;
    let points = PointStore::open(Arc::clone(&backend)).await?;
    let settings = SettingsStore::with_delay(
        backend,
        Duration::from_millis(config.settings.debounce_ms),
    );
    settings.load().await?;

    let outcome = run(cli.command, &points, &settings).await;

    // Settings changed in this session must be written before exit
    if let Err(e) = settings.flush().await {
        warn!("failed to save settings: {e}");
    }
    outcome
}

async fn run(command: Commands, points: &PointStore, settings: &SettingsStore) -> Result<()> {
    match command {
        Commands::List => {
            for point in points.list() {
                println!("{}", format_point(&point));
            }
        }
        Commands::Add { month, value, note } => {
            let draft = PointDraft::new(&month, value, note.as_deref())?;
            let point = points.add(draft).await?;
            println!("{}", format_point(&point));
        }
        Commands::Update {
            id,
            month,
            value,
            note,
        } => {
            let point = points.update(id, PointPatch { month, value, note }).await?;
            println!("{}", format_point(&point));
        }
        Commands::Remove { id } => {
            points.remove(id).await?;
            println!("removed {id}");
        }
        Commands::Import { source } => {
            let text = read_source(&source)?;
            let report = points.bulk_add(&text).await?;
            println!(
                "imported {} points, skipped {} rows",
                report.created.len(),
                report.skipped_rows.len()
            );
            for row in report.skipped_rows {
                println!("  skipped line {row}");
            }
        }
        Commands::Clear { yes } => {
            let count = points.len();
            let cleared = points
                .clear_all(|| yes || prompt_confirm(&format!("Delete all {count} points?")))
                .await?;
            if cleared {
                println!("cleared {count} points");
            } else {
                println!("nothing deleted");
            }
        }
        Commands::Render { out, view } => {
            let current = settings.current();
            let layout = points.layout(&current, view.options())?;
            let svg = render_svg(&layout, &points.list(), &current);
            tokio::fs::write(&out, svg)
                .await
                .with_context(|| format!("writing {}", out.display()))?;
            info!("rendered {} points to {}", points.len(), out.display());
            println!("{}", out.display());
        }
        Commands::Settings { action } => match action {
            SettingsAction::Show => {
                println!("{}", to_pretty_json(&settings.current())?);
            }
            SettingsAction::Set { key, value } => {
                let updated = settings.set_field(&key, &value)?;
                println!("{}", to_pretty_json(&updated)?);
            }
        },
        Commands::Pick { x, y, view } => {
            let layout = points.layout(&settings.current(), view.options())?;
            match points.select_at(&layout, x, y) {
                Some(point) => println!("{}", format_point(&point)),
                None => println!("no point at ({x}, {y})"),
            }
        }
    }
    Ok(())
}

fn format_point(point: &DataPoint) -> String {
    match &point.note {
        Some(note) => format!("{:>5}  {:<10} {:>12}  {note}", point.id, point.month, point.value),
        None => format!("{:>5}  {:<10} {:>12}", point.id, point.month, point.value),
    }
}

fn to_pretty_json<T: serde::Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn read_source(source: &str) -> Result<String> {
    if source == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        return Ok(text);
    }
    std::fs::read_to_string(source).with_context(|| format!("reading {source}"))
}

fn prompt_confirm(question: &str) -> bool {
    print!("{question} [y/N] ");
    if std::io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    match std::io::stdin().lock().read_line(&mut answer) {
        Ok(_) => is_yes(&answer),
        Err(_) => false,
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
