use std::{fs, path::PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{load_settings, CalendarEditor};
use print_layout::{PrintLayoutTransformer, Viewport};
use shared::domain::CalendarReference;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fit a rendered calendar SVG onto the print page.
    Layout {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
    /// Show the initial zoom and ruler geometry for a window width.
    Zoom {
        #[arg(long)]
        width: f64,
    },
    /// Start an edit session against the configured backend.
    Open {
        #[arg(long)]
        calendar_id: Option<String>,
        #[arg(long)]
        template_id: Option<String>,
        #[arg(long)]
        preview_out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
    let cli = Cli::parse();
    let settings = load_settings();

    match cli.command {
        Command::Layout { input, output } => {
            let source = fs::read_to_string(&input)
                .with_context(|| format!("failed to read {}", input.display()))?;
            let page = PrintLayoutTransformer::new(settings.page).transform(&source);
            match &page.placement {
                Some(placement) => println!(
                    "scale={} offset=({}, {}) size={}x{}",
                    placement.scale,
                    placement.offset_x,
                    placement.offset_y,
                    placement.scaled_width,
                    placement.scaled_height
                ),
                None => warn!(input = %input.display(), "layout: svg left unchanged"),
            }
            fs::write(&output, &page.svg)
                .with_context(|| format!("failed to write {}", output.display()))?;
        }
        Command::Zoom { width } => {
            let viewport = Viewport::new(settings.page, settings.zoom, width);
            println!("zoom={}", viewport.zoom());
            println!("{}", serde_json::to_string_pretty(&viewport.rulers())?);
        }
        Command::Open {
            calendar_id,
            template_id,
            preview_out,
        } => {
            let editor = CalendarEditor::connect(&settings)?;
            editor
                .open(CalendarReference::from_parts(calendar_id, template_id))
                .await?;

            let session = editor.session().await;
            println!("{}", serde_json::to_string_pretty(&session.snapshot())?);

            if let Some(path) = preview_out {
                let svg = editor
                    .current_svg()
                    .await
                    .ok_or_else(|| anyhow!("session has no preview to write"))?;
                fs::write(&path, svg)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                info!(path = %path.display(), "layout: wrote print preview");
            }
            editor.shutdown().await;
        }
    }

    Ok(())
}
