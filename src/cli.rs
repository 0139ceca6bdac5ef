use clap::{Parser, Subcommand};
use std::path::PathBuf;
use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use calltrace::config::Config;
use calltrace::core::{collect_scripts, replay_all, validate_depth, RendererKind, Script, Tracer};

/// Name of the config file written by `init`
const CONFIG_FILE_NAME: &str = "calltrace.toml";

#[derive(Parser)]
#[command(name = "calltrace")]
#[command(about = "Records call trees and renders them as sequence diagrams")]
#[command(version)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default configuration file
    Init {
        /// Target directory (defaults to current directory)
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },

    /// Replay recorded call-event scripts and render their diagrams
    Replay {
        /// Script files, or directories searched for *.jsonl scripts
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Renderer for roots that do not name one
        #[arg(short, long, value_enum)]
        renderer: Option<RendererKind>,

        /// Maximum depth for roots that do not set one
        #[arg(long)]
        max_depth: Option<i64>,

        /// Directory for diagrams without an explicit output path
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
}

impl Cli {
    pub fn execute(self) -> Result<()> {
        match self.command {
            Commands::Init { path, force } => init(path, force),
            Commands::Replay { paths, renderer, max_depth, output_dir } => {
                let mut config = Config::load_or_default(self.config.as_deref())?;
                if let Some(renderer) = renderer {
                    config.trace.renderer = renderer;
                }
                if let Some(depth) = max_depth {
                    config.trace.max_depth = validate_depth(depth)?;
                }
                if let Some(dir) = output_dir {
                    config.trace.output_dir = Some(dir);
                }
                replay(config, &paths)
            }
        }
    }
}

fn init(path: Option<PathBuf>, force: bool) -> Result<()> {
    let target_dir = match path {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    info!("Initializing calltrace in: {}", target_dir.display());

    std::fs::create_dir_all(&target_dir)
        .with_context(|| format!("Cannot create {}", target_dir.display()))?;

    let config_path = target_dir.join(CONFIG_FILE_NAME);
    if config_path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", config_path.display());
    }

    Config::default().save(&config_path)?;
    info!("Wrote {}", config_path.display());
    Ok(())
}

fn replay(config: Config, paths: &[PathBuf]) -> Result<()> {
    let output_dir = config.output_dir();
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Cannot create output directory {}", output_dir.display()))?;

    let scripts = collect_scripts(paths)?
        .iter()
        .map(|path| Script::load(path).with_context(|| format!("Invalid script {}", path.display())))
        .collect::<Result<Vec<_>>>()?;

    if scripts.is_empty() {
        warn!("No scripts found");
        return Ok(());
    }

    let tracer = Tracer::new(config);
    for summary in replay_all(&tracer, &scripts)? {
        if summary.unclosed > 0 {
            warn!("{}: closed {} unfinished calls", summary.script, summary.unclosed);
        }
        for output in &summary.outputs {
            println!("{}", output.display());
        }
    }
    Ok(())
}
