//! Headless sketch battle runner.
//!
//! Runs the battlefield without a browser, controlled via JSON on
//! stdin/stdout or scripted by scenario files.
//!
//! # Usage
//!
//! ```bash
//! # Interactive mode - read commands from stdin
//! cargo run -p sketchwar_headless
//!
//! # Play a scenario to the end
//! cargo run -p sketchwar_headless -- simulate --scenario scenarios/skirmish.ron
//!
//! # Win rates over 500 seeds
//! cargo run -p sketchwar_headless -- sweep --runs 500
//!
//! # Show a terrain preset
//! cargo run -p sketchwar_headless -- map --terrain map1
//! ```
//!
//! # Output
//!
//! stdout carries JSON (protocol responses, outcomes, summaries) or the
//! requested dump; logs and live ASCII frames go to stderr.

use std::fmt::Display;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use sketchwar_core::battlefield::Battlefield;
use sketchwar_core::catalog::UnitCatalog;
use sketchwar_core::config::BattlefieldConfig;
use sketchwar_core::random::{RandomSource, SeededRandom};
use sketchwar_core::snapshot::{NullRenderer, Renderer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sketchwar_headless::{
    ascii::{render_ascii, AsciiConfig, AsciiRenderer},
    batch::{run_sweep, SweepConfig},
    runner::{HeadlessRunner, RunnerConfig, DEFAULT_FRAME_MS},
    scenario::{load_catalog, parse_terrain, Scenario},
};

#[derive(Parser)]
#[command(name = "sketchwar_headless")]
#[command(about = "Headless sketch battle runner for scripted matches and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Unit catalog RON file (built-in roster when absent)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the JSON-lines protocol on stdin/stdout
    Run {
        /// Terrain: plain, generated, or a preset id
        #[arg(short, long, default_value = "map1")]
        terrain: String,

        /// Random seed (entropy when absent)
        #[arg(long)]
        seed: Option<u64>,

        /// Clock step per frame in milliseconds
        #[arg(long, default_value_t = DEFAULT_FRAME_MS)]
        frame_ms: u64,

        /// Output state after every frame
        #[arg(long)]
        auto_state: bool,

        /// Draw frames as ASCII on stderr
        #[arg(long)]
        ascii: bool,
    },

    /// Play a scenario to a decision or its frame limit
    Simulate {
        /// Scenario file (stock skirmish when absent)
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Override the scenario seed
        #[arg(long)]
        seed: Option<u64>,

        /// Override the frame limit
        #[arg(long)]
        frames: Option<u32>,

        /// Draw frames as ASCII on stderr
        #[arg(long)]
        ascii: bool,

        /// Draw every Nth frame
        #[arg(long, default_value = "10")]
        every: u64,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },

    /// Run a scenario across many seeds and report win rates
    Sweep {
        /// Scenario file (stock skirmish when absent)
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Number of seeds
        #[arg(short, long, default_value = "100")]
        runs: u32,

        /// First seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Worker threads (0 = auto)
        #[arg(short, long, default_value = "0")]
        threads: usize,
    },

    /// Print a fresh board as ASCII
    Map {
        /// Terrain: plain, generated, or a preset id
        #[arg(short, long, default_value = "map1")]
        terrain: String,

        /// Seed for generated terrain
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,

        /// Print preset-format row strings instead of the drawn board
        #[arg(long)]
        layout: bool,
    },

    /// Dump the unit catalog as RON
    Catalog {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr; stdout is for protocol and results
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    let catalog = match load_catalog(cli.catalog.as_deref()) {
        Ok(catalog) => Arc::new(catalog),
        Err(e) => fail("Failed to load unit catalog", e),
    };

    match cli.command {
        Some(Commands::Run {
            terrain,
            seed,
            frame_ms,
            auto_state,
            ascii,
        }) => cmd_run(catalog, &terrain, seed, frame_ms, auto_state, ascii),
        Some(Commands::Simulate {
            scenario,
            seed,
            frames,
            ascii,
            every,
            no_color,
        }) => cmd_simulate(catalog, scenario.as_deref(), seed, frames, ascii, every, no_color),
        Some(Commands::Sweep {
            scenario,
            runs,
            seed,
            threads,
        }) => cmd_sweep(catalog, scenario.as_deref(), runs, seed, threads),
        Some(Commands::Map {
            terrain,
            seed,
            no_color,
            layout,
        }) => cmd_map(catalog, &terrain, seed, no_color, layout),
        Some(Commands::Catalog { output }) => cmd_catalog(&catalog, output.as_deref()),
        None => {
            // Default: interactive mode on the stock map
            cmd_run(catalog, "map1", None, DEFAULT_FRAME_MS, false, false);
        }
    }
}

/// Log, report on stderr and exit with status 1.
fn fail(context: &str, err: impl Display) -> ! {
    tracing::error!(error = %err, "{context}");
    eprintln!("FATAL: {context}: {err}");
    std::process::exit(1);
}

fn board(catalog: Arc<UnitCatalog>, terrain: &str, random: Box<dyn RandomSource>) -> Battlefield {
    let config = BattlefieldConfig {
        terrain: parse_terrain(terrain),
        ..BattlefieldConfig::default()
    };
    Battlefield::new(config, catalog, random).unwrap_or_else(|e| fail("Invalid board", e))
}

fn load_scenario(path: Option<&Path>) -> Scenario {
    match path {
        Some(path) => Scenario::load(path).unwrap_or_else(|e| fail("Failed to load scenario", e)),
        None => Scenario::skirmish(),
    }
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => fail("Failed to serialize result", e),
    }
}

/// Serve the protocol until quit or end of input
fn cmd_run(
    catalog: Arc<UnitCatalog>,
    terrain: &str,
    seed: Option<u64>,
    frame_ms: u64,
    auto_state: bool,
    ascii: bool,
) {
    tracing::info!(terrain, ?seed, frame_ms, "Starting interactive session");

    let random: Box<dyn RandomSource> = match seed {
        Some(seed) => Box::new(SeededRandom::from_seed(seed)),
        None => Box::new(SeededRandom::from_entropy()),
    };
    let config = RunnerConfig {
        frame_ms,
        auto_state,
    };
    let mut runner = HeadlessRunner::new(board(catalog, terrain, random), config);
    if ascii {
        runner = runner.with_renderer(Box::new(AsciiRenderer::new(
            io::stderr(),
            AsciiConfig::default(),
        )));
    }

    let stdin = io::stdin();
    if let Err(e) = runner.run(stdin.lock(), io::stdout().lock()) {
        fail("Session I/O failed", e);
    }
}

/// Play one scenario and print its outcome
fn cmd_simulate(
    catalog: Arc<UnitCatalog>,
    path: Option<&Path>,
    seed: Option<u64>,
    frames: Option<u32>,
    ascii: bool,
    every: u64,
    no_color: bool,
) {
    let mut scenario = load_scenario(path);
    if let Some(seed) = seed {
        scenario.seed = seed;
    }
    if let Some(frames) = frames {
        scenario.max_frames = frames;
    }

    let mut renderer: Box<dyn Renderer> = if ascii {
        let config = AsciiConfig {
            use_color: !no_color,
            show_legend: false,
            every,
        };
        Box::new(AsciiRenderer::new(io::stderr(), config))
    } else {
        Box::new(NullRenderer)
    };

    match scenario.run(catalog, renderer.as_mut()) {
        Ok(outcome) => print_json(&outcome),
        Err(e) => fail("Scenario failed", e),
    }
}

/// Sweep a scenario over seeds and print the summary
fn cmd_sweep(
    catalog: Arc<UnitCatalog>,
    path: Option<&Path>,
    runs: u32,
    seed: u64,
    threads: usize,
) {
    let scenario = load_scenario(path);
    let config = SweepConfig {
        seed_start: seed,
        runs,
        threads,
    };
    tracing::info!(scenario = %scenario.name, runs, seed, threads, "Starting sweep");

    match run_sweep(&scenario, catalog, config) {
        Ok(summary) => print_json(&summary),
        Err(e) => fail("Sweep failed", e),
    }
}

/// Print a fresh board and the glyph key, or its terrain layout
fn cmd_map(catalog: Arc<UnitCatalog>, terrain: &str, seed: u64, no_color: bool, layout: bool) {
    let field = board(catalog, terrain, Box::new(SeededRandom::from_seed(seed)));
    if layout {
        for row in field.terrain().layout_rows() {
            println!("{row}");
        }
        return;
    }
    let config = AsciiConfig {
        use_color: !no_color,
        show_legend: true,
        every: 1,
    };
    print!("{}", render_ascii(&field.snapshot(), &config));
}

/// Dump the catalog as RON
fn cmd_catalog(catalog: &UnitCatalog, output: Option<&Path>) {
    let text = catalog
        .to_ron()
        .unwrap_or_else(|e| fail("Failed to serialize catalog", e));
    match output {
        Some(path) => {
            if let Err(e) = std::fs::write(path, text) {
                fail("Failed to write catalog", e);
            }
            tracing::info!(path = %path.display(), "Catalog written");
        }
        None => println!("{text}"),
    }
}
