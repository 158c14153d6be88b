//! rhythmspace — generate bars of rhythm from the command line.
//!
//! Prints one bar per line (or a musical unit) as text, YAML or JSON:
//!
//!   rhythmspace --time-signature 3/4 --bars 4 --seed 7
//!   rhythmspace --role harmony --unit --format yaml
//!   rhythmspace --write-tables ~/.rhythmspace/tables.yaml

use std::path::PathBuf;
use std::process;

use clap::{Parser, ValueEnum};
use log::info;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing_subscriber::{fmt, EnvFilter};

use rhythmspace::config::TablesConfig;
use rhythmspace::error::ConfigError;
use rhythmspace::generator::{RhythmBar, RhythmGenerator, Role};
use rhythmspace::metre::Metre;

#[derive(Parser)]
#[command(name = "rhythmspace", version)]
#[command(about = "Generate bar-filling rhythms from a metrical tree")]
struct Cli {
    /// Time signature, e.g. 4/4, 3/4, 6/8
    #[arg(short, long, default_value = "4/4")]
    time_signature: String,

    /// Tactus note value (defaults to the beat unit)
    #[arg(long)]
    tactus: Option<String>,

    /// Harmonic tactus note value (defaults to the first level below the bar)
    #[arg(long)]
    harmonic_tactus: Option<String>,

    /// melody or harmony
    #[arg(short, long, default_value = "melody")]
    role: Role,

    /// Number of bars
    #[arg(short, long, default_value = "4")]
    bars: usize,

    /// RNG seed (random when omitted)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Density impact in [0, 1]
    #[arg(long, default_value = "0")]
    density: f64,

    /// Entropy impact in [0, 1]
    #[arg(long, default_value = "0")]
    entropy: f64,

    /// Generate a musical unit (repeat bars, pickup, prolongation)
    #[arg(long)]
    unit: bool,

    /// Tables file (defaults to ~/.rhythmspace/tables.yaml when present)
    #[arg(long)]
    tables: Option<PathBuf>,

    #[arg(short, long, value_enum, default_value = "text")]
    format: Format,

    /// Write the built-in tables to FILE and exit
    #[arg(long, value_name = "FILE")]
    write_tables: Option<PathBuf>,

    /// Log generation details to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Yaml,
    Json,
}

/// Default filter directive; `RUST_LOG` overrides it.
fn log_directive(verbose: bool) -> &'static str {
    if verbose {
        "rhythmspace=debug"
    } else {
        "rhythmspace=info"
    }
}

/// Route `log` records from the library through a `tracing` subscriber on stderr.
fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_directive(verbose)));

    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .try_init();
}

fn build_metre(cli: &Cli) -> Result<Metre, ConfigError> {
    let defaults = Metre::with_default_tactus(&cli.time_signature)?;
    match (&cli.tactus, &cli.harmonic_tactus) {
        (None, None) => Ok(defaults),
        (tactus, harmonic) => Metre::from_parts(
            defaults.time_signature(),
            match tactus {
                Some(label) => label.parse()?,
                None => defaults.tactus().label,
            },
            match harmonic {
                Some(label) => label.parse()?,
                None => defaults.harmonic_tactus().label,
            },
        ),
    }
}

fn load_tables(cli: &Cli) -> Result<TablesConfig, ConfigError> {
    match &cli.tables {
        Some(path) => TablesConfig::load_from(path),
        None => Ok(TablesConfig::load().unwrap_or_default()),
    }
}

fn print<T: Serialize + std::fmt::Display>(value: &T, format: Format) -> Result<(), String> {
    let out = match format {
        Format::Text => value.to_string(),
        Format::Yaml => serde_yaml::to_string(value).map_err(|e| e.to_string())?,
        Format::Json => serde_json::to_string_pretty(value).map_err(|e| e.to_string())?,
    };
    println!("{}", out.trim_end());
    Ok(())
}

/// Bars printed one per line in text mode.
#[derive(Serialize)]
#[serde(transparent)]
struct Bars(Vec<RhythmBar>);

impl std::fmt::Display for Bars {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, bar) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{bar}")?;
        }
        Ok(())
    }
}

fn run(cli: Cli) -> Result<(), String> {
    if let Some(path) = &cli.write_tables {
        TablesConfig::builtin()
            .save_to(path)
            .map_err(|e| e.to_string())?;
        info!("wrote built-in tables to {}", path.display());
        return Ok(());
    }

    let metre = build_metre(&cli).map_err(|e| e.to_string())?;
    let config = load_tables(&cli).map_err(|e| e.to_string())?;
    let tables = config.tables_for(cli.role, &metre);

    let mut generator = RhythmGenerator::new(metre, cli.role, tables).map_err(|e| e.to_string())?;
    generator.set_density_impact(cli.density);
    generator.set_entropy_impact(cli.entropy);

    let seed = cli.seed.unwrap_or_else(rand::random);
    info!(
        "{} in {}, seed {seed}",
        cli.role,
        generator.metre().time_signature()
    );
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    if cli.unit {
        let unit = generator
            .generate_unit(cli.bars, &mut rng)
            .map_err(|e| e.to_string())?;
        print(&unit, cli.format)
    } else {
        let bars = generator
            .generate_bars(cli.bars, &mut rng)
            .map_err(|e| e.to_string())?;
        print(&Bars(bars), cli.format)
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
