use std::f64::consts::TAU;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use log::{debug, LevelFilter};
use simplelog::{Config as LogConfig, SimpleLogger};

use crate::bridge::HueBridge;
use crate::config::Config;
use crate::fade::Fade;
use crate::registry::{parse_channel_number, Registry};
use crate::show::Show;

mod bridge;
mod color;
mod config;
mod fade;
mod fixture;
mod registry;
mod show;

#[derive(Parser)]
#[command(about)]
struct Cli {
    /// If true, provide verbose logging.
    #[arg(long)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Drive lights on the configured bridge with a test pattern.
    Run(RunArgs),

    /// Check that the provided config file is valid, then quit.
    Check(CheckArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Path to a YAML file containing the bridge configuration.
    config_file: PathBuf,

    /// A light to drive on all three channels, by bridge light number.
    /// May be repeated.
    #[arg(long = "light")]
    lights: Vec<String>,

    /// A single channel to drive, as "{light}-{channel}". May be repeated.
    #[arg(long = "channel")]
    channels: Vec<String>,
}

#[derive(Args)]
struct CheckArgs {
    /// Path to a YAML file containing the bridge configuration.
    config_file: PathBuf,
}

fn main() -> Result<()> {
    let args = Cli::try_parse()?;

    let log_level = if args.debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };

    SimpleLogger::init(log_level, LogConfig::default())?;

    match args.command {
        Command::Run(args) => run(args),
        Command::Check(args) => check(args),
    }
}

fn run(args: RunArgs) -> Result<()> {
    let config = Config::from_file(&args.config_file)?;
    let bridge = HueBridge::new(&config.address, &config.api_key)?;

    let mut registry = Registry::new();
    for number in &args.lights {
        for channel in 0..3 {
            let handle = registry.resolve_channel(number, channel)?;
            debug!("driving channel {}", handle.id());
            handle.set_fade(test_pattern(channel));
        }
    }
    for channel_number in &args.channels {
        let (number, channel) = parse_channel_number(channel_number)?;
        let handle = registry.resolve_channel(number, channel)?;
        debug!("driving channel {}", handle.id());
        handle.set_fade(test_pattern(channel));
    }

    if registry.is_empty() {
        println!("No lights specified; pass --light or --channel to drive a test pattern.");
    } else {
        println!("Driving {} fixture(s).", registry.len());
    }
    println!("Running light update loop at {} Hz.", config.update_hz);

    let mut show = Show::new(registry, bridge, config.update_hz);
    show.run();
    Ok(())
}

fn check(args: CheckArgs) -> Result<()> {
    Config::from_file(&args.config_file)?;
    println!("Config is OK.");
    Ok(())
}

/// A continuously-cycling color fade for exercising a light.
///
/// The reported fade duration never falls inside the look-ahead window, so
/// the channel is re-sampled on every tick.
fn test_pattern(channel: usize) -> Fade {
    let start = Instant::now();
    Fade::with_producer(move |lookahead_ms| {
        let t = start.elapsed().as_secs_f64();
        let phase = channel as f64 / 3.;
        let brightness = 0.5 * (1. + (TAU * (t / 10. + phase)).sin());
        Ok((brightness, lookahead_ms))
    })
}
