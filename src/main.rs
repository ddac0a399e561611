//! Signal Runner headless driver
//!
//! Builds one simulation, feeds it from the autopilot through the command
//! queue, steps it with the fixed-step driver and prints a JSON summary.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;

use signal_runner::autopilot::{NetAutopilot, RunnerAutopilot};
use signal_runner::net::{self, Level, NetState};
use signal_runner::runner::{self, RunnerState, RunnerStatus};
use signal_runner::tuning::{NetBalance, RunnerBalance};
use signal_runner::{FixedStepDriver, Settings, Simulation, Variant};

#[derive(Parser, Debug)]
#[command(name = "signal-runner", version, about = "Run a Signal Runner simulation headlessly")]
struct Cli {
    /// Settings JSON; flags below override its values.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Which simulation to run (`net` or `runner`).
    #[arg(long)]
    variant: Option<Variant>,
    /// Track seed for the runner variant.
    #[arg(long)]
    seed: Option<u32>,
    /// Simulated seconds before stopping.
    #[arg(long, value_name = "SECONDS")]
    seconds: Option<f32>,
    /// Level JSON for the net variant.
    #[arg(long, value_name = "FILE")]
    level: Option<PathBuf>,
    /// Balance JSON for the chosen variant.
    #[arg(long, value_name = "FILE")]
    balance: Option<PathBuf>,
    /// Step without any scripted input.
    #[arg(long)]
    no_autopilot: bool,
}

impl Cli {
    fn into_settings(self) -> Result<Settings> {
        let mut settings = match &self.config {
            Some(path) => Settings::load(path)?,
            None => Settings::default(),
        };

        if let Some(variant) = self.variant {
            settings.variant = variant;
        }
        if let Some(seed) = self.seed {
            settings.seed = Some(seed);
        }
        if let Some(seconds) = self.seconds {
            settings.seconds = seconds;
        }
        if self.level.is_some() {
            settings.level_path = self.level;
        }
        if self.balance.is_some() {
            settings.balance_path = self.balance;
        }
        if self.no_autopilot {
            settings.autopilot = false;
        }

        settings.validate()?;
        Ok(settings)
    }
}

fn read_file(path: &Path, what: &str) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {what} from {}", path.display()))
}

/// Step `state` frame by frame until the time runs out or `after_frame` says stop
fn drive<S: Simulation>(
    settings: &Settings,
    state: &mut S,
    mut before_frame: impl FnMut(&S),
    mut after_frame: impl FnMut(&S) -> bool,
) -> u64 {
    let mut driver = FixedStepDriver::new(settings.fixed_dt).with_max_substeps(settings.max_substeps);
    let mut steps = 0u64;

    for _ in 0..settings.frame_count() {
        before_frame(state);
        steps += u64::from(driver.advance(state, settings.frame_seconds));
        if after_frame(state) {
            break;
        }
    }
    steps
}

#[derive(Serialize)]
struct Summary<H: Serialize> {
    variant: Variant,
    steps: u64,
    hud: H,
}

fn run_net(settings: &Settings) -> Result<String> {
    let level = match &settings.level_path {
        Some(path) => Level::from_json_str(&read_file(path, "level")?)
            .with_context(|| format!("invalid level {}", path.display()))?,
        None => Level::new(net::network01()).context("built-in network is invalid")?,
    };
    let balance = match &settings.balance_path {
        Some(path) => NetBalance::from_json_str(&read_file(path, "balance")?)
            .with_context(|| format!("invalid balance {}", path.display()))?,
        None => NetBalance::default(),
    };

    let mut state = NetState::new(level, balance);
    let mut pilot = NetAutopilot::new();
    let mut last_seen = 0;

    let steps = drive(
        settings,
        &mut state,
        |state| {
            if settings.autopilot {
                pilot.drive(state);
            }
        },
        |state| {
            for event in net::selectors::events_since(state, last_seen) {
                log::info!("[{:>6.2}s] {:?}", event.at, event.kind);
                last_seen = event.id;
            }
            state.run.status.is_terminal()
        },
    );

    let summary = Summary {
        variant: Variant::Net,
        steps,
        hud: net::selectors::hud(&state),
    };
    Ok(serde_json::to_string_pretty(&summary)?)
}

fn run_runner(settings: &Settings) -> Result<String> {
    let balance = match &settings.balance_path {
        Some(path) => RunnerBalance::from_json_str(&read_file(path, "balance")?)
            .with_context(|| format!("invalid balance {}", path.display()))?,
        None => RunnerBalance::default(),
    };
    let seed = settings.seed.unwrap_or_else(rand::random);

    let mut state = RunnerState::new(seed, balance);
    let mut pilot = RunnerAutopilot::new();
    let mut last_seen = 0;

    let steps = drive(
        settings,
        &mut state,
        |state| {
            if settings.autopilot {
                pilot.drive(state);
            }
        },
        |state| {
            for event in runner::selectors::events_since(state, last_seen) {
                log::info!("[{:>6.2}s] {:?}", event.at, event.kind);
                last_seen = event.id;
            }
            state.run.status == RunnerStatus::Failed
        },
    );

    #[derive(Serialize)]
    struct RunnerSummary {
        seed: u32,
        #[serde(flatten)]
        summary: Summary<runner::selectors::RunnerHud>,
    }

    let summary = RunnerSummary {
        seed,
        summary: Summary {
            variant: Variant::Runner,
            steps,
            hud: runner::selectors::hud(&state),
        },
    };
    Ok(serde_json::to_string_pretty(&summary)?)
}

fn main() -> Result<()> {
    let settings = Cli::parse().into_settings()?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(settings.log_level.as_str()))
        .init();
    log::info!(
        "Signal Runner ({}) for {:.0}s at {:.1} Hz",
        settings.variant,
        settings.seconds,
        1.0 / settings.fixed_dt
    );

    let summary = match settings.variant {
        Variant::Net => run_net(&settings)?,
        Variant::Runner => run_runner(&settings)?,
    };
    println!("{summary}");
    Ok(())
}
