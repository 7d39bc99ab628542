use anyhow::{bail, Context};
use clap::Parser;
use focustuin_core::{DistractionPreset, FocusTuinConfig, SessionEvent};
use focustuin_distraction::InteractionKind;
use focustuin_gaze::{CalibrationCache, CalibrationRecord};
use focustuin_session::{Session, SessionPhase};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{info, warn};

mod script;

use script::{load_script, Step, TimedStep, Wanderer};

#[derive(Parser, Debug)]
#[command(author, version, about = "Focus Tuin: run the attention installation headless", long_about = None)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, env = "FOCUSTUIN_CONFIG", default_value = "focustuin.toml")]
    config: PathBuf,

    /// Distraction preset: subtle, standard, intense or experimental
    #[arg(short, long)]
    preset: Option<String>,

    /// JSON-lines gaze script (`-` for stdin). Without it a simulated visitor is used.
    #[arg(short, long)]
    script: Option<PathBuf>,

    /// Stop after this many seconds
    #[arg(short, long, default_value_t = 60)]
    duration: u64,

    /// Fixed RNG seed for popups and the simulated visitor
    #[arg(long)]
    seed: Option<u64>,

    /// Number of lives
    #[arg(long)]
    lives: Option<u32>,

    /// Also print every position update
    #[arg(long)]
    positions: bool,

    /// Start over instead of exiting when the visitor dies
    #[arg(long)]
    restart_on_death: bool,

    /// Store a calibration offset in px (X Y) in the calibration cache before starting
    #[arg(long, num_args = 2, value_names = ["X", "Y"], allow_negative_numbers = true)]
    calibrate: Option<Vec<f64>>,

    /// Residual error of that calibration, in px
    #[arg(long, default_value_t = 0.0, requires = "calibrate")]
    calibration_accuracy: f64,

    /// Emit logs as JSON
    #[arg(long)]
    json: bool,
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn build_config(args: &Args) -> anyhow::Result<FocusTuinConfig> {
    let mut config = FocusTuinConfig::load_or_default(&args.config);
    if let Some(name) = &args.preset {
        let Some(preset) = DistractionPreset::from_name(name) else {
            bail!("Unknown preset '{}'", name);
        };
        config.distraction.preset = Some(preset);
    }
    if let Some(seed) = args.seed {
        config.session.seed = Some(seed);
    }
    if let Some(lives) = args.lives {
        config.session.initial_lives = lives;
    }
    Ok(config)
}

/// Write the offset measured by a calibration run so later sessions on the
/// same screen start from it.
fn store_calibration(
    config: &FocusTuinConfig,
    offset: &[f64],
    accuracy_px: f64,
) -> anyhow::Result<()> {
    let Some(path) = &config.calibration.cache_path else {
        bail!("--calibrate needs calibration.cache_path or FOCUSTUIN_CALIBRATION_CACHE");
    };
    let [x, y] = offset else {
        bail!("--calibrate takes exactly two values");
    };
    let record = CalibrationRecord::new(config.session.viewport, *x, *y, accuracy_px);
    CalibrationCache::new(path, config.calibration.dimension_tolerance_px)
        .store(&record)
        .context("Failed to store calibration")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.json);

    let mut config = build_config(&args)?;
    if let Some(offset) = &args.calibrate {
        store_calibration(&config, offset, args.calibration_accuracy)?;
    }
    // One seed for the session and the simulated visitor so runs replay exactly.
    let seed = *config.session.seed.get_or_insert_with(rand::random);

    let steps: Box<dyn Iterator<Item = TimedStep> + Send> = match &args.script {
        Some(path) => Box::new(load_script(path).context("Failed to load gaze script")?.into_iter()),
        None => {
            info!("No script given, simulating a visitor (seed {})", seed);
            Box::new(Wanderer::new(seed, config.session.viewport))
        }
    };

    info!(
        "Focus Tuin starting: {} lives, preset {:?}",
        config.session.initial_lives, config.distraction.preset
    );
    let session = Session::new(config);
    let printer = tokio::spawn(print_events(session.subscribe(), args.positions));
    session.start().await;

    tokio::select! {
        _ = drive(&session, steps, args.restart_on_death) => {}
        _ = tokio::time::sleep(Duration::from_secs(args.duration)) => {
            info!("Ran for {}s, stopping", args.duration);
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted");
        }
    }

    let lives = session.remaining_lives().await;
    session.stop().await;
    match tokio::time::timeout(Duration::from_secs(1), printer).await {
        Ok(Ok(printed)) => info!("Session over: {} events, {} lives left", printed, lives),
        Ok(Err(e)) => warn!("Event printer failed: {}", e),
        Err(_) => warn!("Event printer did not finish"),
    }
    Ok(())
}

/// Play the gaze source into the session until it runs dry or the visitor dies.
async fn drive(
    session: &Session,
    steps: Box<dyn Iterator<Item = TimedStep> + Send>,
    restart_on_death: bool,
) {
    for TimedStep { delay, step } in steps {
        tokio::time::sleep(delay).await;
        match step {
            Step::Gaze { x, y, confidence } => {
                session.ingest(session.sample(x, y, confidence)).await;
            }
            Step::Control(label) => {
                let outcome = session
                    .record_interaction(InteractionKind::PseudoControl { label })
                    .await;
                if let Some(reply) = outcome.reply {
                    info!("{}: {}", reply.title, reply.body);
                }
            }
            Step::Resize(viewport) => session.resize(viewport).await,
        }

        if session.phase().await == SessionPhase::Dead {
            if !restart_on_death {
                info!("Visitor is out of lives");
                return;
            }
            tokio::time::sleep(Duration::from_secs(3)).await;
            session.restart().await;
        }
    }
    info!("Gaze source exhausted");
}

/// Print events as JSON lines on stdout until the session stops.
async fn print_events(mut rx: broadcast::Receiver<SessionEvent>, positions: bool) -> u64 {
    let mut printed = 0;
    loop {
        let event = match rx.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!("Event printer lagged, {} events skipped", n);
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };
        let stopped = event == SessionEvent::SessionStopped;
        if positions || !matches!(event, SessionEvent::PositionUpdated { .. }) {
            match serde_json::to_string(&event) {
                Ok(line) => {
                    let mut stdout = std::io::stdout().lock();
                    if writeln!(stdout, "{}", line).is_err() {
                        break;
                    }
                    printed += 1;
                }
                Err(e) => warn!("Failed to encode {} event: {}", event.name(), e),
            }
        }
        if stopped {
            break;
        }
    }
    printed
}
