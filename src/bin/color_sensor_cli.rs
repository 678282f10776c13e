use std::io::{self, BufRead};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use color_sensor::acquisition::ChannelTriple;
use color_sensor::calibration::{CalibrationPrompt, CalibrationStep};
use color_sensor::clock::SystemClock;
use color_sensor::engine::{ColorSensor, Detection};
use color_sensor::error::{CalibrationError, ColorSensorError, ErrorCode};
use color_sensor::pins::{SimulatedBoard, Swatch, SwatchHandle};
use color_sensor::SensorConfig;
use serde::Serialize;

/// Relative frequency jitter of the simulated sensor output
const DEMO_JITTER: f64 = 0.01;
const DEMO_SEED: u64 = 0x7C53_3200;

/// How often a waiting prompt checks for Ctrl-C
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Parser, Debug)]
#[command(
    name = "color_sensor_cli",
    about = "TCS3200 colour detection against a simulated sensor board"
)]
struct Cli {
    /// JSON configuration file (defaults apply when omitted or unreadable)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Calibrate on reference swatches, then classify the sample swatches
    Demo {
        /// Swatches to classify: white|red|green|blue|black or r/g/b reflectances
        #[arg(long, value_delimiter = ',', default_value = "red,green,blue")]
        samples: Vec<Swatch>,
        /// Detection cycles to run (defaults to one per sample)
        #[arg(long)]
        cycles: Option<u64>,
        /// Emit one JSON object per event instead of text
        #[arg(long)]
        json: bool,
        /// Confirm each calibration step on stdin
        #[arg(long)]
        interactive: bool,
    },
    /// Print the effective configuration
    DumpConfig,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt().with_writer(io::stderr).init();

    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = cli
        .config
        .map(SensorConfig::load_from_file)
        .unwrap_or_default();

    match cli.command {
        Commands::Demo {
            samples,
            cycles,
            json,
            interactive,
        } => run_demo(config, samples, cycles, json, interactive),
        Commands::DumpConfig => run_dump(&config),
    }
}

fn run_demo(
    config: SensorConfig,
    samples: Vec<Swatch>,
    cycles: Option<u64>,
    json: bool,
    interactive: bool,
) -> Result<ExitCode> {
    anyhow::ensure!(!samples.is_empty(), "at least one sample swatch is required");
    let max_cycles = cycles.unwrap_or(samples.len() as u64);

    let stop = Arc::new(AtomicBool::new(false));
    install_stop_handler(stop.clone())?;

    let clock = SystemClock::new();
    let swatch = SwatchHandle::new(Swatch::BLACK);
    let board = SimulatedBoard::new(clock, config.pins, swatch.clone())
        .with_jitter(DEMO_JITTER, DEMO_SEED);
    let mut sensor =
        ColorSensor::open(board, clock, config).context("opening simulated sensor")?;

    let mut prompt = DemoPrompt {
        swatch: swatch.clone(),
        confirmations: if interactive {
            Some(spawn_stdin_lines()?)
        } else {
            None
        },
        stop: stop.clone(),
        json,
    };
    let outcome = sensor
        .calibrate(&mut prompt)
        .context("calibrating sensor")
        .and_then(|_| {
            swatch.place(samples[0]);
            let mut next = 1usize;
            sensor
                .run(&stop, Some(max_cycles), |outcome| {
                    report_cycle(outcome, json);
                    swatch.place(samples[next % samples.len()]);
                    next += 1;
                })
                .context("running detection loop")
        });

    sensor.shutdown();
    let completed = outcome?;
    if !json {
        println!("Completed {} detection cycles", completed);
    }
    Ok(ExitCode::from(0))
}

fn run_dump(config: &SensorConfig) -> Result<ExitCode> {
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(ExitCode::from(0))
}

/// Set `stop` on Ctrl-C
///
/// The handler is registered before this returns, so an interrupt never
/// falls through to the default handler once the session is open.
fn install_stop_handler(stop: Arc<AtomicBool>) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building signal runtime")?;
    let (ready_tx, ready_rx) = mpsc::channel();

    std::thread::Builder::new()
        .name("ctrl-c".into())
        .spawn(move || {
            runtime.block_on(async {
                let signal = tokio::signal::ctrl_c();
                tokio::pin!(signal);

                // first poll registers the handler
                let early = tokio::select! {
                    biased;
                    result = &mut signal => Some(result),
                    _ = std::future::ready(()) => None,
                };
                let _ = ready_tx.send(());

                let result = match early {
                    Some(result) => result,
                    None => signal.await,
                };
                match result {
                    Ok(()) => {
                        tracing::info!("[CLI] Ctrl-C received, stopping after current step");
                        stop.store(true, Ordering::SeqCst);
                    }
                    Err(err) => tracing::warn!("[CLI] Ctrl-C handler unavailable: {}", err),
                }
            })
        })
        .context("spawning signal thread")?;

    ready_rx
        .recv()
        .context("waiting for Ctrl-C handler registration")?;
    Ok(())
}

/// Lines typed on stdin, read on a helper thread so a prompt can give up
/// waiting when Ctrl-C arrives. The channel closes at end of input.
fn spawn_stdin_lines() -> Result<mpsc::Receiver<String>> {
    let (tx, rx) = mpsc::channel();
    std::thread::Builder::new()
        .name("stdin".into())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        tracing::warn!("[CLI] Failed to read stdin: {}", err);
                        break;
                    }
                }
            }
        })
        .context("spawning stdin reader")?;
    Ok(rx)
}

/// Places the reference swatches on the simulated board
struct DemoPrompt {
    swatch: SwatchHandle,
    /// Operator confirmations, `None` when steps are confirmed automatically
    confirmations: Option<mpsc::Receiver<String>>,
    stop: Arc<AtomicBool>,
    json: bool,
}

impl DemoPrompt {
    /// Block until the operator presses Enter, types `q`, closes stdin or
    /// presses Ctrl-C
    fn wait_for_confirmation(&self, step: CalibrationStep) -> Result<(), CalibrationError> {
        let Some(confirmations) = &self.confirmations else {
            return Ok(());
        };

        eprintln!(
            "Place {} reference under the sensor and press Enter (q to abort)",
            step.display_name()
        );
        loop {
            if self.stop.load(Ordering::SeqCst) {
                return Err(CalibrationError::Aborted { step });
            }
            match confirmations.recv_timeout(STOP_POLL_INTERVAL) {
                Ok(line) if line.trim().eq_ignore_ascii_case("q") => {
                    return Err(CalibrationError::Aborted { step })
                }
                Ok(_) => return Ok(()),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(CalibrationError::Aborted { step })
                }
            }
        }
    }
}

impl CalibrationPrompt for DemoPrompt {
    fn request_material(&mut self, step: CalibrationStep) -> Result<(), CalibrationError> {
        if self.stop.load(Ordering::SeqCst) {
            return Err(CalibrationError::Aborted { step });
        }
        self.wait_for_confirmation(step)?;

        self.swatch.place(match step {
            CalibrationStep::White => Swatch::WHITE,
            CalibrationStep::Color(label) => Swatch::primary(label),
        });
        Ok(())
    }

    fn report_capture(&mut self, step: CalibrationStep, values: &ChannelTriple) {
        if self.json {
            emit_json(&Report::Calibration { step, values });
        } else {
            println!(
                "{} captured: R={:.3} G={:.3} B={:.3}",
                step.display_name(),
                values.red,
                values.green,
                values.blue
            );
        }
    }
}

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum Report<'a> {
    Calibration {
        step: CalibrationStep,
        values: &'a ChannelTriple,
    },
    Detection(&'a Detection),
    Error {
        code: i32,
        message: String,
    },
}

fn report_cycle(outcome: &Result<Detection, ColorSensorError>, json: bool) {
    match (outcome, json) {
        (Ok(detection), true) => emit_json(&Report::Detection(detection)),
        (Ok(detection), false) => {
            let ratios = detection.ratios;
            println!(
                "Normalized ratios: R={:.3} G={:.3} B={:.3}",
                ratios.red, ratios.green, ratios.blue
            );
            println!("Detected color: {}", detection.classification.color);
        }
        (Err(err), true) => emit_json(&Report::Error {
            code: err.code(),
            message: err.message(),
        }),
        (Err(err), false) => println!("Error: {}", err),
    }
}

fn emit_json(report: &Report<'_>) {
    match serde_json::to_string(report) {
        Ok(line) => println!("{line}"),
        Err(err) => tracing::error!("[CLI] Failed to serialize report: {}", err),
    }
}
