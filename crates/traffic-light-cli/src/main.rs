//! Traffic Light Control Tool
//!
//! Talks to the traffic light controller directly over its serial port.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;
use traffic_light_hw::{
    Command, CommandEmitter, Controller, DeviceState, Light, LightTimings, LineReader, Mode,
    SerialLink, BAUD_RATE,
};

/// Monitor poll interval (30 frames per second).
const FRAME_INTERVAL: Duration = Duration::from_millis(33);

#[derive(Parser)]
#[command(name = "trafficctl")]
#[command(about = "Control tool for the traffic light model")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Serial port of the controller
    #[arg(short, long, default_value = "/dev/ttyACM0")]
    port: String,

    /// Baud rate
    #[arg(short, long, default_value_t = BAUD_RATE)]
    baud: u32,

    /// Wait after opening the port before sending (the board resets on open)
    #[arg(long, default_value = "2000")]
    settle_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the device state whenever it changes, plus any echoed commands
    Monitor {
        /// Print JSON lines instead of text
        #[arg(long)]
        json: bool,
    },
    /// Switch the operating mode
    Mode {
        /// Mode: normal, emergency, blink, off, touch-select
        mode: String,
    },
    /// Set the phase durations
    Timings {
        /// Red phase in milliseconds (500-5000)
        red: u32,
        /// Yellow phase in milliseconds (500-5000)
        yellow: u32,
        /// Green phase in milliseconds (500-5000)
        green: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let link = SerialLink::open(&cli.port, cli.baud)
        .with_context(|| format!("Failed to open {}", cli.port))?;
    let controller = Controller::new(link, LineReader::new(), CommandEmitter::default());

    match cli.command {
        Commands::Monitor { json } => handle_monitor(controller, json).await,
        Commands::Mode { mode } => handle_mode(controller, &mode, cli.settle_ms).await,
        Commands::Timings { red, yellow, green } => {
            handle_timings(controller, LightTimings::new(red, yellow, green), cli.settle_ms).await
        }
    }
}

async fn handle_monitor(mut controller: Controller<SerialLink>, json: bool) -> Result<()> {
    let mut ticker = tokio::time::interval(FRAME_INTERVAL);
    let mut last: Option<DeviceState> = None;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => break,
        }

        for line in controller.poll_lines() {
            if let Some(echo) = echoed_timings(&line) {
                print_echo(&echo, json)?;
            }
        }
        if !controller.is_connected() {
            warn!("Serial link closed while monitoring");
            anyhow::bail!("Serial link closed");
        }

        let state = controller.state();
        if last.as_ref() != Some(state) {
            print_state(state, json)?;
            last = Some(state.clone());
        }
    }

    Ok(())
}

/// Returns the timings if `line` is a `TRAFFIC_LIGHT` command echoed back by
/// the device.
fn echoed_timings(line: &str) -> Option<LightTimings> {
    match Command::parse(line) {
        Some(Command::TrafficLight(timings)) => Some(timings),
        _ => None,
    }
}

fn print_echo(timings: &LightTimings, json: bool) -> Result<()> {
    debug!("Device echoed timings {:?}", timings);
    if json {
        println!("{}", serde_json::json!({ "echo": timings }));
    } else {
        println!(
            "echo: red {}ms, yellow {}ms, green {}ms",
            timings.red, timings.yellow, timings.green
        );
    }
    Ok(())
}

fn print_state(state: &DeviceState, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(state)?);
        return Ok(());
    }

    let lamp = |light: Light, label: &str| {
        if state.is_lit(light) {
            label.to_string()
        } else {
            "-".to_string()
        }
    };
    println!(
        "mode: {:<14} brightness: {:>4}  lights: {} {} {}",
        state.mode.trim(),
        state.brightness,
        lamp(Light::Red, "R"),
        lamp(Light::Yellow, "Y"),
        lamp(Light::Green, "G"),
    );
    Ok(())
}

async fn handle_mode(
    mut controller: Controller<SerialLink>,
    mode: &str,
    settle_ms: u64,
) -> Result<()> {
    let mode: Mode = mode
        .parse()
        .context("Use: normal, emergency, blink, off, touch-select")?;

    tokio::time::sleep(Duration::from_millis(settle_ms)).await;
    if !controller.request_mode(mode, Instant::now()) {
        warn!("Mode command not queued on {}", controller.link().port_path());
        anyhow::bail!("Failed to send mode {}", mode);
    }
    controller.into_link().shutdown().await;
    println!("Mode set to: {}", mode);
    Ok(())
}

async fn handle_timings(
    mut controller: Controller<SerialLink>,
    timings: LightTimings,
    settle_ms: u64,
) -> Result<()> {
    tokio::time::sleep(Duration::from_millis(settle_ms)).await;
    let applied = controller.set_timings(timings);
    if !controller.is_connected() {
        warn!("Serial link {} closed before sending", controller.link().port_path());
        anyhow::bail!("Serial link closed");
    }
    controller.into_link().shutdown().await;
    println!(
        "Timings set to: red {}ms, yellow {}ms, green {}ms",
        applied.red, applied.yellow, applied.green
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timings_command() {
        let cli = Cli::try_parse_from([
            "trafficctl",
            "-p",
            "/dev/ttyUSB3",
            "timings",
            "2000",
            "500",
            "2000",
        ])
        .unwrap();
        assert_eq!(cli.port, "/dev/ttyUSB3");
        assert_eq!(cli.baud, 9600);
        assert!(matches!(
            cli.command,
            Commands::Timings {
                red: 2000,
                yellow: 500,
                green: 2000
            }
        ));
    }

    #[test]
    fn test_parse_monitor_json() {
        let cli = Cli::try_parse_from(["trafficctl", "monitor", "--json"]).unwrap();
        assert!(matches!(cli.command, Commands::Monitor { json: true }));
        assert_eq!(cli.settle_ms, 2000);
    }

    #[test]
    fn test_echoed_timings() {
        let echo = echoed_timings("TRAFFIC_LIGHT:2000:500:2000").unwrap();
        assert_eq!((echo.red, echo.yellow, echo.green), (2000, 500, 2000));
        assert!(echoed_timings("MODE:blink").is_none());
        assert!(echoed_timings("LED_STATE:R1:Y0:G0").is_none());
        assert!(echoed_timings("TRAFFIC_LIGHT:2000:500").is_none());
    }

    #[test]
    fn test_rejects_non_numeric_timings() {
        assert!(Cli::try_parse_from(["trafficctl", "timings", "fast", "500", "2000"]).is_err());
    }
}
