//! `flyby` - CLI for landing aircraft detection
//!
//! This binary runs the detection engine against the live feed or a replay,
//! and provides tools to inspect classifications, schedule matches and the
//! debug trace log.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use serde::de::DeserializeOwned;
use tracing::warn;

use flyby::cli::{
    ClassifyCommand, Cli, Command, ConfigCommand, MatchCommand, OutputFormat, TraceCommand,
    WatchCommand,
};
use flyby::config::TelemetryMode;
use flyby::schedule::{self, ScheduleFrame};
use flyby::source::CurrentAirport;
use flyby::trace::SqliteTraceSink;
use flyby::{
    airline, init_logging, AlertPresenter, Config, LandingClassifier, LandingDetectionEngine,
    LandingStatus, TelemetryFrame, TerminalRenderer, TraceSink,
};

type CliResult = Result<(), Box<dyn std::error::Error>>;

fn main() -> CliResult {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = Config::load_from(cli.config.clone())?;

    // Execute the command
    match cli.command {
        Command::Watch(cmd) => handle_watch(config, &cmd),
        Command::Classify(cmd) => handle_classify(&config, &cmd),
        Command::Match(cmd) => handle_match(&cmd),
        Command::Trace(cmd) => handle_trace(&config, cmd),
        Command::Config(cmd) => handle_config(&config, cmd),
    }
}

fn handle_watch(mut config: Config, cmd: &WatchCommand) -> CliResult {
    if let Some(path) = &cmd.replay {
        config.telemetry.mode = TelemetryMode::File;
        config.telemetry.file_path = Some(path.clone());
    }
    if cmd.no_sound {
        config.alert.sound = false;
    }
    config.validate()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(watch(config, cmd.once))
}

async fn watch(config: Config, once: bool) -> CliResult {
    let airport = CurrentAirport::new(config.telemetry.current_airport.clone());
    let engine = LandingDetectionEngine::from_config(&config, airport)?;

    let renderer = TerminalRenderer::stdout(config.alert.sound);
    let presenter = Arc::new(
        AlertPresenter::from_config(&config, Box::new(renderer)).with_trace(engine.trace_sink()),
    );
    let _subscription = engine.bus().subscribe_arc(presenter.clone());

    if once {
        if engine.poll_once().await?.is_none() {
            println!("No landing aircraft.");
        }
        return Ok(());
    }

    engine.start()?;
    println!(
        "Watching {} (every {}s). Press Ctrl-C to stop.",
        config.telemetry.monitored_airport,
        engine.settings().poll_interval.as_secs()
    );

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    let mut hide_check = tokio::time::interval(Duration::from_secs(1));

    loop {
        tokio::select! {
            result = &mut shutdown => {
                result?;
                break;
            }
            _ = hide_check.tick() => {
                if let Err(e) = presenter.tick(Instant::now()) {
                    warn!(error = %e, "Failed to hide alert");
                }
            }
        }
    }

    engine.stop()?;
    let state = engine.state();
    println!(
        "Stopped after {} polls, {} alerts, {} fetch errors.",
        state.stats.ticks, state.stats.alerts, state.stats.fetch_errors
    );
    Ok(())
}

fn handle_classify(config: &Config, cmd: &ClassifyCommand) -> CliResult {
    let frame: TelemetryFrame = read_json(&cmd.file)?;
    let classifier = LandingClassifier::new(config.detection.clone());

    let rows: Vec<_> = frame
        .aircraft
        .iter()
        .filter_map(|aircraft| {
            let classification = classifier.classify(aircraft)?;
            if classification.status.is_none() && !cmd.all {
                return None;
            }
            Some((aircraft, classification))
        })
        .collect();

    match cmd.format {
        OutputFormat::Json => {
            let json: Vec<_> = rows
                .iter()
                .map(|(aircraft, c)| {
                    serde_json::json!({
                        "hex": aircraft.hex,
                        "flight": aircraft.flight_ident(),
                        "altitude": c.altitude_ft,
                        "speed": aircraft.ground_speed_kts,
                        "vertical_rate": aircraft.vertical_rate_fpm,
                        "meets_all_criteria": c.meets_all_criteria(),
                        "status": c.status,
                        "reason": c.reason,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Table => {
            println!(
                "{:<8} {:<9} {:>7} {:>5} {:>6}  {:<16} REASON",
                "HEX", "FLIGHT", "ALT", "GS", "VS", "STATUS"
            );
            for (aircraft, c) in &rows {
                println!(
                    "{:<8} {:<9} {:>7.0} {:>5} {:>6}  {:<16} {}",
                    aircraft.hex,
                    aircraft.label(),
                    c.altitude_ft,
                    optional(aircraft.ground_speed_kts),
                    optional(aircraft.vertical_rate_fpm),
                    c.status.map_or_else(|| "-".to_string(), |s| s.to_string()),
                    c.reason
                );
            }
            let landing = rows.iter().filter(|(_, c)| c.meets_all_criteria()).count();
            println!();
            println!(
                "{} aircraft in feed, {} classified, {landing} landing",
                frame.len(),
                rows.len()
            );
        }
    }
    Ok(())
}

fn handle_match(cmd: &MatchCommand) -> CliResult {
    let frame: ScheduleFrame = read_json(&cmd.schedule)?;
    let found = schedule::find_match(&frame.flights, &cmd.ident);
    let airline_code = airline::resolve_code(
        Some(cmd.ident.as_str()),
        found.as_ref().and_then(|m| m.flight.airline_code.as_deref()),
    );

    match cmd.format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "ident": cmd.ident,
                "airline": airline_code,
                "rule": found.as_ref().map(|m| m.rule.to_string()),
                "flight": found.as_ref().map(|m| m.flight),
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Table => {
            println!(
                "Airline:  {airline_code} ({})",
                airline::display_name(&airline_code)
            );
            match found {
                Some(m) => {
                    println!("Match:    {} (rule: {})", m.flight.flight_number, m.rule);
                    println!(
                        "Origin:   {} ({})",
                        m.flight.origin_city.as_deref().unwrap_or("-"),
                        m.flight.origin_code.as_deref().unwrap_or("-")
                    );
                    if let Some(registration) = &m.flight.registration {
                        println!("Tail:     {registration}");
                    }
                }
                None => println!("No scheduled flight matches \"{}\".", cmd.ident),
            }
        }
    }
    Ok(())
}

fn handle_trace(config: &Config, cmd: TraceCommand) -> CliResult {
    let sink = SqliteTraceSink::open(config.trace_path(), config.debug.capacity)?;

    match cmd {
        TraceCommand::Show { status, format } => {
            let wanted: Option<LandingStatus> = status.map(Into::into);
            let mut logs = sink.read_all()?;
            if let Some(wanted) = wanted {
                for log in &mut logs {
                    log.entries.retain(|entry| entry.status == wanted);
                }
                logs.retain(|log| !log.entries.is_empty());
            }

            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&logs)?),
                OutputFormat::Table => {
                    if logs.is_empty() {
                        println!("No trace batches in {}", sink.path().display());
                    }
                    for log in &logs {
                        println!("[{}]", log.last_updated.format("%Y-%m-%d %H:%M:%S UTC"));
                        for entry in &log.entries {
                            println!(
                                "  {:<8} {:<9} {:>7.0} {:>5} {:>6}  {:<16} {}",
                                entry.hex,
                                entry.flight.as_deref().unwrap_or("-"),
                                entry.altitude,
                                optional(entry.speed),
                                optional(entry.vertical_rate),
                                entry.status.to_string(),
                                entry.reason
                            );
                        }
                    }
                }
            }
        }
        TraceCommand::Clear => {
            sink.clear()?;
            println!("Cleared trace log at {}", sink.path().display());
        }
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> CliResult {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                print_config(config);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}

fn print_config(config: &Config) {
    println!("Current Configuration");
    println!("=====================");
    println!();
    println!("[Detection]");
    let detection = &config.detection;
    println!(
        "  Altitude threshold: {} ft",
        detection.altitude_threshold_ft
    );
    println!("  Speed threshold:    {} kt", detection.speed_threshold_kts);
    println!(
        "  Vertical rate:      below {} ft/min",
        detection.vertical_rate_threshold_fpm
    );
    println!(
        "  Debug band:         {} ft",
        detection.debug_altitude_threshold_ft
    );
    println!();
    println!("[Polling]");
    let polling = &config.polling;
    println!("  Landing interval:   {}s", polling.landing_interval_secs);
    println!(
        "  Schedule interval:  {}s",
        polling.flight_data_interval_secs
    );
    println!("  Reset interval:     {}s", polling.landing_reset_secs);
    println!();
    println!("[Debug]");
    println!("  Enabled:            {}", config.debug.enabled);
    println!("  Trace store:        {:?}", config.debug.trace_store);
    println!("  Trace path:         {}", config.trace_path().display());
    println!("  Capacity:           {}", config.debug.capacity);
    println!();
    println!("[Telemetry]");
    println!("  Mode:               {:?}", config.telemetry.mode);
    println!("  URL:                {}", config.telemetry.url);
    println!(
        "  Monitored airport:  {}",
        config.telemetry.monitored_airport
    );
    println!(
        "  Current airport:    {}",
        config.telemetry.current_airport.as_deref().unwrap_or("-")
    );
    println!();
    println!("[Schedule]");
    println!("  Mode:               {:?}", config.schedule.mode);
    println!("  Airport code:       {}", config.schedule.airport_code);
    println!();
    println!("[Alert]");
    println!("  Auto-hide:          {}s", config.alert.auto_hide_secs);
    println!("  Suppression:        {}s", config.alert.suppression_secs);
    println!("  Sound:              {}", config.alert.sound);
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, flyby::Error> {
    let bytes = std::fs::read(path).map_err(|source| flyby::Error::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn optional(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.0}"))
}
