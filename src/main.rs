//! HealthWatch CLI Entry Point
//!
//! Starts the health sampling and optimization tasks and keeps them running
//! until `exit` is typed or the process is interrupted.
//!
//! # Usage
//!
//! ```bash
//! # Run with configs/config.yaml
//! healthwatch
//!
//! # Use another configuration file
//! healthwatch --config /etc/healthwatch.yaml
//!
//! # Debug diagnostics on stderr
//! healthwatch --verbose
//! ```

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::mpsc::channel;
use std::sync::Arc;

use colored::Colorize;
use log::{error, info, warn};

use healthwatch::config::{resolve_config_path, CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH};
use healthwatch::logging::{FileSink, Sink};
use healthwatch::monitoring::{Sampler, SystemMetrics, TimeoutSource};
use healthwatch::runtime::control::{spawn_signal_listener, spawn_stdin_reader};
use healthwatch::runtime::{optimization_task, Command, TaskRunner};
use healthwatch::{Settings, APP_NAME, VERSION};

/// Command-line configuration parsed from arguments.
#[derive(Debug, Default)]
struct Config {
    config_path: Option<PathBuf>,
    verbose: bool,
}

/// Configures the logging system with appropriate formatting.
fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            use std::io::Write;

            match record.level() {
                log::Level::Warn | log::Level::Error => {
                    writeln!(buf, "[{}] {}", record.level(), record.args())
                }
                _ => writeln!(buf, "{}", record.args()),
            }
        })
        .init();
}

/// Prints the application banner with version information.
fn print_banner() {
    println!();
    println!("{} v{}", APP_NAME.bold(), VERSION);
    println!("Periodic Host Health Sampling");
    println!();
}

/// Prints usage information.
fn print_usage() {
    println!("Usage: healthwatch [OPTIONS]");
    println!();
    println!("Options:");
    println!(
        "  --config PATH       Configuration file (default: {}, or ${})",
        DEFAULT_CONFIG_PATH, CONFIG_PATH_ENV
    );
    println!("  --verbose           Enable debug logging");
    println!("  --help              Show this help message");
    println!("  --version           Show version information");
    println!();
    println!("While running, type 'exit' or press Ctrl+C to stop.");
}

/// Parses command-line arguments into a Config struct.
fn parse_arguments(args: &[String]) -> Result<Config, String> {
    let mut config = Config::default();
    let mut i = 1; // Skip program name

    while i < args.len() {
        let arg = &args[i];

        match arg.as_str() {
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("{} {}", APP_NAME, VERSION);
                std::process::exit(0);
            }
            "--verbose" | "-v" => {
                config.verbose = true;
            }
            "--config" | "-c" => {
                i += 1;
                if i >= args.len() {
                    return Err("--config requires a path argument".to_string());
                }
                config.config_path = Some(PathBuf::from(&args[i]));
            }
            arg if arg.starts_with('-') => {
                return Err(format!("Unknown option: {}", arg));
            }
            _ => return Err(format!("Unexpected argument: {}", arg)),
        }
        i += 1;
    }

    Ok(config)
}

/// Main application entry point.
fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    // Parse arguments
    let config = parse_arguments(&args).map_err(|e| {
        eprintln!("Error: {}", e);
        eprintln!();
        print_usage();
        e
    })?;

    setup_logging(config.verbose);
    print_banner();

    // Startup configuration; any failure here is fatal
    let config_path = resolve_config_path(config.config_path);
    let settings = Settings::load(&config_path).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        format!(
            "Could not load configuration from '{}': {}",
            config_path.display(),
            e
        )
    })?;

    let sink: Arc<dyn Sink> = Arc::new(FileSink::open(&settings.log_file, settings.log_format)?);
    info!("Health log: {}", settings.log_file.display());

    let source = TimeoutSource::spawn(
        SystemMetrics::with_mount_point(&settings.disk_mount_point),
        settings.sample_timeout,
    )?;

    let mut runner = TaskRunner::new(APP_NAME, Arc::clone(&sink));
    runner.register(
        Sampler::new(source, Arc::clone(&sink)).into_task("health", settings.health_interval),
    )?;
    runner.register(optimization_task(
        Arc::clone(&sink),
        settings.optimization_interval,
    ))?;

    // Shutdown is driven by commands from the terminal or a signal
    let (commands_tx, commands_rx) = channel();
    spawn_signal_listener(commands_tx.clone())?;
    spawn_stdin_reader(commands_tx)?;

    runner.start()?;
    println!("Type '{}' to stop {}", "exit".bold(), APP_NAME);

    match commands_rx.recv() {
        Ok(Command::Exit) => info!("Exit requested"),
        Err(_) => warn!("All command sources closed"),
    }

    runner.stop();
    println!("{} stopped", APP_NAME);

    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!();
            eprintln!("{} {}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("healthwatch")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_parse_defaults() {
        let config = parse_arguments(&args(&[])).unwrap();
        assert!(config.config_path.is_none());
        assert!(!config.verbose);
    }

    #[test]
    fn test_parse_config_and_verbose() {
        let config = parse_arguments(&args(&["--config", "my.yaml", "-v"])).unwrap();
        assert_eq!(config.config_path, Some(PathBuf::from("my.yaml")));
        assert!(config.verbose);
    }

    #[test]
    fn test_parse_config_requires_value() {
        let err = parse_arguments(&args(&["--config"])).unwrap_err();
        assert!(err.contains("requires a path"));
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert!(parse_arguments(&args(&["--fast"])).unwrap_err().contains("Unknown option"));
        assert!(parse_arguments(&args(&["extra"])).unwrap_err().contains("Unexpected argument"));
    }
}
