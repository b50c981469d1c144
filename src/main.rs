use std::env;
use std::fs;
use std::process::ExitCode;
use std::sync::Arc;

use duemail::dispatch::ReminderEngine;
use duemail::logging::init_console_tracing;
use duemail::settings::ReminderSettings;
use duemail::store::{EmptyDebtStore, StaticSettings, TracingDeliveryLog};

// Application configuration constants
const CONFIG_PATH_ENV: &str = "DUEMAIL_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/reminder.toml";

/// Load reminder settings from the TOML config file
fn load_settings() -> Result<ReminderSettings, String> {
    let path = env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config_text = fs::read_to_string(&path)
        .map_err(|e| format!("Failed to read settings file {path}: {e}"))?;
    toml::from_str(&config_text).map_err(|e| format!("Failed to parse settings file {path}: {e}"))
}

fn usage(program: &str) -> String {
    format!("Usage: {program} <probe | test-send [recipient]>")
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present
    dotenvy::dotenv().ok();
    init_console_tracing();

    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("duemail");

    let settings = match load_settings() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("⚠️  {e}");
            return ExitCode::FAILURE;
        }
    };

    // Probe and test-send never touch debt records, so an empty store and a
    // tracing-backed delivery log are all the CLI wires in.
    let engine = ReminderEngine::new(
        Arc::new(EmptyDebtStore),
        Arc::new(StaticSettings::new(settings)),
        Arc::new(TracingDeliveryLog),
    );

    let result = match args.get(1).map(String::as_str) {
        Some("probe") => {
            println!("📨 Checking SMTP connectivity...");
            engine.probe().await
        }
        Some("test-send") => {
            println!("📨 Sending SMTP test message...");
            engine.test_send(args.get(2).map(String::as_str)).await
        }
        _ => {
            eprintln!("{}", usage(program));
            return ExitCode::FAILURE;
        }
    };

    println!("{}", result.message);
    if result.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
