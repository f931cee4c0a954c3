//! Verification harness entry point
//!
//! Starts the application server, drives the editor and display surfaces
//! through the cross-context scenario, and exits 0 only if every
//! assertion held.
//!
//! The run is skipped (not failed) when Chromium or the server tooling
//! is not installed, so a plain `cargo test` stays green on machines
//! without the application checkout. Run for real with:
//! cargo test --package signage-e2e --test verify -- --no-sandbox

use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use signage_e2e::browser::SessionConfig;
use signage_e2e::server::ServerConfig;
use signage_e2e::{HarnessResult, Scenario, ScenarioConfig};

#[derive(Parser, Debug)]
#[command(name = "signage-e2e")]
#[command(about = "E2E verification for the CMS editor and display surfaces")]
struct Args {
    /// Shell command that starts the application server
    #[arg(long, default_value = "pnpm run dev")]
    command: String,

    /// Base URL the server listens on
    #[arg(long, default_value = "http://localhost:5173")]
    base_url: String,

    /// Worst-case wait for the server to become reachable, in seconds
    #[arg(long, default_value = "15")]
    warm_up: u64,

    /// Folder label to assign in the editor
    #[arg(long, default_value = "Eventos")]
    folder: String,

    /// Screen identifier to select on the display surface
    #[arg(long, default_value = "screen-1")]
    screen: String,

    /// Directory screenshots are written to
    #[arg(long, default_value = "verification")]
    artifacts: PathBuf,

    /// Run the browser with a visible window
    #[arg(long)]
    headed: bool,

    /// Disable the Chromium sandbox (containers without user namespaces)
    #[arg(long)]
    no_sandbox: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    let args = Args::parse();

    let Some(chrome) = find_chrome() else {
        eprintln!("Chromium not found; skipping verification (set CHROME_PATH or install Chrome)");
        return;
    };
    if !tooling_available(&args.command) {
        eprintln!(
            "Tooling for `{}` not found; skipping verification",
            args.command
        );
        return;
    }

    let rt = tokio::runtime::Runtime::new().expect("Failed to create tokio runtime");
    match rt.block_on(run(args, chrome)) {
        Ok(()) => {
            println!("Verification passed");
            std::process::exit(0);
        }
        Err(e) => {
            eprintln!("Verification failed: {}", e);
            std::process::exit(1);
        }
    }
}

async fn run(args: Args, chrome: PathBuf) -> HarnessResult<()> {
    let config = ScenarioConfig {
        server: ServerConfig {
            command: args.command,
            base_url: args.base_url,
            ready_timeout: Duration::from_secs(args.warm_up),
        },
        session: SessionConfig {
            headless: !args.headed,
            no_sandbox: args.no_sandbox,
            chrome_executable: Some(chrome),
            ..Default::default()
        },
        artifact_dir: args.artifacts,
        folder_label: args.folder,
        screen_id: args.screen,
        ..Default::default()
    };

    Scenario::new(config).run().await
}

/// Find a Chromium binary or return None (the run is skipped, not failed).
fn find_chrome() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("CHROME_PATH") {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    let candidates = [
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium-browser",
        "/usr/bin/chromium",
        "/snap/bin/chromium",
    ];
    for candidate in candidates {
        let path = PathBuf::from(candidate);
        if path.exists() {
            return Some(path);
        }
    }

    for name in ["google-chrome", "google-chrome-stable", "chromium", "chromium-browser"] {
        if let Ok(out) = Command::new("which").arg(name).output() {
            if out.status.success() {
                let path = PathBuf::from(String::from_utf8_lossy(&out.stdout).trim());
                if path.exists() {
                    return Some(path);
                }
            }
        }
    }

    None
}

/// Check that the server command's tool resolves on PATH.
fn tooling_available(command: &str) -> bool {
    let Some(tool) = command.split_whitespace().next() else {
        return false;
    };
    Command::new("which")
        .arg(tool)
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}
