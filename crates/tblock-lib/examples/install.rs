use std::sync::Arc;

use anyhow::{Context, Result};

use tblock_lib::game::installer::install_instance;
use tblock_lib::game::installer::types::{InstallSpec, ProgressReporter, RuntimePolicy};
use tblock_lib::InstallerConfig;

struct ConsoleReporter;

impl ProgressReporter for ConsoleReporter {
    fn start_step(&self, name: &str, total_steps: Option<u32>) {
        println!("[STEP START] {} (total: {:?})", name, total_steps);
    }

    fn update_bytes(&self, transferred: u64, total: Option<u64>) {
        if let Some(t) = total {
            if transferred == t {
                println!("[BYTES] {}/{}", transferred, t);
            }
        }
    }

    fn set_percent(&self, percent: i32) {
        println!("[PROGRESS] {}%", percent);
    }

    fn set_message(&self, message: &str) {
        println!("[MSG] {}", message);
    }

    fn set_step_count(&self, current: u32, total: Option<u32>) {
        if current % 250 == 0 || Some(current) == total {
            println!("[STEP COUNT] {}/{:?}", current, total);
        }
    }

    fn done(&self, success: bool, message: Option<&str>) {
        println!("[DONE] success={} message={:?}", success, message);
    }
}

/// Usage: install [version] [fabric-loader-version]
/// TBLOCK_CONFIG may point at a JSON file with installer settings.
#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut config = match std::env::var("TBLOCK_CONFIG") {
        Ok(path) => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("Read config {}", path))?;
            serde_json::from_str::<InstallerConfig>(&raw)
                .with_context(|| format!("Parse config {}", path))?
        }
        Err(_) => InstallerConfig::default(),
    };

    let mut args = std::env::args().skip(1);
    let mut spec = InstallSpec::new(args.next().unwrap_or_else(|| "1.21.4".to_string()));
    spec.fabric_loader_version = args.next();
    spec.runtime = RuntimePolicy::IfMissing;

    if config.game_dir.is_relative() {
        config.game_dir = std::env::current_dir()?.join(&config.game_dir);
    }

    println!(
        "Installing {} into {}",
        spec.version_id,
        config.game_dir.display()
    );

    let summary = install_instance(&config, &spec, Arc::new(ConsoleReporter)).await?;
    println!("Installation finished: {:#?}", summary);

    Ok(())
}
