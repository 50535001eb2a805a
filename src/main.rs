//! `fks`: frame-synchronized keystroke macro automation.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use frame_key_sender::config::parse_duration;
use frame_key_sender::{
    frame_clock, hook, keymap, process_finder, ActionQueue, Config, FksError, KeySender,
    KeybindTable, MacroCompiler, ProcessFinder, Scheduler,
};

#[derive(Parser, Debug)]
#[command(
    name = "fks",
    version,
    about = "Frame-synchronized keystroke macro automation for specific processes"
)]
struct Cli {
    /// Path to a JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Target process name(s), overriding the configuration
    #[arg(short, long)]
    process: Vec<String>,

    /// Frame clock poll interval (e.g. "1ms")
    #[arg(long)]
    poll_interval: Option<String>,

    /// Enable debug diagnostics
    #[arg(short, long)]
    verbose: bool,

    /// Print the key name registry and exit
    #[arg(long)]
    list_keys: bool,

    /// Validate startup collaborators and exit without installing the hook
    #[arg(long)]
    dry_run: bool,
}

/// Embedded macro keybinds. Macro sequences are literal data by design;
/// there is no external macro file format.
fn register_keybinds(table: &mut KeybindTable, compiler: &Arc<MacroCompiler>) -> Result<()> {
    // VK_OEM_5 (backslash on US layouts), bound by raw code: the "up" and
    // "down" names inside the macro are the arrow keys, per the grammar.
    table.bind(
        0xDC,
        &[],
        compiler.binding(&["m", "enter", "up 3", "enter", "down", "enter"]),
    );

    table.bind_named(
        "f2",
        &[],
        compiler.binding(&["m", "down 4", "enter", "enter 2", "up", "enter", "m"]),
    )?;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => {
            let path = path.to_str().context("config path is not valid UTF-8")?;
            Config::from_file(path)?
        }
        None => Config::default(),
    };
    if !cli.process.is_empty() {
        config.target_processes = cli.process.clone();
    }
    if let Some(interval) = &cli.poll_interval {
        config.poll_interval = parse_duration(interval)?;
    }
    if cli.verbose {
        config.verbose = true;
    }
    config.validate()?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if config.verbose { "debug" } else { "info" })
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    println!("{}", "🎮 frame-key-sender".bold());

    if cli.list_keys {
        for (name, code) in keymap::entries() {
            println!("{name:>12}  0x{code:02X}");
        }
        return Ok(());
    }

    if config.elevate_priority {
        process_finder::elevate_priority().context("could not raise process priority")?;
    }

    let mut finder = ProcessFinder::new();
    let target = finder
        .find_running(&config.target_processes)
        .ok_or_else(|| FksError::process_not_found(&config.target_processes))?;
    println!("🎯 Attached to {}", target.green());

    let clock = frame_clock::open_platform_clock(&target)?;
    println!("⏱️  Frame clock ready ({})", "RTSS shared memory".cyan());

    if cli.dry_run {
        println!("✅ Dry run: all collaborators available");
        return Ok(());
    }

    let queue = Arc::new(ActionQueue::new());
    let sender = KeySender::new()?;
    let compiler = Arc::new(MacroCompiler::new(Arc::clone(&queue), Arc::new(sender)));

    let mut table = KeybindTable::new();
    register_keybinds(&mut table, &compiler)?;
    let table = Arc::new(table);
    println!("🔥 {} keybinds registered", table.len());

    hook::install(Arc::clone(&table), target.clone())?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let scheduler =
        Scheduler::new(Arc::clone(&queue), clock).with_poll_interval(config.poll_interval);
    let poll_shutdown = Arc::clone(&shutdown);
    let poll_task = tokio::task::spawn_blocking(move || scheduler.run(poll_shutdown));

    println!("▶️  Running (press {} to exit)", "Ctrl+C".yellow());
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    shutdown.store(true, Ordering::Relaxed);
    let _ = poll_task.await;
    println!("⏹️  Stopped");
    Ok(())
}
