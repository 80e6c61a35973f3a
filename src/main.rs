#![allow(clippy::collapsible_if)]

mod cli;
mod config;
mod deep;
mod display;
mod enumerate;
mod hardware;
mod menu;
mod modes;
mod navigator;
mod remote;
mod selection;
mod session;
mod system;
mod watcher;

use std::fs::File;
use std::io::{IsTerminal, Write};
use std::sync::{Mutex, OnceLock};
use std::time::{Duration, SystemTime};

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Command, EnumerateTarget, RunArgs, SourceArgs};
use config::Config;
use display::DisplaySink;
use hardware::Hardware;
use navigator::{Navigator, Settings};
use remote::{BundleReader, RemoteHost};
use system::{AudioCard, SystemControl};

const TICK: Duration = Duration::from_millis(10);

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Enumerate { target, source } => {
            env_logger::init();
            let config = config::load(source.config.as_deref())?;
            let (mut host, _) = open_host(&source, &config)?;
            match target {
                EnumerateTarget::Pedalboards => enumerate::pedalboards(host.as_mut()),
                EnumerateTarget::Presets => enumerate::presets(host.as_mut()),
            }
        }
        Command::Describe { bundle, source } => {
            env_logger::init();
            let config = config::load(source.config.as_deref())?;
            let (mut host, bundles) = open_host(&source, &config)?;
            enumerate::describe(host.as_mut(), bundles.as_ref(), &bundle)
        }
        Command::Run(args) => run(args),
    }
}

/// Line logger usable while the terminal is in raw mode: `\r\n` endings,
/// optionally redirected to a file.
struct RawModeLogger {
    file: OnceLock<Mutex<File>>,
}

impl log::Log for RawModeLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            let now = SystemTime::now()
                .duration_since(SystemTime::UNIX_EPOCH)
                .unwrap_or_default();
            let secs = now.as_secs() % 86400; // time of day
            let h = secs / 3600;
            let m = (secs % 3600) / 60;
            let s = secs % 60;
            let ms = now.subsec_millis();
            let line = format!(
                "[{h:02}:{m:02}:{s:02}.{ms:03} {}] {}\r\n",
                record.level(),
                record.args()
            );
            match self.file.get() {
                Some(file) => {
                    if let Ok(mut f) = file.lock() {
                        let _ = f.write_all(line.as_bytes());
                    }
                }
                None => {
                    let _ = std::io::stderr().write_all(line.as_bytes());
                }
            }
        }
    }

    fn flush(&self) {
        match self.file.get() {
            Some(file) => {
                if let Ok(mut f) = file.lock() {
                    let _ = f.flush();
                }
            }
            None => {
                let _ = std::io::stderr().flush();
            }
        }
    }
}

static RAW_MODE_LOGGER: RawModeLogger = RawModeLogger {
    file: OnceLock::new(),
};

fn init_run_logger(args: &RunArgs) -> anyhow::Result<()> {
    let level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(log::LevelFilter::Info);
    match &args.log_file {
        Some(path) => {
            let file = File::options()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {path}"))?;
            let _ = RAW_MODE_LOGGER.file.set(Mutex::new(file));
            log::set_max_level(level);
        }
        // The terminal display owns the screen; stderr lines would tear it.
        None if !args.headless && std::io::stderr().is_terminal() => {
            log::set_max_level(log::LevelFilter::Off);
        }
        None => log::set_max_level(level),
    }
    log::set_logger(&RAW_MODE_LOGGER).ok();
    Ok(())
}

fn open_host(
    source: &SourceArgs,
    config: &Config,
) -> anyhow::Result<(Box<dyn RemoteHost>, Box<dyn BundleReader>)> {
    match &source.offline {
        Some(path) => {
            let host = remote::offline::OfflineHost::load(path)?;
            let bundles = host.bundles();
            Ok((Box::new(host), Box::new(bundles)))
        }
        None => Ok((
            Box::new(remote::mod_host::ModHost::new(&config.host_url)),
            Box::new(remote::TomlBundles),
        )),
    }
}

fn run(args: RunArgs) -> anyhow::Result<()> {
    init_run_logger(&args)?;

    let config = config::load(args.source.config.as_deref())?;
    let (remote, bundles) = open_host(&args.source, &config)?;
    let (audio, system): (Box<dyn AudioCard>, Box<dyn SystemControl>) =
        if args.source.offline.is_some() {
            (
                Box::new(system::MemoryCard::default()),
                Box::new(system::NullSystem::default()),
            )
        } else {
            (
                Box::new(system::AmixerCard::new(&config.audio)),
                Box::new(system::ShellSystem::new(&config.system)),
            )
        };

    let display: Box<dyn DisplaySink> = if args.headless {
        crossterm::terminal::enable_raw_mode()?;
        Box::new(display::headless::LogDisplay::new(config.toolbar))
    } else {
        Box::new(display::terminal::TerminalDisplay::new(config.toolbar)?)
    };

    // The capture thread blocks on terminal input and dies with the process.
    let (input, _keyboard) = hardware::keyboard::spawn(config.hardware)?;
    let hardware = Hardware::new(config.hardware_config.clone()).with_input(Box::new(input));

    let settings = Settings {
        tweak_amount: config.tweak_amount,
        hotspot_settle: Duration::from_millis(config.system.hotspot_settle_ms),
    };
    let mut nav = Navigator::new(remote, bundles, display, hardware, audio, system, settings);
    let mut watcher = watcher::ChangeWatcher::new(&config.modification_file);

    let result = control_loop(&mut nav, &mut watcher);

    drop(nav);
    if args.headless {
        crossterm::terminal::disable_raw_mode()?;
    }
    log::info!("Stopping...");
    result
}

fn control_loop(nav: &mut Navigator, watcher: &mut watcher::ChangeWatcher) -> anyhow::Result<()> {
    nav.start()?;
    log::info!("Running. Press q or Ctrl+C to quit.");

    while !nav.exit_requested() {
        for event in nav.poll_controls() {
            nav.handle(event);
        }
        nav.run_pending();
        if let Some(bundle) = watcher.poll() {
            nav.on_external_change(&bundle);
        }
        std::thread::sleep(TICK);
    }
    Ok(())
}
