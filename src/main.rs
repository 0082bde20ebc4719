mod clock;
mod config;
mod countdown;
mod error;
mod input;
mod notify;
mod session;
mod timer;
mod ui;

use clap::{Parser, builder::PossibleValuesParser};
use env_logger::{Env, Target};
use std::{
    fs::OpenOptions,
    io,
    path::{Path, PathBuf},
    process::ExitCode,
    sync::atomic::Ordering,
};

use clock::SystemClock;
use config::{Config, DEFAULT_CONFIG_PATH, Overrides, load_config, parse_minutes};
use error::Result;
use input::{InputChannel, KeySource, Passive, QUEUE_CAPACITY};
use notify::{DesktopNotifier, Notifier, SilentNotifier};
use session::Session;
use ui::{TerminalStatus, Theme};

const APP_NAME: &str = "rpomodoro";

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Clone, Debug)]
#[command(author, version, about = "🍅 rpomodoro - Pomodoro timer for the terminal")]
struct Args {
    /// JSON file with work_time, short_break, long_break, reps, update_interval
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    /// Only count down; no keyboard controls
    #[arg(long)]
    passive: bool,
    #[arg(short = 't', long, default_value = "default", value_parser = PossibleValuesParser::new(ui::THEMES.iter().copied()))]
    theme: String,
    #[arg(long)]
    no_notify: bool,
    #[arg(long)]
    log_file: Option<PathBuf>,
    #[arg(short, long, value_parser = parse_minutes)]
    work: Option<f64>,
    #[arg(short, long, value_parser = parse_minutes)]
    short_break: Option<f64>,
    #[arg(short, long, value_parser = parse_minutes)]
    long_break: Option<f64>,
    #[arg(short, long)]
    reps: Option<u32>,
    /// Seconds between updates
    #[arg(short, long)]
    interval: Option<f64>,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            work_minutes: self.work,
            short_break_minutes: self.short_break,
            long_break_minutes: self.long_break,
            reps: self.reps,
            update_interval: self.interval,
        }
    }
}

// ============================================================================
// Main
// ============================================================================

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(e) = init_logging(args.log_file.as_deref()) {
        eprintln!("warning: logging disabled: {}", e);
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Logs stay off the terminal the status line is drawn on: they go to
/// `--log-file` when given and are disabled otherwise unless `RUST_LOG` says so.
fn init_logging(log_file: Option<&Path>) -> io::Result<()> {
    let mut builder = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
            builder.target(Target::Pipe(Box::new(file)));
            builder
        }
        None => env_logger::Builder::from_env(Env::default().default_filter_or("off")),
    };
    if builder.try_init().is_err() {
        return Err(io::Error::other("logger already initialised"));
    }
    Ok(())
}

fn run(args: &Args) -> Result<()> {
    let config = load_config(&args.config)?.apply(&args.overrides());
    config.validate()?;
    log::info!(
        "Loaded {}: work {}m, short break {}m, long break {}m, long break every {} reps, tick {}s",
        args.config.display(),
        config.work_minutes,
        config.short_break_minutes,
        config.long_break_minutes,
        config.reps,
        config.update_interval
    );
    if config.update_interval > 1.0 {
        log::warn!("Update interval above one second; five-minute reminders may be missed or repeated");
    }

    let notifier: Box<dyn Notifier> = if args.no_notify {
        Box::new(SilentNotifier)
    } else {
        Box::new(DesktopNotifier::new(APP_NAME))
    };
    let theme = ui::get_theme(&args.theme);

    if args.passive {
        let mut keys = Passive::new();
        let flag = keys.quit_flag();
        if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)) {
            log::warn!("Ctrl+C handler not installed: {}", e);
        }
        drive(config, &mut keys, notifier, theme, false)?.finish();
    } else {
        // Raw mode lasts as long as the keyboard thread; closing or dropping
        // `keys` joins it, which restores the terminal on every path out of here.
        let mut keys = InputChannel::spawn(QUEUE_CAPACITY)?;
        let renderer = drive(config, &mut keys, notifier, theme, true)?;
        let closed = keys.close();
        renderer.finish();
        closed?;
    }
    Ok(())
}

fn drive<K: KeySource>(
    config: Config,
    keys: &mut K,
    notifier: Box<dyn Notifier>,
    theme: Theme,
    interactive: bool,
) -> Result<TerminalStatus> {
    let renderer = TerminalStatus::new(theme)?;
    let mut session = Session::start(config, SystemClock, notifier, renderer, interactive);
    session.run(keys);
    Ok(session.into_renderer())
}
