//! Counter comment bot.
//!
//! Resolves the configured video once, then repeatedly reads its newest
//! comments and posts the next counter value until the ceiling is reached.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use countbot::advancer::Advancer;
use countbot::core::plan::{NextStep, plan_next};
use countbot::exit_codes;
use countbot::io::api::BiliClient;
use countbot::io::config::{BotConfig, DEFAULT_CONFIG_PATH, load_config, write_config};
use countbot::io::record::RecordLog;
use countbot::logging;
use countbot::reader::StateReader;
use countbot::resolver::resolve_video;
use countbot::schedule::{Schedule, ScheduleStop, StopSignal, ThreadPacer, run_schedule};
use tracing::info;

#[derive(Parser)]
#[command(
    name = "countbot",
    version,
    about = "Advances a counter carried in a recurring video comment"
)]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a default config file if missing.
    Init {
        /// Overwrite an existing file.
        #[arg(short, long)]
        force: bool,
    },
    /// Check the config, including credentials.
    Validate,
    /// Print the numeric id and title of the configured video.
    Resolve,
    /// Print the current counter and the value that would be posted, without posting.
    Peek,
    /// Post the next counter value every interval until the ceiling is reached.
    Run {
        /// Stop after this many cycles.
        #[arg(long)]
        max_cycles: Option<u32>,
    },
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Init { force } => cmd_init(&cli.config, force),
        Command::Validate => cmd_validate(&cli.config),
        Command::Resolve => cmd_resolve(&cli.config),
        Command::Peek => cmd_peek(&cli.config),
        Command::Run { max_cycles } => cmd_run(&cli.config, max_cycles),
    }
}

fn cmd_init(path: &Path, force: bool) -> Result<i32> {
    if !force && path.exists() {
        bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    write_config(path, &BotConfig::default())
        .with_context(|| format!("write {}", path.display()))?;
    println!("wrote {}", path.display());
    Ok(exit_codes::OK)
}

fn cmd_validate(path: &Path) -> Result<i32> {
    let cfg = load_config(path)?;
    cfg.require_credentials()?;
    cfg.comment_template()?;
    println!("{} is valid", path.display());
    Ok(exit_codes::OK)
}

fn cmd_resolve(path: &Path) -> Result<i32> {
    let cfg = load_config(path)?;
    let api = BiliClient::new(&cfg.api, &cfg.credentials)?;
    let video = resolve_video(&api, &cfg.bvid()?)?;
    println!("aid: {}", video.aid);
    println!("title: {}", video.title);
    Ok(exit_codes::OK)
}

fn cmd_peek(path: &Path) -> Result<i32> {
    let cfg = load_config(path)?;
    let template = cfg.comment_template()?;
    let api = BiliClient::new(&cfg.api, &cfg.credentials)?;
    let video = resolve_video(&api, &cfg.bvid()?)?;
    let observation = StateReader::new(&api, &template, cfg.window_size).observe(video.aid);

    if let Some(reason) = &observation.fetch_error {
        bail!("comment window unavailable: {reason}");
    }
    let Some(max) = observation.max else {
        println!(
            "no counter in the latest {} comments of {}",
            observation.scanned, video.bvid
        );
        return Ok(exit_codes::NO_MATCH);
    };
    println!("current: {max}");
    match plan_next(Some(max), cfg.ceiling) {
        NextStep::Post { next } => println!("next: {}", template.render(next)),
        NextStep::Halt { .. } => println!("next: none (ceiling {} reached)", cfg.ceiling),
        NextStep::Skip => {}
    }
    Ok(exit_codes::OK)
}

fn cmd_run(path: &Path, max_cycles: Option<u32>) -> Result<i32> {
    let cfg = load_config(path)?;
    cfg.require_credentials()?;
    let template = cfg.comment_template()?;
    let api = BiliClient::new(&cfg.api, &cfg.credentials)?;
    let record = RecordLog::new(&cfg.record_path);

    let video = resolve_video(&api, &cfg.bvid()?)?;
    println!("video: {} (aid {})", video.title, video.aid);

    let stop = StopSignal::new();
    let handler_stop = stop.clone();
    ctrlc::set_handler(move || {
        info!("received Ctrl+C, stopping after the current cycle");
        handler_stop.raise();
    })
    .context("install Ctrl+C handler")?;

    let schedule = Schedule {
        video: &video,
        reader: StateReader::new(&api, &template, cfg.window_size),
        advancer: Advancer::new(&api, &template, cfg.ceiling, cfg.window_size, &record),
        pacer: &ThreadPacer,
        interval: cfg.interval(),
        max_cycles,
    };
    let outcome = run_schedule(&schedule, &stop, |report| {
        println!("{}", report.record_line);
    })?;

    info!(cycles = outcome.cycles, stop = ?outcome.stop, "run finished");
    match outcome.stop {
        ScheduleStop::Interrupted => Ok(exit_codes::INTERRUPTED),
        ScheduleStop::CeilingReached { .. } | ScheduleStop::CycleLimit { .. } => {
            Ok(exit_codes::OK)
        }
    }
}
