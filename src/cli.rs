// src/cli.rs
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, bail, eyre};

use crate::config::consts::{CONFIG_FILE, FALLBACK_SUBDIR, STORE_DIR};
use crate::config::options::TrackerOptions;
use crate::csv::{SEP, rows_to_string, write_row};
use crate::progress::{Progress, Stage};
use crate::roster::{LevelHistory, parse};
use crate::runner::Tracker;
use crate::specs::guild::{FileFetcher, PageFetcher};
use crate::store::{Grid, SheetStore};

#[derive(Parser)]
#[command(name = "guild_tracker", version, about = "Track a guild roster: level snapshots and departures")]
pub struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct GlobalArgs {
    /// Options file (JSON); missing file means defaults
    #[arg(long, value_name = "PATH", default_value = CONFIG_FILE, global = true)]
    config: PathBuf,

    /// Store directory (sheets, fallback dumps, debug log)
    #[arg(long, value_name = "DIR", global = true)]
    store: Option<PathBuf>,

    /// Spreadsheet id inside the store
    #[arg(long, value_name = "ID", global = true)]
    sheet_id: Option<String>,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch, reconcile and store one snapshot
    Run {
        #[arg(long)]
        guild: Option<String>,
        /// Read a saved page (or flattened table text) instead of fetching
        #[arg(long, value_name = "PATH")]
        from_file: Option<PathBuf>,
    },
    /// Parse a saved page or table text and print members as TSV
    Parse { path: PathBuf },
    /// Print a stored sheet as CSV
    Show {
        #[arg(long, conflicts_with = "history")]
        archive: bool,
        #[arg(long)]
        history: bool,
        /// With --history: one row per member, one column per snapshot
        #[arg(long, requires = "history")]
        wide: bool,
    },
    /// Reconcile a fallback dump into the store
    Replay { path: PathBuf },
}

/// Progress lines on stderr so stdout stays machine-readable.
struct CliProgress;

impl Progress for CliProgress {
    fn log(&mut self, msg: &str) {
        eprintln!("{msg}");
    }

    fn stage_done(&mut self, stage: Stage) {
        tracing::debug!(%stage, "stage done");
    }
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let options = load_options(&cli.global)?;
    crate::log::init(&options.log_path(), cli.global.verbose, true)?;

    match cli.command {
        Command::Run { guild, from_file } => track(options, guild, from_file),
        Command::Parse { path } => print_members(&path),
        Command::Show { archive, history, wide } => show(&options, archive, history, wide),
        Command::Replay { path } => replay(&options, &path),
    }
}

fn load_options(g: &GlobalArgs) -> Result<TrackerOptions> {
    let mut o = TrackerOptions::load(&g.config)?;
    if let Some(dir) = &g.store {
        // Fallback dumps follow the store unless configured elsewhere.
        if o.fallback_dir == PathBuf::from(STORE_DIR).join(FALLBACK_SUBDIR) {
            o.fallback_dir = dir.join(FALLBACK_SUBDIR);
        }
        o.store_dir = dir.clone();
    }
    if let Some(id) = &g.sheet_id {
        o.sheet_id = id.clone();
    }
    Ok(o)
}

fn track(mut options: TrackerOptions, guild: Option<String>, from_file: Option<PathBuf>) -> Result<()> {
    if let Some(g) = guild {
        options.set_guild(&g);
    }
    let tracker = Tracker::from_options(&options);
    let mut store = options.store();

    let fetcher: Box<dyn PageFetcher> = match from_file {
        Some(path) => Box::new(FileFetcher::new(path)),
        None => Box::new(options.http_fetcher()),
    };

    let summary = tracker.run(fetcher.as_ref(), &mut store, &mut CliProgress)?;
    println!("{summary}");
    if summary.is_fallback() {
        bail!("run was not stored; replay the fallback file once the store is back");
    }
    Ok(())
}

fn print_members(path: &Path) -> Result<()> {
    let text = FileFetcher::new(path).fetch_guild_table("")?;
    let members = parse(&text);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for m in &members {
        let row = vec![
            m.rank.to_string(),
            m.name.clone(),
            m.title.clone(),
            m.vocation.to_string(),
            m.level.clone(),
            m.joining_date.clone(),
        ];
        write_row(&mut out, &row, '\t')?;
    }
    out.flush()?;
    eprintln!("{} members", members.len());
    Ok(())
}

fn show(options: &TrackerOptions, archive: bool, history: bool, wide: bool) -> Result<()> {
    let sheet = if archive {
        options.archive_sheet_name()
    } else if history {
        options.history_sheet_name()
    } else {
        options.main_sheet_name()
    };

    let store = options.store();
    let grid = store
        .read_grid(&options.sheet_id, &sheet)?
        .ok_or_else(|| eyre!("sheet {sheet} does not exist in {}", store.describe()))?;

    let grid: Grid = if wide {
        LevelHistory::from_rows(&grid.to_rows()).to_wide_grid()
    } else {
        grid
    };
    print!("{}", rows_to_string(&grid.to_rows(), SEP));
    Ok(())
}

fn replay(options: &TrackerOptions, path: &Path) -> Result<()> {
    let tracker = Tracker::from_options(options);
    let mut store = options.store();
    let summary = tracker.replay(path, &mut store, &mut CliProgress)?;
    println!("{summary}");
    if summary.is_fallback() {
        bail!("replay was not stored either");
    }
    Ok(())
}
