//! assetforge command line.
//!
//! Provides the `assetforge` binary with two modes:
//! - `run` (the default): one program from stdin, result on stdout
//! - `batch`: a long-lived session serving length-prefixed programs from one
//!   pipe and writing base64 responses to another
//!
//! Exit codes: 0 success (including captured error payloads), 1 execution
//! error, 2 framing error, 3 I/O or index storage error.

mod signals;

use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Parser, Subcommand};
use tracing::{info, warn, Level};

use assetforge_core::{Registry, Workspace};
use assetforge_engine::{Engine, EngineConfig, DEFAULT_CACHE_CAPACITY};
use assetforge_server::{BatchServer, ServerError, Session, SessionOptions};
use assetforge_storage::IncrementalIndex;

use crate::signals::SigintGuard;

/// Asset build pipeline executor.
#[derive(Parser, Debug)]
#[command(name = "assetforge", about = "Asset build pipeline executor")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Return materializer failures as errors instead of error payloads.
    #[arg(long, global = true)]
    errors: bool,

    /// Skip programs whose recorded input files are unchanged.
    #[arg(long, global = true)]
    incremental: bool,

    /// Print per-operation timings and cache counters to stderr.
    #[arg(long = "print_timers", global = true)]
    print_timers: bool,

    /// Ignore SIGINT while running.
    #[arg(long = "ignore_sigint", global = true)]
    ignore_sigint: bool,

    /// Root directory for relative asset paths.
    #[arg(long, global = true, env = "ASSETFORGE_WORKSPACE", default_value = ".")]
    workspace: PathBuf,

    /// Incremental index database, relative to the workspace.
    #[arg(
        long,
        global = true,
        env = "ASSETFORGE_INDEX",
        default_value = ".assetforge/index.db"
    )]
    index: PathBuf,

    /// Maximum number of memoized values kept in memory.
    #[arg(
        long = "cache_capacity",
        global = true,
        env = "ASSETFORGE_CACHE_CAPACITY",
        default_value_t = DEFAULT_CACHE_CAPACITY
    )]
    cache_capacity: usize,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Commands {
    /// Execute one program read from stdin.
    Run,

    /// Serve framed programs from `--input`, answering on `--output`.
    Batch {
        /// Request stream (usually a named pipe).
        #[arg(long)]
        input: PathBuf,

        /// Response stream (usually a named pipe).
        #[arg(long)]
        output: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let _sigint = if cli.ignore_sigint {
        match SigintGuard::install() {
            Ok(guard) => Some(guard),
            Err(err) => {
                warn!(error = %err, "could not install SIGINT handler");
                None
            }
        }
    } else {
        None
    };

    let exit_code = match execute(&cli) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("Error: {err}");
            err.exit_code()
        }
    };
    process::exit(exit_code);
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_target(false)
        .with_max_level(level)
        .init();
}

fn execute(cli: &Cli) -> Result<(), ServerError> {
    let workspace = Workspace::new(&cli.workspace);
    let engine = Engine::new(
        Registry::with_builtins(),
        workspace.clone(),
        EngineConfig {
            cache_capacity: cli.cache_capacity,
        },
    );
    let index = if cli.incremental {
        Some(IncrementalIndex::open(
            workspace.resolve(&cli.index),
            workspace.clone(),
        )?)
    } else {
        None
    };
    let session = Session::new(
        engine,
        index,
        SessionOptions {
            propagate_errors: cli.errors,
        },
    );

    match &cli.command {
        None | Some(Commands::Run) => run_single(session, cli.print_timers),
        Some(Commands::Batch { input, output }) => {
            run_batch(session, input, output, cli.print_timers)
        }
    }
}

/// Single-shot mode. The index is flushed even when the program fails.
fn run_single(mut session: Session, print_timers: bool) -> Result<(), ServerError> {
    let mut text = String::new();
    io::stdin().read_to_string(&mut text)?;

    let result = session.handle(&text);
    if let Ok(payload) = &result {
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{payload}")?;
        stdout.flush()?;
    }
    if print_timers {
        eprint!("{}", session.engine().profile_report());
    }
    finish(result.map(|_| ()), session.close().map(|_| ()))
}

/// Batch mode. Opens the request stream first, then the response stream,
/// matching a client that opens its write end before its read end.
fn run_batch(
    session: Session,
    input: &Path,
    output: &Path,
    print_timers: bool,
) -> Result<(), ServerError> {
    let mut reader = BufReader::new(File::open(input)?);
    let mut writer = BufWriter::new(
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(output)?,
    );

    let mut server = BatchServer::new(session);
    let served = server.serve(&mut reader, &mut writer);
    let session = server.into_session();
    if print_timers {
        eprint!("{}", session.engine().profile_report());
    }
    let closed = session.close();
    if let Ok(summary) = &served {
        info!(
            requests = summary.requests,
            skipped = summary.skipped,
            failed = summary.failed,
            "batch finished"
        );
    }
    finish(served.map(|_| ()), closed.map(|_| ()))
}

/// Reports the request error first; a close error only if the request succeeded.
fn finish(
    request: Result<(), ServerError>,
    close: Result<(), ServerError>,
) -> Result<(), ServerError> {
    match (request, close) {
        (Err(err), Err(close_err)) => {
            warn!(error = %close_err, "closing the incremental index also failed");
            Err(err)
        }
        (Err(err), Ok(())) | (Ok(()), Err(err)) => Err(err),
        (Ok(()), Ok(())) => Ok(()),
    }
}
