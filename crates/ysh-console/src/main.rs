//! yaysh - command console for the YAYLinux shell.
//!
//! The binary wires the console engine to a terminal: an interactive REPL
//! (`run`, the default), a one-shot `exec` for scripting and agents, and the
//! first-run `setup` flow that persists identity and the credential.

use std::io::{BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use ysh_common::{
    is_first_run, mark_setup_complete, resolve_config_dir, ConfigDir, Identity, SetupOutcome,
};
use ysh_console::{
    CommandDispatcher, Console, ConsoleEvent, ElevationFallback, PrivilegeProbe, ProcessRunner,
    RunnerConfig, Session, SubmitError,
};
use ysh_store::CredentialStore;

/// Credential key used by first-run setup.
const PASSWORD_KEY: &str = "yay_password";

/// yaysh - command console with builtin dispatch and host-shell delegation
#[derive(Parser)]
#[command(name = "yaysh")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Override config directory
    #[arg(long, global = true, env = "YAYSH_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease verbosity (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Fail elevated commands instead of degrading when no helper exists
    #[arg(long, global = true)]
    strict_elevation: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive console (default)
    Run(RunArgs),

    /// Dispatch a single command line and print its result
    Exec(ExecArgs),

    /// First-run setup: identity files, credential, sentinel
    Setup(SetupArgs),

    /// Print version information
    Version,
}

#[derive(Args, Debug, Default)]
struct RunArgs {
    /// Start with the elevation toggle on
    #[arg(long)]
    elevate: bool,
}

#[derive(Args, Debug)]
struct ExecArgs {
    /// The command line to dispatch
    command: String,

    /// Request privilege elevation
    #[arg(long)]
    elevate: bool,

    /// Timeout in seconds for delegated commands
    #[arg(long, default_value_t = 60)]
    timeout: u64,

    /// Output format
    #[arg(long, short = 'f', default_value = "text")]
    format: OutputFormat,
}

#[derive(Args, Debug)]
struct SetupArgs {
    /// Username shown in the prompt
    #[arg(long, default_value = "User")]
    username: String,

    /// Hostname shown in the prompt
    #[arg(long, default_value = "localhost")]
    hostname: String,

    /// Password to persist through the credential store
    #[arg(long)]
    password: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Process exit codes.
#[derive(Debug, Clone, Copy)]
enum ExitCode {
    Clean = 0,
    CommandFailed = 1,
    SetupFailed = 2,
}

impl ExitCode {
    fn as_i32(self) -> i32 {
        self as i32
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    // YAYSH_LOG takes precedence, then RUST_LOG, then the verbosity flags.
    let filter = std::env::var("YAYSH_LOG")
        .ok()
        .map(EnvFilter::new)
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| {
            EnvFilter::new(format!(
                "ysh_console={level},ysh_common={level},ysh_store={level},yaysh={level}"
            ))
        });

    let use_ansi = std::io::stderr().is_terminal();
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(use_ansi);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.global.verbose, cli.global.quiet);

    let exit_code = match cli.command {
        None => run_repl(&cli.global, &RunArgs::default()),
        Some(Commands::Run(args)) => run_repl(&cli.global, &args),
        Some(Commands::Exec(args)) => run_exec(&cli.global, &args),
        Some(Commands::Setup(args)) => run_setup(&cli.global, &args),
        Some(Commands::Version) => {
            println!("yaysh {}", env!("CARGO_PKG_VERSION"));
            ExitCode::Clean
        }
    };

    std::process::exit(exit_code.as_i32());
}

fn build_dispatcher(global: &GlobalOpts, timeout: Option<Duration>) -> CommandDispatcher {
    let config = RunnerConfig {
        default_timeout: timeout.unwrap_or(RunnerConfig::default().default_timeout),
        elevation_fallback: if global.strict_elevation {
            ElevationFallback::Fail
        } else {
            ElevationFallback::Degrade
        },
        ..RunnerConfig::default()
    };
    CommandDispatcher::new(ProcessRunner::new(config, PrivilegeProbe::default()))
}

fn open_config_dir(global: &GlobalOpts) -> Option<ConfigDir> {
    match resolve_config_dir(global.config_dir.as_deref()) {
        Ok(dir) => Some(dir),
        Err(e) => {
            tracing::warn!(error = %e, "config directory unavailable, using defaults");
            None
        }
    }
}

fn starting_session(config: Option<&ConfigDir>) -> Session {
    let identity = config.map(Identity::load).unwrap_or_default();
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
    Session::new(cwd, identity)
}

fn run_repl(global: &GlobalOpts, args: &RunArgs) -> ExitCode {
    let config = open_config_dir(global);
    if let Some(ref dir) = config {
        if is_first_run(dir) {
            println!("First run: no identity configured. Run `yaysh setup` to set one.");
        }
    }

    let session = starting_session(config.as_ref());
    let dispatcher = build_dispatcher(global, None);
    let (console, events) = Console::spawn(dispatcher, session);
    console.set_elevated(args.elevate);

    println!("Welcome to YAYLinux console");
    print!("{}", console.prompt());
    let _ = std::io::stdout().flush();

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(_) => break,
        };

        // Blank input queues nothing, so no event will arrive for it; just
        // render a fresh prompt instead of blocking on the receiver.
        if line.trim().is_empty() {
            print!("{}", console.prompt());
            let _ = std::io::stdout().flush();
            continue;
        }

        match console.submit(line) {
            Ok(()) => {}
            Err(SubmitError::QueueFull) => {
                println!("busy: command queue is full");
                continue;
            }
            Err(SubmitError::Closed) => break,
        }

        // One transcript block per accepted line; print it as it completes.
        match events.recv() {
            Ok(ConsoleEvent::Line(block)) => {
                print!("{block}");
                let _ = std::io::stdout().flush();
            }
            Ok(ConsoleEvent::Exited) | Err(_) => break,
        }
        // The worker sends Exited right after the final block; give it a
        // moment so `exit` ends the loop instead of waiting on stdin.
        if matches!(
            events.recv_timeout(Duration::from_millis(50)),
            Ok(ConsoleEvent::Exited)
        ) {
            break;
        }
    }

    console.shutdown();
    println!();
    ExitCode::Clean
}

fn run_exec(global: &GlobalOpts, args: &ExecArgs) -> ExitCode {
    let config = open_config_dir(global);
    let mut session = starting_session(config.as_ref());
    let dispatcher = build_dispatcher(global, Some(Duration::from_secs(args.timeout)));

    let result = dispatcher.dispatch(&args.command, &mut session, args.elevate);

    match args.format {
        OutputFormat::Text => println!("{}", result.output),
        OutputFormat::Json => match serde_json::to_string_pretty(&result) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("failed to serialize result: {e}");
                return ExitCode::CommandFailed;
            }
        },
    }

    if result.exit_succeeded {
        ExitCode::Clean
    } else {
        ExitCode::CommandFailed
    }
}

fn run_setup(global: &GlobalOpts, args: &SetupArgs) -> ExitCode {
    let Some(dir) = open_config_dir(global) else {
        eprintln!("setup failed: no usable config directory");
        return ExitCode::SetupFailed;
    };

    let identity = Identity::new(args.username.clone(), args.hostname.clone());
    if let Err(e) = identity.store(&dir) {
        eprintln!("setup failed: {e}");
        return ExitCode::SetupFailed;
    }

    if let Some(ref password) = args.password {
        let store = CredentialStore::with_default_chain(dir.path());
        if !store.save(PASSWORD_KEY, password) {
            eprintln!("setup failed: no credential backend accepted the password");
            return ExitCode::SetupFailed;
        }
    }

    if let Err(e) = mark_setup_complete(&dir, SetupOutcome::Completed) {
        eprintln!("setup failed: {e}");
        return ExitCode::SetupFailed;
    }

    println!("Setup complete for {}@{}.", identity.username, identity.hostname);
    ExitCode::Clean
}
