use clap::{Parser, Subcommand};
use scriptbridge::{
    commands::{
        config::{self, ConfigAction},
        eval, languages, run,
    },
    common::GlobalOpts,
};
use scriptbridge_logger as logger;
use std::io::Write;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "scriptbridge")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "Run scripts through pluggable scripting engines",
    long_about = "scriptbridge runs scripts through language engines that share a registry of host objects (beans)."
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOpts,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a script file
    Run(run::RunCommand),
    /// Evaluate an expression and print its value
    Eval(eval::EvalCommand),
    /// List registered languages and their file extensions
    Languages,
    /// Configure scriptbridge
    #[command(subcommand_required = false, arg_required_else_help = false)]
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logger::verbosity_to_filter()));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(std::io::stderr),
        )
        .try_init();
}

fn fail(context: &str, err: &anyhow::Error) -> ! {
    logger::error(&format!("{} failed: {:#}", context, err));
    if logger::get_verbosity() > 0 {
        logger::show_log_path();
    }
    let _ = std::io::stdout().flush();
    std::process::exit(1);
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = logger::init_with_verbosity(cli.global.verbosity_level(), cli.global.no_stdout) {
        eprintln!("Warning: Failed to initialize logger: {}", e);
    }
    init_tracing();

    match cli.command {
        Commands::Run(cmd) => {
            if let Err(e) = run::handle_run(cmd, &cli.global) {
                fail("Run command", &e);
            }
        }
        Commands::Eval(cmd) => {
            if let Err(e) = eval::handle_eval(cmd, &cli.global) {
                fail("Eval command", &e);
            }
        }
        Commands::Languages => {
            if let Err(e) = languages::handle_languages(&cli.global) {
                fail("Languages command", &e);
            }
        }
        Commands::Config { action } => {
            if let Err(e) = config::handle_config(action, &cli.global) {
                fail("Config command", &e);
            }
        }
    }
}
