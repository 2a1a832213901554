use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "keepsake", version, about = "Keepsake: messages that unlock day by day")]
struct Cli {
    /// Data directory (defaults to ~/.config/keepsake)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Log filter, e.g. "warn" or "keepsake_core=debug"
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile today's unlocks and show the board
    Visit(commands::visit::VisitArgs),
    /// Open a message by id
    Open(commands::open::OpenArgs),
    /// Schedule inspection
    Schedule {
        #[command(subcommand)]
        action: commands::schedule::ScheduleAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let result = commands::Context::resolve(cli.data_dir).and_then(|ctx| match cli.command {
        Commands::Visit(args) => commands::visit::run(&ctx, args),
        Commands::Open(args) => commands::open::run(&ctx, args),
        Commands::Schedule { action } => commands::schedule::run(&ctx, action),
        Commands::Config { action } => commands::config::run(&ctx, action),
    });

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
