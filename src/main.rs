use clap::Parser;

use mirrorwatch::Settings;
use mirrorwatch::cli::commands::{config, watch};
use mirrorwatch::cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    };
    let settings = loaded.unwrap_or_else(|e| {
        eprintln!("Configuration error: {e}");
        eprintln!("Using default configuration for now.");
        Settings::default()
    });

    mirrorwatch::logging::init_with_config(&settings.logging);

    let result = match cli.command {
        Commands::Init { force } => config::run_init(force),
        Commands::Config => config::run_config(&settings),
        Commands::Watch(args) => {
            // Usage errors exit with clap's status 2
            let pairs = args.pairs().unwrap_or_else(|e| e.exit());
            let endpoint = args.endpoint_or(&settings.notify.endpoint);
            watch::run_watch(pairs, endpoint, &settings).await
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
