use clap::Parser;
use tracing_subscriber::EnvFilter;

use tenant_posture::{cli, config, errors};

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let log_level = if cli.quiet && cli.verbose == 0 { "warn" } else { log_level };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    let logs = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.log_json {
        logs.json().init();
    } else {
        logs.with_ansi(!cli.no_color).init();
    }

    if cli.no_color {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    let result = match cli.command {
        cli::Commands::Collect(args) => cli::collect::handle_collect(args, cli.quiet, !cli.no_color).await,
        cli::Commands::Validate(args) => handle_validate(args).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        let exit_code = match &e {
            errors::AdvisorError::Config(_) => 2,
            errors::AdvisorError::Authentication(_) => 4,
            errors::AdvisorError::Validation(_) => 5,
            _ => 1,
        };
        std::process::exit(exit_code);
    }
}

async fn handle_validate(args: cli::commands::ValidateArgs) -> Result<(), errors::AdvisorError> {
    let path = std::path::PathBuf::from(&args.config);
    let config = config::parse_config(&path).await?;
    let services: Vec<&str> = config.services().iter().map(|s| s.as_str()).collect();
    println!("Configuration is valid: {} (services: {})", args.config, services.join(", "));
    Ok(())
}
