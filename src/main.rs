//! hostwarden - remote administration console for a single Linux host
//!
//! Runs the alert engine and exposes the operator actions (firewall, units,
//! logs, updates, shell) on the command line.

use clap::Parser;
use hostwarden::cli::args::{generate_completions, Cli, Commands};
use hostwarden::commands::{
    run_admins, run_alerts, run_backup, run_console, run_daemon, run_docker, run_exec,
    run_firewall, run_logs, run_service, run_status, run_updates, AppContext,
};
use hostwarden::error::{AppError, ConfigError, DomainError};

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // The daemon logs its lifecycle; one-shot commands stay quiet
    let default_filter = if matches!(cli.command, Commands::Run) {
        "info"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_secs()
        .init();

    // Set log level based on verbose flag
    if cli.verbose {
        log::set_max_level(log::LevelFilter::Debug);
    }

    let result = run(&cli).await;

    if let Err(e) = result {
        log::error!("{}", e);
        print_error(&e);
        std::process::exit(1);
    }
}

async fn run(cli: &Cli) -> Result<(), AppError> {
    if let Commands::Completions { shell } = &cli.command {
        generate_completions(*shell);
        return Ok(());
    }

    let ctx = AppContext::load(cli).await?;

    match &cli.command {
        Commands::Run => run_daemon(&ctx).await,

        Commands::Status => run_status(&ctx, cli.format).await,

        Commands::Exec { command } => run_exec(&ctx, command).await,

        Commands::Alerts(args) => run_alerts(&ctx, &args.command, cli.format).await,

        Commands::Admins(args) => run_admins(&ctx, &args.command, cli.format).await,

        Commands::Firewall(args) => run_firewall(&ctx, &args.command).await,

        Commands::Service { name, action } => run_service(&ctx, name, *action).await,

        Commands::Logs(args) => run_logs(&ctx, &args.command).await,

        Commands::Updates { action } => run_updates(&ctx, *action).await,

        Commands::Docker(args) => run_docker(&ctx, &args.command).await,

        Commands::Backup(args) => run_backup(&ctx, &args.command, cli.format).await,

        Commands::Console(args) => run_console(&ctx, args).await,

        Commands::Completions { .. } => Ok(()),
    }
}

fn print_error(err: &AppError) {
    eprintln!("Error: {}", err);

    // Print helpful hints for common errors
    match err {
        AppError::NoAdmins => {
            eprintln!();
            eprintln!("Hint: Set admin ids with --admin-ids, HOSTWARDEN_ADMIN_IDS");
            eprintln!("      or `admin_ids` in the [access] section of the config file.");
        }
        AppError::NoDestination => {
            eprintln!();
            eprintln!("Hint: Register a destination with `hostwarden alerts destination <chat-id>`.");
        }
        AppError::Config(ConfigError::Persist { .. }) => {
            eprintln!();
            eprintln!("Hint: Check that the state directory is writable, or pass --state.");
        }
        AppError::Domain(DomainError::UnsupportedPackageManager) => {
            eprintln!();
            eprintln!("Hint: Supported managers are apt, dnf, yum, pacman and zypper.");
        }
        AppError::Domain(DomainError::NoComposeProject) => {
            eprintln!();
            eprintln!("Hint: Choose a project with `hostwarden docker compose-set <path>`.");
        }
        _ => {}
    }
}
