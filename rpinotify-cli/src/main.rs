mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use cli::handlers;

#[derive(Parser)]
#[command(name = "rpinotify")]
#[command(version)]
#[command(about = "Send notifications to the household's registered recipients")]
#[command(
    help_template = "{name} - {version}\n{about}\n\n{usage-heading}\n  {usage}\n\n{all-args}{options}\n"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a notification
    ///
    /// One destination is a username or one of the sentinels `multicast` (every
    /// subscriber of --service) and `broadcast` (everyone, requires --force).
    /// Several destinations are a list of usernames.
    ///
    /// Examples:
    ///   rpinotify notify "Weather" "Rain tomorrow" multicast --service aemet.py
    ///   rpinotify notify "Reboot" "rpi is back" alice bob --service LOG
    ///   rpinotify notify "Maintenance" "Power cut at 9" broadcast --force
    Notify {
        /// Notification title
        title: String,

        /// Notification body
        message: String,

        /// Username(s), `multicast` or `broadcast`
        #[arg(required = true)]
        destinations: Vec<String>,

        /// Calling service: a service name, script name or file path
        #[arg(short, long)]
        service: Option<String>,

        /// Skip the subscription check
        #[arg(long)]
        force: bool,

        /// Path to configuration file
        #[arg(long)]
        config: Option<String>,
    },

    /// List known recipients
    Users {
        /// Path to configuration file
        #[arg(long)]
        config: Option<String>,
    },

    /// List the built-in services
    Services,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Notify {
            title,
            message,
            destinations,
            service,
            force,
            config,
        } => {
            handlers::handle_notify(title, message, destinations, service, force, config).await?;
        }
        Commands::Users { config } => {
            handlers::handle_users(config).await?;
        }
        Commands::Services => {
            handlers::handle_services();
        }
    }

    Ok(())
}
