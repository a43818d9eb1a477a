//! Playback relay - command submission, relay process and operator tools.

mod app;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use command_store::UserRole;
use playback_protocol_types::CommandType;
use relay_config_and_utils::{init_logging, Config, Paths};

/// Playback relay command-line interface.
#[derive(Parser)]
#[command(name = "playback-relay")]
#[command(about = "Relay remote playback commands into a video page")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error). Overrides the config file.
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Base directory for config, database, relay state and logs. Defaults to ~/.playback-relay
    #[arg(long, global = true, env = "PLAYBACK_RELAY_BASE_DIR")]
    base_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the relay against the local command log and an in-process demo page
    Relay,
    /// Submit a playback command
    Submit {
        /// Email claim of the submitting identity
        #[arg(long)]
        email: String,
        /// Identity provider subject id. Defaults to the email
        #[arg(long)]
        subject: Option<String>,
        /// Display name recorded when the user is first seen
        #[arg(long)]
        name: Option<String>,
        /// play, pause, seekForward, seekBackward, speedUp or speedDown
        #[arg(long = "type", value_name = "TYPE")]
        command_type: CommandType,
        /// Seconds for seeks, rate delta for speed changes
        #[arg(long, allow_negative_numbers = true)]
        amount: Option<f64>,
        /// Keep watching until the command is executed or the indicator hides
        #[arg(long)]
        follow: bool,
    },
    /// List the most recent commands, newest first
    Recent {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Acknowledge a command by id
    Ack { id: String },
    /// Change a user's role
    SetRole { email: String, role: RoleArg },
    /// Watch the pending/executed indicator for the newest command
    Feedback,
    /// Print the relay's persisted state
    State,
}

#[derive(Clone, Copy, ValueEnum)]
enum RoleArg {
    Restricted,
    User,
    Admin,
}

impl From<RoleArg> for UserRole {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Restricted => UserRole::Restricted,
            RoleArg::User => UserRole::User,
            RoleArg::Admin => UserRole::Admin,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let paths = match cli.base_dir {
        Some(base) => Paths::with_base_dir(base),
        None => Paths::new()?,
    };
    let config = Config::load(&paths)?;

    let is_relay = matches!(cli.command, Commands::Relay);
    let level = cli.log_level.as_deref().unwrap_or(&config.log_level);
    init_logging(if is_relay { "relay" } else { "cli" }, level, &paths, is_relay)?;

    match cli.command {
        Commands::Relay => app::run_relay(config, paths).await?,
        Commands::Submit {
            email,
            subject,
            name,
            command_type,
            amount,
            follow,
        } => {
            let identity = app::identity(email, subject, name);
            app::submit(&config, &paths, identity, command_type, amount, follow).await?
        }
        Commands::Recent { limit } => app::recent(&paths, limit).await?,
        Commands::Ack { id } => app::ack(&paths, &id).await?,
        Commands::SetRole { email, role } => app::set_role(&paths, &email, role.into()).await?,
        Commands::Feedback => app::watch_feedback(&config, &paths).await?,
        Commands::State => app::print_state(&paths)?,
    }

    Ok(())
}
