pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "cascade")]
#[command(about = "Cascade CLI - operator commands for the Cascade SEO database")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Apply pending database migrations")]
    Migrate,

    #[command(about = "Create the first super-admin (idempotent)")]
    SeedAdmin(commands::admin::SeedAdminArgs),

    #[command(about = "Invite token management")]
    Invite {
        #[command(subcommand)]
        cmd: commands::invite::InviteCommands,
    },

    #[command(about = "Open or close self-service signup")]
    Signup {
        #[command(subcommand)]
        cmd: commands::signup::SignupCommands,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Migrate => commands::migrate::handle(output_format).await,
        Commands::SeedAdmin(args) => commands::admin::handle(args, output_format).await,
        Commands::Invite { cmd } => commands::invite::handle(cmd, output_format).await,
        Commands::Signup { cmd } => commands::signup::handle(cmd, output_format).await,
    }
}
