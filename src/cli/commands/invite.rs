use clap::{Subcommand, ValueEnum};
use serde_json::json;

use crate::cli::OutputFormat;
use crate::database::DatabaseManager;
use crate::services::invites::{NewInvite, DEFAULT_EXPIRY_DAYS, MAX_EXPIRY_DAYS};
use crate::services::validation::is_valid_email;
use crate::services::InviteService;
use crate::types::Role;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum InviteRole {
    User,
    SuperAdmin,
}

impl From<InviteRole> for Role {
    fn from(role: InviteRole) -> Self {
        match role {
            InviteRole::User => Role::User,
            InviteRole::SuperAdmin => Role::SuperAdmin,
        }
    }
}

#[derive(Subcommand)]
pub enum InviteCommands {
    #[command(about = "Create a single-use invite token")]
    Create {
        #[arg(long, help = "Restrict the invite to this email")]
        email: Option<String>,

        #[arg(long, help = "Grant the Pro plan on sign-up")]
        pro: bool,

        #[arg(long, value_enum, default_value_t = InviteRole::User, help = "Role granted on sign-up")]
        role: InviteRole,

        #[arg(long, default_value_t = DEFAULT_EXPIRY_DAYS, help = "Days until the invite expires")]
        days: i64,
    },

    #[command(about = "List the newest invites")]
    List {
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
}

pub async fn handle(cmd: InviteCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let pool = DatabaseManager::pool().await?;
    let service = InviteService::new(pool);

    match cmd {
        InviteCommands::Create {
            email,
            pro,
            role,
            days,
        } => {
            if !(1..=MAX_EXPIRY_DAYS).contains(&days) {
                anyhow::bail!("--days must be between 1 and {}", MAX_EXPIRY_DAYS);
            }
            let email = email.map(|e| e.trim().to_ascii_lowercase()).filter(|e| !e.is_empty());
            if let Some(email) = &email {
                if !is_valid_email(email) {
                    anyhow::bail!("'{}' is not a valid email address", email);
                }
            }

            let invite = service
                .create(
                    NewInvite {
                        email,
                        is_pro: pro,
                        role: role.into(),
                        expires_in_days: days,
                    },
                    None,
                )
                .await?;

            output_format.success(
                &format!("Invite {} expires {}", invite.token, invite.expires_at.format("%Y-%m-%d %H:%M")),
                Some(json!({
                    "token": invite.token,
                    "expiresAt": invite.expires_at,
                    "email": invite.email,
                    "isPro": invite.is_pro,
                    "role": invite.role,
                })),
            )
        }
        InviteCommands::List { limit } => {
            let invites = service.list(limit).await?;
            if invites.is_empty() {
                return output_format.empty("invites", "No invites yet");
            }

            match output_format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&json!({ "invites": invites }))?);
                }
                OutputFormat::Text => {
                    println!("{:<66} {:<28} {:<5} {:<17} {}", "TOKEN", "EMAIL", "PRO", "EXPIRES", "USED");
                    println!("{}", "-".repeat(125));
                    for invite in &invites {
                        println!(
                            "{:<66} {:<28} {:<5} {:<17} {}",
                            invite.token,
                            invite.email.as_deref().unwrap_or("-"),
                            if invite.is_pro { "yes" } else { "no" },
                            invite.expires_at.format("%Y-%m-%d %H:%M"),
                            if invite.used_at.is_some() { "yes" } else { "no" }
                        );
                    }
                }
            }
            Ok(())
        }
    }
}
