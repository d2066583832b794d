use clap::Subcommand;
use serde_json::json;

use crate::cli::OutputFormat;
use crate::database::DatabaseManager;
use crate::services::AccountService;

#[derive(Subcommand)]
pub enum SignupCommands {
    #[command(about = "Allow sign-up without an invite")]
    Enable,

    #[command(about = "Require an invite to sign up")]
    Disable,

    #[command(about = "Show whether signup is open")]
    Status,
}

pub async fn handle(cmd: SignupCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let pool = DatabaseManager::pool().await?;
    let service = AccountService::new(pool);

    let settings = match cmd {
        SignupCommands::Enable => service.set_allow_signup(true).await?,
        SignupCommands::Disable => service.set_allow_signup(false).await?,
        SignupCommands::Status => service.system_settings().await?,
    };

    let message = if settings.allow_signup {
        "Signup is open"
    } else {
        "Signup is invite-only"
    };
    output_format.success(
        message,
        Some(json!({ "allowSignup": settings.allow_signup, "updatedAt": settings.updated_at })),
    )
}
