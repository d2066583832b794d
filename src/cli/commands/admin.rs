use clap::Args;
use serde_json::json;

use crate::auth::password::MIN_PASSWORD_LEN;
use crate::cli::OutputFormat;
use crate::database::DatabaseManager;
use crate::services::accounts::SeedOutcome;
use crate::services::validation::is_valid_email;
use crate::services::AccountService;

#[derive(Args)]
pub struct SeedAdminArgs {
    #[arg(long, env = "SUPER_ADMIN_EMAIL", help = "Super-admin email address")]
    pub email: String,

    #[arg(long, env = "SUPER_ADMIN_PASSWORD", hide_env_values = true, help = "Super-admin password")]
    pub password: String,
}

pub async fn handle(args: SeedAdminArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let email = args.email.trim().to_ascii_lowercase();
    if !is_valid_email(&email) {
        anyhow::bail!("'{}' is not a valid email address", args.email);
    }
    if args.password.chars().count() < MIN_PASSWORD_LEN {
        anyhow::bail!("Password must be at least {} characters", MIN_PASSWORD_LEN);
    }

    let pool = DatabaseManager::pool().await?;
    match AccountService::new(pool).seed_super_admin(&email, &args.password).await? {
        SeedOutcome::Created(user) => output_format.success(
            &format!("Created super-admin {}", user.email),
            Some(json!({ "id": user.id, "email": user.email, "created": true })),
        ),
        SeedOutcome::AlreadyExists => output_format.success(
            &format!("{} already exists, nothing to do", email),
            Some(json!({ "email": email, "created": false })),
        ),
    }
}
