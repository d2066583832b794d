use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub plans: PlanConfig,
    pub oauth: OAuthConfig,
    pub admin: AdminConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub enable_request_logging: bool,
    pub max_request_size_bytes: usize,
    /// Overall deadline for reaching a domain during verification
    pub verification_timeout_secs: u64,
}

/// How a signed-in client is identified on later requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStrategy {
    /// Opaque token stored in the `sessions` table
    Database,
    /// Stateless HS256 token carrying the user's claims
    Jwt,
}

impl SessionStrategy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "database" | "db" => Some(SessionStrategy::Database),
            "jwt" => Some(SessionStrategy::Jwt),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
    pub require_https: bool,
    pub jwt_secret: String,
    pub session_strategy: SessionStrategy,
    pub session_ttl_hours: u64,
    pub session_cache_ttl_secs: u64,
    pub bcrypt_cost: u32,
    /// Public origin of the app, used for OAuth redirects and cookie flags
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanConfig {
    pub free_max_projects: i64,
    pub free_audits_per_week: i64,
    pub free_pages_per_crawl: i32,
    pub pro_pages_per_crawl: i32,
    pub free_max_active_audits: i64,
    pub pro_max_active_audits: i64,
    pub audit_cooldown_secs: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthConfig {
    pub google_client_id: Option<String>,
    pub google_client_secret: Option<String>,
    pub google_auth_url: String,
    pub google_token_url: String,
    pub google_userinfo_url: String,
}

impl OAuthConfig {
    pub fn google_enabled(&self) -> bool {
        matches!(
            (&self.google_client_id, &self.google_client_secret),
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty()
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    pub super_admin_email: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Database overrides
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("DATABASE_RUN_MIGRATIONS") {
            self.database.run_migrations = v.parse().unwrap_or(self.database.run_migrations);
        }

        // API overrides
        if let Ok(v) = env::var("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }
        if let Ok(v) = env::var("API_VERIFICATION_TIMEOUT_SECS") {
            self.api.verification_timeout_secs = v.parse().unwrap_or(self.api.verification_timeout_secs);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(v) = env::var("SECURITY_REQUIRE_HTTPS") {
            self.security.require_https = v.parse().unwrap_or(self.security.require_https);
        }
        if let Ok(v) = env::var("AUTH_SECRET").or_else(|_| env::var("JWT_SECRET")) {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("AUTH_SESSION_STRATEGY") {
            self.security.session_strategy =
                SessionStrategy::parse(&v).unwrap_or(self.security.session_strategy);
        }
        if let Ok(v) = env::var("AUTH_SESSION_TTL_HOURS") {
            self.security.session_ttl_hours = v.parse().unwrap_or(self.security.session_ttl_hours);
        }
        if let Ok(v) = env::var("SESSION_CACHE_TTL_SECS") {
            self.security.session_cache_ttl_secs = v.parse().unwrap_or(self.security.session_cache_ttl_secs);
        }
        if let Ok(v) = env::var("BCRYPT_COST") {
            self.security.bcrypt_cost = v.parse().unwrap_or(self.security.bcrypt_cost);
        }
        if let Ok(v) = env::var("BASE_URL") {
            self.security.base_url = v.trim_end_matches('/').to_string();
        }

        // Plan overrides
        if let Ok(v) = env::var("PLAN_FREE_MAX_PROJECTS") {
            self.plans.free_max_projects = v.parse().unwrap_or(self.plans.free_max_projects);
        }
        if let Ok(v) = env::var("PLAN_FREE_AUDITS_PER_WEEK") {
            self.plans.free_audits_per_week = v.parse().unwrap_or(self.plans.free_audits_per_week);
        }
        if let Ok(v) = env::var("PLAN_FREE_PAGES_PER_CRAWL") {
            self.plans.free_pages_per_crawl = v.parse().unwrap_or(self.plans.free_pages_per_crawl);
        }
        if let Ok(v) = env::var("PLAN_PRO_PAGES_PER_CRAWL") {
            self.plans.pro_pages_per_crawl = v.parse().unwrap_or(self.plans.pro_pages_per_crawl);
        }
        if let Ok(v) = env::var("PLAN_FREE_MAX_ACTIVE_AUDITS") {
            self.plans.free_max_active_audits = v.parse().unwrap_or(self.plans.free_max_active_audits);
        }
        if let Ok(v) = env::var("PLAN_PRO_MAX_ACTIVE_AUDITS") {
            self.plans.pro_max_active_audits = v.parse().unwrap_or(self.plans.pro_max_active_audits);
        }
        if let Ok(v) = env::var("PLAN_AUDIT_COOLDOWN_SECS") {
            self.plans.audit_cooldown_secs = v.parse().unwrap_or(self.plans.audit_cooldown_secs);
        }

        // OAuth overrides
        if let Ok(v) = env::var("GOOGLE_CLIENT_ID") {
            self.oauth.google_client_id = Some(v);
        }
        if let Ok(v) = env::var("GOOGLE_CLIENT_SECRET") {
            self.oauth.google_client_secret = Some(v);
        }

        if let Ok(v) = env::var("SUPER_ADMIN_EMAIL") {
            self.admin.super_admin_email = v;
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                max_connections: 10,
                connection_timeout: 30,
                run_migrations: true,
            },
            api: ApiConfig {
                enable_request_logging: true,
                max_request_size_bytes: 2 * 1024 * 1024, // 2MB
                verification_timeout_secs: 8,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
                require_https: false,
                jwt_secret: "development-only-secret-change-me".to_string(),
                session_strategy: SessionStrategy::Database,
                session_ttl_hours: 24 * 30,
                session_cache_ttl_secs: 30,
                bcrypt_cost: 12,
                base_url: "http://localhost:3000".to_string(),
            },
            plans: PlanConfig::standard(),
            oauth: OAuthConfig::google_defaults(),
            admin: AdminConfig {
                super_admin_email: "your-admin@domain.com".to_string(),
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                max_connections: 20,
                connection_timeout: 10,
                run_migrations: true,
            },
            api: ApiConfig {
                enable_request_logging: true,
                max_request_size_bytes: 1024 * 1024, // 1MB
                verification_timeout_secs: 8,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
                require_https: true,
                jwt_secret: String::new(),
                session_strategy: SessionStrategy::Database,
                session_ttl_hours: 24 * 30,
                session_cache_ttl_secs: 30,
                bcrypt_cost: 12,
                base_url: "https://staging.example.com".to_string(),
            },
            plans: PlanConfig::standard(),
            oauth: OAuthConfig::google_defaults(),
            admin: AdminConfig {
                super_admin_email: "your-admin@domain.com".to_string(),
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                max_connections: 50,
                connection_timeout: 5,
                run_migrations: false,
            },
            api: ApiConfig {
                enable_request_logging: false,
                max_request_size_bytes: 1024 * 1024, // 1MB
                verification_timeout_secs: 8,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://app.example.com".to_string()],
                require_https: true,
                jwt_secret: String::new(),
                session_strategy: SessionStrategy::Database,
                session_ttl_hours: 24 * 30,
                session_cache_ttl_secs: 60,
                bcrypt_cost: 12,
                base_url: "https://app.example.com".to_string(),
            },
            plans: PlanConfig::standard(),
            oauth: OAuthConfig::google_defaults(),
            admin: AdminConfig {
                super_admin_email: "your-admin@domain.com".to_string(),
            },
        }
    }
}

impl PlanConfig {
    fn standard() -> Self {
        Self {
            free_max_projects: 1,
            free_audits_per_week: 1,
            free_pages_per_crawl: 10,
            pro_pages_per_crawl: 100,
            free_max_active_audits: 1,
            pro_max_active_audits: 3,
            audit_cooldown_secs: 60,
        }
    }
}

impl OAuthConfig {
    fn google_defaults() -> Self {
        Self {
            google_client_id: None,
            google_client_secret: None,
            google_auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            google_token_url: "https://oauth2.googleapis.com/token".to_string(),
            google_userinfo_url: "https://openidconnect.googleapis.com/v1/userinfo".to_string(),
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_production {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Production)
    };
}
