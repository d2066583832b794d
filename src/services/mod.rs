//! Business rules for accounts, projects, audits and the views built on them.
//!
//! Services own a `PgPool` and return their own error enums, each of which
//! converts into `ApiError` so handlers can use `?` directly.

pub mod accounts;
pub mod audits;
pub mod dashboard;
pub mod domain;
pub mod insights;
pub mod invites;
pub mod plan;
pub mod projects;
pub mod reports;
pub mod settings;
pub mod validation;

pub use accounts::{AccountError, AccountService};
pub use audits::{AuditError, AuditService};
pub use dashboard::DashboardService;
pub use insights::InsightService;
pub use invites::InviteService;
pub use plan::{PlanLimits, PlanViolation};
pub use projects::{ProjectError, ProjectService};
pub use reports::{ReportError, ReportService};
pub use settings::SettingsService;
