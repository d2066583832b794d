pub mod audit;
pub mod invite;
pub mod issue;
pub mod project;
pub mod report;
pub mod settings;
pub mod user;

pub use audit::{Audit, AuditListing};
pub use invite::InviteToken;
pub use issue::Issue;
pub use project::{LastAudit, Project};
pub use report::{Report, ReportListing};
pub use settings::{SystemSettings, UserSettings};
pub use user::{User, UserSummary};
