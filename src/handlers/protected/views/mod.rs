// handlers/protected/views/mod.rs - Read-only page data (dashboard, history, plans, summaries)

pub mod dashboard; // GET /api/dashboard
pub mod history;   // GET /api/history, /api/history/compare
pub mod plans;     // GET /api/plans
pub mod summary;   // GET /api/issues/summary, /api/overview/latest

pub use dashboard::dashboard_get;
pub use history::{history_compare, history_get};
pub use plans::plans_get;
pub use summary::{issue_summary_get, latest_audit_get};
