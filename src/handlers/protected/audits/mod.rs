// handlers/protected/audits/mod.rs - Audit queueing, status polling and result views

pub mod create;   // POST /api/audits
pub mod issues;   // GET  /api/audits/:id/issues
pub mod list;     // GET  /api/audits
pub mod off_page; // GET  /api/audits/:id/off-page
pub mod overview; // GET  /api/audits/:id/overview
pub mod retry;    // POST /api/audits/:id/retry
pub mod show;     // GET  /api/audits/:id

pub use create::audit_create;
pub use issues::audit_issues;
pub use list::audit_list;
pub use off_page::audit_off_page;
pub use overview::audit_overview;
pub use retry::audit_retry;
pub use show::audit_show;

/// Page size of the audit list
pub const AUDIT_LIST_LIMIT: i64 = 50;
