// handlers/protected/projects/mod.rs - Project (domain) management

use serde::Deserialize;

use crate::error::ApiError;
use crate::services::domain::normalize_domain;
use crate::services::validation::validate_len;

pub mod create; // POST   /api/projects
pub mod delete; // DELETE /api/projects/:id
pub mod list;   // GET    /api/projects
pub mod update; // PATCH  /api/projects/:id

pub use create::project_create;
pub use delete::project_delete;
pub use list::project_list;
pub use update::project_update;

/// `{name, domain}` as accepted by project and audit creation
#[derive(Debug, Deserialize)]
pub struct SiteRequest {
    pub name: String,
    pub domain: String,
}

impl SiteRequest {
    /// Trimmed name and normalized hostname
    pub fn validate(&self) -> Result<(String, String), ApiError> {
        let name = self.name.trim();
        validate_len("name", name, 2, 120)?;
        let domain = self.domain.trim();
        validate_len("domain", domain, 3, 190)?;
        Ok((name.to_string(), normalize_domain(domain)?))
    }
}
