// handlers/protected/settings/mod.rs - Profile, branding, notifications, password and API key

pub mod api_key;  // POST /api/settings/api-key
pub mod password; // POST /api/settings/password
pub mod general;  // GET|PUT /api/settings

pub use api_key::api_key_post;
pub use password::password_post;
pub use general::{settings_get, settings_put};
