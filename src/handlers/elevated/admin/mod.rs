// handlers/elevated/admin/mod.rs - Super-admin console

pub mod invites;         // GET|POST /api/invites
pub mod overview;        // GET      /api/admin/overview
pub mod system_settings; // GET|PUT  /api/admin/system-settings
pub mod users;           // GET|POST /api/admin/users, PATCH /api/admin/users/:id

pub use invites::{invite_create, invite_list};
pub use overview::overview_get;
pub use system_settings::{system_settings_get, system_settings_put};
pub use users::{user_create, user_list, user_update};
