pub mod auth;
pub mod payload;
pub mod response;

pub use auth::{require_super_admin, session_auth_middleware, AuthUser};
pub use payload::Payload;
pub use response::{ApiResponse, ApiResult};
