// handlers/public/auth/mod.rs - Account creation and session acquisition

pub mod invite;    // GET  /auth/invites/:token
pub mod oauth;     // GET  /auth/oauth/google[/callback]
pub mod providers; // GET  /auth/providers
pub mod register;  // POST /auth/register
pub mod sign_in;   // POST /auth/sign-in

pub use invite::invite_get;
pub use oauth::{google_callback, google_start};
pub use providers::providers_get;
pub use register::register_post;
pub use sign_in::sign_in_post;
