// handlers/protected/auth/mod.rs - Session introspection and sign-out

pub mod session;

pub use session::{session_get, sign_out_post};
