// handlers/protected/mod.rs - Protected handlers (session required)
//
// Security Level: signed-in, non-disabled user
// Route Prefix: /api/*
// Middleware: session_auth_middleware injects `AuthUser`
//
// Every record lookup is scoped to the caller, so another user's id is a 404.
pub mod audits;
pub mod auth;
pub mod projects;
pub mod reports;
pub mod settings;
pub mod views;
