// handlers/public/mod.rs - Public handlers (no session required)
//
// Security Level: None
// Route Prefix: /auth/*
// Middleware: None. Every input is validated before it reaches a service.
pub mod auth;
