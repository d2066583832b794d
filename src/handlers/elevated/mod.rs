// handlers/elevated/mod.rs - Elevated handlers (SUPER_ADMIN session required)
//
// Security Level: session whose user has role SUPER_ADMIN
// Route Prefix: /api/admin/*, /api/invites
// Middleware: session_auth_middleware → require_super_admin
//
// Anyone else gets the same 401 as an anonymous caller.
pub mod admin;
