// handlers/mod.rs - 3-tier handler layout
//
// Public (no session) → Protected (session required) → Elevated (SUPER_ADMIN session)
//
// Each tier is a directory of route groups; each route group keeps one file per
// operation. Routing and middleware layering live in `app.rs`.
pub mod public;    // Tier 1: /auth/* (sign-up, sign-in, OAuth, invite preview)
pub mod protected; // Tier 2: /api/* (projects, audits, reports, settings, views)
pub mod elevated;  // Tier 3: /api/admin/*, /api/invites (super-admin console)
