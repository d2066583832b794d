pub mod admin;
pub mod invite;
pub mod migrate;
pub mod signup;
