//! Request handlers, grouped by resource

pub mod admin;
pub mod health;
pub mod proposals;
pub mod rfps;
pub mod scopes;
pub mod stages;
