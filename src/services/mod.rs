//! Domain services used by the HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own business logic and persistence concerns so route
//! handlers can stay focused on protocol translation and auth plumbing.

pub mod ai;
pub mod analytics;
pub mod auth;
pub mod credential;
pub mod crypto;
pub mod project;
