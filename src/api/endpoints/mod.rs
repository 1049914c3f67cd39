//! API endpoint handlers.

pub mod demo;
pub mod health;
pub mod rules;
pub mod triage;
