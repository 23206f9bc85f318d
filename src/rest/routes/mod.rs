//! Route handlers for the REST API.

pub mod actions;
pub mod health;
pub mod processes;
pub mod queue;
