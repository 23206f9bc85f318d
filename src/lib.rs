//! Backoffice - workflow console for a coworking-space CRM
//!
//! Library half of the `backoffice` binary: the typed workflow engine
//! (actions, dispatcher, decision records, queues, timelines), the
//! backend client it drives, the terminal console and the REST facade.

pub mod app;
pub mod backend;
pub mod config;
pub mod context;
pub mod logging;
pub mod process;
pub mod rest;
pub mod ui;
