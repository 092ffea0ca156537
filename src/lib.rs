//! # Tasky
//!
//! A personal task manager: tasks with priority, category, deadline, notes and a
//! checklist of subtasks, kept in a local key-value store.
//!
//! The library holds the pure pieces the `tasky` binary is built from:
//!
//! - [`store`]: the task collection and its mutations
//! - [`query`]: search, category and status filters plus sorting
//! - [`stats`]: dashboard counters
//! - [`calendar`]: deadline buckets, month grids and week strips
//! - [`transfer`]: JSON/CSV import with validation, JSON/CSV/TXT export, backups
//! - [`storage`]: the key-value persistence boundary
//! - [`app`]: a session that writes every change through to storage

pub mod app;
pub mod calendar;
pub mod cli;
pub mod cmd;
pub mod config;
pub mod dates;
pub mod error;
pub mod fields;
pub mod query;
pub mod stats;
pub mod storage;
pub mod store;
pub mod task;
pub mod transfer;

pub use error::{Error, Result};
