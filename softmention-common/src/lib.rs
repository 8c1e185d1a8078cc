//! # Software Mention Hub Common Library
//!
//! Shared code for the software mention services:
//! - Error type used by storage and configuration code
//! - Root folder and TOML configuration resolution
//! - SQLite schema initialization and stored models

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
