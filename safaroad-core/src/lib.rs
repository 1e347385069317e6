//! Safaroad library
//!
//! Local-first state engine for community road-incident reporting:
//! incidents, offline drafts, notifications, the action log and the
//! small user/chat directory, all persisted as JSON under named keys.

pub mod app;
pub mod config;
pub mod context;
pub mod database;
pub mod error;
pub mod geo;
pub mod logging;
pub mod services;
pub mod storage;

pub use app::AppState;
pub use error::{AppError, Result};
