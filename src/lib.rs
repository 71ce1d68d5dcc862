#![allow(clippy::uninlined_format_args)]

pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod data;
pub mod feed;
pub mod fetch;
pub mod http;
pub mod interaction;
pub mod onboarding;
pub mod registration;
pub mod sentinel;
pub mod storage;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use app::{run, RunOptions};
