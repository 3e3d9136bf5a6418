//! docvault library
//!
//! Client core of a document-management app: login, upload, tag lookup,
//! search with pagination, and downloads. The `docvault` binary is a thin
//! command-line shell over this library.

pub mod app;
pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod remote;
pub mod services;
pub mod storage;

pub use app::{AppContext, SessionContext};
pub use config::ClientConfig;
pub use error::{AppError, Result};
