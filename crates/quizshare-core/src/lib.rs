//! quizshare-core - Core library for QuizShare
//!
//! This crate contains the quiz models, the local record store, the LAN server
//! and cloud sync clients, and the sharing service used by the CLI.

pub mod analytics;
pub mod config;
pub mod db;
pub mod error;
pub mod lan;
pub mod models;
pub mod session;
pub mod sharing;
pub mod state;
pub mod sync;
pub mod util;

pub use error::{Error, ErrorKind, Result};
pub use models::{QuizId, QuizRecord};
