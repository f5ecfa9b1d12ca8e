pub mod cloud;
pub mod common;
pub mod completions;
pub mod list;
pub mod search;
pub mod server;
pub mod share;
pub mod start;
pub mod status;
pub mod user;
