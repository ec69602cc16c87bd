pub mod cli;
pub mod config;
pub mod error;
pub mod init;
pub mod models;
pub mod services;
pub mod state;

pub use error::DebriefError;
