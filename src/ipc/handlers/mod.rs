pub mod catalog;
pub mod config;
pub mod core;
pub mod directory;
pub mod session;
pub mod transcripts;
