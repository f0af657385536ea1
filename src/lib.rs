// This lib.rs file exposes modules for testing purposes

// Re-export modules needed for tests
pub mod ai_client;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod errors;
pub mod gui;
pub mod online_commands;
pub mod report;
pub mod review_commands;
pub mod runner;
pub mod source_scan;
pub mod svn_commands;
pub mod svn_parse;
pub mod types;
