//! Exports the movies a moviepilot.de user has rated into a CSV file.

pub mod config;
pub mod crawler;
pub mod prompt;
pub mod storage;
