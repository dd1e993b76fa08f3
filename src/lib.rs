pub mod agent;
pub mod api;
pub mod cli;
pub mod cluster;
pub mod config;
pub mod error;
pub mod record;
pub mod settings;
pub mod storage;
