pub mod api;
pub mod app;
pub mod cli;
pub mod config;
pub mod db;
pub mod flow;
pub mod global;
pub mod provision;
pub mod reconnect;
pub mod session;
pub mod store;
pub mod transcript;
