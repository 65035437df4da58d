pub mod auth;
pub mod clipboard;
pub mod config;
pub mod dashboard;
pub mod errors;
pub mod filter;
pub mod form;
pub mod logging;
pub mod storage;
pub mod store;
pub mod tui;
pub mod upload;
