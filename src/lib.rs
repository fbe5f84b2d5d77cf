pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod members;
pub mod memory;
pub mod orders;
pub mod state;
