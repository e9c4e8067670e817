pub mod bootstrap;
pub mod config;
pub mod detector;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod history;
pub mod hub;
pub mod market;
pub mod registry;
pub mod time;
