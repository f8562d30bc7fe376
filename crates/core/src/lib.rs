#![forbid(unsafe_code)]

pub mod config;
pub mod model;
pub mod search;
pub mod session;
pub mod time;

pub use config::EngineConfig;
pub use time::Clock;
