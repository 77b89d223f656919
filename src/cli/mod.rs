pub mod actions;
pub mod commands;
pub mod config;
pub mod dispatch;
pub mod start;
pub mod telemetry;

pub use self::start::start;
