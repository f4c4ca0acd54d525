pub mod client;
pub mod config;
pub mod driver;
pub mod error;
pub mod report;
pub mod session;
pub mod targets;
pub mod transform;

#[cfg(test)]
mod mock;
