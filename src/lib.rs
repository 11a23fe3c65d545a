pub mod agent;
pub mod collectors;
pub mod config;
pub mod errors;
pub mod logging;
pub mod rate;
pub mod reporter;
pub mod snapshot;
pub mod wire;
