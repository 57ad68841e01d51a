pub mod audio;
pub mod config;
pub mod error;
pub mod queue;
pub mod session;
pub mod settings;
pub mod sink;
pub mod tone;
pub mod utils;
