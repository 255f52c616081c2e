// src/config/mod.rs
pub mod prompts;
pub mod settings;

pub use settings::Settings;
