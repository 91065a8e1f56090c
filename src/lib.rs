pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod excel;
pub mod logging;
pub mod models;
pub mod services;
pub mod types;

pub use error::{EngineError, EngineResult, LocatorError};
pub use excel::TemplateEngine;
pub use logging::{LogHub, RunLog};
