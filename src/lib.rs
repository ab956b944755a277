pub mod config;
pub mod database;
pub mod error;
pub mod export;
pub mod models;
pub mod service;

pub use error::{Error, Result};
pub use models::{Outcome, Question, ReviewEvent, ReviewSession};
pub use service::ReviewService;
