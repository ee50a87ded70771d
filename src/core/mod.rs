pub mod config;
pub mod error;
pub mod types;

pub use config::SolverConfig;
pub use error::{Result, SolverError};
pub use types::{ColorMap, Grid, TrainingPair};
