pub mod config;
pub mod errors;
pub mod mistral;
pub mod routes;
pub mod state;
pub mod tts;
pub mod utils;

pub use config::Config;
pub use errors::{AppError, AppResult};
pub use state::AppState;
