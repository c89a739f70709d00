//! HTTP boundary of the Burrow URL shortener.

pub mod app;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod model;
pub mod state;
pub mod telemetry;

pub use app::App;
pub use identity::{Identity, TokenSigner};
pub use state::AppState;
