//! Virtual try-on request pipeline: ingest images, build the multi-part
//! request, call the image model once, and track the session state the
//! display layer renders.

pub mod client;
pub mod config;
pub mod controller;
pub mod error;
pub mod gemini;
pub mod ingest;
pub mod session;

pub use client::{first_inline_image, GeneratedImage, GenerationClient};
pub use config::{EngineConfig, DEFAULT_API_BASE, DEFAULT_IMAGE_MODEL};
pub use controller::TryOnController;
pub use error::{ConfigError, TriggerRejected, TryOnError};
pub use gemini::GeminiClient;
pub use ingest::{ingest, ImageSource};
pub use session::{Outcome, Session, Status};

/// Fresh identifier for a session's event log.
pub fn new_session_id() -> String {
    format!("session-{}", uuid::Uuid::new_v4().simple())
}
