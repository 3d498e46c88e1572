//! Alime - media dubbing backend
//!
//! Accepts media uploads, transcribes them, translates and voices the
//! transcripts, and exports videos through a trim, caption and speech
//! pipeline. Every stage runs an external python script or ffmpeg.

pub mod artifact;
pub mod audio;
pub mod cli;
pub mod config;
pub mod error;
pub mod media;
pub mod models;
pub mod runner;
pub mod server;
pub mod speech;
pub mod store;
pub mod subtitle;
pub mod transcribe;
pub mod translate;
pub mod uploads;
pub mod workflow;

pub use config::Config;
pub use error::{AlimeError, Result};
pub use runner::{ProcessRunner, SystemRunner};
pub use server::{create_router, AppState};
pub use store::Store;
pub use workflow::Workflow;
