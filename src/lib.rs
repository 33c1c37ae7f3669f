//! Video synthesis jobs against the Gemini API.
//!
//! A [`GeminiClient`] turns [`GenerationSettings`] into a long-running Veo
//! operation, polls it, downloads the finished clip and, when asked, adds a
//! spoken narration track. Failures surface as a [`LuminaError`] whose
//! [`ErrorKind`] is stable enough for a UI to branch on.

pub mod config;
pub mod credentials;
pub mod error;
pub mod gemini;
pub mod logger;
pub mod models;

pub use config::GeminiConfig;
pub use credentials::{
    Credential, CredentialResolver, EnvCredentialResolver, FnCredentialResolver,
    StaticCredentialResolver,
};
pub use error::{ErrorKind, LuminaError, Result};
pub use gemini::{
    CancelToken, GeminiClient, GeminiHttpBackend, PollState, ProgressReporter, RequestBuilder,
    VideoJob, VideoOutput,
};
pub use models::*;
