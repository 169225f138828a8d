pub mod backend;
pub mod config;
pub mod error;
pub mod types;

pub use backend::{
    BackendError, ContentViewer, CredentialProvider, HistoryStore, StaticCredentials, StudyBackend,
    GENERIC_ERROR_MESSAGE,
};
pub use config::TutorConfig;
pub use error::{Result, TutorError};
pub use types::*;
