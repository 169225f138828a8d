//! Study session core.
//!
//! Drives a content item from submission through grounded Q&A, and serves
//! chapter resources either live from the backend or replayed from history.

pub mod citation;
pub mod conversation;
pub mod error;
pub mod expander;
pub mod history;
pub mod input;
pub mod orchestrator;
pub mod state_machine;

pub use citation::{extract_video_id, resolve, timestamp_url, PDF_PAGE_INDEX_OFFSET};
pub use conversation::{greeting, Conversation, ASK_ERROR_MESSAGE};
pub use error::SessionError;
pub use expander::{ExpanderView, CHAPTER_NOT_FOUND_MESSAGE};
pub use history::HistoryList;
pub use input::{ScanInput, StagedInput};
pub use orchestrator::{SessionOrchestrator, SessionSnapshot};
pub use state_machine::{validate_transition, ScanState};
