//! Chapter and resource display state.
//!
//! Tracks the displayed outline and bundle for both the live path and the
//! history replay path, plus the loading flag and error slot they share.
//! Every request takes a ticket for its stage. A newer request of the same
//! stage supersedes it; requests of other stages are unaffected.

use serde::Serialize;

use tutor_core::types::{ChapterOutline, HistoryRecord, ResourceBundle};

use crate::error::SessionError;

pub const CHAPTER_NOT_FOUND_MESSAGE: &str = "Chapter not found in history.";

/// Kind of request a ticket belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Topic and level to chapter outline.
    Outline,
    /// One chapter to its resource bundle.
    Expansion,
    /// Whole-outline expansion written to history.
    Snapshot,
}

/// Monotonic request ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    stage: Stage,
    seq: u64,
}

#[derive(Debug, Clone, Default)]
pub struct Expander {
    outline: Option<ChapterOutline>,
    bundle: Option<ResourceBundle>,
    error: Option<String>,
    /// Set while the displayed outline came from a history record.
    replay: Option<HistoryRecord>,
    next_seq: u64,
    current_outline: u64,
    current_expansion: u64,
    current_snapshot: u64,
    /// Requests started and neither finished nor superseded.
    in_flight: Vec<Ticket>,
}

/// Read-only copy of the expander for rendering.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExpanderView {
    pub outline: Option<ChapterOutline>,
    pub bundle: Option<ResourceBundle>,
    pub loading: bool,
    pub error: Option<String>,
    pub from_history: bool,
    pub replay_id: Option<String>,
}

impl Expander {
    pub fn new() -> Self {
        Self::default()
    }

    fn current_mut(&mut self, stage: Stage) -> &mut u64 {
        match stage {
            Stage::Outline => &mut self.current_outline,
            Stage::Expansion => &mut self.current_expansion,
            Stage::Snapshot => &mut self.current_snapshot,
        }
    }

    /// Start a request, superseding any in flight for the same stage.
    pub fn begin(&mut self, stage: Stage) -> Ticket {
        self.next_seq += 1;
        let ticket = Ticket {
            stage,
            seq: self.next_seq,
        };
        *self.current_mut(stage) = ticket.seq;
        self.in_flight.retain(|t| t.stage != stage);
        self.in_flight.push(ticket);
        self.error = None;
        ticket
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        let current = match ticket.stage {
            Stage::Outline => self.current_outline,
            Stage::Expansion => self.current_expansion,
            Stage::Snapshot => self.current_snapshot,
        };
        ticket.seq == current
    }

    /// Invalidate in-flight requests of one stage without starting a new one.
    fn supersede(&mut self, stage: Stage) {
        self.next_seq += 1;
        *self.current_mut(stage) = self.next_seq;
        self.in_flight.retain(|t| t.stage != stage);
    }

    /// Mark `ticket` done. Stale tickets are already gone.
    pub fn finish(&mut self, ticket: Ticket) {
        self.in_flight.retain(|t| *t != ticket);
    }

    pub fn loading(&self) -> bool {
        !self.in_flight.is_empty()
    }

    pub fn from_history(&self) -> bool {
        self.replay.is_some()
    }

    pub fn outline(&self) -> Option<&ChapterOutline> {
        self.outline.as_ref()
    }

    pub fn bundle(&self) -> Option<&ResourceBundle> {
        self.bundle.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    /// Publish a freshly generated outline. Leaves replay mode and drops any
    /// bundle, displayed or in flight, that belonged to the previous outline.
    pub fn set_outline(&mut self, outline: ChapterOutline) {
        self.supersede(Stage::Expansion);
        self.outline = Some(outline);
        self.bundle = None;
        self.replay = None;
    }

    pub fn set_bundle(&mut self, bundle: Option<ResourceBundle>) {
        self.bundle = bundle;
    }

    /// Switch to replay mode for a stored record. No request is made.
    pub fn load_replay(&mut self, record: HistoryRecord) {
        self.supersede(Stage::Outline);
        self.supersede(Stage::Expansion);
        self.error = None;
        self.outline = Some(record.outline());
        self.bundle = None;
        self.replay = Some(record);
    }

    /// Show the stored bundle for `chapter` from the replayed record.
    ///
    /// Names match exactly, with no trimming or case folding.
    pub fn replay_chapter(&mut self, chapter: &str) -> Result<ResourceBundle, SessionError> {
        let found = self
            .replay
            .as_ref()
            .and_then(|record| record.find_chapter(chapter))
            .map(|c| c.to_bundle());

        self.supersede(Stage::Expansion);
        match found {
            Some(bundle) => {
                self.error = None;
                self.bundle = Some(bundle.clone());
                Ok(bundle)
            }
            None => {
                self.error = Some(CHAPTER_NOT_FOUND_MESSAGE.to_string());
                Err(SessionError::NotFound(CHAPTER_NOT_FOUND_MESSAGE.to_string()))
            }
        }
    }

    /// Drop the displayed bundle and any expansion still in flight.
    pub fn clear_bundle(&mut self) {
        self.supersede(Stage::Expansion);
        self.bundle = None;
    }

    /// Drop everything and invalidate in-flight requests of every stage.
    pub fn clear(&mut self) {
        let fence = self.next_seq + 1;
        *self = Self {
            next_seq: fence,
            current_outline: fence,
            current_expansion: fence,
            current_snapshot: fence,
            ..Self::default()
        };
    }

    pub fn view(&self) -> ExpanderView {
        ExpanderView {
            outline: self.outline.clone(),
            bundle: self.bundle.clone(),
            loading: self.loading(),
            error: self.error.clone(),
            from_history: self.from_history(),
            replay_id: self.replay.as_ref().map(|r| r.id.clone()),
        }
    }
}
