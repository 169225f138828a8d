//! In-memory copy of the history list.
//!
//! Loaded once from the store, then kept in step by the add and delete paths
//! so a deletion never requires a reload.

use tutor_core::types::HistoryRecord;

#[derive(Debug, Clone, Default)]
pub struct HistoryList {
    records: Vec<HistoryRecord>,
}

impl HistoryList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace_all(&mut self, records: Vec<HistoryRecord>) {
        self.records = records;
    }

    /// Newest records go first.
    pub fn add(&mut self, record: HistoryRecord) {
        self.records.retain(|r| r.id != record.id);
        self.records.insert(0, record);
    }

    /// Remove exactly the record with `id`. Returns whether it was present.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.records.len();
        self.records.retain(|r| r.id != id);
        self.records.len() != before
    }

    pub fn get(&self, id: &str) -> Option<&HistoryRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn records(&self) -> &[HistoryRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
