// Bounded log of external advisory calls
//
// Every call that reaches the provider is recorded, successful or not.
// Cache hits are not calls and are not recorded. The oldest record is dropped
// once the log is full.

use crate::advisory::error::AdvisoryErrorKind;
use crate::advisory::template::RequestKind;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::{Duration, SystemTime};

/// How one external call ended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CallOutcome {
    Success,
    Failure {
        kind: AdvisoryErrorKind,
        message: String,
    },
}

/// User verdict on a delivered advisory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feedback {
    Helpful,
    NotHelpful,
}

/// One logged call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Monotonic id, unique for the lifetime of the log
    pub id: u64,
    pub request_kind: RequestKind,
    pub cache_key: String,
    pub outcome: CallOutcome,
    /// Provider invocations made, retries included
    pub attempts: u32,
    pub elapsed: Duration,
    pub recorded_at: SystemTime,
    pub feedback: Option<Feedback>,
}

impl HistoryRecord {
    pub fn is_success(&self) -> bool {
        self.outcome == CallOutcome::Success
    }
}

/// Ring buffer of call records
#[derive(Debug)]
pub struct HistoryLog {
    records: VecDeque<HistoryRecord>,
    capacity: usize,
    next_id: u64,
}

impl HistoryLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
            next_id: 1,
        }
    }

    /// Append a record, returning its id
    pub fn push(
        &mut self,
        request_kind: RequestKind,
        cache_key: impl Into<String>,
        outcome: CallOutcome,
        attempts: u32,
        elapsed: Duration,
    ) -> u64 {
        let id = self.next_id;
        self.next_id += 1;

        if self.records.len() == self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(HistoryRecord {
            id,
            request_kind,
            cache_key: cache_key.into(),
            outcome,
            attempts,
            elapsed,
            recorded_at: SystemTime::now(),
            feedback: None,
        });
        id
    }

    /// Attach feedback to a record still in the log
    pub fn set_feedback(&mut self, id: u64, feedback: Feedback) -> bool {
        match self.records.iter_mut().find(|r| r.id == id) {
            Some(record) => {
                record.feedback = Some(feedback);
                true
            }
            None => false,
        }
    }

    /// Records, oldest first
    pub fn records(&self) -> impl Iterator<Item = &HistoryRecord> {
        self.records.iter()
    }

    pub fn latest(&self) -> Option<&HistoryRecord> {
        self.records.back()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
