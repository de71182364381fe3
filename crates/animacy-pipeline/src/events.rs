//! Pipeline events for observability.
//!
//! The runner records a [`PipelineEvent`] for every table and stage it
//! processes. Events are collected in an [`EventLog`] and embedded in the
//! batch report.

use serde::{Deserialize, Serialize};

/// Events emitted while processing tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PipelineEvent {
    TableStarted {
        table: String,
        rows: usize,
        columns: usize,
    },
    StageCompleted {
        table: String,
        stage: String,
        rows_in: usize,
        rows_out: usize,
        columns_out: usize,
        duration_ms: u64,
    },
    TableCompleted {
        table: String,
        output: String,
        rows: usize,
        duration_ms: u64,
    },
    TableFailed {
        table: String,
        stage: Option<String>,
        error: String,
    },
    TableSkipped {
        table: String,
        reason: String,
    },
}

impl PipelineEvent {
    /// The table identifier the event refers to.
    pub fn table(&self) -> &str {
        match self {
            PipelineEvent::TableStarted { table, .. }
            | PipelineEvent::StageCompleted { table, .. }
            | PipelineEvent::TableCompleted { table, .. }
            | PipelineEvent::TableFailed { table, .. }
            | PipelineEvent::TableSkipped { table, .. } => table,
        }
    }
}

/// Ordered record of events for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventLog {
    events: Vec<PipelineEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, event: PipelineEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[PipelineEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events for one table, in emission order.
    pub fn for_table<'a>(&'a self, table: &'a str) -> impl Iterator<Item = &'a PipelineEvent> {
        self.events.iter().filter(move |e| e.table() == table)
    }
}
