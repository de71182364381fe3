//! Pipeline runner: drives the five stages over one table, and over a batch
//! of tables from a source into a sink.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use animacy_io::{output_identifier, TableSink, TableSource};
use animacy_spell::DynDictionary;
use animacy_types::{AnimacyError, ResponseTable, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::events::{EventLog, PipelineEvent};
use crate::stage::Stage;
use crate::stages::{
    CorrectionMap, ExclusionFilter, FieldRecoder, KeywordTally, SchemaReshaper, ScoreEngine,
    TextNormalization, TextNormalizer,
};
use crate::validation::{validate_or_raise, Severity};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// The result of running all five stages over one table.
#[derive(Debug, Clone)]
pub struct TableOutcome {
    pub input: String,
    /// Identifier the table is persisted under.
    pub output: String,
    pub table: ResponseTable,
    pub corrections: CorrectionMap,
    /// Computed for every table but never written into it.
    pub keyword_tally: KeywordTally,
    pub events: EventLog,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BatchOptions {
    /// Stop at the first table error instead of skipping the table.
    pub fail_fast: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSummary {
    pub input: String,
    pub output: String,
    pub rows: usize,
    pub corrections: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableFailure {
    pub table: String,
    /// `None` when the table could not be read.
    pub stage: Option<String>,
    pub error: String,
}

/// Summary of one batch run, serializable as the optional run report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub tables: Vec<TableSummary>,
    pub failures: Vec<TableFailure>,
    pub events: EventLog,
    /// Keyword tallies by input table identifier.
    pub keyword_tallies: BTreeMap<String, KeywordTally>,
}

impl BatchReport {
    fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            tables: Vec::new(),
            failures: Vec::new(),
            events: EventLog::new(),
            keyword_tallies: BTreeMap::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Write the report as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        tracing::debug!(path = %path.display(), "Run report saved");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }
}

/// A stage failure, tagged with the stage that raised it.
struct StageError {
    stage: String,
    error: AnimacyError,
}

// ---------------------------------------------------------------------------
// PipelineRunner
// ---------------------------------------------------------------------------

/// Runs exclusion, recoding, reshaping, scoring, and text normalization in
/// strict order. Each stage consumes the full output of the one before it.
///
/// Tables share nothing but the read-only dictionary, so every table run is
/// independent of the others.
pub struct PipelineRunner {
    config: PipelineConfig,
    stages: Vec<Box<dyn Stage>>,
    dictionary: Arc<DynDictionary>,
}

const TEXT_STAGE: &str = "text";

impl PipelineRunner {
    pub fn new(config: PipelineConfig, dictionary: DynDictionary) -> Self {
        Self::with_shared_dictionary(config, Arc::new(dictionary))
    }

    /// Build a runner over a dictionary already shared with other runners.
    pub fn with_shared_dictionary(config: PipelineConfig, dictionary: Arc<DynDictionary>) -> Self {
        let stages: Vec<Box<dyn Stage>> = vec![
            Box::new(ExclusionFilter::new(config.exclusion.clone())),
            Box::new(FieldRecoder::new(config.recode.clone())),
            Box::new(SchemaReshaper::new(config.reshape.clone())),
            Box::new(ScoreEngine::new(config.scoring.clone(), config.text.column.clone())),
        ];
        Self {
            config,
            stages,
            dictionary,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Stage names in execution order.
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages
            .iter()
            .map(|s| s.name())
            .chain(std::iter::once(TEXT_STAGE))
            .collect()
    }

    /// Run all stages over one table. The caller's table is left untouched.
    pub fn run_table(&self, table: &ResponseTable) -> Result<TableOutcome> {
        let mut events = EventLog::new();
        let (output, normalized) = self.execute(table, &mut events).map_err(|e| e.error)?;
        Ok(TableOutcome {
            input: table.id().to_string(),
            output,
            table: normalized.table,
            corrections: normalized.corrections,
            keyword_tally: normalized.tally,
            events,
        })
    }

    fn execute(
        &self,
        table: &ResponseTable,
        events: &mut EventLog,
    ) -> std::result::Result<(String, TextNormalization), StageError> {
        let started = Instant::now();
        let id = table.id().to_string();
        events.emit(PipelineEvent::TableStarted {
            table: id.clone(),
            rows: table.len(),
            columns: table.columns().len(),
        });

        let mut current = table.clone();
        for stage in &self.stages {
            let stage_started = Instant::now();
            let next = stage
                .apply(&current)
                .map_err(|error| self.stage_failed(&id, stage.name(), error, events))?;
            events.emit(stage_completed(&id, stage.name(), &current, &next, stage_started));
            current = next;
        }

        let stage_started = Instant::now();
        let normalizer = TextNormalizer::new(self.config.text.clone(), &*self.dictionary);
        let normalized = normalizer
            .normalize(&current)
            .map_err(|error| self.stage_failed(&id, TEXT_STAGE, error, events))?;
        events.emit(stage_completed(&id, TEXT_STAGE, &current, &normalized.table, stage_started));

        let output = output_identifier(&id, &self.config.output.suffix);
        let normalized = TextNormalization {
            table: normalized.table.with_id(output.clone()),
            ..normalized
        };
        events.emit(PipelineEvent::TableCompleted {
            table: id.clone(),
            output: output.clone(),
            rows: normalized.table.len(),
            duration_ms: elapsed_ms(started),
        });
        Ok((output, normalized))
    }

    fn stage_failed(
        &self,
        table: &str,
        stage: &str,
        error: AnimacyError,
        events: &mut EventLog,
    ) -> StageError {
        tracing::debug!(table, stage, error = %error, "Stage failed");
        events.emit(PipelineEvent::TableFailed {
            table: table.to_string(),
            stage: Some(stage.to_string()),
            error: error.to_string(),
        });
        StageError {
            stage: stage.to_string(),
            error,
        }
    }

    /// Process every table the source lists and write each result to the sink.
    ///
    /// Table-local errors skip the table unless `fail_fast` is set. Sink
    /// errors and invalid configuration abort the whole batch.
    pub fn run_batch(
        &self,
        source: &dyn TableSource,
        sink: &dyn TableSink,
        options: BatchOptions,
    ) -> Result<BatchReport> {
        for diag in validate_or_raise(&self.config)? {
            if diag.severity == Severity::Warning {
                tracing::warn!(rule = %diag.rule, "{}", diag.message);
            }
        }

        let ids = source.list()?;
        let mut report = BatchReport::new();
        tracing::info!(run_id = %report.run_id, tables = ids.len(), "Batch started");

        for id in ids {
            let table = match source.read(&id) {
                Ok(table) => table,
                Err(error) if error.is_table_local() && !options.fail_fast => {
                    report.events.emit(PipelineEvent::TableFailed {
                        table: id.clone(),
                        stage: None,
                        error: error.to_string(),
                    });
                    skip(&mut report, &id, None, &error);
                    continue;
                }
                Err(error) => return Err(error),
            };

            match self.execute(&table, &mut report.events) {
                Ok((output, normalized)) => {
                    sink.write(&output, &normalized.table)?;
                    tracing::info!(
                        table = %id,
                        output = %output,
                        rows = normalized.table.len(),
                        corrections = normalized.corrections.len(),
                        "Table processed"
                    );
                    report.tables.push(TableSummary {
                        input: id.clone(),
                        output,
                        rows: normalized.table.len(),
                        corrections: normalized.corrections.len(),
                    });
                    report.keyword_tallies.insert(id, normalized.tally);
                }
                Err(failed) if failed.error.is_table_local() && !options.fail_fast => {
                    skip(&mut report, &id, Some(failed.stage), &failed.error);
                }
                Err(failed) => return Err(failed.error),
            }
        }

        tracing::info!(
            run_id = %report.run_id,
            processed = report.tables.len(),
            skipped = report.failures.len(),
            "Batch finished"
        );
        Ok(report)
    }
}

fn skip(report: &mut BatchReport, table: &str, stage: Option<String>, error: &AnimacyError) {
    tracing::warn!(table, stage = ?stage, error = %error, "Table skipped");
    report.events.emit(PipelineEvent::TableSkipped {
        table: table.to_string(),
        reason: error.to_string(),
    });
    report.failures.push(TableFailure {
        table: table.to_string(),
        stage,
        error: error.to_string(),
    });
}

fn stage_completed(
    table: &str,
    stage: &str,
    before: &ResponseTable,
    after: &ResponseTable,
    started: Instant,
) -> PipelineEvent {
    let duration_ms = elapsed_ms(started);
    tracing::debug!(
        table,
        stage,
        rows_in = before.len(),
        rows_out = after.len(),
        duration_ms,
        "Stage completed"
    );
    PipelineEvent::StageCompleted {
        table: table.to_string(),
        stage: stage.to_string(),
        rows_in: before.len(),
        rows_out: after.len(),
        columns_out: after.columns().len(),
        duration_ms,
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
