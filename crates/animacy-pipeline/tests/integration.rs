//! End-to-end integration tests for the Animacy pre-processing pipeline.
//!
//! Each test runs the full five-stage pipeline: read export -> exclude ->
//! recode -> reshape -> score -> normalize text -> verify.

use std::collections::BTreeSet;

use animacy_io::{CsvTableStore, MemoryTableStore, TableSink, TableSource, XlsxTableStore};
use animacy_pipeline::config::{
    numbered, ANIMATE_MEAN, ANIMATE_N, ANIMATE_SD, FILLER_CORRECT, FILLER_INCORRECT,
    FILLER_SCORE, INANIMATE_MEAN,
};
use animacy_pipeline::{
    validate_or_raise, BatchOptions, FieldRecoder, PipelineConfig, PipelineEvent, PipelineRunner,
    RecodeConfig, Stage,
};
use animacy_spell::{Dictionary, DynDictionary, FrequencyDictionary};
use animacy_types::{AnimacyError, Cell, ResponseTable, Result};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Column layout of a replication study export.
fn export_columns() -> Vec<String> {
    let mut columns: Vec<String> = [
        "StartDate",
        "EndDate",
        "Status",
        "Progress",
        "Duration (in seconds)",
        "Finished",
        "RecordedDate",
        "ResponseId",
        "DistributionChannel",
        "UserLanguage",
        "Q3",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    columns.extend(numbered("Q", 4, 56));
    columns
}

/// One respondent: overrides by column name, everything else a plausible default.
fn respondent(overrides: &[(&str, &str)]) -> Vec<(String, String)> {
    export_columns()
        .into_iter()
        .map(|column| {
            let value = overrides
                .iter()
                .find(|(name, _)| *name == column)
                .map(|(_, v)| v.to_string())
                .unwrap_or_else(|| default_value(&column).to_string());
            (column, value)
        })
        .collect()
}

fn default_value(column: &str) -> &'static str {
    match column {
        "StartDate" | "EndDate" | "RecordedDate" => "2022-12-05 14:03:11",
        "Status" => "IP Address",
        "Progress" => "100",
        "Duration (in seconds)" => "512",
        "Finished" => "True",
        "ResponseId" => "R_1abcDEF",
        "DistributionChannel" => "anonymous",
        "UserLanguage" => "EN",
        "Q3" => "30",
        "Q4" => "Female",
        "Q5" => "Higher education (e.g., bachelor, master, Ph.D., ...)",
        "Q6" => "English",
        "Q56" => "owl bee",
        _ => "1",
    }
}

/// A raw export table: question-text row, structural row, then respondents.
fn export(id: &str, respondents: &[Vec<(String, String)>]) -> ResponseTable {
    let columns = export_columns();
    let mut rows: Vec<Vec<Cell>> = vec![
        columns.iter().map(|c| Cell::text(format!("{c} text"))).collect(),
        columns.iter().map(|c| Cell::text(format!("{{\"ImportId\":\"{c}\"}}"))).collect(),
    ];
    for r in respondents {
        rows.push(r.iter().map(|(_, v)| Cell::from_raw(v)).collect());
    }
    ResponseTable::from_rows(id, columns, rows).unwrap()
}

/// The same export rendered as CSV text.
fn export_csv(respondents: &[Vec<(String, String)>]) -> String {
    let table = export("unused", respondents);
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(table.columns()).unwrap();
    for row in table.rows() {
        writer.write_record(row.iter().map(|c| c.to_string())).unwrap();
    }
    String::from_utf8(writer.into_inner().unwrap()).unwrap()
}

/// Spell checker over a fixed vocabulary. Fails on the token "boom".
struct Vocabulary {
    words: BTreeSet<&'static str>,
    fixes: Vec<(&'static str, &'static str)>,
}

impl Dictionary for Vocabulary {
    fn name(&self) -> &str {
        "vocabulary"
    }

    fn unknown_set(&self, tokens: &BTreeSet<String>) -> Result<BTreeSet<String>> {
        if tokens.contains("boom") {
            return Err(AnimacyError::Dictionary("lookup service failed".into()));
        }
        Ok(tokens
            .iter()
            .map(|t| t.to_lowercase())
            .filter(|t| !self.words.contains(t.as_str()))
            .collect())
    }

    fn suggest(&self, token: &str) -> Result<String> {
        Ok(self
            .fixes
            .iter()
            .find(|(wrong, _)| *wrong == token)
            .map(|(_, right)| right.to_string())
            .unwrap_or_else(|| token.to_string()))
    }
}

fn vocabulary() -> DynDictionary {
    DynDictionary::new(Vocabulary {
        words: ["owl", "bee", "turtle", "spider", "kite", "and", "a", "drum"]
            .into_iter()
            .collect(),
        fixes: vec![("tutrle", "turtle"), ("spidr", "spider"), ("kit", "kite")],
    })
}

fn runner() -> PipelineRunner {
    PipelineRunner::new(PipelineConfig::default(), vocabulary())
}

fn number(table: &ResponseTable, row: usize, column: &str) -> Option<f64> {
    table.cell(row, column).and_then(Cell::as_number)
}

// ---------------------------------------------------------------------------
// Exclusion
// ---------------------------------------------------------------------------

#[test]
fn three_respondent_example_keeps_only_the_first() {
    let table = export(
        "group1.csv",
        &[
            respondent(&[("Progress", "100"), ("Q3", "25")]),
            respondent(&[("Progress", "50"), ("Q3", "30")]),
            respondent(&[("Progress", "100"), ("Q3", "17")]),
        ],
    );
    let outcome = runner().run_table(&table).unwrap();
    assert_eq!(outcome.table.len(), 1);
    assert_eq!(outcome.table.cell(0, "SubID"), Some(&Cell::Number(1.0)));
    assert_eq!(number(&outcome.table, 0, "Q3"), Some(25.0));
}

#[test]
fn output_count_matches_passing_respondents_and_ids_are_gap_free() {
    let ages = ["19", "18", "abc", "40", "", "65", "22"];
    let respondents: Vec<_> = ages.iter().map(|age| respondent(&[("Q3", *age)])).collect();
    let outcome = runner().run_table(&export("group1.csv", &respondents)).unwrap();

    let expected = ages
        .iter()
        .filter(|a| a.parse::<f64>().is_ok_and(|v| v > 18.0))
        .count();
    assert_eq!(outcome.table.len(), expected);
    let ids: Vec<f64> = outcome
        .table
        .column_values("SubID")
        .unwrap()
        .iter()
        .filter_map(|c| c.as_number())
        .collect();
    let gap_free: Vec<f64> = (1..=expected).map(|n| n as f64).collect();
    assert_eq!(ids, gap_free);
}

#[test]
fn missing_gatekeeper_column_fails_the_table() {
    let mut table = export("group1.csv", &[respondent(&[])]);
    table.drop_column("Progress");
    let err = runner().run_table(&table).unwrap_err();
    let msg = err.to_string();
    assert!(matches!(err, AnimacyError::Schema { .. }));
    assert!(msg.contains("group1.csv") && msg.contains("Progress"), "{msg}");
}

// ---------------------------------------------------------------------------
// Recoding and reshaping
// ---------------------------------------------------------------------------

#[test]
fn demographics_are_recoded_and_admin_columns_dropped() {
    let outcome = runner()
        .run_table(&export(
            "group1.csv",
            &[respondent(&[("Q4", "Male"), ("Q6", "Dutch")])],
        ))
        .unwrap();
    let table = &outcome.table;
    assert_eq!(table.cell(0, "Gender"), Some(&Cell::text("1")));
    assert_eq!(table.cell(0, "Education"), Some(&Cell::text("3")));
    assert_eq!(table.cell(0, "Native Language"), Some(&Cell::text("Dutch")));
    for admin in ["StartDate", "Progress", "ResponseId", "UserLanguage"] {
        assert!(!table.has_column(admin), "{admin} should be dropped");
    }
    assert!(!table.has_column("Q4"));
}

#[test]
fn recoding_is_idempotent_on_real_exports() {
    let table = export("group1.csv", &[respondent(&[]), respondent(&[("Q5", "Other")])]);
    let recoder = FieldRecoder::new(RecodeConfig::default());
    let once = recoder.apply(&table).unwrap();
    assert_eq!(recoder.apply(&once).unwrap(), once);
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

#[test]
fn animate_example_yields_eleven_present_values() {
    let values = ["4", "5", "", "3", "3", "4", "4", "3", "5", "4", "4", "4"];
    let overrides: Vec<(String, &str)> = numbered("Q", 10, 21).into_iter().zip(values).collect();
    let overrides: Vec<(&str, &str)> = overrides.iter().map(|(c, v)| (c.as_str(), *v)).collect();

    // Scored as given: the reversal of Q11 would otherwise shift the 5.
    let mut config = PipelineConfig::default();
    config.scoring.reversed_item = None;
    let runner = PipelineRunner::new(config, vocabulary());
    let outcome = runner
        .run_table(&export("group1.csv", &[respondent(&overrides)]))
        .unwrap();

    assert_eq!(number(&outcome.table, 0, ANIMATE_N), Some(11.0));
    let mean = number(&outcome.table, 0, ANIMATE_MEAN).unwrap();
    assert_eq!(format!("{mean:.3}"), "3.909");
    let sd = number(&outcome.table, 0, ANIMATE_SD).unwrap();
    assert!((sd - 0.7006).abs() < 1e-3, "sd = {sd}");
}

#[test]
fn reversed_item_moves_onto_group_scale() {
    let outcome = runner()
        .run_table(&export("group1.csv", &[respondent(&[("Q11", "8")])]))
        .unwrap();
    assert_eq!(number(&outcome.table, 0, "Q11"), Some(1.0));
}

#[test]
fn single_present_member_has_undefined_sd() {
    let mut overrides: Vec<(String, &str)> =
        numbered("Q", 22, 33).into_iter().map(|c| (c, "")).collect();
    overrides[4].1 = "6";
    let overrides: Vec<(&str, &str)> = overrides.iter().map(|(c, v)| (c.as_str(), *v)).collect();
    let outcome = runner()
        .run_table(&export("group1.csv", &[respondent(&overrides)]))
        .unwrap();
    assert_eq!(number(&outcome.table, 0, INANIMATE_MEAN), Some(6.0));
    assert_eq!(outcome.table.cell(0, "Inanimate (SD)"), Some(&Cell::Missing));
    assert_eq!(number(&outcome.table, 0, "Inanimate (n)"), Some(1.0));
}

#[test]
fn filler_items_are_binary_after_scoring() {
    let raw = ["7", "-1", "0", "1", "0.4", "yes", "", "100", "-100", "1"];
    let columns = numbered("Q", 36, 55);
    let respondents: Vec<_> = raw
        .iter()
        .map(|v| {
            let overrides: Vec<(&str, &str)> = columns.iter().map(|c| (c.as_str(), *v)).collect();
            respondent(&overrides)
        })
        .collect();
    let outcome = runner().run_table(&export("group1.csv", &respondents)).unwrap();

    for row in 0..outcome.table.len() {
        for column in &columns {
            let cell = outcome.table.cell(row, column).unwrap();
            let ok = match cell {
                Cell::Missing => true,
                Cell::Number(v) => (0.0..=1.0).contains(v),
                Cell::Text(_) => false,
            };
            assert!(ok, "row {row} {column} = {cell:?}");
        }
    }
}

#[test]
fn filler_score_identity_holds() {
    let respondents: Vec<_> = (0..6)
        .map(|i| {
            let overrides: Vec<(String, &str)> = numbered("Q", 36, 55)
                .into_iter()
                .enumerate()
                .map(|(j, c)| (c, if (i + j) % 3 == 0 { "0" } else { "1" }))
                .collect();
            let overrides: Vec<(&str, &str)> =
                overrides.iter().map(|(c, v)| (c.as_str(), *v)).collect();
            respondent(&overrides)
        })
        .collect();
    let outcome = runner().run_table(&export("group1.csv", &respondents)).unwrap();

    for row in 0..outcome.table.len() {
        let correct = number(&outcome.table, row, FILLER_CORRECT).unwrap();
        let incorrect_raw: f64 = numbered("Q", 47, 55)
            .iter()
            .map(|c| number(&outcome.table, row, c).unwrap())
            .sum();
        assert_eq!(number(&outcome.table, row, FILLER_INCORRECT), Some(incorrect_raw - 9.0));
        assert_eq!(
            number(&outcome.table, row, FILLER_SCORE),
            Some(correct + (incorrect_raw - 9.0))
        );
    }
}

// ---------------------------------------------------------------------------
// Text normalization
// ---------------------------------------------------------------------------

#[test]
fn identical_misspellings_get_identical_corrections() {
    let outcome = runner()
        .run_table(&export(
            "group1.csv",
            &[
                respondent(&[("Q56", "tutrle owl")]),
                respondent(&[("Q56", "spidr tutrle")]),
            ],
        ))
        .unwrap();
    assert_eq!(outcome.table.cell(0, "Q56"), Some(&Cell::text("turtle owl")));
    assert_eq!(outcome.table.cell(1, "Q56"), Some(&Cell::text("spider turtle")));
    assert_eq!(outcome.keyword_tally.get("turtle"), Some(2));
    assert_eq!(outcome.keyword_tally.get("spider"), Some(1));
}

#[test]
fn frequency_dictionary_corrects_recall_answers() {
    let dictionary = FrequencyDictionary::from_frequencies(
        animacy_pipeline::config::DEFAULT_KEYWORDS
            .iter()
            .map(|k| (*k, 100u64))
            .chain([("and", 1000u64), ("the", 1000u64)]),
    );
    let runner = PipelineRunner::new(PipelineConfig::default(), DynDictionary::new(dictionary));
    let outcome = runner
        .run_table(&export(
            "group1.csv",
            &[respondent(&[("Q56", "violn and the trot")])],
        ))
        .unwrap();
    assert_eq!(outcome.table.cell(0, "Q56"), Some(&Cell::text("violin and the trout")));
    assert_eq!(outcome.corrections.len(), 2);
    assert_eq!(outcome.keyword_tally.get("violin"), Some(1));
}

// ---------------------------------------------------------------------------
// Batch runs
// ---------------------------------------------------------------------------

#[test]
fn csv_batch_writes_processed_tables() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("group1.csv"),
        export_csv(&[respondent(&[]), respondent(&[("Progress", "20")])]),
    )
    .unwrap();
    std::fs::write(
        dir.path().join("group2.csv"),
        export_csv(&[respondent(&[("Q56", "kit")])]),
    )
    .unwrap();
    std::fs::write(dir.path().join("notes.csv"), "not,an,export\n").unwrap();

    let out_dir = dir.path().join("processed");
    let store = CsvTableStore::new(dir.path()).with_output_dir(&out_dir);
    let config = PipelineConfig::default();
    validate_or_raise(&config).unwrap();
    let report = PipelineRunner::new(config, vocabulary())
        .run_batch(&store, &store, BatchOptions::default())
        .unwrap();

    assert!(report.is_clean(), "{:?}", report.failures);
    assert_eq!(report.tables.len(), 2);
    assert_eq!(report.keyword_tallies["group2.csv"].get("kite"), Some(1));

    let written = CsvTableStore::new(&out_dir)
        .with_pattern("*-processed.csv")
        .with_output_suffix("");
    assert_eq!(
        written.list().unwrap(),
        vec!["group1-processed.csv", "group2-processed.csv"]
    );
    let group1 = written.read("group1-processed.csv").unwrap();
    assert_eq!(group1.len(), 1);
    assert_eq!(group1.cell(0, "SubID"), Some(&Cell::text("1")));
    assert_eq!(group1.cell(0, "Gender"), Some(&Cell::text("2")));
    assert_eq!(group1.cell(0, "Words (pre-processed)"), Some(&Cell::Missing));
    assert!(!group1.has_column("Progress"));
    let group2 = written.read("group2-processed.csv").unwrap();
    assert_eq!(group2.cell(0, "Q56"), Some(&Cell::text("kite")));
}

#[test]
fn rerun_in_place_ignores_earlier_outputs() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("group1.csv"), export_csv(&[respondent(&[])])).unwrap();
    let store = CsvTableStore::new(dir.path());

    let first = runner()
        .run_batch(&store, &store, BatchOptions::default())
        .unwrap();
    assert_eq!(first.tables.len(), 1);
    assert!(dir.path().join("group1-processed.csv").is_file());

    let second = runner()
        .run_batch(&store, &store, BatchOptions::default())
        .unwrap();
    assert!(second.is_clean(), "{:?}", second.failures);
    assert_eq!(second.tables.len(), 1);
    assert_eq!(second.tables[0].input, "group1.csv");
}

#[test]
fn xlsx_batch_writes_processed_workbooks() {
    let dir = tempfile::tempdir().unwrap();
    let store = XlsxTableStore::new(dir.path());
    let raw = export(
        "group1.xlsx",
        &[
            respondent(&[("Q56", "owl tutrle")]),
            respondent(&[("Q3", "17")]),
        ],
    );
    store.write("group1.xlsx", &raw).unwrap();

    let report = runner()
        .run_batch(&store, &store, BatchOptions::default())
        .unwrap();
    assert!(report.is_clean(), "{:?}", report.failures);
    assert_eq!(report.tables[0].output, "group1-processed.xlsx");

    let processed = store.read("group1-processed.xlsx").unwrap();
    assert_eq!(processed.len(), 1);
    assert_eq!(processed.cell(0, "SubID"), Some(&Cell::Number(1.0)));
    assert_eq!(processed.cell(0, "Q56"), Some(&Cell::text("owl turtle")));
    assert_eq!(processed.cell(0, ANIMATE_N), Some(&Cell::Number(12.0)));
    assert!(!processed.has_column("Progress"));
    assert_eq!(store.list().unwrap(), vec!["group1.xlsx"]);
}

#[test]
fn dictionary_failure_skips_only_that_table() {
    let store = MemoryTableStore::new()
        .with_table(export("group1.csv", &[respondent(&[("Q56", "boom")])]))
        .with_table(export("group2.csv", &[respondent(&[])]));

    let report = runner()
        .run_batch(&store, &store, BatchOptions::default())
        .unwrap();

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].stage.as_deref(), Some("text"));
    assert!(store.get("group1-processed.csv").is_none());
    assert!(store.get("group2-processed.csv").is_some());
    assert!(report.events.events().iter().any(|e| matches!(
        e,
        PipelineEvent::TableFailed { table, stage: Some(stage), .. }
            if table == "group1.csv" && stage == "text"
    )));
}

#[test]
fn tables_are_processed_independently() {
    let a = export("group1.csv", &[respondent(&[]), respondent(&[])]);
    let b = export("group2.csv", &[respondent(&[])]);
    let runner = runner();

    let alone = runner.run_table(&b).unwrap();
    runner.run_table(&a).unwrap();
    let after = runner.run_table(&b).unwrap();

    assert_eq!(alone.table, after.table);
    assert_eq!(after.table.cell(0, "SubID"), Some(&Cell::Number(1.0)));
}
