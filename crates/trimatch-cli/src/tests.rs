//! CLI command tests
//!
//! This module contains all tests for the CLI commands.

use std::io::Write;
use std::path::PathBuf;

use trimatch_core::ResolvedUpdate;

use crate::cli::PipelineArgs;
use crate::commands::{self, load_vocab, resolver_config};

fn write_temp(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    path
}

fn test_vocab_json() -> &'static str {
    r#"[
        {
            "make": "Toyota",
            "model": "Camry",
            "trims": ["SE", "SE Plus", "LE", "XLE"],
            "aliases": ["se-sport"]
        }
    ]"#
}

fn pipeline_args(vocab: PathBuf) -> PipelineArgs {
    PipelineArgs {
        vocab,
        no_llm: true,
        primary_threshold: 82,
        secondary_threshold: 74,
        min_confidence: 0.55,
        max_qps: 0.0,
    }
}

// ========== Vocabulary Loading Tests ==========

#[test]
fn test_load_vocab() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_temp(&dir, "vocab.json", test_vocab_json());

    let vocab = load_vocab(&path).unwrap();
    use trimatch_core::CandidateSupplier;
    let set = vocab.candidates("toyota", "camry").unwrap();
    // four canonical trims plus one alias
    assert_eq!(set.len(), 5);
}

#[test]
fn test_load_vocab_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = load_vocab(&dir.path().join("nope.json"));
    assert!(result.is_err());
}

#[test]
fn test_load_vocab_invalid_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_temp(&dir, "vocab.json", "not json");
    assert!(load_vocab(&path).is_err());
}

// ========== Config Translation Tests ==========

#[test]
fn test_resolver_config_from_args() {
    let args = PipelineArgs {
        vocab: PathBuf::from("vocab.json"),
        no_llm: true,
        primary_threshold: 90,
        secondary_threshold: 60,
        min_confidence: 0.7,
        max_qps: 2.0,
    };
    let config = resolver_config(&args);
    assert!(!config.allow_external_classifier);
    assert_eq!(config.fuzzy_primary_threshold, 90);
    assert_eq!(config.fuzzy_secondary_threshold, 60);
    assert!((config.min_classifier_confidence - 0.7).abs() < f64::EPSILON);
    assert!((config.max_queries_per_second - 2.0).abs() < f64::EPSILON);
}

// ========== Resolve Command Tests ==========

#[tokio::test]
async fn test_cmd_resolve_exact() {
    let dir = tempfile::tempdir().unwrap();
    let vocab = write_temp(&dir, "vocab.json", test_vocab_json());
    let args = pipeline_args(vocab);

    let result = commands::cmd_resolve(
        &args,
        "Toyota",
        "Camry",
        Some("se".to_string()),
        None,
        None,
    )
    .await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_cmd_resolve_unknown_pairing_errors() {
    let dir = tempfile::tempdir().unwrap();
    let vocab = write_temp(&dir, "vocab.json", test_vocab_json());
    let args = pipeline_args(vocab);

    let result = commands::cmd_resolve(&args, "Mazda", "3", None, None, None).await;
    assert!(result.is_err());
}

// ========== Batch Command Tests ==========

#[tokio::test]
async fn test_cmd_batch_writes_one_line_per_listing() {
    let dir = tempfile::tempdir().unwrap();
    let vocab = write_temp(&dir, "vocab.json", test_vocab_json());
    let listings = write_temp(
        &dir,
        "listings.json",
        r#"[
            {"id": "a1", "make": "Toyota", "model": "Camry", "raw_trim": "SE"},
            {"id": "a2", "make": "Toyota", "model": "Camry", "raw_trim": "S E Plus"},
            {"id": "a3", "make": "Mazda", "model": "3", "raw_trim": "GT"}
        ]"#,
    );
    let out = dir.path().join("updates.jsonl");
    let args = pipeline_args(vocab);

    commands::cmd_batch(&args, &listings, &out, None, 4)
        .await
        .unwrap();

    let written = std::fs::read_to_string(&out).unwrap();
    let updates: Vec<ResolvedUpdate> = written
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(updates.len(), 3);

    // the pairing with no vocabulary resolves as unmatched, not a failure
    let unknown = updates.iter().find(|u| u.listing_id == "a3").unwrap();
    assert!(unknown.needs_review);
    assert_eq!(unknown.new_trim, "GT");

    let exact = updates.iter().find(|u| u.listing_id == "a1").unwrap();
    assert_eq!(exact.new_trim, "SE");
    assert!(!exact.needs_review);
}

#[tokio::test]
async fn test_cmd_batch_respects_limit() {
    let dir = tempfile::tempdir().unwrap();
    let vocab = write_temp(&dir, "vocab.json", test_vocab_json());
    let listings = write_temp(
        &dir,
        "listings.json",
        r#"[
            {"id": "a1", "make": "Toyota", "model": "Camry", "raw_trim": "SE"},
            {"id": "a2", "make": "Toyota", "model": "Camry", "raw_trim": "LE"}
        ]"#,
    );
    let out = dir.path().join("updates.jsonl");
    let args = pipeline_args(vocab);

    commands::cmd_batch(&args, &listings, &out, Some(1), 4)
        .await
        .unwrap();

    let written = std::fs::read_to_string(&out).unwrap();
    assert_eq!(written.lines().count(), 1);
}

#[tokio::test]
async fn test_cmd_batch_bad_listings_file() {
    let dir = tempfile::tempdir().unwrap();
    let vocab = write_temp(&dir, "vocab.json", test_vocab_json());
    let listings = write_temp(&dir, "listings.json", "{ not an array");
    let out = dir.path().join("updates.jsonl");
    let args = pipeline_args(vocab);

    let result = commands::cmd_batch(&args, &listings, &out, None, 4).await;
    assert!(result.is_err());
}

// ========== Rank Command Tests ==========

#[test]
fn test_cmd_rank() {
    let dir = tempfile::tempdir().unwrap();
    let vocab = write_temp(&dir, "vocab.json", test_vocab_json());

    let result = commands::cmd_rank(&vocab, "Toyota", "Camry", "se plus", 3);
    assert!(result.is_ok());
}

#[test]
fn test_cmd_rank_unknown_pairing_errors() {
    let dir = tempfile::tempdir().unwrap();
    let vocab = write_temp(&dir, "vocab.json", test_vocab_json());

    let result = commands::cmd_rank(&vocab, "Mazda", "3", "gt", 3);
    assert!(result.is_err());
}
