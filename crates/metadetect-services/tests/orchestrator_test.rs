//! Analysis pipeline tests against in-memory stores and a local object store.
//!
//! Run with: `cargo test -p metadetect-services --test orchestrator_test`

mod helpers;

use metadetect_core::constants::MAX_ERROR_MESSAGE_CHARS;
use metadetect_core::models::{AnalysisRecord, AnalysisStatus};
use metadetect_core::{AppError, CallerIdentity};
use serde_json::Value;
use uuid::Uuid;

use helpers::fixtures::fixed_time;
use helpers::{FixedUrlStore, ScriptedExtractor, TestContext};

fn error_message(details: &str) -> String {
    let parsed: Value = serde_json::from_str(details).unwrap();
    parsed["error"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_submit_stores_manifest_verbatim() {
    let ctx = TestContext::new().await;
    let image = ctx.seed_image(ctx.user_id, "f.png", Some("u1/f.png"));
    ctx.put_object("u1/f.png", b"12345");
    let extractor = ScriptedExtractor::returning("{\"c2pa\":\"ok\"}");
    let orchestrator = ctx.orchestrator(extractor.clone());

    let started = orchestrator.submit(image.id).await.unwrap();

    let status = orchestrator.get_status(started.analysis_id).await.unwrap();
    assert_eq!(status.analysis_id, started.analysis_id);
    assert_eq!(status.status, AnalysisStatus::Done);
    assert_eq!(status.score, None);

    let manifest = orchestrator.get_manifest(started.analysis_id).await.unwrap();
    assert_eq!(manifest.manifest_json, "{\"c2pa\":\"ok\"}");

    let calls = extractor.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].contents, b"12345");
    assert_eq!(calls[0].path.extension().unwrap(), "png");
    assert!(!calls[0].path.exists());
    assert_eq!(ctx.work_dir_entries(), 0);

    let records = ctx.analyses.all();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].image_id, image.id);
    assert_eq!(records[0].created_at, fixed_time());
}

#[tokio::test]
async fn test_manifest_is_not_reformatted() {
    let ctx = TestContext::new().await;
    let image = ctx.seed_image(ctx.user_id, "f.jpg", Some("u1/f.jpg"));
    ctx.put_object("u1/f.jpg", b"jpeg-bytes");
    let raw = "{\n  \"active_manifest\" : \"urn:1\",\n  \"manifests\": {}\n}\n";
    let orchestrator = ctx.orchestrator(ScriptedExtractor::returning(raw));

    let started = orchestrator.submit(image.id).await.unwrap();
    let manifest = orchestrator.get_manifest(started.analysis_id).await.unwrap();
    assert_eq!(manifest.manifest_json, raw);
}

#[tokio::test]
async fn test_missing_storage_path_creates_nothing() {
    let ctx = TestContext::new().await;
    let extractor = ScriptedExtractor::returning("{}");
    let orchestrator = ctx.orchestrator(extractor.clone());

    for path in [None, Some(""), Some("   ")] {
        let image = ctx.seed_image(ctx.user_id, "f.png", path);
        let err = orchestrator.submit(image.id).await.unwrap_err();
        assert!(matches!(err, AppError::MissingStoragePath(_)), "{err:?}");
    }

    assert!(ctx.analyses.all().is_empty());
    assert!(extractor.calls().is_empty());
}

#[tokio::test]
async fn test_unauthenticated_caller_is_rejected() {
    let ctx = TestContext::new().await;
    let image = ctx.seed_image(ctx.user_id, "f.png", Some("u1/f.png"));
    let orchestrator = ctx.orchestrator_with(
        None,
        ctx.storage.clone(),
        ctx.recording.clone(),
        ScriptedExtractor::returning("{}"),
    );

    let err = orchestrator.submit(image.id).await.unwrap_err();
    assert!(matches!(err, AppError::Unauthenticated(_)));
    let err = orchestrator.get_status(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AppError::Unauthenticated(_)));
    let err = orchestrator.compare(image.id, image.id).await.unwrap_err();
    assert!(matches!(err, AppError::Unauthenticated(_)));
    assert!(ctx.analyses.all().is_empty());
}

#[tokio::test]
async fn test_foreign_image_is_invisible_under_row_security() {
    let ctx = TestContext::new().await;
    let foreign = ctx.seed_image(Uuid::new_v4(), "f.png", Some("u2/f.png"));
    ctx.put_object("u2/f.png", b"12345");
    let orchestrator = ctx.orchestrator(ScriptedExtractor::returning("{}"));

    let err = orchestrator.submit(foreign.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)), "{err:?}");
    assert!(ctx.analyses.all().is_empty());
}

#[tokio::test]
async fn test_foreign_image_is_forbidden_when_visible() {
    let ctx = TestContext::without_row_security().await;
    let foreign = ctx.seed_image(Uuid::new_v4(), "f.png", Some("u2/f.png"));
    ctx.put_object("u2/f.png", b"12345");
    let extractor = ScriptedExtractor::returning("{}");
    let orchestrator = ctx.orchestrator(extractor.clone());

    let err = orchestrator.submit(foreign.id).await.unwrap_err();
    match err {
        AppError::Forbidden(message) => assert_eq!(message, "You do not own this image."),
        other => panic!("expected Forbidden, got {other:?}"),
    }
    assert!(ctx.analyses.all().is_empty());
    assert!(extractor.calls().is_empty());
}

#[tokio::test]
async fn test_download_failure_marks_analysis_failed() {
    let ctx = TestContext::new().await;
    let image = ctx.seed_image(ctx.user_id, "f.png", Some("u1/f.png"));
    let extractor = ScriptedExtractor::returning("{}");
    let orchestrator = ctx.orchestrator_with(
        Some(ctx.caller()),
        FixedUrlStore::new("file:///nonexistent/metadetect/f.png"),
        ctx.recording.clone(),
        extractor.clone(),
    );

    let started = orchestrator.submit(image.id).await.unwrap();

    let status = orchestrator.get_status(started.analysis_id).await.unwrap();
    assert_eq!(status.status, AnalysisStatus::Failed);
    let manifest = orchestrator.get_manifest(started.analysis_id).await.unwrap();
    assert!(!error_message(&manifest.manifest_json).is_empty());
    assert!(extractor.calls().is_empty());
    assert_eq!(ctx.work_dir_entries(), 0);
}

#[tokio::test]
async fn test_empty_download_marks_analysis_failed() {
    let ctx = TestContext::new().await;
    let image = ctx.seed_image(ctx.user_id, "f.png", Some("u1/f.png"));
    ctx.put_object("u1/f.png", b"");
    let extractor = ScriptedExtractor::returning("{}");
    let orchestrator = ctx.orchestrator(extractor.clone());

    let started = orchestrator.submit(image.id).await.unwrap();

    let manifest = orchestrator.get_manifest(started.analysis_id).await.unwrap();
    assert_eq!(error_message(&manifest.manifest_json), "downloaded file is empty");
    assert!(extractor.calls().is_empty());
    assert_eq!(ctx.work_dir_entries(), 0);
}

#[tokio::test]
async fn test_missing_object_marks_analysis_failed() {
    let ctx = TestContext::new().await;
    let image = ctx.seed_image(ctx.user_id, "f.png", Some("u1/gone.png"));
    let orchestrator = ctx.orchestrator(ScriptedExtractor::returning("{}"));

    let started = orchestrator.submit(image.id).await.unwrap();

    let status = orchestrator.get_status(started.analysis_id).await.unwrap();
    assert_eq!(status.status, AnalysisStatus::Failed);
}

#[tokio::test]
async fn test_extractor_failure_marks_analysis_failed() {
    let ctx = TestContext::new().await;
    let image = ctx.seed_image(ctx.user_id, "f.png", Some("u1/f.png"));
    ctx.put_object("u1/f.png", b"12345");
    let extractor = ScriptedExtractor::failing(1, "no claim found");
    let orchestrator = ctx.orchestrator(extractor.clone());

    let started = orchestrator.submit(image.id).await.unwrap();

    let status = orchestrator.get_status(started.analysis_id).await.unwrap();
    assert_eq!(status.status, AnalysisStatus::Failed);
    assert_eq!(status.score, None);
    let manifest = orchestrator.get_manifest(started.analysis_id).await.unwrap();
    assert_eq!(
        error_message(&manifest.manifest_json),
        "C2PA tool failed with exit code 1: stderr: no claim found"
    );
    assert_eq!(extractor.calls().len(), 1);
    assert_eq!(ctx.work_dir_entries(), 0);
}

#[tokio::test]
async fn test_blank_extractor_output_marks_analysis_failed() {
    let ctx = TestContext::new().await;
    let image = ctx.seed_image(ctx.user_id, "f.png", Some("u1/f.png"));
    ctx.put_object("u1/f.png", b"12345");

    for output in ["", " \n"] {
        let orchestrator = ctx.orchestrator(ScriptedExtractor::returning(output));
        let started = orchestrator.submit(image.id).await.unwrap();

        let status = orchestrator.get_status(started.analysis_id).await.unwrap();
        assert_eq!(status.status, AnalysisStatus::Failed);
        let manifest = orchestrator.get_manifest(started.analysis_id).await.unwrap();
        assert_eq!(
            error_message(&manifest.manifest_json),
            "C2PA tool produced no manifest output"
        );
    }
    assert_eq!(ctx.work_dir_entries(), 0);
}

#[tokio::test]
async fn test_panicking_extractor_marks_analysis_failed() {
    let ctx = TestContext::new().await;
    let image = ctx.seed_image(ctx.user_id, "f.png", Some("u1/f.png"));
    ctx.put_object("u1/f.png", b"12345");
    let orchestrator = ctx.orchestrator(ScriptedExtractor::panicking("decoder blew up"));

    let started = orchestrator.submit(image.id).await.unwrap();

    let records = ctx.analyses.all();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, started.analysis_id);
    assert_eq!(records[0].status, AnalysisStatus::Failed);
    let manifest = orchestrator.get_manifest(started.analysis_id).await.unwrap();
    assert_eq!(
        error_message(&manifest.manifest_json),
        "extraction panicked: decoder blew up"
    );
    assert_eq!(ctx.recording.completion_count(), 1);
    assert_eq!(ctx.work_dir_entries(), 0);
}

#[tokio::test]
async fn test_long_failure_message_is_truncated() {
    let ctx = TestContext::new().await;
    let image = ctx.seed_image(ctx.user_id, "f.png", Some("u1/f.png"));
    ctx.put_object("u1/f.png", b"12345");
    let orchestrator = ctx.orchestrator(ScriptedExtractor::failing(2, &"x".repeat(3000)));

    let started = orchestrator.submit(image.id).await.unwrap();

    let manifest = orchestrator.get_manifest(started.analysis_id).await.unwrap();
    let message = error_message(&manifest.manifest_json);
    assert_eq!(message.chars().count(), MAX_ERROR_MESSAGE_CHARS);
    assert!(message.starts_with("C2PA tool failed with exit code 2"));
}

#[tokio::test]
async fn test_each_submit_writes_one_terminal_state() {
    let ctx = TestContext::new().await;
    let image = ctx.seed_image(ctx.user_id, "f.png", Some("u1/f.png"));
    ctx.put_object("u1/f.png", b"12345");
    let orchestrator = ctx.orchestrator(ScriptedExtractor::returning("{}"));

    let first = orchestrator.submit(image.id).await.unwrap();
    let second = orchestrator.submit(image.id).await.unwrap();

    assert_ne!(first.analysis_id, second.analysis_id);
    assert_eq!(ctx.recording.completion_count(), 2);
    for record in ctx.analyses.all() {
        assert_eq!(record.status, AnalysisStatus::Done);
        assert_eq!(record.details.is_some(), record.status != AnalysisStatus::Pending);
    }
}

#[tokio::test]
async fn test_terminal_write_failure_still_returns_id() {
    let ctx = TestContext::new().await;
    let image = ctx.seed_image(ctx.user_id, "f.png", Some("u1/f.png"));
    ctx.put_object("u1/f.png", b"12345");
    ctx.recording.fail_completions();
    let orchestrator = ctx.orchestrator(ScriptedExtractor::returning("{}"));

    let started = orchestrator.submit(image.id).await.unwrap();

    let status = orchestrator.get_status(started.analysis_id).await.unwrap();
    assert_eq!(status.status, AnalysisStatus::Pending);
    assert_eq!(ctx.recording.completion_count(), 1);
    assert_eq!(ctx.work_dir_entries(), 0);
}

#[tokio::test]
async fn test_pending_analysis_has_no_manifest() {
    let ctx = TestContext::new().await;
    let image = ctx.seed_image(ctx.user_id, "f.png", Some("u1/f.png"));
    let pending = AnalysisRecord::pending(image.id, fixed_time());
    ctx.analyses.seed(pending.clone());
    let orchestrator = ctx.orchestrator(ScriptedExtractor::returning("{}"));

    let status = orchestrator.get_status(pending.id).await.unwrap();
    assert_eq!(status.status, AnalysisStatus::Pending);
    let err = orchestrator.get_manifest(pending.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_unknown_analysis_is_not_found() {
    let ctx = TestContext::new().await;
    let orchestrator = ctx.orchestrator(ScriptedExtractor::returning("{}"));

    let err = orchestrator.get_status(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    let err = orchestrator.get_manifest(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_other_users_analysis_is_not_visible() {
    let ctx = TestContext::new().await;
    let image = ctx.seed_image(ctx.user_id, "f.png", Some("u1/f.png"));
    ctx.put_object("u1/f.png", b"12345");
    let orchestrator = ctx.orchestrator(ScriptedExtractor::returning("{}"));
    let started = orchestrator.submit(image.id).await.unwrap();

    let intruder = ctx.orchestrator_with(
        Some(CallerIdentity::new(Uuid::new_v4(), "other-bearer")),
        ctx.storage.clone(),
        ctx.recording.clone(),
        ScriptedExtractor::returning("{}"),
    );
    let err = intruder.get_status(started.analysis_id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    let err = intruder.get_manifest(started.analysis_id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_compare_checks_left_image_first() {
    let ctx = TestContext::without_row_security().await;
    let foreign = ctx.seed_image(Uuid::new_v4(), "f.png", Some("u2/f.png"));
    let own = ctx.seed_image(ctx.user_id, "g.png", Some("u1/g.png"));
    let orchestrator = ctx.orchestrator(ScriptedExtractor::returning("{}"));

    let err = orchestrator.compare(foreign.id, Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)), "{err:?}");

    let err = orchestrator.compare(own.id, Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)), "{err:?}");

    let err = orchestrator.compare(own.id, foreign.id).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)), "{err:?}");
}

#[tokio::test]
async fn test_compare_returns_placeholder() {
    let ctx = TestContext::new().await;
    let left = ctx.seed_image(ctx.user_id, "a.png", Some("u1/a.png"));
    let right = ctx.seed_image(ctx.user_id, "b.png", Some("u1/b.png"));
    let orchestrator = ctx.orchestrator(ScriptedExtractor::returning("{}"));

    let response = orchestrator.compare(left.id, right.id).await.unwrap();
    assert_eq!(response.status, AnalysisStatus::Pending);
    assert_eq!(response.similarity, None);
    assert_eq!(response.note, "Similarity analysis not yet implemented");
    assert!(ctx.analyses.all().is_empty());
}

#[tokio::test]
async fn test_history_is_newest_first() {
    let ctx = TestContext::new().await;
    let image = ctx.seed_image(ctx.user_id, "f.png", Some("u1/f.png"));
    ctx.put_object("u1/f.png", b"12345");
    let orchestrator = ctx.orchestrator(ScriptedExtractor::returning("{}"));

    let err = orchestrator.latest_for_image(image.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let first = orchestrator.submit(image.id).await.unwrap();
    let second = orchestrator.submit(image.id).await.unwrap();

    let history = orchestrator.list_for_image(image.id).await.unwrap();
    let ids: Vec<Uuid> = history.iter().map(|record| record.id).collect();
    assert_eq!(ids, vec![second.analysis_id, first.analysis_id]);

    let latest = orchestrator.latest_for_image(image.id).await.unwrap();
    assert_eq!(latest.id, second.analysis_id);
}
