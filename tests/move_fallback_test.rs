use std::sync::Arc;
use tempfile::TempDir;
use upload_finalizer::config::FinalizerConfig;
use upload_finalizer::models::{CompletedUpload, Sidecar, UploadMetadata};
use upload_finalizer::services::finalizer::{
    FinalizeError, FinalizeOutcome, FinalizerService, MoveStrategy,
};
use upload_finalizer::services::usage::NoOpNotifier;

fn test_config(staging: &TempDir, store: &TempDir) -> FinalizerConfig {
    FinalizerConfig {
        staging_dir: staging.path().to_path_buf(),
        storage_root: store.path().to_path_buf(),
        ..FinalizerConfig::development()
    }
}

fn stage_upload(config: &FinalizerConfig, id: &str, content: &[u8]) -> CompletedUpload {
    let metadata = UploadMetadata {
        filename: Some(format!("{id}.bin")),
        relative_path: None,
        target_path: None,
        filetype: None,
    };
    std::fs::write(config.blob_path(id), content).unwrap();
    let sidecar = Sidecar {
        id: id.to_string(),
        size: content.len() as i64,
        offset: Some(content.len() as i64),
        metadata: metadata.clone(),
    };
    std::fs::write(
        config.sidecar_path(id),
        serde_json::to_vec(&sidecar).unwrap(),
    )
    .unwrap();

    CompletedUpload {
        id: id.to_string(),
        size: content.len() as i64,
        metadata,
    }
}

#[tokio::test]
async fn test_copy_tier_places_and_removes_source() {
    let staging = TempDir::new().unwrap();
    let store = TempDir::new().unwrap();
    let config = test_config(&staging, &store);

    // Rename tier disabled, as if the volumes differed
    let finalizer = Arc::new(
        FinalizerService::new(config.clone(), Arc::new(NoOpNotifier))
            .with_move_strategies(vec![MoveStrategy::Copy]),
    );

    let upload = stage_upload(&config, "copy-tier", b"copied across volumes");
    let outcome = finalizer.finalize(&upload).await.unwrap();

    let placed = store.path().join("copy-tier.bin");
    assert_eq!(outcome, FinalizeOutcome::FilePlaced(placed.clone()));
    assert_eq!(std::fs::read(&placed).unwrap(), b"copied across volumes");
    assert!(!config.blob_path("copy-tier").exists());
    assert!(!config.sidecar_path("copy-tier").exists());
}

#[tokio::test]
async fn test_external_copy_tier_places_and_removes_source() {
    let staging = TempDir::new().unwrap();
    let store = TempDir::new().unwrap();
    let config = test_config(&staging, &store);

    let finalizer = Arc::new(
        FinalizerService::new(config.clone(), Arc::new(NoOpNotifier))
            .with_move_strategies(vec![MoveStrategy::ExternalCopy]),
    );

    let upload = stage_upload(&config, "ext-tier", b"copied by cp -a");
    let outcome = finalizer.finalize(&upload).await.unwrap();

    let placed = store.path().join("ext-tier.bin");
    assert_eq!(outcome, FinalizeOutcome::FilePlaced(placed.clone()));
    assert_eq!(std::fs::read(&placed).unwrap(), b"copied by cp -a");
    assert!(!config.blob_path("ext-tier").exists());
}

#[tokio::test]
async fn test_size_mismatch_aborts_and_retains_source() {
    let staging = TempDir::new().unwrap();
    let store = TempDir::new().unwrap();
    // "touch -a src dst" exits 0 but creates an empty destination, so the
    // shared verification sees a truncated copy
    let config = FinalizerConfig {
        copy_command: "touch".to_string(),
        ..test_config(&staging, &store)
    };

    let finalizer = Arc::new(
        FinalizerService::new(config.clone(), Arc::new(NoOpNotifier))
            .with_move_strategies(vec![MoveStrategy::ExternalCopy]),
    );

    let upload = stage_upload(&config, "mismatch", b"full payload");
    let err = finalizer.finalize(&upload).await.unwrap_err();

    match err {
        FinalizeError::SizeMismatch { expected, actual } => {
            assert_eq!(expected, 12);
            assert_eq!(actual, 0);
        }
        other => panic!("expected SizeMismatch, got {other}"),
    }

    // The source survives a bad copy, and the sidecar stays for recovery
    assert_eq!(
        std::fs::read(config.blob_path("mismatch")).unwrap(),
        b"full payload"
    );
    assert!(config.sidecar_path("mismatch").exists());
}

#[tokio::test]
async fn test_all_tiers_failing_is_move_exhausted() {
    let staging = TempDir::new().unwrap();
    let store = TempDir::new().unwrap();
    // "false" ignores its arguments and fails, standing in for a copy
    // utility that cannot reach the destination volume
    let config = FinalizerConfig {
        copy_command: "false".to_string(),
        ..test_config(&staging, &store)
    };

    let finalizer = Arc::new(
        FinalizerService::new(config.clone(), Arc::new(NoOpNotifier))
            .with_move_strategies(vec![MoveStrategy::ExternalCopy]),
    );

    let upload = stage_upload(&config, "exhausted", b"stuck in staging");
    let err = finalizer.finalize(&upload).await.unwrap_err();
    assert!(matches!(err, FinalizeError::MoveExhausted { .. }));

    // Fatal for this upload, but the blob stays put for manual inspection
    assert_eq!(
        std::fs::read(config.blob_path("exhausted")).unwrap(),
        b"stuck in staging"
    );
    assert!(config.sidecar_path("exhausted").exists());
}

#[tokio::test]
async fn test_default_chain_uses_rename_fast_path() {
    let staging = TempDir::new().unwrap();
    let store = TempDir::new().unwrap();
    let config = test_config(&staging, &store);

    let finalizer = Arc::new(FinalizerService::new(config.clone(), Arc::new(NoOpNotifier)));
    assert_eq!(finalizer.config().copy_command, "cp");

    let upload = stage_upload(&config, "renamed", b"same volume");
    let outcome = finalizer.finalize(&upload).await.unwrap();

    assert_eq!(
        outcome,
        FinalizeOutcome::FilePlaced(store.path().join("renamed.bin"))
    );
    assert!(!config.blob_path("renamed").exists());
}
