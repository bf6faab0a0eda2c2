//! Registry cleaner behavior against an in-memory registry

use pipewatch_deployer::RegistryError;
use pipewatch_deployer::registry::{RegistryCleaner, RegistryCleanup};
use pipewatch_test_utils::FakeRegistry;

const REGISTRY: &str = "pipeline-agent";

#[tokio::test]
async fn test_missing_registry_is_success() {
    let cleaner = RegistryCleaner::new(FakeRegistry::absent());

    let outcome = cleaner.clean_registry(REGISTRY).await.unwrap();

    assert_eq!(outcome, RegistryCleanup::NotFound);
    assert!(cleaner.api().delete_calls().is_empty());
}

#[tokio::test]
async fn test_force_delete_first() {
    let cleaner = RegistryCleaner::new(FakeRegistry::with_images(5));

    let outcome = cleaner.clean_registry(REGISTRY).await.unwrap();

    assert_eq!(
        outcome,
        RegistryCleanup::Deleted {
            forced: true,
            images_removed: 0
        }
    );
    assert_eq!(cleaner.api().delete_calls(), vec![true]);
    assert!(cleaner.api().batch_sizes().is_empty());
    assert!(!cleaner.api().exists());
}

#[tokio::test]
async fn test_fallback_deletes_in_batches() {
    let cleaner = RegistryCleaner::new(FakeRegistry::with_images(250).force_delete_fails());

    let outcome = cleaner.clean_registry(REGISTRY).await.unwrap();

    assert_eq!(
        outcome,
        RegistryCleanup::Deleted {
            forced: false,
            images_removed: 250
        }
    );
    assert_eq!(cleaner.api().batch_sizes(), vec![100, 100, 50]);
    assert_eq!(cleaner.api().delete_calls(), vec![true, false]);
    assert!(!cleaner.api().exists());
}

#[tokio::test]
async fn test_exactly_one_batch_boundary() {
    for (count, batches) in [(100, 1), (101, 2)] {
        let cleaner = RegistryCleaner::new(FakeRegistry::with_images(count).force_delete_fails());
        cleaner.clean_registry(REGISTRY).await.unwrap();
        assert_eq!(cleaner.api().batch_sizes().len(), batches, "{count} images");
    }
}

#[tokio::test]
async fn test_smaller_batch_size() {
    let cleaner = RegistryCleaner::new(FakeRegistry::with_images(7).force_delete_fails())
        .with_batch_size(3)
        .unwrap();

    cleaner.clean_registry(REGISTRY).await.unwrap();
    assert_eq!(cleaner.api().batch_sizes(), vec![3, 3, 1]);
}

#[test]
fn test_batch_size_above_limit_rejected() {
    let result = RegistryCleaner::new(FakeRegistry::absent()).with_batch_size(101);
    assert!(matches!(
        result,
        Err(RegistryError::InvalidBatchSize { size: 101, max: 100 })
    ));
}

#[tokio::test]
async fn test_listing_failure_still_attempts_final_delete() {
    let cleaner = RegistryCleaner::new(
        FakeRegistry::with_images(3)
            .force_delete_fails()
            .list_fails(),
    );

    let err = cleaner.clean_registry(REGISTRY).await.unwrap_err();

    assert_eq!(cleaner.api().delete_calls(), vec![true, false]);
    assert!(cleaner.api().batch_sizes().is_empty());
    match err {
        RegistryError::DeleteFailed { name, .. } => assert_eq!(name, REGISTRY),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_final_delete_failure_names_registry() {
    let cleaner = RegistryCleaner::new(
        FakeRegistry::with_images(2)
            .force_delete_fails()
            .plain_delete_fails(),
    );

    let err = cleaner.clean_registry(REGISTRY).await.unwrap_err();

    assert!(err.to_string().contains(REGISTRY));
    assert_eq!(cleaner.api().image_count(), 0);
}

#[tokio::test]
async fn test_clean_twice_is_idempotent() {
    let cleaner = RegistryCleaner::new(FakeRegistry::with_images(120).force_delete_fails());

    let first = cleaner.clean_registry(REGISTRY).await.unwrap();
    let second = cleaner.clean_registry(REGISTRY).await.unwrap();

    assert!(matches!(first, RegistryCleanup::Deleted { .. }));
    assert_eq!(second, RegistryCleanup::NotFound);
}
