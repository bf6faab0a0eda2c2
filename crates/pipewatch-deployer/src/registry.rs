//! Container registry cleanup
//!
//! A registry that still holds images cannot be deleted directly. The
//! cleaner tries a forced delete first, then falls back to removing the
//! images in batches and deleting the emptied registry.

use crate::aws::EcrClient;
use crate::aws::error::classify_anyhow_error;
use crate::error::RegistryError;
use anyhow::Result;
use pipewatch_common::defaults::MAX_IMAGE_BATCH;
use tracing::{info, warn};

/// One image in a registry, by digest and/or tag
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageReference {
    pub digest: Option<String>,
    pub tag: Option<String>,
}

impl std::fmt::Display for ImageReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.tag, &self.digest) {
            (Some(tag), _) => write!(f, "{tag}"),
            (None, Some(digest)) => write!(f, "{digest}"),
            (None, None) => write!(f, "<unknown>"),
        }
    }
}

/// An image the service refused to delete
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFailure {
    pub image: ImageReference,
    pub code: Option<String>,
    pub reason: Option<String>,
}

/// Result of one batch deletion call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchDeleteOutcome {
    pub deleted: usize,
    pub failures: Vec<ImageFailure>,
}

/// Registry operations used during cleanup
#[allow(async_fn_in_trait)]
pub trait RegistryOperations: Send + Sync {
    async fn repository_exists(&self, name: &str) -> Result<bool>;

    async fn delete_repository(&self, name: &str, force: bool) -> Result<()>;

    async fn list_images(&self, name: &str) -> Result<Vec<ImageReference>>;

    /// Delete at most [`MAX_IMAGE_BATCH`] images
    async fn batch_delete_images(
        &self,
        name: &str,
        images: &[ImageReference],
    ) -> Result<BatchDeleteOutcome>;
}

impl RegistryOperations for EcrClient {
    async fn repository_exists(&self, name: &str) -> Result<bool> {
        EcrClient::repository_exists(self, name).await
    }

    async fn delete_repository(&self, name: &str, force: bool) -> Result<()> {
        EcrClient::delete_repository(self, name, force).await
    }

    async fn list_images(&self, name: &str) -> Result<Vec<ImageReference>> {
        EcrClient::list_images(self, name).await
    }

    async fn batch_delete_images(
        &self,
        name: &str,
        images: &[ImageReference],
    ) -> Result<BatchDeleteOutcome> {
        EcrClient::batch_delete_images(self, name, images).await
    }
}

/// Split images into batches no larger than `batch_size`
///
/// Sizes outside `1..=MAX_IMAGE_BATCH` are rejected rather than clamped.
pub fn image_batches(
    images: &[ImageReference],
    batch_size: usize,
) -> Result<Vec<&[ImageReference]>, RegistryError> {
    if batch_size == 0 || batch_size > MAX_IMAGE_BATCH {
        return Err(RegistryError::InvalidBatchSize {
            size: batch_size,
            max: MAX_IMAGE_BATCH,
        });
    }
    Ok(images.chunks(batch_size).collect())
}

/// What the cleaner found and did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryCleanup {
    /// The registry did not exist
    NotFound,
    /// The registry was deleted
    Deleted {
        /// True when the forced delete succeeded on the first try
        forced: bool,
        images_removed: usize,
    },
}

/// Deletes a registry and everything in it
pub struct RegistryCleaner<R> {
    api: R,
    batch_size: usize,
}

impl<R: RegistryOperations> RegistryCleaner<R> {
    pub fn new(api: R) -> Self {
        Self {
            api,
            batch_size: MAX_IMAGE_BATCH,
        }
    }

    /// Use a smaller batch size
    pub fn with_batch_size(mut self, batch_size: usize) -> Result<Self, RegistryError> {
        image_batches(&[], batch_size)?;
        self.batch_size = batch_size;
        Ok(self)
    }

    pub fn api(&self) -> &R {
        &self.api
    }

    /// Remove a registry and all of its images
    ///
    /// A registry that does not exist is a success. Failures while listing or
    /// deleting images are logged and the final delete is still attempted;
    /// only that final delete failing is an error.
    pub async fn clean_registry(&self, name: &str) -> Result<RegistryCleanup, RegistryError> {
        match self.api.repository_exists(name).await {
            Ok(false) => {
                info!(registry = %name, "Registry does not exist, nothing to clean");
                return Ok(RegistryCleanup::NotFound);
            }
            Ok(true) => {}
            Err(e) => warn!(registry = %name, error = ?e, "Could not check registry, attempting delete"),
        }

        match self.api.delete_repository(name, true).await {
            Ok(()) => {
                info!(registry = %name, "Registry force-deleted");
                return Ok(RegistryCleanup::Deleted {
                    forced: true,
                    images_removed: 0,
                });
            }
            Err(e) if classify_anyhow_error(&e).is_not_found() => {
                return Ok(RegistryCleanup::NotFound);
            }
            Err(e) => {
                warn!(registry = %name, error = %e, "Force delete failed, removing images first");
            }
        }

        let images = match self.api.list_images(name).await {
            Ok(images) => images,
            Err(e) => {
                warn!(registry = %name, error = %e, "Failed to list images, assuming none");
                Vec::new()
            }
        };

        let mut images_removed = 0;
        for (index, batch) in image_batches(&images, self.batch_size)?.into_iter().enumerate() {
            match self.api.batch_delete_images(name, batch).await {
                Ok(outcome) => {
                    images_removed += outcome.deleted;
                    info!(
                        registry = %name,
                        batch = index + 1,
                        deleted = outcome.deleted,
                        failed = outcome.failures.len(),
                        "Deleted image batch"
                    );
                    for failure in &outcome.failures {
                        warn!(
                            registry = %name,
                            image = %failure.image,
                            code = failure.code.as_deref().unwrap_or("unknown"),
                            reason = failure.reason.as_deref().unwrap_or(""),
                            "Image was not deleted"
                        );
                    }
                }
                Err(e) => {
                    warn!(registry = %name, batch = index + 1, size = batch.len(), error = %e, "Image batch delete failed");
                }
            }
        }

        match self.api.delete_repository(name, false).await {
            Ok(()) => {
                info!(registry = %name, images_removed, "Registry deleted");
                Ok(RegistryCleanup::Deleted {
                    forced: false,
                    images_removed,
                })
            }
            Err(e) if classify_anyhow_error(&e).is_not_found() => Ok(RegistryCleanup::NotFound),
            Err(source) => Err(RegistryError::DeleteFailed {
                name: name.to_string(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn images(n: usize) -> Vec<ImageReference> {
        (0..n)
            .map(|i| ImageReference {
                digest: Some(format!("sha256:{i:064x}")),
                tag: None,
            })
            .collect()
    }

    #[test]
    fn test_batch_counts() {
        for (count, expected) in [(0, 0), (1, 1), (100, 1), (101, 2), (250, 3)] {
            let imgs = images(count);
            let batches = image_batches(&imgs, MAX_IMAGE_BATCH).unwrap();
            assert_eq!(batches.len(), expected, "{count} images");
        }
    }

    #[test]
    fn test_batch_sizes_for_250() {
        let imgs = images(250);
        let sizes: Vec<usize> = image_batches(&imgs, MAX_IMAGE_BATCH)
            .unwrap()
            .iter()
            .map(|b| b.len())
            .collect();
        assert_eq!(sizes, vec![100, 100, 50]);
    }

    #[test]
    fn test_oversized_batch_rejected() {
        let imgs = images(3);
        assert!(matches!(
            image_batches(&imgs, MAX_IMAGE_BATCH + 1),
            Err(RegistryError::InvalidBatchSize { size: 101, .. })
        ));
        assert!(image_batches(&imgs, 0).is_err());
    }

    #[test]
    fn test_image_display_prefers_tag() {
        let image = ImageReference {
            digest: Some("sha256:abc".to_string()),
            tag: Some("1700000000".to_string()),
        };
        assert_eq!(image.to_string(), "1700000000");
        assert_eq!(ImageReference::default().to_string(), "<unknown>");
    }

    proptest! {
        #[test]
        fn batches_cover_all_images_within_limit(count in 0usize..1000, size in 1usize..=MAX_IMAGE_BATCH) {
            let imgs = images(count);
            let batches = image_batches(&imgs, size).unwrap();

            prop_assert!(batches.iter().all(|b| !b.is_empty() && b.len() <= size));
            prop_assert_eq!(batches.iter().map(|b| b.len()).sum::<usize>(), count);
            prop_assert_eq!(batches.len(), count.div_ceil(size));
        }
    }
}
