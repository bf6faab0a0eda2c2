use anyhow::Result;
use pipewatch_common::defaults::MAX_IMAGE_BATCH;
use pipewatch_deployer::aws::AwsError;
use pipewatch_deployer::registry::{BatchDeleteOutcome, ImageReference, RegistryOperations};
use std::sync::Mutex;

#[derive(Default)]
struct RegistryState {
    exists: bool,
    images: Vec<ImageReference>,
}

/// Registry with an in-memory image list
///
/// Like the real service, a plain delete fails while images remain.
#[derive(Default)]
pub struct FakeRegistry {
    state: Mutex<RegistryState>,
    force_delete_fails: bool,
    plain_delete_fails: bool,
    list_fails: bool,
    batch_sizes: Mutex<Vec<usize>>,
    delete_calls: Mutex<Vec<bool>>,
}

impl FakeRegistry {
    /// No registry at all
    pub fn absent() -> Self {
        Self::default()
    }

    /// A registry holding `count` untagged images
    pub fn with_images(count: usize) -> Self {
        let images = (0..count)
            .map(|i| ImageReference {
                digest: Some(format!("sha256:{i:064x}")),
                tag: None,
            })
            .collect();
        Self {
            state: Mutex::new(RegistryState {
                exists: true,
                images,
            }),
            ..Self::default()
        }
    }

    /// Forced deletes are rejected (e.g. missing permission)
    pub fn force_delete_fails(mut self) -> Self {
        self.force_delete_fails = true;
        self
    }

    /// Plain deletes fail even when empty
    pub fn plain_delete_fails(mut self) -> Self {
        self.plain_delete_fails = true;
        self
    }

    pub fn list_fails(mut self) -> Self {
        self.list_fails = true;
        self
    }

    pub fn exists(&self) -> bool {
        self.state.lock().unwrap().exists
    }

    pub fn image_count(&self) -> usize {
        self.state.lock().unwrap().images.len()
    }

    /// Size of every batch delete call
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes.lock().unwrap().clone()
    }

    /// `force` flag of every delete call
    pub fn delete_calls(&self) -> Vec<bool> {
        self.delete_calls.lock().unwrap().clone()
    }
}

impl RegistryOperations for FakeRegistry {
    async fn repository_exists(&self, _name: &str) -> Result<bool> {
        Ok(self.exists())
    }

    async fn delete_repository(&self, name: &str, force: bool) -> Result<()> {
        self.delete_calls.lock().unwrap().push(force);
        let mut state = self.state.lock().unwrap();

        if !state.exists {
            return Err(AwsError::NotFound {
                message: format!("repository {name} not found"),
            }
            .into());
        }
        if force && self.force_delete_fails {
            return Err(AwsError::AccessDenied {
                code: "AccessDeniedException".to_string(),
                message: "not authorized to force delete".to_string(),
            }
            .into());
        }
        if !force && (self.plain_delete_fails || !state.images.is_empty()) {
            return Err(AwsError::NotEmpty {
                message: format!("repository {name} still contains images"),
            }
            .into());
        }

        state.exists = false;
        state.images.clear();
        Ok(())
    }

    async fn list_images(&self, _name: &str) -> Result<Vec<ImageReference>> {
        if self.list_fails {
            anyhow::bail!("ListImages throttled");
        }
        Ok(self.state.lock().unwrap().images.clone())
    }

    async fn batch_delete_images(
        &self,
        _name: &str,
        images: &[ImageReference],
    ) -> Result<BatchDeleteOutcome> {
        self.batch_sizes.lock().unwrap().push(images.len());
        if images.len() > MAX_IMAGE_BATCH {
            anyhow::bail!("InvalidParameterException: at most {MAX_IMAGE_BATCH} image ids");
        }

        let mut state = self.state.lock().unwrap();
        let before = state.images.len();
        state.images.retain(|image| !images.contains(image));

        Ok(BatchDeleteOutcome {
            deleted: before - state.images.len(),
            failures: Vec::new(),
        })
    }
}
