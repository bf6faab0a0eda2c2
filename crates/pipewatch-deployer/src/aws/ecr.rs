//! ECR repository, image and login operations

use crate::aws::context::AwsContext;
use crate::aws::error::AwsError;
use crate::registry::{BatchDeleteOutcome, ImageFailure, ImageReference};
use anyhow::{Context, Result};
use aws_sdk_ecr::Client;
use aws_sdk_ecr::types::ImageIdentifier;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::{debug, info};

/// ECR client for the agent image registry
pub struct EcrClient {
    client: Client,
    region: String,
}

/// Docker registry login obtained from ECR
#[derive(Clone)]
pub struct RegistryCredentials {
    pub username: String,
    pub password: String,
    /// Registry endpoint, e.g. `https://123456789012.dkr.ecr.us-east-1.amazonaws.com`
    pub endpoint: String,
}

impl std::fmt::Debug for RegistryCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryCredentials")
            .field("username", &self.username)
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl EcrClient {
    /// Create a new ECR client
    pub async fn new(region: &str) -> Result<Self> {
        let ctx = AwsContext::new(region).await;
        Ok(Self::from_context(&ctx))
    }

    /// Create an ECR client from a pre-loaded AWS context
    pub fn from_context(ctx: &AwsContext) -> Self {
        Self {
            client: ctx.ecr_client(),
            region: ctx.region().to_string(),
        }
    }

    /// Check whether a repository exists
    pub async fn repository_exists(&self, name: &str) -> Result<bool> {
        let result = self
            .client
            .describe_repositories()
            .repository_names(name)
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(e) => {
                let err = AwsError::from_sdk(&e);
                if err.is_not_found() {
                    Ok(false)
                } else {
                    Err(err).context("Failed to describe repository")
                }
            }
        }
    }

    /// Delete a repository, optionally together with its images
    pub async fn delete_repository(&self, name: &str, force: bool) -> Result<()> {
        info!(repository = %name, region = %self.region, force, "Deleting ECR repository");

        self.client
            .delete_repository()
            .repository_name(name)
            .force(force)
            .send()
            .await
            .map_err(|e| AwsError::from_sdk(&e))
            .context("Failed to delete repository")?;

        Ok(())
    }

    /// List every image in a repository, following pagination
    pub async fn list_images(&self, name: &str) -> Result<Vec<ImageReference>> {
        let mut images = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let mut request = self.client.list_images().repository_name(name);
            if let Some(token) = &next_token {
                request = request.next_token(token);
            }

            let response = request
                .send()
                .await
                .map_err(|e| AwsError::from_sdk(&e))
                .context("Failed to list images")?;

            images.extend(response.image_ids().iter().map(|id| ImageReference {
                digest: id.image_digest().map(str::to_string),
                tag: id.image_tag().map(str::to_string),
            }));

            match response.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }

        debug!(repository = %name, count = images.len(), "Listed images");
        Ok(images)
    }

    /// Delete one batch of images
    ///
    /// ECR accepts at most 100 identifiers per call; callers partition first.
    pub async fn batch_delete_images(
        &self,
        name: &str,
        images: &[ImageReference],
    ) -> Result<BatchDeleteOutcome> {
        let ids: Vec<ImageIdentifier> = images
            .iter()
            .map(|image| {
                ImageIdentifier::builder()
                    .set_image_digest(image.digest.clone())
                    .set_image_tag(image.tag.clone())
                    .build()
            })
            .collect();

        let response = self
            .client
            .batch_delete_image()
            .repository_name(name)
            .set_image_ids(Some(ids))
            .send()
            .await
            .map_err(|e| AwsError::from_sdk(&e))
            .context("Failed to batch delete images")?;

        let failures = response
            .failures()
            .iter()
            .map(|failure| ImageFailure {
                image: failure
                    .image_id()
                    .map(|id| ImageReference {
                        digest: id.image_digest().map(str::to_string),
                        tag: id.image_tag().map(str::to_string),
                    })
                    .unwrap_or_default(),
                code: failure.failure_code().map(|c| c.as_str().to_string()),
                reason: failure.failure_reason().map(str::to_string),
            })
            .collect();

        Ok(BatchDeleteOutcome {
            deleted: response.image_ids().len(),
            failures,
        })
    }

    /// Fetch a docker login for the account's registry
    pub async fn registry_login(&self) -> Result<RegistryCredentials> {
        let response = self
            .client
            .get_authorization_token()
            .send()
            .await
            .map_err(|e| AwsError::from_sdk(&e))
            .context("Failed to get ECR authorization token")?;

        let data = response
            .authorization_data()
            .first()
            .context("ECR returned no authorization data")?;
        let token = data
            .authorization_token()
            .context("ECR authorization data has no token")?;
        let endpoint = data
            .proxy_endpoint()
            .context("ECR authorization data has no endpoint")?;

        decode_authorization_token(token, endpoint)
    }
}

/// Decode a base64 `user:password` ECR token
pub fn decode_authorization_token(token: &str, endpoint: &str) -> Result<RegistryCredentials> {
    let decoded = STANDARD
        .decode(token)
        .context("ECR authorization token is not valid base64")?;
    let decoded = String::from_utf8(decoded).context("ECR authorization token is not UTF-8")?;
    let (username, password) = decoded
        .split_once(':')
        .context("ECR authorization token is not in user:password form")?;

    Ok(RegistryCredentials {
        username: username.to_string(),
        password: password.to_string(),
        endpoint: endpoint.to_string(),
    })
}
