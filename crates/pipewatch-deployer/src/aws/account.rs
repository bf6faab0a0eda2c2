//! AWS account validation and identity

use anyhow::{Context, Result};
use aws_sdk_sts::error::ProvideErrorMetadata;
use std::str::FromStr;
use tracing::info;

use super::{AwsContext, AwsError};

/// Strongly-typed AWS account ID (12-digit string)
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display, derive_more::Deref)]
pub struct AccountId(String);

impl FromStr for AccountId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.len() != 12 || !s.bytes().all(|b| b.is_ascii_digit()) {
            anyhow::bail!("Invalid AWS account ID '{s}': expected 12 digits");
        }
        Ok(AccountId(s.to_string()))
    }
}

/// Resolves the account the current credentials belong to
#[allow(async_fn_in_trait)]
pub trait IdentityOperations: Send + Sync {
    async fn current_account_id(&self) -> Result<AccountId>;
}

/// Fetch the current AWS account ID from credentials via STS GetCallerIdentity
///
/// This operation requires no special permissions - it always succeeds if
/// credentials are valid.
pub async fn get_current_account_id(client: &aws_sdk_sts::Client) -> Result<AccountId> {
    let identity = client
        .get_caller_identity()
        .send()
        .await
        .map_err(|e| caller_identity_error(&e))?;

    let account = identity
        .account()
        .context("No account ID returned from STS GetCallerIdentity")?;

    info!(account_id = %account, "AWS account validated");

    account.parse()
}

/// Classify a GetCallerIdentity failure, keeping the code for operator hints
fn caller_identity_error<E>(err: &E) -> anyhow::Error
where
    E: ProvideErrorMetadata + std::error::Error,
{
    anyhow::Error::new(AwsError::from_sdk(err))
        .context("Failed to get AWS caller identity - check credentials")
}

/// STS-backed identity lookup
pub struct StsIdentity {
    client: aws_sdk_sts::Client,
}

impl StsIdentity {
    pub fn from_context(ctx: &AwsContext) -> Self {
        Self {
            client: ctx.sts_client(),
        }
    }
}

impl IdentityOperations for StsIdentity {
    async fn current_account_id(&self) -> Result<AccountId> {
        get_current_account_id(&self.client).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aws::classify_anyhow_error;
    use aws_sdk_sts::error::{ErrorMetadata, SdkError};
    use aws_sdk_sts::operation::get_caller_identity::GetCallerIdentityError;

    fn caller_identity_failure(code: &str) -> anyhow::Error {
        let service_error = GetCallerIdentityError::generic(
            ErrorMetadata::builder()
                .code(code)
                .message("The security token included in the request is expired")
                .build(),
        );
        let sdk_error = SdkError::<GetCallerIdentityError, ()>::service_error(service_error, ());
        caller_identity_error(&sdk_error)
    }

    #[test]
    fn test_expired_token_keeps_credential_hint() {
        let err = caller_identity_failure("ExpiredToken");
        let classified = classify_anyhow_error(&err);
        assert!(matches!(classified, AwsError::AccessDenied { .. }));
        let hint = classified.suggestion().expect("hint for ExpiredToken");
        assert!(hint.contains("aws sso login"), "{hint}");
    }

    #[test]
    fn test_invalid_token_is_access_denied() {
        let err = caller_identity_failure("InvalidClientTokenId");
        assert!(matches!(
            classify_anyhow_error(&err),
            AwsError::AccessDenied { code, .. } if code == "InvalidClientTokenId"
        ));
    }

    #[test]
    fn test_parse_account_id() {
        let id: AccountId = "123456789012".parse().unwrap();
        assert_eq!(id.to_string(), "123456789012");
        assert_eq!(id.len(), 12);
    }

    #[test]
    fn test_reject_malformed_account_id() {
        assert!("12345".parse::<AccountId>().is_err());
        assert!("12345678901a".parse::<AccountId>().is_err());
        assert!("".parse::<AccountId>().is_err());
    }
}
