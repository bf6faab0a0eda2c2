use anyhow::Result;
use pipewatch_deployer::aws::{AccountId, AwsError, IdentityOperations};

pub const TEST_ACCOUNT_ID: &str = "123456789012";

/// Identity lookup with a fixed answer
pub struct FakeIdentity {
    account: Option<AccountId>,
}

impl FakeIdentity {
    pub fn valid() -> Self {
        Self {
            account: Some(TEST_ACCOUNT_ID.parse().unwrap()),
        }
    }

    /// Behaves like a session whose token has expired
    pub fn expired() -> Self {
        Self { account: None }
    }
}

impl IdentityOperations for FakeIdentity {
    async fn current_account_id(&self) -> Result<AccountId> {
        match &self.account {
            Some(account) => Ok(account.clone()),
            None => Err(AwsError::AccessDenied {
                code: "ExpiredToken".to_string(),
                message: "The security token included in the request is expired".to_string(),
            }
            .into()),
        }
    }
}
