//! Agent runtime identifiers and ARN assembly

use serde::{Deserialize, Serialize};
use std::fmt;

/// Service namespace of the agent runtime control plane
pub const AGENT_RUNTIME_SERVICE: &str = "bedrock-agentcore";

/// Resource type segment for agent runtimes
pub const AGENT_RUNTIME_RESOURCE_TYPE: &str = "runtime";

/// Identifier of one deployed agent runtime
///
/// Produced once per successful runtime deployment and persisted in the
/// identifier store under `logical_name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuntimeIdentifier {
    pub logical_name: String,
    pub external_id: String,
}

impl RuntimeIdentifier {
    pub fn new(logical_name: impl Into<String>, external_id: impl Into<String>) -> Self {
        Self {
            logical_name: logical_name.into(),
            external_id: external_id.into(),
        }
    }
}

/// Fully-qualified resource address
///
/// Renders as `arn:{partition}:{service}:{region}:{account}:{resource_type}/{resource_id}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Arn {
    pub partition: String,
    pub service: String,
    pub region: String,
    pub account: String,
    pub resource_type: String,
    pub resource_id: String,
}

impl Arn {
    /// Partition for a region (`aws-cn`, `aws-us-gov`, otherwise `aws`)
    pub fn partition_for_region(region: &str) -> &'static str {
        if region.starts_with("cn-") {
            "aws-cn"
        } else if region.starts_with("us-gov-") {
            "aws-us-gov"
        } else {
            "aws"
        }
    }
}

impl fmt::Display for Arn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "arn:{}:{}:{}:{}:{}/{}",
            self.partition,
            self.service,
            self.region,
            self.account,
            self.resource_type,
            self.resource_id
        )
    }
}

/// Build the ARN of an agent runtime
pub fn runtime_arn(region: &str, account: &str, external_id: &str) -> Arn {
    Arn {
        partition: Arn::partition_for_region(region).to_string(),
        service: AGENT_RUNTIME_SERVICE.to_string(),
        region: region.to_string(),
        account: account.to_string(),
        resource_type: AGENT_RUNTIME_RESOURCE_TYPE.to_string(),
        resource_id: external_id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_arn_format() {
        let arn = runtime_arn("us-east-1", "123456789012", "abc-1");
        assert_eq!(
            arn.to_string(),
            "arn:aws:bedrock-agentcore:us-east-1:123456789012:runtime/abc-1"
        );
    }

    #[test]
    fn test_partition_for_region() {
        assert_eq!(Arn::partition_for_region("eu-west-1"), "aws");
        assert_eq!(Arn::partition_for_region("cn-north-1"), "aws-cn");
        assert_eq!(Arn::partition_for_region("us-gov-west-1"), "aws-us-gov");
    }
}
