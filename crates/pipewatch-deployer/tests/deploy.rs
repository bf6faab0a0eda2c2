//! Deployment sequencing against fake collaborators

use pipewatch_common::defaults::AGENT_RUNTIME_NAME;
use pipewatch_common::{StackState, StackUnit};
use pipewatch_deployer::store::IdentifierStore;
use pipewatch_deployer::{Collaborators, DeployStep, OrchestratorError, PreconditionError};
use pipewatch_test_utils::{
    FakeIdentity, FakePipelines, FakeRuntimes, FakeStacks, MemoryStore, ProjectFixture,
    StackCall, TEST_ACCOUNT_ID, empty_environment, fake_orchestrator,
};
use std::collections::BTreeSet;

const PIPELINE: &str = "release-pipeline";
const REGION: &str = "us-east-1";

#[tokio::test]
async fn test_full_deploy_returns_runtime_arn() {
    let project = ProjectFixture::complete();
    let mut orchestrator = fake_orchestrator(empty_environment(), &project.layout());

    let arn = orchestrator.deploy(PIPELINE, REGION).await.unwrap();

    let runtime_id = orchestrator.runtimes().next_id().to_string();
    assert_eq!(
        arn.to_string(),
        format!("arn:aws:bedrock-agentcore:{REGION}:{TEST_ACCOUNT_ID}:runtime/{runtime_id}")
    );
    assert_eq!(
        orchestrator.store().get(AGENT_RUNTIME_NAME).unwrap(),
        Some(runtime_id)
    );
    for unit in StackUnit::ALL {
        assert_eq!(orchestrator.ledger().state(unit), StackState::Active, "{unit}");
    }
}

#[tokio::test]
async fn test_stacks_created_in_dependency_order() {
    let project = ProjectFixture::complete();
    let mut orchestrator = fake_orchestrator(empty_environment(), &project.layout());

    let arn = orchestrator.deploy(PIPELINE, REGION).await.unwrap();

    let calls = orchestrator.stacks().calls();
    assert_eq!(calls.len(), 2);
    match &calls[0] {
        StackCall::Create(units, params) => {
            assert_eq!(units, &StackUnit::FOUNDATION);
            assert_eq!(params.agent_arn(), None);
        }
        other => panic!("unexpected call {other:?}"),
    }
    match &calls[1] {
        StackCall::Create(units, params) => {
            assert_eq!(units, &[StackUnit::MainLambda]);
            assert_eq!(params.agent_arn(), Some(arn.to_string().as_str()));
        }
        other => panic!("unexpected call {other:?}"),
    }
}

#[tokio::test]
async fn test_pipeline_resolved_for_region() {
    let project = ProjectFixture::complete();
    let mut orchestrator = fake_orchestrator(empty_environment(), &project.layout());

    orchestrator.deploy(PIPELINE, "eu-west-1").await.unwrap();

    assert_eq!(
        orchestrator.pipelines().calls(),
        vec![(PIPELINE.to_string(), "eu-west-1".to_string())]
    );
}

#[tokio::test]
async fn test_missing_pipeline_stops_before_any_stack() {
    let project = ProjectFixture::complete();
    let collaborators = Collaborators {
        pipelines: FakePipelines::missing(),
        ..empty_environment()
    };
    let mut orchestrator = fake_orchestrator(collaborators, &project.layout());

    let err = orchestrator.deploy(PIPELINE, REGION).await.unwrap_err();

    assert_eq!(err.failed_step(), Some(DeployStep::ResolvePipeline));
    assert!(orchestrator.stacks().calls().is_empty());
    assert!(orchestrator.runtimes().deploys().is_empty());
}

#[tokio::test]
async fn test_foundation_failure_aborts_before_request_handler() {
    let project = ProjectFixture::complete();
    let collaborators = Collaborators {
        stacks: FakeStacks::new().failing_create(StackUnit::SecretManager),
        ..empty_environment()
    };
    let mut orchestrator = fake_orchestrator(collaborators, &project.layout());

    let err = orchestrator.deploy(PIPELINE, REGION).await.unwrap_err();

    assert_eq!(err.failed_step(), Some(DeployStep::CreateFoundation));
    assert!(!orchestrator
        .stacks()
        .created_units()
        .contains(&StackUnit::MainLambda));
    assert!(orchestrator.runtimes().deploys().is_empty());
    assert!(!orchestrator.store().exists());
    assert_eq!(
        orchestrator.ledger().state(StackUnit::MainLambda),
        StackState::Absent
    );
}

#[tokio::test]
async fn test_runtime_failure_aborts_and_records_nothing() {
    let project = ProjectFixture::complete();
    let collaborators = Collaborators {
        runtimes: FakeRuntimes::new().failing_deploy(),
        ..empty_environment()
    };
    let mut orchestrator = fake_orchestrator(collaborators, &project.layout());

    let err = orchestrator.deploy(PIPELINE, REGION).await.unwrap_err();

    assert_eq!(err.failed_step(), Some(DeployStep::DeployRuntime));
    assert!(!orchestrator.store().exists());
    assert_eq!(orchestrator.stacks().calls().len(), 1);
    // Foundation stacks stay up; nothing is rolled back
    assert_eq!(
        orchestrator.stacks().live_units(),
        StackUnit::FOUNDATION.into_iter().collect::<BTreeSet<_>>()
    );
}

#[tokio::test]
async fn test_redeploy_updates_recorded_runtime() {
    let project = ProjectFixture::complete();
    let collaborators = Collaborators {
        store: MemoryStore::with(AGENT_RUNTIME_NAME, "existing-runtime"),
        runtimes: FakeRuntimes::with_live(&["existing-runtime"]),
        ..empty_environment()
    };
    let mut orchestrator = fake_orchestrator(collaborators, &project.layout());

    let arn = orchestrator.deploy(PIPELINE, REGION).await.unwrap();

    assert_eq!(
        orchestrator.runtimes().deploys(),
        vec![Some("existing-runtime".to_string())]
    );
    assert!(arn.to_string().ends_with("runtime/existing-runtime"));
}

#[tokio::test]
async fn test_expired_credentials_fail_before_step_one() {
    let project = ProjectFixture::complete();
    let collaborators = Collaborators {
        identity: FakeIdentity::expired(),
        ..empty_environment()
    };
    let mut orchestrator = fake_orchestrator(collaborators, &project.layout());

    let err = orchestrator.deploy(PIPELINE, REGION).await.unwrap_err();

    match err {
        OrchestratorError::Precondition(PreconditionError::MissingCredentials { reason }) => {
            assert!(reason.contains("expired"), "{reason}");
            assert!(reason.contains("aws sso login"), "{reason}");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(orchestrator.stacks().calls().is_empty());
}
