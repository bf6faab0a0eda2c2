//! Teardown sequencing against fake collaborators

use pipewatch_common::defaults::{AGENT_RUNTIME_NAME, REGISTRY_NAME};
use pipewatch_common::{StackState, StackUnit, StepOutcome};
use pipewatch_deployer::orchestrator::{
    STEP_DELETE_RUNTIMES, STEP_LIST_REMAINING, STEP_REMOVE_PIPELINE_CONFIG, STEP_REMOVE_STORE,
    clean_registry_step, delete_runtime_step, destroy_step,
};
use pipewatch_deployer::store::IdentifierStore;
use pipewatch_deployer::{Collaborators, PreconditionError, RegistryError};
use pipewatch_test_utils::{
    FakeCollaborators, FakeIdentity, FakeRegistry, FakeRuntimes, FakeStacks, MemoryStore,
    ProjectFixture, empty_environment, fake_orchestrator,
};

const REGION: &str = "us-east-1";
const RUNTIME_ID: &str = "pipeline_error_analysis_agent-abc123";

/// Everything deployed: four stacks, one runtime, a registry with images
fn deployed_environment() -> FakeCollaborators {
    Collaborators {
        stacks: FakeStacks::with_live(&StackUnit::ALL),
        runtimes: FakeRuntimes::with_live(&[RUNTIME_ID]),
        registry: FakeRegistry::with_images(150),
        store: MemoryStore::with(AGENT_RUNTIME_NAME, RUNTIME_ID),
        ..empty_environment()
    }
}

#[tokio::test]
async fn test_empty_environment_skips_every_step() {
    let project = ProjectFixture::empty();
    let mut orchestrator = fake_orchestrator(empty_environment(), &project.layout());

    let report = orchestrator.teardown(REGION).await.unwrap();

    assert!(report.all_skipped(), "{report:#?}");
    assert_eq!(report.steps.len(), 9);
    assert!(report.step(STEP_DELETE_RUNTIMES).is_some());
    assert!(report.step(&clean_registry_step(REGISTRY_NAME)).is_some());
}

#[tokio::test]
async fn test_full_teardown_removes_everything() {
    let project = ProjectFixture::complete().with_pipeline_config();
    let mut orchestrator = fake_orchestrator(deployed_environment(), &project.layout());

    let report = orchestrator.teardown(REGION).await.unwrap();

    assert!(!report.has_failures(), "{report:#?}");
    assert!(orchestrator.stacks().live_units().is_empty());
    assert!(orchestrator.runtimes().live().is_empty());
    assert!(!orchestrator.registry().exists());
    assert!(!orchestrator.store().exists());
    assert!(!project.layout().pipeline_config_dir().exists());

    assert_eq!(
        report.step(&delete_runtime_step(AGENT_RUNTIME_NAME)).unwrap().outcome,
        StepOutcome::Ok
    );
    assert_eq!(report.step(STEP_REMOVE_STORE).unwrap().outcome, StepOutcome::Ok);
    assert_eq!(
        report.step(STEP_REMOVE_PIPELINE_CONFIG).unwrap().outcome,
        StepOutcome::Ok
    );
    assert_eq!(
        report.step(STEP_LIST_REMAINING).unwrap().outcome,
        StepOutcome::Skipped
    );
}

#[tokio::test]
async fn test_stacks_destroyed_in_reverse_dependency_order() {
    let project = ProjectFixture::empty();
    let mut orchestrator = fake_orchestrator(deployed_environment(), &project.layout());

    let report = orchestrator.teardown(REGION).await.unwrap();

    assert_eq!(
        orchestrator.stacks().destroyed_units(),
        vec![
            StackUnit::MainLambda,
            StackUnit::AgentCore,
            StackUnit::SecretManager,
            StackUnit::PipelineLogger,
        ]
    );

    // Request handler goes before the runtime, runtime and registry before their stack
    let position = |name: &str| report.steps.iter().position(|s| s.name == name).unwrap();
    let request_handler = position(&destroy_step(StackUnit::MainLambda));
    let runtime = position(&delete_runtime_step(AGENT_RUNTIME_NAME));
    let registry = position(&clean_registry_step(REGISTRY_NAME));
    let agent_stack = position(&destroy_step(StackUnit::AgentCore));
    assert!(request_handler < runtime);
    assert!(runtime < registry);
    assert!(registry < agent_stack);
}

#[tokio::test]
async fn test_stack_failure_does_not_stop_later_steps() {
    let project = ProjectFixture::complete().with_pipeline_config();
    let collaborators = Collaborators {
        stacks: FakeStacks::with_live(&StackUnit::ALL).failing_destroy(StackUnit::SecretManager),
        ..deployed_environment()
    };
    let mut orchestrator = fake_orchestrator(collaborators, &project.layout());

    let report = orchestrator.teardown(REGION).await.unwrap();

    let failures: Vec<&str> = report.failures().map(|s| s.name.as_str()).collect();
    assert_eq!(failures, vec![destroy_step(StackUnit::SecretManager).as_str()]);

    // The logging stack after it was still destroyed
    assert_eq!(
        report
            .step(&destroy_step(StackUnit::PipelineLogger))
            .unwrap()
            .outcome,
        StepOutcome::Ok
    );
    assert_eq!(
        orchestrator.ledger().state(StackUnit::SecretManager),
        StackState::DestroyFailed
    );

    // The leftover stack shows up in the advisory listing
    let remaining = report.step(STEP_LIST_REMAINING).unwrap();
    assert_eq!(remaining.outcome, StepOutcome::Ok);
    assert!(remaining.detail.as_deref().unwrap().contains("SecretManagerStack"));
}

#[tokio::test]
async fn test_runtime_delete_failure_keeps_identifier() {
    let project = ProjectFixture::empty();
    let collaborators = Collaborators {
        runtimes: FakeRuntimes::with_live(&[RUNTIME_ID]).failing_delete(RUNTIME_ID),
        ..deployed_environment()
    };
    let mut orchestrator = fake_orchestrator(collaborators, &project.layout());

    let report = orchestrator.teardown(REGION).await.unwrap();

    let step = report.step(&delete_runtime_step(AGENT_RUNTIME_NAME)).unwrap();
    assert_eq!(step.outcome, StepOutcome::Failed);
    assert!(step.detail.as_deref().unwrap().contains(RUNTIME_ID));

    assert_eq!(
        orchestrator.store().get(AGENT_RUNTIME_NAME).unwrap().as_deref(),
        Some(RUNTIME_ID)
    );
    assert_eq!(
        report.step(STEP_REMOVE_STORE).unwrap().outcome,
        StepOutcome::Skipped
    );
    // Everything else still ran
    assert!(orchestrator.stacks().live_units().is_empty());
    assert!(!orchestrator.registry().exists());
}

#[tokio::test]
async fn test_runtime_already_gone_is_skipped() {
    let project = ProjectFixture::empty();
    let collaborators = Collaborators {
        runtimes: FakeRuntimes::new(),
        ..deployed_environment()
    };
    let mut orchestrator = fake_orchestrator(collaborators, &project.layout());

    let report = orchestrator.teardown(REGION).await.unwrap();

    assert_eq!(
        report
            .step(&delete_runtime_step(AGENT_RUNTIME_NAME))
            .unwrap()
            .outcome,
        StepOutcome::Skipped
    );
    assert!(!orchestrator.store().exists());
}

#[tokio::test]
async fn test_configured_registry_batch_size_is_used() {
    let project = ProjectFixture::empty();
    let collaborators = Collaborators {
        registry: FakeRegistry::with_images(120).force_delete_fails(),
        ..deployed_environment()
    };
    let mut orchestrator = fake_orchestrator(collaborators, &project.layout())
        .with_registry_batch_size(50)
        .unwrap();

    let report = orchestrator.teardown(REGION).await.unwrap();

    assert_eq!(
        report.step(&clean_registry_step(REGISTRY_NAME)).unwrap().outcome,
        StepOutcome::Ok
    );
    assert_eq!(orchestrator.registry().batch_sizes(), vec![50, 50, 20]);
    assert!(!orchestrator.registry().exists());
}

#[test]
fn test_registry_batch_size_above_limit_is_rejected() {
    let project = ProjectFixture::empty();
    let result = fake_orchestrator(empty_environment(), &project.layout())
        .with_registry_batch_size(101);

    assert!(matches!(
        result,
        Err(RegistryError::InvalidBatchSize { size: 101, max: 100 })
    ));
}

#[tokio::test]
async fn test_registry_failure_is_reported() {
    let project = ProjectFixture::empty();
    let collaborators = Collaborators {
        registry: FakeRegistry::with_images(10)
            .force_delete_fails()
            .plain_delete_fails(),
        ..deployed_environment()
    };
    let mut orchestrator = fake_orchestrator(collaborators, &project.layout());

    let report = orchestrator.teardown(REGION).await.unwrap();

    let step = report.step(&clean_registry_step(REGISTRY_NAME)).unwrap();
    assert_eq!(step.outcome, StepOutcome::Failed);
    assert!(step.detail.as_deref().unwrap().contains(REGISTRY_NAME));
    assert_eq!(report.failures().count(), 1);
}

#[tokio::test]
async fn test_second_teardown_is_all_skipped() {
    let project = ProjectFixture::complete().with_pipeline_config();
    let mut orchestrator = fake_orchestrator(deployed_environment(), &project.layout());

    let first = orchestrator.teardown(REGION).await.unwrap();
    let second = orchestrator.teardown(REGION).await.unwrap();

    assert!(!first.has_failures());
    assert!(second.all_skipped(), "{second:#?}");
}

#[tokio::test]
async fn test_listing_failure_is_reported_not_fatal() {
    let project = ProjectFixture::empty();
    let collaborators = Collaborators {
        stacks: FakeStacks::new().failing_listing(),
        ..empty_environment()
    };
    let mut orchestrator = fake_orchestrator(collaborators, &project.layout());

    let report = orchestrator.teardown(REGION).await.unwrap();

    assert_eq!(
        report.step(STEP_LIST_REMAINING).unwrap().outcome,
        StepOutcome::Failed
    );
    assert_eq!(report.failures().count(), 1);
}

#[tokio::test]
async fn test_expired_credentials_touch_nothing() {
    let project = ProjectFixture::empty();
    let collaborators = Collaborators {
        identity: FakeIdentity::expired(),
        ..deployed_environment()
    };
    let mut orchestrator = fake_orchestrator(collaborators, &project.layout());

    let err = orchestrator.teardown(REGION).await.unwrap_err();

    assert!(matches!(err, PreconditionError::MissingCredentials { .. }));
    assert!(orchestrator.stacks().calls().is_empty());
    assert!(orchestrator.runtimes().deletes().is_empty());
    assert!(orchestrator.registry().exists());
}

#[tokio::test]
async fn test_deploy_then_teardown_round_trip() {
    let project = ProjectFixture::complete();
    let mut orchestrator = fake_orchestrator(empty_environment(), &project.layout());

    orchestrator.deploy("release-pipeline", REGION).await.unwrap();
    let report = orchestrator.teardown(REGION).await.unwrap();

    assert!(!report.has_failures(), "{report:#?}");
    assert!(orchestrator.stacks().live_units().is_empty());
    assert!(orchestrator.runtimes().live().is_empty());
    assert!(!orchestrator.store().exists());
    for unit in StackUnit::ALL {
        assert_eq!(orchestrator.ledger().state(unit), StackState::Absent);
    }
}
