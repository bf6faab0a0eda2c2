//! pipewatch: deploy and tear down the pipeline failure-analysis stack
//!
//! `deploy` provisions the stacks and the agent runtime for one pipeline.
//! `teardown` removes everything after an explicit confirmation.

use anyhow::Result;
use clap::{Parser, Subcommand};
use pipewatch_common::defaults::{
    CONFIRMATION_PHRASE, DEFAULT_REGION, DEFAULT_RUNTIME_READY_TIMEOUT_SECS,
    DEFAULT_STACK_DELETE_TIMEOUT_SECS, MAX_IMAGE_BATCH,
};
use pipewatch_deployer::aws::{
    AgentCoreClient, AwsContext, CloudFormationClient, EcrClient, StsIdentity,
};
use pipewatch_deployer::config::{AwsSettings, DeployConfig, ProjectLayout, TeardownConfig};
use pipewatch_deployer::orchestrator::{print_remaining_stacks, print_teardown_report};
use pipewatch_deployer::pipeline::CodePipelineSource;
use pipewatch_deployer::runtime::AgentContainerDeployer;
use pipewatch_deployer::stacks::{CdkStackProvider, StackOperations};
use pipewatch_deployer::store::JsonFileStore;
use pipewatch_deployer::{Collaborators, ConfirmationGate, GateDecision, LifecycleOrchestrator, preflight};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const TEARDOWN_SUMMARY: &str = "\
This will permanently delete:
  - MainLambdaStack, AgentCoreStack, SecretManagerStack, PipelineLoggerStack
  - every recorded agent runtime
  - the pipeline-agent image registry and all of its images
  - local runtime identifiers and generated pipeline configuration";

#[derive(Parser, Debug)]
#[command(name = "pipewatch")]
#[command(about = "Deploy and tear down pipeline failure analysis on AWS")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

/// Options shared by every command
#[derive(clap::Args, Debug)]
struct AwsArgs {
    /// AWS region
    #[arg(long, env = "AWS_REGION", default_value = DEFAULT_REGION)]
    region: String,

    /// AWS profile to use (overrides AWS_PROFILE env var)
    #[arg(long)]
    aws_profile: Option<String>,
}

impl From<AwsArgs> for AwsSettings {
    fn from(args: AwsArgs) -> Self {
        Self {
            region: args.region,
            aws_profile: args.aws_profile,
        }
    }
}

#[derive(clap::Args, Debug)]
struct DeployArgs {
    /// Name of the CodePipeline to watch
    pipeline_name: String,

    #[command(flatten)]
    aws: AwsArgs,

    /// Project directory holding cdk_project/, agent-container/ and email-config/
    #[arg(long, default_value = ".")]
    project_dir: PathBuf,

    /// Seconds to wait for the agent runtime to become ready
    #[arg(long, default_value_t = DEFAULT_RUNTIME_READY_TIMEOUT_SECS)]
    runtime_ready_timeout: u64,
}

#[derive(clap::Args, Debug)]
struct TeardownArgs {
    #[command(flatten)]
    aws: AwsArgs,

    /// Project directory holding the identifier store and generated config
    #[arg(long, default_value = ".")]
    project_dir: PathBuf,

    /// Seconds to wait for each stack deletion
    #[arg(long, default_value_t = DEFAULT_STACK_DELETE_TIMEOUT_SECS)]
    stack_delete_timeout: u64,

    /// Images per batch-delete call when the registry must be emptied (1-100)
    #[arg(long, default_value_t = MAX_IMAGE_BATCH)]
    registry_batch_size: usize,

    /// Confirmation text; prompts on stdin when omitted
    #[arg(long, value_name = "TEXT")]
    confirm: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Deploy the full environment for a pipeline
    Deploy(DeployArgs),

    /// Remove every resource created by deploy
    Teardown(TeardownArgs),

    /// List pipewatch stacks in a region
    Stacks {
        #[command(flatten)]
        aws: AwsArgs,

        /// Output format (table, json)
        #[arg(long, default_value = "table")]
        format: String,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        print_error(&e);
        std::process::exit(1);
    }
}

/// Print error in a user-friendly way
fn print_error(e: &anyhow::Error) {
    use std::io::Write;

    let mut stderr = std::io::stderr();

    let _ = writeln!(stderr, "\n\x1b[1;31mError:\x1b[0m {e}");

    let mut source = e.source();
    while let Some(cause) = source {
        let _ = writeln!(stderr, "  \x1b[33mCaused by:\x1b[0m {cause}");
        source = cause.source();
    }

    if std::env::var("RUST_BACKTRACE").is_err() {
        let _ = writeln!(
            stderr,
            "\n\x1b[2mSet RUST_BACKTRACE=1 for a detailed backtrace\x1b[0m"
        );
    } else {
        let backtrace = e.backtrace();
        if backtrace.status() == std::backtrace::BacktraceStatus::Captured {
            let _ = writeln!(stderr, "\n\x1b[2mBacktrace:\x1b[0m\n{backtrace}");
        }
    }
}

/// Targets clamped to warnings and errors (AWS SDK noise)
const QUIET_TARGETS: &[&str] = &[
    "aws_config",
    "aws_smithy_runtime",
    "aws_sdk_sts",
    "aws_sdk_ecr",
    "aws_sdk_cloudformation",
    "aws_sdk_codepipeline",
    "aws_sdk_bedrockagentcorecontrol",
];

fn log_filter() -> Result<EnvFilter> {
    let mut filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());
    for target in QUIET_TARGETS {
        filter = filter.add_directive(format!("{target}=warn").parse()?);
    }
    Ok(filter)
}

async fn run() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt().with_env_filter(log_filter()?).init();

    match args.command {
        Command::Deploy(deploy_args) => handle_deploy(deploy_args).await,
        Command::Teardown(teardown_args) => handle_teardown(teardown_args).await,
        Command::Stacks { aws, format } => handle_stacks(aws.into(), format).await,
    }
}

type AwsOrchestrator = LifecycleOrchestrator<
    CdkStackProvider,
    AgentContainerDeployer,
    EcrClient,
    CodePipelineSource,
    StsIdentity,
    JsonFileStore,
>;

fn build_orchestrator(
    aws: &AwsContext,
    layout: &ProjectLayout,
    runtime_ready_timeout: Duration,
    stack_delete_timeout: Duration,
) -> AwsOrchestrator {
    let profile = aws.profile().map(str::to_string);

    let collaborators = Collaborators {
        stacks: CdkStackProvider::new(
            layout.cdk_dir(),
            CloudFormationClient::from_context(aws),
            aws.region(),
            profile.clone(),
            stack_delete_timeout,
        ),
        runtimes: AgentContainerDeployer::new(
            layout.agent_container_dir(),
            aws.region(),
            runtime_ready_timeout,
            CloudFormationClient::from_context(aws),
            EcrClient::from_context(aws),
            AgentCoreClient::from_context(aws),
        ),
        registry: EcrClient::from_context(aws),
        pipelines: CodePipelineSource::new(profile, layout.stages_file()),
        identity: StsIdentity::from_context(aws),
        store: JsonFileStore::new(layout.identifier_file()),
    };

    LifecycleOrchestrator::new(collaborators, layout)
}

/// Handle the deploy command
async fn handle_deploy(args: DeployArgs) -> Result<()> {
    let layout = ProjectLayout::new(&args.project_dir);
    let config = DeployConfig {
        aws: args.aws.into(),
        pipeline_name: args.pipeline_name,
        runtime_ready_timeout: Duration::from_secs(args.runtime_ready_timeout),
    };

    let notifications = preflight::check_deploy(&layout)?;
    info!(
        pipeline = %config.pipeline_name,
        region = %config.aws.region,
        recipients = notifications.notification_emails.len(),
        "Starting deployment"
    );

    let aws = AwsContext::with_profile(&config.aws.region, config.aws.aws_profile.as_deref()).await;
    let mut orchestrator = build_orchestrator(
        &aws,
        &layout,
        config.runtime_ready_timeout,
        Duration::from_secs(DEFAULT_STACK_DELETE_TIMEOUT_SECS),
    );

    let arn = orchestrator
        .deploy(&config.pipeline_name, &config.aws.region)
        .await?;

    println!("\nDeployment complete.");
    println!("Agent runtime ARN: {arn}");
    Ok(())
}

/// Handle the teardown command
async fn handle_teardown(args: TeardownArgs) -> Result<()> {
    let layout = ProjectLayout::new(&args.project_dir);
    let mut config = TeardownConfig::new(args.aws.into());
    config.stack_delete_timeout = Duration::from_secs(args.stack_delete_timeout);
    config.registry_batch_size = args.registry_batch_size;
    config.confirm = args.confirm;

    let gate = ConfirmationGate::new(CONFIRMATION_PHRASE);
    let decision = match &config.confirm {
        Some(answer) => gate.check(answer),
        None => {
            let stdin = std::io::stdin();
            gate.confirm(TEARDOWN_SUMMARY, &mut stdin.lock(), &mut std::io::stdout())
        }
    };
    if decision == GateDecision::Declined {
        println!("Teardown cancelled.");
        return Ok(());
    }

    info!(region = %config.aws.region, "Starting teardown");
    let aws = AwsContext::with_profile(&config.aws.region, config.aws.aws_profile.as_deref()).await;
    let mut orchestrator = build_orchestrator(
        &aws,
        &layout,
        Duration::from_secs(DEFAULT_RUNTIME_READY_TIMEOUT_SECS),
        config.stack_delete_timeout,
    )
    .with_registry_batch_size(config.registry_batch_size)?;

    let report = orchestrator.teardown(&config.aws.region).await?;
    print_teardown_report(&report);

    if report.has_failures() {
        warn!(
            failed = report.failures().count(),
            "Teardown finished with failures; some resources may remain"
        );
    }
    Ok(())
}

/// Handle the stacks command
async fn handle_stacks(settings: AwsSettings, format: String) -> Result<()> {
    let aws = AwsContext::with_profile(&settings.region, settings.aws_profile.as_deref()).await;
    let provider = CdkStackProvider::new(
        ".",
        CloudFormationClient::from_context(&aws),
        aws.region(),
        settings.aws_profile.clone(),
        Duration::from_secs(DEFAULT_STACK_DELETE_TIMEOUT_SECS),
    );

    let rows = provider.list_remaining().await?;

    if format == "json" {
        let json_rows: Vec<_> = rows
            .iter()
            .map(|r| {
                serde_json::json!({
                    "name": r.name,
                    "status": r.status,
                    "created_at": r.created.map(|t| t.to_rfc3339()),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&json_rows)?);
    } else {
        print_remaining_stacks(&rows);
    }
    Ok(())
}
