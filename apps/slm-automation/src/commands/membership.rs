//! Deployment-container membership commands

use clap::Args;
use serde::Serialize;
use slm_catalog::{ApplicationRecord, DeploymentType};
use slm_directory::{
    DirectoryClient, IdentityKind, MemberSecurityId, MembershipManager, MembershipRequest,
};

use crate::config::DirectoryArgs;
use crate::error::{CliError, CliResult};
use crate::output::print_json;

#[derive(Args, Debug)]
pub struct MemberArgs {
    /// User identity (required for kind User)
    #[arg(long)]
    pub user: Option<String>,

    /// Computer name (required for kind Computer)
    #[arg(long)]
    pub computer: Option<String>,

    /// Deployment container
    #[arg(long)]
    pub container: String,

    /// User or Computer; derived from --application-details-json when omitted
    #[arg(long)]
    pub kind: Option<String>,

    /// Application record JSON used to derive the kind
    #[arg(long)]
    pub application_details_json: Option<String>,

    #[command(flatten)]
    pub directory: DirectoryArgs,
}

#[derive(Args, Debug)]
pub struct ContainerArgs {
    /// Deployment container
    #[arg(long)]
    pub container: String,

    #[command(flatten)]
    pub directory: DirectoryArgs,
}

#[derive(Args, Debug)]
pub struct InstalledTargetsArgs {
    /// User or computer to check
    #[arg(long)]
    pub subject: String,

    /// Candidate deployment containers (repeat or comma-separate)
    #[arg(long = "candidate", value_delimiter = ',', required = true)]
    pub candidates: Vec<String>,

    #[command(flatten)]
    pub directory: DirectoryArgs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipAction {
    Add,
    Remove,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MembershipChange {
    pub action: &'static str,
    pub container: String,
    pub kind: IdentityKind,
    pub member: String,
}

/// Execute add-member / remove-member
pub async fn execute_mutation(action: MembershipAction, args: MemberArgs) -> CliResult<()> {
    let request = build_request(&args)?;
    request.member()?;
    let directory = args.directory.connect()?;

    let result = apply(action, MembershipManager::new(directory.clone()), &request).await;
    directory.close().await;

    print_json(&result?)
}

/// Execute list-members
pub async fn execute_list(args: ContainerArgs) -> CliResult<()> {
    let directory = args.directory.connect()?;
    let result = MembershipManager::new(directory.clone())
        .list_members(&args.container)
        .await;
    directory.close().await;

    print_json(&result?)
}

/// Execute list-members-with-sid
pub async fn execute_list_with_sid(args: ContainerArgs) -> CliResult<()> {
    let directory = args.directory.connect()?;
    let result: Result<Vec<MemberSecurityId>, _> = MembershipManager::new(directory.clone())
        .list_members_with_security_id(&args.container)
        .await;
    directory.close().await;

    print_json(&result?)
}

/// Execute installed-targets
pub async fn execute_installed_targets(args: InstalledTargetsArgs) -> CliResult<()> {
    let directory = args.directory.connect()?;
    let result = MembershipManager::new(directory.clone())
        .installed_deployment_targets(&args.subject, &args.candidates)
        .await;
    directory.close().await;

    print_json(&result?)
}

/// Build a membership request, deriving the kind from the application
/// record when it is not given explicitly.
pub fn build_request(args: &MemberArgs) -> CliResult<MembershipRequest> {
    let kind = match (&args.kind, &args.application_details_json) {
        (Some(kind), _) => kind.parse::<IdentityKind>()?,
        (None, Some(json)) => {
            let record = ApplicationRecord::from_json(json)?;
            match record.deployment_type()? {
                DeploymentType::User => IdentityKind::User,
                DeploymentType::Computer => IdentityKind::Computer,
            }
        }
        (None, None) => {
            return Err(CliError::Validation(
                "--kind or --application-details-json is required".to_string(),
            ))
        }
    };

    Ok(MembershipRequest {
        user: args.user.clone(),
        computer: args.computer.clone(),
        container: args.container.clone(),
        kind,
    })
}

async fn apply<D: DirectoryClient>(
    action: MembershipAction,
    manager: MembershipManager<D>,
    request: &MembershipRequest,
) -> CliResult<MembershipChange> {
    let member = request.member()?.to_string();

    let action = match action {
        MembershipAction::Add => {
            manager.add_member(request).await?;
            "added"
        }
        MembershipAction::Remove => {
            manager.remove_member(request).await?;
            "removed"
        }
    };

    Ok(MembershipChange {
        action,
        container: request.container.clone(),
        kind: request.kind,
        member,
    })
}
