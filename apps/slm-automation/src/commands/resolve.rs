//! Identity resolution commands

use clap::Args;
use slm_directory::{DirectoryClient, IdentityKind, IdentityResolver};

use crate::config::DirectoryArgs;
use crate::error::CliResult;
use crate::output::print_json;

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Identifier to resolve (account name, UPN, DN, common name or DOMAIN\account)
    pub input: String,

    #[command(flatten)]
    pub directory: DirectoryArgs,
}

#[derive(Args, Debug)]
pub struct ValidateItemArgs {
    /// Item to validate
    #[arg(long)]
    pub item: String,

    /// User, Computer or Group
    #[arg(long = "type")]
    pub kind: String,

    #[command(flatten)]
    pub directory: DirectoryArgs,
}

/// What a resolve command returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    OwnerAccountName,
    ApproverDn,
    ContainerDn,
    UserDn,
    ComputerDn,
}

/// Execute one of the resolve-* commands
pub async fn execute(target: Target, args: ResolveArgs) -> CliResult<()> {
    let directory = args.directory.connect()?;
    let result = resolve(&IdentityResolver::new(directory.clone()), target, &args.input).await;
    directory.close().await;

    print_json(&result?)
}

/// Execute validate-item
pub async fn execute_validate(args: ValidateItemArgs) -> CliResult<()> {
    let kind: IdentityKind = args.kind.parse()?;
    let directory = args.directory.connect()?;
    let validation = IdentityResolver::new(directory.clone())
        .validate_provisioning_item(&args.item, kind)
        .await;
    directory.close().await;

    print_json(&validation)
}

async fn resolve<D: DirectoryClient>(
    resolver: &IdentityResolver<D>,
    target: Target,
    input: &str,
) -> CliResult<String> {
    let value = match target {
        Target::OwnerAccountName => resolver.resolve_owner_account_name(input).await?,
        Target::ApproverDn => resolver.resolve_approver_dn(input).await?,
        Target::ContainerDn => resolver.resolve_container_dn(input).await?,
        Target::UserDn => resolver.resolve_user_dn(input).await?,
        Target::ComputerDn => resolver.resolve_computer_dn(input).await?,
    };
    Ok(value)
}
