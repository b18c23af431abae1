//! slm-automation - SLM deployment-group automation entry points
//!
//! Each subcommand is one stateless operation invoked by an external
//! scheduler or workflow engine:
//! - Add/remove users and computers in deployment containers
//! - Resolve directory identities in their various forms
//! - Compute service template adjustments from application records
//! - Import service images
//! - Verify container membership for reharvest
//!
//! Results are printed as JSON on stdout; logs go to stderr.

use clap::{Parser, Subcommand};

mod commands;
mod config;
mod error;
mod logging;
mod output;

use error::CliResult;

/// SLM deployment-group automation
#[derive(Parser)]
#[command(name = "slm-automation")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Log filter directive, used when RUST_LOG is not set
    #[arg(long, global = true, env = "SLM_LOG", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a user or computer to a deployment container
    AddMember(commands::membership::MemberArgs),

    /// Remove a user or computer from a deployment container
    RemoveMember(commands::membership::MemberArgs),

    /// List the account names of a container's members
    ListMembers(commands::membership::ContainerArgs),

    /// List the names and security identifiers of a container's members
    ListMembersWithSid(commands::membership::ContainerArgs),

    /// Report which candidate containers a subject is a member of
    InstalledTargets(commands::membership::InstalledTargetsArgs),

    /// Resolve an application owner to an account name
    ResolveOwnerAccountName(commands::resolve::ResolveArgs),

    /// Resolve an approver to a distinguished name
    ResolveApproverDn(commands::resolve::ResolveArgs),

    /// Resolve a deployment container to a distinguished name
    ResolveContainerDn(commands::resolve::ResolveArgs),

    /// Resolve a user to a distinguished name
    ResolveUserDn(commands::resolve::ResolveArgs),

    /// Resolve a computer to a distinguished name
    ResolveComputerDn(commands::resolve::ResolveArgs),

    /// Check that a provisioning item resolves in the directory
    ValidateItem(commands::resolve::ValidateItemArgs),

    /// Derive an application's deployment type
    DeploymentType(commands::template::RecordArgs),

    /// Compute the workflows to unlink for a service template
    TemplateUnlinks(commands::template::TemplateArgs),

    /// Compute the workflow activities to disable for a service template
    TemplateDisables(commands::template::TemplateArgs),

    /// Apply both template rule sets
    CustomizeTemplate(commands::template::TemplateArgs),

    /// Import an application's service image
    FetchImage(commands::image::FetchImageArgs),

    /// Verify that an object is a member of a container
    VerifyMembership(commands::verify::VerifyArgs),

    /// Bind to the directory and read the base DN
    CheckDirectory(commands::check::CheckArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    logging::init_logging(&cli.log_level);

    let result = run(cli.command).await;

    match result {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            tracing::debug!(error = %e, exit_code = e.exit_code(), "Command failed");
            e.print();
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(command: Commands) -> CliResult<()> {
    use commands::membership::MembershipAction;

    match command {
        Commands::AddMember(args) => {
            commands::membership::execute_mutation(MembershipAction::Add, args).await
        }
        Commands::RemoveMember(args) => {
            commands::membership::execute_mutation(MembershipAction::Remove, args).await
        }
        Commands::ListMembers(args) => commands::membership::execute_list(args).await,
        Commands::ListMembersWithSid(args) => {
            commands::membership::execute_list_with_sid(args).await
        }
        Commands::InstalledTargets(args) => {
            commands::membership::execute_installed_targets(args).await
        }
        Commands::ResolveOwnerAccountName(args) => {
            commands::resolve::execute(commands::resolve::Target::OwnerAccountName, args).await
        }
        Commands::ResolveApproverDn(args) => {
            commands::resolve::execute(commands::resolve::Target::ApproverDn, args).await
        }
        Commands::ResolveContainerDn(args) => {
            commands::resolve::execute(commands::resolve::Target::ContainerDn, args).await
        }
        Commands::ResolveUserDn(args) => {
            commands::resolve::execute(commands::resolve::Target::UserDn, args).await
        }
        Commands::ResolveComputerDn(args) => {
            commands::resolve::execute(commands::resolve::Target::ComputerDn, args).await
        }
        Commands::ValidateItem(args) => commands::resolve::execute_validate(args).await,
        Commands::DeploymentType(args) => commands::template::execute_deployment_type(args),
        Commands::TemplateUnlinks(args) => {
            commands::template::execute(commands::template::Rules::Unlinks, args)
        }
        Commands::TemplateDisables(args) => {
            commands::template::execute(commands::template::Rules::Disables, args)
        }
        Commands::CustomizeTemplate(args) => {
            commands::template::execute(commands::template::Rules::All, args)
        }
        Commands::FetchImage(args) => commands::image::execute(args).await,
        Commands::VerifyMembership(args) => commands::verify::execute(args).await,
        Commands::CheckDirectory(args) => commands::check::execute(args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_subcommand_names() {
        let names: Vec<String> = Cli::command()
            .get_subcommands()
            .map(|c| c.get_name().to_string())
            .collect();

        for expected in [
            "add-member",
            "remove-member",
            "list-members",
            "list-members-with-sid",
            "installed-targets",
            "resolve-owner-account-name",
            "resolve-approver-dn",
            "resolve-container-dn",
            "resolve-user-dn",
            "resolve-computer-dn",
            "validate-item",
            "deployment-type",
            "template-unlinks",
            "template-disables",
            "customize-template",
            "fetch-image",
            "verify-membership",
            "check-directory",
        ] {
            assert!(names.contains(&expected.to_string()), "missing {expected}");
        }
    }

    #[test]
    fn test_parse_add_member() {
        let cli = Cli::try_parse_from([
            "slm-automation",
            "add-member",
            "--computer",
            "PC01",
            "--container",
            "App-Visio-Install",
            "--kind",
            "Computer",
        ])
        .unwrap();

        match cli.command {
            Commands::AddMember(args) => {
                assert_eq!(args.computer.as_deref(), Some("PC01"));
                assert_eq!(args.container, "App-Visio-Install");
            }
            _ => panic!("expected add-member"),
        }
    }
}
