//! Reharvest verification command

use clap::Args;
use slm_directory::MembershipVerifier;

use crate::config::DirectoryArgs;
use crate::error::CliResult;
use crate::output::print_json;

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Object name or security identifier
    #[arg(long)]
    pub object: String,

    /// Deployment container
    #[arg(long)]
    pub container: String,

    #[command(flatten)]
    pub directory: DirectoryArgs,
}

/// Execute verify-membership
pub async fn execute(args: VerifyArgs) -> CliResult<()> {
    let directory = args.directory.connect()?;
    let result = MembershipVerifier::new(directory.clone())
        .verify(&args.object, &args.container)
        .await;
    directory.close().await;

    print_json(&result?)
}
