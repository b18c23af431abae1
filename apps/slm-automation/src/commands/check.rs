//! Directory connectivity check

use clap::Args;
use serde::Serialize;

use crate::config::DirectoryArgs;
use crate::error::CliResult;
use crate::output::print_json;

#[derive(Args, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub directory: DirectoryArgs,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckResult {
    status: &'static str,
    url: String,
    base_dn: String,
}

/// Execute check-directory
pub async fn execute(args: CheckArgs) -> CliResult<()> {
    let directory = args.directory.connect()?;
    let result = directory.test_connection().await;
    directory.close().await;
    result?;

    let config = directory.config();
    print_json(&CheckResult {
        status: "ok",
        url: config.url(),
        base_dn: config.base_dn.clone(),
    })
}
