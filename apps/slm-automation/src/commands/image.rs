//! Service image command

use clap::Args;
use serde::Serialize;
use slm_catalog::ApplicationRecord;

use crate::commands::template::load_json;
use crate::config::ImageServiceArgs;
use crate::error::CliResult;
use crate::output::print_json;

#[derive(Args, Debug)]
pub struct FetchImageArgs {
    /// Application record: a JSON file path or an inline JSON object
    #[arg(long)]
    pub record: String,

    #[command(flatten)]
    pub image_service: ImageServiceArgs,
}

#[derive(Debug, Serialize)]
struct ImageReference {
    image: String,
}

/// Execute fetch-image
///
/// Download failures are not errors: the placeholder reference is printed.
pub async fn execute(args: FetchImageArgs) -> CliResult<()> {
    let record: ApplicationRecord = load_json(&args.record)?;
    let importer = args.image_service.importer()?;

    let image = importer.fetch_image(&record).await;
    print_json(&ImageReference { image })
}
