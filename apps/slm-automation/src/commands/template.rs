//! Application record and service template commands
//!
//! These commands only read their JSON inputs; no network call is made.

use std::path::Path;

use clap::Args;
use serde::de::DeserializeOwned;
use slm_catalog::{
    apply_activity_disables, apply_workflow_unlinks, customize_template, ApplicationRecord,
    ServiceTemplateAdjustment,
};

use crate::error::{CliError, CliResult};
use crate::output::print_json;

#[derive(Args, Debug)]
pub struct RecordArgs {
    /// Application record: a JSON file path or an inline JSON object
    #[arg(long)]
    pub record: String,
}

#[derive(Args, Debug)]
pub struct TemplateArgs {
    /// Application record: a JSON file path or an inline JSON object
    #[arg(long)]
    pub record: String,

    /// Initial service adjustment: a JSON file path or an inline JSON object.
    /// Defaults to an empty adjustment named after the application.
    #[arg(long)]
    pub adjustment: Option<String>,
}

/// Which template rules to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rules {
    Unlinks,
    Disables,
    All,
}

/// Execute deployment-type
pub fn execute_deployment_type(args: RecordArgs) -> CliResult<()> {
    let record: ApplicationRecord = load_json(&args.record)?;
    let deployment_type = record.deployment_type()?;
    print_json(&deployment_type)
}

/// Execute template-unlinks / template-disables / customize-template
pub fn execute(rules: Rules, args: TemplateArgs) -> CliResult<()> {
    let adjustment = run(rules, &args)?;
    print_json(&adjustment)
}

fn run(rules: Rules, args: &TemplateArgs) -> CliResult<ServiceTemplateAdjustment> {
    let record: ApplicationRecord = load_json(&args.record)?;
    let adjustment = match &args.adjustment {
        Some(source) => load_json(source)?,
        None => ServiceTemplateAdjustment::new(record.name.clone()),
    };

    Ok(match rules {
        Rules::Unlinks => apply_workflow_unlinks(&record, adjustment),
        Rules::Disables => apply_activity_disables(&record, adjustment),
        Rules::All => customize_template(&record, adjustment),
    })
}

/// Parse `source` as inline JSON when it looks like an object, otherwise
/// read it as a file.
pub(crate) fn load_json<T: DeserializeOwned>(source: &str) -> CliResult<T> {
    let trimmed = source.trim_start();
    if trimmed.starts_with('{') {
        return Ok(serde_json::from_str(trimmed)?);
    }

    let path = Path::new(source);
    let contents = std::fs::read_to_string(path)
        .map_err(|e| CliError::Io(format!("{}: {e}", path.display())))?;
    Ok(serde_json::from_str(&contents)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use slm_catalog::{ActivityReference, EXTEND_SUBSCRIPTION, INSTALL_SOFTWARE};

    const RECORD: &str = r#"{
        "name": "Microsoft Visio",
        "computerGroup": "App-Visio-Install",
        "publishLevel": "Uninstall",
        "organizationalApproval": false,
        "applicationOwnerApproval": true,
        "uninstallOption": "TimeBased",
        "subscriptionExtensionsDays": "0"
    }"#;

    fn args(adjustment: Option<&str>) -> TemplateArgs {
        TemplateArgs {
            record: RECORD.to_string(),
            adjustment: adjustment.map(str::to_string),
        }
    }

    #[test]
    fn test_unlinks_from_inline_record() {
        let result = run(Rules::Unlinks, &args(None)).unwrap();
        assert_eq!(result.service_name, "Microsoft Visio");
        assert_eq!(
            result.workflows_to_unlink,
            vec![INSTALL_SOFTWARE, EXTEND_SUBSCRIPTION]
        );
        assert!(result.activities_to_disable.is_empty());
    }

    #[test]
    fn test_disables_only() {
        let result = run(Rules::Disables, &args(None)).unwrap();
        assert!(result.workflows_to_unlink.is_empty());
        assert_eq!(
            result.activities_to_disable,
            vec![
                ActivityReference::new(INSTALL_SOFTWARE, 1),
                ActivityReference::new(INSTALL_SOFTWARE, 2),
            ]
        );
    }

    #[test]
    fn test_customize_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let record_path = dir.path().join("record.json");
        let adjustment_path = dir.path().join("adjustment.json");
        std::fs::write(&record_path, RECORD).unwrap();
        std::fs::write(
            &adjustment_path,
            r#"{"serviceName":"Visio 2021","userUninstallApproval":false}"#,
        )
        .unwrap();

        let result = run(
            Rules::All,
            &TemplateArgs {
                record: record_path.display().to_string(),
                adjustment: Some(adjustment_path.display().to_string()),
            },
        )
        .unwrap();

        assert_eq!(result.service_name, "Visio 2021");
        assert_eq!(result.workflows_to_unlink.len(), 2);
        assert_eq!(result.activities_to_disable.len(), 4);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = run(
            Rules::All,
            &TemplateArgs {
                record: "/nonexistent/record.json".to_string(),
                adjustment: None,
            },
        )
        .unwrap_err();
        assert!(matches!(err, CliError::Io(_)));
    }

    #[test]
    fn test_unknown_record_field_is_validation_error() {
        let err = run(
            Rules::All,
            &TemplateArgs {
                record: r#"{"organizationalApproval":true,"applicationOwnerApproval":true,"extra":1}"#
                    .to_string(),
                adjustment: None,
            },
        )
        .unwrap_err();
        assert_eq!(err.exit_code(), 4);
    }
}
