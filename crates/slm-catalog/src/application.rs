//! Application records from the software-asset system.
//!
//! An [`ApplicationRecord`] is read-only input: it decides the deployment
//! type of an application and drives template customization.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{CatalogError, CatalogResult};

/// Whether the current operation context installs or uninstalls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PublishLevel {
    Install,
    Uninstall,
    /// Any other value, kept verbatim.
    Other(String),
}

impl From<String> for PublishLevel {
    fn from(value: String) -> Self {
        if value.eq_ignore_ascii_case("install") {
            PublishLevel::Install
        } else if value.eq_ignore_ascii_case("uninstall") {
            PublishLevel::Uninstall
        } else {
            PublishLevel::Other(value)
        }
    }
}

impl From<PublishLevel> for String {
    fn from(value: PublishLevel) -> Self {
        match value {
            PublishLevel::Install => "Install".to_string(),
            PublishLevel::Uninstall => "Uninstall".to_string(),
            PublishLevel::Other(raw) => raw,
        }
    }
}

/// Uninstall policy of an application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum UninstallOption {
    /// Subscription expires after a number of days.
    TimeBased,
    /// Any other policy, kept verbatim.
    Other(String),
}

impl From<String> for UninstallOption {
    fn from(value: String) -> Self {
        if value.eq_ignore_ascii_case("timebased") {
            UninstallOption::TimeBased
        } else {
            UninstallOption::Other(value)
        }
    }
}

impl From<UninstallOption> for String {
    fn from(value: UninstallOption) -> Self {
        match value {
            UninstallOption::TimeBased => "TimeBased".to_string(),
            UninstallOption::Other(raw) => raw,
        }
    }
}

/// How an application is deployed: to users or to computers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeploymentType {
    User,
    Computer,
}

impl DeploymentType {
    pub fn as_str(self) -> &'static str {
        match self {
            DeploymentType::User => "User",
            DeploymentType::Computer => "Computer",
        }
    }
}

impl fmt::Display for DeploymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Application metadata as exported by the software-asset system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ApplicationRecord {
    /// Display name of the application.
    #[serde(default)]
    pub name: String,

    /// Deployment container for computer installs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub computer_group: Option<String>,

    /// Deployment container for user installs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_group: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_level: Option<PublishLevel>,

    /// Organizational approval required before install.
    pub organizational_approval: bool,

    /// Application-owner approval required before install.
    pub application_owner_approval: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uninstall_option: Option<UninstallOption>,

    /// Days a time-based subscription may be extended by. Exported either as
    /// a string or a number.
    #[serde(
        default,
        deserialize_with = "string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub subscription_extensions_days: Option<String>,

    /// Image file name in the asset system's image store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_file_name: Option<String>,
}

impl ApplicationRecord {
    /// Parse a record from its JSON form.
    pub fn from_json(json: &str) -> CatalogResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Deployment type derived from the group references.
    pub fn deployment_type(&self) -> CatalogResult<DeploymentType> {
        derive_deployment_type(self)
    }

    /// Whether the uninstall policy is time-based.
    pub fn is_time_based(&self) -> bool {
        matches!(self.uninstall_option, Some(UninstallOption::TimeBased))
    }

    /// Whether a subscription extension period is configured. Absent, empty
    /// and exactly `"0"` mean no extension; the value is compared as exported.
    pub fn has_subscription_extension(&self) -> bool {
        self.subscription_extensions_days
            .as_deref()
            .is_some_and(|days| !days.is_empty() && days != "0")
    }

    /// Image file name, if non-blank.
    pub fn image_file_name(&self) -> Option<&str> {
        non_blank(self.image_file_name.as_deref())
    }
}

/// Deployment type of an application.
///
/// A computer group wins over a user group; a record with neither is a
/// configuration error.
pub fn derive_deployment_type(record: &ApplicationRecord) -> CatalogResult<DeploymentType> {
    if non_blank(record.computer_group.as_deref()).is_some() {
        return Ok(DeploymentType::Computer);
    }
    if non_blank(record.user_group.as_deref()).is_some() {
        return Ok(DeploymentType::User);
    }
    Err(CatalogError::configuration(format!(
        "neither ComputerGroup nor UserGroup set for application '{}'",
        record.name
    )))
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        String(String),
        Number(serde_json::Number),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::String(s) => s,
        Raw::Number(n) => n.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ApplicationRecord {
        ApplicationRecord {
            name: "Microsoft Visio".to_string(),
            computer_group: None,
            user_group: None,
            publish_level: None,
            organizational_approval: true,
            application_owner_approval: true,
            uninstall_option: None,
            subscription_extensions_days: None,
            image_file_name: None,
        }
    }

    #[test]
    fn test_deployment_type_computer_wins() {
        let mut r = record();
        r.computer_group = Some("App-Visio-Install".to_string());
        r.user_group = Some("App-Visio-Users".to_string());
        assert_eq!(derive_deployment_type(&r).unwrap(), DeploymentType::Computer);
    }

    #[test]
    fn test_deployment_type_user() {
        let mut r = record();
        r.user_group = Some("App-Visio-Users".to_string());
        assert_eq!(r.deployment_type().unwrap(), DeploymentType::User);
    }

    #[test]
    fn test_deployment_type_neither_is_configuration_error() {
        let mut r = record();
        r.computer_group = Some("  ".to_string());
        let err = derive_deployment_type(&r).unwrap_err();
        assert!(matches!(err, CatalogError::Configuration(_)));
        assert!(err.to_string().contains("neither ComputerGroup nor UserGroup set"));
    }

    #[test]
    fn test_parse_record() {
        let r = ApplicationRecord::from_json(
            r#"{
                "name": "Microsoft Visio",
                "computerGroup": "App-Visio-Install",
                "publishLevel": "Uninstall",
                "organizationalApproval": false,
                "applicationOwnerApproval": true,
                "uninstallOption": "TimeBased",
                "subscriptionExtensionsDays": 30,
                "imageFileName": "visio.png"
            }"#,
        )
        .unwrap();

        assert_eq!(r.publish_level, Some(PublishLevel::Uninstall));
        assert!(r.is_time_based());
        assert_eq!(r.subscription_extensions_days.as_deref(), Some("30"));
        assert!(r.has_subscription_extension());
        assert_eq!(r.image_file_name(), Some("visio.png"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = ApplicationRecord::from_json(
            r#"{"organizationalApproval":true,"applicationOwnerApproval":true,"colour":"red"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidRecord(_)));
    }

    #[test]
    fn test_missing_approval_flag_rejected() {
        assert!(ApplicationRecord::from_json(r#"{"organizationalApproval":true}"#).is_err());
    }

    #[test]
    fn test_unrecognised_enum_values_kept() {
        let r = ApplicationRecord::from_json(
            r#"{"organizationalApproval":true,"applicationOwnerApproval":true,
                "publishLevel":"Both","uninstallOption":"Manual"}"#,
        )
        .unwrap();
        assert_eq!(r.publish_level, Some(PublishLevel::Other("Both".to_string())));
        assert_eq!(
            r.uninstall_option,
            Some(UninstallOption::Other("Manual".to_string()))
        );
        assert!(!r.is_time_based());
    }

    #[test]
    fn test_extension_days_zero_or_empty() {
        let mut r = record();
        for days in [None, Some(""), Some("0")] {
            r.subscription_extensions_days = days.map(str::to_string);
            assert!(!r.has_subscription_extension(), "{days:?}");
        }
        for days in ["5", " 0 ", "00"] {
            r.subscription_extensions_days = Some(days.to_string());
            assert!(r.has_subscription_extension(), "{days:?}");
        }
    }
}
