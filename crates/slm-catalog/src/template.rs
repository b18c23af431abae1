//! Service template customization.
//!
//! When a service is provisioned from a template, some workflows are
//! unlinked and some workflow activities are disabled depending on the
//! application's flags. Every rule is checked independently and appends to
//! the adjustment; nothing is replaced or deduplicated.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::{ApplicationRecord, PublishLevel};

/// Workflow that installs the software.
pub const INSTALL_SOFTWARE: &str = "Install software";
/// Workflow that uninstalls the software.
pub const UNINSTALL_SOFTWARE: &str = "Uninstall software";
/// Workflow that extends a time-based subscription.
pub const EXTEND_SUBSCRIPTION: &str = "Extend Subscription";

/// Install software: wait for organizational approval.
pub const ORG_APPROVAL_WAIT_STEP: u32 = 1;
/// Install software: perform organizational approval.
pub const ORG_APPROVAL_STEP: u32 = 2;
/// Install software: wait for application-owner approval.
pub const OWNER_APPROVAL_WAIT_STEP: u32 = 3;
/// Install software: perform application-owner approval.
pub const OWNER_APPROVAL_STEP: u32 = 4;
/// Install software: subscription handling.
pub const SUBSCRIPTION_STEP: u32 = 7;
/// Uninstall software: uninstall task.
pub const UNINSTALL_TASK_STEP: u32 = 1;
/// Uninstall software: uninstall approval task.
pub const UNINSTALL_APPROVAL_STEP: u32 = 2;

/// A workflow activity addressed by workflow name and step priority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ActivityReference {
    pub workflow: String,
    pub priority: u32,
}

impl ActivityReference {
    pub fn new(workflow: impl Into<String>, priority: u32) -> Self {
        Self {
            workflow: workflow.into(),
            priority,
        }
    }
}

/// Workflow exclusions applied when importing a service from a template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ServiceTemplateAdjustment {
    /// Name of the service being imported.
    #[serde(default)]
    pub service_name: String,

    /// Whether users need approval to uninstall. Absent means not configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_uninstall_approval: Option<bool>,

    /// Workflows to unlink from the service.
    #[serde(default)]
    pub workflows_to_unlink: Vec<String>,

    /// Workflow activities to disable.
    #[serde(default)]
    pub activities_to_disable: Vec<ActivityReference>,
}

impl ServiceTemplateAdjustment {
    /// An empty adjustment for `service_name`.
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            ..Self::default()
        }
    }

    fn unlink(&mut self, workflow: &str) {
        self.workflows_to_unlink.push(workflow.to_string());
    }

    fn disable(&mut self, workflow: &str, priority: u32) {
        self.activities_to_disable
            .push(ActivityReference::new(workflow, priority));
    }
}

/// Append the workflows `record` requires unlinking.
pub fn apply_workflow_unlinks(
    record: &ApplicationRecord,
    mut adjustment: ServiceTemplateAdjustment,
) -> ServiceTemplateAdjustment {
    match record.publish_level {
        Some(PublishLevel::Uninstall) => adjustment.unlink(INSTALL_SOFTWARE),
        Some(PublishLevel::Install) => adjustment.unlink(UNINSTALL_SOFTWARE),
        _ => {}
    }

    // Only a time-based policy with a positive extension keeps the workflow.
    if !record.is_time_based() || !record.has_subscription_extension() {
        adjustment.unlink(EXTEND_SUBSCRIPTION);
    }

    debug!(
        service = %adjustment.service_name,
        unlinks = adjustment.workflows_to_unlink.len(),
        "Applied workflow unlinks"
    );
    adjustment
}

/// Append the workflow activities `record` requires disabling.
pub fn apply_activity_disables(
    record: &ApplicationRecord,
    mut adjustment: ServiceTemplateAdjustment,
) -> ServiceTemplateAdjustment {
    if !record.is_time_based() {
        adjustment.disable(INSTALL_SOFTWARE, SUBSCRIPTION_STEP);
    }

    if !record.organizational_approval {
        adjustment.disable(INSTALL_SOFTWARE, ORG_APPROVAL_WAIT_STEP);
        adjustment.disable(INSTALL_SOFTWARE, ORG_APPROVAL_STEP);
    }

    if !record.application_owner_approval {
        adjustment.disable(INSTALL_SOFTWARE, OWNER_APPROVAL_WAIT_STEP);
        adjustment.disable(INSTALL_SOFTWARE, OWNER_APPROVAL_STEP);
    }

    if adjustment.user_uninstall_approval == Some(false) {
        adjustment.disable(UNINSTALL_SOFTWARE, UNINSTALL_TASK_STEP);
        adjustment.disable(UNINSTALL_SOFTWARE, UNINSTALL_APPROVAL_STEP);
    }

    debug!(
        service = %adjustment.service_name,
        disables = adjustment.activities_to_disable.len(),
        "Applied activity disables"
    );
    adjustment
}

/// Apply both the unlink and the disable rules.
pub fn customize_template(
    record: &ApplicationRecord,
    adjustment: ServiceTemplateAdjustment,
) -> ServiceTemplateAdjustment {
    apply_activity_disables(record, apply_workflow_unlinks(record, adjustment))
}
