//! # SLM Catalog
//!
//! Software-asset side of SLM automation: application records, deployment
//! type derivation, service template customization and service image import.
//!
//! ## Example
//!
//! ```ignore
//! use slm_catalog::{customize_template, ApplicationRecord, ServiceTemplateAdjustment};
//!
//! let record = ApplicationRecord::from_json(&json)?;
//! let adjustment = customize_template(&record, ServiceTemplateAdjustment::new(&record.name));
//! ```

pub mod application;
pub mod error;
pub mod image;
pub mod template;

// Re-exports
pub use application::{
    derive_deployment_type, ApplicationRecord, DeploymentType, PublishLevel, UninstallOption,
};
pub use error::{CatalogError, CatalogResult};
pub use image::{ImageCredentials, ImageImporter, IMAGE_REFERENCE_PREFIX, NO_IMAGE};
pub use template::{
    apply_activity_disables, apply_workflow_unlinks, customize_template, ActivityReference,
    ServiceTemplateAdjustment, EXTEND_SUBSCRIPTION, INSTALL_SOFTWARE, UNINSTALL_SOFTWARE,
};
