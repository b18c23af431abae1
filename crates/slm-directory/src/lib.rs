//! # SLM Directory
//!
//! Active Directory side of software lifecycle management automation.
//!
//! Deployment containers are directory groups: membership of a user or
//! computer in a container means the application is installed on (or
//! entitled to) that principal. This crate resolves free-form identifiers to
//! directory objects and adds, removes, lists and verifies container members.
//!
//! ## Features
//!
//! - Identity resolution by account name, UPN, DN, common name or `DOMAIN\account`
//! - Container membership add/remove/list, with security identifiers
//! - Installed-target intersection for a subject
//! - Reharvest membership verification
//! - `ldap3` backend and an in-memory backend for tests
//!
//! ## Example
//!
//! ```ignore
//! use slm_directory::{LdapConfig, LdapDirectory, MembershipManager, MembershipRequest};
//!
//! let config = LdapConfig::new(
//!     "dc01.corp.example.com",
//!     "DC=corp,DC=example,DC=com",
//!     "svc-slm@corp.example.com",
//! )
//! .with_password("secret");
//!
//! let manager = MembershipManager::new(LdapDirectory::new(config)?);
//! manager
//!     .add_member(&MembershipRequest::for_computer("PC01", "App-Visio-Install"))
//!     .await?;
//! ```

pub mod config;
pub mod error;
pub mod filter;
pub mod identity;
pub mod ldap;
pub mod membership;
pub mod resolver;
pub mod sid;
pub mod testing;
pub mod traits;
pub mod verifier;

// Re-exports
pub use config::LdapConfig;
pub use error::{DirectoryError, DirectoryResult};
pub use filter::Filter;
pub use identity::{computer_account_name, IdentityInput, IdentityKind, ResolvedIdentity};
pub use ldap::LdapDirectory;
pub use membership::{MemberSecurityId, MembershipManager, MembershipRequest};
pub use resolver::{IdentityResolver, ProvisioningValidation};
pub use traits::{DirectoryClient, DirectoryEntry, DirectoryMember, GroupReference};
pub use verifier::{MembershipVerification, MembershipVerifier};
