//! Identity resolution.
//!
//! Maps a free-form identifier to exactly one directory object of a requested
//! kind. Zero or several matches are both resolution failures.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::error::{DirectoryError, DirectoryResult};
use crate::identity::{IdentityInput, IdentityKind, ResolvedIdentity};
use crate::traits::{DirectoryClient, DirectoryEntry};

/// Attributes requested for every resolution search.
pub const RESOLUTION_ATTRIBUTES: &[&str] = &["distinguishedName", "sAMAccountName", "cn"];

/// Outcome of validating a provisioning item against the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisioningValidation {
    pub validated: bool,
    pub message: String,
}

/// Resolves raw identifiers against a [`DirectoryClient`]. Read-only.
#[derive(Debug, Clone)]
pub struct IdentityResolver<D> {
    directory: D,
}

impl<D: DirectoryClient> IdentityResolver<D> {
    pub fn new(directory: D) -> Self {
        Self { directory }
    }

    /// Access the underlying directory client.
    pub fn directory(&self) -> &D {
        &self.directory
    }

    /// Resolve `input` to exactly one object of `kind`.
    ///
    /// For computers the input is used as given: callers that address the
    /// computer account pass the `$`-suffixed account name themselves.
    #[instrument(skip(self))]
    pub async fn resolve(&self, input: &str, kind: IdentityKind) -> DirectoryResult<ResolvedIdentity> {
        let classified =
            IdentityInput::classify(input).ok_or_else(|| DirectoryError::ResolutionFailed {
                input: input.to_string(),
                kind,
                matches: 0,
            })?;

        let filter = kind.object_filter().and_with(classified.filter());
        debug!(scheme = classified.scheme(), filter = %filter, "Resolving identity");

        let mut entries = self
            .directory
            .search(&filter, RESOLUTION_ATTRIBUTES)
            .await?;

        if entries.len() != 1 {
            return Err(DirectoryError::ResolutionFailed {
                input: input.to_string(),
                kind,
                matches: entries.len(),
            });
        }

        let entry = entries.remove(0);
        Ok(to_resolved(entry, kind))
    }

    /// Distinguished name of a user.
    pub async fn resolve_user_dn(&self, input: &str) -> DirectoryResult<String> {
        Ok(self.resolve(input, IdentityKind::User).await?.distinguished_name)
    }

    /// Distinguished name of a computer.
    pub async fn resolve_computer_dn(&self, input: &str) -> DirectoryResult<String> {
        Ok(self
            .resolve(input, IdentityKind::Computer)
            .await?
            .distinguished_name)
    }

    /// Distinguished name of a deployment container (group).
    pub async fn resolve_container_dn(&self, input: &str) -> DirectoryResult<String> {
        Ok(self
            .resolve(input, IdentityKind::Group)
            .await?
            .distinguished_name)
    }

    /// Distinguished name of the user approving a request.
    pub async fn resolve_approver_dn(&self, input: &str) -> DirectoryResult<String> {
        self.resolve_user_dn(input).await
    }

    /// Account name of an application owner.
    pub async fn resolve_owner_account_name(&self, input: &str) -> DirectoryResult<String> {
        let resolved = self.resolve(input, IdentityKind::User).await?;
        resolved
            .account_name
            .ok_or_else(|| DirectoryError::operation_failed(format!(
                "user '{}' has no sAMAccountName",
                resolved.distinguished_name
            )))
    }

    /// Check that `item` resolves as `kind`. Never fails; directory and
    /// resolution errors become a negative result carrying the error text.
    pub async fn validate_provisioning_item(
        &self,
        item: &str,
        kind: IdentityKind,
    ) -> ProvisioningValidation {
        match self.resolve(item, kind).await {
            Ok(_) => ProvisioningValidation {
                validated: true,
                message: format!("Validated {kind} {item}."),
            },
            Err(e) => {
                if !e.is_caller_error() {
                    warn!(
                        error = %e,
                        error_code = e.error_code(),
                        "Directory failure during validation"
                    );
                }
                ProvisioningValidation {
                    validated: false,
                    message: e.to_string(),
                }
            }
        }
    }
}

fn to_resolved(entry: DirectoryEntry, kind: IdentityKind) -> ResolvedIdentity {
    let distinguished_name = entry
        .first("distinguishedName")
        .map(str::to_string)
        .unwrap_or_else(|| entry.dn.clone());
    ResolvedIdentity {
        kind,
        distinguished_name,
        account_name: entry.first("sAMAccountName").map(str::to_string),
        name: entry.first("cn").map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{DirectoryCall, InMemoryDirectory};

    fn directory() -> InMemoryDirectory {
        InMemoryDirectory::new()
            .with_user("jdoe", "John Doe")
            .with_user("asmith", "Alice Smith")
            .with_computer("PC01")
            .with_group("App-Visio-Install")
    }

    #[tokio::test]
    async fn test_resolve_user_by_account_name() {
        let resolver = IdentityResolver::new(directory());
        let resolved = resolver.resolve("jdoe", IdentityKind::User).await.unwrap();

        assert_eq!(resolved.kind, IdentityKind::User);
        assert_eq!(
            resolved.distinguished_name,
            "CN=John Doe,OU=Users,DC=corp,DC=example,DC=com"
        );
        assert_eq!(resolved.account_name.as_deref(), Some("jdoe"));
    }

    #[tokio::test]
    async fn test_resolve_user_by_every_scheme() {
        let resolver = IdentityResolver::new(directory());
        let expected = "CN=John Doe,OU=Users,DC=corp,DC=example,DC=com";

        for input in [
            "jdoe",
            "jdoe@corp.example.com",
            expected,
            "John Doe",
            "CORP\\jdoe",
        ] {
            let dn = resolver.resolve_user_dn(input).await.unwrap();
            assert_eq!(dn, expected, "input {input}");
        }
    }

    #[tokio::test]
    async fn test_resolve_wrong_kind_fails() {
        let resolver = IdentityResolver::new(directory());
        let err = resolver
            .resolve("jdoe", IdentityKind::Computer)
            .await
            .unwrap_err();

        match err {
            DirectoryError::ResolutionFailed {
                input,
                kind,
                matches,
            } => {
                assert_eq!(input, "jdoe");
                assert_eq!(kind, IdentityKind::Computer);
                assert_eq!(matches, 0);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_resolve_ambiguous_fails() {
        let dir = directory().with_user("jdoe2", "John Doe");
        let resolver = IdentityResolver::new(dir);
        let err = resolver
            .resolve("John Doe", IdentityKind::User)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DirectoryError::ResolutionFailed { matches: 2, .. }
        ));
    }

    #[tokio::test]
    async fn test_resolve_computer_uses_input_verbatim() {
        let dir = directory();
        let resolver = IdentityResolver::new(dir);

        let dn = resolver.resolve_computer_dn("PC01$").await.unwrap();
        assert_eq!(dn, "CN=PC01,OU=Computers,DC=corp,DC=example,DC=com");

        let calls = resolver.directory().calls();
        let DirectoryCall::Search { filter } = &calls[0] else {
            panic!("expected a search");
        };
        assert!(filter.contains("(sAMAccountName=PC01$)"));
    }

    #[tokio::test]
    async fn test_blank_input_makes_no_directory_call() {
        let resolver = IdentityResolver::new(directory());
        let err = resolver.resolve("  ", IdentityKind::User).await.unwrap_err();

        assert!(matches!(err, DirectoryError::ResolutionFailed { .. }));
        assert!(resolver.directory().calls().is_empty());
    }

    #[tokio::test]
    async fn test_resolve_container_and_owner() {
        let resolver = IdentityResolver::new(directory());

        assert_eq!(
            resolver
                .resolve_container_dn("App-Visio-Install")
                .await
                .unwrap(),
            "CN=App-Visio-Install,OU=Groups,DC=corp,DC=example,DC=com"
        );
        assert_eq!(
            resolver
                .resolve_owner_account_name("asmith@corp.example.com")
                .await
                .unwrap(),
            "asmith"
        );
        assert_eq!(
            resolver.resolve_approver_dn("Alice Smith").await.unwrap(),
            "CN=Alice Smith,OU=Users,DC=corp,DC=example,DC=com"
        );
    }

    #[tokio::test]
    async fn test_validate_provisioning_item() {
        let resolver = IdentityResolver::new(directory());

        let ok = resolver
            .validate_provisioning_item("PC01$", IdentityKind::Computer)
            .await;
        assert!(ok.validated);
        assert_eq!(ok.message, "Validated computer PC01$.");

        let missing = resolver
            .validate_provisioning_item("PC99$", IdentityKind::Computer)
            .await;
        assert!(!missing.validated);
        assert!(missing.message.contains("PC99$"));
        assert!(missing.message.contains("computer"));
    }

    #[tokio::test]
    async fn test_directory_failure_propagates() {
        let resolver = IdentityResolver::new(directory().failing());
        let err = resolver.resolve("jdoe", IdentityKind::User).await.unwrap_err();
        assert!(matches!(err, DirectoryError::OperationFailed { .. }));
    }
}
