//! Deployment-container membership.
//!
//! Membership in a deployment container is the installed/entitled state of an
//! application for a principal. Adds and removes go straight to the directory;
//! validation of the request happens first so a malformed request never
//! reaches a mutation.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::error::{DirectoryError, DirectoryResult};
use crate::identity::{computer_account_name, IdentityKind, ResolvedIdentity};
use crate::resolver::IdentityResolver;
use crate::traits::DirectoryClient;

/// A request to add or remove a principal from a deployment container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipRequest {
    /// User identity, required when `kind` is `User`.
    #[serde(default)]
    pub user: Option<String>,
    /// Computer identity, required when `kind` is `Computer`.
    #[serde(default)]
    pub computer: Option<String>,
    /// Target deployment container.
    pub container: String,
    /// Which of `user` / `computer` the request is about.
    pub kind: IdentityKind,
}

impl MembershipRequest {
    /// Request for a user.
    pub fn for_user(user: impl Into<String>, container: impl Into<String>) -> Self {
        Self {
            user: Some(user.into()),
            computer: None,
            container: container.into(),
            kind: IdentityKind::User,
        }
    }

    /// Request for a computer.
    pub fn for_computer(computer: impl Into<String>, container: impl Into<String>) -> Self {
        Self {
            user: None,
            computer: Some(computer.into()),
            container: container.into(),
            kind: IdentityKind::Computer,
        }
    }

    /// The member identity selected by `kind`.
    ///
    /// Exactly one of `user` / `computer` must be set (blank counts as unset)
    /// and it must be the one `kind` selects.
    pub fn member(&self) -> DirectoryResult<&str> {
        if self.container.trim().is_empty() {
            return Err(DirectoryError::validation("container is required"));
        }

        let user = non_blank(self.user.as_deref());
        let computer = non_blank(self.computer.as_deref());

        match (self.kind, user, computer) {
            (IdentityKind::User, Some(user), None) => Ok(user),
            (IdentityKind::Computer, None, Some(computer)) => Ok(computer),
            (IdentityKind::User, None, _) => Err(DirectoryError::validation(format!(
                "a user identity is required for kind User (container {})",
                self.container
            ))),
            (IdentityKind::Computer, _, None) => Err(DirectoryError::validation(format!(
                "a computer identity is required for kind Computer (container {})",
                self.container
            ))),
            (IdentityKind::User | IdentityKind::Computer, Some(_), Some(_)) => {
                Err(DirectoryError::validation(format!(
                    "supply either a user or a computer identity, not both (container {})",
                    self.container
                )))
            }
            (IdentityKind::Group, _, _) => Err(DirectoryError::validation(
                "membership requests take kind User or Computer",
            )),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// A container member with its security identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberSecurityId {
    pub name: String,
    pub security_id: String,
}

/// Adds, removes and lists deployment-container members.
#[derive(Debug, Clone)]
pub struct MembershipManager<D> {
    resolver: IdentityResolver<D>,
}

impl<D: DirectoryClient> MembershipManager<D> {
    pub fn new(directory: D) -> Self {
        Self {
            resolver: IdentityResolver::new(directory),
        }
    }

    /// Access the underlying directory client.
    pub fn directory(&self) -> &D {
        self.resolver.directory()
    }

    /// Add the requested principal to its container.
    ///
    /// The member identity is passed through as supplied; adding a member
    /// that is already present follows directory semantics.
    #[instrument(skip(self), fields(container = %request.container, kind = %request.kind))]
    pub async fn add_member(&self, request: &MembershipRequest) -> DirectoryResult<()> {
        let member = request.member()?;

        self.directory()
            .add_group_member(&request.container, member)
            .await?;

        info!(member = %member, "Added member to deployment container");
        Ok(())
    }

    /// Remove the requested principal from its container.
    ///
    /// Computers are removed by account name, so the `$` suffix is appended
    /// here. The add path does not do this.
    // TODO: confirm with the directory owners whether add should also use
    // the computer account name; the asymmetry is kept until then.
    #[instrument(skip(self), fields(container = %request.container, kind = %request.kind))]
    pub async fn remove_member(&self, request: &MembershipRequest) -> DirectoryResult<()> {
        let member = request.member()?;
        let member = match request.kind {
            IdentityKind::Computer => computer_account_name(member),
            _ => member.to_string(),
        };

        self.directory()
            .remove_group_member(&request.container, &member)
            .await?;

        info!(member = %member, "Removed member from deployment container");
        Ok(())
    }

    /// Account names of the container's direct members, in directory order.
    #[instrument(skip(self))]
    pub async fn list_members(&self, container: &str) -> DirectoryResult<Vec<String>> {
        let members = self.directory().group_members(container).await?;
        debug!(count = members.len(), "Listed container members");
        Ok(members.into_iter().map(|m| m.account_name).collect())
    }

    /// Names and security identifiers of the container's direct members.
    #[instrument(skip(self))]
    pub async fn list_members_with_security_id(
        &self,
        container: &str,
    ) -> DirectoryResult<Vec<MemberSecurityId>> {
        let members = self.directory().group_members(container).await?;
        Ok(members
            .into_iter()
            .map(|m| MemberSecurityId {
                name: m.name,
                security_id: m.security_id,
            })
            .collect())
    }

    /// The subset of `candidates` the subject is a direct member of.
    ///
    /// The subject is resolved as a user first and, failing that, as a
    /// computer account. Candidates match a group by name or distinguished
    /// name (case-insensitive); the result keeps candidate order and spelling
    /// and contains no duplicates.
    #[instrument(skip(self, candidates), fields(candidate_count = candidates.len()))]
    pub async fn installed_deployment_targets(
        &self,
        subject: &str,
        candidates: &[String],
    ) -> DirectoryResult<Vec<String>> {
        let principal = self.resolve_subject(subject).await?;
        let groups = self
            .directory()
            .principal_groups(&principal.distinguished_name)
            .await?;

        let memberships: HashSet<String> = groups
            .iter()
            .flat_map(|g| [g.name.to_lowercase(), g.distinguished_name.to_lowercase()])
            .collect();

        let mut seen = HashSet::new();
        let installed: Vec<String> = candidates
            .iter()
            .filter(|c| memberships.contains(&c.to_lowercase()))
            .filter(|c| seen.insert(c.to_lowercase()))
            .cloned()
            .collect();

        debug!(
            principal = %principal.distinguished_name,
            installed = installed.len(),
            "Computed installed deployment targets"
        );
        Ok(installed)
    }

    async fn resolve_subject(&self, subject: &str) -> DirectoryResult<ResolvedIdentity> {
        match self.resolver.resolve(subject, IdentityKind::User).await {
            Ok(user) => return Ok(user),
            Err(DirectoryError::ResolutionFailed { .. }) => {}
            Err(e) => return Err(e),
        }

        debug!(subject = %subject, "Subject is not a user, retrying as computer");
        match self
            .resolver
            .resolve(&computer_account_name(subject), IdentityKind::Computer)
            .await
        {
            Ok(computer) => Ok(computer),
            Err(DirectoryError::ResolutionFailed { .. }) => Err(DirectoryError::UnresolvedIdentity {
                input: subject.to_string(),
            }),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_selected_by_kind() {
        let user = MembershipRequest::for_user("jdoe", "App-Visio");
        assert_eq!(user.member().unwrap(), "jdoe");

        let computer = MembershipRequest::for_computer("PC01", "App-Visio");
        assert_eq!(computer.member().unwrap(), "PC01");
    }

    #[test]
    fn test_member_missing_for_kind() {
        let mut request = MembershipRequest::for_computer("PC01", "App-Visio");
        request.kind = IdentityKind::User;
        let err = request.member().unwrap_err();
        assert!(matches!(err, DirectoryError::Validation { .. }));
        assert!(err.to_string().contains("App-Visio"));
    }

    #[test]
    fn test_blank_member_counts_as_missing() {
        let request = MembershipRequest::for_user("   ", "App-Visio");
        assert!(matches!(
            request.member(),
            Err(DirectoryError::Validation { .. })
        ));
    }

    #[test]
    fn test_both_members_rejected() {
        let mut request = MembershipRequest::for_user("jdoe", "App-Visio");
        request.computer = Some("PC01".to_string());
        assert!(request.member().is_err());
    }

    #[test]
    fn test_group_kind_rejected() {
        let mut request = MembershipRequest::for_user("jdoe", "App-Visio");
        request.kind = IdentityKind::Group;
        assert!(request.member().is_err());
    }

    #[test]
    fn test_blank_container_rejected() {
        let request = MembershipRequest::for_user("jdoe", " ");
        assert!(request.member().is_err());
    }

    #[test]
    fn test_request_deserializes_from_caller_json() {
        let request: MembershipRequest = serde_json::from_str(
            r#"{"computer":"PC01","container":"App-Visio","kind":"Computer"}"#,
        )
        .unwrap();
        assert_eq!(request.user, None);
        assert_eq!(request.member().unwrap(), "PC01");
    }
}
