//! Reharvest membership verification.
//!
//! Re-checks whether an object is currently a direct member of a deployment
//! container. Read-only and idempotent.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::DirectoryResult;
use crate::traits::DirectoryClient;

/// Reason reported when membership is confirmed.
pub const VERIFIED_REASON: &str = "Verified container membership.";

/// Outcome of a membership verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipVerification {
    pub verified: bool,
    pub reason: String,
}

impl MembershipVerification {
    fn verified() -> Self {
        Self {
            verified: true,
            reason: VERIFIED_REASON.to_string(),
        }
    }

    fn not_member(object: &str, container: &str) -> Self {
        Self {
            verified: false,
            reason: format!("{object} is not a member of {container}"),
        }
    }
}

/// Verifies container membership against the directory.
#[derive(Debug, Clone)]
pub struct MembershipVerifier<D> {
    directory: D,
}

impl<D: DirectoryClient> MembershipVerifier<D> {
    pub fn new(directory: D) -> Self {
        Self { directory }
    }

    /// Whether `object` is a direct member of `container`.
    ///
    /// `object` matches a member when it equals the member's name or its
    /// security identifier exactly.
    #[instrument(skip(self))]
    pub async fn verify(
        &self,
        object: &str,
        container: &str,
    ) -> DirectoryResult<MembershipVerification> {
        let members = self.directory.group_members(container).await?;

        let is_member = members
            .iter()
            .any(|m| m.name == object || m.security_id == object);

        debug!(is_member, member_count = members.len(), "Membership checked");

        Ok(if is_member {
            MembershipVerification::verified()
        } else {
            MembershipVerification::not_member(object, container)
        })
    }
}
