//! Directory collaborator trait.
//!
//! Every directory interaction goes through [`DirectoryClient`], so the
//! resolver, membership manager and verifier can run against LDAP in
//! production and against [`crate::testing::InMemoryDirectory`] in tests.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DirectoryResult;
use crate::filter::Filter;

/// A directory object returned from a search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// Distinguished name of the entry.
    pub dn: String,
    /// Attribute values keyed by attribute name.
    pub attributes: HashMap<String, Vec<String>>,
}

impl DirectoryEntry {
    /// Create an entry with no attributes.
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attributes: HashMap::new(),
        }
    }

    /// Add an attribute value (builder style).
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes
            .entry(name.into())
            .or_default()
            .push(value.into());
        self
    }

    /// First value of an attribute. Attribute names compare case-insensitively,
    /// as LDAP attribute descriptions do.
    pub fn first(&self, name: &str) -> Option<&str> {
        self.values(name).first().map(String::as_str)
    }

    /// All values of an attribute.
    pub fn values(&self, name: &str) -> &[String] {
        self.attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, values)| values.as_slice())
            .unwrap_or(&[])
    }
}

/// A direct member of a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryMember {
    /// Relative name (`name` / `cn`).
    pub name: String,
    /// sAMAccountName.
    pub account_name: String,
    /// Security identifier in `S-1-...` form.
    pub security_id: String,
    /// Distinguished name.
    pub distinguished_name: String,
}

/// A group a principal belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupReference {
    /// Relative name (`cn`).
    pub name: String,
    /// Distinguished name.
    pub distinguished_name: String,
}

/// Request/response access to the directory service.
///
/// `group` and `member` arguments are directory identity strings (account
/// name, distinguished name or common name); the implementation resolves them
/// the way the directory's own tooling does. Implementations surface failures
/// immediately and never retry.
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    /// Subtree search under the configured base.
    async fn search(&self, filter: &Filter, attributes: &[&str])
        -> DirectoryResult<Vec<DirectoryEntry>>;

    /// Add `member` to `group`.
    async fn add_group_member(&self, group: &str, member: &str) -> DirectoryResult<()>;

    /// Remove `member` from `group`. Never prompts.
    async fn remove_group_member(&self, group: &str, member: &str) -> DirectoryResult<()>;

    /// Direct members of `group`, in directory order.
    async fn group_members(&self, group: &str) -> DirectoryResult<Vec<DirectoryMember>>;

    /// Groups the object at `member_dn` is a direct member of.
    async fn principal_groups(&self, member_dn: &str) -> DirectoryResult<Vec<GroupReference>>;
}

#[async_trait]
impl<T: DirectoryClient + ?Sized> DirectoryClient for std::sync::Arc<T> {
    async fn search(
        &self,
        filter: &Filter,
        attributes: &[&str],
    ) -> DirectoryResult<Vec<DirectoryEntry>> {
        (**self).search(filter, attributes).await
    }

    async fn add_group_member(&self, group: &str, member: &str) -> DirectoryResult<()> {
        (**self).add_group_member(group, member).await
    }

    async fn remove_group_member(&self, group: &str, member: &str) -> DirectoryResult<()> {
        (**self).remove_group_member(group, member).await
    }

    async fn group_members(&self, group: &str) -> DirectoryResult<Vec<DirectoryMember>> {
        (**self).group_members(group).await
    }

    async fn principal_groups(&self, member_dn: &str) -> DirectoryResult<Vec<GroupReference>> {
        (**self).principal_groups(member_dn).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_attribute_lookup_is_case_insensitive() {
        let entry = DirectoryEntry::new("CN=jdoe,DC=corp,DC=com")
            .with("sAMAccountName", "jdoe")
            .with("memberOf", "CN=A,DC=corp,DC=com")
            .with("memberOf", "CN=B,DC=corp,DC=com");

        assert_eq!(entry.first("samaccountname"), Some("jdoe"));
        assert_eq!(entry.values("MEMBEROF").len(), 2);
        assert!(entry.first("mail").is_none());
        assert!(entry.values("mail").is_empty());
    }
}
