//! In-memory directory for tests.
//!
//! [`InMemoryDirectory`] implements [`DirectoryClient`] over a small object
//! table and records every call it receives, so tests can assert on the exact
//! arguments passed to the directory and on how many calls were made.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{DirectoryError, DirectoryResult};
use crate::filter::Filter;
use crate::identity::{computer_account_name, IdentityKind};
use crate::traits::{DirectoryClient, DirectoryEntry, DirectoryMember, GroupReference};

const BASE_DN: &str = "DC=corp,DC=example,DC=com";
const DOMAIN_SID: &str = "S-1-5-21-1004336348-1177238915-682003330";

/// A call received by the in-memory directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryCall {
    Search { filter: String },
    AddGroupMember { group: String, member: String },
    RemoveGroupMember { group: String, member: String },
    GroupMembers { group: String },
    PrincipalGroups { member_dn: String },
}

impl DirectoryCall {
    /// Whether the call mutates directory state.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            DirectoryCall::AddGroupMember { .. } | DirectoryCall::RemoveGroupMember { .. }
        )
    }
}

#[derive(Debug, Clone)]
struct StoredObject {
    kind: IdentityKind,
    dn: String,
    name: String,
    account_name: String,
    security_id: String,
    upn: Option<String>,
}

impl StoredObject {
    fn matches_identity(&self, identity: &str) -> bool {
        self.dn.eq_ignore_ascii_case(identity)
            || self.account_name.eq_ignore_ascii_case(identity)
            || self.name.eq_ignore_ascii_case(identity)
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        match name.to_ascii_lowercase().as_str() {
            "distinguishedname" => Some(&self.dn),
            "samaccountname" => Some(&self.account_name),
            "cn" | "name" => Some(&self.name),
            "objectsid" => Some(&self.security_id),
            "userprincipalname" => self.upn.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct State {
    objects: Vec<StoredObject>,
    // (group dn, member dn), in insertion order
    memberships: Vec<(String, String)>,
    calls: Vec<DirectoryCall>,
    next_rid: u32,
}

/// Recording in-memory implementation of [`DirectoryClient`].
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    state: Mutex<State>,
    failing: bool,
}

impl InMemoryDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail with an operation error, as an unreachable
    /// domain controller would.
    #[must_use]
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// Add a user with the given account name and display name.
    #[must_use]
    pub fn with_user(self, account_name: &str, name: &str) -> Self {
        let dn = format!("CN={name},OU=Users,{BASE_DN}");
        let upn = Some(format!("{account_name}@corp.example.com"));
        self.insert(IdentityKind::User, dn, name, account_name, upn);
        self
    }

    /// Add a computer. Its account name carries the `$` suffix.
    #[must_use]
    pub fn with_computer(self, host_name: &str) -> Self {
        let dn = format!("CN={host_name},OU=Computers,{BASE_DN}");
        let account = computer_account_name(host_name);
        self.insert(IdentityKind::Computer, dn, host_name, &account, None);
        self
    }

    /// Add a group.
    #[must_use]
    pub fn with_group(self, name: &str) -> Self {
        let dn = format!("CN={name},OU=Groups,{BASE_DN}");
        self.insert(IdentityKind::Group, dn, name, name, None);
        self
    }

    /// Seed a membership without recording a call.
    #[must_use]
    pub fn with_membership(self, group: &str, member: &str) -> Self {
        {
            let mut state = self.lock();
            let group_dn = find(&state.objects, group).map(|o| o.dn.clone());
            let member_dn = find(&state.objects, member).map(|o| o.dn.clone());
            if let (Some(g), Some(m)) = (group_dn, member_dn) {
                state.memberships.push((g, m));
            }
        }
        self
    }

    /// Security identifier of a seeded object.
    pub fn sid_of(&self, identity: &str) -> Option<String> {
        find(&self.lock().objects, identity).map(|o| o.security_id.clone())
    }

    /// Every call received so far.
    pub fn calls(&self) -> Vec<DirectoryCall> {
        self.lock().calls.clone()
    }

    /// Number of add/remove calls received so far.
    pub fn mutation_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.is_mutation())
            .count()
    }

    fn insert(
        &self,
        kind: IdentityKind,
        dn: String,
        name: &str,
        account_name: &str,
        upn: Option<String>,
    ) {
        let mut state = self.lock();
        state.next_rid += 1;
        let security_id = format!("{DOMAIN_SID}-{}", 1100 + state.next_rid);
        state.objects.push(StoredObject {
            kind,
            dn,
            name: name.to_string(),
            account_name: account_name.to_string(),
            security_id,
            upn,
        });
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // A poisoned lock only happens after a panicking test; keep going.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, call: DirectoryCall) -> DirectoryResult<()> {
        self.lock().calls.push(call);
        if self.failing {
            return Err(DirectoryError::operation_failed(
                "domain controller unavailable",
            ));
        }
        Ok(())
    }
}

fn find<'a>(objects: &'a [StoredObject], identity: &str) -> Option<&'a StoredObject> {
    objects.iter().find(|o| o.matches_identity(identity))
}

fn find_kind<'a>(
    objects: &'a [StoredObject],
    identity: &str,
    kind: IdentityKind,
) -> Option<&'a StoredObject> {
    objects
        .iter()
        .find(|o| o.kind == kind && o.matches_identity(identity))
}

fn evaluate(filter: &Filter, object: &StoredObject) -> bool {
    match filter {
        Filter::Equals { attribute, value } => object
            .attribute(attribute)
            .is_some_and(|v| v.eq_ignore_ascii_case(value)),
        Filter::And { filters } => filters.iter().all(|f| evaluate(f, object)),
        Filter::Or { filters } => filters.iter().any(|f| evaluate(f, object)),
        Filter::Raw(raw) => [
            IdentityKind::User,
            IdentityKind::Computer,
            IdentityKind::Group,
        ]
        .into_iter()
        .find(|kind| kind.object_filter().to_ldap() == *raw)
        .is_some_and(|kind| kind == object.kind),
    }
}

#[async_trait]
impl DirectoryClient for InMemoryDirectory {
    async fn search(
        &self,
        filter: &Filter,
        _attributes: &[&str],
    ) -> DirectoryResult<Vec<DirectoryEntry>> {
        self.record(DirectoryCall::Search {
            filter: filter.to_ldap(),
        })?;

        let state = self.lock();
        let entries = state
            .objects
            .iter()
            .filter(|o| evaluate(filter, o))
            .map(|o| {
                let mut entry = DirectoryEntry::new(o.dn.clone())
                    .with("distinguishedName", o.dn.clone())
                    .with("sAMAccountName", o.account_name.clone())
                    .with("cn", o.name.clone())
                    .with("objectSid", o.security_id.clone());
                if let Some(upn) = &o.upn {
                    entry = entry.with("userPrincipalName", upn.clone());
                }
                entry
            })
            .collect();
        Ok(entries)
    }

    async fn add_group_member(&self, group: &str, member: &str) -> DirectoryResult<()> {
        self.record(DirectoryCall::AddGroupMember {
            group: group.to_string(),
            member: member.to_string(),
        })?;

        let mut state = self.lock();
        let group_dn = find_kind(&state.objects, group, IdentityKind::Group)
            .map(|o| o.dn.clone())
            .ok_or_else(|| DirectoryError::ObjectNotFound {
                identifier: group.to_string(),
            })?;
        let member_dn = find(&state.objects, member)
            .map(|o| o.dn.clone())
            .ok_or_else(|| DirectoryError::ObjectNotFound {
                identifier: member.to_string(),
            })?;

        let already = state
            .memberships
            .iter()
            .any(|(g, m)| *g == group_dn && *m == member_dn);
        if !already {
            state.memberships.push((group_dn, member_dn));
        }
        Ok(())
    }

    async fn remove_group_member(&self, group: &str, member: &str) -> DirectoryResult<()> {
        self.record(DirectoryCall::RemoveGroupMember {
            group: group.to_string(),
            member: member.to_string(),
        })?;

        let mut state = self.lock();
        let group_dn = find_kind(&state.objects, group, IdentityKind::Group)
            .map(|o| o.dn.clone())
            .ok_or_else(|| DirectoryError::ObjectNotFound {
                identifier: group.to_string(),
            })?;
        let member_dn = find(&state.objects, member)
            .map(|o| o.dn.clone())
            .ok_or_else(|| DirectoryError::ObjectNotFound {
                identifier: member.to_string(),
            })?;

        let before = state.memberships.len();
        state
            .memberships
            .retain(|(g, m)| !(*g == group_dn && *m == member_dn));
        if state.memberships.len() == before {
            return Err(DirectoryError::operation_failed(format!(
                "{member} is not a member of {group}"
            )));
        }
        Ok(())
    }

    async fn group_members(&self, group: &str) -> DirectoryResult<Vec<DirectoryMember>> {
        self.record(DirectoryCall::GroupMembers {
            group: group.to_string(),
        })?;

        let state = self.lock();
        let group_dn = find_kind(&state.objects, group, IdentityKind::Group)
            .map(|o| o.dn.clone())
            .ok_or_else(|| DirectoryError::ObjectNotFound {
                identifier: group.to_string(),
            })?;

        let members = state
            .memberships
            .iter()
            .filter(|(g, _)| *g == group_dn)
            .filter_map(|(_, m)| state.objects.iter().find(|o| o.dn == *m))
            .map(|o| DirectoryMember {
                name: o.name.clone(),
                account_name: o.account_name.clone(),
                security_id: o.security_id.clone(),
                distinguished_name: o.dn.clone(),
            })
            .collect();
        Ok(members)
    }

    async fn principal_groups(&self, member_dn: &str) -> DirectoryResult<Vec<GroupReference>> {
        self.record(DirectoryCall::PrincipalGroups {
            member_dn: member_dn.to_string(),
        })?;

        let state = self.lock();
        let groups = state
            .memberships
            .iter()
            .filter(|(_, m)| m.eq_ignore_ascii_case(member_dn))
            .filter_map(|(g, _)| state.objects.iter().find(|o| o.dn == *g))
            .map(|o| GroupReference {
                name: o.name.clone(),
                distinguished_name: o.dn.clone(),
            })
            .collect();
        Ok(groups)
    }
}
