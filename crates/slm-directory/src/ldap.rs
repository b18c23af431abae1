//! Active Directory backend over LDAP.
//!
//! Implements [`DirectoryClient`] with `ldap3`. One bound connection is
//! opened lazily and shared by all calls.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ldap3::adapters::{Adapter, EntriesOnly, PagedResults};
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, Mod, Scope, SearchEntry};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::config::LdapConfig;
use crate::error::{DirectoryError, DirectoryResult};
use crate::filter::Filter;
use crate::identity::{IdentityInput, IdentityKind};
use crate::sid::{first_rdn_value, sid_to_string};
use crate::traits::{DirectoryClient, DirectoryEntry, DirectoryMember, GroupReference};

/// LDAP result code: success.
const RC_SUCCESS: u32 = 0;
/// LDAP result code: noSuchObject.
const RC_NO_SUCH_OBJECT: u32 = 32;
/// LDAP result code: invalidCredentials.
const RC_INVALID_CREDENTIALS: u32 = 49;
/// LDAP result code: entryAlreadyExists (member value already present).
const RC_ENTRY_ALREADY_EXISTS: u32 = 68;

/// Page size for subtree searches. Stays under the Active Directory
/// MaxPageSize default of 1000.
const SEARCH_PAGE_SIZE: i32 = 500;

const MEMBER_ATTRIBUTES: &[&str] = &["cn", "name", "sAMAccountName", "objectSid"];

/// Directory client bound to an Active Directory domain controller.
pub struct LdapDirectory {
    config: LdapConfig,
    connection: Arc<RwLock<Option<Ldap>>>,
}

impl LdapDirectory {
    /// Create a directory client. No connection is made until first use.
    pub fn new(config: LdapConfig) -> DirectoryResult<Self> {
        config.validate()?;

        Ok(Self {
            config,
            connection: Arc::new(RwLock::new(None)),
        })
    }

    /// The active configuration.
    pub fn config(&self) -> &LdapConfig {
        &self.config
    }

    /// Get an LDAP connection, creating one if necessary.
    async fn get_connection(&self) -> DirectoryResult<Ldap> {
        {
            let conn_guard = self.connection.read().await;
            if let Some(ref conn) = *conn_guard {
                return Ok(conn.clone());
            }
        }

        let conn = self.create_connection().await?;

        {
            let mut conn_guard = self.connection.write().await;
            *conn_guard = Some(conn.clone());
        }

        Ok(conn)
    }

    async fn create_connection(&self) -> DirectoryResult<Ldap> {
        let url = self.config.url();
        debug!(url = %url, "Connecting to domain controller");

        let settings = LdapConnSettings::new()
            .set_conn_timeout(Duration::from_secs(self.config.connection_timeout_secs))
            .set_starttls(self.config.use_starttls);

        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &url)
            .await
            .map_err(|e| {
                DirectoryError::connection_failed_with_source(
                    format!("failed to connect to {url}"),
                    e,
                )
            })?;

        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!(error = %e, "LDAP connection driver error");
            }
        });

        let bind_dn = &self.config.bind_dn;
        let bind_password = self.config.bind_password.as_deref().unwrap_or("");

        debug!(bind_dn = %bind_dn, "Performing LDAP bind");

        let result = ldap
            .simple_bind(bind_dn, bind_password)
            .await
            .map_err(|e| {
                DirectoryError::connection_failed_with_source(
                    format!("LDAP bind failed for {bind_dn}"),
                    e,
                )
            })?;

        bind_outcome(result.rc, &result.text)?;

        info!(host = %self.config.host, "Directory connection established");
        Ok(ldap)
    }

    /// Bind and read the base DN to confirm the directory is reachable.
    #[instrument(skip(self))]
    pub async fn test_connection(&self) -> DirectoryResult<()> {
        let mut ldap = self.get_connection().await?;

        let result = ldap
            .search(
                &self.config.base_dn,
                Scope::Base,
                "(objectClass=*)",
                vec!["dn"],
            )
            .await
            .map_err(|e| DirectoryError::connection_failed_with_source("test search failed", e))?;

        let (entries, _res) = result
            .success()
            .map_err(|e| DirectoryError::connection_failed(format!("test search failed: {e}")))?;

        if entries.is_empty() {
            return Err(DirectoryError::connection_failed(format!(
                "base DN '{}' not found or not accessible",
                self.config.base_dn
            )));
        }

        info!("Directory connection test successful");
        Ok(())
    }

    /// Close the shared connection, if any.
    pub async fn close(&self) {
        let mut conn_guard = self.connection.write().await;
        if let Some(mut ldap) = conn_guard.take() {
            if let Err(e) = ldap.unbind().await {
                warn!(error = %e, "Error during LDAP unbind");
            }
        }
    }

    async fn search_entries(
        &self,
        base: &str,
        scope: Scope,
        filter: &str,
        attributes: &[&str],
    ) -> DirectoryResult<Vec<SearchEntry>> {
        let mut ldap = self.get_connection().await?;

        let adapters: Vec<Box<dyn Adapter<_, _>>> = vec![
            Box::new(EntriesOnly::new()),
            Box::new(PagedResults::new(SEARCH_PAGE_SIZE)),
        ];
        let mut stream = ldap
            .streaming_search_with(adapters, base, scope, filter, attributes.to_vec())
            .await
            .map_err(|e| DirectoryError::operation_failed_with_source("LDAP search failed", e))?;

        let mut entries = Vec::new();
        while let Some(entry) = stream
            .next()
            .await
            .map_err(|e| DirectoryError::operation_failed_with_source("LDAP search failed", e))?
        {
            entries.push(SearchEntry::construct(entry));
        }

        let result = stream.finish().await;
        search_outcome(result.rc, &result.text, base)?;

        Ok(entries)
    }

    /// Distinguished name of the single object `identity` names.
    async fn locate(&self, identity: &str, object_filter: Filter) -> DirectoryResult<String> {
        let classified =
            IdentityInput::classify(identity).ok_or_else(|| DirectoryError::ObjectNotFound {
                identifier: identity.to_string(),
            })?;
        let filter = object_filter.and_with(classified.filter());

        let mut entries = self
            .search_entries(&self.config.base_dn, Scope::Subtree, &filter.to_ldap(), &["dn"])
            .await?;

        match entries.len() {
            0 => Err(DirectoryError::ObjectNotFound {
                identifier: identity.to_string(),
            }),
            1 => Ok(entries.remove(0).dn),
            n => Err(DirectoryError::operation_failed(format!(
                "'{identity}' matches {n} directory objects"
            ))),
        }
    }

    async fn locate_group(&self, group: &str) -> DirectoryResult<String> {
        self.locate(group, IdentityKind::Group.object_filter()).await
    }

    async fn locate_principal(&self, member: &str) -> DirectoryResult<String> {
        let principals = Filter::or(vec![
            IdentityKind::User.object_filter(),
            IdentityKind::Computer.object_filter(),
        ]);
        self.locate(member, principals).await
    }

    async fn modify_membership(
        &self,
        group_dn: &str,
        change: Mod<String>,
    ) -> DirectoryResult<u32> {
        let mut ldap = self.get_connection().await?;

        let result = ldap
            .modify(group_dn, vec![change])
            .await
            .map_err(|e| DirectoryError::operation_failed_with_source("LDAP modify failed", e))?;

        Ok(result.rc)
    }
}

impl std::fmt::Debug for LdapDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LdapDirectory")
            .field("config", &self.config.redacted())
            .finish()
    }
}

#[async_trait]
impl DirectoryClient for LdapDirectory {
    #[instrument(skip(self, attributes), fields(filter = %filter))]
    async fn search(
        &self,
        filter: &Filter,
        attributes: &[&str],
    ) -> DirectoryResult<Vec<DirectoryEntry>> {
        let entries = self
            .search_entries(
                &self.config.base_dn,
                Scope::Subtree,
                &filter.to_ldap(),
                attributes,
            )
            .await?;

        debug!(count = entries.len(), "Directory search complete");
        Ok(entries.into_iter().map(to_directory_entry).collect())
    }

    #[instrument(skip(self))]
    async fn add_group_member(&self, group: &str, member: &str) -> DirectoryResult<()> {
        let group_dn = self.locate_group(group).await?;
        let member_dn = self.locate_principal(member).await?;

        let rc = self
            .modify_membership(
                &group_dn,
                Mod::Add("member".to_string(), HashSet::from([member_dn.clone()])),
            )
            .await?;

        if rc == RC_ENTRY_ALREADY_EXISTS {
            debug!(member_dn = %member_dn, "Member already present");
        }
        membership_outcome(rc, MemberChange::Add, group, member)
    }

    #[instrument(skip(self))]
    async fn remove_group_member(&self, group: &str, member: &str) -> DirectoryResult<()> {
        let group_dn = self.locate_group(group).await?;
        let member_dn = self.locate_principal(member).await?;

        let rc = self
            .modify_membership(
                &group_dn,
                Mod::Delete("member".to_string(), HashSet::from([member_dn])),
            )
            .await?;

        membership_outcome(rc, MemberChange::Remove, group, member)
    }

    #[instrument(skip(self))]
    async fn group_members(&self, group: &str) -> DirectoryResult<Vec<DirectoryMember>> {
        let group_dn = self.locate_group(group).await?;
        let filter = Filter::eq("memberOf", group_dn.as_str());

        let entries = self
            .search_entries(
                &self.config.base_dn,
                Scope::Subtree,
                &filter.to_ldap(),
                MEMBER_ATTRIBUTES,
            )
            .await?;

        let members: Vec<DirectoryMember> = entries
            .into_iter()
            .map(to_directory_entry)
            .map(|entry| DirectoryMember {
                name: entry
                    .first("name")
                    .or_else(|| entry.first("cn"))
                    .map(str::to_string)
                    .or_else(|| first_rdn_value(&entry.dn))
                    .unwrap_or_default(),
                account_name: entry.first("sAMAccountName").unwrap_or_default().to_string(),
                security_id: entry.first("objectSid").unwrap_or_default().to_string(),
                distinguished_name: entry.dn,
            })
            .collect();

        debug!(count = members.len(), "Read group members");
        Ok(members)
    }

    #[instrument(skip(self))]
    async fn principal_groups(&self, member_dn: &str) -> DirectoryResult<Vec<GroupReference>> {
        let entries = self
            .search_entries(member_dn, Scope::Base, "(objectClass=*)", &["memberOf"])
            .await?;

        let groups: Vec<GroupReference> = entries
            .into_iter()
            .map(to_directory_entry)
            .flat_map(|entry| entry.values("memberOf").to_vec())
            .map(|dn| GroupReference {
                name: first_rdn_value(&dn).unwrap_or_else(|| dn.clone()),
                distinguished_name: dn,
            })
            .collect();

        debug!(count = groups.len(), "Read principal groups");
        Ok(groups)
    }
}

/// Map a bind result code.
fn bind_outcome(rc: u32, text: &str) -> DirectoryResult<()> {
    match rc {
        RC_SUCCESS => Ok(()),
        RC_INVALID_CREDENTIALS => Err(DirectoryError::AuthenticationFailed),
        rc => Err(DirectoryError::connection_failed(format!(
            "LDAP bind failed with code {rc}: {text}"
        ))),
    }
}

/// Map the final result code of a search rooted at `base`.
fn search_outcome(rc: u32, text: &str, base: &str) -> DirectoryResult<()> {
    match rc {
        RC_SUCCESS => Ok(()),
        RC_NO_SUCH_OBJECT => Err(DirectoryError::ObjectNotFound {
            identifier: base.to_string(),
        }),
        rc => Err(DirectoryError::operation_failed(format!(
            "LDAP search failed with code {rc}: {text}"
        ))),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MemberChange {
    Add,
    Remove,
}

/// Map the result code of a `member` modification.
fn membership_outcome(
    rc: u32,
    change: MemberChange,
    group: &str,
    member: &str,
) -> DirectoryResult<()> {
    match (change, rc) {
        (_, RC_SUCCESS) => Ok(()),
        // Value already present.
        (MemberChange::Add, RC_ENTRY_ALREADY_EXISTS) => Ok(()),
        (_, RC_NO_SUCH_OBJECT) => Err(DirectoryError::ObjectNotFound {
            identifier: group.to_string(),
        }),
        (MemberChange::Add, rc) => Err(DirectoryError::operation_failed(format!(
            "adding {member} to {group} failed with code {rc}"
        ))),
        (MemberChange::Remove, rc) => Err(DirectoryError::operation_failed(format!(
            "removing {member} from {group} failed with code {rc}"
        ))),
    }
}

/// Convert an `ldap3` entry, rendering binary `objectSid` values as strings.
fn to_directory_entry(entry: SearchEntry) -> DirectoryEntry {
    let mut result = DirectoryEntry::new(entry.dn);

    for (name, values) in entry.attrs {
        if name.eq_ignore_ascii_case("objectSid") {
            // A SID whose bytes happen to be valid UTF-8 lands in attrs.
            let sids = values
                .iter()
                .filter_map(|v| sid_to_string(v.as_bytes()))
                .collect();
            result.attributes.insert(name, sids);
        } else {
            result.attributes.insert(name, values);
        }
    }

    for (name, values) in entry.bin_attrs {
        if name.eq_ignore_ascii_case("objectSid") {
            let sids = values.iter().filter_map(|v| sid_to_string(v)).collect();
            result.attributes.insert(name, sids);
        } else {
            debug!(attribute = %name, "Skipping binary attribute");
        }
    }

    result
}
