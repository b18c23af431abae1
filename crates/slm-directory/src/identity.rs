//! Directory identities.
//!
//! Raw caller input arrives in one of several identifier schemes. It is
//! classified into an [`IdentityInput`] before any lookup so every scheme maps
//! to exactly one search filter.

use serde::{Deserialize, Serialize};

use crate::error::DirectoryError;
use crate::filter::Filter;

/// Account-name suffix marker carried by computer accounts.
pub const COMPUTER_ACCOUNT_SUFFIX: char = '$';

/// The class of principal an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdentityKind {
    User,
    Computer,
    Group,
}

impl IdentityKind {
    /// Object filter restricting a search to this kind.
    pub fn object_filter(self) -> Filter {
        match self {
            IdentityKind::User => {
                Filter::Raw("(&(objectCategory=person)(objectClass=user))".to_string())
            }
            IdentityKind::Computer => Filter::Raw("(objectClass=computer)".to_string()),
            IdentityKind::Group => Filter::Raw("(objectClass=group)".to_string()),
        }
    }
}

impl std::fmt::Display for IdentityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdentityKind::User => write!(f, "user"),
            IdentityKind::Computer => write!(f, "computer"),
            IdentityKind::Group => write!(f, "group"),
        }
    }
}

impl std::str::FromStr for IdentityKind {
    type Err = DirectoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(IdentityKind::User),
            "computer" => Ok(IdentityKind::Computer),
            "group" | "container" => Ok(IdentityKind::Group),
            other => Err(DirectoryError::validation(format!(
                "unknown identity kind '{other}', expected User, Computer or Group"
            ))),
        }
    }
}

/// A raw identifier classified by scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityInput {
    /// `jdoe`, `PC01$`
    SamAccountName(String),
    /// `jdoe@corp.example.com`
    UserPrincipalName(String),
    /// `CN=John Doe,OU=Users,DC=corp,DC=example,DC=com`
    DistinguishedName(String),
    /// `John Doe`
    CommonName(String),
    /// `CORP\jdoe`
    DownLevelLogonName { domain: String, account: String },
}

impl IdentityInput {
    /// Classify raw input. Returns `None` for blank input.
    ///
    /// Order matters: a DN may contain escaped commas (`\,`) and spaces, so it
    /// is tested before the down-level and common-name forms.
    pub fn classify(raw: &str) -> Option<Self> {
        let value = raw.trim();
        if value.is_empty() {
            return None;
        }

        if looks_like_dn(value) {
            return Some(IdentityInput::DistinguishedName(value.to_string()));
        }

        if let Some((domain, account)) = value.split_once('\\') {
            if !domain.is_empty() && !account.is_empty() {
                return Some(IdentityInput::DownLevelLogonName {
                    domain: domain.to_string(),
                    account: account.to_string(),
                });
            }
        }

        if value.contains('@') {
            return Some(IdentityInput::UserPrincipalName(value.to_string()));
        }

        if value.chars().any(char::is_whitespace) {
            return Some(IdentityInput::CommonName(value.to_string()));
        }

        Some(IdentityInput::SamAccountName(value.to_string()))
    }

    /// Search filter matching this identifier, independent of object kind.
    ///
    /// A bare account name also matches on common name, so group names such
    /// as `App-Office-Install` resolve whether they are stored as
    /// sAMAccountName or only as cn.
    pub fn filter(&self) -> Filter {
        match self {
            IdentityInput::SamAccountName(name) => Filter::or(vec![
                Filter::eq("sAMAccountName", name.as_str()),
                Filter::eq("cn", name.as_str()),
            ]),
            IdentityInput::UserPrincipalName(upn) => Filter::eq("userPrincipalName", upn.as_str()),
            IdentityInput::DistinguishedName(dn) => Filter::eq("distinguishedName", dn.as_str()),
            IdentityInput::CommonName(cn) => Filter::eq("cn", cn.as_str()),
            IdentityInput::DownLevelLogonName { account, .. } => {
                Filter::eq("sAMAccountName", account.as_str())
            }
        }
    }

    /// Short scheme label for logging.
    pub fn scheme(&self) -> &'static str {
        match self {
            IdentityInput::SamAccountName(_) => "sam_account_name",
            IdentityInput::UserPrincipalName(_) => "user_principal_name",
            IdentityInput::DistinguishedName(_) => "distinguished_name",
            IdentityInput::CommonName(_) => "common_name",
            IdentityInput::DownLevelLogonName { .. } => "down_level_logon_name",
        }
    }
}

fn looks_like_dn(value: &str) -> bool {
    match value.split_once('=') {
        Some((attr, rest)) => {
            !attr.is_empty()
                && attr.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
                && !rest.is_empty()
        }
        None => false,
    }
}

/// Append the computer account-name suffix marker.
///
/// Directory removal of a computer from a group addresses the computer
/// account (`PC01$`), not the host name. The suffix is appended
/// unconditionally; callers pass host names.
pub fn computer_account_name(name: &str) -> String {
    format!("{name}{COMPUTER_ACCOUNT_SUFFIX}")
}

/// A directory principal resolved to a single object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedIdentity {
    /// Kind the object was resolved as.
    pub kind: IdentityKind,
    /// Canonical distinguished name.
    pub distinguished_name: String,
    /// sAMAccountName, when the directory carries one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_name: Option<String>,
    /// Relative name (cn).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_sam_account_name() {
        assert_eq!(
            IdentityInput::classify("jdoe"),
            Some(IdentityInput::SamAccountName("jdoe".to_string()))
        );
        assert_eq!(
            IdentityInput::classify("PC01$"),
            Some(IdentityInput::SamAccountName("PC01$".to_string()))
        );
    }

    #[test]
    fn test_classify_upn() {
        assert_eq!(
            IdentityInput::classify("jdoe@corp.example.com"),
            Some(IdentityInput::UserPrincipalName(
                "jdoe@corp.example.com".to_string()
            ))
        );
    }

    #[test]
    fn test_classify_dn() {
        let dn = "CN=John Doe,OU=Users,DC=corp,DC=example,DC=com";
        assert_eq!(
            IdentityInput::classify(dn),
            Some(IdentityInput::DistinguishedName(dn.to_string()))
        );
    }

    #[test]
    fn test_classify_dn_with_escaped_comma() {
        let dn = "CN=Doe\\, John,OU=Users,DC=corp,DC=com";
        assert_eq!(
            IdentityInput::classify(dn),
            Some(IdentityInput::DistinguishedName(dn.to_string()))
        );
    }

    #[test]
    fn test_classify_common_name() {
        assert_eq!(
            IdentityInput::classify("John Doe"),
            Some(IdentityInput::CommonName("John Doe".to_string()))
        );
    }

    #[test]
    fn test_classify_down_level() {
        assert_eq!(
            IdentityInput::classify("CORP\\jdoe"),
            Some(IdentityInput::DownLevelLogonName {
                domain: "CORP".to_string(),
                account: "jdoe".to_string(),
            })
        );
    }

    #[test]
    fn test_classify_trims_and_rejects_blank() {
        assert_eq!(IdentityInput::classify("   "), None);
        assert_eq!(IdentityInput::classify(""), None);
        assert_eq!(
            IdentityInput::classify("  jdoe "),
            Some(IdentityInput::SamAccountName("jdoe".to_string()))
        );
    }

    #[test]
    fn test_sam_filter_falls_back_to_cn() {
        let input = IdentityInput::classify("App-Visio").unwrap();
        assert_eq!(
            input.filter().to_ldap(),
            "(|(sAMAccountName=App-Visio)(cn=App-Visio))"
        );
    }

    #[test]
    fn test_down_level_filter_uses_account() {
        let input = IdentityInput::classify("CORP\\jdoe").unwrap();
        assert_eq!(input.filter().to_ldap(), "(sAMAccountName=jdoe)");
    }

    #[test]
    fn test_computer_account_name() {
        assert_eq!(computer_account_name("PC01"), "PC01$");
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!("user".parse::<IdentityKind>().unwrap(), IdentityKind::User);
        assert_eq!(
            "Computer".parse::<IdentityKind>().unwrap(),
            IdentityKind::Computer
        );
        assert_eq!("GROUP".parse::<IdentityKind>().unwrap(), IdentityKind::Group);
        assert!("printer".parse::<IdentityKind>().is_err());
    }

    #[test]
    fn test_kind_serialization() {
        assert_eq!(
            serde_json::to_string(&IdentityKind::Computer).unwrap(),
            "\"Computer\""
        );
        assert_eq!(IdentityKind::User.to_string(), "user");
    }
}
