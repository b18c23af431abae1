//! Security identifier and DN helpers.

/// Render a binary `objectSid` in canonical `S-R-I-S...` form.
///
/// Layout: revision (1 byte), sub-authority count (1 byte), identifier
/// authority (6 bytes, big-endian), then `count` little-endian u32
/// sub-authorities. Returns `None` when the buffer is truncated.
pub fn sid_to_string(bytes: &[u8]) -> Option<String> {
    if bytes.len() < 8 {
        return None;
    }

    let revision = bytes[0];
    let count = bytes[1] as usize;
    if bytes.len() < 8 + count * 4 {
        return None;
    }

    let authority = bytes[2..8]
        .iter()
        .fold(0u64, |acc, b| (acc << 8) | u64::from(*b));

    let mut sid = format!("S-{revision}-{authority}");
    for chunk in bytes[8..8 + count * 4].chunks_exact(4) {
        let sub = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        sid.push('-');
        sid.push_str(&sub.to_string());
    }
    Some(sid)
}

/// Value of the first RDN of a DN, with RFC 4514 backslash escapes removed.
///
/// `CN=Doe\, John,OU=Users,DC=corp` yields `Doe, John`.
pub fn first_rdn_value(dn: &str) -> Option<String> {
    let (_, rest) = dn.split_once('=')?;
    let mut value = String::new();
    let mut chars = rest.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    value.push(escaped);
                }
            }
            ',' | '+' => break,
            _ => value.push(c),
        }
    }
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_user_sid() {
        // S-1-5-21-1004336348-1177238915-682003330-512
        let bytes: Vec<u8> = vec![
            0x01, 0x05, 0x00, 0x00, 0x00, 0x00, 0x00, 0x05, 0x15, 0x00, 0x00, 0x00, 0xdc, 0xf4,
            0xdc, 0x3b, 0x83, 0x3d, 0x2b, 0x46, 0x82, 0x8b, 0xa6, 0x28, 0x00, 0x02, 0x00, 0x00,
        ];
        assert_eq!(
            sid_to_string(&bytes).as_deref(),
            Some("S-1-5-21-1004336348-1177238915-682003330-512")
        );
    }

    #[test]
    fn test_well_known_sid() {
        // S-1-5-32-544 (BUILTIN\Administrators)
        let bytes: Vec<u8> = vec![
            0x01, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x05, 0x20, 0x00, 0x00, 0x00, 0x20, 0x02,
            0x00, 0x00,
        ];
        assert_eq!(sid_to_string(&bytes).as_deref(), Some("S-1-5-32-544"));
    }

    #[test]
    fn test_truncated_sid() {
        assert!(sid_to_string(&[0x01, 0x05, 0x00]).is_none());
        assert!(sid_to_string(&[0x01, 0x02, 0, 0, 0, 0, 0, 5, 0x20, 0, 0, 0]).is_none());
    }

    #[test]
    fn test_first_rdn_value() {
        assert_eq!(
            first_rdn_value("CN=App-Visio,OU=Groups,DC=corp,DC=com").as_deref(),
            Some("App-Visio")
        );
        assert_eq!(
            first_rdn_value("CN=Doe\\, John,OU=Users,DC=corp").as_deref(),
            Some("Doe, John")
        );
        assert!(first_rdn_value("not a dn").is_none());
    }
}
