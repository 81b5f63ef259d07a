//! Random identifiers and the names derived from them.
//!
//! Everything here draws from the operating system's CSPRNG. An unavailable entropy source
//! surfaces as [`crate::Error::EntropyUnavailable`] rather than a panic.

pub const EXTERNAL_ID_PREFIX: &str = "ext-";
pub const ROLE_NAME_PREFIX: &str = "CrossAccountAccessRole-";
pub const SESSION_NAME_PREFIX: &str = "session-";
pub const DEFAULT_USER_NAME_PREFIX: &str = "Zop-Admin-";
pub const DEFAULT_GROUP_NAME_PREFIX: &str = "ZopAdminGroup-";

/// Number of hex characters appended to generated user/group names.
pub const DEFAULT_NAME_SUFFIX_LEN: usize = 6;

fn fill_random(buf: &mut [u8]) -> crate::Result<()> {
    fill_random_with(&mut rand::rngs::OsRng, buf)
}

fn fill_random_with<R: rand::TryRngCore>(rng: &mut R, buf: &mut [u8]) -> crate::Result<()> {
    rng.try_fill_bytes(buf).map_err(|e| {
        tracing::error!(err = %e, "random source is unavailable");
        crate::Error::EntropyUnavailable(e.to_string())
    })
}

/// Generates a random (v4) UUID in hyphenated lowercase form.
pub fn new_id() -> crate::Result<String> {
    let mut buf = zeroize::Zeroizing::new([0u8; 16]);
    fill_random(&mut buf[..])?;
    let id = uuid::Builder::from_random_bytes(*buf).into_uuid();
    Ok(id.hyphenated().to_string())
}

/// Generates `n` lowercase hex characters.
pub fn random_suffix(n: usize) -> crate::Result<String> {
    let mut buf = zeroize::Zeroizing::new(vec![0u8; n.div_ceil(2)]);
    fill_random(&mut buf[..])?;
    let mut s = String::with_capacity(buf.len() * 2);
    for b in buf.iter() {
        s.push_str(&format!("{b:02x}"));
    }
    s.truncate(n);
    Ok(s)
}

pub fn external_id_for(integration_id: &str) -> String {
    format!("{EXTERNAL_ID_PREFIX}{integration_id}")
}

pub fn role_name_for(integration_id: &str) -> String {
    format!("{ROLE_NAME_PREFIX}{integration_id}")
}

/// Session name appears in the customer's CloudTrail logs.
pub fn session_name_for(integration_id: &str) -> String {
    format!("{SESSION_NAME_PREFIX}{integration_id}")
}

pub fn stack_name_for(prefix: &str, integration_id: &str) -> String {
    format!("{prefix}-{integration_id}")
}

pub fn default_user_name() -> crate::Result<String> {
    Ok(format!(
        "{DEFAULT_USER_NAME_PREFIX}{}",
        random_suffix(DEFAULT_NAME_SUFFIX_LEN)?
    ))
}

pub fn default_group_name() -> crate::Result<String> {
    Ok(format!(
        "{DEFAULT_GROUP_NAME_PREFIX}{}",
        random_suffix(DEFAULT_NAME_SUFFIX_LEN)?
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_id() {
        let id = new_id().unwrap();
        let parsed = uuid::Uuid::parse_str(&id).unwrap();
        assert_eq!(parsed.get_version(), Some(uuid::Version::Random));
        assert_eq!(id, parsed.hyphenated().to_string());
    }

    #[test]
    fn new_id_has_no_collisions() {
        let mut seen = std::collections::HashSet::new();
        for _ in 0..10_000 {
            assert!(seen.insert(new_id().unwrap()));
        }
    }

    struct BrokenRng;

    impl rand::TryRngCore for BrokenRng {
        type Error = std::io::Error;

        fn try_next_u32(&mut self) -> Result<u32, Self::Error> {
            Err(std::io::Error::other("getrandom failed"))
        }

        fn try_next_u64(&mut self) -> Result<u64, Self::Error> {
            Err(std::io::Error::other("getrandom failed"))
        }

        fn try_fill_bytes(&mut self, _dst: &mut [u8]) -> Result<(), Self::Error> {
            Err(std::io::Error::other("getrandom failed"))
        }
    }

    #[test]
    fn entropy_failure_is_an_error() {
        let mut buf = [0u8; 16];
        assert!(matches!(
            fill_random_with(&mut BrokenRng, &mut buf),
            Err(crate::Error::EntropyUnavailable(m)) if m == "getrandom failed"
        ));
    }

    #[test]
    fn fill_random_fills() {
        let mut buf = [0u8; 32];
        fill_random(&mut buf).unwrap();
        assert!(buf.iter().any(|b| *b != 0));
    }

    mod random_suffix {
        use super::*;

        #[test]
        fn even() {
            let s = random_suffix(6).unwrap();
            assert_eq!(s.len(), 6);
            assert!(s.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        }

        #[test]
        fn odd() {
            assert_eq!(random_suffix(5).unwrap().len(), 5);
        }

        #[test]
        fn zero() {
            assert_eq!(random_suffix(0).unwrap(), "");
        }
    }

    #[test]
    fn derivations() {
        assert_eq!(external_id_for("abc123"), "ext-abc123");
        assert_eq!(role_name_for("abc123"), "CrossAccountAccessRole-abc123");
        assert_eq!(session_name_for("abc123"), "session-abc123");
        assert_eq!(stack_name_for("zop-integration", "abc123"), "zop-integration-abc123");
    }

    #[test]
    fn default_names() {
        let user = default_user_name().unwrap();
        let (prefix, suffix) = user.split_at(DEFAULT_USER_NAME_PREFIX.len());
        assert_eq!(prefix, "Zop-Admin-");
        assert_eq!(suffix.len(), 6);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));

        let group = default_group_name().unwrap();
        assert!(group.starts_with("ZopAdminGroup-"));
        assert_eq!(group.len(), "ZopAdminGroup-".len() + 6);
    }
}
