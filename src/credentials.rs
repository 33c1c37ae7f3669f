//! Credential resolution.
//!
//! Every network call resolves the key right before it is made, so a key
//! swapped in the environment (or by the host application) is picked up on the
//! next request of an in-flight job.

use crate::error::{LuminaError, Result};
use std::env;
use std::fmt;

const PLACEHOLDERS: &[&str] = &["undefined", "null", "your_gemini_api_key_here"];

#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    Absent,
    Present(String),
}

impl Credential {
    /// Classifies a raw value, treating known placeholders as absent.
    pub fn from_raw(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(value) if !value.is_empty() && !PLACEHOLDERS.contains(&value) => {
                Credential::Present(value.to_string())
            }
            _ => Credential::Absent,
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Credential::Present(_))
    }

    pub fn require(self) -> Result<String> {
        match self {
            Credential::Present(key) => Ok(key),
            Credential::Absent => Err(LuminaError::CredentialMissing(
                "no API key has been selected".into(),
            )),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Absent => f.write_str("Credential::Absent"),
            Credential::Present(_) => f.write_str("Credential::Present(***)"),
        }
    }
}

pub trait CredentialResolver: Send + Sync {
    fn resolve(&self) -> Credential;
}

/// Reads the key from an environment variable on each call.
#[derive(Debug, Clone)]
pub struct EnvCredentialResolver {
    var: String,
}

impl EnvCredentialResolver {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvCredentialResolver {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_CREDENTIAL_VAR)
    }
}

impl CredentialResolver for EnvCredentialResolver {
    fn resolve(&self) -> Credential {
        Credential::from_raw(env::var(&self.var).ok().as_deref())
    }
}

#[derive(Debug, Clone)]
pub struct StaticCredentialResolver {
    credential: Credential,
}

impl StaticCredentialResolver {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            credential: Credential::from_raw(Some(&key)),
        }
    }

    pub fn absent() -> Self {
        Self {
            credential: Credential::Absent,
        }
    }
}

impl CredentialResolver for StaticCredentialResolver {
    fn resolve(&self) -> Credential {
        self.credential.clone()
    }
}

/// Adapts a closure, typically one reading the host application's key store.
pub struct FnCredentialResolver<F>(pub F);

impl<F> CredentialResolver for FnCredentialResolver<F>
where
    F: Fn() -> Option<String> + Send + Sync,
{
    fn resolve(&self) -> Credential {
        Credential::from_raw((self.0)().as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_placeholders_are_absent() {
        for raw in ["", "   ", "undefined", "null", "your_gemini_api_key_here"] {
            assert_eq!(Credential::from_raw(Some(raw)), Credential::Absent, "{raw:?}");
        }
        assert_eq!(Credential::from_raw(None), Credential::Absent);
        assert!(Credential::from_raw(Some("AIza-test")).is_present());
    }

    #[test]
    fn test_require_absent_is_credential_missing() {
        let err = Credential::Absent.require().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CredentialMissing);
    }

    #[test]
    fn test_debug_hides_key() {
        let shown = format!("{:?}", Credential::Present("secret".into()));
        assert!(!shown.contains("secret"));
    }

    #[test]
    fn test_fn_resolver_sees_rotation() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let resolver = FnCredentialResolver(move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            Some(format!("key-{}", n))
        });

        assert_eq!(resolver.resolve(), Credential::Present("key-0".into()));
        assert_eq!(resolver.resolve(), Credential::Present("key-1".into()));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
