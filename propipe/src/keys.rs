//! Round-robin API key rotation.
//!
//! A [`KeyRotator`] owns an immutable pool of keys and a cursor. Each call to
//! [`CredentialSource::next_credential`] hands out the key under the cursor and
//! advances it, wrapping at the end of the pool.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::debug;

use crate::error::{ConfigError, Result};

/// Supplies the credential for each outbound request.
///
/// The pipe only ever asks for the next key, so tests and hosts can plug in
/// any deterministic source.
pub trait CredentialSource: Send + Sync + fmt::Debug {
    /// Returns the credential to use for the next request.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when no credential is available.
    fn next_credential(&self) -> Result<String>;
}

/// Shared credential source.
pub type SharedCredentialSource = Arc<dyn CredentialSource>;

/// Splits a comma-separated key list, trimming entries and dropping blanks.
#[must_use]
pub fn parse_key_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

/// Round-robin rotator over a fixed key pool.
///
/// The cursor always lies in `[0, len)` and advances with a single atomic
/// update, so one rotator can serve many conversations at once.
pub struct KeyRotator {
    keys: Arc<[String]>,
    cursor: AtomicUsize,
}

impl KeyRotator {
    /// Creates a rotator over `keys`. An empty pool is allowed; it fails on
    /// first use.
    #[must_use]
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
            cursor: AtomicUsize::new(0),
        }
    }

    /// Creates a rotator from a comma-separated list.
    #[must_use]
    pub fn from_csv(raw: &str) -> Self {
        Self::new(parse_key_list(raw))
    }

    /// Number of keys in the pool.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the pool is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Index of the key the next call will return.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor.load(Ordering::SeqCst)
    }
}

impl CredentialSource for KeyRotator {
    fn next_credential(&self) -> Result<String> {
        let len = self.keys.len();
        if len == 0 {
            return Err(ConfigError::NoApiKeys.into());
        }

        let index = self
            .cursor
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |c| Some((c + 1) % len))
            .unwrap_or_else(|current| current);
        debug!(index, pool = len, "selected api key");

        Ok(self.keys[index].clone())
    }
}

// Keys never reach debug output.
impl fmt::Debug for KeyRotator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyRotator")
            .field("keys", &self.keys.len())
            .field("cursor", &self.cursor())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::error::Error;

    #[test]
    fn cycles_in_order() {
        let rotator = KeyRotator::new(["a", "b", "c"]);
        let seen: Vec<String> = (0..7).map(|_| rotator.next_credential().unwrap()).collect();
        assert_eq!(seen, vec!["a", "b", "c", "a", "b", "c", "a"]);
    }

    #[test]
    fn call_n_plus_one_matches_first_call() {
        for n in 1..=6 {
            let keys: Vec<String> = (0..n).map(|i| format!("sk-{i}")).collect();
            let rotator = KeyRotator::new(keys);
            let first = rotator.next_credential().unwrap();
            for _ in 1..n {
                rotator.next_credential().unwrap();
            }
            assert_eq!(rotator.next_credential().unwrap(), first, "pool size {n}");
        }
    }

    #[test]
    fn cursor_stays_in_range() {
        let rotator = KeyRotator::new(["a", "b"]);
        for _ in 0..5 {
            rotator.next_credential().unwrap();
            assert!(rotator.cursor() < rotator.len());
        }
    }

    #[test]
    fn empty_pool_is_config_error() {
        let rotator = KeyRotator::from_csv(" , ,");
        assert!(rotator.is_empty());
        for _ in 0..3 {
            let err = rotator.next_credential().unwrap_err();
            assert!(matches!(err, Error::Config(ConfigError::NoApiKeys)));
        }
        assert_eq!(rotator.cursor(), 0);
    }

    #[test]
    fn parse_key_list_trims() {
        assert_eq!(parse_key_list(" a ,b,, c "), vec!["a", "b", "c"]);
        assert!(parse_key_list("").is_empty());
    }

    #[test]
    fn debug_hides_keys() {
        let rotator = KeyRotator::new(["sk-secret"]);
        assert!(!format!("{rotator:?}").contains("sk-secret"));
    }

    #[test]
    fn concurrent_callers_share_the_pool_evenly() {
        let rotator = Arc::new(KeyRotator::new(["a", "b", "c", "d"]));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let rotator = Arc::clone(&rotator);
                std::thread::spawn(move || {
                    (0..100)
                        .map(|_| rotator.next_credential().unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut counts = std::collections::HashMap::new();
        for handle in handles {
            for key in handle.join().unwrap() {
                *counts.entry(key).or_insert(0) += 1;
            }
        }
        let keys: HashSet<_> = counts.keys().cloned().collect();
        assert_eq!(keys.len(), 4);
        assert!(counts.values().all(|&c| c == 100));
        assert_eq!(rotator.cursor(), 0);
    }
}
