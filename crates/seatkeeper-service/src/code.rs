//! Opaque code generation for invite sessions and allocation tokens.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use rand::Rng;
use rand::distributions::Alphanumeric;

/// Generates opaque alphanumeric codes of a fixed length.
#[derive(Debug, Clone, Copy)]
pub struct CodeGenerator {
    length: usize,
}

impl CodeGenerator {
    /// Creates a generator producing codes of `length` characters.
    pub fn new(length: usize) -> Self {
        Self {
            length: length.max(1),
        }
    }

    /// Generates a new random code.
    pub fn generate(&self) -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(self.length)
            .map(char::from)
            .collect()
    }
}

/// Wall-clock expiry of a record written `now` with the given TTL.
pub(crate) fn expires_at(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(ttl)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_length_and_alphabet() {
        let code = CodeGenerator::new(20).generate();
        assert_eq!(code.len(), 20);
        assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(code, CodeGenerator::new(20).generate());
    }

    #[test]
    fn test_expires_at() {
        let now = Utc::now();
        assert_eq!(
            expires_at(now, Duration::from_secs(60)),
            now + TimeDelta::seconds(60)
        );
        assert_eq!(
            expires_at(now, Duration::MAX),
            DateTime::<Utc>::MAX_UTC
        );
    }
}
