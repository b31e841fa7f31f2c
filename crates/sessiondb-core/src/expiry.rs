//! Expiry policy applied when a session is written.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::session::SessionData;

/// Lifetime used when the cookie carries neither `expires` nor `maxAge`.
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Which rule produced an expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpirySource {
    /// `cookie.expires`, used verbatim.
    Absolute,
    /// `now + cookie.maxAge`.
    MaxAge,
    /// `now + default_ttl`.
    Default,
}

/// A resolved expiry in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expiry {
    pub at_ms: i64,
    pub source: ExpirySource,
}

/// Decides `expires_at` for a session at write time.
///
/// Precedence is fixed: an absolute `expires` wins over a relative `maxAge`,
/// which wins over the default lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryPolicy {
    default_ttl_ms: i64,
}

impl ExpiryPolicy {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            default_ttl_ms: i64::try_from(default_ttl.as_millis()).unwrap_or(i64::MAX),
        }
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_millis(self.default_ttl_ms.max(0) as u64)
    }

    /// Resolve the expiry of `session` against a single sampled `now`.
    pub fn resolve(&self, session: &SessionData, now: DateTime<Utc>) -> Expiry {
        let now_ms = now.timestamp_millis();
        let cookie = &session.cookie;

        if let Some(expires) = cookie.expires {
            return Expiry {
                at_ms: expires.timestamp_millis(),
                source: ExpirySource::Absolute,
            };
        }

        if let Some(max_age) = cookie.max_age_ms() {
            return Expiry {
                at_ms: now_ms.saturating_add(max_age),
                source: ExpirySource::MaxAge,
            };
        }

        Expiry {
            at_ms: now_ms.saturating_add(self.default_ttl_ms),
            source: ExpirySource::Default,
        }
    }
}

impl Default for ExpiryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Cookie;

    fn at(rfc3339: &str) -> DateTime<Utc> {
        rfc3339.parse().unwrap()
    }

    #[test]
    fn test_absolute_expiry_is_verbatim() {
        let policy = ExpiryPolicy::default();
        let expires = at("2099-01-01T00:00:00Z");
        let mut cookie = Cookie::expiring_at(expires);
        cookie.max_age = Some(serde_json::json!(1000));

        let expiry = policy.resolve(&SessionData::new(cookie), at("2024-06-01T12:00:00Z"));
        assert_eq!(expiry.source, ExpirySource::Absolute);
        assert_eq!(expiry.at_ms, expires.timestamp_millis());
    }

    #[test]
    fn test_max_age_is_relative_to_now() {
        let policy = ExpiryPolicy::default();
        let now = at("2024-06-01T12:00:00Z");

        let expiry = policy.resolve(&SessionData::new(Cookie::with_max_age(1000)), now);
        assert_eq!(expiry.source, ExpirySource::MaxAge);
        assert_eq!(expiry.at_ms, now.timestamp_millis() + 1000);
    }

    #[test]
    fn test_negative_max_age_lands_in_the_past() {
        let now = at("2024-06-01T12:00:00Z");
        let expiry = ExpiryPolicy::default().resolve(&SessionData::new(Cookie::with_max_age(-10)), now);
        assert!(expiry.at_ms < now.timestamp_millis());
    }

    #[test]
    fn test_default_ttl_is_one_day() {
        let now = at("2024-06-01T12:00:00Z");
        let expiry = ExpiryPolicy::default().resolve(&SessionData::default(), now);
        assert_eq!(expiry.source, ExpirySource::Default);
        assert_eq!(expiry.at_ms, now.timestamp_millis() + 86_400_000);
    }

    #[test]
    fn test_custom_default_ttl() {
        let now = at("2024-06-01T12:00:00Z");
        let policy = ExpiryPolicy::new(Duration::from_secs(60));
        assert_eq!(policy.default_ttl(), Duration::from_secs(60));
        assert_eq!(
            policy.resolve(&SessionData::default(), now).at_ms,
            now.timestamp_millis() + 60_000
        );
    }

    #[test]
    fn test_fractional_max_age_counts() {
        let now = at("2024-06-01T12:00:00Z");
        let session: SessionData =
            serde_json::from_value(serde_json::json!({"cookie": {"maxAge": 1500.5}})).unwrap();

        let expiry = ExpiryPolicy::default().resolve(&session, now);
        assert_eq!(expiry.source, ExpirySource::MaxAge);
        assert_eq!(expiry.at_ms, now.timestamp_millis() + 1500);
    }

    #[test]
    fn test_non_numeric_max_age_falls_back_to_default() {
        let now = at("2024-06-01T12:00:00Z");
        let session: SessionData =
            serde_json::from_value(serde_json::json!({"cookie": {"maxAge": "1000"}})).unwrap();

        let expiry = ExpiryPolicy::default().resolve(&session, now);
        assert_eq!(expiry.source, ExpirySource::Default);
        assert_eq!(expiry.at_ms, now.timestamp_millis() + 86_400_000);
    }

    #[test]
    fn test_huge_max_age_saturates() {
        let now = at("2024-06-01T12:00:00Z");
        let expiry = ExpiryPolicy::default().resolve(&SessionData::new(Cookie::with_max_age(i64::MAX)), now);
        assert_eq!(expiry.at_ms, i64::MAX);
    }
}
