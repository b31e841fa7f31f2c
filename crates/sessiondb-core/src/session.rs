//! Session object model.
//!
//! A [`SessionData`] is what the HTTP session middleware hands to the store:
//! cookie metadata plus arbitrary application fields. The store never looks
//! inside the application fields; it only reads the cookie to decide when the
//! row may be reclaimed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Cookie metadata attached to every session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    /// Absolute expiry instant, if the middleware set one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<DateTime<Utc>>,
    /// Relative lifetime in milliseconds, kept as written. Only numbers count;
    /// see [`Cookie::max_age_ms`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_age: Option<Value>,
    /// Remaining cookie attributes (path, httpOnly, sameSite, ...).
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Cookie {
    /// Cookie with an absolute expiry.
    pub fn expiring_at(expires: DateTime<Utc>) -> Self {
        Self {
            expires: Some(expires),
            ..Default::default()
        }
    }

    /// Cookie with a relative lifetime in milliseconds.
    pub fn with_max_age(max_age_ms: i64) -> Self {
        Self {
            max_age: Some(max_age_ms.into()),
            ..Default::default()
        }
    }

    /// `maxAge` in whole milliseconds, when it is a JSON number.
    ///
    /// Fractions truncate toward zero and out-of-range values saturate.
    /// Anything else (strings, booleans, objects) yields `None`.
    pub fn max_age_ms(&self) -> Option<i64> {
        match self.max_age.as_ref()? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|ms| ms as i64)),
            _ => None,
        }
    }
}

/// A caller's session object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    /// Cookie metadata.
    #[serde(default)]
    pub cookie: Cookie,
    /// Application fields, stored verbatim.
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl SessionData {
    pub fn new(cookie: Cookie) -> Self {
        Self {
            cookie,
            data: Map::new(),
        }
    }

    /// Builder-style field insertion.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }
}

/// A raw row of the session table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    /// Encoded session, opaque to the store.
    pub payload: String,
    /// Epoch milliseconds; `None` never expires.
    pub expires_at: Option<i64>,
}

impl SessionRecord {
    /// Whether reclamation would remove this row at `now_ms`.
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        matches!(self.expires_at, Some(at) if at < now_ms)
    }

    /// Expiry as a UTC timestamp, when it is representable.
    pub fn expires_at_utc(&self) -> Option<DateTime<Utc>> {
        self.expires_at.and_then(DateTime::from_timestamp_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parses_middleware_json() {
        let raw = json!({
            "cookie": {
                "originalMaxAge": 1000,
                "expires": "2099-01-01T00:00:00.000Z",
                "httpOnly": true,
                "path": "/"
            },
            "userId": 42,
            "flash": ["saved"]
        });

        let session: SessionData = serde_json::from_value(raw).unwrap();
        assert_eq!(
            session.cookie.expires,
            Some("2099-01-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap())
        );
        assert_eq!(session.cookie.max_age, None);
        assert_eq!(session.cookie.attributes.get("httpOnly"), Some(&json!(true)));
        assert_eq!(session.get("userId"), Some(&json!(42)));
    }

    #[test]
    fn test_missing_cookie_defaults() {
        let session: SessionData = serde_json::from_value(json!({"cart": []})).unwrap();
        assert_eq!(session.cookie, Cookie::default());
        assert_eq!(session.get("cart"), Some(&json!([])));
    }

    #[test]
    fn test_max_age_uses_camel_case() {
        let session = SessionData::new(Cookie::with_max_age(1000)).with("user", "ada");
        let value = serde_json::to_value(&session).unwrap();
        assert_eq!(value["cookie"]["maxAge"], json!(1000));
        assert!(value["cookie"].get("expires").is_none());
        assert_eq!(value["user"], json!("ada"));
    }

    #[test]
    fn test_fractional_max_age_truncates() {
        let raw = r#"{"cookie":{"maxAge":1500.5},"user":"ada"}"#;
        let session: SessionData = serde_json::from_str(raw).unwrap();
        assert_eq!(session.cookie.max_age_ms(), Some(1500));
        assert_eq!(session.get("user"), Some(&json!("ada")));

        let negative: SessionData = serde_json::from_value(json!({"cookie": {"maxAge": -0.9}})).unwrap();
        assert_eq!(negative.cookie.max_age_ms(), Some(0));
    }

    #[test]
    fn test_non_numeric_max_age_is_ignored_but_kept() {
        let raw = json!({"cookie": {"maxAge": "soon", "path": "/"}});
        let session: SessionData = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(session.cookie.max_age_ms(), None);
        assert_eq!(serde_json::to_value(&session).unwrap(), raw);
    }

    #[test]
    fn test_huge_max_age_saturates() {
        let session: SessionData = serde_json::from_value(json!({"cookie": {"maxAge": 1e300}})).unwrap();
        assert_eq!(session.cookie.max_age_ms(), Some(i64::MAX));

        let unsigned: SessionData = serde_json::from_value(json!({"cookie": {"maxAge": u64::MAX}})).unwrap();
        assert_eq!(unsigned.cookie.max_age_ms(), Some(i64::MAX));
    }

    #[test]
    fn test_record_expiry() {
        let record = SessionRecord {
            id: "abc".to_string(),
            payload: "{}".to_string(),
            expires_at: Some(1_000),
        };
        assert!(record.is_expired_at(1_001));
        assert!(!record.is_expired_at(1_000));

        let forever = SessionRecord {
            expires_at: None,
            ..record
        };
        assert!(!forever.is_expired_at(i64::MAX));
        assert!(forever.expires_at_utc().is_none());
    }
}
