use super::{Offer, lenient};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Payload section of a stored profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileData {
    #[serde(default, deserialize_with = "lenient::seq")]
    pub offers: Vec<Offer>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ProfileData {
    /// Account email captured with the profile, when the scraper stored one.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.extra
            .get("email")
            .and_then(Value::as_str)
            .filter(|email| !email.is_empty())
    }
}

/// The whole-blob storage contract for one profile key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileBlob {
    #[serde(default)]
    pub data: ProfileData,
    /// Epoch milliseconds of the last write.
    #[serde(default)]
    pub saved_at: i64,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub merged: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub merged_from: Vec<String>,
}

impl ProfileBlob {
    /// Fresh blob holding `offers`, stamped with the current time.
    #[must_use]
    pub fn new(offers: Vec<Offer>) -> Self {
        Self {
            data: ProfileData {
                offers,
                extra: BTreeMap::new(),
            },
            saved_at: now_millis(),
            merged: false,
            merged_from: Vec::new(),
        }
    }

    /// Re-stamp `saved_at` before a write.
    pub fn touch(&mut self) {
        self.saved_at = now_millis();
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
