//! Re-request offers that arrived with no sailings.
//!
//! The list endpoint sometimes returns an offer shell without its sailings.
//! Fetching the offer by code usually fills it in. Each empty offer is
//! fetched on its own scoped thread; results are merged only after every
//! worker has finished, so the output order does not depend on timing.

use super::prune::{find_empty_offers, merge_sailings};
use crate::error::ErrorCode;
use crate::model::{Brand, Offer};
use std::collections::HashMap;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Why a single offer could not be refetched.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("{}: offer {code} returned HTTP {status}", ErrorCode::UpstreamRejected.code())]
    Status { code: String, status: u16 },
    #[error("{}: offer {code} request failed: {message}", ErrorCode::UpstreamUnavailable.code())]
    Transport { code: String, message: String },
    #[error("{}: offer {code} response was not an offer: {message}", ErrorCode::UpstreamRejected.code())]
    Decode { code: String, message: String },
}

impl FetchError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Status { .. } | Self::Decode { .. } => ErrorCode::UpstreamRejected,
            Self::Transport { .. } => ErrorCode::UpstreamUnavailable,
        }
    }
}

/// Source of single offers by offer code.
pub trait OfferFetcher: Sync {
    /// `Ok(None)` means the upstream had nothing for this code.
    fn fetch_offer(&self, offer_code: &str) -> Result<Option<Offer>, FetchError>;
}

/// Session credentials for the casino offer API.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub token: String,
    pub account_id: String,
}

/// Blocking HTTP fetcher against the brand's casino offer API.
#[derive(Debug, Clone)]
pub struct HttpOfferFetcher {
    agent: ureq::Agent,
    base_url: String,
    credentials: Credentials,
}

impl HttpOfferFetcher {
    #[must_use]
    pub fn new(brand: Brand, credentials: Credentials, timeout: Duration) -> Self {
        Self::with_base_url(brand.base_url(), credentials, timeout)
    }

    /// Point the fetcher at a different host (staging, local mock).
    #[must_use]
    pub fn with_base_url(base_url: &str, credentials: Credentials, timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        }
    }

    #[must_use]
    pub fn offer_url(&self, offer_code: &str) -> String {
        format!("{}/api/casino/casino-offers/v1/offer/{offer_code}", self.base_url)
    }
}

impl OfferFetcher for HttpOfferFetcher {
    fn fetch_offer(&self, offer_code: &str) -> Result<Option<Offer>, FetchError> {
        let url = self.offer_url(offer_code);
        debug!(offer_code, %url, "fetching offer by code");

        let response = self
            .agent
            .get(&url)
            .set("Content-Type", "application/json")
            .set("Authorization", &format!("Bearer {}", self.credentials.token))
            .set("account-id", &self.credentials.account_id)
            .call()
            .map_err(|err| match err {
                ureq::Error::Status(status, _) => FetchError::Status {
                    code: offer_code.to_string(),
                    status,
                },
                ureq::Error::Transport(transport) => FetchError::Transport {
                    code: offer_code.to_string(),
                    message: transport.to_string(),
                },
            })?;

        let body: serde_json::Value = response.into_json().map_err(|err| FetchError::Decode {
            code: offer_code.to_string(),
            message: err.to_string(),
        })?;
        if body.is_null() {
            return Ok(None);
        }
        serde_json::from_value(body)
            .map(Some)
            .map_err(|err| FetchError::Decode {
                code: offer_code.to_string(),
                message: err.to_string(),
            })
    }
}

/// Refetch every empty offer and merge the returned sailings in.
///
/// Offers are keyed by offer code: a repeated code keeps its first position
/// and its last value. A refetched offer is merged into the offer with the
/// same code via [`merge_sailings`], existing sailings first. Failures are
/// logged and leave that offer empty; they never affect other codes.
///
/// A panicking fetcher is treated as a failure only where panics unwind.
/// The workspace `release` profile sets `panic = "abort"`, so there a
/// fetcher panic ends the process.
#[must_use]
pub fn refetch_empty_offers(offers: &[Offer], fetcher: &dyn OfferFetcher) -> Vec<Offer> {
    let empty_codes: Vec<&str> = find_empty_offers(offers)
        .into_iter()
        .map(|offer| offer.offer_code.as_str())
        .collect();

    if empty_codes.is_empty() {
        debug!("no empty offers to refetch");
        return offers.to_vec();
    }
    info!(count = empty_codes.len(), "refetching empty offers");

    let refetched: Vec<Offer> = thread::scope(|scope| {
        let handles: Vec<_> = empty_codes
            .iter()
            .map(|code| (*code, scope.spawn(move || fetcher.fetch_offer(code))))
            .collect();

        handles
            .into_iter()
            .filter_map(|(code, handle)| match handle.join() {
                Ok(Ok(Some(offer))) => {
                    debug!(offer_code = code, sailings = offer.sailings.len(), "offer refetched");
                    Some(offer)
                }
                Ok(Ok(None)) => {
                    debug!(offer_code = code, "offer refetch returned nothing");
                    None
                }
                Ok(Err(err)) => {
                    warn!(offer_code = code, error = %err, "offer refetch failed");
                    None
                }
                // unreachable under panic = "abort"
                Err(_) => {
                    warn!(offer_code = code, "offer refetch worker panicked");
                    None
                }
            })
            .collect()
    });

    let mut order: Vec<String> = Vec::with_capacity(offers.len());
    let mut by_code: HashMap<String, Offer> = HashMap::with_capacity(offers.len());
    for offer in offers {
        if by_code.insert(offer.offer_code.clone(), offer.clone()).is_none() {
            order.push(offer.offer_code.clone());
        }
    }

    for fresh in refetched {
        if let Some(existing) = by_code.get_mut(&fresh.offer_code) {
            existing.sailings = merge_sailings(&existing.sailings, &fresh.sailings);
        }
    }

    let merged: Vec<Offer> = order
        .iter()
        .filter_map(|code| by_code.remove(code))
        .collect();
    info!(offers = merged.len(), "refetch merge complete");
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Sailing;
    use std::sync::Mutex;

    struct StubFetcher {
        calls: Mutex<Vec<String>>,
    }

    impl StubFetcher {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl OfferFetcher for StubFetcher {
        fn fetch_offer(&self, offer_code: &str) -> Result<Option<Offer>, FetchError> {
            self.calls.lock().expect("calls").push(offer_code.to_string());
            match offer_code {
                "FULL" => Ok(Some(offer("FULL", &[("WN", "2025-03-09")]))),
                "DOWN" => Err(FetchError::Transport {
                    code: offer_code.into(),
                    message: "timed out".into(),
                }),
                "BOOM" => panic!("worker exploded"),
                _ => Ok(None),
            }
        }
    }

    fn offer(code: &str, sailings: &[(&str, &str)]) -> Offer {
        Offer {
            offer_code: code.into(),
            sailings: sailings
                .iter()
                .map(|(ship, date)| Sailing {
                    ship_code: (*ship).into(),
                    sail_date: (*date).into(),
                    ..Sailing::default()
                })
                .collect(),
            ..Offer::default()
        }
    }

    #[test]
    fn nothing_to_refetch_returns_input() {
        let fetcher = StubFetcher::new();
        let offers = vec![offer("A", &[("WN", "2025-03-09")])];
        assert_eq!(refetch_empty_offers(&offers, &fetcher), offers);
        assert!(fetcher.calls.lock().expect("calls").is_empty());
    }

    #[test]
    fn only_empty_offers_are_fetched() {
        let fetcher = StubFetcher::new();
        let offers = vec![offer("A", &[("IC", "2025-04-01")]), offer("FULL", &[])];
        let merged = refetch_empty_offers(&offers, &fetcher);
        assert_eq!(fetcher.calls.lock().expect("calls").as_slice(), ["FULL"]);
        assert_eq!(merged[1].sailings.len(), 1);
        assert_eq!(merged[1].sailings[0].ship_code, "WN");
    }

    #[test]
    fn failures_are_isolated_per_code() {
        let fetcher = StubFetcher::new();
        let offers = vec![offer("DOWN", &[]), offer("FULL", &[]), offer("BOOM", &[]), offer("NONE", &[])];
        let merged = refetch_empty_offers(&offers, &fetcher);
        let codes: Vec<_> = merged.iter().map(|o| o.offer_code.as_str()).collect();
        assert_eq!(codes, ["DOWN", "FULL", "BOOM", "NONE"]);
        assert!(merged[0].sailings.is_empty());
        assert_eq!(merged[1].sailings.len(), 1);
        assert!(merged[2].sailings.is_empty());
        assert!(merged[3].sailings.is_empty());
    }

    #[test]
    fn duplicate_codes_collapse_to_first_position() {
        let fetcher = StubFetcher::new();
        let offers = vec![offer("FULL", &[]), offer("A", &[("IC", "2025-04-01")]), offer("FULL", &[])];
        let merged = refetch_empty_offers(&offers, &fetcher);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].offer_code, "FULL");
        assert_eq!(merged[0].sailings.len(), 1);
    }

    #[test]
    fn offer_url_uses_brand_host() {
        let fetcher = HttpOfferFetcher::new(
            Brand::Celebrity,
            Credentials {
                token: "t".into(),
                account_id: "a".into(),
            },
            Duration::from_secs(1),
        );
        assert_eq!(
            fetcher.offer_url("25WAV103"),
            "https://www.celebritycruises.com/api/casino/casino-offers/v1/offer/25WAV103"
        );
    }

    #[test]
    fn fetch_error_codes() {
        let status = FetchError::Status {
            code: "X".into(),
            status: 401,
        };
        assert_eq!(status.code(), ErrorCode::UpstreamRejected);
        assert!(status.to_string().contains("HTTP 401"));
    }
}
