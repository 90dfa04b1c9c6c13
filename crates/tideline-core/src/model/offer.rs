use super::lenient;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Cruise line whose casino program issued the offer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Brand {
    #[default]
    Royal,
    Celebrity,
}

impl Brand {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Royal => "royal",
            Self::Celebrity => "celebrity",
        }
    }

    /// Public site the offer API lives under.
    #[must_use]
    pub const fn base_url(self) -> &'static str {
        match self {
            Self::Royal => "https://www.royalcaribbean.com",
            Self::Celebrity => "https://www.celebritycruises.com",
        }
    }

    /// Stateroom categories from lowest to highest.
    #[must_use]
    pub const fn room_order(self) -> &'static [&'static str] {
        match self {
            Self::Royal => &["Interior", "Ocean View", "Balcony", "Junior Suite"],
            Self::Celebrity => &["Interior", "Ocean View", "Veranda", "Concierge"],
        }
    }
}

impl fmt::Display for Brand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Brand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "royal" | "rcl" | "royal caribbean" => Ok(Self::Royal),
            "celebrity" | "x" => Ok(Self::Celebrity),
            other => Err(format!("unknown brand '{other}', expected royal or celebrity")),
        }
    }
}

/// One dated voyage inside an offer.
///
/// Fields the engine does not interpret (perks, pricing, GTY flags) ride
/// along in `extra` and are written back untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sailing {
    #[serde(default, deserialize_with = "lenient::string")]
    pub ship_code: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub ship_name: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub sail_date: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub itinerary_description: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_string"
    )]
    pub room_category: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_string"
    )]
    pub room_type: Option<String>,
    #[serde(
        rename = "isGOBO",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_bool"
    )]
    pub is_gobo: Option<bool>,
    /// Discriminator frozen onto a favorite at save time.
    #[serde(
        rename = "__profileId",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_string"
    )]
    pub profile_id: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Sailing {
    /// GOBO ("guest one, bring one") only when the flag is literally `true`.
    #[must_use]
    pub fn gobo(&self) -> bool {
        self.is_gobo == Some(true)
    }

    #[must_use]
    pub fn ship_date(&self) -> ShipDate {
        ShipDate::new(&self.ship_code, &self.sail_date)
    }
}

/// Marker carried by offers cloned into the favorites profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteMeta {
    #[serde(default, deserialize_with = "lenient::string")]
    pub profile_id: String,
}

/// A casino offer and its eligible sailings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    #[serde(default, deserialize_with = "lenient::string")]
    pub offer_code: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub offer_name: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_string"
    )]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient::seq")]
    pub sailings: Vec<Sailing>,
    #[serde(
        rename = "__favoriteMeta",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub favorite_meta: Option<FavoriteMeta>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Offer {
    /// Whether the offer belongs to the TIER category (case-insensitive).
    #[must_use]
    pub fn is_tier(&self) -> bool {
        self.category
            .as_deref()
            .is_some_and(|c| c.trim().eq_ignore_ascii_case("tier"))
    }

    /// String field from the preserved upstream payload, if present.
    #[must_use]
    pub fn extra_str(&self, field: &str) -> Option<&str> {
        self.extra.get(field).and_then(Value::as_str)
    }

    /// Best-effort brand detection from the `brand` field or the offer code.
    #[must_use]
    pub fn brand_hint(&self) -> Option<Brand> {
        let mentions_celebrity = self
            .extra_str("brand")
            .is_some_and(|b| b.to_ascii_lowercase().contains("celebrity"))
            || self.offer_code.to_ascii_lowercase().contains("celebrity");
        mentions_celebrity.then_some(Brand::Celebrity)
    }

    /// Copy of the offer with no sailings, for building filtered views.
    #[must_use]
    pub fn without_sailings(&self) -> Self {
        Self {
            sailings: Vec::new(),
            ..self.clone()
        }
    }
}

/// A ship/date pair whose sailings must be removed from every offer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExcludedSailing {
    #[serde(default, deserialize_with = "lenient::string")]
    pub ship_code: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub sail_date: String,
}

impl ExcludedSailing {
    #[must_use]
    pub fn ship_date(&self) -> ShipDate {
        ShipDate::new(&self.ship_code, &self.sail_date)
    }
}

/// `shipCode|sailDate` fragment used by exclusion pruning and sailing merge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShipDate {
    ship_code: String,
    sail_date: String,
}

impl ShipDate {
    #[must_use]
    pub fn new(ship_code: &str, sail_date: &str) -> Self {
        Self {
            ship_code: ship_code.to_string(),
            sail_date: sail_date.to_string(),
        }
    }
}

impl fmt::Display for ShipDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.ship_code, self.sail_date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_fields_survive_a_round_trip() {
        let raw = json!({
            "offerCode": "25WAV103",
            "offerName": "Wave Season",
            "brand": "royal",
            "campaign": {"id": 7},
            "sailings": [{
                "shipCode": "WN",
                "shipName": "Wonder of the Seas",
                "sailDate": "2025-03-09",
                "itineraryDescription": "7 Night Western Caribbean",
                "isFREEPLAY": true,
                "FREEPLAY_AMT": 250
            }]
        });

        let offer: Offer = serde_json::from_value(raw.clone()).expect("offer parses");
        assert_eq!(offer.extra_str("brand"), Some("royal"));
        assert_eq!(offer.sailings[0].extra["FREEPLAY_AMT"], json!(250));

        let back = serde_json::to_value(&offer).expect("offer serializes");
        assert_eq!(back, raw);
    }

    #[test]
    fn internal_markers_use_wire_names() {
        let sailing = Sailing {
            ship_name: "Icon of the Seas".into(),
            is_gobo: Some(true),
            profile_id: Some("3".into()),
            ..Sailing::default()
        };
        let value = serde_json::to_value(&sailing).expect("serializes");
        assert_eq!(value["isGOBO"], json!(true));
        assert_eq!(value["__profileId"], json!("3"));

        let offer = Offer {
            favorite_meta: Some(FavoriteMeta {
                profile_id: "3".into(),
            }),
            ..Offer::default()
        };
        let value = serde_json::to_value(&offer).expect("serializes");
        assert_eq!(value["__favoriteMeta"]["profileId"], json!("3"));
    }

    #[test]
    fn null_sailings_parse_as_empty() {
        let offer: Offer =
            serde_json::from_value(json!({"offerCode": "X", "sailings": null})).expect("parses");
        assert!(offer.sailings.is_empty());
    }

    #[test]
    fn gobo_is_only_true_for_literal_true() {
        let mut sailing = Sailing::default();
        assert!(!sailing.gobo());
        sailing.is_gobo = Some(false);
        assert!(!sailing.gobo());
        sailing.is_gobo = Some(true);
        assert!(sailing.gobo());
    }

    #[test]
    fn tier_category_is_case_insensitive() {
        let mut offer = Offer {
            category: Some("Tier".into()),
            ..Offer::default()
        };
        assert!(offer.is_tier());
        offer.category = Some("Balcony".into());
        assert!(!offer.is_tier());
        offer.category = None;
        assert!(!offer.is_tier());
    }

    #[test]
    fn brand_parses_and_orders_rooms() {
        assert_eq!("Celebrity".parse::<Brand>(), Ok(Brand::Celebrity));
        assert_eq!("royal".parse::<Brand>(), Ok(Brand::Royal));
        assert!("carnival".parse::<Brand>().is_err());
        assert_eq!(Brand::Celebrity.room_order()[2], "Veranda");
        assert_eq!(Brand::Royal.room_order()[3], "Junior Suite");
    }

    #[test]
    fn brand_hint_reads_brand_field_and_code() {
        let mut offer = Offer::default();
        assert_eq!(offer.brand_hint(), None);
        offer
            .extra
            .insert("brand".into(), Value::String("Celebrity Cruises".into()));
        assert_eq!(offer.brand_hint(), Some(Brand::Celebrity));
    }
}
