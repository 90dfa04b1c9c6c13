//! Owned value types for offers, sailings, and stored profile blobs.

mod blob;
pub mod lenient;
mod offer;

pub use blob::{ProfileBlob, ProfileData};
pub use offer::{Brand, ExcludedSailing, FavoriteMeta, Offer, Sailing, ShipDate};
