//! Profile bookkeeping: numeric ids, linked accounts, and the combined view.

mod combine;
mod ids;
mod linked;

pub use combine::{combine_profiles, update_combined_offers};
pub use ids::{PROFILE_KEY_PREFIX, ProfileIdManager, ProfileIdState};
pub use linked::{LINKED_ACCOUNTS_KEY, LinkedAccount, load_linked_accounts, save_linked_accounts};
