pub mod sqlite;

use crate::app::Result;
use crate::domain::Listing;

pub use sqlite::SqliteStore;

/// Persistence boundary for listings.
///
/// URLs passed in must already be normalized (see
/// [`normalize_url`](crate::domain::normalize_url)).
pub trait ListingStore {
    fn find_by_url(&self, url: &str) -> Result<Option<Listing>>;
    fn get(&self, id: i64) -> Result<Option<Listing>>;

    /// Insert a listing, or return the one already stored for `url`.
    ///
    /// Never reports a uniqueness violation; concurrent callers for the same
    /// URL all receive the same row.
    fn create_or_get_existing(
        &self,
        url: &str,
        title: &str,
        image_path: Option<&str>,
    ) -> Result<Listing>;

    /// Atomically add one view and return the updated listing.
    fn increment_view(&self, id: i64) -> Result<Listing>;

    fn top_by_views(&self, limit: usize) -> Result<Vec<Listing>>;
    fn count(&self) -> Result<u64>;
}
