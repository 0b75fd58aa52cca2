pub mod listing;
pub mod metadata;

pub use listing::{media_url, normalize_url, Listing, ListingPage};
pub use metadata::{ParsedMetadata, StoredImage};
