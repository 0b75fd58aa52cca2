//! Image acquisition for listings.
//!
//! Images are validated by declared content type before anything touches
//! the disk, then streamed to `<media root>/listings/<random id>.<ext>`.

pub mod acquirer;
pub mod mime;

use async_trait::async_trait;

use crate::app::Result;
use crate::domain::StoredImage;

pub use acquirer::HttpImageAcquirer;

/// Subdirectory of the media root that listing images are written to.
pub const LISTINGS_DIR: &str = "listings";

#[async_trait]
pub trait ImageAcquirer {
    /// Download an image and store it under the media root.
    async fn acquire(&self, image_url: &str) -> Result<StoredImage>;

    /// Remove an image that ended up unused.
    async fn discard(&self, image: &StoredImage) -> Result<()>;
}
