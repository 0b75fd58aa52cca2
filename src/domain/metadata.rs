/// Title and image candidate recovered from a fetched page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedMetadata {
    pub title: Option<String>,
    pub image_url: Option<String>,
}

/// An image written under the media root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    /// Relative to the media root, e.g. `listings/<random-id>.<ext>`
    pub relative_path: String,
}
