//! Listing ingestion pipeline.
//!
//! ```text
//! normalize → store lookup → fetch → extract → (image) → create-or-get
//! ```
//!
//! Only invalid input, fetch failures and pages without a title abort an
//! ingestion. Image problems downgrade to a listing without an image.

use std::sync::Arc;

use url::Url;

use crate::app::{AdlogError, Result};
use crate::domain::{normalize_url, Listing, ListingPage, StoredImage};
use crate::extractor::MetadataExtractor;
use crate::fetcher::Fetcher;
use crate::media::ImageAcquirer;
use crate::store::ListingStore;

pub const DEFAULT_POPULAR_LIMIT: usize = 10;
pub const MAX_POPULAR_LIMIT: usize = 100;

pub struct Ingestor {
    store: Arc<dyn ListingStore + Send + Sync>,
    fetcher: Arc<dyn Fetcher + Send + Sync>,
    images: Arc<dyn ImageAcquirer + Send + Sync>,
    extractor: MetadataExtractor,
}

impl Ingestor {
    pub fn new(
        store: Arc<dyn ListingStore + Send + Sync>,
        fetcher: Arc<dyn Fetcher + Send + Sync>,
        images: Arc<dyn ImageAcquirer + Send + Sync>,
    ) -> Self {
        Self {
            store,
            fetcher,
            images,
            extractor: MetadataExtractor::new(),
        }
    }

    /// Turn a page URL into a stored listing, reusing an existing one when
    /// the URL was ingested before.
    pub async fn ingest(&self, url: &str) -> Result<Listing> {
        let url = normalize_url(url)?;

        if let Some(existing) = self.store.find_by_url(&url)? {
            tracing::debug!("Listing {} already exists for {}", existing.id, url);
            return Ok(existing);
        }

        let html = self.fetcher.fetch(&url).await?;
        let meta = self.extractor.extract(&html);

        let title = meta
            .title
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| AdlogError::UnparseableContent(url.clone()))?;

        let image = match meta
            .image_url
            .and_then(|raw| resolve_image_url(&url, &raw))
        {
            Some(image_url) => self.try_acquire(&image_url).await,
            None => None,
        };

        let result = self.store.create_or_get_existing(
            &url,
            &title,
            image.as_ref().map(|i| i.relative_path.as_str()),
        );

        if let Some(image) = &image {
            let kept = matches!(
                &result,
                Ok(listing) if listing.image_path.as_deref() == Some(image.relative_path.as_str())
            );
            if !kept {
                self.discard(image).await;
            }
        }

        result
    }

    /// Record a view and return the updated listing.
    pub fn view(&self, id: i64) -> Result<Listing> {
        self.store.increment_view(id)
    }

    /// Look a listing up without counting a view.
    pub fn get(&self, id: i64) -> Result<Listing> {
        self.store
            .get(id)?
            .ok_or(AdlogError::ListingNotFound(id))
    }

    /// Most viewed listings; `limit` is clamped into `1..=100`.
    pub fn popular(&self, limit: usize) -> Result<ListingPage> {
        let limit = limit.clamp(1, MAX_POPULAR_LIMIT);
        Ok(ListingPage {
            items: self.store.top_by_views(limit)?,
            total: self.store.count()?,
        })
    }

    async fn try_acquire(&self, image_url: &str) -> Option<StoredImage> {
        match self.images.acquire(image_url).await {
            Ok(image) => Some(image),
            Err(e) => {
                tracing::warn!("Image acquisition failed for {}: {}", image_url, e);
                None
            }
        }
    }

    async fn discard(&self, image: &StoredImage) {
        tracing::debug!("Discarding unused image {}", image.relative_path);
        if let Err(e) = self.images.discard(image).await {
            tracing::warn!("Failed to discard {}: {}", image.relative_path, e);
        }
    }
}

/// Resolve an extracted image reference against the page it came from.
/// Anything that does not end up as an http(s) URL is dropped.
pub fn resolve_image_url(page_url: &str, raw: &str) -> Option<String> {
    let base = Url::parse(page_url).ok()?;
    let resolved = base.join(raw.trim()).ok()?;

    matches!(resolved.scheme(), "http" | "https").then(|| resolved.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tokio::sync::Barrier;
    use tokio_test::{assert_err, assert_ok};

    use crate::store::SqliteStore;

    const PAGE_URL: &str = "https://www.avito.ru/moskva/velosipedy/bike_123";

    const BIKE_PAGE: &str = r#"<html><head>
        <meta property="og:title" content="Road bike, 54cm">
        <meta property="og:image" content="/img/bike.jpg">
        </head><body><h1>Bike</h1></body></html>"#;

    #[derive(Default)]
    struct FakeFetcher {
        pages: HashMap<String, String>,
        calls: AtomicUsize,
        barrier: Option<Barrier>,
    }

    impl FakeFetcher {
        fn with_page(url: &str, html: &str) -> Self {
            let mut pages = HashMap::new();
            pages.insert(url.to_string(), html.to_string());
            Self {
                pages,
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl Fetcher for FakeFetcher {
        async fn fetch(&self, url: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(barrier) = &self.barrier {
                barrier.wait().await;
            }
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| AdlogError::HttpStatus {
                    url: url.to_string(),
                    status: 404,
                })
        }
    }

    #[derive(Default)]
    struct FakeImages {
        fail: bool,
        requested: Mutex<Vec<String>>,
        discarded: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ImageAcquirer for FakeImages {
        async fn acquire(&self, image_url: &str) -> Result<StoredImage> {
            let mut requested = self.requested.lock().unwrap();
            requested.push(image_url.to_string());
            if self.fail {
                return Err(AdlogError::NotAnImage(Some("text/html".into())));
            }
            Ok(StoredImage {
                relative_path: format!("listings/{}.jpg", requested.len()),
            })
        }

        async fn discard(&self, image: &StoredImage) -> Result<()> {
            self.discarded
                .lock()
                .unwrap()
                .push(image.relative_path.clone());
            Ok(())
        }
    }

    struct Harness {
        ingestor: Arc<Ingestor>,
        store: Arc<SqliteStore>,
        fetcher: Arc<FakeFetcher>,
        images: Arc<FakeImages>,
    }

    fn harness(fetcher: FakeFetcher, images: FakeImages) -> Harness {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let fetcher = Arc::new(fetcher);
        let images = Arc::new(images);
        let ingestor = Arc::new(Ingestor::new(
            store.clone(),
            fetcher.clone(),
            images.clone(),
        ));
        Harness {
            ingestor,
            store,
            fetcher,
            images,
        }
    }

    #[tokio::test]
    async fn test_ingest_creates_listing() {
        let h = harness(FakeFetcher::with_page(PAGE_URL, BIKE_PAGE), FakeImages::default());

        let listing = h.ingestor.ingest(PAGE_URL).await.unwrap();
        assert_eq!(listing.url, PAGE_URL);
        assert_eq!(listing.title, "Road bike, 54cm");
        assert_eq!(listing.image_path.as_deref(), Some("listings/1.jpg"));
        assert_eq!(listing.view_count, 0);

        // Relative og:image resolved against the page
        assert_eq!(
            *h.images.requested.lock().unwrap(),
            vec!["https://www.avito.ru/img/bike.jpg".to_string()]
        );
    }

    #[tokio::test]
    async fn test_ingest_is_idempotent() {
        let h = harness(FakeFetcher::with_page(PAGE_URL, BIKE_PAGE), FakeImages::default());

        let first = h.ingestor.ingest(PAGE_URL).await.unwrap();
        let second = h.ingestor.ingest(PAGE_URL).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.url, second.url);
        assert_eq!(first.title, second.title);
        assert_eq!(first.image_path, second.image_path);
        assert_eq!(h.fetcher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.images.requested.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_ingest_dedupes_equivalent_urls() {
        let h = harness(FakeFetcher::with_page(PAGE_URL, BIKE_PAGE), FakeImages::default());

        let first = h.ingestor.ingest(PAGE_URL).await.unwrap();
        let second = h
            .ingestor
            .ingest("  HTTPS://WWW.AVITO.RU/moskva/velosipedy/bike_123#gallery ")
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(h.store.count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_invalid_input_rejected_before_fetch() {
        let h = harness(FakeFetcher::default(), FakeImages::default());

        assert!(matches!(
            h.ingestor.ingest("").await,
            Err(AdlogError::InvalidInput(_))
        ));
        assert!(matches!(
            h.ingestor.ingest("definitely not a url").await,
            Err(AdlogError::InvalidUrl(_))
        ));
        assert_eq!(h.fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fetch_error_propagates_without_row() {
        let h = harness(FakeFetcher::default(), FakeImages::default());

        let err = h.ingestor.ingest(PAGE_URL).await.unwrap_err();
        assert!(matches!(err, AdlogError::HttpStatus { status: 404, .. }));
        assert!(err.is_caller_visible_ingest_failure());
        assert_eq!(h.store.count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unparseable_page_leaves_no_row() {
        let page = r#"<html><body><p>Nothing here</p><img src="/a.jpg"></body></html>"#;
        let h = harness(FakeFetcher::with_page(PAGE_URL, page), FakeImages::default());

        let err = h.ingestor.ingest(PAGE_URL).await.unwrap_err();
        assert!(matches!(err, AdlogError::UnparseableContent(_)));
        assert_eq!(h.store.count().unwrap(), 0);
        assert!(h.images.requested.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_page_without_image() {
        let page = "<html><head><title>Armchair</title></head><body></body></html>";
        let h = harness(FakeFetcher::with_page(PAGE_URL, page), FakeImages::default());

        let listing = assert_ok!(h.ingestor.ingest(PAGE_URL).await);
        assert_eq!(listing.title, "Armchair");
        assert_eq!(listing.image_path, None);
        assert!(h.images.requested.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_image_failure_is_not_fatal() {
        let images = FakeImages {
            fail: true,
            ..Default::default()
        };
        let h = harness(FakeFetcher::with_page(PAGE_URL, BIKE_PAGE), images);

        let listing = h.ingestor.ingest(PAGE_URL).await.unwrap();
        assert_eq!(listing.title, "Road bike, 54cm");
        assert_eq!(listing.image_path, None);
        assert_eq!(h.store.count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unusable_image_reference_is_skipped() {
        let page = r#"<head><title>Lamp</title></head>
            <body><img src="data:image/gif;base64,R0lGODlhAQABAAAAACw="></body>"#;
        let h = harness(FakeFetcher::with_page(PAGE_URL, page), FakeImages::default());

        let listing = h.ingestor.ingest(PAGE_URL).await.unwrap();
        assert_eq!(listing.image_path, None);
        assert!(h.images.requested.lock().unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_ingest_converges() {
        const N: usize = 8;
        let fetcher = FakeFetcher {
            barrier: Some(Barrier::new(N)),
            ..FakeFetcher::with_page(PAGE_URL, BIKE_PAGE)
        };
        let h = harness(fetcher, FakeImages::default());

        let tasks: Vec<_> = (0..N)
            .map(|_| {
                let ingestor = h.ingestor.clone();
                tokio::spawn(async move { ingestor.ingest(PAGE_URL).await })
            })
            .collect();

        let listings: Vec<Listing> = futures::future::join_all(tasks)
            .await
            .into_iter()
            .map(|joined| joined.unwrap().unwrap())
            .collect();

        let first = &listings[0];
        assert!(listings.iter().all(|l| l.id == first.id));
        assert!(listings.iter().all(|l| l.image_path == first.image_path));
        assert_eq!(h.store.count().unwrap(), 1);

        // Every fetch got past the lookup, so every task downloaded an
        // image; all but the stored one are cleaned up.
        assert_eq!(h.fetcher.calls.load(Ordering::SeqCst), N);
        let discarded = h.images.discarded.lock().unwrap();
        assert_eq!(discarded.len(), N - 1);
        assert!(!discarded.contains(first.image_path.as_ref().unwrap()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_views_are_all_counted() {
        const N: u64 = 50;
        let h = harness(FakeFetcher::with_page(PAGE_URL, BIKE_PAGE), FakeImages::default());
        let id = h.ingestor.ingest(PAGE_URL).await.unwrap().id;

        let tasks: Vec<_> = (0..N)
            .map(|_| {
                let ingestor = h.ingestor.clone();
                tokio::spawn(async move { ingestor.view(id) })
            })
            .collect();

        for joined in futures::future::join_all(tasks).await {
            joined.unwrap().unwrap();
        }

        assert_eq!(h.ingestor.get(id).unwrap().view_count, N);
    }

    #[test]
    fn test_view_and_get_unknown_listing() {
        let h = harness(FakeFetcher::default(), FakeImages::default());

        let err = assert_err!(h.ingestor.view(99));
        assert!(err.is_not_found());
        let err = assert_err!(h.ingestor.get(99));
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_get_does_not_count_a_view() {
        let h = harness(FakeFetcher::with_page(PAGE_URL, BIKE_PAGE), FakeImages::default());
        let listing = h.ingestor.ingest(PAGE_URL).await.unwrap();

        assert_eq!(h.ingestor.view(listing.id).unwrap().view_count, 1);
        assert_eq!(h.ingestor.get(listing.id).unwrap().view_count, 1);
    }

    #[tokio::test]
    async fn test_popular_orders_and_clamps() {
        let mut fetcher = FakeFetcher::default();
        for i in 0..3 {
            fetcher.pages.insert(
                format!("https://example.com/item/{}", i),
                format!("<h1>Item {}</h1>", i),
            );
        }
        let h = harness(fetcher, FakeImages::default());

        let mut ids = Vec::new();
        for i in 0..3 {
            let listing = h
                .ingestor
                .ingest(&format!("https://example.com/item/{}", i))
                .await
                .unwrap();
            ids.push(listing.id);
        }
        h.ingestor.view(ids[1]).unwrap();

        let page = h.ingestor.popular(DEFAULT_POPULAR_LIMIT).unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.items[0].id, ids[1]);
        assert_eq!(page.items.len(), 3);

        let page = h.ingestor.popular(0).unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.total, 3);
    }

    #[test]
    fn test_resolve_image_url() {
        assert_eq!(
            resolve_image_url(PAGE_URL, "/img/a.jpg").as_deref(),
            Some("https://www.avito.ru/img/a.jpg")
        );
        assert_eq!(
            resolve_image_url(PAGE_URL, "thumb.png").as_deref(),
            Some("https://www.avito.ru/moskva/velosipedy/thumb.png")
        );
        assert_eq!(
            resolve_image_url(PAGE_URL, "https://cdn.example.com/b.webp").as_deref(),
            Some("https://cdn.example.com/b.webp")
        );
        assert_eq!(resolve_image_url(PAGE_URL, "javascript:void(0)"), None);
    }
}
