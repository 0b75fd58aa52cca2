use futures::stream::{self, StreamExt};

use crate::app::{AdlogError, AppContext, Result};
use crate::domain::{Listing, ListingPage};

/// Ingest every URL, reporting each outcome. Any failure makes the command
/// fail: a single URL returns its own error, a batch returns `BatchFailed`.
pub async fn ingest(ctx: &AppContext, urls: &[String], workers: usize, json: bool) -> Result<()> {
    if let [url] = urls {
        let listing = ctx.ingestor.ingest(url).await?;
        print_listing(ctx, &listing, json);
        return Ok(());
    }

    let results: Vec<_> = stream::iter(urls)
        .map(|url| async move { (url, ctx.ingestor.ingest(url).await) })
        .buffered(workers.max(1))
        .collect()
        .await;

    let mut errors = 0;
    for (url, result) in results {
        match result {
            Ok(listing) => print_listing(ctx, &listing, json),
            Err(e) => {
                errors += 1;
                eprintln!("  ! {} - {}", url, e);
            }
        }
    }

    println!(
        "Ingest complete: {} ok, {} errors",
        urls.len() - errors,
        errors
    );

    if errors > 0 {
        return Err(AdlogError::BatchFailed {
            failed: errors,
            total: urls.len(),
        });
    }

    Ok(())
}

pub fn view(ctx: &AppContext, id: i64, json: bool) -> Result<()> {
    let listing = ctx.ingestor.view(id)?;
    print_listing(ctx, &listing, json);
    Ok(())
}

pub fn show(ctx: &AppContext, id: i64, json: bool) -> Result<()> {
    let listing = ctx.ingestor.get(id)?;
    print_listing(ctx, &listing, json);
    Ok(())
}

pub fn top(ctx: &AppContext, limit: usize, json: bool) -> Result<()> {
    let page = ctx.ingestor.popular(limit)?;

    if json {
        println!("{}", page_json(ctx, &page));
        return Ok(());
    }

    if page.items.is_empty() {
        println!("No listings");
        return Ok(());
    }

    for listing in &page.items {
        println!("{:>6} views  #{}  {}", listing.view_count, listing.id, listing.title);
    }
    println!("{} of {} listings", page.items.len(), page.total);

    Ok(())
}

fn print_listing(ctx: &AppContext, listing: &Listing, json: bool) {
    if json {
        println!("{}", listing_json(ctx, listing));
        return;
    }

    println!("#{} {}", listing.id, listing.title);
    println!("  {}", listing.url);
    if let Some(image_url) = listing.image_url(ctx.media_url_prefix()) {
        println!("  image: {}", image_url);
    }
    println!(
        "  {} views, added {}",
        listing.view_count,
        listing.created_at.format("%Y-%m-%d %H:%M")
    );
}

fn listing_json(ctx: &AppContext, listing: &Listing) -> serde_json::Value {
    serde_json::json!({
        "id": listing.id,
        "url": listing.url,
        "title": listing.title,
        "image_url": listing.image_url(ctx.media_url_prefix()),
        "view_count": listing.view_count,
        "created_at": listing.created_at,
    })
}

fn page_json(ctx: &AppContext, page: &ListingPage) -> serde_json::Value {
    serde_json::json!({
        "items": page.items.iter().map(|l| listing_json(ctx, l)).collect::<Vec<_>>(),
        "total": page.total,
    })
}
