use anyhow::Context;
use scraper::Html;
use tracing::{debug, info, warn};

use crate::crawler::fetcher::Session;
use crate::crawler::models::{
    ListingVariant, MovieDetails, MovieRecord, Pairing, RatedEntry,
};
use crate::storage::RecordSink;

pub mod fetcher;
pub mod models;
pub mod parser;
pub mod service;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlOptions {
    pub variant: ListingVariant,
    pub pairing: Pairing,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    pub pages: u32,
    pub records: usize,
}

enum PageItems {
    Plain(Vec<MovieRecord>),
    Rated(Vec<RatedEntry>),
}

/// Walks the user's rated-movies listing from page 1 and hands every record to
/// `sink`. Stops when a page cannot be fetched or lists no movie entries.
pub async fn crawl_ratings<S: RecordSink>(
    session: &Session,
    user: &str,
    opts: CrawlOptions,
    sink: &mut S,
) -> anyhow::Result<CrawlSummary> {
    let mut summary = CrawlSummary::default();
    let mut page = 1u32;

    loop {
        let url = session.listing_url(user, page);
        info!(page, %url, "Reading listing page");

        let Some(html) = session.fetch_listing(&url).await else {
            break;
        };
        summary.pages += 1;

        let (items, entries) = {
            let document = Html::parse_document(&html);
            let entries = parser::count_movie_entries(&document);
            let items = match opts.variant {
                ListingVariant::Plain => PageItems::Plain(parser::parse_plain_list(&document)),
                ListingVariant::Detailed => PageItems::Rated(
                    parser::parse_rated_movies(&document, user, opts.pairing)
                        .with_context(|| format!("failed to match ratings on page {page}"))?,
                ),
            };
            (items, entries)
        };

        let exported = match items {
            PageItems::Plain(records) => {
                for record in &records {
                    sink.append(record)?;
                }
                records.len()
            }
            PageItems::Rated(rated) => {
                let count = rated.len();
                for entry in rated {
                    let details = fetch_details(session, &entry.entry.detail_path).await;
                    sink.append(&MovieRecord::detailed(entry, details))?;
                }
                count
            }
        };

        summary.records += exported;
        info!(page, count = exported, "Movies exported from page");

        if entries == 0 {
            debug!(page, "No movie entries on page, listing exhausted");
            break;
        }

        page += 1;
    }

    Ok(summary)
}

/// Never fails: an unreachable page or a missing field leaves that field empty.
async fn fetch_details(session: &Session, detail_path: &str) -> MovieDetails {
    let url = session.absolute_url(detail_path);

    let body = match session.fetch_html(&url).await {
        Ok(body) => body,
        Err(e) => {
            warn!(%url, error = %e, "Failed to fetch detail page");
            return MovieDetails::default();
        }
    };

    let details = parser::parse_movie_details(&body);
    let missing = details.missing_fields();
    if !missing.is_empty() {
        warn!(%url, ?missing, "Detail page is missing fields");
    }

    details
}
