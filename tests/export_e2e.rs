//! End-to-end export runs against a mocked moviepilot site.
//!
//! Uses wiremock to serve listing, detail and login endpoints.

use moviepilot_export::config::Config;
use moviepilot_export::crawler::fetcher::{Credentials, Session};
use moviepilot_export::crawler::models::{ListingVariant, MovieRecord, Pairing};
use moviepilot_export::crawler::parser::ParseError;
use moviepilot_export::crawler::service::ExportService;
use moviepilot_export::crawler::{crawl_ratings, CrawlOptions};
use wiremock::{
    matchers::{body_string_contains, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

const LISTING_PATH: &str = "/users/alice/rated/movies";

/// Plain rows inside a `div.movie` card, as the site serves them.
fn plain_page(rows: &[(&str, &str, &str)]) -> String {
    format!(
        r#"<html><body><div class="movie">{}</div></body></html>"#,
        plain_table(rows)
    )
}

/// Plain rows with no `div.movie` card around them.
fn plain_rows(rows: &[(&str, &str, &str)]) -> String {
    format!("<html><body>{}</body></html>", plain_table(rows))
}

fn plain_table(rows: &[(&str, &str, &str)]) -> String {
    let rows: String = rows
        .iter()
        .map(|(title, year, rating)| {
            format!(
                r#"<tr><td class="plain-list-movie"><a href="/movies/x">{title}</a>
                   <span class="production_info">USA {year}</span></td>
                   <td class="rating">{rating}</td></tr>"#
            )
        })
        .collect();
    format!("<table>{rows}</table>")
}

fn rich_page(cards: &[(&str, &str, &str, &str)]) -> String {
    let cards: String = cards
        .iter()
        .map(|(href, title, label, rating)| {
            format!(
                r#"<div class="movie">
                     <a href="{href}" title="{title}" data-item-type="Movie">{title}</a>
                     <div class="rating-button"><span class="very-small">{label}</span><span class="value">{rating}</span></div>
                   </div>"#
            )
        })
        .collect();
    format!(r#"<html><body><div class="ad movie">Sponsored</div>{cards}</body></html>"#)
}

fn empty_page() -> String {
    "<html><body><p>Keine Bewertungen</p></body></html>".to_string()
}

fn detail_page(year: &str, original_title: &str, imdb_id: Option<&str>) -> String {
    let imdb = imdb_id
        .map(|id| format!(r#","imdbId":"{id}""#))
        .unwrap_or_default();
    format!(
        r#"<html><head><script>window.__MP__ = {{"movie":{{"productionYear":"{year}","originalTitle":"{original_title}"{imdb}}}}};</script></head><body></body></html>"#
    )
}

async fn mount_listing(server: &MockServer, page: u32, body: String, expected: u64) {
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .and(query_param("page", page.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(expected)
        .mount(server)
        .await;
}

async fn mount_detail(server: &MockServer, detail_path: &str, body: String, expected: u64) {
    Mock::given(method("GET"))
        .and(path(detail_path))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(expected)
        .mount(server)
        .await;
}

#[tokio::test]
async fn plain_export_stops_after_empty_page() {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        1,
        plain_page(&[("Pulp Fiction", "1994", "9.0"), ("Heat", "1995", "8.0")]),
        1,
    )
    .await;
    mount_listing(&server, 2, empty_page(), 1).await;
    mount_listing(&server, 3, plain_page(&[("Never", "2000", "1.0")]), 0).await;

    let session = Session::open(&server.uri()).unwrap();
    let mut records: Vec<MovieRecord> = Vec::new();
    let opts = CrawlOptions {
        variant: ListingVariant::Plain,
        pairing: Pairing::Container,
    };

    let summary = crawl_ratings(&session, "alice", opts, &mut records)
        .await
        .unwrap();

    assert_eq!(summary.pages, 2);
    assert_eq!(summary.records, 2);
    assert_eq!(
        records,
        vec![
            MovieRecord::plain("Pulp Fiction".into(), Some("1994".into()), "9.0".into()),
            MovieRecord::plain("Heat".into(), Some("1995".into()), "8.0".into()),
        ]
    );
}

#[tokio::test]
async fn plain_rows_without_movie_cards_end_the_listing() {
    let server = MockServer::start().await;
    mount_listing(&server, 1, plain_rows(&[("Pulp Fiction", "1994", "9.0")]), 1).await;
    mount_listing(&server, 2, plain_rows(&[("Heat", "1995", "8.0")]), 0).await;

    let session = Session::open(&server.uri()).unwrap();
    let mut records: Vec<MovieRecord> = Vec::new();
    let opts = CrawlOptions {
        variant: ListingVariant::Plain,
        pairing: Pairing::Container,
    };

    let summary = crawl_ratings(&session, "alice", opts, &mut records)
        .await
        .unwrap();

    assert_eq!(summary.pages, 1);
    assert_eq!(summary.records, 1);
    assert_eq!(records[0].title, "Pulp Fiction");
}

#[tokio::test]
async fn detailed_export_fetches_one_detail_page_per_movie() {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        1,
        rich_page(&[
            ("/movies/pulp-fiction", "Pulp Fiction", "alice", "9.0"),
            ("/movies/amelie", "Die fabelhafte Welt der Amelie", "Alice", "8.5"),
        ]),
        1,
    )
    .await;
    mount_listing(&server, 2, empty_page(), 1).await;
    mount_detail(
        &server,
        "/movies/pulp-fiction",
        detail_page("1994", "Pulp Fiction", Some("tt0110912")),
        1,
    )
    .await;
    mount_detail(
        &server,
        "/movies/amelie",
        detail_page(
            "2001",
            r"Le fabuleux destin d'Amélie Poulain &amp; Co",
            Some("tt0211915"),
        ),
        1,
    )
    .await;

    let session = Session::open(&server.uri()).unwrap();
    let mut records: Vec<MovieRecord> = Vec::new();
    let opts = CrawlOptions {
        variant: ListingVariant::Detailed,
        pairing: Pairing::Container,
    };

    let summary = crawl_ratings(&session, "alice", opts, &mut records)
        .await
        .unwrap();

    assert_eq!(summary.records, 2);
    assert_eq!(
        records[0],
        MovieRecord {
            title: "Pulp Fiction".into(),
            original_title: Some("Pulp Fiction".into()),
            year: Some("1994".into()),
            rating: "9.0".into(),
            imdb_id: Some("tt0110912".into()),
        }
    );
    assert_eq!(records[1].rating, "8.5");
    assert_eq!(
        records[1].original_title.as_deref(),
        Some("Le fabuleux destin d'Amélie Poulain & Co")
    );
}

#[tokio::test]
async fn positional_pairing_mismatch_aborts_with_named_error() {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        1,
        rich_page(&[
            ("/movies/heat", "Heat", "alice", "8.0"),
            ("/movies/alien", "Alien", "alic...", "9.5"),
        ]),
        1,
    )
    .await;
    mount_listing(&server, 2, empty_page(), 0).await;
    mount_detail(&server, "/movies/heat", detail_page("1995", "Heat", None), 0).await;

    let session = Session::open(&server.uri()).unwrap();
    let mut records: Vec<MovieRecord> = Vec::new();
    let opts = CrawlOptions {
        variant: ListingVariant::Detailed,
        pairing: Pairing::Positional,
    };

    let err = crawl_ratings(&session, "alice", opts, &mut records)
        .await
        .unwrap_err();

    assert_eq!(
        err.downcast_ref::<ParseError>(),
        Some(&ParseError::RatingsExhausted {
            movies: 2,
            ratings: 1,
            user: "alice".into(),
        })
    );
    assert!(records.is_empty());
}

#[tokio::test]
async fn missing_detail_fields_do_not_stop_the_page() {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        1,
        rich_page(&[
            ("/movies/heat", "Heat", "alice", "8.0"),
            ("/movies/gone", "Gone", "alice", "3.0"),
            ("/movies/alien", "Alien", "alice", "9.5"),
        ]),
        1,
    )
    .await;
    mount_listing(&server, 2, empty_page(), 1).await;
    mount_detail(&server, "/movies/heat", detail_page("1995", "Heat", None), 1).await;
    mount_detail(
        &server,
        "/movies/alien",
        detail_page("1979", "Alien", Some("tt0078748")),
        1,
    )
    .await;

    let session = Session::open(&server.uri()).unwrap();
    let mut records: Vec<MovieRecord> = Vec::new();
    let opts = CrawlOptions {
        variant: ListingVariant::Detailed,
        pairing: Pairing::Container,
    };

    crawl_ratings(&session, "alice", opts, &mut records)
        .await
        .unwrap();

    assert_eq!(records.len(), 3);
    assert_eq!(records[0].imdb_id, None);
    assert_eq!(records[0].year.as_deref(), Some("1995"));
    // `/movies/gone` is not mounted and answers 404
    assert_eq!(records[1].title, "Gone");
    assert_eq!(records[1].rating, "3.0");
    assert_eq!(records[1].original_title, None);
    assert_eq!(records[2].imdb_id.as_deref(), Some("tt0078748"));
}

#[tokio::test]
async fn unavailable_first_page_exports_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let session = Session::open(&server.uri()).unwrap();
    let mut records: Vec<MovieRecord> = Vec::new();

    let summary = crawl_ratings(&session, "alice", CrawlOptions::default(), &mut records)
        .await
        .unwrap();

    assert_eq!(summary.pages, 0);
    assert_eq!(summary.records, 0);
    assert!(records.is_empty());
}

#[tokio::test]
async fn login_posts_credentials_as_form() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<form></form>"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/session"))
        .and(body_string_contains("username=me"))
        .and(body_string_contains("password=hunter2"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let session = Session::open(&server.uri()).unwrap();
    let credentials = Credentials {
        username: "me".into(),
        password: "hunter2".into(),
    };

    session.login(&credentials).await.unwrap();
}

#[tokio::test]
async fn export_service_writes_csv_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/session"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    mount_listing(
        &server,
        1,
        plain_page(&[("Pulp Fiction", "1994", "9.0"), ("Heat", "1995", "8.0")]),
        1,
    )
    .await;
    mount_listing(&server, 2, empty_page(), 1).await;

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("alice.csv");
    let base_url = server.uri();
    let output_str = output.to_string_lossy().into_owned();
    let cfg = Config::from_lookup(|key| match key {
        "MOVIEPILOT_BASE_URL" => Some(base_url.clone()),
        "EXPORT_OUTPUT" => Some(output_str.clone()),
        _ => None,
    })
    .unwrap();
    let credentials = Credentials {
        username: "me".into(),
        password: "wrong".into(),
    };

    let service = ExportService::new(cfg, credentials, "alice".into());
    assert_eq!(service.output_path().unwrap(), output);
    let summary = service.run().await.unwrap();

    assert_eq!(summary.records, 2);
    let written = std::fs::read_to_string(&output).unwrap();
    let lines: Vec<&str> = written.lines().collect();
    assert_eq!(
        lines,
        vec!["Title,Year,Rating10", "Pulp Fiction,1994,9.0", "Heat,1995,8.0"]
    );
}
