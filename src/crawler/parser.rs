use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use tracing::{debug, warn};

use crate::crawler::models::{
    ListingEntry, MovieDetails, MovieRecord, Pairing, RatedEntry,
};

static PLAIN_MOVIE: Lazy<Selector> = Lazy::new(|| selector("td.plain-list-movie"));
static PRODUCTION_INFO: Lazy<Selector> = Lazy::new(|| selector("span.production_info"));
static LINK: Lazy<Selector> = Lazy::new(|| selector("a"));
static MOVIE_CARD: Lazy<Selector> = Lazy::new(|| selector("div.movie"));
static ITEM_LINK: Lazy<Selector> = Lazy::new(|| selector("a[data-item-type]"));
static RATING_BUTTON: Lazy<Selector> = Lazy::new(|| selector(".rating-button"));
static RATING_LABEL: Lazy<Selector> = Lazy::new(|| selector(".very-small"));
static SCRIPT: Lazy<Selector> = Lazy::new(|| selector("script"));

static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("valid regex"));
static IMDB_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^tt\d{7,10}$").expect("valid regex"));
static PRODUCTION_YEAR_FIELD: Lazy<Regex> = Lazy::new(|| embedded_field("productionYear"));
static ORIGINAL_TITLE_FIELD: Lazy<Regex> = Lazy::new(|| embedded_field("originalTitle"));
static IMDB_ID_FIELD: Lazy<Regex> = Lazy::new(|| embedded_field("imdbId"));

/// Rating labels longer than this are truncated by the site and end in an ellipsis.
const LABEL_PREFIX_CHARS: usize = 7;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("page lists {movies} movies but only {ratings} ratings matched user `{user}`")]
    RatingsExhausted {
        movies: usize,
        ratings: usize,
        user: String,
    },
    #[error("movie `{title}` has no rating labelled for user `{user}`")]
    MissingRating { title: String, user: String },
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid selector")
}

/// Matches `"key": "value"` (escaped quotes allowed) or `"key": 1234`.
fn embedded_field(key: &str) -> Regex {
    let pattern = format!(
        r#""{}"\s*:\s*(?:"((?:[^"\\]|\\.)*)"|(-?\d+))"#,
        regex::escape(key)
    );
    Regex::new(&pattern).expect("valid regex")
}

/// Stripped text pieces of an element, glued together.
fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("")
}

fn next_element(el: ElementRef<'_>) -> Option<ElementRef<'_>> {
    el.next_siblings().find_map(ElementRef::wrap)
}

/// Number of `div.movie` cards on a listing page, whichever layout is being
/// extracted. Zero means the listing ran past its last page.
pub fn count_movie_entries(document: &Html) -> usize {
    document.select(&MOVIE_CARD).count()
}

// -------- Simple list --------

pub fn parse_plain_list(document: &Html) -> Vec<MovieRecord> {
    let mut records = Vec::new();

    for cell in document.select(&PLAIN_MOVIE) {
        let Some(link) = cell.select(&LINK).next() else {
            debug!("Skipping plain list cell without a title link");
            continue;
        };
        let title = element_text(link);

        // every info block overwrites the previous one; the last block with digits wins
        let mut year = None;
        for info in cell.select(&PRODUCTION_INFO) {
            let text = info.text().collect::<String>();
            if let Some(m) = DIGITS.find(&text) {
                year = Some(m.as_str().to_string());
            }
        }

        let rating = next_element(cell).map(element_text).unwrap_or_default();

        records.push(MovieRecord::plain(title, year, rating));
    }

    records
}

// -------- Rich list --------

/// Case-insensitive match of a rating label against the target user.
/// Long names are shown as their first seven characters plus an ellipsis.
pub fn label_matches_user(label: &str, user: &str) -> bool {
    let label = label.trim().to_lowercase();
    let user = user.trim().to_lowercase();

    if label == user {
        return true;
    }
    if user.chars().count() <= LABEL_PREFIX_CHARS {
        return false;
    }

    let prefix: String = user.chars().take(LABEL_PREFIX_CHARS).collect();
    label
        .strip_prefix(prefix.as_str())
        .is_some_and(|rest| rest == "..." || rest == "…")
}

/// Rating value of a `.rating-button` if its label names `user`.
fn rating_for_user(button: ElementRef<'_>, user: &str) -> Option<String> {
    let label = button.select(&RATING_LABEL).next()?;
    let leading = label.text().map(str::trim).find(|t| !t.is_empty())?;

    if !label_matches_user(leading, user) {
        return None;
    }

    next_element(label).map(element_text)
}

fn kept_entry(card: ElementRef<'_>) -> Option<ListingEntry> {
    let link = card.select(&ITEM_LINK).next()?;
    let detail_path = link.value().attr("href")?.trim().to_string();
    let title = link
        .value()
        .attr("title")
        .map(|t| t.trim().to_string())
        .unwrap_or_else(|| element_text(link));

    Some(ListingEntry { title, detail_path })
}

/// Matched rating values in document order. Buttons labelled for another user
/// contribute nothing.
pub fn extract_ratings(document: &Html, user: &str) -> Vec<String> {
    document
        .select(&RATING_BUTTON)
        .filter_map(|button| rating_for_user(button, user))
        .collect()
}

/// Movie cards carrying an `a[data-item-type]` link, in document order.
pub fn extract_kept_movies(document: &Html) -> Vec<ListingEntry> {
    document.select(&MOVIE_CARD).filter_map(kept_entry).collect()
}

/// Nth movie takes the Nth rating.
pub fn pair_by_position(
    movies: Vec<ListingEntry>,
    ratings: Vec<String>,
    user: &str,
) -> Result<Vec<RatedEntry>, ParseError> {
    if ratings.len() < movies.len() {
        return Err(ParseError::RatingsExhausted {
            movies: movies.len(),
            ratings: ratings.len(),
            user: user.to_string(),
        });
    }
    if ratings.len() > movies.len() {
        warn!(
            movies = movies.len(),
            ratings = ratings.len(),
            "More ratings than movies on page; surplus ratings ignored"
        );
    }

    Ok(movies
        .into_iter()
        .zip(ratings)
        .map(|(entry, rating)| RatedEntry { entry, rating })
        .collect())
}

/// Reads movie and rating out of the same card, one pass over the page.
pub fn parse_rated_cards(document: &Html, user: &str) -> Result<Vec<RatedEntry>, ParseError> {
    let mut rated = Vec::new();

    for card in document.select(&MOVIE_CARD) {
        let Some(entry) = kept_entry(card) else {
            continue;
        };

        let rating = card
            .select(&RATING_BUTTON)
            .find_map(|button| rating_for_user(button, user))
            .ok_or_else(|| ParseError::MissingRating {
                title: entry.title.clone(),
                user: user.to_string(),
            })?;

        rated.push(RatedEntry { entry, rating });
    }

    Ok(rated)
}

pub fn parse_rated_movies(
    document: &Html,
    user: &str,
    pairing: Pairing,
) -> Result<Vec<RatedEntry>, ParseError> {
    match pairing {
        Pairing::Container => parse_rated_cards(document, user),
        Pairing::Positional => pair_by_position(
            extract_kept_movies(document),
            extract_ratings(document, user),
            user,
        ),
    }
}

// -------- Detail page --------

fn find_field(haystacks: &[String], field: &Regex) -> Option<String> {
    haystacks.iter().find_map(|text| {
        let caps = field.captures(text)?;
        caps.get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str().to_string())
    })
}

/// Undo UTF-8 bytes that were read back as Latin-1 (`Ã©` → `é`).
/// Left untouched unless every char fits in a byte and the bytes are valid UTF-8.
fn repair_mojibake(text: &str) -> Cow<'_, str> {
    if text.is_ascii() || text.chars().any(|c| u32::from(c) > 0xFF) {
        return Cow::Borrowed(text);
    }

    let bytes: Vec<u8> = text.chars().map(|c| u32::from(c) as u8).collect();
    match String::from_utf8(bytes) {
        Ok(fixed) => Cow::Owned(fixed),
        Err(_) => Cow::Borrowed(text),
    }
}

/// `n` hex digits at the start of `text`.
fn leading_hex(text: &str, n: usize) -> Option<u32> {
    let digits = text.get(..n)?;
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(digits, 16).ok()
}

/// `\uXXXX` (with surrogate pairs), `\xNN` and the single-character escapes.
/// Returns the char and how many bytes after the backslash it used up.
fn escape_at(after: &str) -> Option<(char, usize)> {
    let simple = match after.chars().next()? {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        'b' => '\u{8}',
        'f' => '\u{c}',
        '"' => '"',
        '\'' => '\'',
        '/' => '/',
        '\\' => '\\',
        'x' => return char::from_u32(leading_hex(&after[1..], 2)?).map(|c| (c, 3)),
        'u' => {
            let code = leading_hex(&after[1..], 4)?;
            if (0xD800..=0xDBFF).contains(&code) {
                let low = after[5..]
                    .strip_prefix("\\u")
                    .and_then(|s| leading_hex(s, 4))
                    .filter(|low| (0xDC00..=0xDFFF).contains(low))?;
                let combined = 0x10000 + ((code - 0xD800) << 10) + (low - 0xDC00);
                return char::from_u32(combined).map(|c| (c, 11));
            }
            return char::from_u32(code).map(|c| (c, 5));
        }
        _ => return None,
    };
    Some((simple, 1))
}

/// Interprets backslash escapes one at a time. Unknown or broken sequences are
/// kept as written.
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(pos) = rest.find('\\') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        match escape_at(after) {
            Some((c, used)) => {
                out.push(c);
                rest = &after[used..];
            }
            None => {
                out.push('\\');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Escape sequences first, then the Latin-1 repair, then HTML entities.
pub fn decode_title(raw: &str) -> String {
    let unescaped = unescape(raw);
    let repaired = repair_mojibake(&unescaped);
    html_escape::decode_html_entities(&repaired).into_owned()
}

/// Pulls the embedded metadata out of a detail page. Script blocks are searched
/// before the raw body; any field that cannot be found is `None`.
pub fn parse_movie_details(body: &str) -> MovieDetails {
    let document = Html::parse_document(body);
    let mut haystacks: Vec<String> = document
        .select(&SCRIPT)
        .map(|script| script.text().collect::<String>())
        .collect();
    haystacks.push(body.to_string());

    let year = find_field(&haystacks, &PRODUCTION_YEAR_FIELD).filter(|y| !y.is_empty());
    let original_title = find_field(&haystacks, &ORIGINAL_TITLE_FIELD)
        .map(|raw| decode_title(&raw))
        .filter(|t| !t.is_empty());
    let imdb_id = find_field(&haystacks, &IMDB_ID_FIELD).filter(|id| IMDB_ID.is_match(id));

    MovieDetails {
        original_title,
        imdb_id,
        year,
    }
}
