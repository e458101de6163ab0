use std::fmt;
use std::str::FromStr;

/// Which listing layout a run scrapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListingVariant {
    /// Simple `plain-list-movie` table: title, year and rating only.
    #[default]
    Plain,
    /// Rich movie cards; every movie also triggers a detail-page fetch.
    Detailed,
}

impl ListingVariant {
    pub fn header(self) -> &'static [&'static str] {
        match self {
            ListingVariant::Plain => &["Title", "Year", "Rating10"],
            ListingVariant::Detailed => &["Title", "OriginalTitle", "Year", "Rating10", "ImdbId"],
        }
    }
}

impl FromStr for ListingVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plain" | "simple" => Ok(ListingVariant::Plain),
            "detailed" | "rich" => Ok(ListingVariant::Detailed),
            other => Err(format!("unknown listing variant `{other}`")),
        }
    }
}

impl fmt::Display for ListingVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListingVariant::Plain => f.write_str("plain"),
            ListingVariant::Detailed => f.write_str("detailed"),
        }
    }
}

/// How ratings are matched to movies on a rich listing page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pairing {
    /// Rating and movie are read from the same `div.movie` container.
    #[default]
    Container,
    /// Ratings and movies are collected as two lists and zipped by index.
    Positional,
}

impl FromStr for Pairing {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "container" => Ok(Pairing::Container),
            "positional" => Ok(Pairing::Positional),
            other => Err(format!("unknown pairing mode `{other}`")),
        }
    }
}

/// A movie card that carries an actionable `data-item-type` link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub title: String,
    pub detail_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatedEntry {
    pub entry: ListingEntry,
    pub rating: String,
}

/// Fields scraped from a movie's detail page. Each one is independently optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MovieDetails {
    pub original_title: Option<String>,
    pub imdb_id: Option<String>,
    pub year: Option<String>,
}

impl MovieDetails {
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.original_title.is_none() {
            missing.push("originalTitle");
        }
        if self.imdb_id.is_none() {
            missing.push("imdbId");
        }
        if self.year.is_none() {
            missing.push("productionYear");
        }
        missing
    }
}

/// One exported row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovieRecord {
    pub title: String,
    pub original_title: Option<String>,
    pub year: Option<String>,
    pub rating: String,
    pub imdb_id: Option<String>,
}

impl MovieRecord {
    pub fn plain(title: String, year: Option<String>, rating: String) -> Self {
        Self {
            title,
            original_title: None,
            year,
            rating,
            imdb_id: None,
        }
    }

    pub fn detailed(rated: RatedEntry, details: MovieDetails) -> Self {
        Self {
            title: rated.entry.title,
            original_title: details.original_title,
            year: details.year,
            rating: rated.rating,
            imdb_id: details.imdb_id,
        }
    }
}
