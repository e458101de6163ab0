use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::crawler::models::{ListingVariant, MovieRecord};
use crate::storage::RecordSink;

#[derive(Serialize)]
struct PlainRow<'a> {
    title: &'a str,
    year: Option<&'a str>,
    rating: &'a str,
}

#[derive(Serialize)]
struct DetailedRow<'a> {
    title: &'a str,
    original_title: Option<&'a str>,
    year: Option<&'a str>,
    rating: &'a str,
    imdb_id: Option<&'a str>,
}

/// Comma-delimited export file. The header is written on creation and every
/// appended row is flushed straight to disk.
pub struct CsvSink {
    writer: csv::Writer<File>,
    variant: ListingVariant,
    path: PathBuf,
}

impl CsvSink {
    pub fn create(path: impl AsRef<Path>, variant: ListingVariant) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)
            .with_context(|| format!("failed to create {}", path.display()))?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer.write_record(variant.header())?;
        writer.flush()?;

        Ok(Self {
            writer,
            variant,
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSink for CsvSink {
    fn append(&mut self, record: &MovieRecord) -> Result<()> {
        match self.variant {
            ListingVariant::Plain => self.writer.serialize(PlainRow {
                title: &record.title,
                year: record.year.as_deref(),
                rating: &record.rating,
            })?,
            ListingVariant::Detailed => self.writer.serialize(DetailedRow {
                title: &record.title,
                original_title: record.original_title.as_deref(),
                year: record.year.as_deref(),
                rating: &record.rating,
                imdb_id: record.imdb_id.as_deref(),
            })?,
        }

        self.writer
            .flush()
            .with_context(|| format!("failed to flush {}", self.path.display()))
    }
}
