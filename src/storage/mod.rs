use crate::crawler::models::MovieRecord;

pub mod csv_sink;

pub use csv_sink::CsvSink;

/// Destination for finished records. Each call hands over one record.
pub trait RecordSink {
    fn append(&mut self, record: &MovieRecord) -> anyhow::Result<()>;
}

impl RecordSink for Vec<MovieRecord> {
    fn append(&mut self, record: &MovieRecord) -> anyhow::Result<()> {
        self.push(record.clone());
        Ok(())
    }
}
