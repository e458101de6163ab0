use std::path::PathBuf;

use tracing::info;

use crate::{
    config::Config,
    crawler::{self, fetcher::Credentials, fetcher::Session, CrawlOptions, CrawlSummary},
    storage::CsvSink,
};

/// One export run: log in, open the output file, crawl every listing page.
pub struct ExportService {
    cfg: Config,
    credentials: Credentials,
    user: String,
}

impl ExportService {
    pub fn new(cfg: Config, credentials: Credentials, user: String) -> Self {
        Self {
            cfg,
            credentials,
            user,
        }
    }

    pub fn output_path(&self) -> anyhow::Result<PathBuf> {
        self.cfg.output_path_for(&self.user)
    }

    pub async fn run(&self) -> anyhow::Result<CrawlSummary> {
        let session = Session::open(&self.cfg.base_url)?;
        session.login(&self.credentials).await?;

        let path = self.output_path()?;
        let mut sink = CsvSink::create(&path, self.cfg.variant)?;
        info!(
            user = %self.user,
            variant = %self.cfg.variant,
            path = %path.display(),
            "Exporting rated movies"
        );

        let opts = CrawlOptions {
            variant: self.cfg.variant,
            pairing: self.cfg.pairing,
        };
        let summary = crawler::crawl_ratings(&session, &self.user, opts, &mut sink).await?;

        info!(
            pages = summary.pages,
            total = summary.records,
            path = %sink.path().display(),
            "Export finished"
        );
        Ok(summary)
    }
}
