//! One-time bulk ingestion of the reference tower dataset.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};
use csv::{ErrorKind, StringRecord};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::cache::TowerCache;
use crate::model::{TowerId, TowerLocation};

const BATCH_SIZE: usize = 1000;

/// Counts from one ingestion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    pub inserted: u64,
    pub malformed: u64,
}

pub struct DatasetLoader {
    cache: TowerCache,
    // serializes concurrent ingestion attempts; the loser re-reads the
    // population flag under the lock and backs off
    running: Mutex<()>,
}

impl DatasetLoader {
    pub fn new(cache: TowerCache) -> Self {
        Self {
            cache,
            running: Mutex::new(()),
        }
    }

    /// Ingest the reference dataset unless a previous run already completed.
    /// Returns `None` when the cache was already populated.
    ///
    /// The population flag is only set after the whole stream has been
    /// consumed, so an aborted run is retried on the next startup. Rows
    /// written before the abort stay; re-inserting them is a no-op.
    pub async fn populate_if_needed<R: Read>(&self, reader: R) -> Result<Option<IngestReport>> {
        let _guard = self.running.lock().await;
        if self.cache.is_populated().await? {
            return Ok(None);
        }

        let report = self.ingest(reader).await?;
        self.cache.mark_populated().await?;
        info!(
            inserted = report.inserted,
            malformed = report.malformed,
            "reference dataset ingested"
        );
        Ok(Some(report))
    }

    pub async fn populate_from_path(&self, path: &Path) -> Result<Option<IngestReport>> {
        let file = File::open(path)
            .with_context(|| format!("failed to open dataset at {}", path.display()))?;
        self.populate_if_needed(BufReader::new(file)).await
    }

    async fn ingest<R: Read>(&self, reader: R) -> Result<IngestReport> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let mut report = IngestReport {
            inserted: 0,
            malformed: 0,
        };
        let mut batch = Vec::with_capacity(BATCH_SIZE);

        for (i, result) in reader.records().enumerate() {
            // line 1 is the discarded header, data starts at line 2
            let line = i + 2;
            if (i % 100_000) == 0 && i != 0 {
                info!("dataset ingestion at line {line}");
            }

            let record = match result {
                Ok(record) => record,
                // bad bytes spoil one row, not the stream; only an i/o
                // failure aborts the run
                Err(e) if matches!(e.kind(), ErrorKind::Utf8 { .. }) => {
                    warn!("skipping undecodable dataset row at line {line}: {e}");
                    report.malformed += 1;
                    continue;
                }
                Err(e) => {
                    return Err(e).with_context(|| format!("dataset unreadable at line {line}"))
                }
            };
            match parse_row(&record) {
                Some(location) => {
                    batch.push(location);
                    if batch.len() == BATCH_SIZE {
                        report.inserted += self.cache.insert_batch(&batch).await?;
                        batch.clear();
                    }
                }
                None => {
                    warn!("skipping malformed dataset row at line {line}");
                    report.malformed += 1;
                }
            }
        }
        if !batch.is_empty() {
            report.inserted += self.cache.insert_batch(&batch).await?;
        }

        Ok(report)
    }
}

/// Columns follow the OpenCellID `cell_towers.csv` layout:
/// `radio,mcc,net,area,cell,unit,lon,lat,range,...`
fn parse_row(record: &StringRecord) -> Option<TowerLocation> {
    if record.len() < 8 {
        return None;
    }
    let mcc = record[1].parse().ok()?;
    let mnc = record[2].parse().ok()?;
    let lac = record[3].parse().ok()?;
    let cid = record[4].parse().ok()?;
    let lon = record[6].parse().ok()?;
    let lat = record[7].parse().ok()?;
    Some(TowerLocation {
        tower: TowerId { mcc, mnc, lac, cid },
        lat,
        lon,
    })
}
