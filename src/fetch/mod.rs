//! Corpus downloader for the kokkai speech API
//!
//! Bulk acquisition over the paginated search API with bounded retry and
//! exponential backoff. Batches are written as `kokkai_{start:06}.json`
//! and existing files are skipped, so re-running the download resumes
//! where it left off. The first ten records are also written to the
//! sample file used as the retrieval fallback corpus.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use indicatif::{ProgressBar, ProgressStyle};
use rand::Rng;
use reqwest::Client;
use serde_json::{json, Value};

use crate::errors::{RagError, Result};

/// kokkai speech search endpoint
pub const API_BASE_URL: &str = "https://kokkai.ndl.go.jp/api/speech";

/// Default date range when no keyword is given (the API requires some
/// search condition; the range covers the first Diet session onward)
pub const DEFAULT_FROM_DATE: &str = "1947-01-01";
pub const DEFAULT_UNTIL_DATE: &str = "2026-12-31";

/// Per-request limit imposed by the API
const API_MAX_BATCH: usize = 100;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_RETRIES: u32 = 3;
const RETRY_BASE_DELAY_SECS: f64 = 1.0;
const BATCH_PAUSE: Duration = Duration::from_millis(300);
const SAMPLE_RECORDS: usize = 10;

/// Download parameters
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Total records to fetch
    pub total: usize,
    /// Records per request (clamped to the API limit)
    pub batch_size: usize,
    /// Full-text keyword; empty switches to the date range
    pub keyword: String,
    pub from_date: String,
    pub until_date: String,
    /// Directory for batch files
    pub output_dir: PathBuf,
    /// Skip batches that already exist on disk
    pub skip_existing: bool,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            total: 500,
            batch_size: 100,
            keyword: String::new(),
            from_date: DEFAULT_FROM_DATE.to_string(),
            until_date: DEFAULT_UNTIL_DATE.to_string(),
            output_dir: PathBuf::from("data").join("corpus"),
            skip_existing: true,
        }
    }
}

/// Downloads corpus batches from the kokkai API
pub struct CorpusDownloader {
    client: Client,
}

impl CorpusDownloader {
    /// Create a downloader with a shared HTTP client
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(format!(
                "kokkai-rag/{} (research)",
                env!("CARGO_PKG_VERSION")
            ))
            .build()
            .map_err(RagError::HttpError)?;
        Ok(Self { client })
    }

    /// Download all batches; returns the total record count
    pub async fn download(&self, options: &DownloadOptions) -> Result<usize> {
        validate_dates(options)?;

        let batch_size = options.batch_size.clamp(1, API_MAX_BATCH);
        if batch_size != options.batch_size {
            tracing::warn!(
                event = "batch_size_clamped",
                requested = options.batch_size,
                used = batch_size,
            );
        }

        fs::create_dir_all(&options.output_dir)?;
        let sample_dir = options
            .output_dir
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join("sample");
        fs::create_dir_all(&sample_dir)?;

        let starts = batch_starts(options.total, batch_size);
        tracing::info!(
            event = "download_start",
            total = options.total,
            batch_size = batch_size,
            batches = starts.len(),
        );

        let pb = ProgressBar::new(starts.len() as u64);
        pb.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} batches ({msg})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        let mut total_records = 0usize;
        let mut sample_saved = false;

        for start_record in starts {
            let out_path = batch_path(&options.output_dir, start_record);

            let records = if options.skip_existing && out_path.exists() {
                tracing::info!(event = "skip_existing", path = %out_path.display());
                let cached: Value = serde_json::from_str(&fs::read_to_string(&out_path)?)?;
                extract_records(&cached)
            } else {
                let actual_batch = batch_size.min(options.total - start_record + 1);
                let envelope = self
                    .fetch_batch(start_record, actual_batch, options)
                    .await?;
                let records = extract_records(&envelope);

                fs::write(&out_path, serde_json::to_string_pretty(&envelope)?)?;
                tracing::info!(
                    event = "batch_saved",
                    path = %out_path.display(),
                    records = records.len(),
                );

                // Politeness pause between live API requests
                tokio::time::sleep(BATCH_PAUSE).await;
                records
            };

            total_records += records.len();
            if !sample_saved && !records.is_empty() {
                save_sample(&sample_dir, &records)?;
                sample_saved = true;
            }

            pb.inc(1);
            pb.set_message(format!("{} records", total_records));
        }

        pb.finish_with_message(format!("{} records", total_records));
        tracing::info!(event = "download_complete", total_records = total_records);
        Ok(total_records)
    }

    /// Fetch one batch with exponential backoff and jitter
    async fn fetch_batch(
        &self,
        start_record: usize,
        maximum_records: usize,
        options: &DownloadOptions,
    ) -> Result<Value> {
        let mut params: Vec<(&str, String)> = vec![
            ("maximumRecords", maximum_records.to_string()),
            ("startRecord", start_record.to_string()),
            ("recordPacking", "json".to_string()),
        ];
        if options.keyword.is_empty() {
            params.push(("from", options.from_date.clone()));
            params.push(("until", options.until_date.clone()));
        } else {
            params.push(("any", options.keyword.clone()));
        }

        let mut last_error: Option<reqwest::Error> = None;

        for attempt in 0..MAX_RETRIES {
            let result = self
                .client
                .get(API_BASE_URL)
                .query(&params)
                .send()
                .await
                .and_then(|r| r.error_for_status());

            match result {
                Ok(response) => {
                    let data: Value = response.json().await.map_err(RagError::HttpError)?;
                    tracing::info!(
                        event = "fetch_ok",
                        start = start_record,
                        count = maximum_records,
                        attempt = attempt,
                    );
                    return Ok(data);
                }
                Err(e) => {
                    if attempt + 1 < MAX_RETRIES {
                        let jitter: f64 = rand::thread_rng().gen_range(0.0..0.5);
                        let delay = RETRY_BASE_DELAY_SECS * 2f64.powi(attempt as i32) + jitter;
                        tracing::warn!(
                            event = "fetch_retry",
                            start = start_record,
                            attempt = attempt + 1,
                            max_retries = MAX_RETRIES,
                            delay_secs = delay,
                            error = %e,
                        );
                        tokio::time::sleep(Duration::from_secs_f64(delay)).await;
                    } else {
                        tracing::error!(
                            event = "fetch_failed",
                            start = start_record,
                            error = %e,
                        );
                    }
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) => Err(RagError::HttpError(e)),
            None => Err(RagError::CorpusError("no fetch attempts made".to_string())),
        }
    }
}

/// The API expects YYYY-MM-DD; catch bad ranges before the first request
fn validate_dates(options: &DownloadOptions) -> Result<()> {
    for (name, value) in [
        ("from_date", &options.from_date),
        ("until_date", &options.until_date),
    ] {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| {
            RagError::InvalidRequest(format!("{}: {:?} ({})", name, value, e))
        })?;
    }
    Ok(())
}

/// 1-indexed batch start positions
fn batch_starts(total: usize, batch_size: usize) -> Vec<usize> {
    (1..=total).step_by(batch_size.max(1)).collect()
}

/// Batch file path: `kokkai_{start:06}.json`
fn batch_path(output_dir: &Path, start_record: usize) -> PathBuf {
    output_dir.join(format!("kokkai_{:06}.json", start_record))
}

fn extract_records(envelope: &Value) -> Vec<Value> {
    envelope
        .get("speechRecord")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

/// Write the first records to the sample fallback file
fn save_sample(sample_dir: &Path, records: &[Value]) -> Result<()> {
    let sample_records: Vec<Value> = records.iter().take(SAMPLE_RECORDS).cloned().collect();
    let sample_data = json!({
        "description": "国会会議録検索システム API サンプルデータ（10件）",
        "source": API_BASE_URL,
        "numberOfSamples": sample_records.len(),
        "speechRecord": sample_records,
    });

    let path = sample_dir.join("kokkai_sample.json");
    fs::write(&path, serde_json::to_string_pretty(&sample_data)?)?;
    tracing::info!(
        event = "sample_saved",
        path = %path.display(),
        count = sample_records.len(),
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_starts_cover_total() {
        assert_eq!(batch_starts(500, 100), vec![1, 101, 201, 301, 401]);
        assert_eq!(batch_starts(250, 100), vec![1, 101, 201]);
        assert_eq!(batch_starts(1, 100), vec![1]);
        assert!(batch_starts(0, 100).is_empty());
    }

    #[test]
    fn test_batch_path_zero_padded() {
        let path = batch_path(Path::new("data/corpus"), 101);
        assert!(path.to_string_lossy().ends_with("kokkai_000101.json"));
    }

    #[test]
    fn test_default_options() {
        let options = DownloadOptions::default();
        assert_eq!(options.total, 500);
        assert_eq!(options.batch_size, 100);
        assert!(options.skip_existing);
        assert_eq!(options.from_date, DEFAULT_FROM_DATE);
    }

    #[test]
    fn test_validate_dates() {
        let mut options = DownloadOptions::default();
        assert!(validate_dates(&options).is_ok());
        options.from_date = "not-a-date".to_string();
        assert!(validate_dates(&options).is_err());
    }

    #[test]
    fn test_extract_records_missing_key() {
        assert!(extract_records(&json!({})).is_empty());
        assert_eq!(
            extract_records(&json!({"speechRecord": [{"speechID": "a"}]})).len(),
            1
        );
    }

    #[test]
    fn test_save_sample_caps_at_ten() {
        let tmp = tempfile::tempdir().unwrap();
        let records: Vec<Value> = (0..15).map(|i| json!({"speechID": i.to_string()})).collect();
        save_sample(tmp.path(), &records).unwrap();

        let written: Value = serde_json::from_str(
            &fs::read_to_string(tmp.path().join("kokkai_sample.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(written["numberOfSamples"], 10);
        assert_eq!(written["speechRecord"].as_array().unwrap().len(), 10);
    }
}
