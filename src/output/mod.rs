//! Per-tick artifact on disk.
//!
//! One file per tick, named after the tick start time. Records are appended
//! feed by feed through the same open handle, so whatever was collected
//! before a later failure is already on disk.

use chrono::{DateTime, Utc};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};

use crate::model::{ArticleRecord, Batch, Bias};

const FILE_NAME_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Suffixes tried for a JSON artifact whose per-second name is taken.
const MAX_NAME_SUFFIX: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable block per article.
    #[default]
    Text,
    /// A single JSON array of article objects.
    Json,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Text => "txt",
            OutputFormat::Json => "json",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown output format '{other}', expected text or json")),
        }
    }
}

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("artifact io on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("record encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Path of the artifact for a tick started at `tick_start`.
pub fn artifact_path(dir: &Path, tick_start: DateTime<Utc>, format: OutputFormat) -> PathBuf {
    numbered_artifact_path(dir, tick_start, format, 0)
}

fn numbered_artifact_path(
    dir: &Path,
    tick_start: DateTime<Utc>,
    format: OutputFormat,
    suffix: usize,
) -> PathBuf {
    let stamp = tick_start.format(FILE_NAME_FORMAT);
    let name = match suffix {
        0 => format!("{stamp}.{}", format.extension()),
        n => format!("{stamp}_{n}.{}", format.extension()),
    };
    dir.join(name)
}

/// Text artifacts append to the per-second file. A JSON array can't be
/// extended in place, so a taken name gets a numeric suffix instead.
async fn open_artifact(
    dir: &Path,
    tick_start: DateTime<Utc>,
    format: OutputFormat,
) -> Result<(PathBuf, File), OutputError> {
    if format == OutputFormat::Text {
        let path = artifact_path(dir, tick_start, format);
        return match OpenOptions::new().create(true).append(true).open(&path).await {
            Ok(file) => Ok((path, file)),
            Err(source) => Err(OutputError::Io { path, source }),
        };
    }

    let mut suffix = 0;
    loop {
        let path = numbered_artifact_path(dir, tick_start, format, suffix);
        match OpenOptions::new().write(true).create_new(true).open(&path).await {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists && suffix < MAX_NAME_SUFFIX => {
                suffix += 1;
            }
            Err(source) => return Err(OutputError::Io { path, source }),
        }
    }
}

/// Incremental encoder shared by the file writer and [`encode_batch`].
#[derive(Debug)]
struct RecordEncoder {
    format: OutputFormat,
    written: usize,
}

impl RecordEncoder {
    fn new(format: OutputFormat) -> Self {
        Self { format, written: 0 }
    }

    /// Bytes for `records` following what has been committed so far.
    /// Nothing counts as written until [`RecordEncoder::commit`].
    fn encode(&self, records: &[ArticleRecord]) -> Result<Vec<u8>, OutputError> {
        let mut out = String::new();
        for (i, record) in records.iter().enumerate() {
            match self.format {
                OutputFormat::Text => write_text_block(&mut out, record),
                OutputFormat::Json => {
                    out.push_str(if self.written + i == 0 { "[\n" } else { ",\n" });
                    out.push_str(&serde_json::to_string_pretty(record)?);
                }
            }
        }
        Ok(out.into_bytes())
    }

    fn commit(&mut self, count: usize) {
        self.written += count;
    }

    fn finish(&self) -> &'static [u8] {
        match self.format {
            OutputFormat::Text => b"",
            OutputFormat::Json if self.written == 0 => b"[]\n",
            OutputFormat::Json => b"\n]\n",
        }
    }
}

fn write_text_block(out: &mut String, record: &ArticleRecord) {
    let bias = |b: Option<Bias>| b.map(Bias::as_str).unwrap_or_default();
    // Writing into a String cannot fail
    let _ = write!(
        out,
        "Headline: {}\n\
         Publication date: {}\n\
         URL: {}\n\
         Source: {}\n\
         Content: {}\n\
         Image link: {}\n\
         Political bias: {}\n\
         Economic bias: {}\n\n",
        record.title,
        record.publish_date.as_deref().unwrap_or_default(),
        record.url,
        record.source_domain.as_deref().unwrap_or_default(),
        record.body_text,
        record.image_url.as_deref().unwrap_or_default(),
        bias(record.political_bias),
        bias(record.economic_bias),
    );
}

/// The whole batch in `format`, byte-identical to what an
/// [`ArtifactWriter`] produces when fed the same feeds.
pub fn encode_batch(batch: &Batch, format: OutputFormat) -> Result<Vec<u8>, OutputError> {
    let mut encoder = RecordEncoder::new(format);
    let mut out = Vec::new();
    for feed in &batch.feeds {
        out.extend(encoder.encode(feed)?);
        encoder.commit(feed.len());
    }
    out.extend_from_slice(encoder.finish());
    Ok(out)
}

/// Append-only handle on the tick's artifact.
#[derive(Debug)]
pub struct ArtifactWriter {
    path: PathBuf,
    file: File,
    encoder: RecordEncoder,
}

impl ArtifactWriter {
    /// Create the output directory if needed and open the tick's file.
    #[instrument(skip_all, fields(dir = %dir.display()))]
    pub async fn open(
        dir: &Path,
        tick_start: DateTime<Utc>,
        format: OutputFormat,
    ) -> Result<Self, OutputError> {
        fs::create_dir_all(dir).await.map_err(|source| OutputError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let (path, file) = open_artifact(dir, tick_start, format).await?;

        debug!(path = %path.display(), "Opened artifact");
        Ok(Self {
            path,
            file,
            encoder: RecordEncoder::new(format),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records_written(&self) -> usize {
        self.encoder.written
    }

    /// Append one feed's records and flush them to disk.
    pub async fn append_feed(&mut self, records: &[ArticleRecord]) -> Result<(), OutputError> {
        if records.is_empty() {
            return Ok(());
        }
        let bytes = self.encoder.encode(records)?;
        self.write(&bytes).await?;
        self.encoder.commit(records.len());
        Ok(())
    }

    /// Close the artifact, terminating the JSON array if there is one.
    pub async fn finish(mut self) -> Result<PathBuf, OutputError> {
        let tail = self.encoder.finish();
        if !tail.is_empty() {
            self.write(tail).await?;
        }
        Ok(self.path)
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<(), OutputError> {
        let result = async {
            self.file.write_all(bytes).await?;
            self.file.flush().await
        }
        .await;
        result.map_err(|source| OutputError::Io {
            path: self.path.clone(),
            source,
        })
    }
}
