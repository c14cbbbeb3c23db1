// 🌐 Registry Fetch - download the health-unit CSV and store it locally
//
// One shot, no retries. The download is decoded as UTF-8, re-encoded from
// the source delimiter (';') to plain comma CSV, and written through a
// sibling temp file + rename so a failed run never leaves a partial file.

use crate::config::{delimiter_byte, FetchConfig};
use crate::error::FetchError;
use chrono::{DateTime, Utc};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::USER_AGENT;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize)]
pub struct FetchSummary {
    pub path: PathBuf,
    pub bytes: usize,
    /// Data rows, header excluded
    pub rows: usize,
    pub fetched_at: DateTime<Utc>,
}

pub fn fetch_to_file(config: &FetchConfig) -> Result<FetchSummary, FetchError> {
    let delimiter =
        delimiter_byte(config.input_delimiter).map_err(|e| FetchError::Config(e.to_string()))?;

    let transport = |source| FetchError::Transport {
        url: config.url.clone(),
        source,
    };

    let client = HttpClient::builder()
        .danger_accept_invalid_certs(config.accept_invalid_certs)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(transport)?;

    tracing::info!(url = %config.url, "connecting to data server");

    let response = client
        .get(&config.url)
        .header(USER_AGENT, &config.user_agent)
        .send()
        .map_err(transport)?;

    let status = response.status();
    if !status.is_success() {
        tracing::warn!(url = %config.url, status = status.as_u16(), "server refused access");
        return Err(FetchError::Status {
            url: config.url.clone(),
            status: status.as_u16(),
        });
    }

    let body = response.bytes().map_err(transport)?;
    let text = String::from_utf8(body.to_vec())?;

    let (csv_text, rows) = reencode_delimited(&text, delimiter)?;
    write_atomically(&config.output_path, csv_text.as_bytes())?;

    tracing::info!(path = %config.output_path.display(), rows, "registry saved");

    Ok(FetchSummary {
        path: config.output_path.clone(),
        bytes: csv_text.len(),
        rows,
        fetched_at: Utc::now(),
    })
}

/// Re-encode delimited text as comma CSV. Returns the text and the data row count.
pub fn reencode_delimited(text: &str, delimiter: u8) -> Result<(String, usize), FetchError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(text.as_bytes());
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());

    let mut lines = 0usize;
    for record in reader.byte_records() {
        writer.write_byte_record(&record?)?;
        lines += 1;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| FetchError::Csv(csv::Error::from(e.into_error())))?;
    let out = String::from_utf8(bytes)?;

    Ok((out, lines.saturating_sub(1)))
}

fn write_atomically(path: &Path, contents: &[u8]) -> Result<(), FetchError> {
    let io_err = |source| FetchError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("download.csv");
    let temp_path = path.with_file_name(format!(".{}.part", file_name));

    let result = fs::File::create(&temp_path)
        .and_then(|mut file| {
            file.write_all(contents)?;
            file.sync_all()
        })
        .and_then(|_| fs::rename(&temp_path, path));

    if let Err(e) = result {
        let _ = fs::remove_file(&temp_path);
        return Err(io_err(e));
    }

    Ok(())
}
