use crate::error::{IconError, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

const MAX_NAME_ATTEMPTS: i64 = 1000;

/// `<product>-icon-<epoch-millis>.png`
pub fn suggested_filename(product_name: &str, timestamp_ms: i64) -> String {
    format!("{}-icon-{}.png", product_name, timestamp_ms)
}

/// Decodes a `data:<mime>;base64,<payload>` reference into raw bytes.
pub fn decode_image_reference(url: &str) -> Result<Vec<u8>> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| IconError::DownloadFailed("not a data URL".into()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| IconError::DownloadFailed("data URL has no payload".into()))?;
    if !header.ends_with(";base64") {
        return Err(IconError::DownloadFailed(
            "only base64 data URLs are supported".into(),
        ));
    }
    STANDARD
        .decode(payload.trim())
        .map_err(|e| IconError::DownloadFailed(format!("invalid base64 payload: {}", e)))
}

async fn fetch_image(url: &str) -> Result<Vec<u8>> {
    let response = reqwest::get(url)
        .await
        .map_err(|e| IconError::DownloadFailed(e.to_string()))?;
    if !response.status().is_success() {
        return Err(IconError::DownloadFailed(format!(
            "{} returned {}",
            url,
            response.status()
        )));
    }
    let bytes = response
        .bytes()
        .await
        .map_err(|e| IconError::DownloadFailed(e.to_string()))?;
    Ok(bytes.to_vec())
}

pub async fn save_image(url: &str, dir: &Path, product_name: &str) -> Result<PathBuf> {
    let bytes = if url.starts_with("http://") || url.starts_with("https://") {
        fetch_image(url).await?
    } else {
        decode_image_reference(url)?
    };

    fs::create_dir_all(dir)
        .await
        .map_err(|e| IconError::DownloadFailed(e.to_string()))?;
    let path = write_new_file(dir, product_name, Utc::now().timestamp_millis(), &bytes).await?;

    log::info!("💾 Icon saved to: {}", path.display());
    Ok(path)
}

/// Writes `bytes` under the first free `<product>-icon-<ms>.png`, starting at
/// `timestamp_ms` and stepping forward one millisecond per taken name.
async fn write_new_file(
    dir: &Path,
    product_name: &str,
    timestamp_ms: i64,
    bytes: &[u8],
) -> Result<PathBuf> {
    for offset in 0..MAX_NAME_ATTEMPTS {
        let path = dir.join(suggested_filename(product_name, timestamp_ms + offset));
        let mut file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::AlreadyExists => continue,
            Err(err) => return Err(IconError::DownloadFailed(err.to_string())),
        };
        file.write_all(bytes)
            .await
            .map_err(|e| IconError::DownloadFailed(e.to_string()))?;
        file.flush()
            .await
            .map_err(|e| IconError::DownloadFailed(e.to_string()))?;
        return Ok(path);
    }
    Err(IconError::DownloadFailed(format!(
        "no free file name in {} after {} attempts",
        dir.display(),
        MAX_NAME_ATTEMPTS
    )))
}
