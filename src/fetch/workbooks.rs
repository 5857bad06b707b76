// src/fetch/workbooks.rs

use anyhow::Result;
use reqwest::Client;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;
use url::Url;

/// Download one workbook URL into `dest_dir` under its original filename.
/// Published exports never change in place, so an already-present file is
/// left alone. Returns the full path of the saved file.
pub async fn download_workbook(
    client: &Client,
    url_str: &str,
    dest_dir: impl AsRef<Path>,
) -> Result<PathBuf> {
    let dest_dir = dest_dir.as_ref();
    let url = Url::parse(url_str)?;
    let filename = url
        .path_segments()
        .and_then(|segments| segments.last())
        .filter(|name| !name.is_empty())
        .unwrap_or("workbook.xlsx");
    let dest_path = dest_dir.join(filename);

    if fs::try_exists(&dest_path).await.unwrap_or(false) {
        debug!(path = %dest_path.display(), "workbook already on disk");
        return Ok(dest_path);
    }

    if let Some(parent) = dest_path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let resp = client.get(url.as_str()).send().await?.error_for_status()?;
    let bytes = resp.bytes().await?;
    fs::write(&dest_path, &bytes).await?;

    Ok(dest_path)
}
