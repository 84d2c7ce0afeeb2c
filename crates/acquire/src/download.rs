//! Artifact download.

use kubetools_core::{Error, Result};
use reqwest::Client;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Download `url` into `dest_dir` with a single attempt.
///
/// The file is named after the last URL path segment.
pub(crate) async fn download(
    client: &Client,
    tool: &str,
    url: &str,
    dest_dir: &Path,
) -> Result<PathBuf> {
    info!(tool, %url, "Downloading");

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| Error::download(tool, url, e.to_string()))?;

    if !response.status().is_success() {
        return Err(Error::download(
            tool,
            url,
            format!("HTTP {}", response.status()),
        ));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| Error::download(tool, url, format!("Failed to read body: {e}")))?;

    tokio::fs::create_dir_all(dest_dir).await?;
    let dest = dest_dir.join(file_name_from_url(url).unwrap_or(tool));
    tokio::fs::write(&dest, &bytes).await?;

    debug!(tool, bytes = bytes.len(), ?dest, "Downloaded artifact");
    Ok(dest)
}

/// Last non-empty path segment of a URL, ignoring query and fragment.
fn file_name_from_url(url: &str) -> Option<&str> {
    let without_query = url.split(['?', '#']).next()?;
    let (_, rest) = without_query.split_once("://")?;
    let (_, path) = rest.split_once('/')?;
    path.rsplit('/')
        .find(|segment| !segment.is_empty())
        .filter(|segment| *segment != "." && *segment != "..")
}
