use std::{io::Read, time::Duration};

use anyhow::{Context, Result};
use reqwest::{blocking::Client, redirect::Policy};

/// Fetch a remote file fully into memory.
pub(crate) fn fetch_bytes(url: &str) -> Result<Vec<u8>> {
    let client = Client::builder()
        .user_agent(concat!("obcine/", env!("CARGO_PKG_VERSION")))
        .redirect(Policy::limited(10))
        .timeout(Duration::from_secs(60))
        .build()?;

    let mut resp = client.get(url)
        .send()
        .with_context(|| format!("GET {url}"))?
        .error_for_status()
        .with_context(|| format!("GET {url} returned error status"))?;

    let mut bytes = Vec::new();
    resp.read_to_end(&mut bytes).with_context(|| format!("read body of {url}"))?;

    tracing::debug!(url, len = bytes.len(), "fetched dataset");
    Ok(bytes)
}
