//! Byte fetching for the dataset loader.

use std::time::Duration;

use reqwest::Url;
use reqwest::blocking::Client;

use super::error::DatasetError;

/// Fetch the body behind a URL.
///
/// Implementations block the calling thread; the loader fans calls out over
/// its own threads.
pub trait Fetch: Send + Sync {
    fn fetch(&self, url: &Url) -> Result<Vec<u8>, DatasetError>;
}

/// HTTP(S) fetcher backed by a blocking reqwest client.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, DatasetError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(DatasetError::Client)?;
        Ok(Self { client })
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &Url) -> Result<Vec<u8>, DatasetError> {
        let network_err = |source| DatasetError::Network {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url.clone()).send().map_err(network_err)?;
        let status = response.status();
        if !status.is_success() {
            return Err(DatasetError::Http {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let body = response.bytes().map_err(network_err)?;
        Ok(body.to_vec())
    }
}
