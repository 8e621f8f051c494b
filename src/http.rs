/*
 *  http.rs
 *
 *  LyTicker - ticks on paper
 *	(c) 2020-26 Stuart Hunter
 *
 *	Shared reqwest client and retrying GET for the quote and weather sources
 *
 *	This program is free software: you can redistribute it and/or modify
 *	it under the terms of the GNU General Public License as published by
 *	the Free Software Foundation, either version 3 of the License, or
 *	(at your option) any later version.
 *
 *	This program is distributed in the hope that it will be useful,
 *	but WITHOUT ANY WARRANTY; without even the implied warranty of
 *	MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *	GNU General Public License for more details.
 *
 *	See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *	Public License.
 *
 */

use std::io::Read;
use std::time::Duration;

use flate2::read::GzDecoder;
use log::{debug, warn};
use reqwest::{header, Client};
use serde::Serialize;

use crate::constants::USER_AGENT;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const RETRY_PAUSE: Duration = Duration::from_secs(1);

/// Client with our identity and compression headers preset.
pub fn build_client() -> Result<Client, reqwest::Error> {
    let mut headers = header::HeaderMap::new();
    headers.insert("User-Agent", header::HeaderValue::from_static(USER_AGENT));
    headers.insert("Accept", header::HeaderValue::from_static("application/json"));
    headers.insert("Accept-Encoding", header::HeaderValue::from_static("gzip"));
    headers.insert("Connection", header::HeaderValue::from_static("close"));

    Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .default_headers(headers)
        .timeout(REQUEST_TIMEOUT)
        .build()
}

/// Body of a completed request, whatever its status.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub status: u16,
    pub body: String,
}

impl Fetched {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Gzip first, plain text when the body is not compressed.
pub fn decode_body(raw: &[u8]) -> String {
    let mut decoder = GzDecoder::new(raw);
    let mut decoded = String::new();
    match decoder.read_to_string(&mut decoded) {
        Ok(_) => decoded,
        Err(_) => String::from_utf8_lossy(raw).to_string(),
    }
}

/// GET with query params, retried on transport errors only.
///
/// An HTTP error status is a completed request and is returned to the
/// caller without retrying.
pub async fn send_with_retries<T: Serialize + ?Sized>(
    client: &Client,
    url: &str,
    params: &T,
    max_retries: u8,
) -> Result<Fetched, reqwest::Error> {
    let mut retries = 0;
    loop {
        match client.get(url).query(params).send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                let raw = response.bytes().await?;
                debug!("GET {} -> {} ({} bytes)", url, status, raw.len());
                return Ok(Fetched { status, body: decode_body(&raw) });
            }
            Err(e) => {
                retries += 1;
                if retries >= max_retries {
                    return Err(e); // max retries reached
                }
                warn!("GET {} failed ({}), retry {} of {}", url, e, retries, max_retries - 1);
                tokio::time::sleep(RETRY_PAUSE).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::{write::GzEncoder, Compression};
    use std::io::Write;

    #[test]
    fn test_decode_plain_body() {
        assert_eq!(decode_body(br#"{"a":1}"#), r#"{"a":1}"#);
    }

    #[test]
    fn test_decode_gzip_body() {
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(b"{\"main\":{\"temp\":21.4}}").unwrap();
        let raw = enc.finish().unwrap();
        assert_eq!(decode_body(&raw), "{\"main\":{\"temp\":21.4}}");
    }

    #[test]
    fn test_status_classes() {
        assert!(Fetched { status: 200, body: String::new() }.is_success());
        assert!(!Fetched { status: 404, body: String::new() }.is_success());
    }
}
