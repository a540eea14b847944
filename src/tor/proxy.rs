//! Startup checks for the Tor SOCKS proxy

use crate::UmbraError;
use reqwest::Client;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Text check.torproject.org shows when the request came through Tor
const TOR_CHECK_MARKER: &str = "Congratulations";

/// Confirms a SOCKS5 proxy is listening at `endpoint`
///
/// Performs the SOCKS5 greeting offering only "no authentication" and
/// expects the proxy to accept it. Anything else means requests cannot be
/// anonymized, which is fatal before a crawl starts.
pub async fn probe_proxy(endpoint: &str, timeout: Duration) -> Result<(), UmbraError> {
    let unavailable = |reason: String| UmbraError::ProxyUnavailable {
        endpoint: endpoint.to_string(),
        reason,
    };

    let handshake = async {
        let mut stream = TcpStream::connect(endpoint).await?;
        // VER=5, NMETHODS=1, METHOD=0 (no auth)
        stream.write_all(&[0x05, 0x01, 0x00]).await?;
        let mut reply = [0u8; 2];
        stream.read_exact(&mut reply).await?;
        Ok::<_, std::io::Error>(reply)
    };

    let reply = tokio::time::timeout(timeout, handshake)
        .await
        .map_err(|_| unavailable(format!("no answer within {:?}", timeout)))?
        .map_err(|e| unavailable(e.to_string()))?;

    match reply {
        [0x05, 0x00] => {
            tracing::debug!("SOCKS5 proxy at {} accepted handshake", endpoint);
            Ok(())
        }
        [0x05, method] => Err(unavailable(format!(
            "proxy requires unsupported auth method {:#04x}",
            method
        ))),
        _ => Err(unavailable("endpoint is not a SOCKS5 proxy".to_string())),
    }
}

/// Fetches a Tor check page through `client` and reports whether the
/// request was seen as coming from Tor
pub async fn verify_tor_routing(client: &Client, verify_url: &str) -> Result<bool, reqwest::Error> {
    let body = client.get(verify_url).send().await?.text().await?;
    Ok(body.contains(TOR_CHECK_MARKER))
}
