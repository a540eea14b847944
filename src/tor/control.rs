//! Tor control-port client
//!
//! Speaks just enough of the Tor control protocol to authenticate and ask for
//! a fresh circuit (`SIGNAL NEWNYM`). Each request uses its own short-lived
//! connection; rotations are rare enough that keeping one open is not worth
//! the reconnect handling.

use crate::config::TorConfig;
use crate::tor::{CircuitControl, TorError};
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

/// How to authenticate against the control port
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlAuth {
    /// `CookieAuthentication 0` and no password configured
    Null,
    /// `HashedControlPassword`
    Password(String),
    /// `CookieAuthentication 1`; the cookie file is read on every request
    Cookie(PathBuf),
}

impl ControlAuth {
    /// Builds the `AUTHENTICATE` command line for this method
    async fn command(&self) -> Result<String, TorError> {
        match self {
            Self::Null => Ok("AUTHENTICATE".to_string()),
            Self::Password(password) => Ok(format!(
                "AUTHENTICATE \"{}\"",
                escape_quoted(password)
            )),
            Self::Cookie(path) => {
                let cookie = tokio::fs::read(path).await.map_err(|source| TorError::Cookie {
                    path: path.display().to_string(),
                    source,
                })?;
                Ok(format!("AUTHENTICATE {}", hex::encode(cookie)))
            }
        }
    }
}

fn escape_quoted(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Client for Tor's control port
#[derive(Debug, Clone)]
pub struct TorControl {
    endpoint: String,
    auth: ControlAuth,
    timeout: Duration,
}

impl TorControl {
    pub fn new(endpoint: impl Into<String>, auth: ControlAuth) -> Self {
        Self {
            endpoint: endpoint.into(),
            auth,
            timeout: Duration::from_secs(10),
        }
    }

    /// Builds a client from the `[tor]` configuration section
    ///
    /// A password takes precedence over a cookie path.
    pub fn from_config(config: &TorConfig) -> Self {
        let auth = match (&config.control_password, &config.cookie_path) {
            (Some(password), _) => ControlAuth::Password(password.clone()),
            (None, Some(path)) => ControlAuth::Cookie(PathBuf::from(path)),
            (None, None) => ControlAuth::Null,
        };
        Self::new(config.control_endpoint(), auth)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn signal_newnym(&self) -> Result<(), TorError> {
        let stream = TcpStream::connect(&self.endpoint)
            .await
            .map_err(|source| TorError::Connect {
                endpoint: self.endpoint.clone(),
                source,
            })?;

        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        let auth = self.auth.command().await?;
        write_half.write_all(format!("{}\r\n", auth).as_bytes()).await?;
        read_reply(&mut reader).await?;

        write_half.write_all(b"SIGNAL NEWNYM\r\n").await?;
        read_reply(&mut reader).await?;

        // Best effort; the connection is dropped either way
        let _ = write_half.write_all(b"QUIT\r\n").await;

        Ok(())
    }
}

#[async_trait]
impl CircuitControl for TorControl {
    async fn new_circuit(&self) -> Result<(), TorError> {
        tokio::time::timeout(self.timeout, self.signal_newnym())
            .await
            .map_err(|_| TorError::Timeout(self.timeout))?
    }
}

/// Reads one (possibly multi-line) control reply and checks for `250`
async fn read_reply<R>(reader: &mut BufReader<R>) -> Result<String, TorError>
where
    R: AsyncRead + Unpin,
{
    let mut message = String::new();

    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).await? == 0 {
            return Err(TorError::ConnectionClosed);
        }

        let line = line.trim_end_matches(['\r', '\n']);
        let (Some(code), Some(separator), Some(text)) =
            (line.get(..3), line.get(3..4), line.get(4..))
        else {
            return Err(TorError::Protocol(line.to_string()));
        };

        if code != "250" {
            return Err(TorError::Rejected {
                code: code.to_string(),
                message: text.to_string(),
            });
        }

        if !message.is_empty() {
            message.push('\n');
        }
        message.push_str(text);

        // "250-" and "250+" continue the reply, "250 " ends it
        if separator == " " {
            return Ok(message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    /// Minimal control port that accepts one connection and records commands
    async fn fake_control_port(replies: Vec<&'static str>) -> (String, tokio::task::JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = listener.local_addr().unwrap().to_string();

        let handle = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (read_half, mut write_half) = stream.into_split();
            let mut reader = BufReader::new(read_half);
            let mut commands = Vec::new();

            for reply in replies {
                let mut line = String::new();
                if reader.read_line(&mut line).await.unwrap() == 0 {
                    break;
                }
                commands.push(line.trim_end().to_string());
                write_half.write_all(reply.as_bytes()).await.unwrap();
            }
            commands
        });

        (endpoint, handle)
    }

    #[tokio::test]
    async fn test_password_auth_and_newnym() {
        let (endpoint, server) = fake_control_port(vec!["250 OK\r\n", "250 OK\r\n"]).await;

        let control = TorControl::new(endpoint, ControlAuth::Password("p\"w".to_string()));
        control.new_circuit().await.unwrap();

        let commands = server.await.unwrap();
        assert_eq!(commands[0], "AUTHENTICATE \"p\\\"w\"");
        assert_eq!(commands[1], "SIGNAL NEWNYM");
    }

    #[tokio::test]
    async fn test_cookie_auth_is_hex_encoded() {
        let dir = tempfile::TempDir::new().unwrap();
        let cookie_path = dir.path().join("control_auth_cookie");
        std::fs::write(&cookie_path, [0xde, 0xad, 0xbe, 0xef]).unwrap();

        let (endpoint, server) = fake_control_port(vec!["250 OK\r\n", "250 OK\r\n"]).await;

        let control = TorControl::new(endpoint, ControlAuth::Cookie(cookie_path));
        control.new_circuit().await.unwrap();

        let commands = server.await.unwrap();
        assert_eq!(commands[0], "AUTHENTICATE deadbeef");
    }

    #[tokio::test]
    async fn test_authentication_rejected() {
        let (endpoint, _server) =
            fake_control_port(vec!["515 Authentication failed: Password did not match\r\n"]).await;

        let control = TorControl::new(endpoint, ControlAuth::Password("wrong".to_string()));
        let err = control.new_circuit().await.unwrap_err();

        match err {
            TorError::Rejected { code, message } => {
                assert_eq!(code, "515");
                assert!(message.contains("Authentication failed"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_multiline_reply() {
        let (endpoint, _server) = fake_control_port(vec![
            "250-AUTH METHODS=NULL\r\n250 OK\r\n",
            "250 OK\r\n",
        ])
        .await;

        let control = TorControl::new(endpoint, ControlAuth::Null);
        assert!(control.new_circuit().await.is_ok());
    }

    #[tokio::test]
    async fn test_connect_failure() {
        // Bind then drop to get a port nobody listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = listener.local_addr().unwrap().to_string();
        drop(listener);

        let control = TorControl::new(endpoint, ControlAuth::Null);
        let err = control.new_circuit().await.unwrap_err();
        assert!(matches!(err, TorError::Connect { .. }));
    }

    #[test]
    fn test_from_config_prefers_password() {
        let mut config = TorConfig {
            control_password: Some("secret".to_string()),
            cookie_path: Some("/run/tor/control.authcookie".to_string()),
            ..TorConfig::default()
        };
        let control = TorControl::from_config(&config);
        assert_eq!(control.auth, ControlAuth::Password("secret".to_string()));
        assert_eq!(control.endpoint(), "127.0.0.1:9051");

        config.control_password = None;
        let control = TorControl::from_config(&config);
        assert!(matches!(control.auth, ControlAuth::Cookie(_)));
    }
}
