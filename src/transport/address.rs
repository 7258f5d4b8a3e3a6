//! Relay addresses.
//!
//! - `pipes`: the worker's own stdin/stdout
//! - `unix:///path/to.sock`: Unix Domain Socket (Unix only)
//! - `tcp://host:port`: TCP socket
//!
//! # Example
//!
//! ```
//! use thumper_client::transport::RelayAddress;
//!
//! let addr: RelayAddress = "tcp://127.0.0.1:6001".parse().unwrap();
//! assert_eq!(addr, RelayAddress::Tcp("127.0.0.1:6001".to_string()));
//! assert_eq!(addr.to_string(), "tcp://127.0.0.1:6001");
//! ```

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use tokio::io::{AsyncRead, AsyncWrite};

use super::relay::{DynRelay, StreamRelay};
use crate::error::{Result, ThumperError};

/// Where the host runtime can be reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayAddress {
    /// Standard input / standard output of this process.
    Pipes,
    /// Unix Domain Socket path.
    Unix(PathBuf),
    /// TCP `host:port`.
    Tcp(String),
}

impl RelayAddress {
    /// Open the stream and wrap it in a relay.
    pub async fn connect(&self, max_payload_size: u32) -> Result<DynRelay> {
        let (reader, writer): (
            Box<dyn AsyncRead + Unpin + Send>,
            Box<dyn AsyncWrite + Unpin + Send>,
        ) = match self {
            RelayAddress::Pipes => (Box::new(tokio::io::stdin()), Box::new(tokio::io::stdout())),
            RelayAddress::Unix(path) => connect_unix(path).await?,
            RelayAddress::Tcp(addr) => {
                let stream = tokio::net::TcpStream::connect(addr.as_str()).await?;
                stream.set_nodelay(true)?;
                let (r, w) = stream.into_split();
                (Box::new(r), Box::new(w))
            }
        };

        tracing::debug!(address = %self, "Relay connected");
        Ok(StreamRelay::with_max_payload(reader, writer, max_payload_size))
    }

    /// Whether this address uses the process's stdio.
    pub fn is_pipes(&self) -> bool {
        matches!(self, RelayAddress::Pipes)
    }
}

#[cfg(unix)]
async fn connect_unix(
    path: &std::path::Path,
) -> Result<(
    Box<dyn AsyncRead + Unpin + Send>,
    Box<dyn AsyncWrite + Unpin + Send>,
)> {
    let stream = tokio::net::UnixStream::connect(path).await?;
    let (r, w) = stream.into_split();
    Ok((Box::new(r), Box::new(w)))
}

#[cfg(not(unix))]
async fn connect_unix(
    path: &std::path::Path,
) -> Result<(
    Box<dyn AsyncRead + Unpin + Send>,
    Box<dyn AsyncWrite + Unpin + Send>,
)> {
    Err(ThumperError::Config(format!(
        "Unix sockets are not supported on this platform: {}",
        path.display()
    )))
}

impl FromStr for RelayAddress {
    type Err = ThumperError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s == "pipes" {
            return Ok(RelayAddress::Pipes);
        }
        if let Some(path) = s.strip_prefix("unix://") {
            if path.is_empty() {
                return Err(ThumperError::Config("Empty unix socket path".to_string()));
            }
            return Ok(RelayAddress::Unix(PathBuf::from(path)));
        }
        if let Some(addr) = s.strip_prefix("tcp://") {
            let valid = matches!(
                addr.rsplit_once(':'),
                Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok()
            );
            if !valid {
                return Err(ThumperError::Config(format!(
                    "Invalid tcp relay address: {}",
                    s
                )));
            }
            return Ok(RelayAddress::Tcp(addr.to_string()));
        }
        Err(ThumperError::Config(format!(
            "Unsupported relay address: {:?} (expected pipes, unix://... or tcp://...)",
            s
        )))
    }
}

impl fmt::Display for RelayAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayAddress::Pipes => f.write_str("pipes"),
            RelayAddress::Unix(path) => write!(f, "unix://{}", path.display()),
            RelayAddress::Tcp(addr) => write!(f, "tcp://{}", addr),
        }
    }
}
