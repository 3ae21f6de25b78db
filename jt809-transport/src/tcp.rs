//! TCP transport implementation

use crate::error::{Jt809Error, Jt809Result};
use crate::stream::{IoReader, IoWriter};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

/// Read half of a TCP link
pub type TcpReader = IoReader<OwnedReadHalf>;

/// Write half of a TCP link
pub type TcpWriter = IoWriter<OwnedWriteHalf>;

/// TCP transport layer settings
#[derive(Debug, Clone)]
pub struct TcpSettings {
    /// Remote `host:port`; host names are resolved at connect time
    pub address: String,
    pub connect_timeout: Option<Duration>,
}

impl TcpSettings {
    /// Create new TCP settings with the default 30 second connect timeout
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            connect_timeout: Some(Duration::from_secs(30)),
        }
    }

    /// Create TCP settings with timeout
    pub fn with_timeout(address: impl Into<String>, timeout: Duration) -> Self {
        Self {
            address: address.into(),
            connect_timeout: Some(timeout),
        }
    }
}

/// Dials and splits TCP links
#[derive(Debug, Clone)]
pub struct TcpTransport {
    settings: TcpSettings,
}

impl TcpTransport {
    pub fn new(settings: TcpSettings) -> Self {
        Self { settings }
    }

    pub fn from_address(address: &str) -> Self {
        Self::new(TcpSettings::new(address))
    }

    pub fn settings(&self) -> &TcpSettings {
        &self.settings
    }

    /// Dial the remote address and split the connection
    ///
    /// # Errors
    /// - `Jt809Error::Timeout` if the connect timeout elapses
    /// - `Jt809Error::Connection` if the dial fails
    pub async fn open(&self) -> Jt809Result<(TcpReader, TcpWriter, SocketAddr)> {
        let address = self.settings.address.as_str();
        let stream = if let Some(timeout) = self.settings.connect_timeout {
            tokio::time::timeout(timeout, TcpStream::connect(address))
                .await
                .map_err(|_| Jt809Error::Timeout)??
        } else {
            TcpStream::connect(address).await?
        };

        let peer = stream.peer_addr()?;
        log::debug!("TCP link to {} established", peer);
        let (reader, writer) = Self::from_connected_stream(stream);
        Ok((reader, writer, peer))
    }

    /// Split an already-connected stream (an accepted sub link)
    pub fn from_connected_stream(stream: TcpStream) -> (TcpReader, TcpWriter) {
        if let Err(e) = stream.set_nodelay(true) {
            log::debug!("set_nodelay failed: {}", e);
        }
        let (read_half, write_half) = stream.into_split();
        (IoReader::new(read_half), IoWriter::new(write_half))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{StreamAccessor, StreamWriter};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn test_tcp_settings() {
        let settings = TcpSettings::new("127.0.0.1:8080");
        assert_eq!(settings.address, "127.0.0.1:8080");
        assert_eq!(settings.connect_timeout, Some(Duration::from_secs(30)));
    }

    #[tokio::test]
    async fn test_open_and_exchange() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let accept = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 3];
            socket.read_exact(&mut buf).await.unwrap();
            socket.write_all(&buf).await.unwrap();
        });

        let transport = TcpTransport::from_address(&addr.to_string());
        let (mut reader, mut writer, peer) = transport.open().await.unwrap();
        assert_eq!(peer, addr);
        writer.write_all(&[7, 8, 9]).await.unwrap();
        let mut buf = [0u8; 3];
        reader.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf, [7, 8, 9]);

        accept.await.unwrap();
        writer.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_open_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = TcpTransport::new(TcpSettings::with_timeout(
            addr.to_string(),
            Duration::from_secs(5),
        ));
        assert!(transport.open().await.is_err());
    }
}
