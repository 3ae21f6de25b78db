//! Stream accessor traits for the transport layer
//!
//! Each link is split into a read side, owned by that link's receive loop,
//! and a write side, owned by the session's send path.

use crate::error::{Jt809Error, Jt809Result};
use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Read side of a link
#[async_trait]
pub trait StreamAccessor: Send {
    /// Read data from the stream
    ///
    /// # Returns
    ///
    /// Number of bytes read, or 0 if EOF
    async fn read(&mut self, buf: &mut [u8]) -> Jt809Result<usize>;

    /// Read exact number of bytes from the stream
    ///
    /// # Errors
    ///
    /// `UnexpectedEof` if the stream ends before `buf` is filled
    async fn read_exact(&mut self, mut buf: &mut [u8]) -> Jt809Result<()> {
        while !buf.is_empty() {
            let n = self.read(buf).await?;
            if n == 0 {
                return Err(Jt809Error::Connection(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "Failed to read exact number of bytes",
                )));
            }
            buf = &mut buf[n..];
        }
        Ok(())
    }

    /// Check if the stream has reached EOF or failed
    fn is_closed(&self) -> bool;
}

/// Write side of a link
#[async_trait]
pub trait StreamWriter: Send {
    /// Write data to the stream
    ///
    /// # Returns
    ///
    /// Number of bytes written
    async fn write(&mut self, buf: &[u8]) -> Jt809Result<usize>;

    /// Write all data to the stream
    async fn write_all(&mut self, buf: &[u8]) -> Jt809Result<()> {
        let mut written = 0;
        while written < buf.len() {
            let n = self.write(&buf[written..]).await?;
            if n == 0 {
                return Err(Jt809Error::Connection(std::io::Error::new(
                    std::io::ErrorKind::WriteZero,
                    "Failed to write all data",
                )));
            }
            written += n;
        }
        Ok(())
    }

    /// Flush any buffered data
    async fn flush(&mut self) -> Jt809Result<()>;

    /// Check if the stream is closed
    fn is_closed(&self) -> bool;

    /// Close the stream. Closing an already closed stream is a no-op.
    async fn close(&mut self) -> Jt809Result<()>;
}

/// `StreamAccessor` over any tokio reader
#[derive(Debug)]
pub struct IoReader<R> {
    inner: R,
    closed: bool,
}

impl<R> IoReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            closed: false,
        }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> StreamAccessor for IoReader<R> {
    async fn read(&mut self, buf: &mut [u8]) -> Jt809Result<usize> {
        if self.closed {
            return Ok(0);
        }
        match self.inner.read(buf).await {
            Ok(0) => {
                self.closed = true;
                Ok(0)
            }
            Ok(n) => Ok(n),
            Err(e) => {
                self.closed = true;
                Err(Jt809Error::Connection(e))
            }
        }
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

/// `StreamWriter` over any tokio writer
#[derive(Debug)]
pub struct IoWriter<W> {
    inner: W,
    closed: bool,
}

impl<W> IoWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            closed: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> StreamWriter for IoWriter<W> {
    async fn write(&mut self, buf: &[u8]) -> Jt809Result<usize> {
        if self.closed {
            return Err(Jt809Error::Connection(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "stream already closed",
            )));
        }
        self.inner.write(buf).await.map_err(|e| {
            self.closed = true;
            Jt809Error::Connection(e)
        })
    }

    async fn flush(&mut self) -> Jt809Result<()> {
        self.inner.flush().await.map_err(Jt809Error::Connection)
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    async fn close(&mut self) -> Jt809Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        match self.inner.shutdown().await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotConnected => Ok(()),
            Err(e) => Err(Jt809Error::Connection(e)),
        }
    }
}
