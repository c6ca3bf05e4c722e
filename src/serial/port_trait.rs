//! Write seam between frame producers and the serial port.

use async_trait::async_trait;
use std::io;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Byte sink the bridge writes frames to
#[async_trait]
pub trait SerialPortIO: Send {
    /// Queue `data` for transmission
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Push queued bytes out to the device
    async fn flush(&mut self) -> io::Result<()>;
}

/// [`SerialPortIO`] over any async writer, normally the write half of a
/// serial stream
pub struct FramePort<W> {
    writer: W,
}

impl<W> FramePort<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> SerialPortIO for FramePort<W> {
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        AsyncWriteExt::write_all(&mut self.writer, data).await
    }

    async fn flush(&mut self) -> io::Result<()> {
        AsyncWriteExt::flush(&mut self.writer).await
    }
}
