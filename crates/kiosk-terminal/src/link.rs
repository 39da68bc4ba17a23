//! Serial transport abstraction.
//!
//! The session is written against the [`SerialLink`] trait so the same
//! code drives a real tty and a scripted device in tests. The real
//! implementation, [`TtyLink`], uses tokio-serial with fixed 8N1 framing.

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{SerialPort, SerialPortBuilderExt, SerialStream};

use crate::error::{TerminalError, TerminalResult};

/// Fixed framing and timing for the console link.
#[derive(Debug, Clone)]
pub struct SerialSettings {
    /// Serial device path (e.g. "/dev/ttyUSB0", "COM4").
    pub device: String,
    /// Baud rate; the console side is fixed at the same rate.
    pub baud: u32,
    /// Upper bound on the response accumulation loop per command.
    pub read_timeout: Duration,
    /// Pause between writing a command and the first read.
    pub settle_delay: Duration,
}

impl SerialSettings {
    /// Console baud rate used by the managed switches.
    pub const DEFAULT_BAUD: u32 = 9600;

    /// Platform-default console device.
    #[cfg(windows)]
    pub const DEFAULT_DEVICE: &'static str = "COM4";
    /// Platform-default console device.
    #[cfg(not(windows))]
    pub const DEFAULT_DEVICE: &'static str = "/dev/ttyUSB0";

    /// Creates settings for the given device with default timing.
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            ..Self::default()
        }
    }
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            device: Self::DEFAULT_DEVICE.to_string(),
            baud: Self::DEFAULT_BAUD,
            read_timeout: Duration::from_secs(2),
            settle_delay: Duration::from_millis(500),
        }
    }
}

/// Byte-stream transport under a console session.
#[async_trait]
pub trait SerialLink: Send {
    /// Writes the full buffer to the device.
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Reads whatever the device has buffered, waiting at most `wait`
    /// for the first byte. Returns an empty vec if nothing arrived.
    async fn read_available(&mut self, wait: Duration) -> io::Result<Vec<u8>>;

    /// Discards any buffered input and output.
    async fn clear(&mut self) -> io::Result<()>;
}

/// Serial link over a local tty via tokio-serial.
pub struct TtyLink {
    stream: SerialStream,
}

impl TtyLink {
    /// Opens the device described by `settings` with 8N1 framing.
    pub fn open(settings: &SerialSettings) -> TerminalResult<Self> {
        let stream = tokio_serial::new(&settings.device, settings.baud)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .open_native_async()
            .map_err(|e| TerminalError::OpenFailed {
                device: settings.device.clone(),
                message: e.to_string(),
            })?;
        Ok(Self { stream })
    }
}

#[async_trait]
impl SerialLink for TtyLink {
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.stream.write_all(data).await?;
        self.stream.flush().await
    }

    async fn read_available(&mut self, wait: Duration) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; 4096];
        match tokio::time::timeout(wait, self.stream.read(&mut buf)).await {
            Ok(Ok(n)) => {
                buf.truncate(n);
                Ok(buf)
            }
            Ok(Err(e)) => Err(e),
            // Nothing arrived within the window; the device is quiet.
            Err(_) => Ok(Vec::new()),
        }
    }

    async fn clear(&mut self) -> io::Result<()> {
        self.stream
            .clear(tokio_serial::ClearBuffer::All)
            .map_err(io::Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = SerialSettings::default();
        assert_eq!(settings.baud, 9600);
        assert_eq!(settings.read_timeout, Duration::from_secs(2));
        assert_eq!(settings.settle_delay, Duration::from_millis(500));
    }

    #[test]
    fn test_new_overrides_device_only() {
        let settings = SerialSettings::new("/dev/ttyS3");
        assert_eq!(settings.device, "/dev/ttyS3");
        assert_eq!(settings.baud, SerialSettings::DEFAULT_BAUD);
    }
}
