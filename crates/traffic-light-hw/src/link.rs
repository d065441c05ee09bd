//! Serial channel to the controller.
//!
//! The port is split into a reader task and a writer task that only shuttle
//! bytes over unbounded channels. Protocol code polls the link without ever
//! blocking: reads return whatever already arrived, writes are queued and
//! forgotten.

use crate::{Error, Result};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_serial::{DataBits, Parity, SerialPortBuilderExt, StopBits};
use tracing::{debug, info, warn};

/// Read buffer size for the reader task.
const READ_CHUNK: usize = 256;

/// Byte channel used by the controller.
pub trait Transport {
    /// Returns true while the channel is usable.
    fn is_open(&self) -> bool;

    /// Returns every byte received since the last call, or `None` if nothing
    /// arrived. Never blocks.
    fn read_available(&mut self) -> Option<Vec<u8>>;

    /// Queues bytes for transmission without waiting for delivery.
    fn write(&mut self, data: &[u8]) -> Result<()>;
}

struct Channel {
    incoming: UnboundedReceiver<Vec<u8>>,
    outgoing: UnboundedSender<Vec<u8>>,
    writer: JoinHandle<()>,
}

/// Serial link to a single device.
pub struct SerialLink {
    port_path: String,
    channel: Option<Channel>,
}

impl SerialLink {
    /// Opens the serial port (8N1) and starts the I/O tasks.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn open(port_path: &str, baud_rate: u32) -> Result<Self> {
        let port = tokio_serial::new(port_path, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .open_native_async()
            .map_err(|e| {
                if let tokio_serial::ErrorKind::Io(kind) = &e.kind {
                    if *kind == std::io::ErrorKind::NotFound
                        && !std::path::Path::new(port_path).exists()
                    {
                        return Error::DeviceNotFound(port_path.to_string());
                    }
                }
                if e.kind == tokio_serial::ErrorKind::NoDevice {
                    return Error::DeviceNotFound(port_path.to_string());
                }
                Error::Serial(e)
            })?;

        info!("Connected to {} at {} baud", port_path, baud_rate);
        Ok(Self::from_stream(port_path, port))
    }

    /// Wraps an already open byte stream.
    pub fn from_stream<S>(name: &str, stream: S) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = tokio::io::split(stream);
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let (out_tx, out_rx) = mpsc::unbounded_channel();

        tokio::spawn(read_loop(name.to_string(), reader, in_tx));
        let writer = tokio::spawn(write_loop(name.to_string(), writer, out_rx));

        Self {
            port_path: name.to_string(),
            channel: Some(Channel {
                incoming: in_rx,
                outgoing: out_tx,
                writer,
            }),
        }
    }

    /// Creates a link with no device behind it.
    pub fn disconnected(port_path: &str) -> Self {
        Self {
            port_path: port_path.to_string(),
            channel: None,
        }
    }

    /// Returns the port path.
    pub fn port_path(&self) -> &str {
        &self.port_path
    }

    /// Waits until every queued write reached the port, then closes the link.
    pub async fn shutdown(mut self) {
        if let Some(channel) = self.channel.take() {
            let Channel {
                outgoing, writer, ..
            } = channel;
            drop(outgoing);
            if let Err(e) = writer.await {
                warn!("Serial writer for {} failed: {}", self.port_path, e);
            }
            debug!("Serial link {} closed", self.port_path);
        }
    }

    fn close(&mut self) {
        if self.channel.take().is_some() {
            warn!("Serial link {} lost, running disconnected", self.port_path);
        }
    }
}

impl Transport for SerialLink {
    fn is_open(&self) -> bool {
        self.channel.is_some()
    }

    fn read_available(&mut self) -> Option<Vec<u8>> {
        let channel = self.channel.as_mut()?;
        let mut data = Vec::new();
        let mut closed = false;

        loop {
            match channel.incoming.try_recv() {
                Ok(chunk) => data.extend_from_slice(&chunk),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    closed = true;
                    break;
                }
            }
        }

        if closed {
            self.close();
        }

        if data.is_empty() {
            None
        } else {
            Some(data)
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        let channel = self.channel.as_ref().ok_or(Error::Disconnected)?;
        if channel.outgoing.send(data.to_vec()).is_err() {
            self.close();
            return Err(Error::Disconnected);
        }
        Ok(())
    }
}

async fn read_loop<R>(port: String, mut reader: R, tx: UnboundedSender<Vec<u8>>)
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; READ_CHUNK];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => {
                warn!("Serial port {} closed", port);
                break;
            }
            Ok(n) => {
                if tx.send(buf[..n].to_vec()).is_err() {
                    break;
                }
            }
            Err(e) => {
                warn!("Serial read error on {}: {}", port, e);
                break;
            }
        }
    }
}

async fn write_loop<W>(port: String, mut writer: W, mut rx: UnboundedReceiver<Vec<u8>>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(data) = rx.recv().await {
        if let Err(e) = write_chunk(&mut writer, &data).await {
            warn!("Serial write error on {}: {}", port, e);
            break;
        }
        debug!("Sent {} bytes to {}", data.len(), port);
    }
    let _ = writer.shutdown().await;
}

async fn write_chunk<W>(writer: &mut W, data: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(data).await?;
    writer.flush().await
}
