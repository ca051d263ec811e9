//! Connections to the spatial audio renderer.

use crate::error::RendererError;
use crate::ssr_message::SsrRequest;
use log::{debug, info};
use std::io::Write;
use std::net::TcpStream;
use std::time::Duration;

/// Something that accepts renderer messages, one at a time.
///
/// Implementations do not retry; a failed message is reported to the caller
/// and the next message is attempted independently.
pub trait RendererConnection: Send {
    /// Delivers one message, which must not carry its own terminator.
    fn send(&mut self, message: &str) -> Result<(), RendererError>;

    /// Encodes and delivers one request.
    fn send_request(&mut self, request: &SsrRequest) -> Result<(), RendererError> {
        self.send(&request.encode())
    }
}

impl<R: RendererConnection + ?Sized> RendererConnection for Box<R> {
    fn send(&mut self, message: &str) -> Result<(), RendererError> {
        (**self).send(message)
    }
}

/// A persistent connection to an SSR network interface. Every message is
/// followed by the terminator and written in one go.
pub struct SsrClient<W: Write = TcpStream> {
    writer: W,
    terminator: Vec<u8>,
    name: String,
}

impl SsrClient<TcpStream> {
    /// Opens a TCP connection to the renderer at `addr` (`host:port`).
    ///
    /// With a `write_timeout`, a renderer that stops reading fails the
    /// message instead of stalling the bridge.
    pub fn connect(
        addr: &str,
        terminator: &str,
        write_timeout: Option<Duration>,
    ) -> Result<Self, RendererError> {
        let stream = TcpStream::connect(addr).map_err(|error| RendererError::Connect {
            addr: addr.to_owned(),
            error,
        })?;
        // Messages are tiny and latency matters more than throughput.
        stream.set_nodelay(true)?;
        stream.set_write_timeout(write_timeout)?;
        info!("Connected to renderer at {}", addr);
        Ok(Self::from_writer(stream, terminator, addr))
    }
}

impl<W: Write> SsrClient<W> {
    /// Wraps any writer; `name` only shows up in logs.
    pub fn from_writer(writer: W, terminator: &str, name: &str) -> Self {
        Self {
            writer,
            terminator: terminator.as_bytes().to_vec(),
            name: name.to_owned(),
        }
    }

    /// The underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.writer
    }
}

impl<W: Write + Send> RendererConnection for SsrClient<W> {
    fn send(&mut self, message: &str) -> Result<(), RendererError> {
        let mut buf = Vec::with_capacity(message.len() + self.terminator.len());
        buf.extend_from_slice(message.as_bytes());
        buf.extend_from_slice(&self.terminator);
        self.writer.write_all(&buf)?;
        self.writer.flush()?;
        debug!("{} <- {}", self.name, message);
        Ok(())
    }
}

impl<W: Write> Drop for SsrClient<W> {
    fn drop(&mut self) {
        info!("Connection to renderer {} closed", self.name);
    }
}

/// A renderer that only logs what it would have sent. Handy for trying out
/// a tracking setup without a renderer running.
#[derive(Debug, Default)]
pub struct DryRun {
    name: String,
    sent: usize,
}

impl DryRun {
    #[allow(missing_docs)]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            sent: 0,
        }
    }

    /// How many messages went through this renderer.
    pub fn sent(&self) -> usize {
        self.sent
    }
}

impl RendererConnection for DryRun {
    fn send(&mut self, message: &str) -> Result<(), RendererError> {
        self.sent += 1;
        info!("{} <- {}", self.name, message);
        Ok(())
    }
}
