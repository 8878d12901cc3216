//! A framed TCP connection shared by peer links and the coordinator client.

use crate::error::MeshError;
use palimpsest_wire::{read_frame, write_frame};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::BufReader;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

/// Owned halves of one TCP stream, framed as JSON lines.
///
/// Held behind a `tokio::sync::Mutex` by its owner so that one
/// request/response exchange completes before the next begins.
pub(crate) struct Framed {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Framed {
    pub(crate) async fn dial(addr: &str) -> Result<Self, MeshError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(read_half),
            writer: write_half,
        })
    }

    /// One request/response exchange.
    pub(crate) async fn call<Req, Resp>(&mut self, request: &Req) -> Result<Resp, MeshError>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        write_frame(&mut self.writer, request).await?;
        Ok(read_frame(&mut self.reader).await?)
    }
}
