use crate::protocol::{MAX_LINE_BYTES, Request, Response};
use anyhow::{Context, Result, anyhow, bail};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};

/// Client for the parley server's JSON-lines TCP protocol.
pub struct ServerClient {
    reader: FramedRead<tokio::net::tcp::OwnedReadHalf, LinesCodec>,
    writer: FramedWrite<tokio::net::tcp::OwnedWriteHalf, LinesCodec>,
    server_version: String,
}

impl ServerClient {
    /// Connect to the server at the given address.
    /// Waits for the Hello response before returning.
    pub async fn connect(addr: &str) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .with_context(|| format!("failed to connect to {addr}"))?;
        let (r, w) = stream.into_split();
        let reader = FramedRead::new(r, LinesCodec::new_with_max_length(MAX_LINE_BYTES));
        let writer = FramedWrite::new(w, LinesCodec::new_with_max_length(MAX_LINE_BYTES));

        let mut client = Self {
            reader,
            writer,
            server_version: String::new(),
        };

        match client.next_response().await? {
            Response::Hello { version } => {
                client.server_version = version;
                Ok(client)
            }
            other => Err(anyhow!("expected Hello, got {other:?}")),
        }
    }

    /// The server version received in the Hello handshake.
    pub fn server_version(&self) -> &str {
        &self.server_version
    }

    /// Send a request to the server.
    pub async fn send(&mut self, req: Request) -> Result<()> {
        let line = serde_json::to_string(&req)?;
        self.writer.send(line).await?;
        Ok(())
    }

    /// Read the next response (or pushed event) from the server.
    pub async fn next_response(&mut self) -> Result<Response> {
        let Some(line) = self.reader.next().await else {
            bail!("server disconnected");
        };
        Ok(serde_json::from_str(&line?)?)
    }

    /// Send a request and wait for the Ok/Error response, skipping events.
    /// Errors carry the wire code so callers can match on it.
    pub async fn request(&mut self, req: Request) -> Result<Option<serde_json::Value>> {
        self.send(req).await?;
        loop {
            match self.next_response().await? {
                Response::Hello { .. } | Response::Event { .. } => continue,
                Response::Ok { data } => return Ok(data),
                Response::Error { code, message } => bail!("{code}: {message}"),
            }
        }
    }
}
