use crate::handler::{ServerState, Session, error_response, handle_request};
use anyhow::Result;
use futures_util::{SinkExt, StreamExt};
use parley::protocol::{MAX_LINE_BYTES, Request, Response};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};
use tracing::{debug, info};

/// Per-connection event buffer. Events beyond this are dropped for the
/// connection (delivery is best effort).
const EVENT_BUFFER: usize = 256;

/// Accept client connections and process requests until the listener fails.
pub async fn serve(state: Arc<ServerState>, listener: TcpListener) -> Result<()> {
    info!(addr = %listener.local_addr()?, "listening");

    loop {
        let (stream, peer) = listener.accept().await?;
        let state = state.clone();
        tokio::spawn(async move {
            debug!(%peer, "client connected");
            if let Err(e) = handle_client(state, stream).await {
                debug!(%peer, err = %e, "client disconnected");
            }
        });
    }
}

async fn handle_client(state: Arc<ServerState>, stream: TcpStream) -> Result<()> {
    let (r, w) = stream.into_split();
    let mut reader = FramedRead::new(r, LinesCodec::new_with_max_length(MAX_LINE_BYTES));
    let mut writer = FramedWrite::new(w, LinesCodec::new_with_max_length(MAX_LINE_BYTES));

    let hello = Response::Hello {
        version: env!("CARGO_PKG_VERSION").to_string(),
    };
    writer.send(serde_json::to_string(&hello)?).await?;

    // Events for this connection funnel through one channel so request
    // responses and pushed events never interleave mid-frame.
    let (tx, mut rx) = mpsc::channel::<Response>(EVENT_BUFFER);
    let mut session = Session::default();

    let result = connection_loop(&state, &mut session, &tx, &mut rx, &mut reader, &mut writer).await;

    // Runs on every exit path, including write errors. A stale epoch means
    // the identity reconnected elsewhere and the entry is no longer ours.
    if let (Some(user_id), Some(epoch)) = (&session.user_id, session.presence_epoch) {
        if state.presence.unregister(user_id, epoch) {
            info!(user = %user_id, "went offline");
        }
    }

    result
}

async fn connection_loop(
    state: &Arc<ServerState>,
    session: &mut Session,
    tx: &mpsc::Sender<Response>,
    rx: &mut mpsc::Receiver<Response>,
    reader: &mut FramedRead<tokio::net::tcp::OwnedReadHalf, LinesCodec>,
    writer: &mut FramedWrite<tokio::net::tcp::OwnedWriteHalf, LinesCodec>,
) -> Result<()> {
    loop {
        tokio::select! {
            line = reader.next() => {
                let Some(line) = line else { break };
                let line = line?;
                let resp = match serde_json::from_str::<Request>(&line) {
                    Ok(req) => handle_request(state, session, tx, req).await,
                    Err(e) => error_response("invalid_request", &format!("bad request: {e}")),
                };
                writer.send(serde_json::to_string(&resp)?).await?;
            }
            event = rx.recv() => {
                // The sender side lives in this task and the presence map;
                // recv only fails once both are gone.
                let Some(event) = event else { break };
                writer.send(serde_json::to_string(&event)?).await?;
            }
        }
    }
    Ok(())
}
