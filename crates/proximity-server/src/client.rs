// crates/proximity-server/src/client.rs

//! Per-connection I/O.
//!
//! Each socket gets one task running [`run_client`]:
//! 1. detect the wire format from the first byte,
//! 2. spawn a writer that drains the outbound channel,
//! 3. run the auth handshake (nothing reaches the hub before it passes),
//! 4. forward every parsed request to the hub,
//! 5. on EOF or error, ask the hub to evict the connection.

use anyhow::{bail, Result};
use bytes::{Buf, BytesMut};
use proximity_core::ConnectionId;
use proximity_protocol::wire_types::MAX_LINE_LEN;
use proximity_protocol::{ClientRequest, ServerFrame, WireFormat};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::directory::{SharedDirectory, UserDirectory};
use crate::types::{HubRequest, HubTx, OutboundRx, OutboundTx};

/// Run the client I/O loop for a single connection.
pub async fn run_client(
    conn: ConnectionId,
    stream: TcpStream,
    hub_tx: HubTx,
    directory: SharedDirectory,
) -> Result<()> {
    // Try to detect protocol by peeking at first byte
    let mut first_byte = [0u8; 1];
    let format = match stream.peek(&mut first_byte).await {
        Ok(0) => {
            debug!(%conn, "closed before sending anything");
            return Ok(());
        }
        Ok(_) => WireFormat::detect(first_byte[0]),
        Err(e) => return Err(e.into()),
    };
    debug!(%conn, ?format, "wire format detected");

    let (read_stream, write_stream) = stream.into_split();

    // Writer task: consume ServerFrames and write lines
    let (out_tx, out_rx): (OutboundTx, OutboundRx) = mpsc::unbounded_channel();
    let writer = tokio::spawn(run_writer(conn, format, write_stream, out_rx));

    let mut lines = LineReader::new(read_stream);

    let admitted = handshake(conn, format, &mut lines, &out_tx, &hub_tx, &directory).await;
    let was_admitted = matches!(admitted, Ok(true));
    let result = match admitted {
        Ok(true) => run_reader(conn, format, &mut lines, &out_tx, &hub_tx).await,
        Ok(false) => Ok(()),
        Err(e) => Err(e),
    };

    if was_admitted && hub_tx.send(HubRequest::Evict { conn }).is_err() {
        error!(%conn, "hub channel closed before evict");
    }

    // The hub holds the other sender; once it evicts us the writer drains
    // what is queued and stops.
    drop(out_tx);
    if let Err(e) = writer.await {
        error!(%conn, error = %e, "writer task failed");
    }

    result
}

/// Authenticate the first frame and hand the connection to the hub.
///
/// Returns `Ok(false)` when the client was refused (an error frame has
/// already been queued).
async fn handshake(
    conn: ConnectionId,
    format: WireFormat,
    lines: &mut LineReader,
    out_tx: &OutboundTx,
    hub_tx: &HubTx,
    directory: &SharedDirectory,
) -> Result<bool> {
    let Some(line) = lines.next_line().await? else {
        debug!(%conn, "disconnected during handshake");
        return Ok(false);
    };

    let frame = match format.parse_input_line(&line) {
        Ok(frame) => frame,
        Err(e) => {
            warn!(%conn, error = %e, "unreadable handshake");
            let _ = out_tx.send(ServerFrame::error(None, e.to_string()));
            return Ok(false);
        }
    };

    let ClientRequest::Auth { token } = frame.request else {
        warn!(%conn, "first frame was not auth");
        let _ = out_tx.send(ServerFrame::error(frame.ack, "authenticate first"));
        return Ok(false);
    };

    let user = match directory.authorize(&token) {
        Ok(user) => user,
        Err(e) => {
            warn!(%conn, error = %e, "authorization failed");
            let _ = out_tx.send(ServerFrame::error(frame.ack, e.to_string()));
            return Ok(false);
        }
    };
    info!(%conn, %user, "user authenticated");

    let Some(profile) = directory.profile(&user) else {
        warn!(%conn, %user, "profile missing");
        let _ = out_tx.send(ServerFrame::error(
            frame.ack,
            "User profile is invalid or has not been created!",
        ));
        return Ok(false);
    };

    let admit = HubRequest::Admit {
        conn,
        ack: frame.ack,
        user,
        profile,
        outbound: out_tx.clone(),
    };
    if hub_tx.send(admit).is_err() {
        bail!("hub channel closed");
    }
    Ok(true)
}

/// Forward requests to the hub until the socket closes.
async fn run_reader(
    conn: ConnectionId,
    format: WireFormat,
    lines: &mut LineReader,
    out_tx: &OutboundTx,
    hub_tx: &HubTx,
) -> Result<()> {
    while let Some(line) = lines.next_line().await? {
        debug!(%conn, %line, "received");

        match format.parse_input_line(&line) {
            Ok(frame) => {
                let req = HubRequest::Request {
                    conn,
                    ack: frame.ack,
                    request: frame.request,
                };
                if hub_tx.send(req).is_err() {
                    bail!("hub channel closed");
                }
            }
            Err(e) => {
                warn!(%conn, error = %e, "invalid frame");
                let _ = out_tx.send(ServerFrame::error(None, e.to_string()));
            }
        }
    }

    info!(%conn, "client disconnected");
    Ok(())
}

async fn run_writer(
    conn: ConnectionId,
    format: WireFormat,
    mut write_stream: OwnedWriteHalf,
    mut out_rx: OutboundRx,
) {
    while let Some(frame) = out_rx.recv().await {
        let mut line = format.format_output(&frame);
        line.push('\n');

        if let Err(e) = write_stream.write_all(line.as_bytes()).await {
            error!(%conn, error = %e, "write failed");
            break;
        }
        debug!(%conn, line = line.trim_end(), "sent");
    }

    let _ = write_stream.shutdown().await;
}

/// Newline-delimited reader with a hard line length cap.
struct LineReader {
    read_stream: OwnedReadHalf,
    buffer: BytesMut,
}

impl LineReader {
    fn new(read_stream: OwnedReadHalf) -> Self {
        LineReader {
            read_stream,
            buffer: BytesMut::with_capacity(4096),
        }
    }

    /// Next non-blank line, or `None` on EOF.
    async fn next_line(&mut self) -> Result<Option<String>> {
        loop {
            if let Some(line) = take_line(&mut self.buffer)? {
                if line.is_empty() {
                    continue;
                }
                return Ok(Some(line));
            }

            if self.read_stream.read_buf(&mut self.buffer).await? == 0 {
                // EOF: a trailing unterminated line is discarded
                return Ok(None);
            }
        }
    }
}

/// Split the first complete line off `buffer`, trimmed.
///
/// Fails once a line is longer than `MAX_LINE_LEN`, whether or not its
/// newline has arrived yet.
fn take_line(buffer: &mut BytesMut) -> Result<Option<String>> {
    match buffer.iter().position(|&b| b == b'\n') {
        Some(newline_pos) if newline_pos > MAX_LINE_LEN => {
            bail!("line exceeds {} bytes", MAX_LINE_LEN)
        }
        Some(newline_pos) => {
            let line = buffer.split_to(newline_pos);
            buffer.advance(1);
            Ok(Some(String::from_utf8_lossy(&line).trim().to_string()))
        }
        None if buffer.len() > MAX_LINE_LEN => bail!("line exceeds {} bytes", MAX_LINE_LEN),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_complete_lines_only() {
        let mut buf = BytesMut::from(&b"P\r\n  \nL, 1, 2\npartial"[..]);

        assert_eq!(take_line(&mut buf).unwrap().as_deref(), Some("P"));
        assert_eq!(take_line(&mut buf).unwrap().as_deref(), Some(""));
        assert_eq!(take_line(&mut buf).unwrap().as_deref(), Some("L, 1, 2"));
        assert_eq!(take_line(&mut buf).unwrap(), None);
        assert_eq!(&buf[..], b"partial");
    }

    #[test]
    fn oversized_line_with_newline_is_rejected() {
        let mut line = vec![b'x'; MAX_LINE_LEN + 1];
        line.push(b'\n');
        let mut buf = BytesMut::from(&line[..]);

        assert!(take_line(&mut buf).is_err());
    }

    #[test]
    fn oversized_partial_line_is_rejected() {
        let mut buf = BytesMut::from(&vec![b'x'; MAX_LINE_LEN + 1][..]);
        assert!(take_line(&mut buf).is_err());
    }

    #[test]
    fn line_at_the_limit_is_accepted() {
        let mut line = vec![b'x'; MAX_LINE_LEN];
        line.push(b'\n');
        let mut buf = BytesMut::from(&line[..]);

        let taken = take_line(&mut buf).unwrap().unwrap();
        assert_eq!(taken.len(), MAX_LINE_LEN);
        assert!(buf.is_empty());
    }
}
