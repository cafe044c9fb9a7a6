//! Networking primitives.
//!
//! One TCP stream per client carrying newline-delimited UTF-8. The read and
//! write halves are wrapped separately so a session can read commands and
//! receive frames from different tasks.

use std::net::SocketAddr;

use anyhow::Context;
use bytes::Bytes;
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
};
use tracing::debug;

/// Result of reading one inbound line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A complete line without its terminator.
    Line(String),
    /// An over-long or non-UTF-8 line was skipped.
    Discarded,
    /// The peer closed the stream.
    Closed,
}

/// Reads newline-terminated lines with a length cap.
///
/// `recv_line` is cancel safe: bytes of a line cut short by a timeout or
/// `select!` stay buffered and the next call picks up where it stopped.
#[derive(Debug)]
pub struct LineReader<R> {
    inner: BufReader<R>,
    buf: Vec<u8>,
    max_len: usize,
    skipping: bool,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    pub fn new(inner: R, max_len: usize) -> Self {
        Self {
            inner: BufReader::new(inner),
            buf: Vec::new(),
            max_len,
            skipping: false,
        }
    }

    /// Reads the next line.
    ///
    /// A trailing fragment without newline at EOF is dropped; only complete
    /// lines are ever returned.
    pub async fn recv_line(&mut self) -> anyhow::Result<Inbound> {
        if self.skipping {
            return self.skip_rest().await;
        }

        let limit = (self.max_len as u64 + 1).saturating_sub(self.buf.len() as u64);
        let n = (&mut self.inner)
            .take(limit)
            .read_until(b'\n', &mut self.buf)
            .await
            .context("tcp read line")?;

        if self.buf.last() != Some(&b'\n') {
            let overlong = n > 0 && self.buf.len() > self.max_len;
            self.buf.clear();
            if overlong {
                self.skipping = true;
                return self.skip_rest().await;
            }
            // EOF, possibly in the middle of a line.
            return Ok(Inbound::Closed);
        }

        let mut line = std::mem::take(&mut self.buf);
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }

        match String::from_utf8(line) {
            Ok(s) => Ok(Inbound::Line(s)),
            Err(_) => Ok(Inbound::Discarded),
        }
    }

    async fn skip_rest(&mut self) -> anyhow::Result<Inbound> {
        loop {
            self.buf.clear();
            let n = (&mut self.inner)
                .take(self.max_len as u64)
                .read_until(b'\n', &mut self.buf)
                .await
                .context("tcp skip line")?;
            if n == 0 {
                self.skipping = false;
                return Ok(Inbound::Closed);
            }
            if self.buf.last() == Some(&b'\n') {
                self.buf.clear();
                self.skipping = false;
                return Ok(Inbound::Discarded);
            }
        }
    }
}

/// Writes lines and pre-encoded frames.
#[derive(Debug)]
pub struct LineWriter<W> {
    inner: W,
}

impl<W: AsyncWrite + Unpin> LineWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub async fn send_line(&mut self, line: &str) -> anyhow::Result<()> {
        let mut payload = Vec::with_capacity(line.len() + 1);
        payload.extend_from_slice(line.as_bytes());
        payload.push(b'\n');
        self.inner.write_all(&payload).await.context("tcp write")?;
        Ok(())
    }

    /// Writes an already newline-terminated frame.
    pub async fn send_frame(&mut self, frame: &Bytes) -> anyhow::Result<()> {
        self.inner.write_all(frame).await.context("tcp write")?;
        Ok(())
    }

    pub async fn flush(&mut self) -> anyhow::Result<()> {
        self.inner.flush().await.context("tcp flush")?;
        Ok(())
    }
}

/// Splits a stream into a line reader and a line writer.
pub fn split_stream(
    stream: TcpStream,
    max_line_len: usize,
) -> (
    LineReader<tokio::net::tcp::OwnedReadHalf>,
    LineWriter<tokio::net::tcp::OwnedWriteHalf>,
) {
    let (read, write) = stream.into_split();
    (LineReader::new(read, max_line_len), LineWriter::new(write))
}

/// TCP server listener.
pub struct LineListener {
    listener: TcpListener,
}

impl LineListener {
    pub async fn bind(addr: SocketAddr) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr).await.context("tcp bind")?;
        debug!(requested = %addr, "Listener bound");
        Ok(Self { listener })
    }

    pub async fn accept(&self) -> anyhow::Result<(TcpStream, SocketAddr)> {
        let (stream, addr) = self.listener.accept().await.context("tcp accept")?;
        stream.set_nodelay(true).context("tcp nodelay")?;
        Ok((stream, addr))
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn lines_of(input: &'static [u8], max_len: usize) -> Vec<Inbound> {
        let mut reader = LineReader::new(input, max_len);
        let mut out = Vec::new();
        loop {
            let next = reader.recv_line().await.unwrap();
            let done = next == Inbound::Closed;
            out.push(next);
            if done {
                return out;
            }
        }
    }

    #[tokio::test]
    async fn reads_complete_lines_and_strips_terminators() {
        let got = lines_of(b"Ace\r\n{\"fire\":\"main\"}\n", 64).await;
        assert_eq!(
            got,
            vec![
                Inbound::Line("Ace".into()),
                Inbound::Line("{\"fire\":\"main\"}".into()),
                Inbound::Closed,
            ]
        );
    }

    #[tokio::test]
    async fn overlong_line_is_skipped_and_reading_resumes() {
        let got = lines_of(b"0123456789abcdef\nok\n", 8).await;
        assert_eq!(
            got,
            vec![Inbound::Discarded, Inbound::Line("ok".into()), Inbound::Closed]
        );
    }

    #[tokio::test]
    async fn line_at_exact_cap_is_accepted() {
        let got = lines_of(b"12345678\n", 8).await;
        assert_eq!(got, vec![Inbound::Line("12345678".into()), Inbound::Closed]);
    }

    #[tokio::test]
    async fn invalid_utf8_is_discarded() {
        let got = lines_of(b"\xff\xfe\nfine\n", 64).await;
        assert_eq!(
            got,
            vec![Inbound::Discarded, Inbound::Line("fine".into()), Inbound::Closed]
        );
    }

    #[tokio::test]
    async fn partial_trailing_line_is_dropped() {
        let got = lines_of(b"whole\nhal", 64).await;
        assert_eq!(got, vec![Inbound::Line("whole".into()), Inbound::Closed]);
    }

    #[tokio::test]
    async fn timed_out_read_keeps_partial_line() {
        let (mut tx, rx) = tokio::io::duplex(64);
        let mut reader = LineReader::new(rx, 64);

        tx.write_all(b"hel").await.unwrap();
        let cut = tokio::time::timeout(std::time::Duration::from_millis(20), reader.recv_line()).await;
        assert!(cut.is_err());

        tx.write_all(b"lo\n").await.unwrap();
        assert_eq!(reader.recv_line().await.unwrap(), Inbound::Line("hello".into()));
    }

    #[tokio::test]
    async fn writer_terminates_lines() {
        let mut out = Vec::new();
        {
            let mut writer = LineWriter::new(&mut out);
            writer.send_line("7").await.unwrap();
            writer.send_frame(&Bytes::from_static(b"{}\n")).await.unwrap();
        }
        assert_eq!(out, b"7\n{}\n");
    }
}
