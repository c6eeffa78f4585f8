//! Client library for the LCD clock daemon's message sockets.
//!
//! The daemon listens on two Unix stream sockets, one per message slot. A
//! client connects, waits for the prompt, sends one line and closes. Closing
//! without sending clears the slot.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tracing::{debug, warn};

/// Default socket of the first message slot.
pub const PRIMARY_SOCKET: &str = "/tmp/clock.sock";

/// Default socket of the second message slot.
pub const SECONDARY_SOCKET: &str = "/tmp/clock2.sock";

/// Longest line the daemon keeps; anything after is cut off.
pub const MAX_LINE_BYTES: usize = 499;

/// Longest prompt accepted before giving up on the peer.
const MAX_PROMPT_BYTES: usize = 256;

/// Message slot selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Slot {
    /// Shown first.
    #[default]
    Primary,
    /// Shown after the primary slot.
    Secondary,
}

impl Slot {
    /// Socket path the daemon uses for this slot by default.
    pub fn default_socket(self) -> &'static str {
        match self {
            Slot::Primary => PRIMARY_SOCKET,
            Slot::Secondary => SECONDARY_SOCKET,
        }
    }
}

/// Client for one message socket.
#[derive(Debug, Clone)]
pub struct MessageClient {
    path: PathBuf,
    timeout: Duration,
}

impl MessageClient {
    /// Creates a client for the socket at `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            timeout: Duration::from_secs(5),
        }
    }

    /// Creates a client for a slot's default socket.
    pub fn for_slot(slot: Slot) -> Self {
        Self::new(slot.default_socket())
    }

    /// Sets how long to wait for the daemon at each step.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replaces the slot's text with `text`.
    ///
    /// The text must be a single line. Lines longer than [`MAX_LINE_BYTES`]
    /// are accepted but the daemon only keeps the start.
    pub async fn send(&self, text: &str) -> Result<()> {
        if text.contains(['\r', '\n']) {
            bail!("Message must be a single line");
        }
        if text.len() > MAX_LINE_BYTES {
            warn!(
                "Message is {} bytes, only the first {} will be shown",
                text.len(),
                MAX_LINE_BYTES
            );
        }

        let mut stream = self.connect().await?;
        let mut line = Vec::with_capacity(text.len() + 1);
        line.extend_from_slice(text.as_bytes());
        line.push(b'\n');
        tokio::time::timeout(self.timeout, stream.write_all(&line))
            .await
            .context("Timed out sending message")?
            .context("Failed to send message")?;
        stream.shutdown().await.context("Failed to close socket")?;
        debug!("Sent {} bytes to {}", line.len(), self.path.display());
        Ok(())
    }

    /// Empties the slot.
    pub async fn clear(&self) -> Result<()> {
        let mut stream = self.connect().await?;
        stream.shutdown().await.context("Failed to close socket")?;
        debug!("Cleared {}", self.path.display());
        Ok(())
    }

    /// Connects and waits for the daemon's prompt.
    async fn connect(&self) -> Result<UnixStream> {
        let mut stream = tokio::time::timeout(self.timeout, UnixStream::connect(&self.path))
            .await
            .with_context(|| format!("Timed out connecting to {}", self.path.display()))?
            .with_context(|| {
                format!(
                    "Failed to connect to {}. Is lcdclockd running?",
                    self.path.display()
                )
            })?;

        let prompt = tokio::time::timeout(self.timeout, read_prompt(&mut stream))
            .await
            .context("Timed out waiting for prompt")??;
        debug!("Prompt: {}", String::from_utf8_lossy(&prompt).trim_end());
        Ok(stream)
    }
}

/// Reads up to and including the first newline.
async fn read_prompt(stream: &mut UnixStream) -> Result<Vec<u8>> {
    let mut prompt = Vec::new();
    let mut chunk = [0u8; 64];
    while !prompt.contains(&b'\n') {
        let n = stream
            .read(&mut chunk)
            .await
            .context("Failed to read prompt")?;
        if n == 0 {
            bail!("Connection closed before prompt");
        }
        prompt.extend_from_slice(&chunk[..n]);
        if prompt.len() > MAX_PROMPT_BYTES {
            bail!("Prompt too long, is this a clock socket?");
        }
    }
    Ok(prompt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::UnixListener;

    const PROMPT: &[u8] = b"send a one line message:\r\n";

    /// Accepts one client, prompts it and returns everything it sent.
    fn serve_once(
        listener: UnixListener,
        prompt: &'static [u8],
    ) -> tokio::task::JoinHandle<Vec<u8>> {
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            stream.write_all(prompt).await.unwrap();
            let mut received = Vec::new();
            stream.read_to_end(&mut received).await.unwrap();
            received
        })
    }

    #[tokio::test]
    async fn test_send_writes_one_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clock.sock");
        let server = serve_once(UnixListener::bind(&path).unwrap(), PROMPT);

        MessageClient::new(&path).send("hello 世界").await.unwrap();
        assert_eq!(server.await.unwrap(), "hello 世界\n".as_bytes());
    }

    #[tokio::test]
    async fn test_clear_sends_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clock2.sock");
        let server = serve_once(UnixListener::bind(&path).unwrap(), PROMPT);

        MessageClient::new(&path).clear().await.unwrap();
        assert!(server.await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_prompt_split_across_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clock.sock");
        let listener = UnixListener::bind(&path).unwrap();
        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            stream.write_all(b"send a one").await.unwrap();
            tokio::time::sleep(Duration::from_millis(20)).await;
            stream.write_all(b" line message:\r\n").await.unwrap();
            let mut received = Vec::new();
            stream.read_to_end(&mut received).await.unwrap();
            received
        });

        MessageClient::new(&path).send("x").await.unwrap();
        assert_eq!(server.await.unwrap(), b"x\n");
    }

    #[tokio::test]
    async fn test_multiline_rejected() {
        let client = MessageClient::new("/nonexistent/clock.sock");
        let err = client.send("a\nb").await.unwrap_err();
        assert!(err.to_string().contains("single line"));
    }

    #[tokio::test]
    async fn test_missing_socket_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let client = MessageClient::new(dir.path().join("absent.sock"));
        assert!(client.clear().await.is_err());
    }

    #[tokio::test]
    async fn test_silent_server_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clock.sock");
        let _listener = UnixListener::bind(&path).unwrap();

        let client = MessageClient::new(&path).with_timeout(Duration::from_millis(50));
        let err = client.send("late").await.unwrap_err();
        assert!(err.to_string().contains("Timed out"));
    }

    #[test]
    fn test_slot_sockets() {
        assert_eq!(Slot::default(), Slot::Primary);
        assert_eq!(MessageClient::for_slot(Slot::Primary).path(), Path::new(PRIMARY_SOCKET));
        assert_eq!(Slot::Secondary.default_socket(), SECONDARY_SOCKET);
    }
}
