//! Message line contents and the Unix sockets that set them.
//!
//! Each socket owns one slot. A client connects, receives a prompt, sends
//! one line and is disconnected. The displayed message is the first slot
//! followed by the second.

use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, info, warn};

use crate::rendering::ScrollCursor;

/// Sent to every client on connect.
pub const PROMPT: &[u8] = b"send a one line message:\r\n";

/// Longest line accepted for one slot.
pub const MAX_SLOT_BYTES: usize = 499;

/// Longest message shown.
pub const MAX_MESSAGE_BYTES: usize = 1023;

/// Which half of the message a socket sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Primary,
    Secondary,
}

impl Slot {
    fn index(self) -> usize {
        match self {
            Slot::Primary => 0,
            Slot::Secondary => 1,
        }
    }
}

/// The message bytes and the scroll position within them.
pub struct MessageBoard {
    text: Vec<u8>,
    slots: [Vec<u8>; 2],
    cursor: ScrollCursor,
}

impl MessageBoard {
    /// Starts with `initial` shown until a slot is set.
    pub fn new(initial: &[u8]) -> Self {
        let mut text = until_nul(initial).to_vec();
        text.truncate(MAX_MESSAGE_BYTES);
        Self {
            text,
            slots: [Vec::new(), Vec::new()],
            cursor: ScrollCursor::default(),
        }
    }

    pub fn text(&self) -> &[u8] {
        &self.text
    }

    pub fn cursor(&self) -> ScrollCursor {
        self.cursor
    }

    /// Replaces one slot and restarts scrolling from the beginning.
    ///
    /// The line ends at its first NUL, is cut to [`MAX_SLOT_BYTES`] and
    /// loses any trailing line endings.
    pub fn replace(&mut self, slot: Slot, line: &[u8]) {
        let line = until_nul(line);
        let mut line = &line[..line.len().min(MAX_SLOT_BYTES)];
        while let Some((b'\r' | b'\n', rest)) = line.split_last() {
            line = rest;
        }

        self.slots[slot.index()] = line.to_vec();
        self.text.clear();
        for part in &self.slots {
            self.text.extend_from_slice(part);
        }
        self.text.truncate(MAX_MESSAGE_BYTES);
        self.cursor.reset();
        debug!(
            "Message {:?} set: {}",
            slot,
            String::from_utf8_lossy(&self.slots[slot.index()])
        );
    }

    /// Moves the scroll cursor on after a frame.
    pub fn advance(&mut self, wrap_ready: bool, increment: i32) {
        self.cursor.advance(&self.text, wrap_ready, increment);
    }
}

/// The bytes before the first NUL.
fn until_nul(bytes: &[u8]) -> &[u8] {
    match bytes.iter().position(|&b| b == 0) {
        Some(end) => &bytes[..end],
        None => bytes,
    }
}

/// A listening message socket. The socket file is removed on drop.
pub struct MessageListener {
    listener: UnixListener,
    path: PathBuf,
    slot: Slot,
}

impl MessageListener {
    /// Binds `path`, replacing any stale socket file, and applies `mode`.
    pub fn bind(path: impl AsRef<Path>, slot: Slot, mode: u32) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        match std::fs::remove_file(&path) {
            Ok(()) => debug!("Removed stale socket {}", path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to remove {}", path.display()))
            }
        }

        let listener = UnixListener::bind(&path)
            .with_context(|| format!("Failed to bind message socket {}", path.display()))?;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode))
            .with_context(|| format!("Failed to set mode of {}", path.display()))?;

        info!("Message socket listening on {} ({:?})", path.display(), slot);
        Ok(Self {
            listener,
            path,
            slot,
        })
    }

    pub fn slot(&self) -> Slot {
        self.slot
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Waits for the next client.
    pub async fn accept(&self) -> io::Result<UnixStream> {
        let (stream, _) = self.listener.accept().await?;
        debug!("Message client connected on {}", self.path.display());
        Ok(stream)
    }
}

impl Drop for MessageListener {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!("Failed to remove socket {}: {}", self.path.display(), e);
        }
    }
}

/// Prompts a connected client and reads one chunk of at most
/// [`MAX_SLOT_BYTES`]. A client that closes without sending yields an empty
/// line.
pub async fn read_line(mut stream: UnixStream, read_timeout: Duration) -> io::Result<Vec<u8>> {
    stream.write_all(PROMPT).await?;

    let mut buf = vec![0u8; MAX_SLOT_BYTES];
    let n = tokio::time::timeout(read_timeout, stream.read(&mut buf))
        .await
        .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "no message received"))??;
    buf.truncate(n);
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_message() {
        let board = MessageBoard::new(b"hello");
        assert_eq!(board.text(), b"hello");
        assert_eq!(board.cursor(), ScrollCursor::default());

        let long = vec![b'x'; 2000];
        assert_eq!(MessageBoard::new(&long).text().len(), MAX_MESSAGE_BYTES);
    }

    #[test]
    fn test_slots_concatenate() {
        let mut board = MessageBoard::new(b"Loading");
        board.replace(Slot::Secondary, b" world\r\n");
        assert_eq!(board.text(), b" world");
        board.replace(Slot::Primary, b"hello\n");
        assert_eq!(board.text(), b"hello world");
        board.replace(Slot::Secondary, b"");
        assert_eq!(board.text(), b"hello");
    }

    #[test]
    fn test_replace_resets_cursor() {
        let mut board = MessageBoard::new(b"abc");
        board.advance(true, 32);
        board.advance(false, 32);
        assert_eq!(board.cursor(), ScrollCursor { position: 1, offset: 32 });
        board.replace(Slot::Primary, b"xyz");
        assert_eq!(board.cursor(), ScrollCursor::default());
    }

    #[test]
    fn test_slot_and_message_limits() {
        let mut board = MessageBoard::new(b"");
        board.replace(Slot::Primary, &[b'a'; 600]);
        assert_eq!(board.text().len(), MAX_SLOT_BYTES);
        board.replace(Slot::Secondary, &[b'b'; 600]);
        assert_eq!(board.text().len(), 2 * MAX_SLOT_BYTES);
        assert!(board.text().len() <= MAX_MESSAGE_BYTES);
    }

    #[test]
    fn test_text_after_nul_is_dropped() {
        let mut board = MessageBoard::new(b"boot\0hidden");
        assert_eq!(board.text(), b"boot");

        board.replace(Slot::Primary, b"\0secret");
        assert!(board.text().is_empty());
        for _ in 0..3 {
            assert!(board.cursor().remaining(board.text()).is_empty());
            board.advance(true, 32);
            assert_eq!(board.cursor(), ScrollCursor::default());
        }

        board.replace(Slot::Primary, b"hi\0there\n");
        board.replace(Slot::Secondary, b" you\0x");
        assert_eq!(board.text(), b"hi you");
    }

    #[test]
    fn test_only_trailing_line_endings_stripped() {
        let mut board = MessageBoard::new(b"");
        board.replace(Slot::Primary, b"\r\na\r\nb\r\n\n");
        assert_eq!(board.text(), b"\r\na\r\nb");
    }

    #[tokio::test]
    async fn test_socket_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clock.sock");
        let listener = MessageListener::bind(&path, Slot::Primary, 0o777).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o777);

        let client = tokio::spawn({
            let path = path.clone();
            async move {
                let mut stream = UnixStream::connect(&path).await.unwrap();
                let mut prompt = vec![0u8; PROMPT.len()];
                stream.read_exact(&mut prompt).await.unwrap();
                assert_eq!(prompt, PROMPT);
                stream.write_all(b"tea time\n").await.unwrap();
            }
        });

        let stream = listener.accept().await.unwrap();
        let line = read_line(stream, Duration::from_secs(5)).await.unwrap();
        client.await.unwrap();
        assert_eq!(line, b"tea time\n");

        let mut board = MessageBoard::new(b"");
        board.replace(listener.slot(), &line);
        assert_eq!(board.text(), b"tea time");
    }

    #[tokio::test]
    async fn test_silent_client_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clock2.sock");
        let listener = MessageListener::bind(&path, Slot::Secondary, 0o700).unwrap();

        let _client = UnixStream::connect(&path).await.unwrap();
        let stream = listener.accept().await.unwrap();
        let err = read_line(stream, Duration::from_millis(50))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }

    #[tokio::test]
    async fn test_closed_client_clears_slot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clock.sock");
        let listener = MessageListener::bind(&path, Slot::Primary, 0o777).unwrap();

        drop(UnixStream::connect(&path).await.unwrap());
        // The prompt write may race the close; either way nothing was sent.
        let stream = listener.accept().await.unwrap();
        match read_line(stream, Duration::from_secs(5)).await {
            Ok(line) => assert!(line.is_empty()),
            Err(e) => assert!(matches!(
                e.kind(),
                io::ErrorKind::BrokenPipe | io::ErrorKind::ConnectionReset
            )),
        }
    }

    #[tokio::test]
    async fn test_stale_socket_replaced_and_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clock.sock");
        std::fs::write(&path, b"stale").unwrap();

        let listener = MessageListener::bind(&path, Slot::Primary, 0o777).unwrap();
        assert_eq!(listener.path(), path.as_path());
        drop(listener);
        assert!(!path.exists());
    }
}
