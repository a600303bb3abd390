use std::io::SeekFrom;
use std::path::PathBuf;
use std::time::Duration;

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncSeekExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::SourceError;

/// How far back from the end of the file to look for backlog lines
const BACKLOG_WINDOW: u64 = 64 * 1024;

/// Options for following a file
#[derive(Clone, Debug)]
pub struct FollowOptions {
    /// How long to wait at end of file before checking again
    pub poll_interval: Duration,

    /// Number of existing lines to emit before following
    pub backlog_lines: usize,
}

impl Default for FollowOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(250),
            backlog_lines: 10,
        }
    }
}

/// Follows a growing file, `tail -f` style
pub struct FileFollower {
    path: PathBuf,
    options: FollowOptions,
}

impl FileFollower {
    pub fn new(path: impl Into<PathBuf>, options: FollowOptions) -> Self {
        Self {
            path: path.into(),
            options,
        }
    }

    /// Emit the backlog, then every complete line appended to the file.
    ///
    /// Returns `Ok(())` when cancelled or when the receiver goes away. A
    /// truncated file is read again from the start.
    pub async fn run(
        self,
        tx: &mpsc::UnboundedSender<String>,
        cancel: CancellationToken,
    ) -> Result<(), SourceError> {
        let mut file = File::open(&self.path)
            .await
            .map_err(|source| self.open_error(source))?;

        let (backlog, mut position) = self.read_backlog(&mut file).await?;
        for line in backlog {
            if tx.send(line).is_err() {
                return Ok(());
            }
        }

        info!(path = %self.path.display(), position, "following file");

        let mut reader = BufReader::new(file);
        let mut pending: Vec<u8> = Vec::new();

        loop {
            let read = tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                read = reader.read_until(b'\n', &mut pending) => {
                    read.map_err(|source| self.read_error(source))?
                }
            };

            if read == 0 {
                let len = tokio::fs::metadata(&self.path)
                    .await
                    .map_err(|source| self.read_error(source))?
                    .len();
                if len < position {
                    info!(path = %self.path.display(), "file truncated, reading from the start");
                    reader
                        .seek(SeekFrom::Start(0))
                        .await
                        .map_err(|source| self.read_error(source))?;
                    position = 0;
                    pending.clear();
                }

                tokio::select! {
                    _ = cancel.cancelled() => return Ok(()),
                    _ = tokio::time::sleep(self.options.poll_interval) => {}
                }
                continue;
            }

            position += read as u64;

            // A line without its newline is still being written
            if pending.last() == Some(&b'\n') {
                let line = decode_line(&pending);
                pending.clear();
                if tx.send(line).is_err() {
                    debug!("receiver dropped, stopping follower");
                    return Ok(());
                }
            }
        }
    }

    /// Last `backlog_lines` complete lines, and the offset following continues from
    async fn read_backlog(&self, file: &mut File) -> Result<(Vec<String>, u64), SourceError> {
        let len = file
            .metadata()
            .await
            .map_err(|source| self.read_error(source))?
            .len();
        let start = len.saturating_sub(BACKLOG_WINDOW);

        file.seek(SeekFrom::Start(start))
            .await
            .map_err(|source| self.read_error(source))?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)
            .await
            .map_err(|source| self.read_error(source))?;

        // Starting mid-file means the first line is partial
        let skip = if start > 0 {
            bytes
                .iter()
                .position(|b| *b == b'\n')
                .map(|i| i + 1)
                .unwrap_or(bytes.len())
        } else {
            0
        };

        // A trailing line without newline is left for the follow loop
        let complete_end = bytes
            .iter()
            .rposition(|b| *b == b'\n')
            .map(|i| i + 1)
            .unwrap_or(0)
            .max(skip);

        let mut lines: Vec<String> = bytes[skip..complete_end]
            .split_inclusive(|b| *b == b'\n')
            .map(decode_line)
            .collect();
        let excess = lines.len().saturating_sub(self.options.backlog_lines);
        lines.drain(..excess);

        let position = start + complete_end as u64;
        file.seek(SeekFrom::Start(position))
            .await
            .map_err(|source| self.read_error(source))?;

        Ok((lines, position))
    }

    fn open_error(&self, source: std::io::Error) -> SourceError {
        SourceError::Open {
            path: self.path.display().to_string(),
            source,
        }
    }

    fn read_error(&self, source: std::io::Error) -> SourceError {
        SourceError::Read {
            path: self.path.display().to_string(),
            source,
        }
    }
}

/// Strip the line terminator and decode, replacing invalid UTF-8
fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\n").unwrap_or(bytes);
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::Path;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("tails-follower-{}-{}.log", name, std::process::id()))
    }

    fn append(path: &Path, text: &str) {
        let mut file = std::fs::OpenOptions::new().append(true).open(path).unwrap();
        file.write_all(text.as_bytes()).unwrap();
    }

    async fn next_line(rx: &mut mpsc::UnboundedReceiver<String>) -> String {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for a line")
            .expect("follower channel closed")
    }

    fn fast(backlog_lines: usize) -> FollowOptions {
        FollowOptions {
            poll_interval: Duration::from_millis(10),
            backlog_lines,
        }
    }

    #[test]
    fn test_decode_line() {
        assert_eq!(decode_line(b"hello\r\n"), "hello");
        assert_eq!(decode_line(b"hello\n"), "hello");
        assert_eq!(decode_line(b"bad \xff byte\n"), "bad \u{fffd} byte");
    }

    #[tokio::test]
    async fn test_backlog_then_follow() {
        let path = temp_path("follow");
        std::fs::write(&path, "old 1\nold 2\nold 3\n").unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let follower = FileFollower::new(&path, fast(2));
        let task = tokio::spawn({
            let cancel = cancel.clone();
            async move { follower.run(&tx, cancel).await }
        });

        assert_eq!(next_line(&mut rx).await, "old 2");
        assert_eq!(next_line(&mut rx).await, "old 3");

        append(&path, "new\r\npartial");
        assert_eq!(next_line(&mut rx).await, "new");

        append(&path, " line\n");
        assert_eq!(next_line(&mut rx).await, "partial line");

        cancel.cancel();
        assert!(task.await.unwrap().is_ok());
        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn test_truncated_file_restarts() {
        let path = temp_path("truncate");
        std::fs::write(&path, "first line\nsecond line\n").unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let follower = FileFollower::new(&path, fast(10));
        let task = tokio::spawn({
            let cancel = cancel.clone();
            async move { follower.run(&tx, cancel).await }
        });

        assert_eq!(next_line(&mut rx).await, "first line");
        assert_eq!(next_line(&mut rx).await, "second line");

        std::fs::write(&path, "fresh\n").unwrap();
        assert_eq!(next_line(&mut rx).await, "fresh");

        cancel.cancel();
        assert!(task.await.unwrap().is_ok());
        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn test_missing_file() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let follower = FileFollower::new(temp_path("missing-never-created"), fast(1));
        let result = follower.run(&tx, CancellationToken::new()).await;
        assert!(matches!(result, Err(SourceError::Open { .. })));
    }
}
