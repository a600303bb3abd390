//! Log sources for tails
//!
//! A [`FileFollower`] reads a growing file line by line and a [`Broker`]
//! hands those lines to subscribers, enforcing the single-reader policy.

mod broker;
mod error;
mod follower;

use std::path::PathBuf;

use tokio::sync::mpsc;
use tracing::{debug, error};

pub use broker::{Broker, ReaderPolicy, Subscription};
pub use error::SourceError;
pub use follower::{FileFollower, FollowOptions};

/// Entry point for starting a followed source
pub struct TailSource;

impl TailSource {
    /// Follow `path` and broker its lines.
    ///
    /// The file is checked up front so a missing path is reported before any
    /// task starts. Errors after that are recorded in [`Broker::failure`] and
    /// end every subscription.
    pub async fn follow(
        path: impl Into<PathBuf>,
        options: FollowOptions,
        policy: ReaderPolicy,
    ) -> Result<Broker, SourceError> {
        let path = path.into();
        let path_str = path.display().to_string();

        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|source| SourceError::Open {
                path: path_str.clone(),
                source,
            })?;
        if !metadata.is_file() {
            return Err(SourceError::NotAFile { path: path_str });
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let mut broker = Broker::spawn(rx, policy);
        let failure = broker.failure_slot();
        let cancel = broker.cancel_token();
        let follower = FileFollower::new(path, options);

        let task = tokio::spawn(async move {
            match follower.run(&tx, cancel).await {
                Ok(()) => debug!(path = %path_str, "follower stopped"),
                Err(e) => {
                    error!(error = %e, "follower failed");
                    *failure.lock() = Some(e.to_string());
                }
            }
            // Record the failure before the broker sees the source end
            drop(tx);
        });
        broker.attach(task);

        Ok(broker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("tails-source-{}-{}.log", name, std::process::id()))
    }

    async fn next(sub: &mut Subscription) -> Option<String> {
        tokio::time::timeout(Duration::from_secs(5), sub.recv())
            .await
            .expect("timed out waiting for a line")
    }

    #[tokio::test]
    async fn test_follow_missing_file() {
        let result = TailSource::follow(
            temp_path("does-not-exist"),
            FollowOptions::default(),
            ReaderPolicy::Single,
        )
        .await;
        assert!(matches!(result, Err(SourceError::Open { .. })));
    }

    #[tokio::test]
    async fn test_follow_directory() {
        let result = TailSource::follow(
            std::env::temp_dir(),
            FollowOptions::default(),
            ReaderPolicy::Single,
        )
        .await;
        assert!(matches!(result, Err(SourceError::NotAFile { .. })));
    }

    #[tokio::test]
    async fn test_follow_end_to_end() {
        let path = temp_path("e2e");
        std::fs::write(&path, "backlog\n").unwrap();

        let options = FollowOptions {
            poll_interval: Duration::from_millis(10),
            backlog_lines: 5,
        };
        let broker = TailSource::follow(&path, options, ReaderPolicy::Single)
            .await
            .unwrap();
        let mut sub = broker.subscribe();

        let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "appended").unwrap();

        // The backlog may be forwarded before the subscription exists
        let mut line = next(&mut sub).await;
        if line.as_deref() == Some("backlog") {
            line = next(&mut sub).await;
        }
        assert_eq!(line.as_deref(), Some("appended"));
        assert!(broker.failure().is_none());

        drop(broker);
        std::fs::remove_file(&path).ok();
    }
}
