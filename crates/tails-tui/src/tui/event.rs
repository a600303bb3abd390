use std::io;
use std::time::Duration;

use crossterm::event::{Event as CrosstermEvent, EventStream, KeyEvent, KeyEventKind};
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Terminal events
#[derive(Clone, Debug)]
pub enum Event {
    /// Periodic redraw
    Tick,
    /// Key press
    Key(KeyEvent),
    /// Bracketed paste
    Paste(String),
    Resize(u16, u16),
    /// Error reading terminal input
    Error(String),
}

impl Event {
    /// Map a raw terminal event, skipping the kinds the viewer ignores
    fn from_terminal(event: CrosstermEvent) -> Option<Self> {
        match event {
            // Release and repeat events arrive on Windows
            CrosstermEvent::Key(key) if key.kind == KeyEventKind::Press => Some(Self::Key(key)),
            CrosstermEvent::Paste(text) => Some(Self::Paste(text)),
            CrosstermEvent::Resize(w, h) => Some(Self::Resize(w, h)),
            _ => None,
        }
    }
}

/// Reads terminal input on a background task and queues it with ticks
pub struct EventHandler {
    receiver: mpsc::UnboundedReceiver<Event>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl EventHandler {
    /// Read from the real terminal, ticking every `tick_rate`
    pub fn new(tick_rate: Duration) -> Self {
        Self::from_stream(EventStream::new(), tick_rate)
    }

    /// Read from any source of terminal events
    pub fn from_stream<S>(input: S, tick_rate: Duration) -> Self
    where
        S: Stream<Item = io::Result<CrosstermEvent>> + Send + Unpin + 'static,
    {
        let (sender, receiver) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(pump(input, tick_rate, sender, cancel.clone()));

        Self {
            receiver,
            cancel,
            task,
        }
    }

    /// Next queued event, `None` once input has ended
    pub async fn next(&mut self) -> Option<Event> {
        self.receiver.recv().await
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
        self.task.abort();
    }
}

impl Drop for EventHandler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn pump<S>(
    mut input: S,
    tick_rate: Duration,
    sender: mpsc::UnboundedSender<Event>,
    cancel: CancellationToken,
) where
    S: Stream<Item = io::Result<CrosstermEvent>> + Unpin,
{
    let mut ticks = tokio::time::interval(tick_rate);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticks.tick() => Event::Tick,
            read = input.next() => match read {
                Some(Ok(raw)) => match Event::from_terminal(raw) {
                    Some(event) => event,
                    None => continue,
                },
                Some(Err(e)) => Event::Error(e.to_string()),
                None => break,
            },
        };

        if sender.send(event).is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyModifiers};

    fn key(c: char, kind: KeyEventKind) -> CrosstermEvent {
        CrosstermEvent::Key(KeyEvent::new_with_kind(KeyCode::Char(c), KeyModifiers::NONE, kind))
    }

    async fn drain(handler: &mut EventHandler) -> Vec<Event> {
        let mut events = Vec::new();
        while let Some(event) = handler.next().await {
            if !matches!(event, Event::Tick) {
                events.push(event);
            }
        }
        events
    }

    #[tokio::test]
    async fn test_forwards_presses_and_paste() {
        let input = futures::stream::iter(vec![
            Ok(key('a', KeyEventKind::Press)),
            Ok(key('a', KeyEventKind::Release)),
            Ok(CrosstermEvent::Paste("timeout".to_string())),
            Ok(CrosstermEvent::Resize(80, 24)),
            Ok(CrosstermEvent::FocusGained),
        ]);
        let mut handler = EventHandler::from_stream(input, Duration::from_secs(3600));

        let events = drain(&mut handler).await;
        assert_eq!(events.len(), 3);
        assert!(matches!(&events[0], Event::Key(k) if k.code == KeyCode::Char('a')));
        assert!(matches!(&events[1], Event::Paste(text) if text == "timeout"));
        assert!(matches!(events[2], Event::Resize(80, 24)));
    }

    #[tokio::test]
    async fn test_read_errors_are_reported() {
        let input = futures::stream::iter(vec![Err(io::Error::other("tty gone"))]);
        let mut handler = EventHandler::from_stream(input, Duration::from_secs(3600));

        let events = drain(&mut handler).await;
        assert!(matches!(&events[..], [Event::Error(msg)] if msg == "tty gone"));
    }

    #[tokio::test]
    async fn test_ticks_while_idle() {
        let mut handler =
            EventHandler::from_stream(futures::stream::pending(), Duration::from_millis(5));

        for _ in 0..2 {
            let event = tokio::time::timeout(Duration::from_secs(5), handler.next())
                .await
                .expect("no tick");
            assert!(matches!(event, Some(Event::Tick)));
        }
    }
}
