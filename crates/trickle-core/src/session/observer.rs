use tokio::sync::mpsc;

/// Receives everything one request makes visible.
///
/// For a single request `on_character` is called in arrival order, and at
/// most one of `on_complete` / `on_error` follows, after which nothing else
/// is delivered. A cancelled request gets neither.
pub trait StreamObserver: Send + Sync {
    fn on_character(&self, ch: char);

    /// Latest status line; replaces whatever status was shown before.
    fn on_status(&self, message: &str);

    fn on_complete(&self);

    fn on_error(&self, message: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObserverEvent {
    Character(char),
    Status(String),
    Complete,
    Error(String),
}

impl ObserverEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ObserverEvent::Complete | ObserverEvent::Error(_))
    }
}

/// Forwards observer callbacks as [`ObserverEvent`]s over a channel, for
/// renderers that prefer to consume a stream of tagged values.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<ObserverEvent>,
}

impl ChannelObserver {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ObserverEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: ObserverEvent) {
        // A renderer that went away just stops receiving.
        let _ = self.tx.send(event);
    }
}

impl StreamObserver for ChannelObserver {
    fn on_character(&self, ch: char) {
        self.send(ObserverEvent::Character(ch));
    }

    fn on_status(&self, message: &str) {
        self.send(ObserverEvent::Status(message.to_string()));
    }

    fn on_complete(&self) {
        self.send(ObserverEvent::Complete);
    }

    fn on_error(&self, message: &str) {
        self.send(ObserverEvent::Error(message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_observer_forwards_in_order() {
        let (observer, mut rx) = ChannelObserver::new();

        observer.on_status("Searching");
        observer.on_character('o');
        observer.on_character('k');
        observer.on_complete();
        drop(observer);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }

        assert_eq!(
            events,
            vec![
                ObserverEvent::Status("Searching".into()),
                ObserverEvent::Character('o'),
                ObserverEvent::Character('k'),
                ObserverEvent::Complete,
            ]
        );
        assert!(events[3].is_terminal());
    }

    #[test]
    fn test_channel_observer_tolerates_dropped_receiver() {
        let (observer, rx) = ChannelObserver::new();
        drop(rx);
        observer.on_character('x');
        observer.on_error("gone");
    }
}
