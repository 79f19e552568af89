use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::scalar::Row;

/// A single row along with its position in the producer's output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: u64,
    pub row: Row,
}

pub type MessageSender = mpsc::Sender<Message>;
pub type MessageReceiver = mpsc::Receiver<Message>;

/// Create a bounded handoff. A zero capacity is bumped to one.
pub fn message_channel(buffer: usize) -> (MessageSender, MessageChan) {
    let (tx, rx) = mpsc::channel(buffer.max(1));
    (tx, MessageChan::new(rx))
}

/// Cloneable handle to the receiving end of a task's outbound handoff.
///
/// There's exactly one consumer per handoff. The first call to `take` gets
/// the receiver, every subsequent call gets `None`.
#[derive(Debug, Clone)]
pub struct MessageChan {
    rx: Arc<Mutex<Option<MessageReceiver>>>,
}

impl MessageChan {
    pub fn new(rx: MessageReceiver) -> Self {
        MessageChan {
            rx: Arc::new(Mutex::new(Some(rx))),
        }
    }

    /// Handle whose receiver was already consumed.
    pub fn taken() -> Self {
        MessageChan {
            rx: Arc::new(Mutex::new(None)),
        }
    }

    pub fn take(&self) -> Option<MessageReceiver> {
        self.rx.lock().take()
    }

    pub fn is_taken(&self) -> bool {
        self.rx.lock().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_once() {
        let (_tx, chan) = message_channel(0);
        let other = chan.clone();
        assert!(other.take().is_some());
        assert!(chan.take().is_none());
        assert!(chan.is_taken());
    }
}
