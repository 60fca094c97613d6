//! Channel-based key handlers.
//!
//! These handlers forward captured key events into a channel, so that the
//! capture thread never runs application code and the events can be
//! consumed from another thread or an async task.
//!
//! # Example (Sync)
//!
//! ```no_run
//! # #[cfg(all(target_os = "linux", feature = "x11"))]
//! # fn main() {
//! use xkeyctl::channel::capture_channel;
//! use xkeyctl::KeyboardCapture;
//! use std::time::Duration;
//!
//! let capture = KeyboardCapture::open(["a", "s"]).expect("no display");
//! let (handler, rx) = capture_channel(100);
//! capture.start_detached(Some(Box::new(handler))).unwrap();
//!
//! loop {
//!     match rx.recv_timeout(Duration::from_millis(100)) {
//!         Ok(event) => println!("{} {:?}", event.key, event.edge),
//!         Err(_) => {
//!             // Timeout - do other work or check exit condition
//!         }
//!     }
//! }
//! # }
//! # #[cfg(not(all(target_os = "linux", feature = "x11")))]
//! # fn main() {}
//! ```
//!
//! # Example (Async with Tokio)
//!
//! ```ignore
//! use xkeyctl::channel::capture_async_channel;
//!
//! #[tokio::main]
//! async fn main() {
//!     let capture = xkeyctl::KeyboardCapture::open(["a"]).unwrap();
//!     let (handler, mut rx) = capture_async_channel(100);
//!     capture.start_detached(Some(Box::new(handler))).unwrap();
//!
//!     while let Some(event) = rx.recv().await {
//!         println!("{} {:?}", event.key, event.edge);
//!     }
//! }
//! ```

use crate::event::{KeyEdge, KeyEvent};
use crate::handler::KeyHandler;
use std::sync::mpsc::{self, Receiver, Sender, SyncSender};

/// Handler that sends events to a bounded sync channel.
pub struct ChannelKeyHandler {
    sender: SyncSender<KeyEvent>,
}

impl ChannelKeyHandler {
    fn send(&self, key: &str, edge: KeyEdge) -> bool {
        // Never block the capture thread; drop the event if the consumer
        // is behind.
        if self.sender.try_send(KeyEvent::new(key, edge)).is_err() {
            log::debug!("key channel full or closed, dropping {} {:?}", key, edge);
        }
        true
    }
}

impl KeyHandler for ChannelKeyHandler {
    fn on_key_down(&mut self, key: &str) -> bool {
        self.send(key, KeyEdge::Press)
    }

    fn on_key_up(&mut self, key: &str) -> bool {
        self.send(key, KeyEdge::Release)
    }
}

/// Handler that sends events to an unbounded sync channel.
pub struct UnboundedChannelKeyHandler {
    sender: Sender<KeyEvent>,
}

impl KeyHandler for UnboundedChannelKeyHandler {
    fn on_key_down(&mut self, key: &str) -> bool {
        let _ = self.sender.send(KeyEvent::new(key, KeyEdge::Press));
        true
    }

    fn on_key_up(&mut self, key: &str) -> bool {
        let _ = self.sender.send(KeyEvent::new(key, KeyEdge::Release));
        true
    }
}

/// Create a handler that forwards events to a bounded channel.
///
/// Events are dropped when the channel holds `capacity` unread events.
pub fn capture_channel(capacity: usize) -> (ChannelKeyHandler, Receiver<KeyEvent>) {
    let (sender, receiver) = mpsc::sync_channel(capacity);
    (ChannelKeyHandler { sender }, receiver)
}

/// Create a handler that forwards events to an unbounded channel.
pub fn capture_channel_unbounded() -> (UnboundedChannelKeyHandler, Receiver<KeyEvent>) {
    let (sender, receiver) = mpsc::channel();
    (UnboundedChannelKeyHandler { sender }, receiver)
}

#[cfg(feature = "tokio")]
mod async_channel {
    use super::*;
    use tokio::sync::mpsc as tokio_mpsc;

    /// Handler that sends events to a bounded tokio channel.
    pub struct AsyncChannelKeyHandler {
        sender: tokio_mpsc::Sender<KeyEvent>,
    }

    impl AsyncChannelKeyHandler {
        fn send(&self, key: &str, edge: KeyEdge) -> bool {
            if self.sender.try_send(KeyEvent::new(key, edge)).is_err() {
                log::debug!("async key channel full or closed, dropping {} {:?}", key, edge);
            }
            true
        }
    }

    impl KeyHandler for AsyncChannelKeyHandler {
        fn on_key_down(&mut self, key: &str) -> bool {
            self.send(key, KeyEdge::Press)
        }

        fn on_key_up(&mut self, key: &str) -> bool {
            self.send(key, KeyEdge::Release)
        }
    }

    /// Create a handler that forwards events to a bounded tokio channel.
    pub fn capture_async_channel(
        capacity: usize,
    ) -> (AsyncChannelKeyHandler, tokio_mpsc::Receiver<KeyEvent>) {
        let (sender, receiver) = tokio_mpsc::channel(capacity);
        (AsyncChannelKeyHandler { sender }, receiver)
    }
}

#[cfg(feature = "tokio")]
pub use async_channel::{AsyncChannelKeyHandler, capture_async_channel};
