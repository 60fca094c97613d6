//! Registry of live capture engines.
//!
//! An application that runs several captures can start them against one
//! registry and stop them all at once with [`CaptureRegistry::cancel_all`].

use crate::capture::{CaptureId, LoopControl};
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

type Entries = HashMap<CaptureId, Arc<LoopControl>>;

/// Thread-safe set of running captures. Clones share the same set.
#[derive(Clone, Default)]
pub struct CaptureRegistry {
    inner: Arc<Mutex<Entries>>,
}

impl CaptureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered captures.
    pub fn len(&self) -> usize {
        self.lock().map(|map| map.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the capture with `id` is registered.
    pub fn contains(&self, id: CaptureId) -> bool {
        self.lock().map(|map| map.contains_key(&id)).unwrap_or(false)
    }

    /// IDs of the registered captures, in ascending order.
    pub fn ids(&self) -> Vec<CaptureId> {
        let mut ids: Vec<CaptureId> = self
            .lock()
            .map(|map| map.keys().copied().collect())
            .unwrap_or_default();
        ids.sort_unstable();
        ids
    }

    /// Cancel every registered capture and wait for its loop to exit.
    ///
    /// Each capture is flushed and stopped as by
    /// [`KeyboardCapture::cancel`](crate::KeyboardCapture::cancel). The
    /// registry is empty afterwards. Returns the first error met, after
    /// attempting to stop every capture.
    pub fn cancel_all(&self) -> Result<()> {
        let controls: Vec<Arc<LoopControl>> = self.lock()?.drain().map(|(_, c)| c).collect();
        log::debug!("cancelling {} registered captures", controls.len());

        let mut first_error = None;
        for control in controls {
            if let Err(e) = control.cancel() {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    pub(crate) fn downgrade(&self) -> RegistryHandle {
        RegistryHandle {
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub(crate) fn register(&self, control: Arc<LoopControl>) -> Result<()> {
        self.lock()?.insert(control.id(), control);
        Ok(())
    }

    pub(crate) fn remove(&self, id: CaptureId) -> Result<()> {
        self.lock()?.remove(&id);
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Entries>> {
        self.inner
            .lock()
            .map_err(|_| Error::ThreadError("registry mutex poisoned".into()))
    }
}

/// Non-owning link from a capture back to its registry.
#[derive(Clone)]
pub(crate) struct RegistryHandle {
    inner: Weak<Mutex<Entries>>,
}

impl RegistryHandle {
    /// Remove `id`, if the registry still exists.
    pub(crate) fn remove(&self, id: CaptureId) -> Result<()> {
        match self.inner.upgrade() {
            Some(inner) => CaptureRegistry { inner }.remove(id),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for CaptureRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureRegistry")
            .field("ids", &self.ids())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::KeyboardCapture;
    use crate::config::CaptureConfig;
    use crate::mock::{CaptureRequest, MockCapture};
    use std::time::Duration;

    fn capture(mock: &MockCapture) -> KeyboardCapture<MockCapture> {
        let config = CaptureConfig::default().with_poll_interval(Duration::from_millis(5));
        KeyboardCapture::new(mock.clone(), ["a"], config).unwrap()
    }

    #[test]
    fn test_start_registers_and_cancel_removes() {
        let registry = CaptureRegistry::new();
        let mock = MockCapture::new();
        let capture = capture(&mock);
        assert!(registry.is_empty());

        capture.start(None, &registry).unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(capture.id()));

        capture.cancel().unwrap();
        assert!(registry.is_empty());
        assert!(!registry.contains(capture.id()));
    }

    #[test]
    fn test_detached_capture_is_not_registered() {
        let registry = CaptureRegistry::new();
        let capture = capture(&MockCapture::new());
        capture.start_detached(None).unwrap();
        assert!(registry.is_empty());
        capture.cancel().unwrap();
    }

    #[test]
    fn test_cancel_all_stops_every_capture() {
        let registry = CaptureRegistry::new();
        let first = capture(&MockCapture::new());
        let second = capture(&MockCapture::new());
        first.start(None, &registry).unwrap();
        second.start(None, &registry).unwrap();

        let mut expected = vec![first.id(), second.id()];
        expected.sort_unstable();
        assert_eq!(registry.ids(), expected);

        registry.cancel_all().unwrap();
        assert!(registry.is_empty());
        assert!(!first.is_running());
        assert!(!second.is_running());

        // The captures' own cancel still succeeds afterwards.
        first.cancel().unwrap();
        second.cancel().unwrap();
    }

    #[test]
    fn test_cancel_all_flushes_each_capture() {
        let registry = CaptureRegistry::new();
        let mock = MockCapture::new();
        let capture = capture(&mock);
        capture.start(None, &registry).unwrap();

        registry.cancel_all().unwrap();
        let flushes = mock
            .requests()
            .iter()
            .filter(|r| **r == CaptureRequest::Flush)
            .count();
        // One flush when starting, one when cancelling.
        assert_eq!(flushes, 2);
        assert!(!capture.is_running());

        // The capture no longer refers to the registry, so cancelling it
        // again does not touch a capture registered later under it.
        let other = self::capture(&MockCapture::new());
        other.start(None, &registry).unwrap();
        capture.cancel().unwrap();
        assert!(registry.contains(other.id()));
        other.cancel().unwrap();
    }

    #[test]
    fn test_registry_is_shared_between_threads() {
        let registry = CaptureRegistry::new();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    let capture = capture(&MockCapture::new());
                    capture.start(None, &registry).unwrap();
                    capture
                })
            })
            .collect();
        let captures: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(registry.len(), 4);

        registry.cancel_all().unwrap();
        assert!(captures.iter().all(|c| !c.is_running()));
    }
}
