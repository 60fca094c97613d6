//! Keyboard capture with optional key suppression.
//!
//! A [`KeyboardCapture`] watches raw key events on a dedicated thread and
//! reports presses and releases of a fixed set of keys to a
//! [`KeyHandler`]. The same keys can be grabbed so that no other client
//! receives them while the keyboard is suppressed.
//!
//! Only plain presses are reported: events with any modifier held (other
//! than Num Lock), autorepeats, events from the XTEST device and keys
//! outside the set are dropped.

use crate::backend::CaptureBackend;
use crate::config::CaptureConfig;
use crate::error::{Error, Result};
use crate::event::{KeyEdge, RawKeyEvent};
use crate::handler::KeyHandler;
use crate::keycode;
use crate::modifier;
use crate::registry::{CaptureRegistry, RegistryHandle};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Identifies a capture within a [`CaptureRegistry`].
pub type CaptureId = u64;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

type FlushFn = Box<dyn Fn() -> Result<()> + Send + Sync>;

/// Start/stop state of a capture loop, shared with the registry.
pub(crate) struct LoopControl {
    id: CaptureId,
    started: AtomicBool,
    running: AtomicBool,
    stop: AtomicBool,
    thread: Mutex<Option<JoinHandle<()>>>,
    registry: Mutex<Option<RegistryHandle>>,
    flush: FlushFn,
}

impl LoopControl {
    fn new(flush: FlushFn) -> Self {
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            started: AtomicBool::new(false),
            running: AtomicBool::new(false),
            stop: AtomicBool::new(false),
            thread: Mutex::new(None),
            registry: Mutex::new(None),
            flush,
        }
    }

    pub(crate) fn id(&self) -> CaptureId {
        self.id
    }

    /// Stop the loop: flush the backend, leave the registry and join the
    /// thread. Returns the flush result once everything else succeeded.
    pub(crate) fn cancel(&self) -> Result<()> {
        self.stop.store(true, Ordering::SeqCst);
        let flushed = (self.flush)();
        self.leave_registry()?;
        self.stop_and_join()?;
        flushed
    }

    fn leave_registry(&self) -> Result<()> {
        let handle = self
            .registry
            .lock()
            .map_err(|_| Error::ThreadError("registry mutex poisoned".into()))?
            .take();
        match handle {
            Some(handle) => handle.remove(self.id),
            None => Ok(()),
        }
    }

    /// Signal the loop to stop and wait for its thread to exit.
    ///
    /// Called from the loop thread itself, this only signals.
    pub(crate) fn stop_and_join(&self) -> Result<()> {
        self.stop.store(true, Ordering::SeqCst);

        let handle = self
            .thread
            .lock()
            .map_err(|_| Error::ThreadError("thread mutex poisoned".into()))?
            .take();
        if let Some(handle) = handle {
            if handle.thread().id() == thread::current().id() {
                return Ok(());
            }
            handle
                .join()
                .map_err(|_| Error::ThreadError("failed to join capture thread".into()))?;
        }
        Ok(())
    }
}

/// Decides which raw events are reported.
#[derive(Debug, Clone)]
struct KeyFilter {
    xtest_device_id: Option<i32>,
    keys: BTreeSet<String>,
}

impl KeyFilter {
    fn accept(&self, event: &RawKeyEvent) -> Option<(KeyEdge, &'static str)> {
        let edge = event.edge()?;
        if self.xtest_device_id == Some(event.source_id) {
            return None;
        }
        if modifier::has_active_modifiers(event.modifiers) {
            return None;
        }
        if event.repeat {
            return None;
        }
        let key = keycode::keycode_to_key(event.keycode)?;
        self.keys.contains(key).then_some((edge, key))
    }
}

/// Captures presses and releases of a set of keys.
///
/// # Example
///
/// ```no_run
/// # #[cfg(all(target_os = "linux", feature = "x11"))]
/// # fn main() {
/// use xkeyctl::{CaptureRegistry, FnKeyHandler, KeyboardCapture};
///
/// let registry = CaptureRegistry::new();
/// let capture = KeyboardCapture::open(["a", "s", "d", "f"]).expect("no display");
/// let handler = FnKeyHandler::new(
///     |key: &str| {
///         println!("down {key}");
///         true
///     },
///     |key: &str| {
///         println!("up {key}");
///         true
///     },
/// );
/// capture.start(Some(Box::new(handler)), &registry).unwrap();
/// capture.suppress_keyboard(true).unwrap();
/// // ...
/// capture.cancel().unwrap();
/// # }
/// # #[cfg(not(all(target_os = "linux", feature = "x11")))]
/// # fn main() {}
/// ```
pub struct KeyboardCapture<B: CaptureBackend> {
    backend: Arc<Mutex<B>>,
    control: Arc<LoopControl>,
    filter: KeyFilter,
    config: CaptureConfig,
    suppressed: Mutex<bool>,
}

#[cfg(all(target_os = "linux", feature = "x11"))]
impl KeyboardCapture<crate::platform::x11::X11Capture> {
    /// Connect to the default display and prepare to capture `keys`.
    pub fn open<I, S>(keys: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::open_with_config(keys, CaptureConfig::default())
    }

    /// Like [`KeyboardCapture::open`], with explicit settings.
    pub fn open_with_config<I, S>(keys: I, config: CaptureConfig) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(crate::platform::x11::X11Capture::open()?, keys, config)
    }
}

impl<B: CaptureBackend> KeyboardCapture<B> {
    /// Prepare to capture `keys` through `backend`.
    ///
    /// Looks up the XTEST keyboard so that synthetic events can be ignored.
    /// If there is no such device, nothing is filtered on that account.
    pub fn new<I, S>(mut backend: B, keys: I, config: CaptureConfig) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let xtest_device_id = backend
            .devices()?
            .into_iter()
            .find(|device| device.name == config.xtest_device_name)
            .map(|device| device.id);
        match xtest_device_id {
            Some(id) => log::debug!("{} has device id {}", config.xtest_device_name, id),
            None => log::warn!(
                "{} not found, synthetic events will not be filtered",
                config.xtest_device_name
            ),
        }

        let keys: BTreeSet<String> = keys.into_iter().map(Into::into).collect();
        for key in keys.iter().filter(|k| keycode::key_to_keycode(k).is_none()) {
            log::warn!("key {:?} is not in the keycode table and will never be captured", key);
        }

        let backend = Arc::new(Mutex::new(backend));
        let flusher = Arc::clone(&backend);
        let control = LoopControl::new(Box::new(move || {
            flusher
                .lock()
                .map_err(|_| Error::ThreadError("backend mutex poisoned".into()))?
                .flush()
        }));

        Ok(Self {
            backend,
            control: Arc::new(control),
            filter: KeyFilter {
                xtest_device_id,
                keys,
            },
            config,
            suppressed: Mutex::new(false),
        })
    }

    /// Start capturing and register with `registry`.
    ///
    /// With no handler the events are still filtered, then dropped.
    pub fn start(
        &self,
        handler: Option<Box<dyn KeyHandler>>,
        registry: &CaptureRegistry,
    ) -> Result<()> {
        self.start_inner(handler, Some(registry))
    }

    /// Start capturing without registering anywhere.
    pub fn start_detached(&self, handler: Option<Box<dyn KeyHandler>>) -> Result<()> {
        self.start_inner(handler, None)
    }

    fn start_inner(
        &self,
        handler: Option<Box<dyn KeyHandler>>,
        registry: Option<&CaptureRegistry>,
    ) -> Result<()> {
        if self.control.stop.load(Ordering::SeqCst) {
            return Err(Error::Cancelled);
        }
        if self.control.started.swap(true, Ordering::SeqCst) {
            return Err(Error::AlreadyRunning);
        }

        if let Err(e) = self.lock_backend().and_then(|mut backend| {
            backend.select_key_events()?;
            backend.flush()
        }) {
            self.control.started.store(false, Ordering::SeqCst);
            return Err(e);
        }

        if let Some(registry) = registry {
            *self
                .control
                .registry
                .lock()
                .map_err(|_| Error::ThreadError("registry mutex poisoned".into()))? =
                Some(registry.downgrade());
            registry.register(Arc::clone(&self.control))?;
        }

        let backend = Arc::clone(&self.backend);
        let control = Arc::clone(&self.control);
        let filter = self.filter.clone();
        let poll_interval = self.config.poll_interval;

        // Hold the slot while spawning so a concurrent cancel joins the
        // new thread instead of missing it.
        let mut slot = self
            .control
            .thread
            .lock()
            .map_err(|_| Error::ThreadError("thread mutex poisoned".into()))?;
        self.control.running.store(true, Ordering::SeqCst);
        let spawned = thread::Builder::new()
            .name(format!("xkeyctl-capture-{}", self.control.id))
            .spawn(move || run_loop(backend, control, filter, handler, poll_interval));
        match spawned {
            Ok(handle) => {
                *slot = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.control.running.store(false, Ordering::SeqCst);
                Err(Error::ThreadError(e.to_string()))
            }
        }
    }

    /// Stop capturing.
    ///
    /// Flushes pending requests, leaves the registry and waits for the
    /// capture thread to exit. Safe to call more than once and from any
    /// thread; a cancelled capture cannot be restarted.
    pub fn cancel(&self) -> Result<()> {
        self.control.cancel()
    }

    /// Whether the capture thread is running.
    pub fn is_running(&self) -> bool {
        self.control.running.load(Ordering::SeqCst)
    }

    /// This capture's registry ID.
    pub fn id(&self) -> CaptureId {
        self.control.id
    }

    /// ID of the XTEST keyboard, if one was found.
    pub fn xtest_device_id(&self) -> Option<i32> {
        self.filter.xtest_device_id
    }

    /// The keys this capture reports and suppresses.
    pub fn suppressed_keys(&self) -> &BTreeSet<String> {
        &self.filter.keys
    }

    /// Always `true`: X11 supports grabbing individual keys.
    pub fn can_suppress_keyboard(&self) -> bool {
        true
    }

    /// Whether the keys are currently grabbed.
    pub fn is_keyboard_suppressed(&self) -> bool {
        self.suppressed.lock().map(|s| *s).unwrap_or(false)
    }

    /// Grab or release every captured key.
    ///
    /// Does nothing if the keyboard is already in the requested state.
    /// Otherwise returns once the server has processed every request. If
    /// any request fails, the keys already changed are put back so that
    /// either every key is grabbed or none is.
    pub fn suppress_keyboard(&self, suppress: bool) -> Result<()> {
        let mut suppressed = self
            .suppressed
            .lock()
            .map_err(|_| Error::ThreadError("suppression mutex poisoned".into()))?;
        if *suppressed == suppress {
            return Ok(());
        }

        let mut backend = self.lock_backend()?;
        let mut changed = Vec::new();
        for code in self.keycodes() {
            let result = if suppress {
                backend.grab_keycode(code)
            } else {
                backend.ungrab_keycode(code)
            };
            if let Err(e) = result {
                revert_grabs(&mut *backend, &changed, suppress);
                return Err(e);
            }
            changed.push(code);
        }
        if let Err(e) = backend.sync() {
            revert_grabs(&mut *backend, &changed, suppress);
            return Err(e);
        }

        *suppressed = suppress;
        log::debug!("keyboard suppressed: {}", suppress);
        Ok(())
    }

    /// Grab a single keycode, with and without Num Lock.
    pub fn grab_key(&self, keycode: u8) -> Result<()> {
        self.lock_backend()?.grab_keycode(keycode)
    }

    /// Release a grab made by [`KeyboardCapture::grab_key`].
    pub fn ungrab_key(&self, keycode: u8) -> Result<()> {
        self.lock_backend()?.ungrab_keycode(keycode)
    }

    fn keycodes(&self) -> impl Iterator<Item = u8> + '_ {
        self.filter
            .keys
            .iter()
            .filter_map(|key| keycode::key_to_keycode(key))
    }

    fn lock_backend(&self) -> Result<MutexGuard<'_, B>> {
        self.backend
            .lock()
            .map_err(|_| Error::ThreadError("backend mutex poisoned".into()))
    }
}

impl<B: CaptureBackend> Drop for KeyboardCapture<B> {
    fn drop(&mut self) {
        if self.control.started.load(Ordering::SeqCst) {
            let _ = self.cancel();
        }
    }
}

/// Undo the first `changed` keycodes of a failed suppression pass.
fn revert_grabs<B: CaptureBackend>(backend: &mut B, changed: &[u8], suppressed: bool) {
    for &code in changed.iter().rev() {
        let result = if suppressed {
            backend.ungrab_keycode(code)
        } else {
            backend.grab_keycode(code)
        };
        if let Err(e) = result {
            log::warn!("could not restore grab state of keycode {}: {}", code, e);
        }
    }
    if let Err(e) = backend.sync() {
        log::warn!("could not restore grab state: {}", e);
    }
}

fn run_loop<B: CaptureBackend>(
    backend: Arc<Mutex<B>>,
    control: Arc<LoopControl>,
    filter: KeyFilter,
    mut handler: Option<Box<dyn KeyHandler>>,
    poll_interval: Duration,
) {
    log::debug!("capture {} started", control.id);

    while !control.stop.load(Ordering::SeqCst) {
        // The lock is released before dispatching so handlers can call
        // back into the capture.
        let polled = match backend.lock() {
            Ok(mut backend) => backend.poll_events(poll_interval),
            Err(_) => Err(Error::ThreadError("backend mutex poisoned".into())),
        };
        let events = match polled {
            Ok(events) => events,
            Err(e) => {
                log::error!("capture {} stopped: {}", control.id, e);
                break;
            }
        };

        for event in &events {
            let Some((edge, key)) = filter.accept(event) else {
                continue;
            };
            if let Some(handler) = handler.as_mut() {
                match edge {
                    KeyEdge::Press => handler.on_key_down(key),
                    KeyEdge::Release => handler.on_key_up(key),
                };
            }
        }
    }

    if let Err(e) = control.leave_registry() {
        log::warn!("capture {} could not leave its registry: {}", control.id, e);
    }
    control.running.store(false, Ordering::SeqCst);
    log::debug!("capture {} finished", control.id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::capture_channel_unbounded;
    use crate::event::{DeviceInfo, KeyEvent};
    use crate::mock::{CaptureRequest, MockCapture};
    use crate::modifier::{CONTROL_MASK, MOD2_MASK, SHIFT_MASK};
    use std::sync::mpsc::Receiver;

    const XTEST: i32 = MockCapture::XTEST_KEYBOARD_ID;
    const KEYBOARD: i32 = MockCapture::KEYBOARD_ID;
    const TIMEOUT: Duration = Duration::from_secs(2);

    fn config() -> CaptureConfig {
        CaptureConfig::default().with_poll_interval(Duration::from_millis(5))
    }

    fn filter(keys: &[&str]) -> KeyFilter {
        KeyFilter {
            xtest_device_id: Some(XTEST),
            keys: keys.iter().map(|k| k.to_string()).collect(),
        }
    }

    fn started(
        mock: &MockCapture,
        keys: &[&str],
    ) -> (KeyboardCapture<MockCapture>, Receiver<KeyEvent>) {
        let capture = KeyboardCapture::new(mock.clone(), keys.iter().copied(), config()).unwrap();
        let (handler, rx) = capture_channel_unbounded();
        capture.start_detached(Some(Box::new(handler))).unwrap();
        (capture, rx)
    }

    #[test]
    fn test_filter_reports_plain_presses() {
        let filter = filter(&["a", "s"]);
        assert_eq!(
            filter.accept(&RawKeyEvent::press(38, KEYBOARD)),
            Some((KeyEdge::Press, "a"))
        );
        assert_eq!(
            filter.accept(&RawKeyEvent::release(39, KEYBOARD)),
            Some((KeyEdge::Release, "s"))
        );
    }

    #[test]
    fn test_filter_ignores_xtest_device() {
        let filter = filter(&["a"]);
        let events = [
            RawKeyEvent::press(38, XTEST),
            RawKeyEvent::release(38, XTEST),
            RawKeyEvent::press(38, XTEST).repeated(),
            RawKeyEvent::press(38, XTEST).with_modifiers(u32::from(MOD2_MASK)),
        ];
        for event in &events {
            assert_eq!(filter.accept(event), None, "{event:?}");
        }
    }

    #[test]
    fn test_filter_ignores_modifiers_except_num_lock() {
        let filter = filter(&["a"]);
        let shifted = RawKeyEvent::press(38, KEYBOARD).with_modifiers(u32::from(SHIFT_MASK));
        let control = RawKeyEvent::press(38, KEYBOARD)
            .with_modifiers(u32::from(CONTROL_MASK | MOD2_MASK));
        let num_lock = RawKeyEvent::press(38, KEYBOARD).with_modifiers(u32::from(MOD2_MASK));
        assert_eq!(filter.accept(&shifted), None);
        assert_eq!(filter.accept(&control), None);
        assert_eq!(filter.accept(&num_lock), Some((KeyEdge::Press, "a")));
    }

    #[test]
    fn test_filter_ignores_autorepeat() {
        let filter = filter(&["a"]);
        assert_eq!(filter.accept(&RawKeyEvent::press(38, KEYBOARD).repeated()), None);
        assert_eq!(
            filter.accept(&RawKeyEvent::press(38, KEYBOARD)),
            Some((KeyEdge::Press, "a"))
        );
    }

    #[test]
    fn test_filter_ignores_untracked_keys_and_other_events() {
        let filter = filter(&["a"]);
        // "s" is in the table but not tracked; 9 (Escape) is not in the table.
        assert_eq!(filter.accept(&RawKeyEvent::press(39, KEYBOARD)), None);
        assert_eq!(filter.accept(&RawKeyEvent::press(9, KEYBOARD)), None);

        let mut other = RawKeyEvent::press(38, KEYBOARD);
        other.kind = crate::event::RawEventKind::Other(17);
        assert_eq!(filter.accept(&other), None);
    }

    #[test]
    fn test_filter_without_xtest_device_fails_open() {
        let filter = KeyFilter {
            xtest_device_id: None,
            keys: ["a".to_string()].into_iter().collect(),
        };
        assert_eq!(
            filter.accept(&RawKeyEvent::press(38, XTEST)),
            Some((KeyEdge::Press, "a"))
        );
    }

    #[test]
    fn test_new_resolves_xtest_device() {
        let capture = KeyboardCapture::new(MockCapture::new(), ["a"], config()).unwrap();
        assert_eq!(capture.xtest_device_id(), Some(XTEST));

        let mock = MockCapture::new().with_devices(vec![DeviceInfo::new(3, "Virtual core keyboard")]);
        let capture = KeyboardCapture::new(mock, ["a"], config()).unwrap();
        assert_eq!(capture.xtest_device_id(), None);
        assert!(capture.can_suppress_keyboard());
    }

    #[test]
    fn test_events_are_dispatched_in_order() {
        let mock = MockCapture::new();
        let (capture, rx) = started(&mock, &["a", "s"]);
        assert!(capture.is_running());

        mock.push_events([
            RawKeyEvent::press(38, KEYBOARD),
            RawKeyEvent::press(38, XTEST),
            RawKeyEvent::press(39, KEYBOARD),
            RawKeyEvent::press(39, KEYBOARD).repeated(),
            RawKeyEvent::release(38, KEYBOARD),
            RawKeyEvent::release(39, KEYBOARD),
        ]);

        let received: Vec<KeyEvent> = (0..4).map(|_| rx.recv_timeout(TIMEOUT).unwrap()).collect();
        assert_eq!(
            received,
            vec![
                KeyEvent::new("a", KeyEdge::Press),
                KeyEvent::new("s", KeyEdge::Press),
                KeyEvent::new("a", KeyEdge::Release),
                KeyEvent::new("s", KeyEdge::Release),
            ]
        );

        capture.cancel().unwrap();
        assert!(rx.try_recv().is_err());
        assert_eq!(mock.requests().first(), Some(&CaptureRequest::SelectKeyEvents));
    }

    #[test]
    fn test_start_twice_fails() {
        let mock = MockCapture::new();
        let (capture, _rx) = started(&mock, &["a"]);
        assert!(matches!(capture.start_detached(None), Err(Error::AlreadyRunning)));
        capture.cancel().unwrap();
        assert!(matches!(capture.start_detached(None), Err(Error::Cancelled)));
    }

    #[test]
    fn test_start_without_handler() {
        let mock = MockCapture::new();
        let capture = KeyboardCapture::new(mock.clone(), ["a"], config()).unwrap();
        capture.start_detached(None).unwrap();
        mock.push_events([RawKeyEvent::press(38, KEYBOARD)]);
        capture.cancel().unwrap();
        assert!(!capture.is_running());
    }

    #[test]
    fn test_cancel_stops_loop_and_flushes() {
        let mock = MockCapture::new();
        let (capture, rx) = started(&mock, &["a"]);

        capture.cancel().unwrap();
        assert!(!capture.is_running());
        assert!(mock.requests().contains(&CaptureRequest::Flush));

        mock.push_events([RawKeyEvent::press(38, KEYBOARD)]);
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());

        // Cancelling again is harmless.
        capture.cancel().unwrap();
    }

    #[test]
    fn test_cancel_from_another_thread() {
        let mock = MockCapture::new();
        let (capture, _rx) = started(&mock, &["a"]);
        let capture = Arc::new(capture);

        let remote = Arc::clone(&capture);
        thread::spawn(move || remote.cancel().unwrap())
            .join()
            .unwrap();
        assert!(!capture.is_running());
    }

    #[test]
    fn test_backend_error_ends_loop() {
        let mock = MockCapture::new();
        let (capture, _rx) = started(&mock, &["a"]);
        mock.fail_requests(true);

        let deadline = std::time::Instant::now() + TIMEOUT;
        while capture.is_running() && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(!capture.is_running());
        assert!(matches!(capture.cancel(), Err(Error::Protocol(_))));
    }

    #[test]
    fn test_backend_error_leaves_registry() {
        let registry = CaptureRegistry::new();
        let mock = MockCapture::new();
        let capture = KeyboardCapture::new(mock.clone(), ["a"], config()).unwrap();
        capture.start(None, &registry).unwrap();
        assert!(registry.contains(capture.id()));
        mock.fail_requests(true);

        let deadline = std::time::Instant::now() + TIMEOUT;
        while capture.is_running() && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(!capture.is_running());
        assert!(!registry.contains(capture.id()));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_suppress_grabs_each_key_once() {
        let mock = MockCapture::new();
        let capture =
            KeyboardCapture::new(mock.clone(), ["a", "s", "not-a-key"], config()).unwrap();
        assert!(!capture.is_keyboard_suppressed());

        capture.suppress_keyboard(true).unwrap();
        assert!(capture.is_keyboard_suppressed());
        assert_eq!(
            mock.requests(),
            vec![
                CaptureRequest::Grab(38),
                CaptureRequest::Grab(39),
                CaptureRequest::Sync,
            ]
        );
        assert_eq!(mock.grabbed(), BTreeSet::from([38, 39]));

        // Already suppressed: no new requests.
        capture.suppress_keyboard(true).unwrap();
        assert_eq!(mock.requests().len(), 3);

        capture.suppress_keyboard(false).unwrap();
        assert!(!capture.is_keyboard_suppressed());
        assert_eq!(
            &mock.requests()[3..],
            &[
                CaptureRequest::Ungrab(38),
                CaptureRequest::Ungrab(39),
                CaptureRequest::Sync,
            ]
        );
        assert!(mock.grabbed().is_empty());

        capture.suppress_keyboard(false).unwrap();
        assert_eq!(mock.requests().len(), 6);
    }

    #[test]
    fn test_suppress_failure_keeps_state() {
        let mock = MockCapture::new();
        let capture = KeyboardCapture::new(mock.clone(), ["a"], config()).unwrap();
        mock.fail_requests(true);
        assert!(matches!(capture.suppress_keyboard(true), Err(Error::Protocol(_))));
        assert!(!capture.is_keyboard_suppressed());
    }

    #[test]
    fn test_failed_grab_releases_earlier_keys() {
        let mock = MockCapture::new();
        let capture = KeyboardCapture::new(mock.clone(), ["a", "s", "d"], config()).unwrap();
        mock.refuse_requests(&[CaptureRequest::Grab(39)]);

        assert!(matches!(capture.suppress_keyboard(true), Err(Error::Protocol(_))));
        assert!(!capture.is_keyboard_suppressed());
        assert!(mock.grabbed().is_empty());
        assert_eq!(
            mock.requests(),
            vec![
                CaptureRequest::Grab(38),
                CaptureRequest::Ungrab(38),
                CaptureRequest::Sync,
            ]
        );

        // Nothing is left half-grabbed, so a retry starts from scratch.
        mock.refuse_requests(&[]);
        capture.suppress_keyboard(true).unwrap();
        assert_eq!(mock.grabbed(), BTreeSet::from([38, 39, 40]));
    }

    #[test]
    fn test_failed_ungrab_restores_grabs() {
        let mock = MockCapture::new();
        let capture = KeyboardCapture::new(mock.clone(), ["a", "s"], config()).unwrap();
        capture.suppress_keyboard(true).unwrap();
        mock.refuse_requests(&[CaptureRequest::Ungrab(39)]);

        assert!(matches!(capture.suppress_keyboard(false), Err(Error::Protocol(_))));
        assert!(capture.is_keyboard_suppressed());
        assert_eq!(mock.grabbed(), BTreeSet::from([38, 39]));

        mock.refuse_requests(&[]);
        capture.suppress_keyboard(false).unwrap();
        assert!(!capture.is_keyboard_suppressed());
        assert!(mock.grabbed().is_empty());
    }

    #[test]
    fn test_failed_sync_releases_keys() {
        let mock = MockCapture::new();
        let capture = KeyboardCapture::new(mock.clone(), ["a", "s"], config()).unwrap();
        mock.refuse_requests(&[CaptureRequest::Sync]);

        assert!(capture.suppress_keyboard(true).is_err());
        assert!(!capture.is_keyboard_suppressed());
        assert!(mock.grabbed().is_empty());
    }

    #[test]
    fn test_suppress_while_running() {
        let mock = MockCapture::new();
        let (capture, rx) = started(&mock, &["a"]);

        capture.suppress_keyboard(true).unwrap();
        mock.push_events([RawKeyEvent::press(38, KEYBOARD)]);
        assert_eq!(rx.recv_timeout(TIMEOUT).unwrap(), KeyEvent::new("a", KeyEdge::Press));

        capture.cancel().unwrap();
    }

    #[test]
    fn test_single_key_grab() {
        let mock = MockCapture::new();
        let capture = KeyboardCapture::new(mock.clone(), ["a"], config()).unwrap();
        capture.grab_key(65).unwrap();
        capture.ungrab_key(65).unwrap();
        assert_eq!(
            mock.requests(),
            vec![CaptureRequest::Grab(65), CaptureRequest::Ungrab(65)]
        );
        // Single grabs do not change the suppression flag.
        assert!(!capture.is_keyboard_suppressed());
    }
}
