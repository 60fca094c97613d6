//! Keyboard emulation: typing text, backspaces and key combinations.
//!
//! Events sent by the emulator come from the XTEST device or are delivered
//! straight to the focus window, so a [`crate::KeyboardCapture`] running in
//! the same session never reports them.

use crate::backend::EmulationBackend;
use crate::combo;
use crate::error::{Error, Result};
use crate::event::KeyEdge;
use crate::keysym::{self, Keysym};
use crate::modifier::{self, MOD5_MASK, SHIFT_MASK};

/// Timestamps wrap just below `u32::MAX`.
const CLOCK_MODULUS: u64 = u32::MAX as u64;

/// Timestamp source for synthetic events.
///
/// Every tick returns a value different from the previous one, so that
/// clients never mistake two consecutive events for autorepeat.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventClock {
    time: u32,
}

impl EventClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the clock at `time`, reduced into range.
    pub fn starting_at(time: u32) -> Self {
        Self {
            time: (u64::from(time) % CLOCK_MODULUS) as u32,
        }
    }

    /// Advance the clock and return the new time.
    pub fn tick(&mut self) -> u32 {
        self.time = ((u64::from(self.time) + 1) % CLOCK_MODULUS) as u32;
        self.time
    }

    /// The most recently issued time.
    pub fn now(&self) -> u32 {
        self.time
    }
}

/// Synthesizes keyboard input into the focused window.
///
/// # Example
///
/// ```no_run
/// # #[cfg(all(target_os = "linux", feature = "x11"))]
/// # fn main() {
/// use xkeyctl::KeyboardEmulation;
///
/// let mut emulation = KeyboardEmulation::open().expect("no display");
/// emulation.send_string("hello").unwrap();
/// emulation.send_backspaces(2).unwrap();
/// emulation.send_key_combination("Control_L(a)").unwrap();
/// # }
/// # #[cfg(not(all(target_os = "linux", feature = "x11")))]
/// # fn main() {}
/// ```
pub struct KeyboardEmulation<B: EmulationBackend> {
    backend: B,
    modifier_mapping: Vec<Vec<u8>>,
    backspace_keycode: u8,
    clock: EventClock,
}

#[cfg(all(target_os = "linux", feature = "x11"))]
impl KeyboardEmulation<crate::platform::x11::X11Emulation> {
    /// Open a connection to the default display and prepare to emulate.
    pub fn open() -> Result<Self> {
        Self::new(crate::platform::x11::X11Emulation::open()?)
    }
}

impl<B: EmulationBackend> KeyboardEmulation<B> {
    /// Prepare to emulate keyboard events through `backend`.
    ///
    /// Reads the modifier mapping and resolves the BackSpace key once; a
    /// layout without BackSpace is rejected.
    pub fn new(mut backend: B) -> Result<Self> {
        let modifier_mapping = backend.modifier_mapping()?;
        let (backspace_keycode, _) =
            resolve_keysym(&mut backend, &modifier_mapping, keysym::BACKSPACE)?
                .ok_or_else(|| Error::KeysymUnmapped("BackSpace".into()))?;
        log::debug!("BackSpace resolved to keycode {}", backspace_keycode);

        Ok(Self {
            backend,
            modifier_mapping,
            backspace_keycode,
            clock: EventClock::new(),
        })
    }

    /// Emulate `count` presses of BackSpace.
    pub fn send_backspaces(&mut self, count: usize) -> Result<()> {
        for _ in 0..count {
            self.send_keycode(self.backspace_keycode, 0)?;
        }
        Ok(())
    }

    /// Type `s` into the focused window.
    ///
    /// Each character is sent with the modifiers its keysym needs and
    /// confirmed by the server before the next one. Characters with no
    /// keycode in the current layout are skipped.
    pub fn send_string(&mut self, s: &str) -> Result<()> {
        for c in s.chars() {
            let Some(keysym) = keysym::char_to_keysym(c) else {
                log::debug!("no keysym for {:?}, skipping", c);
                continue;
            };
            match self.keysym_to_keycode_and_modifiers(keysym)? {
                Some((keycode, modifiers)) => {
                    self.send_keycode(keycode, modifiers)?;
                    self.backend.sync()?;
                }
                None => log::debug!("no keycode for {:?}, skipping", c),
            }
        }
        Ok(())
    }

    /// Emulate a key combination such as `Alt_L(Tab)`.
    ///
    /// Key names are X keysym names without the `XK_` prefix; see
    /// [`crate::combo`] for the syntax. Each event is injected through the
    /// XTEST device and confirmed by the server before the next one.
    pub fn send_key_combination(&mut self, spec: &str) -> Result<()> {
        let events = self.compile_combination(spec)?;
        for (keycode, edge) in events {
            self.backend.fake_key_event(edge, keycode)?;
            self.backend.sync()?;
        }
        Ok(())
    }

    /// Compile `spec` to the keycode events [`send_key_combination`] would
    /// inject, without sending anything.
    ///
    /// [`send_key_combination`]: KeyboardEmulation::send_key_combination
    pub fn compile_combination(&mut self, spec: &str) -> Result<Vec<(u8, KeyEdge)>> {
        // The compiler's resolver cannot fail, so the first protocol error
        // is parked here and returned once compilation ends.
        let mut failure = None;
        let backend = &mut self.backend;
        let mapping = &self.modifier_mapping;
        let events = combo::compile(spec, |name| {
            if failure.is_some() {
                return None;
            }
            let keysym = backend.string_to_keysym(name)?;
            match resolve_keysym(&mut *backend, mapping, keysym) {
                Ok(resolved) => {
                    if resolved.is_none() {
                        log::debug!("no keycode for key {:?}, skipping", name);
                    }
                    resolved.map(|(keycode, _)| keycode)
                }
                Err(e) => {
                    failure = Some(e);
                    None
                }
            }
        });
        match failure {
            Some(e) => Err(e),
            None => Ok(events),
        }
    }

    /// Find a keycode and modifier mask that produce `keysym`.
    ///
    /// A keysym can usually be typed several ways; this returns the first
    /// keycode the server lists. That is deterministic for a fixed layout
    /// but not necessarily the most natural choice when the keysym appears
    /// in more than one group.
    pub fn keysym_to_keycode_and_modifiers(&mut self, keysym: Keysym) -> Result<Option<(u8, u8)>> {
        resolve_keysym(&mut self.backend, &self.modifier_mapping, keysym)
    }

    /// The keycode used for BackSpace.
    pub fn backspace_keycode(&self) -> u8 {
        self.backspace_keycode
    }

    /// Timestamp of the most recent focus-window event.
    pub fn time(&self) -> u32 {
        self.clock.now()
    }

    /// Borrow the backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn send_keycode(&mut self, keycode: u8, modifiers: u8) -> Result<()> {
        self.send_key_event(KeyEdge::Press, keycode, modifiers)?;
        self.send_key_event(KeyEdge::Release, keycode, modifiers)
    }

    fn send_key_event(&mut self, edge: KeyEdge, keycode: u8, modifiers: u8) -> Result<()> {
        let time = self.clock.tick();
        self.backend.send_key_event(edge, keycode, modifiers, time)
    }
}

/// Resolve `keysym` against `backend`, using the first candidate keycode.
///
/// Offsets 1, 3 and 5 are shifted columns; 4 and 5 are the third level;
/// 2 and 3 live in the second group, which is reached by holding whichever
/// modifiers the keycode itself is mapped to.
fn resolve_keysym<B: EmulationBackend>(
    backend: &mut B,
    modifier_mapping: &[Vec<u8>],
    keysym: Keysym,
) -> Result<Option<(u8, u8)>> {
    let candidates = backend.keysym_to_keycodes(keysym)?;
    let Some(&(keycode, offset)) = candidates.first() else {
        return Ok(None);
    };

    let mut modifiers = 0;
    if matches!(offset, 1 | 3 | 5) {
        modifiers |= SHIFT_MASK;
    }
    if matches!(offset, 4 | 5) {
        modifiers |= MOD5_MASK;
    }
    if matches!(offset, 2 | 3) {
        for (index, keycodes) in modifier_mapping.iter().enumerate() {
            if keycodes.contains(&keycode) {
                modifiers |= modifier::index_to_mask(index);
            }
        }
    }
    Ok(Some((keycode, modifiers)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{EmulatedEvent, MockEmulation};
    use crate::modifier::{MOD1_MASK, MOD3_MASK};
    use KeyEdge::{Press, Release};

    const BACKSPACE: u8 = 22;

    fn emulation() -> KeyboardEmulation<MockEmulation> {
        KeyboardEmulation::new(MockEmulation::us_layout()).unwrap()
    }

    #[test]
    fn test_clock_ticks_before_each_event() {
        let mut clock = EventClock::new();
        assert_eq!(clock.now(), 0);
        assert_eq!(clock.tick(), 1);
        assert_eq!(clock.tick(), 2);
        assert_eq!(clock.now(), 2);
    }

    #[test]
    fn test_clock_wraps_without_repeating() {
        let mut clock = EventClock::starting_at(u32::MAX - 2);
        let mut previous = clock.now();
        for _ in 0..4 {
            let next = clock.tick();
            assert_ne!(next, previous);
            assert!(next < u32::MAX);
            previous = next;
        }
        assert_eq!(EventClock::starting_at(u32::MAX - 1).tick(), 0);
        assert_eq!(EventClock::starting_at(u32::MAX).now(), 0);
    }

    #[test]
    fn test_new_requires_backspace() {
        let backend = MockEmulation::us_layout().without_keysym(keysym::BACKSPACE);
        assert!(matches!(
            KeyboardEmulation::new(backend),
            Err(Error::KeysymUnmapped(_))
        ));
    }

    #[test]
    fn test_send_backspaces() {
        let mut emulation = emulation();
        assert_eq!(emulation.backspace_keycode(), BACKSPACE);
        emulation.send_backspaces(3).unwrap();

        let events = emulation.backend().focus_events();
        assert_eq!(events.len(), 6);
        let mut last_time = 0;
        for (i, event) in events.iter().enumerate() {
            assert_eq!(event.keycode, BACKSPACE);
            assert_eq!(event.modifiers, 0);
            assert_eq!(event.edge, if i % 2 == 0 { Press } else { Release });
            assert!(event.time > last_time);
            last_time = event.time;
        }
        assert_eq!(emulation.time(), 6);
    }

    #[test]
    fn test_send_zero_backspaces() {
        let mut emulation = emulation();
        emulation.send_backspaces(0).unwrap();
        assert!(emulation.backend().events().is_empty());
    }

    #[test]
    fn test_send_string_applies_modifiers_and_syncs() {
        let mut emulation = emulation();
        emulation.send_string("aA").unwrap();

        let events = emulation.backend().events();
        assert_eq!(
            events,
            vec![
                EmulatedEvent::focus(Press, 38, 0, 1),
                EmulatedEvent::focus(Release, 38, 0, 2),
                EmulatedEvent::Sync,
                EmulatedEvent::focus(Press, 38, SHIFT_MASK, 3),
                EmulatedEvent::focus(Release, 38, SHIFT_MASK, 4),
                EmulatedEvent::Sync,
            ]
        );
    }

    #[test]
    fn test_send_string_skips_unmapped_characters() {
        let mut emulation = emulation();
        emulation.send_string("a\u{2603}\u{0}b").unwrap();

        let keycodes: Vec<u8> = emulation
            .backend()
            .focus_events()
            .iter()
            .map(|e| e.keycode)
            .collect();
        assert_eq!(keycodes, vec![38, 38, 56, 56]);
        assert_eq!(emulation.backend().sync_count(), 2);
    }

    #[test]
    fn test_resolution_offsets() {
        let backend = MockEmulation::new()
            .with_keysym(keysym::BACKSPACE, &[(22, 0)])
            .with_keysym(0x100, &[(30, 0)])
            .with_keysym(0x101, &[(30, 1)])
            .with_keysym(0x104, &[(30, 4)])
            .with_keysym(0x105, &[(30, 5)])
            .with_keysym(0x102, &[(92, 2)])
            .with_keysym(0x103, &[(92, 3)])
            .with_modifier_row(3, &[64, 92])
            .with_modifier_row(5, &[92]);
        let mut emulation = KeyboardEmulation::new(backend).unwrap();

        let mut resolve = |keysym| emulation.keysym_to_keycode_and_modifiers(keysym).unwrap();
        assert_eq!(resolve(0x100), Some((30, 0)));
        assert_eq!(resolve(0x101), Some((30, SHIFT_MASK)));
        assert_eq!(resolve(0x104), Some((30, MOD5_MASK)));
        assert_eq!(resolve(0x105), Some((30, SHIFT_MASK | MOD5_MASK)));
        assert_eq!(resolve(0x102), Some((92, MOD1_MASK | MOD3_MASK)));
        assert_eq!(resolve(0x103), Some((92, SHIFT_MASK | MOD1_MASK | MOD3_MASK)));
        assert_eq!(resolve(0x999), None);
    }

    #[test]
    fn test_resolution_uses_first_candidate() {
        let backend = MockEmulation::us_layout().with_keysym(0x41, &[(38, 1), (200, 0)]);
        let mut emulation = KeyboardEmulation::new(backend).unwrap();
        assert_eq!(
            emulation.keysym_to_keycode_and_modifiers(0x41).unwrap(),
            Some((38, SHIFT_MASK))
        );
    }

    #[test]
    fn test_send_key_combination_uses_fake_input() {
        let mut emulation = emulation();
        emulation.send_key_combination("Alt_L(Tab)").unwrap();

        assert_eq!(
            emulation.backend().events(),
            vec![
                EmulatedEvent::Fake(Press, 64),
                EmulatedEvent::Sync,
                EmulatedEvent::Fake(Press, 23),
                EmulatedEvent::Sync,
                EmulatedEvent::Fake(Release, 23),
                EmulatedEvent::Sync,
                EmulatedEvent::Fake(Release, 64),
                EmulatedEvent::Sync,
            ]
        );
        // Fake input does not use the event clock.
        assert_eq!(emulation.time(), 0);
    }

    #[test]
    fn test_compile_combination_skips_unknown_names() {
        let mut emulation = emulation();
        let events = emulation
            .compile_combination("Control_L(NoSuchKey a)")
            .unwrap();
        assert_eq!(
            events,
            vec![(37, Press), (38, Press), (38, Release), (37, Release)]
        );
    }

    #[test]
    fn test_protocol_errors_propagate() {
        let mut emulation = emulation();
        emulation.backend().fail_requests(true);
        assert!(matches!(
            emulation.send_backspaces(1),
            Err(Error::Protocol(_))
        ));
        assert!(matches!(
            emulation.send_key_combination("a"),
            Err(Error::Protocol(_))
        ));
    }
}
