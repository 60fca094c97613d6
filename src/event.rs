//! Event types shared by the capture and emulation engines.

/// Press or release edge of a key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyEdge {
    /// The key went down.
    Press,
    /// The key came up.
    Release,
}

impl KeyEdge {
    /// Returns `true` for [`KeyEdge::Press`].
    pub fn is_press(&self) -> bool {
        matches!(self, KeyEdge::Press)
    }
}

/// The XInput2 event type of a raw event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RawEventKind {
    /// `XI_KeyPress`.
    KeyPress,
    /// `XI_KeyRelease`.
    KeyRelease,
    /// Any other event type, carrying its raw `evtype`.
    Other(i32),
}

/// An undecoded device event as delivered by the display server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawKeyEvent {
    pub kind: RawEventKind,
    /// Hardware keycode (the XI2 `detail` field).
    pub keycode: u8,
    /// Effective modifier state at the time of the event.
    pub modifiers: u32,
    /// The physical or virtual device the event originated from.
    pub source_id: i32,
    /// Set when the server flagged the event as autorepeat.
    pub repeat: bool,
}

impl RawKeyEvent {
    /// A key press with no modifiers and no repeat flag.
    pub fn press(keycode: u8, source_id: i32) -> Self {
        Self {
            kind: RawEventKind::KeyPress,
            keycode,
            modifiers: 0,
            source_id,
            repeat: false,
        }
    }

    /// A key release with no modifiers and no repeat flag.
    pub fn release(keycode: u8, source_id: i32) -> Self {
        Self {
            kind: RawEventKind::KeyRelease,
            ..Self::press(keycode, source_id)
        }
    }

    /// Set the effective modifier state.
    pub fn with_modifiers(mut self, modifiers: u32) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Mark the event as an autorepeat.
    pub fn repeated(mut self) -> Self {
        self.repeat = true;
        self
    }

    /// The key edge, if this is a key press or release.
    pub fn edge(&self) -> Option<KeyEdge> {
        match self.kind {
            RawEventKind::KeyPress => Some(KeyEdge::Press),
            RawEventKind::KeyRelease => Some(KeyEdge::Release),
            RawEventKind::Other(_) => None,
        }
    }
}

/// A filtered key event as reported to channel consumers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    /// Key name from the keycode table.
    pub key: String,
    pub edge: KeyEdge,
}

impl KeyEvent {
    pub fn new(key: impl Into<String>, edge: KeyEdge) -> Self {
        Self {
            key: key.into(),
            edge,
        }
    }
}

/// An input device known to the display server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub id: i32,
    pub name: String,
}

impl DeviceInfo {
    pub fn new(id: i32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}
