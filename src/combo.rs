//! Compiler for the key combination language.
//!
//! A combination is a sequence of key names separated by spaces or
//! parentheses. A key immediately followed by `(` is held down while the
//! keys inside the parentheses are pressed and released in turn, then
//! released at the matching `)`. Groups nest:
//!
//! ```text
//! Alt_L(Tab)              Alt_L down, Tab down, Tab up, Alt_L up
//! Alt_L(Shift_L(Tab) a)   Alt_L down, Shift_L down, Tab down, Tab up,
//!                         Shift_L up, a down, a up, Alt_L up
//! ```
//!
//! Input is never rejected. Names that do not resolve are dropped, a `)`
//! without a matching `(` closes nothing, and any keys still held at the
//! end of the input are released, most recently pressed first.

use crate::event::KeyEdge;

/// Compile `spec` into an ordered list of `(keycode, edge)` events.
///
/// `resolve` maps a key name to a keycode. It is only called for non-empty
/// names. Every `(` opens a group and every `)` closes one, whether or not
/// the name before it resolved: a group opened by an unknown name holds
/// nothing, and an unknown name before `)` is dropped but the group still
/// closes.
pub fn compile<F>(spec: &str, mut resolve: F) -> Vec<(u8, KeyEdge)>
where
    F: FnMut(&str) -> Option<u8>,
{
    let mut events = Vec::new();
    // One entry per open group; `None` for a group whose key did not resolve.
    let mut held: Vec<Option<u8>> = Vec::new();
    let mut token_start = 0;

    for (pos, c) in spec.char_indices() {
        if !matches!(c, ' ' | '(' | ')') {
            continue;
        }
        let token = &spec[token_start..pos];
        token_start = pos + c.len_utf8();
        let keycode = lookup(token, &mut resolve);

        match c {
            '(' => {
                if let Some(keycode) = keycode {
                    events.push((keycode, KeyEdge::Press));
                }
                held.push(keycode);
            }
            ')' => {
                if let Some(keycode) = keycode {
                    tap(&mut events, keycode);
                }
                release(&mut events, held.pop().flatten());
            }
            _ => {
                if let Some(keycode) = keycode {
                    tap(&mut events, keycode);
                }
            }
        }
    }

    if let Some(keycode) = lookup(&spec[token_start..], &mut resolve) {
        tap(&mut events, keycode);
    }
    while let Some(keycode) = held.pop() {
        release(&mut events, keycode);
    }

    events
}

fn lookup<F>(token: &str, resolve: &mut F) -> Option<u8>
where
    F: FnMut(&str) -> Option<u8>,
{
    if token.is_empty() {
        None
    } else {
        resolve(token)
    }
}

fn tap(events: &mut Vec<(u8, KeyEdge)>, keycode: u8) {
    events.push((keycode, KeyEdge::Press));
    events.push((keycode, KeyEdge::Release));
}

fn release(events: &mut Vec<(u8, KeyEdge)>, keycode: Option<u8>) {
    if let Some(keycode) = keycode {
        events.push((keycode, KeyEdge::Release));
    }
}
