//! Channel example - receive captured keys on the main thread.
//!
//! Run with: cargo run --example capture_channel
//!
//! Keys are reported but not suppressed. Type "x" to exit.

use std::sync::mpsc::RecvTimeoutError;
use std::time::Duration;
use xkeyctl::channel::capture_channel;
use xkeyctl::{KeyEdge, KeyboardCapture, keycode};

fn main() {
    println!("xkeyctl channel example");
    println!("=======================\n");
    println!("Type any letter, digit or punctuation key. Type x to exit.\n");

    let capture = KeyboardCapture::open(keycode::KEYS.iter().copied()).expect("Failed to open display");
    let (handler, rx) = capture_channel(100);
    capture
        .start_detached(Some(Box::new(handler)))
        .expect("Failed to start capture");

    let mut count = 0u32;
    loop {
        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(event) => {
                count += 1;
                match event.edge {
                    KeyEdge::Press => println!("[{}] Key pressed: {}", count, event.key),
                    KeyEdge::Release => {
                        println!("[{}] Key released: {}", count, event.key);
                        if event.key == "x" {
                            break;
                        }
                    }
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                // No keys - this is where you could do other work
            }
            Err(RecvTimeoutError::Disconnected) => {
                println!("Channel disconnected, capture stopped.");
                break;
            }
        }
    }

    if let Err(e) = capture.cancel() {
        eprintln!("Error: {}", e);
    }
}
