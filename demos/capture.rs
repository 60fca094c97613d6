//! Key capture example - report and suppress a few keys.
//!
//! Run with: cargo run --example capture
//!
//! IMPORTANT: While this runs, the home row keys a, s, d, f, j, k, l and ;
//! are suppressed and will not reach other applications. Press Ctrl+C to
//! exit.

use std::sync::mpsc;
use xkeyctl::{CaptureRegistry, FnKeyHandler, KeyboardCapture};

const KEYS: [&str; 8] = ["a", "s", "d", "f", "j", "k", "l", ";"];

fn main() {
    println!("xkeyctl capture example");
    println!("=======================\n");
    println!("Suppressing: {}", KEYS.join(" "));
    println!("Press Ctrl+C to exit.\n");

    let registry = CaptureRegistry::new();
    let capture = match KeyboardCapture::open(KEYS) {
        Ok(capture) => capture,
        Err(e) => {
            eprintln!("Error: {}", e);
            return;
        }
    };

    match capture.xtest_device_id() {
        Some(id) => println!("Ignoring synthetic events from device {}", id),
        None => println!("No XTEST keyboard found, synthetic events will be reported"),
    }

    let handler = FnKeyHandler::new(
        |key: &str| {
            println!("down {}", key);
            true
        },
        |key: &str| {
            println!("up   {}", key);
            true
        },
    );
    if let Err(e) = capture.start(Some(Box::new(handler)), &registry) {
        eprintln!("Error: {}", e);
        return;
    }
    if let Err(e) = capture.suppress_keyboard(true) {
        eprintln!("Error suppressing keys: {}", e);
    }

    let (tx, rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })
    .expect("Failed to set Ctrl+C handler");
    let _ = rx.recv();

    println!("\nStopping...");
    if let Err(e) = capture.suppress_keyboard(false) {
        eprintln!("Error releasing keys: {}", e);
    }
    if let Err(e) = registry.cancel_all() {
        eprintln!("Error: {}", e);
    }
}
