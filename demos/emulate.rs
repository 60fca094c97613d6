//! Keyboard emulation example.
//!
//! Run with: cargo run --example emulate
//!
//! WARNING: This will type into whichever window has focus!

use std::thread::sleep;
use std::time::Duration;
use xkeyctl::KeyboardEmulation;

fn main() {
    println!("xkeyctl emulation example");
    println!("=========================\n");
    println!("WARNING: This will type into the focused window!\n");
    println!("Starting in 3 seconds... (Press Ctrl+C to cancel)\n");

    sleep(Duration::from_secs(3));

    let mut emulation = match KeyboardEmulation::open() {
        Ok(emulation) => emulation,
        Err(e) => {
            eprintln!("Error: {}", e);
            return;
        }
    };

    // Example 1: Type a string
    println!("1. Typing \"Hello, World!\"...");
    if let Err(e) = emulation.send_string("Hello, World!") {
        eprintln!("   Error: {}", e);
    } else {
        println!("   Done!");
    }
    sleep(Duration::from_millis(500));

    // Example 2: Erase part of it
    println!("2. Sending 6 backspaces...");
    if let Err(e) = emulation.send_backspaces(6) {
        eprintln!("   Error: {}", e);
    } else {
        println!("   Done!");
    }
    sleep(Duration::from_millis(500));

    // Example 3: Shifted and AltGr characters
    println!("3. Typing \"Rust? ~€\"...");
    if let Err(e) = emulation.send_string("Rust? ~€") {
        eprintln!("   Error: {}", e);
    } else {
        println!("   Done!");
    }
    sleep(Duration::from_millis(500));

    // Example 4: Key combination (select all)
    let combo = "Control_L(a)";
    match emulation.compile_combination(combo) {
        Ok(events) => println!("4. Sending {} ({} events)...", combo, events.len()),
        Err(e) => eprintln!("   Error: {}", e),
    }
    if let Err(e) = emulation.send_key_combination(combo) {
        eprintln!("   Error: {}", e);
    } else {
        println!("   Done!");
    }

    println!("\nEmulation complete!");
}
