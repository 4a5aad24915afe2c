#![no_main]

//! Fuzz target for notification file ingestion.
//!
//! Feeds arbitrary bytes to the delimited-file reader. Ingestion must either
//! return notifications or a typed error; it must never panic.

use courier_core::read_notifications;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(notifications) = read_notifications(data) {
        for notification in &notifications {
            assert!(!notification.destination.as_str().is_empty());
        }
    }

    // Same bytes behind a valid header exercise the row path.
    let mut with_header = b"URL,ORDER ID,NAME,EVENT\n".to_vec();
    with_header.extend_from_slice(data);
    let _ = read_notifications(with_header.as_slice());
});
