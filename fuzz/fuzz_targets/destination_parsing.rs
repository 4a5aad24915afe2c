#![no_main]

//! Fuzz target for destination canonicalization.
//!
//! Any accepted destination must be a fixed point: parsing its canonical
//! form again yields an equal destination.

use courier_core::Destination;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(destination) = Destination::parse(raw) {
        let reparsed = Destination::parse(destination.as_str());
        assert_eq!(reparsed.as_ref(), Ok(&destination));
    }
});
