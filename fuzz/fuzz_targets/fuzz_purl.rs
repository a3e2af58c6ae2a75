#![no_main]
use libfuzzer_sys::fuzz_target;
use sbom_merge::matching::purl::{canonicalize, percent_decode};

/// Fuzz purl parsing and canonicalization.
fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = canonicalize(s);
        let _ = percent_decode(s);
    }
});
