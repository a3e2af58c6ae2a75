#![no_main]
use libfuzzer_sys::fuzz_target;
use sbom_merge::formats::{CycloneDxAdapter, SbomAdapter};

const MAX_WRAPPED_INPUT_LEN: usize = 10_000;

/// Fuzz the CycloneDX JSON adapter directly.
///
/// Prefixes input with a minimal CycloneDX JSON wrapper to increase
/// the likelihood of reaching the graph building logic rather than failing
/// on the envelope.
fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let adapter = CycloneDxAdapter::new();

        // Try raw input first
        let _ = adapter.parse_str(s);

        // Also try wrapping in CycloneDX JSON envelope
        if s.len() < MAX_WRAPPED_INPUT_LEN {
            let wrapped = format!(
                r#"{{"bomFormat":"CycloneDX","specVersion":"1.5","metadata":{{"component":{{"bom-ref":"root","name":"root"}}}},"components":[{s}]}}"#,
            );
            if let Ok(document) = adapter.parse_str(&wrapped) {
                let _ = adapter.serialize(&document, 0);
            }
        }
    }
});
