#![no_main]
use libfuzzer_sys::fuzz_target;
use sbom_merge::formats::annotations::DEFAULT_ANNOTATOR;
use sbom_merge::{adapter_for, parse_document_str, GraphMerger};

/// Fuzz detection, parsing, merging and serialization end to end.
///
/// Anything that parses must merge with itself and serialize without
/// panicking.
fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(document) = parse_document_str(s, DEFAULT_ANNOTATOR) {
            let adapter = adapter_for(document.metadata.format, DEFAULT_ANNOTATOR);
            let _ = adapter.serialize(&document, 2);
            let _ = GraphMerger::new(adapter.as_ref()).merge(&[document.clone(), document]);
        }
    }
});
