#![no_main]
use libfuzzer_sys::fuzz_target;
use sbom_merge::formats::{SbomAdapter, SpdxAdapter};

const MAX_WRAPPED_INPUT_LEN: usize = 10_000;

/// Fuzz the SPDX JSON adapter, raw and with the input as the package list.
fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let adapter = SpdxAdapter::new();
        let _ = adapter.parse_str(s);

        if s.len() < MAX_WRAPPED_INPUT_LEN {
            let wrapped = format!(
                r#"{{"spdxVersion":"SPDX-2.3","SPDXID":"SPDXRef-DOCUMENT","documentDescribes":["SPDXRef-root"],"packages":[{{"SPDXID":"SPDXRef-root","name":"root"}},{s}]}}"#,
            );
            if let Ok(document) = adapter.parse_str(&wrapped) {
                let _ = adapter.serialize(&document, 0);
            }
        }
    }
});
