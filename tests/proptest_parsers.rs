//! Property-based tests for format detection and the adapters.
//!
//! Ensures parsers don't panic on arbitrary input, including random strings
//! and JSON-like fragments.

use proptest::prelude::*;
use sbom_merge::formats::annotations::DEFAULT_ANNOTATOR;
use sbom_merge::matching::purl::canonicalize;
use sbom_merge::{detect_format, parse_document_str};

proptest! {
    // Parser tests only assert no-panic (not result correctness) since
    // random input is expected to produce Err in almost all cases.
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn parse_document_str_doesnt_panic(s in "\\PC{0,2000}") {
        let result = parse_document_str(&s, DEFAULT_ANNOTATOR);
        prop_assert!(result.is_err(), "Random input should not parse successfully: {:?}", s);
    }

    #[test]
    fn detect_format_doesnt_panic(s in "\\PC{0,2000}") {
        let _ = detect_format(&s);
    }

    #[test]
    fn json_like_input_doesnt_panic(
        s in prop::string::string_regex(r#"\{[^\}]{0,500}\}"#).unwrap()
    ) {
        let _ = parse_document_str(&s, DEFAULT_ANNOTATOR);
    }

    #[test]
    fn cyclonedx_partial_json_doesnt_panic(
        version in "1\\.[0-9]",
        extra in "\\PC{0,200}",
    ) {
        let input = format!(r#"{{"bomFormat": "CycloneDX", "specVersion": "{}", {}}}"#, version, extra);
        let _ = parse_document_str(&input, DEFAULT_ANNOTATOR);
    }

    #[test]
    fn spdx_partial_json_doesnt_panic(
        version in "SPDX-[0-9]\\.[0-9]",
        extra in "\\PC{0,200}",
    ) {
        let input = format!(r#"{{"spdxVersion": "{}", "SPDXID": "SPDXRef-DOCUMENT", {}}}"#, version, extra);
        let _ = parse_document_str(&input, DEFAULT_ANNOTATOR);
    }

    #[test]
    fn purl_canonical_form_is_stable(
        s in "pkg:[a-z]{1,8}/([a-z0-9]{1,10}/)?[a-zA-Z][a-zA-Z0-9._-]{0,19}(@[a-zA-Z0-9.+-]{1,10})?(\\?arch=[a-z0-9_]{1,8})?"
    ) {
        if let Ok(canonical) = canonicalize(&s) {
            prop_assert_eq!(canonicalize(&canonical).unwrap(), canonical);
        }
    }
}
