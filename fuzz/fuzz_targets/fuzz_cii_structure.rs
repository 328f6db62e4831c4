#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // Must not panic; a malformed document is just an invalid report.
        let report = facturx::cii::validate_xml_structure(s);
        assert_eq!(report.is_valid, report.errors.is_empty());
        let _ = facturx::cii::element_values(s);
        let _ = facturx::cii::detect_level(s);
    }
});
