#![no_main]

use facturx::compliance::ComplianceValidator;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let report = ComplianceValidator::without_external_tool().validate(data);
    if !report.has_xml {
        assert!(report.facturx_validation.is_none());
    }
});
