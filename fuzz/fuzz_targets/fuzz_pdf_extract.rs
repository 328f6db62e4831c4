#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes as PDF input, must not panic.
    let _ = facturx::facturx::extract_xml(data);
    let _ = facturx::facturx::embedded_file_names(data);
});
