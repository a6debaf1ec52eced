#![no_main]

use libfuzzer_sys::fuzz_target;
use qorcompare::advisory::validate_template;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Template validation sees user config; any input must be rejected
        // or accepted without panicking
        let _ = validate_template(input);
    }
});
