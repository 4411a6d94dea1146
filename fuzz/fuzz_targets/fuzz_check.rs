#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(data) {
        let _ = mandate_core::schema::check(&value, "fuzz.json", true);
        if let Ok(config) = serde_json::from_value(value) {
            let _ = mandate_core::matrix::AuthorityMatrix::from_config(config);
        }
    }
});
