#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(Some((request, consumed))) = dbwarden_server::http::parse_request(data, 4096) {
        assert!(consumed <= data.len());
        let _ = request.segments();
    }
});
