#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary tokens must be rejected with an error, never a panic
    if let Ok(token) = std::str::from_utf8(data) {
        let verifier = dbwarden_server::ClaimVerifier::new("fuzz-secret");
        let _ = verifier.verify(token);
    }
});
