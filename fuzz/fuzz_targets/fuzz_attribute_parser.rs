#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(dbauth) = std::str::from_utf8(data) {
        let parsed = dbwarden::parse(dbauth);

        // Every entry yields at most one rule or one error
        let entries = dbauth.split(',').count();
        assert!(parsed.rules.len() + parsed.errors.len() <= entries);

        for rule in &parsed.rules {
            assert!(!rule.resource.as_str().is_empty());
        }
    }
});
