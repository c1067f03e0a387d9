#![no_main]

use libfuzzer_sys::fuzz_target;
use weavelog::{Matcher, Selector};

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Textual selectors: `/re/` patterns and literal names
        if let Ok(selector) = Selector::parse(input) {
            let _ = Matcher::compile(selector).matches(input);
        }

        // Dynamic selectors as they arrive from configuration
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(input) {
            let _ = Selector::try_from(&value);
        }
    }
});
