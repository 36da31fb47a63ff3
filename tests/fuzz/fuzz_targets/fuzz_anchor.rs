#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Fragments come straight from the URL bar; decoding must never panic.
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = covlines::anchor::decode(s);
        let _ = covlines::deeplink::DeepLinkController::new("src/lib.rs", Some(s)).targeted(1..=64);
    }
});
