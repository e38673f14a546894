#![no_main]
use libfuzzer_sys::fuzz_target;
use scalelink_core::parser::{decode, extract_reading};

fuzz_target!(|frame: &[u8]| {
    let _ = decode(frame);
    if let Some(tok) = extract_reading(frame) {
        let (int, frac) = tok.split_once('.').expect("token has a dot");
        assert!(!int.is_empty() && int.bytes().all(|b| b.is_ascii_digit()));
        assert!(!frac.is_empty() && frac.bytes().all(|b| b.is_ascii_digit()));
    }
});
