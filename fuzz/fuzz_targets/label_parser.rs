#![no_main]

use difftriage::normalize::{normalize, RawLabel};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Must either parse or return MalformedLabel, never panic
        let raw: Vec<(RawLabel, u64)> = input
            .split(',')
            .map(|label| (RawLabel::from(label), 1))
            .collect();
        let _ = normalize(&raw);
    }

    // Raw bit vectors take the other label path
    let _ = RawLabel::from(data.to_vec()).to_index();
});
