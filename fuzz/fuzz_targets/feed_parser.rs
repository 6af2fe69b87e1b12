#![no_main]

use libfuzzer_sys::fuzz_target;

use newsharvest::feed::{IndexHeuristics, parse};
use newsharvest::extractor::fulltext::extract_full_text;

fuzz_target!(|data: &[u8]| {
    // Feeds arrive already decoded, possibly with replacement characters
    let body = String::from_utf8_lossy(data);

    // Classification must never panic, whatever the payload looks like
    let _ = parse(&body, "https://www.sme.sk/rss-title", &IndexHeuristics::default());
    let _ = extract_full_text(&body);
});
