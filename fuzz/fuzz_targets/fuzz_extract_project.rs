#![no_main]
use house_catalog::adapters::scraper::project_parser::{ExtractOptions, extract_project};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(html) = std::str::from_utf8(data) {
        let options = ExtractOptions::default().skipping_eligibility(true);
        let _ = extract_project(html, 77279, &options);
        let _ = extract_project(html, 77279, &ExtractOptions::default());
    }
});
