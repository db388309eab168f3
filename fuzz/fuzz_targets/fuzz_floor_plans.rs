#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(html) = std::str::from_utf8(data) {
        let plans = house_catalog::adapters::scraper::project_parser::extract_floor_plans(html);
        assert!(plans.len() <= 2);
    }
});
