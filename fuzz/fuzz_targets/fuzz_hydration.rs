#![no_main]
use house_catalog::adapters::scraper::hydration::{
    find_project, hydrated_floor_plans, hydrated_material,
};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(data)
        && let Some(project) = find_project(&value, 20)
    {
        let _ = hydrated_material(project);
        let _ = hydrated_floor_plans(project, "https://строим.дом.рф");
    }
});
