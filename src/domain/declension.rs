/// Pick the Russian noun form agreeing with `n`: one / few (2-4) / many.
pub fn plural_ru<'a>(n: u64, one: &'a str, few: &'a str, many: &'a str) -> &'a str {
    let last_two = n % 100;
    let last = n % 10;
    if (11..=14).contains(&last_two) {
        many
    } else if last == 1 {
        one
    } else if (2..=4).contains(&last) {
        few
    } else {
        many
    }
}

/// "1 спальня", "2 спальни", "5 спален".
pub fn declense_bedroom(n: u32) -> String {
    format!(
        "{n} {}",
        plural_ru(u64::from(n), "спальня", "спальни", "спален")
    )
}
