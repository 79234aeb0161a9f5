/// Format a count with thousands separators: 1,234
pub fn count(n: usize) -> String {
    let digits = n.to_string();
    let mut with_commas = String::new();
    for (i, c) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_commas.push(',');
        }
        with_commas.push(c);
    }
    with_commas.chars().rev().collect()
}

/// Whole kilobytes, rounded down: 2048 -> "2 KB"
pub fn kilobytes(bytes: u64) -> String {
    format!("{} KB", count((bytes / 1024) as usize))
}
