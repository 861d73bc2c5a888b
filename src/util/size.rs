//! Byte-size helpers.

/// Convert kilobytes to bytes.
#[inline]
pub const fn kb(n: usize) -> usize {
    n * 1024
}

/// Convert megabytes to bytes.
#[inline]
pub const fn mb(n: usize) -> usize {
    n * 1024 * 1024
}

/// Convert gigabytes to bytes.
#[inline]
pub const fn gb(n: usize) -> usize {
    n * 1024 * 1024 * 1024
}

/// `value * numerator / denominator` without intermediate overflow.
///
/// Returns 0 when `denominator` is 0. The result never exceeds `value` as
/// long as `numerator <= denominator`.
#[inline]
pub fn scale(value: usize, numerator: usize, denominator: usize) -> usize {
    if denominator == 0 {
        return 0;
    }
    (value as u128 * numerator as u128 / denominator as u128) as usize
}

/// `percent`% of `value`, with `percent` clamped to 100.
#[inline]
pub fn percent_of(value: usize, percent: u8) -> usize {
    scale(value, percent.min(100) as usize, 100)
}

/// Format bytes as a human-readable string.
pub fn format_bytes(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;
    const GB: usize = MB * 1024;

    match bytes {
        b if b >= GB => format!("{:.2} GB", b as f64 / GB as f64),
        b if b >= MB => format!("{:.2} MB", b as f64 / MB as f64),
        b if b >= KB => format!("{:.2} KB", b as f64 / KB as f64),
        b => format!("{} B", b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale() {
        assert_eq!(scale(600, 1000, 1200), 500);
        assert_eq!(scale(usize::MAX, 1, 2), usize::MAX / 2);
        assert_eq!(scale(10, 3, 0), 0);
    }

    #[test]
    fn test_percent_of() {
        assert_eq!(percent_of(300, 50), 150);
        assert_eq!(percent_of(300, 250), 300);
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(500), "500 B");
        assert_eq!(format_bytes(kb(1)), "1.00 KB");
        assert_eq!(format_bytes(mb(256)), "256.00 MB");
        assert_eq!(format_bytes(gb(1)), "1.00 GB");
    }
}
