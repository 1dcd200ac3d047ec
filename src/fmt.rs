/// Format an integer with thousands separators: 1,234,567
pub fn number(val: i64) -> String {
    let digits = val.unsigned_abs().to_string();
    let mut with_commas = String::new();
    for (i, c) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_commas.push(',');
        }
        with_commas.push(c);
    }
    let with_commas: String = with_commas.chars().rev().collect();
    if val < 0 {
        format!("-{with_commas}")
    } else {
        with_commas
    }
}

pub fn count(val: usize) -> String {
    number(val as i64)
}

/// One decimal place: 33.3%
pub fn percent(val: f64) -> String {
    format!("{val:.1}%")
}

/// Horizontal bar scaled so that `max` fills `width` cells.
pub fn text_bar(value: f64, max: f64, width: usize) -> String {
    if width == 0 || max <= 0.0 || value <= 0.0 {
        return String::new();
    }
    let cells = ((value / max) * width as f64).round() as usize;
    "█".repeat(cells.clamp(1, width))
}
