use calamine::Data;

/// Row label: the cell's display text, trimmed and upper-cased.
pub fn cell_label(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_uppercase(),
        other => other.to_string().trim().to_uppercase(),
    }
}

/// Only genuinely numeric cells count; text that happens to look like a
/// number (e.g. `"1,000"`) does not.
pub fn numeric_value(cell: &Data) -> Option<f64> {
    match cell {
        Data::Float(f) if f.is_finite() => Some(*f),
        Data::Int(i) => Some(*i as f64),
        _ => None,
    }
}

/// Last numeric cell scanning the row left to right.
pub fn last_numeric(row: &[Data]) -> Option<f64> {
    row.iter().rev().find_map(numeric_value)
}
