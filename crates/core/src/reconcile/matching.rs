//! Label normalization and line lookup.

use crate::statement::{Category, LineItem};

/// Normalizes a label for matching: lowercase, `&` becomes `and`, runs of
/// non-alphanumerics collapse to one space, trimmed.
///
/// `"R&D Software & Tools"` and `"r and d software  / tools"` both become
/// `"r and d software and tools"`.
#[must_use]
pub fn normalize_label(label: &str) -> String {
    let spaced = label.to_lowercase().replace('&', " and ");
    spaced
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Returns true if the normalized `label` contains the normalized `needle`
/// on word boundaries.
#[must_use]
pub fn label_contains(label: &str, needle: &str) -> bool {
    let needle = normalize_label(needle);
    if needle.is_empty() {
        return false;
    }
    format!(" {} ", normalize_label(label)).contains(&format!(" {needle} "))
}

/// Index of the first line in `category` whose label contains `needle`.
#[must_use]
pub fn find_in_category(lines: &[LineItem], category: Category, needle: &str) -> Option<usize> {
    lines
        .iter()
        .position(|l| l.category == category && label_contains(&l.label, needle))
}

/// Index of the first line whose normalized label equals the normalized
/// `label`, restricted to lines accepted by `filter`.
#[must_use]
pub fn find_by_label(
    lines: &[LineItem],
    label: &str,
    filter: impl Fn(&LineItem) -> bool,
) -> Option<usize> {
    let wanted = normalize_label(label);
    lines
        .iter()
        .position(|l| filter(l) && normalize_label(&l.label) == wanted)
}

/// Ledger line a payroll department is attributed to, within `category`:
/// first a line naming both the department and payroll, then any payroll
/// line, then the first line of the category.
#[must_use]
pub fn payroll_line(lines: &[LineItem], category: Category, department: &str) -> Option<usize> {
    let in_category = |l: &LineItem| l.category == category;
    lines
        .iter()
        .position(|l| {
            in_category(l) && label_contains(&l.label, department) && label_contains(&l.label, "payroll")
        })
        .or_else(|| find_in_category(lines, category, "payroll"))
        .or_else(|| lines.iter().position(in_category))
}
