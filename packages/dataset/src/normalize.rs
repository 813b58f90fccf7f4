//! Region name normalization.
//!
//! State and district names arrive with inconsistent casing, stray
//! whitespace, and several spellings of the same union territory. The
//! pipeline applied here is deterministic and idempotent:
//!
//! 1. Trim
//! 2. Title-case (Python `str.title` rules)
//! 3. Collapse known aliases to one canonical spelling (states only)

/// Known duplicate spellings of the same state/UT, after title-casing.
const STATE_ALIASES: &[(&str, &str)] = &[
    ("A & N Island", "A&N Islands"),
    ("A & N Islands", "A&N Islands"),
    ("A&N Island", "A&N Islands"),
    ("A And N Island", "A&N Islands"),
    ("A And N Islands", "A&N Islands"),
    ("Andaman & Nicobar Islands", "A&N Islands"),
    ("D & N Haveli", "D&N Haveli"),
    ("Dadra & Nagar Haveli", "D&N Haveli"),
    ("D & N Haveli And Daman & Diu", "D&N Haveli And Daman & Diu"),
];

/// Title-cases `input`: a letter is upper-cased when it does not follow
/// another letter and lower-cased otherwise.
#[must_use]
pub fn title_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut prev_is_letter = false;
    for ch in input.chars() {
        if ch.is_alphabetic() {
            if prev_is_letter {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            out.push(ch);
            prev_is_letter = false;
        }
    }
    out
}

/// Maps an alias to its canonical state name. Canonical names and unknown
/// names pass through unchanged.
#[must_use]
pub fn canonical_alias(state: &str) -> &str {
    STATE_ALIASES
        .iter()
        .find(|(alias, _)| *alias == state)
        .map_or(state, |(_, canonical)| canonical)
}

/// Normalizes a state/UT name to its canonical form.
#[must_use]
pub fn normalize_state(state: &str) -> String {
    let titled = title_case(state.trim());
    canonical_alias(&titled).to_string()
}

/// Normalizes a district name (trim + title-case).
#[must_use]
pub fn normalize_district(district: &str) -> String {
    title_case(district.trim())
}

/// Whether `district` is a pre-aggregated state total row.
#[must_use]
pub fn is_total_district(district: &str) -> bool {
    district.trim().eq_ignore_ascii_case("total")
}
