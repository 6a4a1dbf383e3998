//! Discipline code mapping
//!
//! Numeric discipline codes from the legacy taxonomy map through a fixed
//! lookup table to canonical labels. Unknown codes are dropped with a
//! warning; they never fail a conversion.

use tracing::warn;

const DISCIPLINE_MAP: &[(u32, &str)] = &[
    (100, "Architecture"),
    (110, "Arts and Humanities"),
    (120, "Business"),
    (130, "Education"),
    (140, "Engineering"),
    (150, "Law"),
    (160, "Life Sciences"),
    (170, "Medicine and Health Sciences"),
    (180, "Physical Sciences and Mathematics"),
    (190, "Social and Behavioral Sciences"),
    (200, "Agriculture"),
    (210, "Chemistry"),
    (220, "Computer Sciences"),
    (230, "Earth Sciences"),
    (240, "Environmental Sciences"),
    (250, "Psychology"),
];

/// Map one numeric discipline code to its canonical label.
pub fn map_discipline(code: &str) -> Option<&'static str> {
    let parsed: u32 = match code.trim().parse() {
        Ok(n) => n,
        Err(_) => {
            warn!(code, "Non-numeric discipline code, dropping");
            return None;
        }
    };
    match DISCIPLINE_MAP.iter().find(|(c, _)| *c == parsed) {
        Some((_, label)) => Some(label),
        None => {
            warn!(code, "Unknown discipline code, dropping");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_map() {
        assert_eq!(map_discipline("140"), Some("Engineering"));
        assert_eq!(map_discipline(" 220 "), Some("Computer Sciences"));
    }

    #[test]
    fn unknown_codes_drop_without_failing() {
        assert_eq!(map_discipline("9999"), None);
        assert_eq!(map_discipline("abc"), None);
    }
}
