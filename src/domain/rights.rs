//! Rights normalization
//!
//! The legacy repository records licenses as short codes. Only the codes
//! below are recognized; anything else is dropped with a warning.

use tracing::warn;

const RIGHTS_MAP: &[(&str, &str)] = &[
    ("public", "public"),
    ("cc1", "CC BY"),
    ("cc2", "CC BY-SA"),
    ("cc3", "CC BY-ND"),
    ("cc4", "CC BY-NC"),
    ("cc5", "CC BY-NC-SA"),
    ("cc6", "CC BY-NC-ND"),
];

/// Map a legacy rights code to its canonical license string.
/// Unrecognized values are dropped, never fatal.
pub fn normalize_rights(code: &str) -> Option<String> {
    let code = code.trim();
    if code.is_empty() {
        return None;
    }
    match RIGHTS_MAP.iter().find(|(c, _)| *c == code) {
        Some((_, canonical)) => Some((*canonical).to_string()),
        None => {
            warn!(code, "Unrecognized rights code, dropping");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_map_to_licenses() {
        assert_eq!(normalize_rights("cc1").as_deref(), Some("CC BY"));
        assert_eq!(normalize_rights("public").as_deref(), Some("public"));
    }

    #[test]
    fn unknown_codes_are_dropped() {
        assert_eq!(normalize_rights("gpl3"), None);
        assert_eq!(normalize_rights(""), None);
    }
}
