//! Text normalisation shared by corpus loading and request handling.
//!
//! Corpus queries are normalised once at load time and every incoming
//! utterance goes through the same function before scoring, so lexical
//! comparisons are made between like-for-like strings.

/// Normalise an utterance: Unicode lowercase, then trim surrounding whitespace.
///
/// "  Reset My PASSWORD \n" → "reset my password"
pub fn normalize(text: &str) -> String {
    text.to_lowercase().trim().to_string()
}

/// Normalise an intent label: trim only, labels keep their casing.
pub fn normalize_label(label: &str) -> String {
    label.trim().to_string()
}

/// True when the text has no content once whitespace is ignored.
pub fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_trims() {
        assert_eq!(normalize("  Reset My PASSWORD \n"), "reset my password");
    }

    #[test]
    fn keeps_inner_whitespace() {
        assert_eq!(normalize("Where  is\tthe office"), "where  is\tthe office");
    }

    #[test]
    fn unicode_lowercase() {
        assert_eq!(normalize("ÜBER Uns"), "über uns");
    }

    #[test]
    fn idempotent() {
        let once = normalize("  Hello World ");
        assert_eq!(normalize(&once), once);
    }

    #[test]
    fn label_keeps_case() {
        assert_eq!(normalize_label("  AccountReset "), "AccountReset");
    }

    #[test]
    fn blank_detection() {
        assert!(is_blank(""));
        assert!(is_blank(" \t\n"));
        assert!(!is_blank(" a "));
    }
}
