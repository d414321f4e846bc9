//! Comparison keys for human-typed store names.

/// Canonicalize a store name into the join key shared by every stream.
///
/// Trims surrounding whitespace and lowercases (Unicode-aware). Missing or
/// blank names produce an empty key, which never identifies a customer.
#[must_use]
pub fn normalize(name: Option<&str>) -> String {
    name.map(|n| n.trim().to_lowercase()).unwrap_or_default()
}

/// Returns the value when it holds something other than whitespace.
pub(crate) fn present(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_and_lowercases() {
        assert_eq!(normalize(Some("  Pharmacy One ")), "pharmacy one");
    }

    #[test]
    fn none_and_blank_become_empty() {
        assert_eq!(normalize(None), "");
        assert_eq!(normalize(Some("   \t")), "");
    }

    #[test]
    fn casing_variants_share_a_key() {
        let variants = ["Pharmacy One", " pharmacy one ", "PHARMACY ONE"];
        let keys: Vec<String> = variants.iter().map(|v| normalize(Some(v))).collect();
        assert!(keys.iter().all(|k| k == "pharmacy one"));
    }

    #[test]
    fn non_ascii_letters_are_folded() {
        assert_eq!(normalize(Some("ÇAFÉ Nord")), "çafé nord");
    }

    #[test]
    fn scripts_without_case_pass_through() {
        assert_eq!(normalize(Some(" داروخانه ")), "داروخانه");
    }

    #[test]
    fn inner_whitespace_is_kept() {
        assert_eq!(normalize(Some("Corner  Shop")), "corner  shop");
    }

    #[test]
    fn present_rejects_blank_strings() {
        let blank = " ".to_string();
        let filled = "0912".to_string();
        assert_eq!(present(Some(&blank)), None);
        assert_eq!(present(Some(&filled)), Some("0912"));
        assert_eq!(present(None), None);
    }
}
