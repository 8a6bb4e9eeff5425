//! String casing helpers used to map URL segments to type and method names.

/// `"some-action"` with separator `-` gives `"someAction"`, or
/// `"SomeAction"` when `upper_first` is set.
pub fn separator_to_camel(s: &str, separator: &str, upper_first: bool) -> String {
    let mut out = String::with_capacity(s.len());

    for (i, word) in s.split(separator).filter(|w| !w.is_empty()).enumerate() {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            if i > 0 || upper_first {
                out.extend(first.to_uppercase());
            } else {
                out.extend(first.to_lowercase());
            }
            out.push_str(chars.as_str());
        }
    }

    out
}

/// `"someAction"` with separator `-` gives `"some-action"`.
pub fn camel_to_separator(s: &str, separator: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    let mut prev_lower = false;

    for c in s.chars() {
        if c.is_uppercase() && prev_lower {
            out.push_str(separator);
        }
        prev_lower = c.is_lowercase();
        out.extend(c.to_lowercase());
    }

    out
}

/// Lowercase the first character.
pub fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_separator_to_camel() {
        assert_eq!(separator_to_camel("some-action", "-", false), "someAction");
        assert_eq!(separator_to_camel("some-action", "-", true), "SomeAction");
        assert_eq!(separator_to_camel("index", "-", true), "Index");
        assert_eq!(separator_to_camel("a--b", "-", false), "aB");
        assert_eq!(separator_to_camel("", "-", true), "");
    }

    #[test]
    fn test_camel_to_separator() {
        assert_eq!(camel_to_separator("someAction", "-"), "some-action");
        assert_eq!(camel_to_separator("SomeOtherAction", "-"), "some-other-action");
        assert_eq!(camel_to_separator("already-separated", "-"), "already-separated");
        assert_eq!(camel_to_separator("HTML", "_"), "html");
    }

    #[test]
    fn test_lower_first() {
        assert_eq!(lower_first("Foo"), "foo");
        assert_eq!(lower_first(""), "");
    }
}
