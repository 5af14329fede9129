/// Truncate a string to `max_chars` characters, appending "..." if truncated.
///
/// Counts `char`s, not bytes, so accented names and multi-byte error text
/// never split inside a code point.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_chars_short() {
        assert_eq!(truncate_chars("hola", 10), "hola");
        assert_eq!(truncate_chars("", 5), "");
    }

    #[test]
    fn truncate_chars_exact() {
        assert_eq!(truncate_chars("hola", 4), "hola");
    }

    #[test]
    fn truncate_chars_long() {
        assert_eq!(truncate_chars("hola mundo", 7), "hola...");
        assert_eq!(truncate_chars("abc", 2), "...");
    }

    #[test]
    fn truncate_chars_multibyte() {
        // 'ó' is two bytes; byte slicing at 5 would panic
        assert_eq!(truncate_chars("Poblaciónal", 8), "Pobla...");
    }
}
