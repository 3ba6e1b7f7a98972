// page/split_text.rs - Splitting element text into lines, words and characters

/// Words separated by any whitespace
pub fn split_words(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}

/// Lines at explicit line breaks, whitespace collapsed, blank lines dropped
pub fn split_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect()
}

/// Visible characters (whitespace carries no glyph)
pub fn split_chars(text: &str) -> Vec<char> {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_words() {
        assert_eq!(split_words("  Made  to\tlast "), vec!["Made", "to", "last"]);
        assert!(split_words("   ").is_empty());
    }

    #[test]
    fn test_lines() {
        let lines = split_lines("We carve\n\n   what   stays \nforever");
        assert_eq!(lines, vec!["We carve", "what stays", "forever"]);
    }

    #[test]
    fn test_chars() {
        assert_eq!(split_chars("a b\nc"), vec!['a', 'b', 'c']);
    }
}
