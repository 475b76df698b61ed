use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

pub const MAX_FILENAME_LEN: usize = 64;

/// Reduces arbitrary text to a conservative filename fragment.
///
/// Accents are decomposed and dropped, anything outside `[A-Za-z0-9._ -]`
/// becomes a space, whitespace runs collapse to `_`, and the result is cut to
/// [`MAX_FILENAME_LEN`] characters.
pub fn sanitize_for_filename(input: &str) -> String {
    let cleaned: String = input
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| if is_allowed(c) { c } else { ' ' })
        .collect();

    cleaned
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .take(MAX_FILENAME_LEN)
        .collect()
}

fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ' ')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_accents_and_collapses_spaces() {
        assert_eq!(sanitize_for_filename("  Café   au lait!  "), "Cafe_au_lait");
    }

    #[test]
    fn empty_input_is_empty_output() {
        assert_eq!(sanitize_for_filename(""), "");
        assert_eq!(sanitize_for_filename("  ★ ☆ "), "");
    }

    #[test]
    fn replaces_path_separators() {
        assert_eq!(sanitize_for_filename("a/b\\c:d"), "a_b_c_d");
    }

    #[test]
    fn output_obeys_invariants() {
        let inputs = [
            "A very long prompt about a cat riding a skateboard through neon-lit Tokyo at night, cinematic",
            "\tleading and trailing\n",
            "日本語のプロンプト with ascii",
            "dots...and---dashes___",
        ];
        for input in inputs {
            let out = sanitize_for_filename(input);
            assert!(out.chars().count() <= MAX_FILENAME_LEN, "{out}");
            assert!(out.chars().all(|c| is_allowed(c) && c != ' '), "{out}");
            assert_eq!(out.trim(), out);
        }
    }
}
