/// Normalize an element key so that aliases collide.
///
/// Zero-width characters are removed, the key is
/// trimmed and lowercased, and every run of whitespace becomes a single `_`.
/// `"Settings Button"` and `"settings   button"` both become `settings_button`.
pub fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| {
            !matches!(
                *c,
                '\u{200B}' | // zero-width space
                '\u{200C}' | // zero-width non-joiner
                '\u{200D}' | // zero-width joiner
                '\u{FEFF}' // zero-width no-break space
            )
        })
        .collect::<String>()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}
