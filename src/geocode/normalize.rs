//! Turkish-aware text folding for comparing state names.

/// Uppercase `s` and fold Turkish letters to their plain ASCII capitals.
///
/// Total and idempotent: `normalize(normalize(x)) == normalize(x)`.
pub fn normalize(s: &str) -> String {
    s.to_uppercase().chars().map(fold_char).collect()
}

fn fold_char(c: char) -> char {
    match c {
        'İ' | 'Î' => 'I',
        'Ö' => 'O',
        'Ü' | 'Û' => 'U',
        'Ş' => 'S',
        'Ç' => 'C',
        'Ğ' => 'G',
        'Â' => 'A',
        _ => c,
    }
}

/// First `n` characters of `s`, or all of it when shorter.
pub fn prefix(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
