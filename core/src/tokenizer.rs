use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Any maximal run of non [A-Za-z] characters separates words, tab included.
    static ref WORD: Regex = Regex::new(r"[A-Za-z]+").expect("valid regex");
}

/// Split text into lowercase ASCII-letter words. Empty words never occur.
pub fn tokenize(text: &str) -> Vec<String> {
    WORD.find_iter(text)
        .map(|m| m.as_str().to_ascii_lowercase())
        .collect()
}

/// Number of words `tokenize` would produce, without allocating them.
pub fn count_tokens(text: &str) -> usize {
    WORD.find_iter(text).count()
}
