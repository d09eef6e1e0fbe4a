use regex::{Captures, Regex, RegexBuilder};

use crate::index::{InvertedIndex, Posting};

const BOLD: &str = "\x1b[1m";
const RED: &str = "\x1b[31m";
const BOLD_RED: &str = "\x1b[1;31m";
const RESET: &str = "\x1b[0m";

/// Case-insensitive whole-word matcher for the given keywords.
pub fn keyword_pattern<S: AsRef<str>>(keywords: &[S]) -> Option<Regex> {
    let alternatives: Vec<String> = keywords
        .iter()
        .map(AsRef::<str>::as_ref)
        .filter(|k| !k.is_empty())
        .map(regex::escape)
        .collect();
    if alternatives.is_empty() {
        return None;
    }
    RegexBuilder::new(&format!(r"\b({})\b", alternatives.join("|")))
        .case_insensitive(true)
        .build()
        .ok()
}

/// Wrap every keyword occurrence in `open` .. `close`.
pub fn highlight(text: &str, pattern: Option<&Regex>, open: &str, close: &str) -> String {
    match pattern {
        Some(re) => re
            .replace_all(text, |caps: &Captures| format!("{open}{}{close}", &caps[0]))
            .into_owned(),
        None => text.to_string(),
    }
}

/// Terminal listing of the top `k` hits followed by the hit count.
///
/// Titles are bold with keywords in bold red, descriptions have keywords in red.
pub fn render_hits<S: AsRef<str>>(index: &InvertedIndex, hits: &[Posting], keywords: &[S], k: usize) -> String {
    let pattern = keyword_pattern(keywords);
    let mut out = String::new();
    for hit in hits.iter().take(k) {
        let Some(doc) = index.document(hit.doc_id) else { continue };
        // Restore bold after each highlighted keyword in the title.
        let title = highlight(&doc.title, pattern.as_ref(), &format!("{RESET}{BOLD_RED}"), &format!("{RESET}{BOLD}"));
        let desc = highlight(&doc.description, pattern.as_ref(), RED, RESET);
        out.push_str(&format!("\n{BOLD}{title}{RESET}\n{desc}\n"));
    }
    out.push_str(&format!("\n# total hits: {}.\n", hits.len()));
    out
}
