// Output formatting — terminal display for shortlists, drafts, and logs.

pub mod terminal;

/// Cut `text` down to `max_chars` characters, marking the cut with "...".
///
/// Titles scraped from Reddit and X routinely carry emoji and accented
/// characters, so the cut must land on a char boundary — a plain byte
/// slice (`&text[..48]`) could panic mid-character.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        None => text.to_string(),
        Some((cut, _)) => format!("{}...", &text[..cut]),
    }
}
