/// Split a message into contiguous fixed-size chunks for transports with a
/// message-length limit. Char-based so multibyte text never splits inside a
/// character; no word-boundary awareness.
pub fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max_chars {
        return vec![text.to_string()];
    }

    chars
        .chunks(max_chars)
        .map(|chunk| chunk.iter().collect())
        .collect()
}
