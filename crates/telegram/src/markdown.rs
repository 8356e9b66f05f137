/// Telegram message size limit.
pub const TELEGRAM_MAX_MESSAGE_LEN: usize = 4096;

/// Largest index `<= max` that sits on a char boundary of `text`.
fn char_boundary_at_or_before(text: &str, max: usize) -> usize {
    if max >= text.len() {
        return text.len();
    }
    (0..=max)
        .rev()
        .find(|i| text.is_char_boundary(*i))
        .unwrap_or(0)
}

/// Split text into chunks that fit within Telegram's message limit.
/// Prefers splitting at a newline, then a space, and never splits a char.
pub fn chunk_message(text: &str, max_len: usize) -> Vec<String> {
    if max_len == 0 {
        return Vec::new();
    }
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        if remaining.len() <= max_len {
            if !remaining.trim().is_empty() {
                chunks.push(remaining.to_string());
            }
            break;
        }

        let mut window = char_boundary_at_or_before(remaining, max_len);
        if window == 0 {
            // A single char wider than the limit; emit it whole.
            window = remaining.chars().next().map_or(remaining.len(), char::len_utf8);
        }

        let slice = &remaining[..window];
        let split_at = match slice.rfind('\n').or_else(|| slice.rfind(' ')) {
            Some(0) | None => window,
            Some(i) => i,
        };

        let chunk = &remaining[..split_at];
        if !chunk.trim().is_empty() {
            chunks.push(chunk.to_string());
        }
        remaining = remaining[split_at..].trim_start_matches('\n');
        remaining = remaining.strip_prefix(' ').unwrap_or(remaining);
    }

    chunks
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[test]
    fn short_text_is_one_chunk() {
        assert_eq!(chunk_message("hello", 10), vec!["hello"]);
    }

    #[test]
    fn zero_limit_yields_nothing() {
        assert!(chunk_message("hello", 0).is_empty());
    }

    #[rstest]
    #[case("aaaa\nbbbb", 6, vec!["aaaa", "bbbb"])]
    #[case("aaaa bbbb", 6, vec!["aaaa", "bbbb"])]
    #[case("aaaaaaaa", 3, vec!["aaa", "aaa", "aa"])]
    fn splits_at_natural_boundaries(
        #[case] text: &str,
        #[case] max: usize,
        #[case] expected: Vec<&str>,
    ) {
        assert_eq!(chunk_message(text, max), expected);
    }

    #[test]
    fn never_splits_inside_a_char() {
        let text = "🙂🙂🙂";
        let chunks = chunk_message(text, 5);
        assert_eq!(chunks, vec!["🙂", "🙂", "🙂"]);
    }

    #[test]
    fn whitespace_only_tail_is_dropped() {
        let text = format!("answer {}", " ".repeat(20));
        let chunks = chunk_message(&text, 10);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].trim(), "answer");
    }

    #[test]
    fn every_chunk_fits() {
        let text = "word ".repeat(2_000);
        let chunks = chunk_message(&text, TELEGRAM_MAX_MESSAGE_LEN);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.len() <= TELEGRAM_MAX_MESSAGE_LEN));
    }
}
