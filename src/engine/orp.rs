/// Optimal recognition point: the 0-based character index to fixate on.
pub fn orp_index(word: &str) -> usize {
    word.chars().count() / 3
}

const CLOSING_MARKS: &[char] = &['"', '\'', ')', ']', '”', '’', '»'];

/// Whether a token ends a sentence (`.`, `!` or `?`, ignoring trailing
/// closing quotes and brackets).
pub fn ends_sentence(word: &str) -> bool {
    word.trim_end_matches(CLOSING_MARKS)
        .chars()
        .last()
        .is_some_and(|ch| matches!(ch, '.' | '!' | '?'))
}

/// One word of a display frame with its fixation letter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramedWord {
    pub text: String,
    pub orp: usize,
}

impl FramedWord {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            orp: orp_index(text),
        }
    }

    /// Split the word around its ORP letter: `(before, orp, after)`.
    pub fn split(&self) -> (&str, &str, &str) {
        let mut indices = self.text.char_indices().skip(self.orp);
        match indices.next() {
            Some((start, ch)) => {
                let end = start + ch.len_utf8();
                (&self.text[..start], &self.text[start..end], &self.text[end..])
            }
            None => (self.text.as_str(), "", ""),
        }
    }
}

pub fn frame_words(words: &[String]) -> Vec<FramedWord> {
    words.iter().map(|w| FramedWord::new(w)).collect()
}
