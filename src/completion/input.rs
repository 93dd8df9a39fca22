//! Partial command lines as the shell hands them over.

/// The tokens before the cursor plus the word being completed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialInput {
    pub tokens: Vec<String>,
    pub partial_word: String,
}

impl PartialInput {
    pub fn new(tokens: Vec<String>, partial_word: impl Into<String>) -> Self {
        Self {
            tokens,
            partial_word: partial_word.into(),
        }
    }

    /// Splits already tokenized words: the last one is the partial word. An empty list
    /// completes from the root with nothing typed.
    pub fn from_words<S: AsRef<str>>(words: &[S]) -> Self {
        match words.split_last() {
            Some((last, rest)) => Self::new(
                rest.iter().map(|w| w.as_ref().to_string()).collect(),
                last.as_ref(),
            ),
            None => Self::default(),
        }
    }

    /// Parses a `COMP_LINE`/`COMP_POINT` pair. `point` counts characters, as bash reports
    /// it. Text after the cursor is ignored and the first `skip` words (the program name, a
    /// subcommand) are dropped. A line ending in whitespace completes a fresh, empty word.
    pub fn from_comp_line(line: &str, point: Option<usize>, skip: usize) -> Self {
        let (words, partial_word) = split_before_cursor(line, point);
        let tokens = words.into_iter().skip(skip).collect();
        Self::new(tokens, partial_word)
    }

    /// Like [`from_comp_line`](Self::from_comp_line), but drops every word up to and
    /// including the first `marker` after the program name. Returns `None` while the cursor
    /// has not yet passed a `marker` word.
    pub fn from_comp_line_after(line: &str, point: Option<usize>, marker: &str) -> Option<Self> {
        let (words, partial_word) = split_before_cursor(line, point);
        let at = words.iter().skip(1).position(|w| w == marker)? + 1;
        let tokens = words.into_iter().skip(at + 1).collect();
        Some(Self::new(tokens, partial_word))
    }

    /// True when `candidate` extends the partial word.
    pub fn admits(&self, candidate: &str) -> bool {
        candidate.starts_with(&self.partial_word)
    }
}

/// Confirmed words before the cursor and the partial word under it.
fn split_before_cursor(line: &str, point: Option<usize>) -> (Vec<String>, String) {
    let end = point
        .and_then(|chars| line.char_indices().nth(chars).map(|(byte, _)| byte))
        .unwrap_or(line.len());
    let (mut words, open) = split_words(&line[..end]);
    let partial_word = if open { words.pop().unwrap_or_default() } else { String::new() };
    (words, partial_word)
}

/// Shell-style word splitting with single quotes, double quotes and backslash escapes.
/// Returns the words and whether the last one is still open (no trailing separator).
fn split_words(text: &str) -> (Vec<String>, bool) {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;
    let mut chars = text.chars();

    while let Some(ch) = chars.next() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some('"'), '\\') | (None, '\\') => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
                in_word = true;
            }
            (Some(_), c) => current.push(c),
            (None, '\'' | '"') => {
                quote = Some(ch);
                in_word = true;
            }
            (None, ' ' | '\t' | '\n') => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            (None, c) => {
                current.push(c);
                in_word = true;
            }
        }
    }
    if in_word {
        words.push(current);
    }
    (words, in_word)
}

/// Renders candidates the way shell hooks read them: one per line.
pub fn format_reply<'a>(candidates: impl IntoIterator<Item = &'a String>) -> String {
    candidates
        .into_iter()
        .map(|c| format!("{c}\n"))
        .collect()
}
