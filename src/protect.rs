//! Placeholder tokens that shield spans of text from later rewriting passes.
//!
//! A token is an ASCII body such as `MATH3` fenced by two private-use
//! characters. Those characters are removed from every source before any
//! token is minted, so a token can never collide with document text, and
//! neither the regex rewriters nor the Markdown engine give them any meaning.

use std::borrow::Cow;

use regex::{Captures, Regex};

/// Opening sentinel of every token.
pub const TOKEN_OPEN: char = '\u{E000}';
/// Closing sentinel of every token.
pub const TOKEN_CLOSE: char = '\u{E001}';

/// Removes sentinel characters from untrusted input.
pub fn strip_sentinels(text: &str) -> Cow<'_, str> {
    if text.contains([TOKEN_OPEN, TOKEN_CLOSE]) {
        Cow::Owned(
            text.chars()
                .filter(|c| *c != TOKEN_OPEN && *c != TOKEN_CLOSE)
                .collect(),
        )
    } else {
        Cow::Borrowed(text)
    }
}

/// Whether `text` still carries at least one token.
pub fn contains_token(text: &str) -> bool {
    text.contains(TOKEN_OPEN)
}

/// Where a protected value sits in the surrounding text.
pub trait Placement {
    /// Block values get their token padded with blank lines so the Markdown
    /// engine parses it as a paragraph of its own.
    fn is_block(&self) -> bool {
        false
    }
}

impl Placement for String {}

/// Insertion-ordered map from token to the value it stands for.
#[derive(Debug, Clone)]
pub struct TokenMap<T> {
    kind: &'static str,
    next: usize,
    entries: Vec<(String, T)>,
}

impl<T: Placement> TokenMap<T> {
    /// Creates an empty map whose tokens read `<kind><n>`.
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            next: 0,
            entries: Vec::new(),
        }
    }

    /// Stores `value` and returns its bare token.
    pub fn insert(&mut self, value: T) -> String {
        let token = format!("{TOKEN_OPEN}{}{}{TOKEN_CLOSE}", self.kind, self.next);
        self.next += 1;
        self.entries.push((token.clone(), value));
        token
    }

    /// Stores `value` and returns the text to splice in its place, padded
    /// with blank lines for block values.
    pub fn insert_placed(&mut self, value: T) -> String {
        let block = value.is_block();
        let token = self.insert(value);
        if block {
            format!("\n\n{token}\n\n")
        } else {
            token
        }
    }

    /// Replaces every match of `pattern` for which `classify` yields a value.
    ///
    /// Matches that already contain a token are left alone: a span consumed
    /// by an earlier pass is never swallowed by a later one.
    pub fn protect<F>(&mut self, text: &str, pattern: &Regex, mut classify: F) -> String
    where
        F: FnMut(&Captures<'_>) -> Option<T>,
    {
        pattern
            .replace_all(text, |caps: &Captures<'_>| {
                let whole = &caps[0];
                if contains_token(whole) {
                    return whole.to_owned();
                }
                match classify(caps) {
                    Some(value) => self.insert_placed(value),
                    None => whole.to_owned(),
                }
            })
            .into_owned()
    }

    /// Substitutes every token found in `text` with its rendering, using
    /// literal string replacement.
    pub fn restore<F>(&self, text: &str, mut render: F) -> String
    where
        F: FnMut(&T) -> String,
    {
        let mut out = text.to_owned();
        for (token, value) in &self.entries {
            if out.contains(token.as_str()) {
                out = out.replace(token.as_str(), &render(value));
            }
        }
        out
    }

    /// Drops entries whose token no longer occurs in `text`, returning how
    /// many were dropped.
    pub fn retain_present(&mut self, text: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(token, _)| text.contains(token.as_str()));
        before - self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries
            .iter()
            .map(|(token, value)| (token.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Block(&'static str);

    impl Placement for Block {
        fn is_block(&self) -> bool {
            true
        }
    }

    #[test]
    fn tokens_are_unique_and_fenced() {
        let mut map = TokenMap::new("CODE");
        let first = map.insert(String::from("a"));
        let second = map.insert(String::from("b"));

        assert_ne!(first, second);
        assert!(first.starts_with(TOKEN_OPEN) && first.ends_with(TOKEN_CLOSE));
        assert_eq!(map.len(), 2);
        assert_eq!(map.restore(&second, |value| value.clone()), "b");
    }

    #[test]
    fn block_values_are_padded() {
        let mut map = TokenMap::new("BLK");
        let placed = map.insert_placed(Block("x"));
        assert!(placed.starts_with("\n\n") && placed.ends_with("\n\n"));
    }

    #[test]
    fn restore_is_literal() {
        let mut map = TokenMap::new("CODE");
        let token = map.insert(String::from("$1 \\d+ (.*)"));
        let restored = map.restore(&format!("before {token} after"), |code| code.clone());
        assert_eq!(restored, "before $1 \\d+ (.*) after");
    }

    #[test]
    fn ten_does_not_shadow_one() {
        let mut map = TokenMap::new("T");
        let tokens: Vec<String> = (0..11).map(|i| map.insert(i.to_string())).collect();
        let text = format!("{} {}", tokens[1], tokens[10]);
        assert_eq!(map.restore(&text, |v| format!("<{v}>")), "<1> <10>");
    }

    #[test]
    fn protect_skips_spans_holding_tokens() {
        let mut map = TokenMap::new("X");
        let inner = map.insert(String::from("inner"));
        let pattern = Regex::new(r"\[[^\]]*\]").unwrap();
        let text = format!("[plain] [with {inner}]");

        let protected = map.protect(&text, &pattern, |caps| Some(caps[0].to_owned()));

        assert!(protected.ends_with(&format!("[with {inner}]")));
        assert!(!protected.contains("[plain]"));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn retain_present_drops_orphans() {
        let mut map = TokenMap::new("M");
        let kept = map.insert(String::from("kept"));
        map.insert(String::from("gone"));

        assert_eq!(map.retain_present(&format!("only {kept}")), 1);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn sentinels_are_stripped_from_input() {
        let hostile = format!("a{TOKEN_OPEN}MATH0{TOKEN_CLOSE}b");
        assert_eq!(strip_sentinels(&hostile), "aMATH0b");
        assert!(matches!(strip_sentinels("plain"), Cow::Borrowed(_)));
    }
}
