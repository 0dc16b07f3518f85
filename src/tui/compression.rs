//! Placeholder tokens standing in for long pasted text.
//!
//! Long pastes are stored once and referenced from the input line as
//! `[LongText#N]`. Expansion happens at submit time and never mutates the map.

use std::collections::HashMap;

const TOKEN_PREFIX: &str = "[LongText#";
const TOKEN_SUFFIX: char = ']';

/// One stored paste.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedEntry {
    pub id: u64,
    pub original_text: String,
}

/// Session-lifetime store of compressed pastes keyed by id.
#[derive(Debug, Clone)]
pub struct CompressionCache {
    threshold: usize,
    next_id: u64,
    entries: HashMap<u64, CompressedEntry>,
}

impl CompressionCache {
    pub fn new(threshold: usize) -> Self {
        Self {
            threshold,
            next_id: 1,
            entries: HashMap::new(),
        }
    }

    /// Whether `text` is long enough to be compressed.
    pub fn should_compress(&self, text: &str) -> bool {
        text.chars().count() > self.threshold
    }

    /// Store `text` and return its placeholder, or return `text` unchanged
    /// when it is at or below the threshold.
    pub fn compress(&mut self, text: &str) -> String {
        if !self.should_compress(text) {
            return text.to_string();
        }
        let id = self.next_id;
        self.next_id += 1;
        self.entries.insert(
            id,
            CompressedEntry {
                id,
                original_text: text.to_string(),
            },
        );
        tracing::debug!(id, chars = text.chars().count(), "compressed long paste");
        placeholder(id)
    }

    /// Replace every known `[LongText#N]` token with its original text.
    ///
    /// Unknown ids and malformed tokens are left verbatim.
    pub fn expand(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(start) = rest.find(TOKEN_PREFIX) {
            out.push_str(&rest[..start]);
            let after_prefix = &rest[start + TOKEN_PREFIX.len()..];
            match parse_token_id(after_prefix) {
                Some((id, consumed)) => match self.entries.get(&id) {
                    Some(entry) => {
                        out.push_str(&entry.original_text);
                        rest = &after_prefix[consumed..];
                    }
                    None => {
                        let token_len = TOKEN_PREFIX.len() + consumed;
                        out.push_str(&rest[start..start + token_len]);
                        rest = &rest[start + token_len..];
                    }
                },
                None => {
                    out.push_str(TOKEN_PREFIX);
                    rest = after_prefix;
                }
            }
        }
        out.push_str(rest);
        out
    }

    pub fn get(&self, id: u64) -> Option<&CompressedEntry> {
        self.entries.get(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry. Tokens issued earlier become permanently
    /// unexpandable; ids keep increasing.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Placeholder token for a compressed entry id.
pub fn placeholder(id: u64) -> String {
    format!("{TOKEN_PREFIX}{id}{TOKEN_SUFFIX}")
}

/// Parse `123]...` into `(123, 4)` where 4 is the consumed byte count.
fn parse_token_id(text: &str) -> Option<(u64, usize)> {
    let digits = text.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 || !text[digits..].starts_with(TOKEN_SUFFIX) {
        return None;
    }
    let id = text[..digits].parse::<u64>().ok()?;
    Some((id, digits + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_text(len: usize) -> String {
        "x".repeat(len)
    }

    #[test]
    fn short_text_is_returned_unchanged() {
        let mut cache = CompressionCache::new(200);
        assert_eq!(cache.compress("hello"), "hello");
        assert_eq!(cache.compress(&long_text(200)), long_text(200));
        assert!(cache.is_empty());
    }

    #[test]
    fn long_text_gets_monotonic_tokens() {
        let mut cache = CompressionCache::new(200);
        assert_eq!(cache.compress(&long_text(201)), "[LongText#1]");
        assert_eq!(cache.compress(&long_text(300)), "[LongText#2]");
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn expand_restores_original_text_in_context() {
        let mut cache = CompressionCache::new(10);
        let pasted = "fn main() { println!(\"hi\"); }";
        let token = cache.compress(pasted);
        let expanded = cache.expand(&format!("look at {token} please"));
        assert_eq!(expanded, format!("look at {pasted} please"));
        // Expansion is not destructive.
        assert_eq!(cache.expand(&token), pasted);
    }

    #[test]
    fn expand_leaves_unknown_and_malformed_tokens_verbatim() {
        let cache = CompressionCache::new(10);
        let input = "[LongText#7] and [LongText#] and [LongText#x] [LongText#3";
        assert_eq!(cache.expand(input), input);
        assert_eq!(cache.expand("plain text"), "plain text");
    }

    #[test]
    fn clear_makes_old_tokens_unexpandable() {
        let mut cache = CompressionCache::new(3);
        let token = cache.compress("abcdef");
        cache.clear();
        assert_eq!(cache.expand(&token), token);
        assert_eq!(cache.compress("ghijkl"), "[LongText#2]");
    }

    #[test]
    fn expand_handles_adjacent_tokens() {
        let mut cache = CompressionCache::new(2);
        let a = cache.compress("aaa");
        let b = cache.compress("bbb");
        assert_eq!(cache.expand(&format!("{a}{b}")), "aaabbb");
    }

    #[cfg(feature = "fuzz-tests")]
    mod prop_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn expand_of_compress_is_identity(text in "[ -~]{201,400}") {
                let mut cache = CompressionCache::new(200);
                let token = cache.compress(&text);
                prop_assert_eq!(cache.expand(&token), text);
            }

            #[test]
            fn expand_without_tokens_is_identity(text in "[a-zA-Z0-9 #\\]]{0,64}") {
                let cache = CompressionCache::new(200);
                prop_assert_eq!(cache.expand(&text), text);
            }
        }
    }
}
