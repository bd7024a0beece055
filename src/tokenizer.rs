//! Module `tokenizer` implements full-text tokenization: splitting text
//! into words, optional diacritics folding, per-stemmer-language stop
//! word filtering, and stemming via `rust-stemmers`.
//!
//! Grounded on `examples/original_source`'s full-text tokenizer
//! (`(stemmer-name, removeDiacritics)` parameterization, English stop
//! word table shipped in core) per spec.md §4.10. Word splitting uses
//! `unicode-segmentation` (word-boundary indices give byte offsets for
//! free, which `emitTextTokens` needs); stemming uses `rust-stemmers`,
//! both already in the dependency stack for this purpose.

use std::collections::HashSet;

use rust_stemmers::{Algorithm, Stemmer};
use unicode_segmentation::UnicodeSegmentation;

/// One token as it appears in the source text, pre-stemming.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub offset: usize,
    pub length: usize,
}

#[derive(Clone, Debug, Default)]
pub struct TokenizerOptions {
    pub stemmer: Option<String>,
    pub remove_diacritics: bool,
    pub unique: bool,
}

const ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in", "into", "is", "it",
    "no", "not", "of", "on", "or", "such", "that", "the", "their", "then", "there", "these",
    "they", "this", "to", "was", "will", "with",
];

fn stop_words_for(stemmer_name: &str) -> &'static [&'static str] {
    match stemmer_name {
        "english" => ENGLISH_STOP_WORDS,
        _ => &[],
    }
}

fn algorithm_for(stemmer_name: &str) -> Option<Algorithm> {
    match stemmer_name {
        "english" => Some(Algorithm::English),
        "french" => Some(Algorithm::French),
        "german" => Some(Algorithm::German),
        "spanish" => Some(Algorithm::Spanish),
        _ => None,
    }
}

/// Strips the common Latin-1/Latin Extended-A diacritics by mapping
/// each accented character to its unaccented base letter. Not a full
/// Unicode normalizer; covers the accented forms that occur in Western
/// European text, which is what this crate's stop word tables target.
fn remove_diacritics(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
            'è' | 'é' | 'ê' | 'ë' => 'e',
            'ì' | 'í' | 'î' | 'ï' => 'i',
            'ò' | 'ó' | 'ô' | 'õ' | 'ö' => 'o',
            'ù' | 'ú' | 'û' | 'ü' => 'u',
            'ý' | 'ÿ' => 'y',
            'ç' => 'c',
            'ñ' => 'n',
            other => other,
        })
        .collect()
}

/// Yields `(token, wordOffset, wordLength)` for the input text:
/// lowercased, optionally diacritics-folded, stop words dropped,
/// stemmed, and optionally deduplicated within this one iteration.
/// Offsets/lengths are byte positions into the original text, taken
/// before stemming (stemming only affects the yielded token text).
pub struct TokenIterator<'a> {
    words: Box<dyn Iterator<Item = (usize, &'a str)> + 'a>,
    stemmer: Option<Stemmer>,
    stop_words: &'static [&'static str],
    remove_diacritics: bool,
    seen: Option<HashSet<String>>,
}

impl<'a> TokenIterator<'a> {
    pub fn new(text: &'a str, opts: &TokenizerOptions) -> TokenIterator<'a> {
        let stemmer_name = opts.stemmer.as_deref().unwrap_or("");
        TokenIterator {
            words: Box::new(text.split_word_bound_indices().filter(|(_, w)| w.chars().any(char::is_alphanumeric))),
            stemmer: algorithm_for(stemmer_name).map(Stemmer::create),
            stop_words: stop_words_for(stemmer_name),
            remove_diacritics: opts.remove_diacritics,
            seen: if opts.unique { Some(HashSet::new()) } else { None },
        }
    }
}

impl<'a> Iterator for TokenIterator<'a> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        for (offset, word) in self.words.by_ref() {
            let mut lowered = word.to_lowercase();
            if self.remove_diacritics {
                lowered = remove_diacritics(&lowered);
            }
            if self.stop_words.contains(&lowered.as_str()) {
                continue;
            }
            let stemmed = match &self.stemmer {
                Some(s) => s.stem(&lowered).into_owned(),
                None => lowered,
            };
            if let Some(seen) = &mut self.seen {
                if !seen.insert(stemmed.clone()) {
                    continue;
                }
            }
            return Some(Token { text: stemmed, offset, length: word.len() });
        }
        None
    }
}

#[cfg(test)]
#[path = "tokenizer_test.rs"]
mod tokenizer_test;
