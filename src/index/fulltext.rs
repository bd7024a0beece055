//! Full-text index support. `emit_text_tokens` is the helper a map
//! function calls to turn one text field into index rows: a special
//! row under a caller-assigned numeric `fullTextID` carrying the
//! original text (plus, optionally, the caller's emitted value), and
//! one row per distinct token carrying the list of `(offset, length)`
//! occurrences of that token in the text. `fulltext_query` runs a
//! multi-term search by enumerating each query term's row range and
//! joining the results by `(source sequence, fullTextID)`.
//!
//! Grounded on `examples/original_source`'s full-text index (per-field
//! `fullTextID`, token rows carrying match offsets, term-intersection
//! join, term-frequency ranking) per spec.md §4.10, built on this
//! crate's `tokenizer` module for the word splitting/stemming it needs.

use std::collections::BTreeMap;
use std::collections::HashMap;

use crate::collatable::{CollatableBuilder, CollatableReader, Tag};
use crate::tokenizer::{TokenIterator, TokenizerOptions};
use crate::Result;

use super::enumerator::{IndexEnumerator, KeyRange};
use super::{decode_row_key, decode_row_meta, range_for_emitted_key, EmittedValue, Index};
use crate::backend::RangeOptions;

fn number_key(n: u64) -> Vec<u8> {
    let mut b = CollatableBuilder::new();
    b.add_number(n as f64);
    b.finish()
}

fn string_key(s: &str) -> Vec<u8> {
    let mut b = CollatableBuilder::new();
    b.add_string(s);
    b.finish()
}

/// Emits the rows for one text field: a special row under
/// `full_text_id` holding `text` (and `original_value`, if any), plus
/// one row per distinct token in `text` holding its occurrence
/// offsets/lengths. `full_text_id` must be unique per emitted
/// full-text field for this document.
pub fn emit_text_tokens(
    text: &str,
    original_value: Option<&[u8]>,
    full_text_id: u64,
    tokenizer_opts: &TokenizerOptions,
    emit: &mut dyn FnMut(Vec<u8>, EmittedValue),
) {
    let mut special = CollatableBuilder::new();
    special.begin_array();
    special.add_string(text);
    if let Some(v) = original_value {
        special.begin_array();
        special.add_bytes(v);
        special.end_array();
    }
    special.end_array();
    emit(number_key(full_text_id), EmittedValue::Body(special.finish()));

    let mut per_token: BTreeMap<String, Vec<(usize, usize)>> = BTreeMap::new();
    let mut occurrence_opts = tokenizer_opts.clone();
    occurrence_opts.unique = false;
    for token in TokenIterator::new(text, &occurrence_opts) {
        per_token.entry(token.text).or_default().push((token.offset, token.length));
    }

    for (token, occurrences) in per_token {
        let mut row = CollatableBuilder::new();
        row.begin_array();
        row.add_number(full_text_id as f64);
        for (offset, length) in &occurrences {
            row.add_number(*offset as f64);
            row.add_number(*length as f64);
        }
        row.end_array();
        emit(string_key(&token), EmittedValue::Body(row.finish()));
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TermMatch {
    pub start: usize,
    pub length: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FullTextResult {
    pub doc_id: String,
    pub sequence: u64,
    pub full_text_id: u64,
    pub matches: Vec<TermMatch>,
    pub rank: f64,
}

struct Candidate {
    sequence: u64,
    doc_id: String,
    full_text_id: u64,
    last_term_index: usize,
    per_term_matches: Vec<Vec<TermMatch>>,
}

/// Runs `query` as an AND of its tokenized terms against the full-text
/// rows in `index`, returning one result per document field that
/// matched every term. Results are sorted by descending rank when
/// `ranked` is set; otherwise by ascending sequence.
pub fn fulltext_query(
    index: &Index,
    query: &str,
    tokenizer_opts: &TokenizerOptions,
    ranked: bool,
    opts: &RangeOptions,
) -> Result<Vec<FullTextResult>> {
    let mut query_opts = tokenizer_opts.clone();
    query_opts.unique = true;
    let terms: Vec<String> = TokenIterator::new(query, &query_opts).map(|t| t.text).collect();
    if terms.is_empty() {
        return Ok(Vec::new());
    }

    let mut candidates: HashMap<(u64, u64), Candidate> = HashMap::new();
    let mut term_totals: Vec<usize> = vec![0; terms.len()];

    for (term_index, term) in terms.iter().enumerate() {
        let (min, max) = range_for_emitted_key(&string_key(term));
        let ranges = [KeyRange::new(min, max, false)];
        let mut e = IndexEnumerator::new(index, &ranges, None, opts, false, 0, None)?;

        while e.next() {
            let rec = e.doc();
            let (_emitted_key, doc_id, _emit_index) = decode_row_key(rec.key.as_bytes())?;
            let sequence = decode_row_meta(rec.meta.as_bytes())?;

            let mut r = CollatableReader::new(rec.body.as_bytes());
            r.begin_array()?;
            let full_text_id = r.read_int()? as u64;
            let mut matches = Vec::new();
            while r.peek_tag() != Tag::EndSequence {
                let start = r.read_int()? as usize;
                let length = r.read_int()? as usize;
                matches.push(TermMatch { start, length });
            }
            r.end_array()?;
            term_totals[term_index] += matches.len();

            let key = (sequence, full_text_id);
            if term_index == 0 {
                let candidate = candidates.entry(key).or_insert_with(|| Candidate {
                    sequence,
                    doc_id: doc_id.clone(),
                    full_text_id,
                    last_term_index: 0,
                    per_term_matches: vec![Vec::new(); terms.len()],
                });
                candidate.per_term_matches[0] = matches;
                candidate.last_term_index = 0;
            } else if let Some(candidate) = candidates.get_mut(&key) {
                candidate.per_term_matches[term_index] = matches;
                candidate.last_term_index = term_index;
            }
        }

        if term_index > 0 {
            candidates.retain(|_, c| c.last_term_index == term_index);
        }
    }

    let mut results: Vec<FullTextResult> = candidates
        .into_values()
        .map(|c| {
            let rank = if ranked {
                c.per_term_matches
                    .iter()
                    .enumerate()
                    .map(|(i, ms)| if term_totals[i] == 0 { 0.0 } else { ms.len() as f64 / term_totals[i] as f64 })
                    .sum()
            } else {
                0.0
            };
            let mut matches: Vec<TermMatch> = c.per_term_matches.into_iter().flatten().collect();
            matches.sort_by_key(|m| m.start);
            FullTextResult { doc_id: c.doc_id, sequence: c.sequence, full_text_id: c.full_text_id, matches, rank }
        })
        .collect();

    if ranked {
        results.sort_by(|a, b| b.rank.partial_cmp(&a.rank).unwrap_or(std::cmp::Ordering::Equal));
    } else {
        results.sort_by_key(|r| r.sequence);
    }
    Ok(results)
}

#[cfg(test)]
#[path = "fulltext_test.rs"]
mod fulltext_test;
