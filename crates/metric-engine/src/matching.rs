//! Field lookup across providers that name the same concept differently.
//!
//! Matching runs in three stages, each usable on its own:
//! exact key, normalized-exact key, then a scored fuzzy pass. Only fields
//! holding a usable value are ever candidates.

use metrics_core::RawFinancialData;

use crate::discovery::split_words;
use crate::parsing::is_valid_value;

/// Lower-case and drop everything that is not a letter or digit.
pub fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// A fuzzy candidate and its score in (0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMatch<'a> {
    pub field: &'a str,
    pub score: f64,
}

fn usable_fields(record: &RawFinancialData) -> impl Iterator<Item = &str> {
    record
        .data_fields()
        .filter(|(_, value)| is_valid_value(Some(value)))
        .map(|(field, _)| field)
}

pub fn exact_match<'a>(record: &'a RawFinancialData, id: &str) -> Option<&'a str> {
    record
        .iter()
        .find(|(field, value)| *field == id && is_valid_value(Some(value)))
        .map(|(field, _)| field)
}

/// A field whose normalized key equals the normalized id or name.
pub fn normalized_match<'a>(record: &'a RawFinancialData, id: &str, name: &str) -> Option<&'a str> {
    let targets = search_patterns(id, name);
    usable_fields(record).find(|field| {
        let key = normalize_key(field);
        targets.iter().any(|t| *t == key)
    })
}

/// Best-scoring field by substring containment or name-token coverage.
pub fn scored_match<'a>(record: &'a RawFinancialData, id: &str, name: &str) -> Option<FieldMatch<'a>> {
    let patterns = search_patterns(id, name);
    let tokens: Vec<String> = split_words(name)
        .iter()
        .map(|w| normalize_key(w))
        .filter(|w| !w.is_empty())
        .collect();

    let mut best: Option<FieldMatch<'a>> = None;
    for field in usable_fields(record) {
        let key = normalize_key(field);
        if key.is_empty() {
            continue;
        }

        // overlap over the candidate's length: a field inside the pattern scores 1
        let mut score = patterns
            .iter()
            .filter(|p| p.contains(key.as_str()) || key.contains(p.as_str()))
            .map(|p| p.len().min(key.len()) as f64 / key.len() as f64)
            .fold(0.0, f64::max);

        if !tokens.is_empty() && tokens.iter().all(|t| key.contains(t.as_str())) {
            let covered: usize = tokens.iter().map(String::len).sum();
            let coverage = (covered as f64 / key.len() as f64).min(1.0);
            score = score.max(0.5 + 0.5 * coverage);
        }

        // strict comparison keeps the first field on ties
        if score > 0.0 && best.as_ref().map_or(true, |b| score > b.score) {
            best = Some(FieldMatch { field, score });
        }
    }
    best
}

/// Resolve the field carrying metric `id` (display name `name`) in `record`.
pub fn find_matching_field<'a>(record: &'a RawFinancialData, id: &str, name: &str) -> Option<&'a str> {
    exact_match(record, id)
        .or_else(|| normalized_match(record, id, name))
        .or_else(|| scored_match(record, id, name).map(|m| m.field))
}

fn search_patterns(id: &str, name: &str) -> Vec<String> {
    let mut patterns = Vec::with_capacity(2);
    for candidate in [normalize_key(id), normalize_key(name)] {
        if !candidate.is_empty() && !patterns.contains(&candidate) {
            patterns.push(candidate);
        }
    }
    patterns
}
