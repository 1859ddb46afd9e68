use std::collections::HashMap;

pub const DEFAULT_TAG_LIMIT: usize = 20;

/// Words too common in French (plus a few English fillers that show up in
/// technical PDFs) to carry any signal as a tag.
const STOP_WORDS: &[&str] = &[
    "les", "des", "une", "dans", "pour", "par", "sur", "avec", "sans", "est",
    "sont", "mais", "aux", "ces", "cette", "son", "ses", "leur", "leurs",
    "nous", "vous", "ils", "elles", "que", "qui", "quoi", "dont", "pas",
    "plus", "tout", "tous", "toute", "toutes", "comme", "aussi", "ainsi",
    "entre", "donc", "alors", "fait", "être", "avoir", "peut", "the", "and",
    "for", "with", "this", "that", "from", "are", "was", "were", "not",
];

/// Derives up to `limit` significant terms from extracted text.
///
/// Lowercases, replaces every run of non-alphabetic characters with a single
/// space (accented letters are alphabetic and survive), drops short tokens
/// and stop words, then ranks by frequency with ties broken by first
/// occurrence. Deterministic; empty text yields an empty set.
pub fn extract_tags(text: &str, limit: usize) -> Vec<String> {
    let lowered = text.to_lowercase();
    let cleaned: String = lowered
        .chars()
        .map(|ch| if ch.is_alphabetic() { ch } else { ' ' })
        .collect();

    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();

    for token in cleaned.split_whitespace() {
        if token.chars().count() <= 2 || STOP_WORDS.contains(&token) {
            continue;
        }
        let entry = counts.entry(token).or_insert(0);
        if *entry == 0 {
            order.push(token);
        }
        *entry += 1;
    }

    let mut ranked: Vec<&str> = order;
    ranked.sort_by(|left, right| counts[right].cmp(&counts[left]));

    ranked
        .into_iter()
        .take(limit)
        .map(str::to_string)
        .collect()
}
