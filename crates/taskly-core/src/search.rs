//! Ranked fuzzy matching used by `todo search`.
//!
//! A field scores 1.0 for a substring hit (slightly less the later it starts) and
//! `query_len / span_len` for a scattered in-order match. A record takes the best
//! score over its fields; anything under [`MIN_SCORE`] is dropped.

pub const MIN_SCORE: f64 = 0.5;

pub fn score(query: &str, text: &str) -> Option<f64> {
    let query: Vec<char> = query.trim().to_lowercase().chars().collect();
    if query.is_empty() {
        return None;
    }
    let haystack: Vec<char> = text.to_lowercase().chars().collect();
    if haystack.len() < query.len() {
        return None;
    }

    if let Some(pos) = find_substring(&haystack, &query) {
        let offset_penalty = pos as f64 / (haystack.len() as f64 * 10.0);
        return Some(1.0 - offset_penalty);
    }

    // Tightest in-order span, scanned from every viable first character.
    let mut best: Option<usize> = None;
    for start in 0..haystack.len() {
        if haystack[start] != query[0] {
            continue;
        }
        let mut qi = 1;
        let mut end = start;
        for (idx, ch) in haystack.iter().enumerate().skip(start + 1) {
            if qi == query.len() {
                break;
            }
            if *ch == query[qi] {
                qi += 1;
                end = idx;
            }
        }
        if qi == query.len() {
            let span = end - start + 1;
            best = Some(best.map_or(span, |current| current.min(span)));
        }
    }
    best.map(|span| query.len() as f64 / span as f64 * 0.9)
}

fn find_substring(haystack: &[char], needle: &[char]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ranked<T> {
    pub item: T,
    pub score: f64,
}

/// Rank `items` by the best field score; ties keep the input order.
pub fn rank<T, F>(items: Vec<T>, query: &str, fields: F) -> Vec<Ranked<T>>
where
    F: Fn(&T) -> Vec<String>,
{
    let mut ranked: Vec<Ranked<T>> = items
        .into_iter()
        .filter_map(|item| {
            let best = fields(&item)
                .iter()
                .filter_map(|field| score(query, field))
                .fold(None, |acc: Option<f64>, s| Some(acc.map_or(s, |a| a.max(s))))?;
            (best >= MIN_SCORE).then_some(Ranked { item, score: best })
        })
        .collect();
    ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    ranked
}
