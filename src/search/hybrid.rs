//! C12 — Hybrid fuser: Reciprocal Rank Fusion over a vector ranking and a
//! keyword ranking, with quoted-phrase extraction and a vector-only
//! fallback when the keyword leg comes back empty.

use uuid::Uuid;

const RRF_K: f32 = 60.0;
pub const DEFAULT_WEIGHTS: HybridWeights = HybridWeights { vector: 0.6, keyword: 0.4 };

#[derive(Debug, Clone, Copy)]
pub struct HybridWeights {
    pub vector: f32,
    pub keyword: f32,
}

impl HybridWeights {
    pub fn normalized(self) -> Self {
        let total = self.vector + self.keyword;
        if total <= 0.0 {
            return DEFAULT_WEIGHTS;
        }
        HybridWeights { vector: self.vector / total, keyword: self.keyword / total }
    }
}

#[derive(Debug, Clone)]
pub struct HybridResult {
    pub chunk_id: Uuid,
    pub rrf_score: f32,
    pub vector_rank: Option<usize>,
    pub keyword_rank: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct ExtractedQuery {
    /// de-quoted concatenation, used for the vector leg.
    pub vector_query: String,
    /// concatenated quoted phrases if any were present, else the raw query;
    /// used for the keyword leg.
    pub keyword_query: String,
}

/// Pull double- or single-quoted phrases out of a query.
pub fn extract_phrases(query: &str) -> ExtractedQuery {
    let mut phrases = Vec::new();
    let mut chars = query.chars().peekable();
    let mut dequoted = String::new();
    while let Some(c) = chars.next() {
        if c == '"' || c == '\'' {
            let quote = c;
            let mut phrase = String::new();
            let mut closed = false;
            for inner in chars.by_ref() {
                if inner == quote {
                    closed = true;
                    break;
                }
                phrase.push(inner);
            }
            if closed {
                dequoted.push_str(&phrase);
                dequoted.push(' ');
                if !phrase.trim().is_empty() {
                    phrases.push(phrase.trim().to_string());
                }
            } else {
                // Unterminated quote: treat the quote character and the
                // remainder literally, no phrase extracted (graceful).
                dequoted.push(quote);
                dequoted.push_str(&phrase);
            }
        } else {
            dequoted.push(c);
        }
    }
    let keyword_query = if phrases.is_empty() { query.to_string() } else { phrases.join(" ") };
    ExtractedQuery { vector_query: dequoted.trim().to_string(), keyword_query }
}

/// Cheap pre-check for whether a query reads as code-like (identifiers,
/// punctuation, short) rather than prose — callers may use this to skip
/// the keyword leg for queries unlikely to benefit from it. Fusion itself
/// is always correct even if this is ignored (B.1).
pub fn prefers_keyword(query: &str) -> bool {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return false;
    }
    let token_count = trimmed.split_whitespace().count();
    if token_count <= 2 {
        return true;
    }
    if trimmed.contains('"') || trimmed.contains('\'') {
        return true;
    }
    let code_punct = ['_', '.', ':', '(', ')', '/', '-'];
    if trimmed.chars().any(|c| code_punct.contains(&c)) {
        return true;
    }
    let has_camel_case = trimmed
        .split_whitespace()
        .any(|tok| tok.chars().any(|c| c.is_uppercase()) && tok.chars().any(|c| c.is_lowercase()) && tok.len() > 1);
    has_camel_case
}

/// `vector_ranked`/`keyword_ranked` are ordered best-first chunk id lists
/// (already truncated by the caller to `2 * limit` each, per spec).
pub fn fuse(
    vector_ranked: &[Uuid],
    keyword_ranked: &[Uuid],
    weights: HybridWeights,
    limit: usize,
    fallback_enabled: bool,
) -> (Vec<HybridResult>, bool) {
    if keyword_ranked.is_empty() && fallback_enabled {
        let results = vector_ranked
            .iter()
            .take(limit)
            .enumerate()
            .map(|(i, id)| HybridResult { chunk_id: *id, rrf_score: 1.0 / (RRF_K + i as f32 + 1.0), vector_rank: Some(i), keyword_rank: None })
            .collect();
        return (results, true);
    }

    let weights = weights.normalized();
    let mut scores: std::collections::HashMap<Uuid, (f32, Option<usize>, Option<usize>)> = std::collections::HashMap::new();

    for (rank, id) in vector_ranked.iter().enumerate() {
        let entry = scores.entry(*id).or_insert((0.0, None, None));
        entry.0 += weights.vector / (RRF_K + rank as f32 + 1.0);
        entry.1 = Some(rank);
    }
    for (rank, id) in keyword_ranked.iter().enumerate() {
        let entry = scores.entry(*id).or_insert((0.0, None, None));
        entry.0 += weights.keyword / (RRF_K + rank as f32 + 1.0);
        entry.2 = Some(rank);
    }

    let mut results: Vec<HybridResult> = scores
        .into_iter()
        .map(|(id, (score, v_rank, k_rank))| HybridResult { chunk_id: id, rrf_score: score, vector_rank: v_rank, keyword_rank: k_rank })
        .collect();
    results.sort_by(|a, b| {
        b.rrf_score
            .partial_cmp(&a.rrf_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.chunk_id.cmp(&b.chunk_id))
    });
    results.truncate(limit);
    (results, false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uuid(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    #[test]
    fn quoted_phrase_extraction_splits_vector_and_keyword_queries() {
        let extracted = extract_phrases("find \"error handler\" usage");
        assert_eq!(extracted.keyword_query, "error handler");
        assert!(extracted.vector_query.contains("error handler"));
    }

    #[test]
    fn fuse_prefers_items_ranked_well_in_both_lists() {
        let vector = vec![uuid(1), uuid(2), uuid(3)];
        let keyword = vec![uuid(2), uuid(1), uuid(4)];
        let (results, fallback_used) = fuse(&vector, &keyword, DEFAULT_WEIGHTS, 10, true);
        assert!(!fallback_used);
        assert_eq!(results[0].chunk_id, uuid(1));
    }

    #[test]
    fn empty_keyword_results_trigger_fallback() {
        let vector = vec![uuid(1), uuid(2)];
        let (results, fallback_used) = fuse(&vector, &[], DEFAULT_WEIGHTS, 10, true);
        assert!(fallback_used);
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn short_query_prefers_keyword() {
        assert!(prefers_keyword("parseInt"));
        assert!(prefers_keyword("foo.bar"));
    }
}
