//! C11 — BM25-equivalent query builder.
//!
//! Tokenizes on whitespace, widens each token to its camelCase/snake_case
//! identifier variants, and composes a single full-text OR expression so
//! `getUserName`, `get_user_name`, and `GetUserName` all surface the same
//! rows; `ts_rank_cd` (cover density, `k1=1.2, b=0.75`) does the actual
//! ranking at the store boundary (`store::postgres::keyword_search`).

use std::collections::HashSet;

pub const DEFAULT_EXACT_MATCH_BOOST: f32 = 3.0;
const VARIANT_MATCH_BOOST_FACTOR: f32 = 0.7;

#[derive(Debug, Clone)]
pub struct Bm25Query {
    /// `to_tsquery`-ready expression, e.g. `(get|user|name|get_user_name) | (other)`.
    pub expression: String,
    /// Every variant produced, flattened, for the exact/variant match boost.
    pub variants: Vec<String>,
}

pub fn build(query: &str) -> Bm25Query {
    let mut groups = Vec::new();
    let mut all_variants = Vec::new();

    for token in query.split_whitespace() {
        let variants = token_variants(token);
        if variants.is_empty() {
            continue;
        }
        all_variants.extend(variants.clone());
        let group = if variants.len() == 1 {
            variants[0].clone()
        } else {
            format!("({})", variants.join("|"))
        };
        groups.push(group);
    }

    Bm25Query { expression: groups.join(" | "), variants: dedup_preserve_order(all_variants) }
}

fn token_variants(token: &str) -> Vec<String> {
    let cleaned: String = token.chars().filter(|c| c.is_alphanumeric() || *c == '_').collect();
    if cleaned.is_empty() {
        return Vec::new();
    }
    let mut variants = Vec::new();
    variants.push(cleaned.to_lowercase());

    let camel_parts = split_camel(&cleaned);
    if camel_parts.len() > 1 {
        for part in &camel_parts {
            variants.push(part.to_lowercase());
        }
        variants.push(camel_parts.iter().map(|p| p.to_lowercase()).collect::<Vec<_>>().join("_"));
    }

    let snake_parts = split_snake(&cleaned);
    if snake_parts.len() > 1 {
        for part in &snake_parts {
            variants.push(part.to_lowercase());
        }
        variants.push(to_camel_case(&snake_parts));
    }

    dedup_preserve_order(variants)
}

fn split_camel(s: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let chars: Vec<char> = s.chars().collect();
    for (i, &c) in chars.iter().enumerate() {
        if c == '_' {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        if c.is_uppercase() && !current.is_empty() {
            let prev_lower = chars[i - 1].is_lowercase() || chars[i - 1].is_ascii_digit();
            let next_lower = chars.get(i + 1).map(|c| c.is_lowercase()).unwrap_or(false);
            if prev_lower || (next_lower && chars[i - 1].is_uppercase()) {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn split_snake(s: &str) -> Vec<String> {
    s.split('_').filter(|p| !p.is_empty()).map(|p| p.to_string()).collect()
}

fn to_camel_case(parts: &[String]) -> String {
    let mut out = String::new();
    for (i, part) in parts.iter().enumerate() {
        let lower = part.to_lowercase();
        if i == 0 {
            out.push_str(&lower);
        } else {
            let mut chars = lower.chars();
            if let Some(first) = chars.next() {
                out.extend(first.to_uppercase());
                out.push_str(chars.as_str());
            }
        }
    }
    out
}

fn dedup_preserve_order(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items.into_iter().filter(|i| seen.insert(i.clone())).collect()
}

/// Multiply `score` by `boost` on an exact case-insensitive match of
/// `raw_query` against `symbol_names`, by `boost * 0.7` on a variant-only
/// match, otherwise leave it unchanged.
pub fn apply_exact_match_boost(score: f32, raw_query: &str, query: &Bm25Query, symbol_names: &[String], boost: f32) -> f32 {
    let raw_lower = raw_query.trim().to_lowercase();
    let exact = symbol_names.iter().any(|s| s.to_lowercase() == raw_lower);
    if exact {
        return score * boost;
    }
    let variant_match = symbol_names
        .iter()
        .any(|s| query.variants.iter().any(|v| v.eq_ignore_ascii_case(s)));
    if variant_match {
        return score * boost * VARIANT_MATCH_BOOST_FACTOR;
    }
    score
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camel_token_splits_and_reconstitutes_snake() {
        let variants = token_variants("getUserName");
        assert!(variants.contains(&"get".to_string()));
        assert!(variants.contains(&"user".to_string()));
        assert!(variants.contains(&"name".to_string()));
        assert!(variants.contains(&"get_user_name".to_string()));
    }

    #[test]
    fn snake_token_reconstitutes_camel() {
        let variants = token_variants("get_user_name");
        assert!(variants.contains(&"getusername".to_string()) || variants.iter().any(|v| v.to_lowercase() == "getusername"));
        assert!(variants.iter().any(|v| v == "get" || v == "user" || v == "name"));
    }

    #[test]
    fn build_ors_groups_across_tokens() {
        let query = build("getUserName other");
        assert!(query.expression.contains('|'));
        assert!(query.expression.contains("get"));
        assert!(query.expression.contains("other"));
    }

    #[test]
    fn exact_match_gets_full_boost() {
        let query = build("helper");
        let boosted = apply_exact_match_boost(1.0, "helper", &query, &["helper".to_string()], DEFAULT_EXACT_MATCH_BOOST);
        assert_eq!(boosted, DEFAULT_EXACT_MATCH_BOOST);
    }
}
