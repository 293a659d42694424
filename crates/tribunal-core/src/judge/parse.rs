use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

fn scores_block_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"\{\s*"scores"\s*:\s*\{\s*(?:[^{}]*?)\s*\}\s*\}"#).expect("valid regex")
    })
}

/// Pull the `{"scores": {...}}` block out of a judge's free-text reply.
/// Returns None when no block is found or the block is not valid JSON with
/// numeric values.
pub(crate) fn extract_scores(text: &str) -> Option<BTreeMap<String, f64>> {
    let m = scores_block_re().find(text)?;
    let value: serde_json::Value = serde_json::from_str(m.as_str()).ok()?;
    let scores = value.get("scores")?.as_object()?;
    let mut out = BTreeMap::new();
    for (metric, raw) in scores {
        out.insert(metric.clone(), raw.as_f64()?);
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_scores_from_fenced_output() {
        let text = "Here is my evaluation:\n```json\n{\"scores\": {\"Correctness\": 5, \"Format\": 3}}\n```\nDone.";
        let scores = extract_scores(text).unwrap();
        assert_eq!(scores["Correctness"], 5.0);
        assert_eq!(scores["Format"], 3.0);
    }

    #[test]
    fn tolerates_whitespace_inside_the_block() {
        let text = "{ \"scores\" : { \"Relevance\" : 4 } }";
        assert_eq!(extract_scores(text).unwrap()["Relevance"], 4.0);
    }

    #[test]
    fn rejects_missing_block() {
        assert!(extract_scores("the response was excellent, five stars").is_none());
    }

    #[test]
    fn rejects_non_numeric_scores() {
        assert!(extract_scores("{\"scores\": {\"Correctness\": \"good\"}}").is_none());
    }
}
