//! Two-way codec between free text with literal URLs and the stored
//! form where each URL is replaced by a `[LINK:n]` placeholder with the
//! URLs kept in a parallel array. Placeholder indices follow first
//! occurrence order in the text.

use regex::Regex;
use std::sync::OnceLock;

fn url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"https?://[^\s]+").expect("valid url regex"))
}

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[LINK:(\d+)\]").expect("valid placeholder regex"))
}

/// Replaces every http(s) URL with `[LINK:n]` and collects the URLs.
pub fn encode(text: &str) -> (String, Vec<String>) {
    let mut links = Vec::new();
    let encoded = url_re()
        .replace_all(text, |caps: &regex::Captures| {
            let placeholder = format!("[LINK:{}]", links.len());
            links.push(caps[0].to_string());
            placeholder
        })
        .into_owned();
    (encoded, links)
}

/// Substitutes `[LINK:n]` placeholders back with their stored URLs.
/// Placeholders with no matching link are left verbatim.
pub fn decode(text: &str, links: &[String]) -> String {
    placeholder_re()
        .replace_all(text, |caps: &regex::Captures| {
            caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|i| links.get(i))
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_become_indexed_placeholders_in_order() {
        let (text, links) = encode(
            "see https://a.example/x then http://b.example/y for context",
        );
        assert_eq!(text, "see [LINK:0] then [LINK:1] for context");
        assert_eq!(links, vec!["https://a.example/x", "http://b.example/y"]);
    }

    #[test]
    fn round_trip_restores_original_text() {
        let original = "draft at https://cdn.example.com/v1.mp4 and notes https://docs.example.com/n";
        let (encoded, links) = encode(original);
        assert_eq!(decode(&encoded, &links), original);
    }

    #[test]
    fn unknown_placeholder_indices_stay_verbatim() {
        let links = vec!["https://a.example".to_string()];
        assert_eq!(
            decode("ok [LINK:0] bad [LINK:7]", &links),
            "ok https://a.example bad [LINK:7]"
        );
    }

    #[test]
    fn plain_text_is_untouched() {
        let (text, links) = encode("no urls here");
        assert_eq!(text, "no urls here");
        assert!(links.is_empty());
    }
}
