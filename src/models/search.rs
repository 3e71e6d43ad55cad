// src/models/search.rs

/// Lowercased whitespace tokens of a free-text name search.
/// An empty result means "no name filter".
pub fn search_tokens(term: &str) -> Vec<String> {
    term.split_whitespace().map(str::to_lowercase).collect()
}

/// A name matches when any token is a case-insensitive substring of it.
pub fn name_matches(full_name: &str, tokens: &[String]) -> bool {
    if tokens.is_empty() {
        return true;
    }
    let haystack = full_name.to_lowercase();
    tokens.iter().any(|token| haystack.contains(token.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_search_matches_everything() {
        let tokens = search_tokens("   ");
        assert!(tokens.is_empty());
        assert!(name_matches("Anyone At All", &tokens));
    }

    #[test]
    fn matches_substring_case_insensitively() {
        let tokens = search_tokens("ALIC");
        assert!(name_matches("alice walker", &tokens));
        assert!(!name_matches("bob stone", &tokens));
    }

    #[test]
    fn any_token_is_enough() {
        let tokens = search_tokens("zzz walker");
        assert_eq!(tokens, vec!["zzz", "walker"]);
        assert!(name_matches("Alice Walker", &tokens));
    }
}
