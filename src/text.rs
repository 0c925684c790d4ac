//! Small text helpers shared by the classifier, the handlers and the
//! hashing embedder.

/// Lower-cased alphanumeric runs. Apostrophes and punctuation split tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Whole-word match of a (possibly multi-word) phrase against `tokens`.
pub fn contains_phrase(tokens: &[String], phrase: &str) -> bool {
    let needle = tokenize(phrase);
    if needle.is_empty() || needle.len() > tokens.len() {
        return false;
    }
    tokens
        .windows(needle.len())
        .any(|window| window.iter().zip(&needle).all(|(a, b)| a == b))
}

/// First phrase from `phrases` that occurs in `tokens`.
pub fn find_phrase(tokens: &[String], phrases: &[&'static str]) -> Option<&'static str> {
    phrases
        .iter()
        .copied()
        .find(|phrase| contains_phrase(tokens, phrase))
}

/// Upper-cases the first letter of each whitespace-separated word and
/// lower-cases the rest.
pub fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_splits_on_punctuation_and_lowercases() {
        assert_eq!(
            tokenize("Como está o TEMPO em São Paulo?"),
            vec!["como", "está", "o", "tempo", "em", "são", "paulo"]
        );
    }

    #[test]
    fn phrases_match_whole_words_only() {
        let tokens = tokenize("this is a solution");
        assert!(!contains_phrase(&tokens, "hi"));
        assert!(!contains_phrase(&tokens, "sol"));
        assert!(contains_phrase(&tokens, "a solution"));
    }

    #[test]
    fn find_phrase_respects_list_order() {
        let tokens = tokenize("buscar notícias de hoje");
        assert_eq!(find_phrase(&tokens, &["notícias", "buscar"]), Some("notícias"));
        assert_eq!(find_phrase(&tokens, &["weather"]), None);
    }

    #[test]
    fn title_case_handles_accents() {
        assert_eq!(title_case("são paulo"), "São Paulo");
        assert_eq!(title_case("  rio DE janeiro "), "Rio De Janeiro");
    }
}
