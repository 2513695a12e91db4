//! Surface-shape heuristics for utterances: question, command, search request

use super::lexicon::tokenize;

const QUESTION_OPENERS: &[&str] = &[
    "what", "when", "where", "who", "whom", "whose", "why", "how", "which", "is", "are", "was",
    "were", "do", "does", "did", "can", "could", "will", "would", "should", "shall", "may",
    "might", "am", "have", "has",
];

const COMMAND_VERBS: &[&str] = &[
    "turn", "set", "play", "stop", "pause", "resume", "open", "close", "call", "send", "show",
    "find", "search", "get", "give", "tell", "add", "remove", "delete", "start", "cancel", "book",
    "order", "check", "read", "switch", "increase", "decrease", "list",
];

const SEARCH_PREFIXES: &[&[&str]] = &[
    &["find"],
    &["search"],
    &["look", "up"],
    &["lookup"],
    &["look", "for"],
    &["show", "me"],
    &["where", "can", "i", "find"],
];

// Politeness and addressing that precede the real request.
const LEADING_FILLERS: &[&[&str]] = &[
    &["please"],
    &["hey"],
    &["ok"],
    &["okay"],
    &["can", "you"],
    &["could", "you"],
    &["would", "you"],
    &["i", "want", "you", "to"],
];

fn strip_fillers(words: &[String]) -> &[String] {
    let mut rest = words;
    'outer: loop {
        for filler in LEADING_FILLERS {
            if rest.len() > filler.len() && rest.iter().zip(filler.iter()).all(|(a, b)| a == b) {
                rest = &rest[filler.len()..];
                continue 'outer;
            }
        }
        return rest;
    }
}

/// Whether the utterance is phrased as a question
pub fn is_question(text: &str) -> bool {
    if text.trim_end().ends_with('?') {
        return true;
    }
    tokenize(text)
        .first()
        .is_some_and(|word| QUESTION_OPENERS.contains(&word.as_str()))
}

/// Whether the utterance is phrased as an imperative command
pub fn is_command(text: &str) -> bool {
    let words = tokenize(text);
    strip_fillers(&words)
        .first()
        .is_some_and(|word| COMMAND_VERBS.contains(&word.as_str()))
}

/// Whether the utterance asks to find or look something up
pub fn is_search_request(text: &str) -> bool {
    let words = tokenize(text);
    let words = strip_fillers(&words);
    SEARCH_PREFIXES.iter().any(|prefix| {
        words.len() >= prefix.len() && words.iter().zip(prefix.iter()).all(|(a, b)| a == b)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_shape() {
        assert!(is_question("what time is it"));
        assert!(is_question("How do I return this"));
        assert!(is_question("you close at five?"));
        assert!(!is_question("turn on the lights"));
        assert!(!is_question(""));
    }

    #[test]
    fn test_command_shape() {
        assert!(is_command("turn on the lights"));
        assert!(is_command("please play some jazz"));
        assert!(is_command("can you send the report"));
        assert!(!is_command("I am looking for a hammer"));
        assert!(!is_command("please"));
    }

    #[test]
    fn test_search_shape() {
        assert!(is_search_request("find me the Q3 sales data"));
        assert!(is_search_request("could you look up the store hours"));
        assert!(is_search_request("Show me red jackets"));
        assert!(!is_search_request("show the menu"));
        assert!(!is_search_request("what time is it"));
    }
}
