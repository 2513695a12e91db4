//! Dangling-ending lexicon
//!
//! An utterance that stops on a determiner, preposition, conjunction,
//! relative pronoun or bare auxiliary is almost always cut off mid-thought.
//! The lexicon is plain data so deployments can extend it and tests can
//! exercise it directly.

/// Grammatical category of a dangling ending
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndingCategory {
    Determiner,
    Preposition,
    Conjunction,
    RelativePronoun,
    Auxiliary,
    /// Multi-word constructions such as "going to"
    Phrase,
    /// Entries added through configuration
    Custom,
}

impl EndingCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Determiner => "determiner",
            Self::Preposition => "preposition",
            Self::Conjunction => "conjunction",
            Self::RelativePronoun => "relative_pronoun",
            Self::Auxiliary => "auxiliary",
            Self::Phrase => "phrase",
            Self::Custom => "custom",
        }
    }
}

const DETERMINERS: &[&str] = &[
    "the", "a", "an", "this", "these", "those", "my", "your", "our", "their", "his", "her", "its",
    "some", "any", "every", "each", "no",
];

const PREPOSITIONS: &[&str] = &[
    "for", "to", "of", "in", "on", "at", "with", "from", "about", "by", "into", "onto", "over",
    "under", "between", "through", "like", "near", "without", "after", "before", "during", "per",
    "via", "than", "toward", "towards",
];

const CONJUNCTIONS: &[&str] = &[
    "and", "or", "but", "because", "if", "unless", "although", "though", "while", "whether",
    "nor",
];

const RELATIVE_PRONOUNS: &[&str] = &["that", "which", "who", "whom", "whose"];

const AUXILIARIES: &[&str] = &[
    "is", "are", "was", "were", "am", "be", "been", "being", "will", "would", "can", "could",
    "should", "shall", "may", "might", "must", "does", "did", "has", "had",
];

const PHRASES: &[&str] = &[
    "going to",
    "want to",
    "need to",
    "have to",
    "such as",
    "as well as",
    "in order to",
    "kind of",
    "sort of",
];

#[derive(Debug, Clone, PartialEq, Eq)]
struct LexiconEntry {
    words: Vec<String>,
    category: EndingCategory,
}

/// Configurable set of words and phrases that leave an utterance dangling
#[derive(Debug, Clone)]
pub struct DanglingLexicon {
    // Longest entries first so multi-word phrases win over their last word.
    entries: Vec<LexiconEntry>,
}

impl Default for DanglingLexicon {
    fn default() -> Self {
        Self::builtin()
    }
}

impl DanglingLexicon {
    /// The built-in English lexicon
    pub fn builtin() -> Self {
        let mut lexicon = Self::empty();
        for (words, category) in [
            (DETERMINERS, EndingCategory::Determiner),
            (PREPOSITIONS, EndingCategory::Preposition),
            (CONJUNCTIONS, EndingCategory::Conjunction),
            (RELATIVE_PRONOUNS, EndingCategory::RelativePronoun),
            (AUXILIARIES, EndingCategory::Auxiliary),
            (PHRASES, EndingCategory::Phrase),
        ] {
            for entry in words {
                lexicon.insert(entry, category);
            }
        }
        lexicon
    }

    /// A lexicon with no entries; nothing is ever dangling
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Add configured endings on top of the existing entries
    pub fn with_extra<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for entry in extra {
            self.insert(entry.as_ref(), EndingCategory::Custom);
        }
        self
    }

    /// Insert a single word or phrase. Blank and duplicate entries are ignored.
    pub fn insert(&mut self, entry: &str, category: EndingCategory) {
        let words = tokenize(entry);
        if words.is_empty() || self.entries.iter().any(|e| e.words == words) {
            return;
        }
        let position = self
            .entries
            .iter()
            .position(|e| e.words.len() < words.len())
            .unwrap_or(self.entries.len());
        self.entries
            .insert(position, LexiconEntry { words, category });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return the category of the dangling ending `text` stops on, if any.
    ///
    /// Text ending in `.`, `?` or `!` was marked as a sentence end by the
    /// recognizer and is never dangling.
    pub fn dangling_ending(&self, text: &str) -> Option<EndingCategory> {
        let trimmed = text.trim_end();
        if trimmed.is_empty() || ends_with_terminal_punctuation(trimmed) {
            return None;
        }

        let words = tokenize(trimmed);
        self.entries
            .iter()
            .find(|entry| words.ends_with(&entry.words))
            .map(|entry| entry.category)
    }
}

/// Whether text ends in sentence-final punctuation
pub fn ends_with_terminal_punctuation(text: &str) -> bool {
    matches!(
        text.trim_end()
            .trim_end_matches(['"', '\'', ')'])
            .chars()
            .last(),
        Some('.' | '?' | '!')
    )
}

/// Lowercased words with surrounding punctuation removed
pub(crate) fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|word| {
            word.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'')
                .to_lowercase()
        })
        .filter(|word| !word.is_empty())
        .collect()
}
