//! Split response text into speakable segments
//!
//! Each line is its own block (this covers list items, blank-line paragraph
//! breaks and "Heading:" lines). Blocks are split into sentences, and any
//! sentence longer than the chunk limit is split again on commas, then on
//! word boundaries as a last resort.

const ABBREVIATIONS: &[&str] = &[
    "mr", "mrs", "ms", "dr", "prof", "sr", "jr", "st", "vs", "etc", "inc", "ltd", "co", "no",
    "approx", "dept", "e.g", "i.e",
];

/// Split `text` into segments of at most `max_chars` characters.
pub fn split_into_segments(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .flat_map(split_sentences)
        .flat_map(|sentence| enforce_max_len(sentence, max_chars))
        .collect()
}

/// Split a block into sentences on `.`, `!` and `?` followed by whitespace.
///
/// Abbreviations ("Dr.") and dotted initialisms ("D.C.") do not end a
/// sentence, and neither do decimal points.
pub fn split_sentences(block: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = block.char_indices().peekable();

    while let Some((index, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        // Swallow runs like "?!" or "..."
        let mut end = index + c.len_utf8();
        while let Some(&(next_index, next)) = chars.peek() {
            if matches!(next, '.' | '!' | '?' | '"' | '\'' | ')') {
                end = next_index + next.len_utf8();
                chars.next();
            } else {
                break;
            }
        }

        let at_boundary = match chars.peek() {
            Some(&(_, next)) => next.is_whitespace(),
            None => true,
        };
        if !at_boundary || (c == '.' && is_abbreviation(&block[start..index])) {
            continue;
        }

        let sentence = block[start..end].trim();
        if !sentence.is_empty() {
            sentences.push(sentence.to_string());
        }
        start = end;
    }

    let rest = block[start..].trim();
    if !rest.is_empty() {
        sentences.push(rest.to_string());
    }
    sentences
}

fn is_abbreviation(before_dot: &str) -> bool {
    let word = before_dot
        .rsplit(char::is_whitespace)
        .next()
        .unwrap_or_default()
        .trim_start_matches(|c: char| !c.is_alphanumeric());
    if word.is_empty() {
        return false;
    }
    let lower = word.to_lowercase();
    ABBREVIATIONS.contains(&lower.as_str())
        || word.contains('.')
        || (word.chars().count() == 1 && word.chars().all(char::is_uppercase))
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn enforce_max_len(sentence: String, max_chars: usize) -> Vec<String> {
    if char_len(&sentence) <= max_chars {
        return vec![sentence];
    }

    let clauses: Vec<String> = sentence
        .split_inclusive(',')
        .map(|clause| clause.trim().to_string())
        .filter(|clause| !clause.is_empty())
        .flat_map(|clause| {
            if char_len(&clause) <= max_chars {
                vec![clause]
            } else {
                split_words(&clause, max_chars)
            }
        })
        .collect();

    merge_pieces(clauses, max_chars)
}

fn split_words(text: &str, max_chars: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    for word in text.split_whitespace() {
        if char_len(word) <= max_chars {
            pieces.push(word.to_string());
        } else {
            // A single word longer than the limit is cut at character boundaries.
            let chars: Vec<char> = word.chars().collect();
            pieces.extend(chars.chunks(max_chars).map(|chunk| chunk.iter().collect()));
        }
    }
    merge_pieces(pieces, max_chars)
}

/// Greedily join pieces with spaces while staying within `max_chars`.
fn merge_pieces(pieces: Vec<String>, max_chars: usize) -> Vec<String> {
    let mut merged: Vec<String> = Vec::new();
    for piece in pieces {
        match merged.last_mut() {
            Some(last) if char_len(last) + 1 + char_len(&piece) <= max_chars => {
                last.push(' ');
                last.push_str(&piece);
            }
            _ => merged.push(piece),
        }
    }
    merged
}
