use once_cell::sync::Lazy;
use regex::Regex;

/// Fragments at or below this trimmed length are noise, not sentences.
const MIN_SENTENCE_LEN: usize = 10;

static SENTENCE_BOUNDARY: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]+").unwrap());

/// List numbering that leaks into fragments when scripts carry
/// "1." / "2)" style markers: digits plus optional trailing punctuation.
static BARE_NUMBERING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+[[:punct:]]*$").unwrap());

/// Split a raw script into candidate sentences.
///
/// Splits on runs of sentence-terminal punctuation, trims each fragment,
/// and discards short fragments and bare numbering artifacts. An empty or
/// all-noise script yields an empty list; downstream stages treat that as
/// zero chunks and zero requests, not an error.
pub fn split_sentences(script: &str) -> Vec<String> {
    SENTENCE_BOUNDARY
        .split(script)
        .map(|fragment| fragment.trim())
        .filter(|fragment| {
            fragment.chars().count() > MIN_SENTENCE_LEN && !BARE_NUMBERING.is_match(fragment)
        })
        .map(|fragment| fragment.to_string())
        .collect()
}

/// Group sentences into chunks of up to `batch_size`, re-joined into a
/// single text blob with the terminal punctuation reinserted.
///
/// The chunks partition the sentences in order with no overlap and no
/// gaps; the final chunk may be short.
pub fn batch_sentences(sentences: &[String], batch_size: usize) -> Vec<String> {
    sentences
        .chunks(batch_size)
        .map(|group| format!("{}.", group.join(". ")))
        .collect()
}
