use serde::{Deserialize, Serialize};

/// Sampling temperature used for every mode.
pub const TEMPERATURE: f64 = 0.7;

/// The output grammar the parser applies to each completion body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineGrammar {
    /// Keep only lines with exactly this many whitespace-separated tokens.
    WordCount(usize),
    /// Keep every non-blank line verbatim (`Title:` / `Meta:` content).
    Metadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtractionMode {
    ShortPhrase,
    LongPhrase,
    Metadata,
}

/// Everything a run needs per mode: instruction text, request parameters,
/// batch size and the validation grammar. Resolved once at run start.
#[derive(Debug, Clone, Copy)]
pub struct ModeConfig {
    pub instruction: &'static str,
    pub task: &'static str,
    pub max_tokens: u32,
    pub batch_size: usize,
    pub grammar: LineGrammar,
}

impl ExtractionMode {
    pub fn from_str(s: &str) -> Self {
        match s {
            "4-keywords" => ExtractionMode::LongPhrase,
            "metadata" => ExtractionMode::Metadata,
            _ => ExtractionMode::ShortPhrase,
        }
    }

    /// Pure configuration lookup — the mode set is closed, so this cannot miss.
    pub fn config(&self) -> ModeConfig {
        match self {
            ExtractionMode::ShortPhrase => ModeConfig {
                instruction: SHORT_PHRASE_INSTRUCTION,
                task: "Extract one 3-word b-roll search phrase per sentence from this script passage:",
                max_tokens: 1000,
                batch_size: 10,
                grammar: LineGrammar::WordCount(3),
            },
            ExtractionMode::LongPhrase => ModeConfig {
                instruction: LONG_PHRASE_INSTRUCTION,
                task: "Extract one 4-word b-roll search phrase per sentence from this script passage:",
                max_tokens: 1000,
                batch_size: 10,
                grammar: LineGrammar::WordCount(4),
            },
            ExtractionMode::Metadata => ModeConfig {
                instruction: METADATA_INSTRUCTION,
                task: "Extract stock footage titles and metadata keywords from this script passage:",
                max_tokens: 1500,
                batch_size: 8,
                grammar: LineGrammar::Metadata,
            },
        }
    }
}

const SHORT_PHRASE_INSTRUCTION: &str = r#"You are a b-roll researcher for video production. You turn narrative script sentences into short search phrases for stock footage libraries.

For EACH sentence you receive, write EXACTLY ONE phrase of EXACTLY 3 words describing a concrete, filmable visual that matches the sentence's emotional beat. Prefer subjects, actions and settings a stock library would index.

Rules:
- Exactly 3 words per phrase. No more, no fewer.
- Concrete visuals only: people, actions, objects, places. No abstractions like "success" or "freedom".
- No punctuation inside a phrase, no numbering, no bullets, no quotes.
- One phrase per line.

Examples:
Sentence: "She stared at the test results, unable to tell her family what the doctor had said."
Phrase: woman hiding diagnosis

Sentence: "Every morning he forced himself through the same gray routine."
Phrase: man monotonous commute

Output ONLY the list of phrases, one per line, with no commentary before or after."#;

const LONG_PHRASE_INSTRUCTION: &str = r#"You are a b-roll researcher for video production. You turn narrative script sentences into short search phrases for stock footage libraries.

For EACH sentence you receive, write EXACTLY ONE phrase of EXACTLY 4 words describing a concrete, filmable visual that matches the sentence's emotional beat. The extra word lets you add a setting or mood qualifier.

Rules:
- Exactly 4 words per phrase. No more, no fewer.
- Concrete visuals only: people, actions, objects, places. No abstractions.
- No punctuation inside a phrase, no numbering, no bullets, no quotes.
- One phrase per line.

Examples:
Sentence: "She stared at the test results, unable to tell her family what the doctor had said."
Phrase: worried woman reading letter

Sentence: "Every morning he forced himself through the same gray routine."
Phrase: tired man crowded subway

Output ONLY the list of phrases, one per line, with no commentary before or after."#;

const METADATA_INSTRUCTION: &str = r#"You are a b-roll researcher for video production. You turn narrative script passages into stock-footage search metadata.

For each distinct scene in the passage, output a metadata block:
- An optional line starting with "Title: " giving the scene a short evocative name.
- A line starting with "Meta: " listing 3 to 6 comma-separated visual keywords a stock library would index (subjects, actions, settings, mood).

A "Title:" line must be immediately followed by its "Meta:" line. A "Meta:" line may also stand alone for minor scenes.

Example output:
Title: Avoiding Affection
Meta: woman, children, sadness, living room

Meta: scientist, lab, focused

Output ONLY these lines, with no commentary before or after."#;
