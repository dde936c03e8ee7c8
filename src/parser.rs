use crate::modes::LineGrammar;

/// Parse one completion body according to the active mode's line grammar.
///
/// Phrase modes keep only lines whose token count matches exactly; anything
/// else (commentary, truncated phrases, blank lines) is dropped silently —
/// a validation filter, not an error. Metadata mode keeps every non-blank
/// line verbatim since lines carry heterogeneous `Title:`/`Meta:` content.
pub fn parse_completion(body: &str, grammar: LineGrammar) -> Vec<String> {
    match grammar {
        LineGrammar::WordCount(count) => body
            .trim()
            .lines()
            .map(clean_phrase_line)
            .filter(|line| !line.is_empty())
            .filter(|line| line.split_whitespace().count() == count)
            .collect(),
        LineGrammar::Metadata => body
            .trim()
            .lines()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .collect(),
    }
}

/// Strip a leading bullet marker and any quote characters, then trim.
/// Models often decorate list output despite being told not to.
fn clean_phrase_line(line: &str) -> String {
    let line = line.trim();
    let line = line
        .strip_prefix("- ")
        .or_else(|| line.strip_prefix("• "))
        .unwrap_or(line);
    line.chars()
        .filter(|&c| !matches!(c, '"' | '\'' | '“' | '”' | '‘' | '’'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Export-time pairing of metadata lines: a `Title:` line is reported
/// together with the `Meta:` line immediately following it; a `Meta:` line
/// with no preceding title stands alone.
pub fn pair_metadata_lines(lines: &[String]) -> Vec<String> {
    let mut units = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        let line = &lines[i];
        if line.starts_with("Title:") {
            if let Some(next) = lines.get(i + 1) {
                if next.starts_with("Meta:") {
                    units.push(format!("{}\n{}", line, next));
                    i += 2;
                    continue;
                }
            }
        }
        units.push(line.clone());
        i += 1;
    }
    units
}
