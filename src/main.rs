//! CLI shell over the extraction pipeline: reads a script file, starts a
//! run, polls progress, then prints and saves the extracted entries.

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use broll_extractor::modes::{ExtractionMode, LineGrammar};
use broll_extractor::parser;
use broll_extractor::processor::{self, ExtractionSettings};

/// Known model names offered by the selector; any non-empty identifier is
/// accepted since the endpoint treats it as opaque.
const KNOWN_MODELS: &[&str] = &[
    "gpt-4o-mini",
    "gpt-4o",
    "claude-3-5-haiku-latest",
    "llama-3.1-70b",
];

const POLL_INTERVAL: Duration = Duration::from_millis(300);

struct Args {
    script_path: String,
    mode: String,
    model: String,
    knowledge_base: Option<String>,
    schema_tool: Option<String>,
    out_path: Option<String>,
}

fn usage() -> ! {
    eprintln!(
        "Usage: broll-extractor <script.txt> [options]\n\n\
         Options:\n\
           --mode <3-keywords|4-keywords|metadata>   extraction mode (default: 3-keywords)\n\
           --model <name>                            model identifier (default: {})\n\
           --kb <file>                               optional knowledge base text file\n\
           --schema <file>                           optional schema tool text file\n\
           --out <file>                              output file (default: <script>.broll.txt)\n\n\
         Known models: {}\n\n\
         Environment: BROLL_API_URL (required), BROLL_API_KEY (optional),\n\
         both may also come from a .env file in the current or home directory.",
        KNOWN_MODELS[0],
        KNOWN_MODELS.join(", ")
    );
    std::process::exit(2);
}

fn parse_args() -> Result<Args> {
    let mut argv = std::env::args().skip(1);
    let script_path = match argv.next() {
        Some(p) if !p.starts_with("--") => p,
        _ => usage(),
    };

    let mut args = Args {
        script_path,
        mode: "3-keywords".to_string(),
        model: KNOWN_MODELS[0].to_string(),
        knowledge_base: None,
        schema_tool: None,
        out_path: None,
    };

    while let Some(flag) = argv.next() {
        let mut value = || argv.next().unwrap_or_else(|| usage());
        match flag.as_str() {
            "--mode" => args.mode = value(),
            "--model" => args.model = value(),
            "--kb" => args.knowledge_base = Some(value()),
            "--schema" => args.schema_tool = Some(value()),
            "--out" => args.out_path = Some(value()),
            _ => usage(),
        }
    }

    if args.model.trim().is_empty() {
        bail!("model identifier must not be empty");
    }
    Ok(args)
}

/// Resolve a config value from the environment, falling back to a `.env`
/// file in the current directory and then the home directory.
fn env_or_dotenv(name: &str) -> Option<String> {
    if let Ok(value) = std::env::var(name) {
        let value = value.trim().trim_matches('"').to_string();
        if !value.is_empty() {
            return Some(value);
        }
    }

    let mut candidates = vec![std::path::PathBuf::from(".env")];
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(".env"));
    }

    for path in candidates {
        if let Ok(contents) = std::fs::read_to_string(&path) {
            for line in contents.lines() {
                if let Some(rest) = line.strip_prefix(&format!("{}=", name)) {
                    let value = rest.trim().trim_matches('"').to_string();
                    if !value.is_empty() {
                        return Some(value);
                    }
                }
            }
        }
    }
    None
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = parse_args()?;

    let script_text = std::fs::read_to_string(&args.script_path)
        .with_context(|| format!("Failed to read script file {}", args.script_path))?;

    // Side-channel inputs are read fully before the first request and
    // passed unchanged on every request; absence means empty string.
    let knowledge_base = match &args.knowledge_base {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read knowledge base file {}", path))?,
        None => String::new(),
    };
    let schema_tool = match &args.schema_tool {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read schema tool file {}", path))?,
        None => String::new(),
    };

    let endpoint = env_or_dotenv("BROLL_API_URL")
        .context("BROLL_API_URL not set (environment or .env file)")?;
    let api_key = env_or_dotenv("BROLL_API_KEY");

    let mode = ExtractionMode::from_str(&args.mode);
    let settings = ExtractionSettings {
        mode: args.mode.clone(),
        model: args.model.clone(),
    };

    let job_id = processor::start_extraction(
        script_text,
        settings,
        knowledge_base,
        schema_tool,
        endpoint,
        api_key,
    )?;

    // Poll until the run reaches a terminal stage.
    let result = loop {
        tokio::time::sleep(POLL_INTERVAL).await;
        let Some(progress) = processor::get_progress(&job_id) else {
            bail!("extraction job disappeared");
        };
        match progress.stage.as_str() {
            "done" | "error" | "canceled" => {
                break processor::get_result(&job_id)
                    .context("extraction finished without a result")?;
            }
            stage => {
                if progress.chunks_total > 0 {
                    eprintln!(
                        "  {} {}/{}",
                        stage, progress.chunks_done, progress.chunks_total
                    );
                }
            }
        }
    };

    // Metadata entries are paired Title+Meta units at export time; phrase
    // entries are already one unit per line.
    let (export, separator) = match mode.config().grammar {
        LineGrammar::Metadata => (parser::pair_metadata_lines(&result.entries), "\n\n"),
        LineGrammar::WordCount(_) => (result.entries.clone(), "\n"),
    };

    println!("Sentences: {}", result.sentence_count);
    println!("Entries: {}", result.entry_count);
    println!();
    println!("{}", export.join(separator));

    let out_path = args.out_path.clone().unwrap_or_else(|| {
        Path::new(&args.script_path)
            .with_extension("broll.txt")
            .to_string_lossy()
            .into_owned()
    });
    std::fs::write(&out_path, export.join(separator))
        .with_context(|| format!("Failed to write {}", out_path))?;
    eprintln!("Results written to {}", out_path);

    Ok(())
}
