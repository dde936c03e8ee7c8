use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::completion::{ChunkRequest, CompletionApi, HttpCompletionClient};
use crate::error::ExtractError;
use crate::modes::ExtractionMode;
use crate::{parser, script};

/// Fixed throttle between chunk requests. Not adaptive: the point is to
/// keep the remote service's load predictable, not to negotiate rates.
pub const REQUEST_DELAY: Duration = Duration::from_millis(600);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionSettings {
    pub mode: String,
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Progress {
    pub stage: String,
    pub chunks_done: usize,
    pub chunks_total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub sentence_count: usize,
    pub entry_count: usize,
    pub entries: Vec<String>,
}

#[derive(Debug)]
struct ExtractionJob {
    progress: Progress,
    result: Option<ExtractionResult>,
    cancel: Arc<AtomicBool>,
}

static JOBS: Lazy<Mutex<HashMap<String, ExtractionJob>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Start an extraction run in the background and return its job id.
///
/// The presentation layer polls `get_progress` / `get_result` and may call
/// `cancel_extraction`. An empty script is rejected up front, before any
/// job state is created.
pub fn start_extraction(
    script_text: String,
    settings: ExtractionSettings,
    knowledge_base: String,
    schema_tool: String,
    endpoint: String,
    api_key: Option<String>,
) -> Result<String, ExtractError> {
    if script_text.trim().is_empty() {
        return Err(ExtractError::EmptyScript);
    }

    let job_id = Uuid::new_v4().to_string();
    let cancel = Arc::new(AtomicBool::new(false));

    JOBS.lock().unwrap().insert(
        job_id.clone(),
        ExtractionJob {
            progress: Progress {
                stage: "splitting".to_string(),
                chunks_done: 0,
                chunks_total: 0,
            },
            result: None,
            cancel: cancel.clone(),
        },
    );

    let id = job_id.clone();
    tokio::spawn(async move {
        let mode = ExtractionMode::from_str(&settings.mode);
        let client = match HttpCompletionClient::new(endpoint, api_key) {
            Ok(client) => client,
            Err(e) => {
                finish_failed(&id, &e);
                return;
            }
        };

        let outcome = run_extraction(
            &client,
            &script_text,
            mode,
            &settings.model,
            &knowledge_base,
            &schema_tool,
            &cancel,
            |done, total| update_progress(&id, "extracting", done, total),
        )
        .await;

        match outcome {
            Ok(result) => {
                eprintln!(
                    "Extraction complete: {} sentences -> {} entries",
                    result.sentence_count, result.entry_count
                );
                let mut jobs = JOBS.lock().unwrap();
                if let Some(job) = jobs.get_mut(&id) {
                    job.progress.stage = "done".to_string();
                    job.result = Some(result);
                }
            }
            Err(ExtractError::Canceled) => {
                eprintln!("Extraction canceled");
                let mut jobs = JOBS.lock().unwrap();
                if let Some(job) = jobs.get_mut(&id) {
                    job.progress.stage = "canceled".to_string();
                    job.result = Some(degraded_result(&ExtractError::Canceled));
                }
            }
            Err(e) => {
                eprintln!("Extraction error: {}", e);
                finish_failed(&id, &e);
            }
        }
    });

    Ok(job_id)
}

/// Run the full pipeline: split, batch, then one completion request per
/// chunk, strictly sequential with a fixed delay between requests.
///
/// Any transport, status or envelope failure aborts the remaining chunks;
/// there is no per-chunk retry. The cancellation flag is checked before
/// each chunk's request. A script that yields zero sentences produces an
/// all-zero result without issuing a single request.
#[allow(clippy::too_many_arguments)]
pub async fn run_extraction<C: CompletionApi>(
    client: &C,
    script_text: &str,
    mode: ExtractionMode,
    model: &str,
    knowledge_base: &str,
    schema_tool: &str,
    cancel: &AtomicBool,
    on_progress: impl Fn(usize, usize),
) -> Result<ExtractionResult, ExtractError> {
    let config = mode.config();
    let sentences = script::split_sentences(script_text);
    let chunks = script::batch_sentences(&sentences, config.batch_size);

    eprintln!(
        "Extracting from {} sentences in {} chunks (model: {})",
        sentences.len(),
        chunks.len(),
        model
    );

    let mut entries: Vec<String> = Vec::new();
    for (i, chunk) in chunks.iter().enumerate() {
        if cancel.load(Ordering::Relaxed) {
            return Err(ExtractError::Canceled);
        }

        let body = client
            .complete(ChunkRequest {
                model,
                config: &config,
                chunk_text: chunk,
                knowledge_base,
                schema_tool,
            })
            .await?;

        let accepted = parser::parse_completion(&body, config.grammar);
        eprintln!("  chunk {}/{}: {} entries", i + 1, chunks.len(), accepted.len());
        entries.extend(accepted);
        on_progress(i + 1, chunks.len());

        if i + 1 < chunks.len() {
            tokio::time::sleep(REQUEST_DELAY).await;
        }
    }

    entries.retain(|e| !e.trim().is_empty());

    Ok(ExtractionResult {
        sentence_count: sentences.len(),
        entry_count: entries.len(),
        entries,
    })
}

/// The degraded result a failed run surfaces in place of extracted
/// entries: a single synthetic error line, counts reset to zero.
pub fn degraded_result(error: &ExtractError) -> ExtractionResult {
    ExtractionResult {
        sentence_count: 0,
        entry_count: 0,
        entries: vec![format!("Extraction failed: {}", error)],
    }
}

fn finish_failed(job_id: &str, error: &ExtractError) {
    let mut jobs = JOBS.lock().unwrap();
    if let Some(job) = jobs.get_mut(job_id) {
        job.progress.stage = "error".to_string();
        job.result = Some(degraded_result(error));
    }
}

fn update_progress(job_id: &str, stage: &str, done: usize, total: usize) {
    let mut jobs = JOBS.lock().unwrap();
    if let Some(job) = jobs.get_mut(job_id) {
        job.progress = Progress {
            stage: stage.to_string(),
            chunks_done: done,
            chunks_total: total,
        };
    }
}

pub fn get_progress(job_id: &str) -> Option<Progress> {
    JOBS.lock().unwrap().get(job_id).map(|job| job.progress.clone())
}

pub fn get_result(job_id: &str) -> Option<ExtractionResult> {
    JOBS.lock().unwrap().get(job_id).and_then(|job| job.result.clone())
}

pub fn cancel_extraction(job_id: &str) {
    if let Some(job) = JOBS.lock().unwrap().get(job_id) {
        job.cancel.store(true, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    /// Mock completion service: replays canned bodies in call order and
    /// fails any call beyond the scripted ones.
    struct MockApi {
        bodies: Vec<Result<String, ()>>,
        calls: AtomicUsize,
    }

    impl MockApi {
        fn new(bodies: Vec<Result<String, ()>>) -> Self {
            Self {
                bodies,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl CompletionApi for MockApi {
        fn complete(
            &self,
            _request: ChunkRequest<'_>,
        ) -> impl std::future::Future<Output = Result<String, ExtractError>> + Send {
            let i = self.calls.fetch_add(1, Ordering::SeqCst);
            let outcome = match self.bodies.get(i) {
                Some(Ok(body)) => Ok(body.clone()),
                _ => Err(ExtractError::MalformedResponse(
                    "no choices/message/content in payload".to_string(),
                )),
            };
            async move { outcome }
        }
    }

    fn script_of(n: usize) -> String {
        (0..n)
            .map(|i| format!("Sentence number {} tells part of the story.", i))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[tokio::test]
    async fn aggregates_entries_across_chunks_in_order() {
        // 12 sentences at batch size 10 -> 2 chunks
        let api = MockApi::new(vec![
            Ok("doctor pauses spotlight\nwoman gargles mirror".to_string()),
            Ok("child empty playground".to_string()),
        ]);
        let cancel = AtomicBool::new(false);

        let result = run_extraction(
            &api,
            &script_of(12),
            ExtractionMode::ShortPhrase,
            "test-model",
            "",
            "",
            &cancel,
            |_, _| {},
        )
        .await
        .unwrap();

        assert_eq!(api.calls(), 2);
        assert_eq!(result.sentence_count, 12);
        assert_eq!(result.entry_count, 3);
        assert_eq!(
            result.entries,
            vec![
                "doctor pauses spotlight",
                "woman gargles mirror",
                "child empty playground"
            ]
        );
    }

    #[tokio::test]
    async fn identical_responses_yield_identical_results() {
        let cancel = AtomicBool::new(false);
        let mut results = Vec::new();
        for _ in 0..2 {
            let api = MockApi::new(vec![Ok("man rainy street\nwoman closing shutters".to_string())]);
            let result = run_extraction(
                &api,
                &script_of(5),
                ExtractionMode::ShortPhrase,
                "test-model",
                "",
                "",
                &cancel,
                |_, _| {},
            )
            .await
            .unwrap();
            results.push(result);
        }
        assert_eq!(results[0], results[1]);
    }

    #[tokio::test]
    async fn malformed_response_aborts_remaining_chunks() {
        // 25 sentences -> 3 chunks; the second call fails.
        let api = MockApi::new(vec![
            Ok("doctor pauses spotlight".to_string()),
            Err(()),
            Ok("never requested phrase".to_string()),
        ]);
        let cancel = AtomicBool::new(false);

        let err = run_extraction(
            &api,
            &script_of(25),
            ExtractionMode::ShortPhrase,
            "test-model",
            "",
            "",
            &cancel,
            |_, _| {},
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ExtractError::MalformedResponse(_)));
        assert_eq!(api.calls(), 2);

        let degraded = degraded_result(&err);
        assert_eq!(degraded.sentence_count, 0);
        assert_eq!(degraded.entry_count, 0);
        assert_eq!(degraded.entries.len(), 1);
        assert!(degraded.entries[0].starts_with("Extraction failed:"));
    }

    #[tokio::test]
    async fn noise_only_script_issues_no_requests() {
        let api = MockApi::new(vec![Ok("should never be used".to_string())]);
        let cancel = AtomicBool::new(false);

        let result = run_extraction(
            &api,
            "1. 2. short.",
            ExtractionMode::ShortPhrase,
            "test-model",
            "",
            "",
            &cancel,
            |_, _| {},
        )
        .await
        .unwrap();

        assert_eq!(api.calls(), 0);
        assert_eq!(result.sentence_count, 0);
        assert_eq!(result.entry_count, 0);
        assert!(result.entries.is_empty());
    }

    #[tokio::test]
    async fn cancellation_flag_stops_before_first_request() {
        let api = MockApi::new(vec![Ok("never sent anywhere".to_string())]);
        let cancel = AtomicBool::new(true);

        let err = run_extraction(
            &api,
            &script_of(3),
            ExtractionMode::ShortPhrase,
            "test-model",
            "",
            "",
            &cancel,
            |_, _| {},
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ExtractError::Canceled));
        assert_eq!(api.calls(), 0);
    }

    #[tokio::test]
    async fn progress_callback_reports_each_chunk() {
        let api = MockApi::new(vec![
            Ok("one two three".to_string()),
            Ok("four five six".to_string()),
        ]);
        let cancel = AtomicBool::new(false);
        let seen = Mutex::new(Vec::new());

        run_extraction(
            &api,
            &script_of(12),
            ExtractionMode::ShortPhrase,
            "test-model",
            "",
            "",
            &cancel,
            |done, total| seen.lock().unwrap().push((done, total)),
        )
        .await
        .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![(1, 2), (2, 2)]);
    }

    #[test]
    fn empty_script_is_rejected_before_any_job_exists() {
        let err = start_extraction(
            "   \n".to_string(),
            ExtractionSettings {
                mode: "3-keywords".to_string(),
                model: "test-model".to_string(),
            },
            String::new(),
            String::new(),
            "http://localhost:0".to_string(),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, ExtractError::EmptyScript));
    }
}
