//! Outline and chapter drafting against an OpenAI-style responses API.
//!
//! Generation is best-effort by contract: a missing API key, an exhausted
//! retry budget or an unusable response never aborts the build. Every
//! failure path degrades to deterministic locally synthesized content and
//! reports itself through [`Generated::warning`].
//!
//! Chapter drafting fans out over a bounded `JoinSet` worker pool and
//! re-sorts results by chapter index before returning.

use std::time::Duration;

use crate::book::{BookConfig, ChapterContent, ChapterStub, Outline};

/// Default in-flight request cap for chapter drafting.
const DEFAULT_CONCURRENCY: usize = 3;
/// Default retry budget for transient failures.
const DEFAULT_RETRIES: usize = 2;
/// First backoff delay; doubles per attempt.
const BACKOFF_BASE_MS: u64 = 500;
/// Backoff ceiling.
const BACKOFF_CAP_MS: u64 = 8_000;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Generation result: the data plus how it was obtained.
#[derive(Debug, Clone)]
pub struct Generated<T> {
    pub data: T,
    pub used_fallback: bool,
    pub warning: Option<String>,
}

/// Client for the drafting service.
#[derive(Clone)]
pub struct GenerationClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    concurrency: usize,
    retries: usize,
}

enum CallError {
    Transient(String),
    Fatal(String),
}

enum ChapterOutcome {
    Drafted(ChapterContent),
    Fallback { stub: ChapterStub, error: String },
}

impl GenerationClient {
    /// Reads `BOOKPRESS_API_KEY` (falling back to `OPENAI_API_KEY`),
    /// `BOOKPRESS_API_BASE` and `BOOKPRESS_MODEL` from the environment.
    pub fn from_env() -> Self {
        let api_key = std::env::var("BOOKPRESS_API_KEY")
            .or_else(|_| std::env::var("OPENAI_API_KEY"))
            .ok()
            .filter(|key| !key.trim().is_empty());
        let base = std::env::var("BOOKPRESS_API_BASE")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model =
            std::env::var("BOOKPRESS_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        GenerationClient {
            client: reqwest::Client::new(),
            endpoint: responses_endpoint(&base),
            api_key,
            model,
            concurrency: DEFAULT_CONCURRENCY,
            retries: DEFAULT_RETRIES,
        }
    }

    /// A client with no credentials; every call takes the fallback path.
    pub fn offline() -> Self {
        GenerationClient {
            client: reqwest::Client::new(),
            endpoint: responses_endpoint(DEFAULT_BASE_URL),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            concurrency: DEFAULT_CONCURRENCY,
            retries: DEFAULT_RETRIES,
        }
    }

    pub fn has_credentials(&self) -> bool {
        self.api_key.is_some()
    }

    /// Plans the chapter list for the configured book.
    pub async fn generate_outline(&self, config: &BookConfig) -> Generated<Outline> {
        let Some(api_key) = self.api_key.clone() else {
            log::info!("no API key configured; synthesizing the outline locally");
            return Generated {
                data: fallback_outline(config),
                used_fallback: true,
                warning: Some("no API key configured; outline was synthesized locally".into()),
            };
        };

        let instructions = outline_instructions(config);
        let input = outline_input(config);
        match self.call_with_retry(&api_key, &instructions, &input).await {
            Ok(raw) => match parse_outline_json(&raw, config) {
                Ok(outline) => Generated {
                    data: outline,
                    used_fallback: false,
                    warning: None,
                },
                Err(reason) => {
                    log::warn!("outline response unusable: {reason}");
                    Generated {
                        data: fallback_outline(config),
                        used_fallback: true,
                        warning: Some(format!(
                            "outline response unusable ({reason}); synthesized locally"
                        )),
                    }
                }
            },
            Err(detail) => {
                log::warn!("outline generation failed: {detail}");
                Generated {
                    data: fallback_outline(config),
                    used_fallback: true,
                    warning: Some(format!(
                        "outline generation failed ({detail}); synthesized locally"
                    )),
                }
            }
        }
    }

    /// Drafts every outlined chapter, a bounded number in flight at once.
    /// Individual failures fall back per chapter; the result is always
    /// complete and sorted by chapter index.
    pub async fn generate_chapters(
        &self,
        config: &BookConfig,
        outline: &Outline,
    ) -> Generated<Vec<ChapterContent>> {
        let stubs = outline.chapters.clone();
        if stubs.is_empty() {
            return Generated {
                data: Vec::new(),
                used_fallback: false,
                warning: None,
            };
        }

        let Some(api_key) = self.api_key.clone() else {
            log::info!("no API key configured; synthesizing chapters locally");
            let chapters = stubs.iter().map(|s| fallback_chapter(config, s)).collect();
            return Generated {
                data: chapters,
                used_fallback: true,
                warning: Some("no API key configured; chapters were synthesized locally".into()),
            };
        };

        let concurrency = self.concurrency.max(1);
        let mut join_set = tokio::task::JoinSet::new();
        let mut next_idx = 0usize;
        let mut results: Vec<Option<ChapterContent>> = vec![None; stubs.len()];
        let mut fallbacks = 0usize;

        while next_idx < stubs.len() || !join_set.is_empty() {
            while next_idx < stubs.len() && join_set.len() < concurrency {
                let worker = self.clone();
                let api_key = api_key.clone();
                let config = config.clone();
                let stub = stubs[next_idx].clone();
                let slot = next_idx;

                join_set.spawn(async move {
                    log::debug!("drafting chapter {} `{}`", stub.index, stub.title);
                    let instructions = chapter_instructions(&config);
                    let input = chapter_input(&config, &stub);
                    let outcome = match worker
                        .call_with_retry(&api_key, &instructions, &input)
                        .await
                    {
                        Ok(body) => ChapterOutcome::Drafted(ChapterContent {
                            index: stub.index,
                            title: stub.title.clone(),
                            body: clean_chapter_body(&body),
                        }),
                        Err(error) => ChapterOutcome::Fallback { stub, error },
                    };
                    (slot, outcome)
                });
                next_idx += 1;
            }

            let Some(joined) = join_set.join_next().await else {
                break;
            };
            match joined {
                Ok((slot, ChapterOutcome::Drafted(chapter))) => {
                    results[slot] = Some(chapter);
                }
                Ok((slot, ChapterOutcome::Fallback { stub, error })) => {
                    fallbacks += 1;
                    log::warn!(
                        "chapter {} draft failed: {error}; using synthesized text",
                        stub.index
                    );
                    results[slot] = Some(fallback_chapter(config, &stub));
                }
                Err(e) => {
                    // The slot stays empty and is backfilled below.
                    log::warn!("chapter draft task failed: {e}");
                }
            }
        }

        let mut chapters = Vec::with_capacity(stubs.len());
        for (i, slot) in results.into_iter().enumerate() {
            match slot {
                Some(chapter) => chapters.push(chapter),
                None => {
                    fallbacks += 1;
                    chapters.push(fallback_chapter(config, &stubs[i]));
                }
            }
        }
        chapters.sort_by_key(|c| c.index);

        let warning = (fallbacks > 0).then(|| {
            format!(
                "{fallbacks} of {} chapters used locally synthesized text",
                stubs.len()
            )
        });
        Generated {
            data: chapters,
            used_fallback: fallbacks > 0,
            warning,
        }
    }

    /// One call with capped exponential backoff on transient failures.
    async fn call_with_retry(
        &self,
        api_key: &str,
        instructions: &str,
        input: &str,
    ) -> std::result::Result<String, String> {
        let attempts = self.retries.saturating_add(1);
        let mut last = String::new();
        for attempt in 0..attempts {
            match self.call_model(api_key, instructions, input).await {
                Ok(text) => return Ok(text),
                Err(CallError::Transient(detail)) => {
                    last = detail;
                    if attempt + 1 < attempts {
                        let delay = (BACKOFF_BASE_MS << attempt.min(5)).min(BACKOFF_CAP_MS);
                        log::warn!(
                            "transient model error (attempt {}/{attempts}): {last}; retrying in {delay}ms",
                            attempt + 1
                        );
                        tokio::time::sleep(Duration::from_millis(delay)).await;
                    }
                }
                Err(CallError::Fatal(detail)) => return Err(detail),
            }
        }
        Err(last)
    }

    async fn call_model(
        &self,
        api_key: &str,
        instructions: &str,
        input: &str,
    ) -> std::result::Result<String, CallError> {
        let body = serde_json::json!({
            "model": self.model,
            "instructions": instructions,
            "input": input,
            "text": { "format": { "type": "text" } },
            "store": false,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| CallError::Transient(format!("POST {}: {e}", self.endpoint)))?;

        let status = response.status();
        let raw = response
            .text()
            .await
            .map_err(|e| CallError::Transient(format!("read response body: {e}")))?;
        if !status.is_success() {
            let message = parse_error_message(&raw).unwrap_or_else(|| raw.clone());
            let detail = format!("model API error ({status}): {message}");
            return if is_transient(status, &message) {
                Err(CallError::Transient(detail))
            } else {
                Err(CallError::Fatal(detail))
            };
        }

        let value: serde_json::Value = serde_json::from_str(&raw)
            .map_err(|e| CallError::Fatal(format!("parse model response: {e}")))?;
        extract_output_text(&value)
            .ok_or_else(|| CallError::Fatal("model output text is empty".to_string()))
    }
}

pub fn responses_endpoint(base_url: &str) -> String {
    let base_url = base_url.trim_end_matches('/');
    format!("{base_url}/responses")
}

/// HTTP 429 and every 5xx are retried, plus the usual load-shedding
/// phrasings some gateways return with other codes.
fn is_transient(status: reqwest::StatusCode, message: &str) -> bool {
    if status.as_u16() == 429 || status.is_server_error() {
        return true;
    }
    let lower = message.to_ascii_lowercase();
    lower.contains("rate limit") || lower.contains("overloaded") || lower.contains("unavailable")
}

fn parse_error_message(raw_json: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(raw_json).ok()?;
    let message = value.get("error")?.get("message")?.as_str()?.to_owned();
    Some(message)
}

fn extract_output_text(value: &serde_json::Value) -> Option<String> {
    let output = value.get("output")?.as_array()?;
    let mut text = String::new();
    for item in output {
        if item.get("type").and_then(|v| v.as_str()) != Some("message") {
            continue;
        }
        let Some(content) = item.get("content").and_then(|v| v.as_array()) else {
            continue;
        };
        for part in content {
            if part.get("type").and_then(|v| v.as_str()) != Some("output_text") {
                continue;
            }
            if let Some(part_text) = part.get("text").and_then(|v| v.as_str()) {
                text.push_str(part_text);
            }
        }
    }
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Models often wrap JSON in a markdown code fence; peel it off.
fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    let inner = inner.strip_prefix('\n').unwrap_or(inner);
    match inner.strip_suffix("```") {
        Some(body) => body.trim(),
        None => trimmed,
    }
}

/// Parses `{"chapters":[{"title","summary"},…]}` (or a bare array),
/// re-indexes densely from 1 and forces the configured chapter count.
fn parse_outline_json(raw: &str, config: &BookConfig) -> std::result::Result<Outline, String> {
    let cleaned = strip_code_fences(raw);
    let value: serde_json::Value =
        serde_json::from_str(cleaned).map_err(|e| format!("invalid JSON: {e}"))?;
    let stubs = value
        .get("chapters")
        .and_then(|v| v.as_array())
        .or_else(|| value.as_array())
        .ok_or_else(|| "no chapter array".to_string())?;

    let mut chapters = Vec::new();
    for stub in stubs {
        let title = stub
            .get("title")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .trim()
            .to_string();
        if title.is_empty() {
            continue;
        }
        let summary = stub
            .get("summary")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .trim()
            .to_string();
        chapters.push(ChapterStub {
            index: chapters.len() + 1,
            title,
            summary,
        });
    }
    if chapters.is_empty() {
        return Err("no usable chapters".to_string());
    }

    chapters.truncate(config.chapter_count);
    let mut next = chapters.len() + 1;
    while chapters.len() < config.chapter_count {
        chapters.push(fallback_stub(config, next));
        next += 1;
    }
    let title = value
        .get("title")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(&config.title)
        .to_string();
    Ok(Outline { title, chapters })
}

fn topic_or_title(config: &BookConfig) -> &str {
    if config.topic.trim().is_empty() {
        &config.title
    } else {
        &config.topic
    }
}

fn outline_instructions(config: &BookConfig) -> String {
    format!(
        "You plan books. Respond with JSON only, shaped as \
         {{\"chapters\":[{{\"index\":1,\"title\":\"...\",\"summary\":\"...\"}}]}}. \
         Plan exactly {} chapters. Write in {}.",
        config.chapter_count, config.language
    )
}

fn outline_input(config: &BookConfig) -> String {
    format!(
        "Title: {}\nTopic: {}\nGenre: {}\nAudience: {}\nTone: {}",
        config.title,
        topic_or_title(config),
        config.genre.as_str(),
        config.audience,
        config.effective_tone()
    )
}

fn chapter_instructions(config: &BookConfig) -> String {
    format!(
        "You draft book chapters in simple markup: ## headings, - bullet \
         lists, > quotes, **bold**, *italic*. Aim for about {} words. \
         Write in {}, tone: {}. Respond with the chapter text only.",
        config.words_per_chapter,
        config.language,
        config.effective_tone()
    )
}

fn chapter_input(config: &BookConfig, stub: &ChapterStub) -> String {
    format!(
        "Book: {} ({})\nChapter {}: {}\nSummary: {}",
        config.title,
        config.genre.as_str(),
        stub.index,
        stub.title,
        stub.summary
    )
}

fn clean_chapter_body(raw: &str) -> String {
    strip_code_fences(raw).trim().to_string()
}

const STUB_THEMES: [&str; 10] = [
    "Setting Out",
    "First Signs",
    "A Turn in the Road",
    "What the Quiet Held",
    "Crossing Over",
    "The Long Middle",
    "Turning Back",
    "What Remains",
    "A Door Opens",
    "Closing the Distance",
];

fn fallback_stub(config: &BookConfig, index: usize) -> ChapterStub {
    let theme = STUB_THEMES[(index - 1) % STUB_THEMES.len()];
    ChapterStub {
        index,
        title: format!("Chapter {index}: {theme}"),
        summary: format!(
            "The {} of {} continues, one step further along.",
            config.genre.as_str(),
            topic_or_title(config)
        ),
    }
}

fn fallback_outline(config: &BookConfig) -> Outline {
    let chapters = (1..=config.chapter_count)
        .map(|index| fallback_stub(config, index))
        .collect();
    Outline {
        title: config.title.clone(),
        chapters,
    }
}

/// Deterministic placeholder prose exercising every markup feature, so an
/// offline build still produces a presentable book.
fn fallback_chapter(config: &BookConfig, stub: &ChapterStub) -> ChapterContent {
    let topic = topic_or_title(config);
    let mut body = String::new();
    if !stub.summary.trim().is_empty() {
        body.push_str(stub.summary.trim());
        body.push_str("\n\n");
    }
    body.push_str(&format!(
        "This chapter of *{}* turns to {topic}. It moves in small steps, \
         slows where the ground is uncertain, and keeps **{topic}** in view \
         the whole way.\n\n",
        config.title
    ));
    body.push_str("A few things carry forward:\n\n");
    body.push_str(
        "- what came before shapes what comes next\n\
         - small details matter more than they first seem\n\
         - the pace is set by the landscape, not the walker\n\n",
    );
    body.push_str(&format!(
        "> Every {} worth telling begins before its first page.\n\n",
        config.genre.as_str()
    ));
    body.push_str("The next chapter picks the thread up where this one lets it rest.");
    ChapterContent {
        index: stub.index,
        title: stub.title.clone(),
        body,
    }
}
