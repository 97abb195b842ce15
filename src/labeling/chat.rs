// Topic labeling via an OpenAI-compatible chat completions endpoint.
//
// Works against hosted APIs and against a local Ollama instance, which
// exposes the same `/v1/chat/completions` surface. One request covers
// every cluster in a category; the model answers one line per cluster
// ("<id>: <label>") and the response is parsed line by line, so a single
// call labels the whole category.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::pacer::Pacer;
use super::traits::{ClusterSummary, LabelRequest, TopicLabeler};

/// Maximum number of retry attempts on rate-limit (429) responses.
const MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff (doubles each retry).
const BASE_BACKOFF: Duration = Duration::from_secs(2);

/// Maximum backoff delay to cap exponential growth.
const MAX_BACKOFF: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// Labeler backed by a chat completions endpoint.
pub struct ChatLabeler {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    temperature: f64,
    pacer: Pacer,
}

impl ChatLabeler {
    /// Create a labeler pointing at the given base URL (without the
    /// `/v1/chat/completions` suffix). `api_key` is sent as a bearer
    /// token when present; local endpoints don't need one.
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        model: &str,
        temperature: f64,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("sift/0.1")
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model: model.to_string(),
            temperature,
            pacer: Pacer::per_second(1),
        })
    }

    /// Send a single-turn chat completion and return the assistant's text.
    ///
    /// 429 responses are retried with exponential backoff; any other
    /// non-success status fails immediately.
    async fn complete(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
        };

        let mut attempt = 0u32;
        loop {
            self.pacer.wait().await;

            let mut builder = self.client.post(&url).json(&request);
            if let Some(key) = &self.api_key {
                builder = builder.bearer_auth(key);
            }

            let response = builder
                .send()
                .await
                .context("Chat completion request failed")?;

            if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS && attempt < MAX_RETRIES
            {
                attempt += 1;
                // Exponential backoff: base * 2^attempt, capped at MAX_BACKOFF
                let backoff = BASE_BACKOFF
                    .saturating_mul(1u32 << attempt)
                    .min(MAX_BACKOFF);
                warn!(
                    attempt = attempt,
                    max_retries = MAX_RETRIES,
                    backoff_secs = backoff.as_secs(),
                    "Chat endpoint rate limited (429), retrying in {}s",
                    backoff.as_secs()
                );
                tokio::time::sleep(backoff).await;
                continue;
            }

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                anyhow::bail!("Chat endpoint returned {}: {}", status, body);
            }

            let parsed: ChatResponse = response
                .json()
                .await
                .context("Failed to parse chat completion response")?;

            return parsed
                .choices
                .into_iter()
                .next()
                .map(|c| c.message.content)
                .ok_or_else(|| anyhow::anyhow!("Chat completion had no choices"));
        }
    }
}

#[async_trait]
impl TopicLabeler for ChatLabeler {
    async fn label(&self, request: &LabelRequest) -> Result<BTreeMap<i32, String>> {
        if request.clusters.is_empty() {
            return Ok(BTreeMap::new());
        }

        let prompt = build_label_prompt(request);
        let content = self.complete(&prompt).await?;

        debug!(
            category = %request.category,
            "Labeler response:\n{}",
            content
        );

        Ok(parse_label_lines(&content, &request.clusters))
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        self.complete(prompt).await
    }
}

/// Build the labeling prompt: one line per cluster with its keywords and
/// size, plus strict formatting instructions so the response parses.
pub fn build_label_prompt(request: &LabelRequest) -> String {
    let mut prompt = format!(
        "You are labeling topics discovered in customer reviews about \"{}\".\n\
         Each cluster below is described by its most characteristic keywords.\n\
         Give each cluster a short descriptive topic label of 2-5 words,\n\
         in the same language as its keywords.\n\n",
        request.category
    );

    for cluster in &request.clusters {
        prompt.push_str(&format!(
            "Cluster {} ({} reviews): {}\n",
            cluster.cluster_id,
            cluster.size,
            cluster.keywords.join(", ")
        ));
    }

    prompt.push_str("\nAnswer with exactly one line per cluster, formatted as:\n<cluster id>: <label>\n");
    prompt
}

/// Parse "id: label" lines out of a chat response.
///
/// Models dress up their answers — "Cluster 0: ...", bullets, quotes,
/// markdown bold, a prose preamble. Lines that don't resolve to an id
/// present in `clusters` are skipped. When two clusters come back with
/// the same label the later one gets a numeric suffix so topic names
/// stay distinguishable.
pub fn parse_label_lines(content: &str, clusters: &[ClusterSummary]) -> BTreeMap<i32, String> {
    let pattern = Regex::new(r"(?i)^\s*(?:cluster\s+)?(-?\d+)\s*[:.)-]\s*(.+)$")
        .expect("valid pattern");

    let valid_ids: HashSet<i32> = clusters.iter().map(|c| c.cluster_id).collect();
    let mut labels: BTreeMap<i32, String> = BTreeMap::new();
    let mut seen: HashMap<String, u32> = HashMap::new();

    for raw in content.lines() {
        let line = strip_bullet(raw);
        let Some(caps) = pattern.captures(line) else {
            continue;
        };
        let Ok(id) = caps[1].parse::<i32>() else {
            continue;
        };
        // First line for an id wins; unknown ids are hallucinations
        if !valid_ids.contains(&id) || labels.contains_key(&id) {
            continue;
        }

        let label = clean_label(&caps[2]);
        if label.is_empty() {
            continue;
        }

        let count = seen.entry(label.to_lowercase()).or_insert(0);
        *count += 1;
        let label = if *count > 1 {
            format!("{} ({})", label, count)
        } else {
            label
        };

        labels.insert(id, label);
    }

    labels
}

/// Strip a leading list bullet ("- ", "* ", "• ") from a line.
///
/// Only bullet-plus-space is stripped, so a negative id like "-1: noise"
/// survives intact (and is then rejected by the id check).
fn strip_bullet(line: &str) -> &str {
    let trimmed = line.trim_start();
    for bullet in ["- ", "* ", "• "] {
        if let Some(rest) = trimmed.strip_prefix(bullet) {
            return rest.trim_start();
        }
    }
    trimmed
}

/// Normalize a raw label: strip surrounding quotes, markdown bold, and a
/// trailing period.
fn clean_label(raw: &str) -> String {
    let label = raw.trim();
    let label = label.trim_matches('"').trim_matches('\'');
    let label = label
        .trim_start_matches("**")
        .trim_end_matches("**")
        .trim();
    label.trim_end_matches('.').trim().to_string()
}
