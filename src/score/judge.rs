//! Rubric judge: delegates pair evaluation to an external model and parses
//! its structured verdict.
//!
//! One outbound chat-completions request per pair. Transport failures retry
//! with exponential backoff; unparseable verdicts get one lenient re-parse
//! (code fences and surrounding prose stripped) and are then recorded as
//! judge-failed instead of aborting the batch. Scores outside 0-100 are
//! clamped, not rejected, since the judge is not a trusted boundary.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use crate::policy::PolicyPair;

/// Judge collaborator failure modes
#[derive(Debug, thiserror::Error)]
pub enum JudgeError {
    #[error("judge transport failure: {0}")]
    Transport(String),
    #[error("unparseable judge verdict: {0}")]
    Parse(String),
    #[error("evaluation cancelled before the pair was judged")]
    Cancelled,
}

/// Five rubric sub-scores on a 0-100 scale plus their mean
#[derive(Debug, Clone, Serialize)]
pub struct RubricScores {
    pub alignment: u8,
    pub completeness: u8,
    pub actionability: u8,
    pub technical_accuracy: u8,
    pub linguistic_quality: u8,
    pub overall: f64,
}

impl RubricScores {
    fn new(alignment: f64, completeness: f64, actionability: f64, technical: f64, linguistic: f64) -> Self {
        let clamp = |v: f64| v.clamp(0.0, 100.0).round() as u8;
        let (alignment, completeness, actionability, technical_accuracy, linguistic_quality) = (
            clamp(alignment),
            clamp(completeness),
            clamp(actionability),
            clamp(technical),
            clamp(linguistic),
        );
        let overall = f64::from(
            u32::from(alignment)
                + u32::from(completeness)
                + u32::from(actionability)
                + u32::from(technical_accuracy)
                + u32::from(linguistic_quality),
        ) / 5.0;
        Self {
            alignment,
            completeness,
            actionability,
            technical_accuracy,
            linguistic_quality,
            overall,
        }
    }
}

/// Judge collaborator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JudgeConfig {
    /// OpenAI-style API root, e.g. "https://openrouter.ai/api/v1"
    pub base_url: String,
    /// Judge model identifier
    pub model: String,
    /// Env var holding the API key
    pub api_key_env: String,
    /// Transport retries per pair
    pub max_retries: u32,
    /// Concurrent in-flight judge calls
    pub concurrency: usize,
    /// Per-call read timeout
    pub timeout_secs: u64,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            base_url: "https://openrouter.ai/api/v1".to_string(),
            model: "openai/gpt-5-mini".to_string(),
            api_key_env: "VULNEVAL_API_KEY".to_string(),
            max_retries: 3,
            concurrency: 4,
            timeout_secs: 120,
        }
    }
}

/// Per-call lifecycle. Terminal outcomes (succeeded, failed) are the
/// function's return value; keeping the live states explicit makes backoff
/// and cancellation timing testable without a network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallState {
    Pending,
    InFlight { attempt: u32 },
    Retrying { attempt: u32 },
}

/// The raw verdict shape the judge is asked to return
#[derive(Debug, Deserialize)]
struct Verdict {
    iso_27001_alignment: f64,
    policy_completeness: f64,
    actionability: f64,
    technical_accuracy: f64,
    linguistic_quality: f64,
}

/// Parse a judge verdict, tolerating markdown code fences and extra prose
/// around the JSON object on the lenient pass.
pub fn parse_verdict(content: &str) -> Result<RubricScores, JudgeError> {
    let strict = serde_json::from_str::<Verdict>(content.trim());
    let verdict = match strict {
        Ok(v) => v,
        Err(first_err) => {
            let slice = extract_json_object(content)
                .ok_or_else(|| JudgeError::Parse(first_err.to_string()))?;
            serde_json::from_str::<Verdict>(slice)
                .map_err(|e| JudgeError::Parse(e.to_string()))?
        }
    };

    Ok(RubricScores::new(
        verdict.iso_27001_alignment,
        verdict.policy_completeness,
        verdict.actionability,
        verdict.technical_accuracy,
        verdict.linguistic_quality,
    ))
}

/// Slice out the outermost `{...}` from a response that wraps its JSON in
/// code fences or commentary.
fn extract_json_object(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    (end > start).then(|| &content[start..=end])
}

fn build_prompt(pair: &PolicyPair, label: &str) -> String {
    format!(
        "You are an expert information security policy evaluator.\n\n\
        **TASK:**\n\
        Compare a candidate policy against a reference policy for control {label}. \
        The reference policy is the gold standard.\n\n\
        **REFERENCE POLICY (Gold Standard):**\n{reference}\n\n\
        **CANDIDATE POLICY (To Evaluate):**\n{candidate}\n\n\
        **EVALUATION CRITERIA:**\n\
        Rate the candidate policy on a scale of 0-100 for each criterion:\n\
        1. **ISO 27001 Alignment**: does it address the same security concerns as the reference?\n\
        2. **Policy Completeness**: does it cover all relevant vulnerabilities and controls?\n\
        3. **Actionability**: are the corrective actions practical, specific, and implementable?\n\
        4. **Technical Accuracy**: are the security measures and mitigations correct?\n\
        5. **Linguistic Quality**: is the policy clear, coherent, and professionally written?\n\n\
        **OUTPUT FORMAT:**\n\
        Return ONLY a JSON object, no additional text:\n\
        {{\n\
          \"iso_27001_alignment\": <score 0-100>,\n\
          \"policy_completeness\": <score 0-100>,\n\
          \"actionability\": <score 0-100>,\n\
          \"technical_accuracy\": <score 0-100>,\n\
          \"linguistic_quality\": <score 0-100>\n\
        }}",
        reference = pair.reference.policy,
        candidate = pair.generated.policy,
    )
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// Client for the judge collaborator
#[derive(Clone)]
pub struct JudgeClient {
    config: JudgeConfig,
    api_key: String,
    agent: ureq::Agent,
}

impl JudgeClient {
    pub fn new(config: JudgeConfig, api_key: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(10))
            .timeout_read(Duration::from_secs(config.timeout_secs))
            .build();

        Self {
            config,
            api_key: api_key.into(),
            agent,
        }
    }

    /// One POST to the chat-completions endpoint; transport errors only.
    fn request_verdict(&self, prompt: String) -> Result<String, JudgeError> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: 0.3,
            max_tokens: 2000,
        };

        let response: ChatResponse = self
            .agent
            .post(&url)
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .send_json(&request)
            .map_err(|e| JudgeError::Transport(e.to_string()))?
            .into_json()
            .map_err(|e| JudgeError::Transport(format!("invalid response body: {e}")))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| JudgeError::Transport("judge returned no content".to_string()))
    }

    /// Judge one pair, driving the retry state machine to completion.
    ///
    /// Transport failures retry with exponential backoff (500ms * 2^attempt);
    /// a parse failure does not consume transport retries, it fails the pair
    /// directly after the lenient re-parse inside [`parse_verdict`].
    pub fn judge_pair(
        &self,
        pair: &PolicyPair,
        label: &str,
        cancel: &AtomicBool,
    ) -> Result<RubricScores, JudgeError> {
        let mut state = CallState::Pending;

        loop {
            state = match state {
                CallState::Pending => CallState::InFlight { attempt: 1 },
                CallState::InFlight { attempt } => {
                    if cancel.load(Ordering::Relaxed) {
                        return Err(JudgeError::Cancelled);
                    }
                    match self.request_verdict(build_prompt(pair, label)) {
                        // Parse failures never consume transport retries
                        Ok(content) => return parse_verdict(&content),
                        Err(e) if attempt < self.config.max_retries => {
                            tracing::warn!(
                                "judge attempt {attempt}/{} for {label} failed: {e}",
                                self.config.max_retries
                            );
                            CallState::Retrying { attempt }
                        }
                        Err(e) => return Err(e),
                    }
                }
                CallState::Retrying { attempt } => {
                    if cancel.load(Ordering::Relaxed) {
                        return Err(JudgeError::Cancelled);
                    }
                    std::thread::sleep(Duration::from_millis(500 * (1 << (attempt - 1))));
                    CallState::InFlight {
                        attempt: attempt + 1,
                    }
                }
            };
        }
    }

    /// Judge all pairs with bounded concurrency.
    ///
    /// Each pair keeps independent retry state; one pair's backoff never
    /// stalls another. On cancellation the remaining pairs come back as
    /// judge-failed and whatever completed is still returned. Results are in
    /// input order.
    pub async fn judge_pairs(
        self: Arc<Self>,
        pairs: &[PolicyPair],
        cancel: Arc<AtomicBool>,
    ) -> Vec<Result<RubricScores, JudgeError>> {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let mut handles = Vec::with_capacity(pairs.len());

        for (i, pair) in pairs.iter().enumerate() {
            let client = Arc::clone(&self);
            let semaphore = Arc::clone(&semaphore);
            let cancel = Arc::clone(&cancel);
            let pair = pair.clone();
            let label = pair.label(i);

            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore open");
                if cancel.load(Ordering::Relaxed) {
                    return Err(JudgeError::Cancelled);
                }
                tokio::task::spawn_blocking(move || client.judge_pair(&pair, &label, &cancel))
                    .await
                    .unwrap_or_else(|e| Err(JudgeError::Transport(format!("judge task panicked: {e}"))))
            }));
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            results.push(handle.await.unwrap_or_else(|e| {
                Err(JudgeError::Transport(format!("judge task cancelled: {e}")))
            }));
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_strict_verdict() {
        let content = r#"{
            "iso_27001_alignment": 85,
            "policy_completeness": 78,
            "actionability": 90,
            "technical_accuracy": 82,
            "linguistic_quality": 95
        }"#;

        let scores = parse_verdict(content).unwrap();
        assert_eq!(scores.alignment, 85);
        assert_eq!(scores.linguistic_quality, 95);
        assert!((scores.overall - 86.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_fenced_verdict() {
        let content = "Here is my evaluation:\n```json\n{\"iso_27001_alignment\": 70, \
            \"policy_completeness\": 70, \"actionability\": 70, \
            \"technical_accuracy\": 70, \"linguistic_quality\": 70}\n```\nHope that helps!";

        let scores = parse_verdict(content).unwrap();
        assert_eq!(scores.overall, 70.0);
    }

    #[test]
    fn test_out_of_range_scores_are_clamped() {
        let content = r#"{"iso_27001_alignment": 130, "policy_completeness": -5,
            "actionability": 50, "technical_accuracy": 50, "linguistic_quality": 50}"#;

        let scores = parse_verdict(content).unwrap();
        assert_eq!(scores.alignment, 100);
        assert_eq!(scores.completeness, 0);
        assert_eq!(scores.overall, 50.0);
    }

    #[test]
    fn test_unparseable_verdict_is_parse_error() {
        assert!(matches!(
            parse_verdict("the policy looks fine to me"),
            Err(JudgeError::Parse(_))
        ));
        assert!(matches!(
            parse_verdict(r#"{"iso_27001_alignment": 80}"#),
            Err(JudgeError::Parse(_))
        ));
    }

    #[test]
    fn test_cancelled_pair_is_not_attempted() {
        let client = JudgeClient::new(JudgeConfig::default(), "test-key");
        let pair = PolicyPair {
            generated: crate::policy::PolicyRecord {
                control_id: Some("A.5.1".to_string()),
                policy: "generated".to_string(),
                extra: serde_json::Map::new(),
            },
            reference: crate::policy::PolicyRecord {
                control_id: Some("A.5.1".to_string()),
                policy: "reference".to_string(),
                extra: serde_json::Map::new(),
            },
            method: crate::policy::MatchMethod::ControlId,
        };

        let cancel = AtomicBool::new(true);
        assert!(matches!(
            client.judge_pair(&pair, "A.5.1", &cancel),
            Err(JudgeError::Cancelled)
        ));
    }

    #[tokio::test]
    async fn test_judge_pairs_honors_cancel_flag() {
        let client = Arc::new(JudgeClient::new(JudgeConfig::default(), "test-key"));
        let pair = PolicyPair {
            generated: crate::policy::PolicyRecord {
                control_id: None,
                policy: "g".to_string(),
                extra: serde_json::Map::new(),
            },
            reference: crate::policy::PolicyRecord {
                control_id: None,
                policy: "r".to_string(),
                extra: serde_json::Map::new(),
            },
            method: crate::policy::MatchMethod::Position,
        };

        let cancel = Arc::new(AtomicBool::new(true));
        let results = client.judge_pairs(&[pair.clone(), pair], cancel).await;
        assert_eq!(results.len(), 2);
        assert!(results
            .iter()
            .all(|r| matches!(r, Err(JudgeError::Cancelled))));
    }
}
