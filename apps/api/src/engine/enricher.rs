//! The Enricher: deterministic templating for spark questions, examples, and
//! next steps, optionally overridden for premium principals by an LLM hook.
//! The hook is capability-polymorphic — one method per output field, each
//! independently fallible and independently deadlined — so a single slow or
//! broken capability degrades to its template rather than failing the whole
//! generation.

use std::time::Duration;

use async_trait::async_trait;

use crate::llm_client::{parse_numbered_list, prompts, LlmClient, LlmError};
use crate::models::collision::Intensity;
use crate::models::domain::Domain;

const CONNECTION_DEADLINE: Duration = Duration::from_secs(10);
const QUESTIONS_DEADLINE: Duration = Duration::from_secs(8);
const EXAMPLES_DEADLINE: Duration = Duration::from_secs(8);
const NEXT_STEPS_DEADLINE: Duration = Duration::from_secs(8);

/// The pluggable enrichment backend. Mirrors the project's existing
/// trait-plus-`Arc<dyn Trait>` pattern for swappable scoring backends,
/// generalized here to the enrichment boundary.
#[async_trait]
pub trait EnrichmentLlm: Send + Sync {
    async fn produce_connection(&self, domain: &Domain, project: &str) -> Result<String, LlmError>;
    async fn produce_questions(&self, domain: &Domain, project: &str) -> Result<Vec<String>, LlmError>;
    async fn produce_examples(&self, domain: &Domain, project: &str) -> Result<Vec<String>, LlmError>;
    async fn produce_next_steps(&self, domain: &Domain, project: &str) -> Result<Vec<String>, LlmError>;
}

/// Production backend: wraps the shared `LlmClient`.
pub struct AnthropicEnrichmentLlm {
    client: LlmClient,
}

impl AnthropicEnrichmentLlm {
    pub fn new(client: LlmClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EnrichmentLlm for AnthropicEnrichmentLlm {
    async fn produce_connection(&self, domain: &Domain, project: &str) -> Result<String, LlmError> {
        let prompt = format!(
            "Domain: {}\nCategory: {}\nProject: {project}",
            domain.name, domain.category
        );
        let text = self
            .client
            .call_text_with_deadline(&prompt, prompts::CONNECTION_SYSTEM, CONNECTION_DEADLINE)
            .await?;
        let text = text.trim();
        if text.is_empty() {
            return Err(LlmError::EmptyContent);
        }
        Ok(text.to_string())
    }

    async fn produce_questions(&self, domain: &Domain, project: &str) -> Result<Vec<String>, LlmError> {
        let prompt = format!("Domain: {}\nProject: {project}", domain.name);
        let text = self
            .client
            .call_text_with_deadline(&prompt, prompts::QUESTIONS_SYSTEM, QUESTIONS_DEADLINE)
            .await?;
        let items = parse_numbered_list(&text);
        if items.is_empty() {
            return Err(LlmError::EmptyContent);
        }
        Ok(items)
    }

    async fn produce_examples(&self, domain: &Domain, project: &str) -> Result<Vec<String>, LlmError> {
        let prompt = format!("Domain: {}\nProject: {project}", domain.name);
        let text = self
            .client
            .call_text_with_deadline(&prompt, prompts::EXAMPLES_SYSTEM, EXAMPLES_DEADLINE)
            .await?;
        let items = parse_numbered_list(&text);
        if items.is_empty() {
            return Err(LlmError::EmptyContent);
        }
        Ok(items)
    }

    async fn produce_next_steps(&self, domain: &Domain, project: &str) -> Result<Vec<String>, LlmError> {
        let prompt = format!("Domain: {}\nProject: {project}", domain.name);
        let text = self
            .client
            .call_text_with_deadline(&prompt, prompts::NEXT_STEPS_SYSTEM, NEXT_STEPS_DEADLINE)
            .await?;
        let items = parse_numbered_list(&text);
        if items.is_empty() {
            return Err(LlmError::EmptyContent);
        }
        Ok(items)
    }
}

/// No-op backend used when no API key is configured and in tests. Always
/// fails, so the pipeline's fallback path is exercised identically whether
/// the key is missing or the network is down.
pub struct NullEnrichmentLlm;

#[async_trait]
impl EnrichmentLlm for NullEnrichmentLlm {
    async fn produce_connection(&self, _domain: &Domain, _project: &str) -> Result<String, LlmError> {
        Err(LlmError::EmptyContent)
    }

    async fn produce_questions(&self, _domain: &Domain, _project: &str) -> Result<Vec<String>, LlmError> {
        Err(LlmError::EmptyContent)
    }

    async fn produce_examples(&self, _domain: &Domain, _project: &str) -> Result<Vec<String>, LlmError> {
        Err(LlmError::EmptyContent)
    }

    async fn produce_next_steps(&self, _domain: &Domain, _project: &str) -> Result<Vec<String>, LlmError> {
        Err(LlmError::EmptyContent)
    }
}

/// Three fixed templates plus one keyword-seeded question when the domain
/// carries at least one keyword.
pub fn spark_questions(domain: &Domain, project: &str) -> Vec<String> {
    let category_lc = domain.category.to_lowercase();
    let mut questions = vec![
        format!(
            "What would happen if you applied {}'s core principles directly to {project}?",
            domain.name
        ),
        format!(
            "How might {category_lc} thinking reveal a blind spot in your current approach to {project}?"
        ),
        format!(
            "What's the simplest experiment that tests whether {} ideas actually transfer to {project}?",
            domain.name
        ),
    ];
    if let Some(keyword) = domain.keywords.first() {
        questions.push(format!(
            "How does the concept of '{keyword}' reframe the problem you're solving with {project}?"
        ));
    }
    questions
}

/// Each catalog example, contextualized with a pattern-based suffix.
pub fn examples(domain: &Domain) -> Vec<String> {
    domain
        .examples
        .iter()
        .map(|example| {
            let example_lc = example.to_lowercase();
            let suffix = if example_lc.contains("system") {
                "demonstrates a system-level pattern worth mapping onto your own architecture"
            } else if example_lc.contains("pattern") {
                "is a pattern you can adapt directly"
            } else if example_lc.contains("flow") {
                "shows how flow dynamics translate across domains"
            } else {
                "offers fresh perspective on implementation"
            };
            format!("{example} — {suffix}.")
        })
        .collect()
}

/// Four fixed templates, plus a fifth challenging assumptions for radical intensity.
pub fn next_steps(domain: &Domain, project: &str, intensity: Intensity) -> Vec<String> {
    let category_lc = domain.category.to_lowercase();
    let mut steps = vec![
        format!("Sketch a one-page brief connecting {} to {project}.", domain.name),
        format!(
            "Identify one person who can speak to {category_lc} fundamentals and get 30 minutes with them."
        ),
        "Prototype the smallest version of the idea that could be tested this week.".to_string(),
        "Document the assumptions this collision challenges, so you can revisit them later."
            .to_string(),
    ];
    if intensity == Intensity::Radical {
        steps.push(
            "Actively seek out a counterexample that would prove this connection wrong — if it survives, it's worth pursuing.".to_string(),
        );
    }
    steps
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn domain() -> Domain {
        Domain {
            id: Uuid::new_v4(),
            name: "Biomimicry".to_string(),
            category: "Science".to_string(),
            description: "desc".to_string(),
            keywords: vec!["evolution".to_string()],
            examples: vec!["A flocking system coordinates without a leader".to_string()],
            intensities: vec!["gentle".to_string()],
            tier: "basic".to_string(),
        }
    }

    #[test]
    fn test_spark_questions_includes_keyword_question_when_present() {
        let qs = spark_questions(&domain(), "AI system");
        assert_eq!(qs.len(), 4);
        assert!(qs[3].contains("evolution"));
    }

    #[test]
    fn test_spark_questions_omits_fourth_without_keywords() {
        let mut d = domain();
        d.keywords.clear();
        let qs = spark_questions(&d, "AI system");
        assert_eq!(qs.len(), 3);
    }

    #[test]
    fn test_examples_applies_system_suffix() {
        let ex = examples(&domain());
        assert_eq!(ex.len(), 1);
        assert!(ex[0].contains("system-level pattern"));
    }

    #[test]
    fn test_next_steps_adds_fifth_for_radical() {
        let gentle = next_steps(&domain(), "AI system", Intensity::Gentle);
        let radical = next_steps(&domain(), "AI system", Intensity::Radical);
        assert_eq!(gentle.len(), 4);
        assert_eq!(radical.len(), 5);
    }

    #[tokio::test]
    async fn test_null_backend_always_errs() {
        let llm = NullEnrichmentLlm;
        assert!(llm.produce_connection(&domain(), "AI system").await.is_err());
        assert!(llm.produce_questions(&domain(), "AI system").await.is_err());
        assert!(llm.produce_examples(&domain(), "AI system").await.is_err());
        assert!(llm.produce_next_steps(&domain(), "AI system").await.is_err());
    }
}
