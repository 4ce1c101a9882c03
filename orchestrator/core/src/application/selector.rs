// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Selector
//!
//! Turns a request into an ordered shortlist of registry agents.
//!
//! The classifier is consulted first. When it is absent, fails, or cannot
//! decide, a deterministic keyword match over capability tags takes over.
//! Only a usable classifier selection is recorded in conversation memory.

use std::sync::Arc;

use crate::domain::classifier::Classifier;
use crate::domain::memory::ConversationMemory;
use crate::domain::provider::ProviderDescriptor;
use crate::domain::registry::AgentRegistry;
use crate::domain::request::DispatchRequest;

pub struct Selector {
    registry: Arc<AgentRegistry>,
    classifier: Option<Arc<dyn Classifier>>,
}

impl Selector {
    pub fn new(registry: Arc<AgentRegistry>, classifier: Option<Arc<dyn Classifier>>) -> Self {
        Self {
            registry,
            classifier,
        }
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    /// At most `top_k` distinct agents, in registry order for classifier
    /// selections and by descending keyword score for the fallback.
    pub async fn select_agents(
        &self,
        request: &DispatchRequest,
        top_k: usize,
        memory: Option<&mut ConversationMemory>,
    ) -> Vec<ProviderDescriptor> {
        if self.registry.is_empty() {
            return Vec::new();
        }

        let Some(classifier) = &self.classifier else {
            return self.fallback(request, top_k);
        };

        let classifier_input = match memory.as_deref() {
            Some(mem) if !mem.is_empty() => {
                format!("Recent conversation:\n{}\n\n{}", mem.render(), request.text)
            }
            _ => request.text.clone(),
        };

        let names = match classifier
            .classify(&classifier_input, &self.registry.summary())
            .await
        {
            Ok(names) if !names.is_empty() => names,
            Ok(_) => {
                tracing::warn!("Classifier returned no agents, using keyword fallback");
                return self.fallback(request, top_k);
            }
            Err(e) => {
                tracing::warn!("Classifier failed, using keyword fallback: {}", e);
                return self.fallback(request, top_k);
            }
        };

        let selected: Vec<ProviderDescriptor> = self
            .registry
            .list_all()
            .iter()
            .filter(|agent| names.iter().any(|n| n == &agent.name))
            .take(top_k)
            .cloned()
            .collect();

        let dropped = names
            .iter()
            .filter(|n| self.registry.get(n).is_none())
            .count();
        if dropped > 0 {
            tracing::debug!("Ignored {} unknown agent name(s) from classifier", dropped);
        }

        if selected.is_empty() {
            tracing::warn!("Classifier named no registered agents, using keyword fallback");
            return self.fallback(request, top_k);
        }

        if let Some(memory) = memory {
            let chosen: Vec<&str> = selected.iter().map(|a| a.name.as_str()).collect();
            let reply = serde_json::to_string(&chosen).unwrap_or_default();
            memory.record_exchange(&request.text, &reply);
        }

        selected
    }

    fn fallback(&self, request: &DispatchRequest, top_k: usize) -> Vec<ProviderDescriptor> {
        metrics::counter!("dispatch_selector_fallback_total").increment(1);
        let selected = keyword_fallback(&request.text, &self.registry, top_k);
        tracing::info!(
            "Keyword fallback selected: {:?}",
            selected.iter().map(|a| a.name.as_str()).collect::<Vec<_>>()
        );
        selected
    }
}

/// Score each agent by how many whitespace tokens of its capability tags
/// occur in the lower-cased request, then keep the best `top_k`.
///
/// Agents scoring zero are dropped. Equal scores keep registry order.
pub fn keyword_fallback(
    text: &str,
    registry: &AgentRegistry,
    top_k: usize,
) -> Vec<ProviderDescriptor> {
    let text = text.to_lowercase();

    let mut scored: Vec<(usize, &ProviderDescriptor)> = registry
        .list_all()
        .iter()
        .map(|agent| {
            let score = agent
                .capability_tags
                .iter()
                .flat_map(|tag| tag.split_whitespace())
                .filter(|token| text.contains(&token.to_lowercase()))
                .count();
            (score, agent)
        })
        .filter(|(score, _)| *score > 0)
        .collect();

    // sort_by is stable
    scored.sort_by(|a, b| b.0.cmp(&a.0));

    scored
        .into_iter()
        .take(top_k)
        .map(|(_, agent)| agent.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::classifier::ClassifierError;
    use crate::domain::llm::LLMError;
    use async_trait::async_trait;
    use std::time::Duration;

    struct Fixed(Result<Vec<&'static str>, ()>);

    #[async_trait]
    impl Classifier for Fixed {
        async fn classify(&self, _request: &str, _summary: &str) -> Result<Vec<String>, ClassifierError> {
            match &self.0 {
                Ok(names) => Ok(names.iter().map(|n| n.to_string()).collect()),
                Err(()) => Err(ClassifierError::Generation(LLMError::Network("down".into()))),
            }
        }
    }

    #[derive(Default)]
    struct Capturing {
        inputs: parking_lot::Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Classifier for Capturing {
        async fn classify(&self, request: &str, _summary: &str) -> Result<Vec<String>, ClassifierError> {
            self.inputs.lock().push(request.to_string());
            Ok(vec!["cost".to_string()])
        }
    }

    fn registry() -> Arc<AgentRegistry> {
        Arc::new(
            AgentRegistry::new(vec![
                ProviderDescriptor::new("monitoring", &["cpu", "errors", "instance status"], "echo"),
                ProviderDescriptor::new("cost", &["cost", "spend", "billing"], "echo"),
                ProviderDescriptor::new("summary", &["overview", "summarize"], "echo"),
                ProviderDescriptor::new("advisor", &["cost saving", "recommendations"], "echo"),
            ])
            .unwrap(),
        )
    }

    fn request(text: &str) -> DispatchRequest {
        DispatchRequest::new(text, Duration::from_secs(5))
    }

    fn names(agents: &[ProviderDescriptor]) -> Vec<&str> {
        agents.iter().map(|a| a.name.as_str()).collect()
    }

    #[test]
    fn test_fallback_scores_tag_tokens() {
        let registry = registry();
        // cost: "cost" => 1; advisor: "cost" + "saving" => 2
        let selected = keyword_fallback("Any COST saving ideas?", &registry, 3);
        assert_eq!(names(&selected), vec!["advisor", "cost"]);
    }

    #[test]
    fn test_fallback_ties_keep_registry_order() {
        let registry = registry();
        let selected = keyword_fallback("cpu and spend", &registry, 3);
        assert_eq!(names(&selected), vec!["monitoring", "cost"]);
    }

    #[test]
    fn test_fallback_no_match_is_empty() {
        assert!(keyword_fallback("weather in Lisbon", &registry(), 3).is_empty());
    }

    #[tokio::test]
    async fn test_classifier_selection_in_registry_order() {
        let selector = Selector::new(registry(), Some(Arc::new(Fixed(Ok(vec!["summary", "ghost", "cost"])))));
        let selected = selector.select_agents(&request("anything"), 3, None).await;
        assert_eq!(names(&selected), vec!["cost", "summary"]);
    }

    #[tokio::test]
    async fn test_classifier_selection_truncated_to_top_k() {
        let selector = Selector::new(
            registry(),
            Some(Arc::new(Fixed(Ok(vec!["advisor", "summary", "cost", "monitoring"])))),
        );
        let selected = selector.select_agents(&request("anything"), 2, None).await;
        assert_eq!(names(&selected), vec!["monitoring", "cost"]);
    }

    #[tokio::test]
    async fn test_classifier_failure_falls_back() {
        let selector = Selector::new(registry(), Some(Arc::new(Fixed(Err(())))));
        let req = request("what is my spend this month");
        let selected = selector.select_agents(&req, 3, None).await;
        assert_eq!(selected, keyword_fallback(&req.text, selector.registry(), 3));
    }

    #[tokio::test]
    async fn test_memory_records_only_usable_selections() {
        let mut memory = ConversationMemory::new(10);

        let empty = Selector::new(registry(), Some(Arc::new(Fixed(Ok(vec![])))));
        empty.select_agents(&request("spend?"), 3, Some(&mut memory)).await;
        assert!(memory.is_empty());

        let usable = Selector::new(registry(), Some(Arc::new(Fixed(Ok(vec!["cost"])))));
        usable.select_agents(&request("spend?"), 3, Some(&mut memory)).await;
        let turns: Vec<_> = memory.turns().map(|t| (t.role.as_str(), t.content.as_str())).collect();
        assert_eq!(turns, vec![("user", "spend?"), ("assistant", r#"["cost"]"#)]);
    }

    #[tokio::test]
    async fn test_unknown_names_only_falls_back_without_recording() {
        let selector = Selector::new(registry(), Some(Arc::new(Fixed(Ok(vec!["cost_agent_v2"])))));
        let mut memory = ConversationMemory::new(10);
        let req = request("what is my spend this month");

        let selected = selector.select_agents(&req, 3, Some(&mut memory)).await;

        assert_eq!(names(&selected), vec!["cost"]);
        assert!(memory.is_empty());
    }

    #[tokio::test]
    async fn test_memory_records_resulting_selection() {
        let selector = Selector::new(
            registry(),
            Some(Arc::new(Fixed(Ok(vec!["summary", "ghost", "cost", "monitoring"])))),
        );
        let mut memory = ConversationMemory::new(10);
        selector.select_agents(&request("status"), 2, Some(&mut memory)).await;

        let reply = memory.turns().nth(1).unwrap().content.clone();
        assert_eq!(reply, r#"["monitoring","cost"]"#);
    }

    #[tokio::test]
    async fn test_classifier_input_prefixed_with_recent_memory() {
        let classifier = Arc::new(Capturing::default());
        let selector = Selector::new(registry(), Some(classifier.clone()));
        let mut memory = ConversationMemory::new(10);

        selector.select_agents(&request("first"), 3, Some(&mut memory)).await;
        selector.select_agents(&request("second"), 3, Some(&mut memory)).await;

        let inputs = classifier.inputs.lock().clone();
        assert_eq!(inputs[0], "first");
        assert!(!inputs[0].contains("Recent conversation:"));
        assert!(inputs[1].starts_with("Recent conversation:\n"));
        assert!(inputs[1].contains("user: first"));
        assert!(inputs[1].ends_with("\n\nsecond"));
    }

    #[tokio::test]
    async fn test_empty_registry_skips_classifier() {
        struct Panicky;

        #[async_trait]
        impl Classifier for Panicky {
            async fn classify(&self, _: &str, _: &str) -> Result<Vec<String>, ClassifierError> {
                panic!("classifier must not be called");
            }
        }

        let selector = Selector::new(Arc::new(AgentRegistry::new(vec![]).unwrap()), Some(Arc::new(Panicky)));
        assert!(selector.select_agents(&request("spend"), 3, None).await.is_empty());
    }
}
