// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Dispatcher
//!
//! Invokes every shortlisted provider concurrently under one batch deadline.
//!
//! Invocations are polled together on the caller's task. Each one ends in
//! exactly one [`ProviderResult`] stored by shortlist position, so a failure,
//! or a panic, in one provider never touches its siblings. When the deadline
//! elapses, outstanding invocations are dropped as a unit.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use tokio::time::Instant;

use crate::domain::dispatch_config::TimeoutPolicy;
use crate::domain::provider::{Provider, ProviderDescriptor, ProviderError, ProviderResult, TIMEOUT_DETAIL};
use crate::domain::request::DispatchRequest;
use crate::infrastructure::providers::ProviderArena;

pub struct Dispatcher {
    arena: Arc<ProviderArena>,
    policy: TimeoutPolicy,
}

impl Dispatcher {
    pub fn new(arena: Arc<ProviderArena>, policy: TimeoutPolicy) -> Self {
        Self { arena, policy }
    }

    pub fn policy(&self) -> TimeoutPolicy {
        self.policy
    }

    pub async fn dispatch(
        &self,
        shortlist: &[ProviderDescriptor],
        request: &DispatchRequest,
    ) -> Vec<ProviderResult> {
        let deadline = Instant::now() + request.time_budget;
        let mut slots: Vec<Option<ProviderResult>> = vec![None; shortlist.len()];

        let mut pending: FuturesUnordered<_> = shortlist
            .iter()
            .enumerate()
            .map(|(index, agent)| {
                let handle = self.arena.handle(&agent.name);
                let name = agent.name.as_str();
                let query = request.text.as_str();
                async move { (index, invoke(name, handle, query).await) }
            })
            .collect();

        let drained = tokio::time::timeout_at(deadline, async {
            while let Some((index, result)) = pending.next().await {
                slots[index] = Some(result);
            }
        })
        .await;

        if drained.is_ok() {
            return slots.into_iter().flatten().collect();
        }

        // drop in-flight invocations before building the timeout answer
        drop(pending);
        metrics::counter!("dispatch_batch_timeouts_total").increment(1);
        tracing::warn!(
            "Provider batch exceeded its {:?} budget ({:?} policy)",
            request.time_budget,
            self.policy
        );

        match self.policy {
            TimeoutPolicy::Discard => vec![ProviderResult::batch_timeout()],
            TimeoutPolicy::KeepCompleted => shortlist
                .iter()
                .zip(slots)
                .map(|(agent, slot)| {
                    slot.unwrap_or_else(|| ProviderResult::failure(&agent.name, TIMEOUT_DETAIL))
                })
                .collect(),
        }
    }
}

async fn invoke(name: &str, handle: Option<Arc<dyn Provider>>, query: &str) -> ProviderResult {
    let Some(provider) = handle else {
        tracing::error!("No provider handle registered for agent '{}'", name);
        return ProviderResult::failure(name, format!("no provider registered for '{}'", name));
    };

    let outcome = AssertUnwindSafe(provider.invoke(query))
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| Err(ProviderError::Panicked(panic_message(panic.as_ref()))));

    match outcome {
        Ok(payload) => {
            tracing::debug!("Agent '{}' succeeded", name);
            ProviderResult::success(name, payload)
        }
        Err(e) => {
            tracing::warn!("Agent '{}' failed: {}", name, e);
            metrics::counter!("dispatch_provider_failures_total", "provider" => name.to_string())
                .increment(1);
            ProviderResult::failure(name, e.to_string())
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::provider::{Immediate, ProviderOutput, SyncProvider};
    use async_trait::async_trait;
    use std::time::Duration;

    struct Reply(&'static str);

    impl SyncProvider for Reply {
        fn process(&self, _query: &str) -> Result<ProviderOutput, ProviderError> {
            Ok(self.0.into())
        }
    }

    struct Slow(Duration, &'static str);

    #[async_trait]
    impl Provider for Slow {
        async fn invoke(&self, _query: &str) -> Result<ProviderOutput, ProviderError> {
            tokio::time::sleep(self.0).await;
            Ok(self.1.into())
        }
    }

    struct Boom;

    impl SyncProvider for Boom {
        fn process(&self, _query: &str) -> Result<ProviderOutput, ProviderError> {
            panic!("index out of bounds");
        }
    }

    fn shortlist(names: &[&str]) -> Vec<ProviderDescriptor> {
        names.iter().map(|n| ProviderDescriptor::new(*n, &[], "echo")).collect()
    }

    fn request(budget_ms: u64) -> DispatchRequest {
        DispatchRequest::new("q", Duration::from_millis(budget_ms))
    }

    #[tokio::test]
    async fn test_results_follow_shortlist_order_not_arrival() {
        let mut arena = ProviderArena::new();
        arena.insert("slow", Arc::new(Slow(Duration::from_millis(50), "late")));
        arena.insert("fast", Arc::new(Immediate(Reply("early"))));

        let dispatcher = Dispatcher::new(Arc::new(arena), TimeoutPolicy::Discard);
        let results = dispatcher.dispatch(&shortlist(&["slow", "fast"]), &request(2_000)).await;

        let names: Vec<_> = results.iter().map(|r| r.provider_name.as_str()).collect();
        assert_eq!(names, vec!["slow", "fast"]);
        assert!(results.iter().all(|r| r.succeeded));
    }

    #[tokio::test]
    async fn test_panic_is_isolated() {
        let mut arena = ProviderArena::new();
        arena.insert("ok", Arc::new(Immediate(Reply("fine"))));
        arena.insert("boom", Arc::new(Immediate(Boom)));

        let dispatcher = Dispatcher::new(Arc::new(arena), TimeoutPolicy::Discard);
        let results = dispatcher.dispatch(&shortlist(&["boom", "ok"]), &request(1_000)).await;

        assert_eq!(results.len(), 2);
        assert!(!results[0].succeeded);
        assert!(results[0].error_detail.as_deref().unwrap().contains("index out of bounds"));
        assert!(results[1].succeeded);
    }

    #[tokio::test]
    async fn test_missing_handle_is_failure() {
        let dispatcher = Dispatcher::new(Arc::new(ProviderArena::new()), TimeoutPolicy::Discard);
        let results = dispatcher.dispatch(&shortlist(&["ghost"]), &request(1_000)).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].provider_name, "ghost");
        assert!(!results[0].succeeded);
    }

    #[tokio::test]
    async fn test_deadline_discards_completed_results() {
        let mut arena = ProviderArena::new();
        arena.insert("fast", Arc::new(Immediate(Reply("done"))));
        arena.insert("stuck", Arc::new(Slow(Duration::from_secs(30), "never")));

        let dispatcher = Dispatcher::new(Arc::new(arena), TimeoutPolicy::Discard);
        let results = dispatcher.dispatch(&shortlist(&["fast", "stuck"]), &request(50)).await;

        assert_eq!(results, vec![ProviderResult::batch_timeout()]);
    }

    #[tokio::test]
    async fn test_deadline_keep_completed_fills_unfinished_slots() {
        let mut arena = ProviderArena::new();
        arena.insert("stuck", Arc::new(Slow(Duration::from_secs(30), "never")));
        arena.insert("fast", Arc::new(Immediate(Reply("done"))));

        let dispatcher = Dispatcher::new(Arc::new(arena), TimeoutPolicy::KeepCompleted);
        let results = dispatcher.dispatch(&shortlist(&["stuck", "fast"]), &request(50)).await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0], ProviderResult::failure("stuck", TIMEOUT_DETAIL));
        assert_eq!(results[1], ProviderResult::success("fast", "done".into()));
    }

    #[tokio::test]
    async fn test_empty_shortlist() {
        let dispatcher = Dispatcher::new(Arc::new(ProviderArena::new()), TimeoutPolicy::Discard);
        assert!(dispatcher.dispatch(&[], &request(10)).await.is_empty());
    }
}
