//! Component code resolution
//!
//! Resolves a component name to a unique 4-character object-part code.
//! Sources are tried in order and the first hit wins:
//!
//! 1. Lexicon exact match
//! 2. Lexicon fuzzy match (codes already issued are skipped)
//! 3. External providers, in priority order, guarded by per-provider rate
//!    windows, circuit breakers and rate-limit backoff
//! 4. Deterministic fallback
//!
//! Resolution never fails. Callers must resolve one component at a time
//! because every resolution reads and extends the issued-code set.

pub mod extraction;
pub mod fallback;
pub mod health;
pub mod lexicon;
pub mod provider;

pub use extraction::{extract_code, is_valid_code};
pub use health::{ProviderHealth, ProviderHealthRegistry};
pub use lexicon::{Lexicon, LexiconMatch};
pub use provider::{CodeProvider, HttpChatProvider, ProviderError, ProviderReply, ProviderSpec};

use crate::utils::retry_with_backoff;
use chrono::{DateTime, Utc};
use fmcat_common::config::RetryConfig;
use fmcat_common::events::{CatalogEvent, CodeSource, EventBus};
use serde::Serialize;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tokio::time::Instant;

/// Codes listed in a prompt as already taken
const PROMPT_AVOID_LIMIT: usize = 50;

/// Outcome of one resolution
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCode {
    pub code: String,
    pub source: CodeSource,
    pub confidence: f64,
}

/// One successful provider generation
#[derive(Debug, Clone, Serialize)]
pub struct GenerationTelemetry {
    pub provider_id: String,
    pub component: String,
    pub code: String,
    pub latency_ms: u64,
    pub timestamp: DateTime<Utc>,
}

/// Lexicon, provider chain and fallback, in that order
pub struct ComponentCodeOrchestrator {
    lexicon: Lexicon,
    lexicon_threshold: f64,
    providers: Vec<Arc<dyn CodeProvider>>,
    health: ProviderHealthRegistry,
    retry: RetryConfig,
    events: Option<EventBus>,
    /// Providers that rejected their credentials during this run
    auth_failed: HashSet<String>,
    recent: VecDeque<String>,
    telemetry: Vec<GenerationTelemetry>,
}

impl ComponentCodeOrchestrator {
    /// Providers are ordered by ascending priority
    pub fn new(
        mut providers: Vec<Arc<dyn CodeProvider>>,
        retry: RetryConfig,
        health: ProviderHealthRegistry,
    ) -> Self {
        providers.sort_by_key(|p| p.spec().priority);
        Self {
            lexicon: Lexicon::new(),
            lexicon_threshold: 0.7,
            providers,
            health,
            retry,
            events: None,
            auth_failed: HashSet::new(),
            recent: VecDeque::new(),
            telemetry: Vec::new(),
        }
    }

    pub fn with_lexicon(mut self, lexicon: Lexicon) -> Self {
        self.lexicon = lexicon;
        self
    }

    pub fn with_lexicon_threshold(mut self, threshold: f64) -> Self {
        self.lexicon_threshold = threshold;
        self
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn provider_ids(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.spec().id.as_str()).collect()
    }

    pub fn health(&self) -> &ProviderHealthRegistry {
        &self.health
    }

    pub fn telemetry(&self) -> &[GenerationTelemetry] {
        &self.telemetry
    }

    /// Resolve a code for `component` and add it to `issued`
    pub async fn resolve(&mut self, component: &str, issued: &mut HashSet<String>) -> ResolvedCode {
        let resolved = self.resolve_inner(component, issued).await;

        issued.insert(resolved.code.clone());
        self.recent.push_back(resolved.code.clone());
        if self.recent.len() > PROMPT_AVOID_LIMIT {
            self.recent.pop_front();
        }

        tracing::debug!(
            component,
            code = %resolved.code,
            source = ?resolved.source,
            confidence = resolved.confidence,
            "Resolved component code"
        );

        if let Some(events) = &self.events {
            events.emit_lossy(CatalogEvent::ComponentCodeResolved {
                component: component.to_string(),
                code: resolved.code.clone(),
                source: resolved.source.clone(),
                timestamp: Utc::now(),
            });
        }

        resolved
    }

    async fn resolve_inner(&mut self, component: &str, issued: &HashSet<String>) -> ResolvedCode {
        // Exact lexicon hits are taken even when the code is already issued
        if let Some(hit) = self.lexicon.exact(component) {
            return ResolvedCode {
                code: hit.code,
                source: CodeSource::LexiconExact,
                confidence: hit.confidence,
            };
        }

        if let Some(hit) = self
            .lexicon
            .fuzzy(component, self.lexicon_threshold)
            .into_iter()
            .find(|hit| !issued.contains(&hit.code))
        {
            return ResolvedCode {
                code: hit.code,
                source: CodeSource::LexiconFuzzy,
                confidence: hit.confidence,
            };
        }

        if let Some((code, provider_id)) = self.try_providers(component, issued).await {
            return ResolvedCode {
                code,
                source: CodeSource::Provider(provider_id),
                confidence: 1.0,
            };
        }

        ResolvedCode {
            code: fallback::generate(component, issued),
            source: CodeSource::Fallback,
            confidence: 0.0,
        }
    }

    /// Two passes over the provider chain
    ///
    /// The first pass calls every provider that is usable now. The second
    /// pass waits out short rate-limit windows before calling.
    async fn try_providers(&mut self, component: &str, issued: &HashSet<String>) -> Option<(String, String)> {
        if self.providers.is_empty() {
            return None;
        }

        let prompt = self.build_prompt(component, issued);
        let providers = self.providers.clone();

        for provider in &providers {
            let spec = provider.spec();
            if self.auth_failed.contains(&spec.id) {
                continue;
            }
            if !self.health.can_use(&spec.id, spec.requests_per_minute).await {
                tracing::debug!(provider = %spec.id, "Provider unavailable, deferring");
                continue;
            }
            if let Some(code) = self.call_provider(provider.as_ref(), component, &prompt, issued).await {
                return Some((code, spec.id.clone()));
            }
        }

        for provider in &providers {
            let spec = provider.spec();
            if self.auth_failed.contains(&spec.id)
                || self.health.can_use(&spec.id, spec.requests_per_minute).await
            {
                continue;
            }

            let wait = self.health.remaining_wait(&spec.id, spec.requests_per_minute).await;
            if wait > health::MAX_RATE_LIMIT_WAIT {
                tracing::debug!(
                    provider = %spec.id,
                    wait_secs = wait.as_secs(),
                    "Provider wait too long, skipping"
                );
                continue;
            }

            tracing::info!(
                provider = %spec.id,
                wait_ms = (wait + health::WAIT_BUFFER).as_millis() as u64,
                "Waiting for provider rate limit to clear"
            );
            tokio::time::sleep(wait + health::WAIT_BUFFER).await;

            if !self.health.can_use(&spec.id, spec.requests_per_minute).await {
                continue;
            }
            if let Some(code) = self.call_provider(provider.as_ref(), component, &prompt, issued).await {
                return Some((code, spec.id.clone()));
            }
        }

        None
    }

    /// One provider call with rate-limit retries, health and telemetry
    async fn call_provider(
        &mut self,
        provider: &dyn CodeProvider,
        component: &str,
        prompt: &str,
        issued: &HashSet<String>,
    ) -> Option<String> {
        let spec = provider.spec();
        let started = Instant::now();

        let health = &self.health;
        let id = spec.id.as_str();
        let reply = retry_with_backoff(id, &self.retry, ProviderError::is_rate_limit, move |_attempt| async move {
            health.record_attempt(id).await;
            provider.complete(prompt).await
        })
        .await;

        let outcome = reply.and_then(|reply| code_from_reply(&reply, component, issued));

        match outcome {
            Ok(code) => {
                let latency_ms = started.elapsed().as_millis() as u64;
                self.health.record_success(id).await;
                tracing::info!(provider = id, component, code = %code, latency_ms, "Provider generated code");
                self.telemetry.push(GenerationTelemetry {
                    provider_id: id.to_string(),
                    component: component.to_string(),
                    code: code.clone(),
                    latency_ms,
                    timestamp: Utc::now(),
                });
                Some(code)
            }
            Err(err) => {
                if err.is_auth() {
                    tracing::error!(provider = id, error = %err, "Provider rejected credentials, disabled for this run");
                    self.auth_failed.insert(id.to_string());
                } else {
                    tracing::warn!(provider = id, component, error = %err, "Provider failed");
                }
                self.health.record_failure(id, err.is_rate_limit()).await;
                None
            }
        }
    }

    fn build_prompt(&self, component: &str, issued: &HashSet<String>) -> String {
        let mut avoid: Vec<&str> = self.recent.iter().rev().map(String::as_str).collect();
        if avoid.len() < PROMPT_AVOID_LIMIT {
            let mut rest: Vec<&str> = issued
                .iter()
                .map(String::as_str)
                .filter(|code| !avoid.contains(code))
                .collect();
            rest.sort_unstable();
            avoid.extend(rest);
        }
        avoid.truncate(PROMPT_AVOID_LIMIT);

        let mut prompt = format!(
            "Create a 4-character uppercase code for the equipment component \"{}\". \
             Use only letters A-Z and digits 0-9, with at least one letter.",
            component
        );
        if !avoid.is_empty() {
            prompt.push_str(" Do not use any of these existing codes: ");
            prompt.push_str(&avoid.join(", "));
            prompt.push('.');
        }
        prompt.push_str(" Reply with the code only.");
        prompt
    }
}

/// Extract an unissued code from a provider reply
fn code_from_reply(
    reply: &ProviderReply,
    component: &str,
    issued: &HashSet<String>,
) -> Result<String, ProviderError> {
    let primary = reply
        .extraction_text()
        .ok_or_else(|| ProviderError::Parse("empty response".to_string()))?;

    let code = extract_code(primary, component)
        .or_else(|| {
            // Truncated output may still hold a code in the reasoning text
            reply
                .reasoning
                .as_deref()
                .filter(|r| reply.truncated() && *r != primary)
                .and_then(|r| extract_code(r, component))
        })
        .ok_or_else(|| {
            let why = if reply.truncated() { "truncated" } else { "complete" };
            ProviderError::Parse(format!("no valid code in {} response", why))
        })?;

    if issued.contains(&code) {
        return Err(ProviderError::Parse(format!("code {} already issued", code)));
    }
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    struct ScriptedProvider {
        spec: ProviderSpec,
        script: Mutex<VecDeque<Result<ProviderReply, ProviderError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn new(id: &str, priority: u32, rpm: u32, script: Vec<Result<ProviderReply, ProviderError>>) -> Arc<Self> {
            Arc::new(Self {
                spec: ProviderSpec {
                    name: id.to_uppercase(),
                    id: id.to_string(),
                    model: "test-model".to_string(),
                    endpoint: "http://localhost".to_string(),
                    api_key: "key".to_string(),
                    requests_per_minute: rpm,
                    priority,
                    max_tokens: 16,
                },
                script: Mutex::new(script.into()),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CodeProvider for ScriptedProvider {
        fn spec(&self) -> &ProviderSpec {
            &self.spec
        }

        async fn complete(&self, _prompt: &str) -> Result<ProviderReply, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(ProviderError::Server(500)))
        }
    }

    fn orchestrator(providers: &[&Arc<ScriptedProvider>]) -> ComponentCodeOrchestrator {
        let chain: Vec<Arc<dyn CodeProvider>> = providers
            .iter()
            .map(|p| Arc::clone(p) as Arc<dyn CodeProvider>)
            .collect();
        ComponentCodeOrchestrator::new(chain, RetryConfig::default(), ProviderHealthRegistry::new())
            .with_lexicon(Lexicon::with_entries(&[]))
    }

    fn ok(text: &str) -> Result<ProviderReply, ProviderError> {
        Ok(ProviderReply::text(text))
    }

    #[tokio::test]
    async fn test_lexicon_exact_bypasses_issued_set() {
        let mut orchestrator = ComponentCodeOrchestrator::new(vec![], RetryConfig::default(), ProviderHealthRegistry::new());
        let mut issued: HashSet<String> = ["BRNG".to_string()].into_iter().collect();

        let resolved = orchestrator.resolve("bearing", &mut issued).await;

        assert_eq!(resolved.code, "BRNG");
        assert_eq!(resolved.source, CodeSource::LexiconExact);
        assert_eq!(resolved.confidence, 1.0);
    }

    #[tokio::test]
    async fn test_lexicon_fuzzy_skips_issued_codes() {
        let mut orchestrator = ComponentCodeOrchestrator::new(vec![], RetryConfig::default(), ProviderHealthRegistry::new());
        let mut issued = HashSet::new();

        let first = orchestrator.resolve("Bearng", &mut issued).await;
        assert_eq!(first.code, "BRNG");
        assert_eq!(first.source, CodeSource::LexiconFuzzy);

        let second = orchestrator.resolve("Bearng", &mut issued).await;
        assert_ne!(second.code, "BRNG");
        assert!(!matches!(second.source, CodeSource::LexiconExact));
    }

    #[tokio::test]
    async fn test_provider_code_used_and_recorded() {
        let provider = ScriptedProvider::new("p1", 1, 60, vec![ok("FLXC")]);
        let mut orchestrator = orchestrator(&[&provider]);
        let events = EventBus::new(10);
        let mut rx = events.subscribe();
        orchestrator = orchestrator.with_events(events);
        let mut issued = HashSet::new();

        let resolved = orchestrator.resolve("Flux Capacitor", &mut issued).await;

        assert_eq!(resolved.code, "FLXC");
        assert_eq!(resolved.source, CodeSource::Provider("p1".to_string()));
        assert!(issued.contains("FLXC"));
        assert_eq!(orchestrator.telemetry().len(), 1);
        assert_eq!(orchestrator.telemetry()[0].provider_id, "p1");
        match rx.recv().await.unwrap() {
            CatalogEvent::ComponentCodeResolved { code, .. } => assert_eq!(code, "FLXC"),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_providers_run_in_priority_order() {
        let low = ScriptedProvider::new("low", 5, 60, vec![ok("LOW1")]);
        let high = ScriptedProvider::new("high", 1, 60, vec![Err(ProviderError::Server(503))]);
        let mut orchestrator = orchestrator(&[&low, &high]);
        assert_eq!(orchestrator.provider_ids(), vec!["high", "low"]);

        let resolved = orchestrator.resolve("Flux Capacitor", &mut HashSet::new()).await;

        assert_eq!(resolved.code, "LOW1");
        assert_eq!(high.calls(), 1);
        assert_eq!(low.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_retried_with_backoff_then_circuit_opens() {
        let limited = ScriptedProvider::new(
            "p1",
            1,
            60,
            (0..5).map(|_| Err(ProviderError::RateLimit("429".to_string()))).collect(),
        );
        let mut orchestrator = orchestrator(&[&limited]);
        let started = Instant::now();

        let resolved = orchestrator.resolve("Flux Capacitor", &mut HashSet::new()).await;

        assert_eq!(limited.calls(), 3);
        assert!(started.elapsed() >= Duration::from_secs(3));
        assert_eq!(resolved.source, CodeSource::Fallback);
        assert_eq!(resolved.code, "FCAP");
        assert!(!orchestrator.health().can_use("p1", 60).await);
    }

    #[tokio::test]
    async fn test_non_rate_limit_error_is_not_retried() {
        let failing = ScriptedProvider::new("p1", 1, 60, vec![Err(ProviderError::Server(502))]);
        let mut orchestrator = orchestrator(&[&failing]);

        orchestrator.resolve("Flux Capacitor", &mut HashSet::new()).await;

        assert_eq!(failing.calls(), 1);
    }

    #[tokio::test]
    async fn test_auth_failure_disables_provider_for_run() {
        let rejected = ScriptedProvider::new("p1", 1, 60, vec![Err(ProviderError::Auth(401)), ok("ZZZ1")]);
        let mut orchestrator = orchestrator(&[&rejected]);
        let mut issued = HashSet::new();

        orchestrator.resolve("Flux Capacitor", &mut issued).await;
        let second = orchestrator.resolve("Warp Coil", &mut issued).await;

        assert_eq!(rejected.calls(), 1);
        assert_eq!(second.source, CodeSource::Fallback);
    }

    #[tokio::test]
    async fn test_duplicate_provider_code_moves_to_next_provider() {
        let first = ScriptedProvider::new("p1", 1, 60, vec![ok("TAKN")]);
        let second = ScriptedProvider::new("p2", 2, 60, vec![ok("FRSH")]);
        let mut orchestrator = orchestrator(&[&first, &second]);
        let mut issued: HashSet<String> = ["TAKN".to_string()].into_iter().collect();

        let resolved = orchestrator.resolve("Flux Capacitor", &mut issued).await;

        assert_eq!(resolved.code, "FRSH");
        assert_eq!(resolved.source, CodeSource::Provider("p2".to_string()));
    }

    #[tokio::test]
    async fn test_unparseable_reply_falls_back() {
        let chatty = ScriptedProvider::new("p1", 1, 60, vec![ok("I am not sure, sorry.")]);
        let mut orchestrator = orchestrator(&[&chatty]);

        let resolved = orchestrator.resolve("Flux Capacitor", &mut HashSet::new()).await;

        assert_eq!(resolved.source, CodeSource::Fallback);
        assert_eq!(resolved.code.len(), 4);
    }

    #[tokio::test]
    async fn test_reasoning_used_when_content_empty() {
        let reply = ProviderReply {
            content: String::new(),
            reasoning: Some("The best fit is FLXC".to_string()),
            finish_reason: Some("length".to_string()),
        };
        let provider = ScriptedProvider::new("p1", 1, 60, vec![Ok(reply)]);
        let mut orchestrator = orchestrator(&[&provider]);

        let resolved = orchestrator.resolve("Flux Capacitor", &mut HashSet::new()).await;

        assert_eq!(resolved.code, "FLXC");
    }

    #[tokio::test(start_paused = true)]
    async fn test_five_failures_open_circuit() {
        let failing = ScriptedProvider::new("p1", 1, 60, vec![]);
        let mut orchestrator = orchestrator(&[&failing]);
        let mut issued = HashSet::new();

        for name in ["Alpha One", "Beta Two", "Gamma Three", "Delta Four", "Echo Five", "Foxtrot Six"] {
            orchestrator.resolve(name, &mut issued).await;
        }

        assert_eq!(failing.calls(), 5);
        assert_eq!(issued.len(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_pass_waits_out_short_rate_window() {
        // Budget of floor(2 * 0.9) = 1 call per window
        let provider = ScriptedProvider::new("p1", 1, 2, vec![ok("FLXC"), ok("WRPC")]);
        let mut orchestrator = orchestrator(&[&provider]);
        let mut issued = HashSet::new();

        orchestrator.resolve("Flux Capacitor", &mut issued).await;

        // Window has 60s left: too long to wait
        let skipped = orchestrator.resolve("Warp Coil", &mut issued).await;
        assert_eq!(skipped.source, CodeSource::Fallback);
        assert_eq!(provider.calls(), 1);

        tokio::time::advance(Duration::from_secs(50)).await;
        let started = Instant::now();
        let waited = orchestrator.resolve("Warp Core", &mut issued).await;

        assert_eq!(waited.source, CodeSource::Provider("p1".to_string()));
        assert_eq!(waited.code, "WRPC");
        assert!(started.elapsed() >= Duration::from_secs(10));
        assert_eq!(provider.calls(), 2);
    }

    #[test]
    fn test_prompt_lists_recent_codes() {
        let mut orchestrator = orchestrator(&[]);
        orchestrator.recent.extend(["AAA1".to_string(), "BBB2".to_string()]);
        let issued: HashSet<String> = ["CCC3".to_string(), "AAA1".to_string()].into_iter().collect();

        let prompt = orchestrator.build_prompt("Flux Capacitor", &issued);

        assert!(prompt.contains("\"Flux Capacitor\""));
        assert!(prompt.contains("BBB2, AAA1, CCC3"));
    }

    #[test]
    fn test_prompt_avoid_list_is_bounded() {
        let orchestrator = orchestrator(&[]);
        let issued: HashSet<String> = (0..120).map(|i| format!("X{:03}", i)).collect();

        let prompt = orchestrator.build_prompt("Seal", &issued);

        assert_eq!(prompt.matches(", X").count(), PROMPT_AVOID_LIMIT - 1);
    }
}
