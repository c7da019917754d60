//! Provider chain construction from configuration
//!
//! API keys resolve per provider with ENV → TOML priority. Providers with
//! no usable key are skipped with a warning rather than failing startup.

use crate::services::{
    CodeProvider, ComponentCodeOrchestrator, HttpChatProvider, ProviderHealthRegistry, ProviderSpec,
};
use fmcat_common::config::{CatalogConfig, ProviderConfig};
use fmcat_common::events::EventBus;
use std::sync::Arc;
use tracing::{info, warn};

/// Provider spec for one config entry, `None` without a usable key
pub fn provider_spec(config: &ProviderConfig) -> Option<ProviderSpec> {
    let Some(api_key) = config.resolve_api_key() else {
        warn!(
            provider = %config.id,
            env = config.api_key_env.as_deref().unwrap_or("-"),
            "No API key configured for provider, skipping"
        );
        return None;
    };

    Some(ProviderSpec {
        name: config.name.clone(),
        id: config.id.clone(),
        model: config.model.clone(),
        endpoint: config.endpoint.clone(),
        api_key,
        requests_per_minute: config.requests_per_minute,
        priority: config.priority,
        max_tokens: config.max_tokens,
    })
}

/// Specs for every configured provider that has a key
pub fn provider_specs(config: &CatalogConfig) -> Vec<ProviderSpec> {
    config.providers.iter().filter_map(provider_spec).collect()
}

/// Build the component code orchestrator described by `config`
pub fn build_orchestrator(
    config: &CatalogConfig,
    health: ProviderHealthRegistry,
    events: EventBus,
) -> ComponentCodeOrchestrator {
    let mut providers: Vec<Arc<dyn CodeProvider>> = Vec::new();
    for spec in provider_specs(config) {
        let id = spec.id.clone();
        match HttpChatProvider::new(spec) {
            Ok(provider) => providers.push(Arc::new(provider)),
            Err(e) => warn!(provider = %id, error = %e, "Failed to create provider client, skipping"),
        }
    }

    info!(
        providers = providers.len(),
        configured = config.providers.len(),
        "Component code providers ready"
    );

    ComponentCodeOrchestrator::new(providers, config.retry, health)
        .with_lexicon_threshold(config.fuzzy.lexicon_threshold)
        .with_events(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn provider(id: &str, priority: u32, api_key: Option<&str>, api_key_env: Option<&str>) -> ProviderConfig {
        ProviderConfig {
            name: id.to_uppercase(),
            id: id.to_string(),
            model: "model".to_string(),
            endpoint: "http://localhost/v1/chat/completions".to_string(),
            api_key: api_key.map(str::to_string),
            api_key_env: api_key_env.map(str::to_string),
            requests_per_minute: 20,
            priority,
            max_tokens: 16,
        }
    }

    #[test]
    #[serial]
    fn test_providers_without_keys_are_skipped() {
        std::env::remove_var("FMCAT_TEST_MISSING_KEY");
        let config = CatalogConfig {
            providers: vec![
                provider("keyed", 2, Some("abc"), None),
                provider("missing", 1, None, Some("FMCAT_TEST_MISSING_KEY")),
                provider("blank", 3, Some("  "), None),
            ],
            ..Default::default()
        };

        let specs = provider_specs(&config);

        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].id, "keyed");
        assert_eq!(specs[0].api_key, "abc");
        assert_eq!(specs[0].requests_per_minute, 20);
    }

    #[test]
    #[serial]
    fn test_env_key_used_for_spec() {
        std::env::set_var("FMCAT_TEST_PROVIDER_KEY", "from-env");
        let spec = provider_spec(&provider("p", 1, Some("from-toml"), Some("FMCAT_TEST_PROVIDER_KEY"))).unwrap();
        std::env::remove_var("FMCAT_TEST_PROVIDER_KEY");

        assert_eq!(spec.api_key, "from-env");
    }

    #[tokio::test]
    async fn test_orchestrator_orders_providers_by_priority() {
        let config = CatalogConfig {
            providers: vec![provider("second", 2, Some("k"), None), provider("first", 1, Some("k"), None)],
            ..Default::default()
        };

        let orchestrator = build_orchestrator(&config, ProviderHealthRegistry::new(), EventBus::default());

        assert_eq!(orchestrator.provider_ids(), vec!["first", "second"]);
    }
}
