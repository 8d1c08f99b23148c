//! The closed set of configured host adapters.

use std::collections::BTreeMap;
use std::sync::Arc;

use gifrev_models::HostKind;

use crate::adapter::HostAdapter;
use crate::config::HostsConfig;
use crate::embedded_host::EmbeddedHost;
use crate::error::HostResult;
use crate::http::{build_client, HostHttp};
use crate::image_host::ImageHost;
use crate::link_host::LinkHost;
use crate::video_host::VideoHost;

/// Adapters keyed by host identity.
#[derive(Clone, Default)]
pub struct HostRegistry {
    adapters: BTreeMap<HostKind, Arc<dyn HostAdapter>>,
}

impl HostRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build all four backends over one pooled HTTP client.
    pub fn from_config(config: &HostsConfig) -> HostResult<Self> {
        let client = build_client(&config.http)?;
        let http = |host| HostHttp::new(client.clone(), host, &config.http);

        Ok(Self::new()
            .with(Arc::new(ImageHost::new(http(HostKind::ImageHost), config.image.clone())))
            .with(Arc::new(VideoHost::new(http(HostKind::VideoHost), config.video.clone())))
            .with(Arc::new(LinkHost::new(http(HostKind::LinkHost), config.link.clone())))
            .with(Arc::new(EmbeddedHost::new(
                http(HostKind::EmbeddedHost),
                config.embedded.clone(),
            ))))
    }

    /// Register an adapter, replacing any previous one of the same kind.
    pub fn with(mut self, adapter: Arc<dyn HostAdapter>) -> Self {
        self.adapters.insert(adapter.kind(), adapter);
        self
    }

    pub fn get(&self, kind: HostKind) -> Option<Arc<dyn HostAdapter>> {
        self.adapters.get(&kind).cloned()
    }

    pub fn adapters(&self) -> impl Iterator<Item = &Arc<dyn HostAdapter>> {
        self.adapters.values()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl std::fmt::Debug for HostRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.adapters.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gifrev_models::TargetType;

    #[test]
    fn test_from_config_registers_every_host() {
        let registry = HostRegistry::from_config(&HostsConfig::default()).unwrap();
        assert_eq!(registry.len(), HostKind::ALL.len());
        for kind in HostKind::ALL {
            assert_eq!(registry.get(*kind).map(|a| a.kind()), Some(*kind));
        }
    }

    #[test]
    fn test_only_embedded_host_refuses_uploads() {
        let registry = HostRegistry::from_config(&HostsConfig::default()).unwrap();
        let uploaders: Vec<HostKind> = registry
            .adapters()
            .filter(|a| a.supports(TargetType::Video))
            .map(|a| a.kind())
            .collect();
        assert!(!uploaders.contains(&HostKind::EmbeddedHost));
        assert_eq!(uploaders.len(), 3);
    }
}
