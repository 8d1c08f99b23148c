//! Uploader selection with ordered fallback.

use std::collections::HashSet;
use std::sync::Arc;

use gifrev_hosts::{HostAdapter, HostRegistry};
use gifrev_models::{AnalysisResult, HostKind, TargetType};
use tracing::debug;

use crate::error::WorkerError;

/// Every candidate for a target type was excluded or unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("no uploader available for {target}")]
pub struct NotAvailable {
    pub target: TargetType,
}

impl From<NotAvailable> for WorkerError {
    fn from(e: NotAvailable) -> Self {
        WorkerError::NoUploader(e.target)
    }
}

/// Chooses uploaders from a static per-target priority ordering.
#[derive(Clone)]
pub struct HostSelector {
    hosts: HostRegistry,
    gif_order: Vec<Arc<dyn HostAdapter>>,
    video_order: Vec<Arc<dyn HostAdapter>>,
}

impl HostSelector {
    /// Build the orderings from each adapter's declared fallback priority.
    pub fn new(hosts: HostRegistry) -> Self {
        let order = |target: TargetType| {
            let mut ranked: Vec<(u8, Arc<dyn HostAdapter>)> = hosts
                .adapters()
                .filter(|a| a.supports(target))
                .filter_map(|a| a.fallback_priority(target).map(|p| (p, Arc::clone(a))))
                .collect();
            ranked.sort_by_key(|(priority, adapter)| (*priority, adapter.kind()));
            ranked.into_iter().map(|(_, adapter)| adapter).collect::<Vec<_>>()
        };

        Self {
            gif_order: order(TargetType::Gif),
            video_order: order(TargetType::Video),
            hosts,
        }
    }

    fn ordering(&self, target: TargetType) -> &[Arc<dyn HostAdapter>] {
        match target {
            TargetType::Gif => &self.gif_order,
            TargetType::Video => &self.video_order,
        }
    }

    /// Host identities in priority order for `target`.
    pub fn order(&self, target: TargetType) -> Vec<HostKind> {
        self.ordering(target).iter().map(|a| a.kind()).collect()
    }

    /// First adapter for `target` that is not excluded.
    pub fn choose(
        &self,
        target: TargetType,
        exclude: &HashSet<HostKind>,
    ) -> Result<Arc<dyn HostAdapter>, NotAvailable> {
        self.ordering(target)
            .iter()
            .find(|a| !exclude.contains(&a.kind()))
            .cloned()
            .ok_or(NotAvailable { target })
    }

    /// A specific host, if it is registered, supports `target` and is not excluded.
    fn preferred(
        &self,
        kind: HostKind,
        target: TargetType,
        exclude: &HashSet<HostKind>,
    ) -> Option<Arc<dyn HostAdapter>> {
        if exclude.contains(&kind) {
            return None;
        }
        self.hosts.get(kind).filter(|a| a.supports(target))
    }

    /// The uploader to try first: the analysis' choice, else the ordering's head.
    pub fn primary(&self, analysis: &AnalysisResult) -> Result<Arc<dyn HostAdapter>, NotAvailable> {
        let target = analysis.target_type;
        match self.preferred(analysis.primary_uploader, target, &HashSet::new()) {
            Some(adapter) => Ok(adapter),
            None => {
                debug!(host = %analysis.primary_uploader, %target, "Preferred uploader unavailable");
                self.choose(target, &HashSet::new())
            }
        }
    }

    /// The uploader to try after those in `failed`: the analysis' fallback if
    /// it names one still available, else the next in the ordering.
    pub fn fallback(
        &self,
        analysis: &AnalysisResult,
        failed: &HashSet<HostKind>,
    ) -> Result<Arc<dyn HostAdapter>, NotAvailable> {
        let target = analysis.target_type;
        analysis
            .fallback_uploader
            .and_then(|kind| self.preferred(kind, target, failed))
            .map(Ok)
            .unwrap_or_else(|| self.choose(target, failed))
    }
}

impl std::fmt::Debug for HostSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostSelector")
            .field("gif", &self.order(TargetType::Gif))
            .field("video", &self.order(TargetType::Video))
            .finish()
    }
}
