//! Fallback orchestration
//!
//! Drives the ordered (tier, strategy) attempt sequence produced by
//! [`plan_attempts`] until one download succeeds, the plan is exhausted or the
//! request is cancelled. Attempts run strictly one after another.

mod plan;


pub use plan::{PlannedAttempt, plan_attempts};

use crate::downloader::Downloader;
use crate::identity::RequestIdentity;
use crate::log_manager::TaskLogger;
use crate::strategy::TransportStrategy;
use crate::types::{AttemptOutcome, ImagePageInfo, ProxiedImage, SizeTier};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Outcome of one orchestrated fallback sequence
#[derive(Debug, Default)]
pub struct FallbackRun {
    /// The first image obtained, if any
    pub image: Option<ProxiedImage>,
    /// Every attempt made, in execution order
    pub attempts: Vec<AttemptOutcome>,
    /// Whether the sequence stopped because the request was cancelled
    pub cancelled: bool,
}

impl FallbackRun {
    /// Number of attempts the upstream answered with a challenge or rate limit
    pub fn blocked_count(&self) -> usize {
        self.attempts
            .iter()
            .filter(|a| a.failure.as_ref().is_some_and(|f| f.is_blocked()))
            .count()
    }
}

/// Executes fallback plans against a [`Downloader`]
#[derive(Clone, Debug)]
pub struct FallbackOrchestrator {
    downloader: Downloader,
    strategies: Arc<[TransportStrategy]>,
    degrade_to_any_tier: bool,
}

impl FallbackOrchestrator {
    /// Create an orchestrator; the first strategy is the primary one
    pub fn new(
        downloader: Downloader,
        strategies: Vec<TransportStrategy>,
        degrade_to_any_tier: bool,
    ) -> Self {
        Self {
            downloader,
            strategies: strategies.into(),
            degrade_to_any_tier,
        }
    }

    /// Strategies in priority order
    pub fn strategies(&self) -> &[TransportStrategy] {
        &self.strategies
    }

    /// The attempt sequence this orchestrator would run for `info`
    pub fn plan(&self, info: &ImagePageInfo, requested: Option<SizeTier>) -> Vec<PlannedAttempt> {
        plan_attempts(
            info,
            requested,
            self.strategies.len(),
            self.degrade_to_any_tier,
        )
    }

    /// Run the fallback sequence until the first success
    ///
    /// Cancelling `cancel` drops the in-flight download and skips the rest of
    /// the plan.
    pub async fn run(
        &self,
        info: &ImagePageInfo,
        requested: Option<SizeTier>,
        identity: &RequestIdentity,
        log: &TaskLogger,
        cancel: &CancellationToken,
    ) -> FallbackRun {
        let plan = self.plan(info, requested);
        let mut run = FallbackRun::default();

        log.info(format!(
            "fallback plan: {} attempts over {} strategies (requested: {})",
            plan.len(),
            self.strategies.len(),
            requested.map(|t| t.as_str()).unwrap_or("any")
        ));

        for (index, step) in plan.iter().enumerate() {
            let (Some(candidate), Some(strategy)) =
                (info.url(step.tier), self.strategies.get(step.strategy))
            else {
                continue;
            };

            if cancel.is_cancelled() {
                run.cancelled = true;
                break;
            }

            log.info(format!(
                "attempt {}/{}: {} via {}",
                index + 1,
                plan.len(),
                step.tier,
                strategy.name()
            ));

            let attempt = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    run.cancelled = true;
                    break;
                }
                attempt = self.downloader.try_download(candidate, step.tier, strategy, identity, log) => attempt,
            };

            run.attempts.push(attempt.outcome);
            if let Some(image) = attempt.image {
                log.success(format!(
                    "served {} via {} after {} attempt(s)",
                    image.tier,
                    image.strategy,
                    run.attempts.len()
                ));
                run.image = Some(image);
                return run;
            }
        }

        if run.cancelled {
            log.warning(format!(
                "request cancelled after {} attempt(s); remaining plan skipped",
                run.attempts.len()
            ));
        } else {
            log.error(format!(
                "all {} attempt(s) failed ({} blocked by upstream)",
                run.attempts.len(),
                run.blocked_count()
            ));
        }
        run
    }
}
