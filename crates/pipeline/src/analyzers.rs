//! Analyzer fan-out: every analyzer looks at every request, concurrently.
//!
//! Each analyzer runs in its own task behind an error boundary. A failing or
//! panicking analyzer is reported and affects nothing else; one that
//! succeeds has its responses delivered as soon as it finishes.

use {
    async_trait::async_trait,
    futures::FutureExt,
    herald_channels::{AccessLevel, Request, Response},
    herald_metrics::{StatsSink, analyzers as analyzer_metrics, counter, labels},
    std::{any::Any, panic::AssertUnwindSafe, sync::Arc},
    tokio::task::JoinHandle,
    tracing::{debug, warn},
};

use crate::{access::AccessResolver, commands::CommandResolver, delivery::DeliveryService};

/// Context reported for analyzer failures.
const ANALYZER_FAILURE: &str = "unexpected general error";

/// Inspects requests independently of command routing.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Name under which the analyzer's command properties are registered.
    fn name(&self) -> &str;

    /// `None` or an empty list means nothing to say.
    async fn analyze(&self, request: &Request) -> anyhow::Result<Option<Vec<Response>>>;
}

/// Handles of the analyzer tasks spawned for one request.
#[derive(Debug)]
#[must_use = "dropping the handle detaches the analyzers"]
pub struct AnalyzerTasks {
    handles: Vec<JoinHandle<()>>,
}

impl AnalyzerTasks {
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for every analyzer of this request to finish delivering.
    pub async fn join(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "analyzer task did not complete");
            }
        }
    }
}

pub struct AnalyzerFanOut {
    analyzers: Vec<Arc<dyn Analyzer>>,
    resolver: Arc<dyn CommandResolver>,
    delivery: Arc<DeliveryService>,
    stats: Arc<dyn StatsSink>,
}

impl AnalyzerFanOut {
    pub fn new(
        resolver: Arc<dyn CommandResolver>,
        delivery: Arc<DeliveryService>,
        stats: Arc<dyn StatsSink>,
    ) -> Self {
        Self {
            analyzers: Vec::new(),
            resolver,
            delivery,
            stats,
        }
    }

    pub fn register(&mut self, analyzer: Arc<dyn Analyzer>) -> &mut Self {
        self.analyzers.push(analyzer);
        self
    }

    pub fn len(&self) -> usize {
        self.analyzers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.analyzers.is_empty()
    }

    /// Spawn one task per analyzer for `request` and return without waiting.
    pub fn analyze_async(&self, request: Arc<Request>, level: AccessLevel) -> AnalyzerTasks {
        let handles = self
            .analyzers
            .iter()
            .map(|analyzer| {
                let run = AnalyzerRun {
                    analyzer: Arc::clone(analyzer),
                    resolver: Arc::clone(&self.resolver),
                    delivery: Arc::clone(&self.delivery),
                    stats: Arc::clone(&self.stats),
                };
                tokio::spawn(run.execute(Arc::clone(&request), level))
            })
            .collect();
        AnalyzerTasks { handles }
    }
}

struct AnalyzerRun {
    analyzer: Arc<dyn Analyzer>,
    resolver: Arc<dyn CommandResolver>,
    delivery: Arc<DeliveryService>,
    stats: Arc<dyn StatsSink>,
}

impl AnalyzerRun {
    async fn execute(self, request: Arc<Request>, level: AccessLevel) {
        let name = self.analyzer.name().to_string();

        let Some(properties) = self.resolver.by_name(&name) else {
            debug!(analyzer = %name, "analyzer has no command properties, skipping");
            counter!(analyzer_metrics::SKIPPED_TOTAL, labels::ANALYZER => name).increment(1);
            return;
        };
        if !AccessResolver::allowed(level, properties.required_level) {
            debug!(analyzer = %name, %level, required = %properties.required_level, "analyzer not allowed for user");
            return;
        }

        counter!(analyzer_metrics::RUNS_TOTAL, labels::ANALYZER => name.clone()).increment(1);
        let outcome = AssertUnwindSafe(self.analyzer.analyze(&request))
            .catch_unwind()
            .await;

        let error = match outcome {
            Ok(Ok(Some(responses))) if !responses.is_empty() => {
                debug!(analyzer = %name, count = responses.len(), "delivering analyzer responses");
                self.delivery.deliver_all(responses, Some(&*request)).await;
                return;
            },
            Ok(Ok(_)) => return,
            Ok(Err(e)) => e.context(format!("analyzer {name} failed")),
            Err(panic) => anyhow::anyhow!("analyzer {name} panicked: {}", panic_message(&*panic)),
        };
        counter!(analyzer_metrics::FAILURES_TOTAL, labels::ANALYZER => name).increment(1);
        self.stats
            .increment_errors(&request.describe(), Some(&error), ANALYZER_FAILURE);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
