//! Judgment-source fan-out.
//!
//! The provider clients themselves live outside this binary; anything
//! that can produce a [`RawJudgment`] plugs in through the
//! [`JudgmentSource`] trait. Calls are issued in parallel under a
//! per-source timeout, and every failure mode (timeout, transport
//! error, rejection by the parser, task panic) degrades to "no vote
//! from this source" — one bad source never aborts the batch, and
//! there are no retries. Failures are reported back to the caller so
//! they can be journaled, not just logged.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use consensus_engine::{parse_judgment, JudgmentRecord, RawJudgment};
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{info, warn};

pub type SourceFuture<'a> =
    Pin<Box<dyn Future<Output = anyhow::Result<RawJudgment>> + Send + 'a>>;

/// One independent judgment provider. Implementations own their HTTP
/// client and credentials; the fan-out owns the timeout.
pub trait JudgmentSource: Send + Sync {
    fn name(&self) -> &str;
    fn request(&self, prompt: String) -> SourceFuture<'_>;
}

/// One source that produced no vote, and why.
#[derive(Debug, Clone, Serialize)]
pub struct SourceFailure {
    pub source: String,
    pub error: String,
}

#[derive(Debug, Default)]
pub struct JudgmentBatch {
    pub records: Vec<JudgmentRecord>,
    pub failures: Vec<SourceFailure>,
}

/// Ask every source in parallel, keep whatever parses cleanly, and
/// report everything that did not vote.
pub async fn gather_judgments(
    sources: &[Arc<dyn JudgmentSource>],
    prompt: &str,
    per_source_timeout: Duration,
) -> JudgmentBatch {
    let mut set = JoinSet::new();

    for source in sources {
        let source = Arc::clone(source);
        let prompt = prompt.to_string();
        set.spawn(async move {
            let name = source.name().to_string();
            let error = match tokio::time::timeout(per_source_timeout, source.request(prompt))
                .await
            {
                Ok(Ok(raw)) => match parse_judgment(&raw, &name) {
                    Ok(record) => return Ok(record),
                    Err(e) => format!("judgment rejected: {}", e),
                },
                Ok(Err(e)) => format!("judgment call failed: {}", e),
                Err(_) => format!("timed out after {}ms", per_source_timeout.as_millis()),
            };
            Err(SourceFailure {
                source: name,
                error,
            })
        });
    }

    let total = sources.len();
    let mut batch = JudgmentBatch::default();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(Ok(record)) => batch.records.push(record),
            Ok(Err(failure)) => {
                warn!(source = %failure.source, "{}", failure.error);
                batch.failures.push(failure);
            }
            Err(e) => {
                warn!("judgment task failed to complete: {}", e);
                batch.failures.push(SourceFailure {
                    source: "unknown".into(),
                    error: format!("task failed to complete: {}", e),
                });
            }
        }
    }

    info!("received {}/{} valid judgments", batch.records.len(), total);
    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TEST_TIMEOUT: Duration = Duration::from_secs(5);

    struct CannedSource {
        name: &'static str,
        reply: Result<RawJudgment, String>,
    }

    impl JudgmentSource for CannedSource {
        fn name(&self) -> &str {
            self.name
        }

        fn request(&self, _prompt: String) -> SourceFuture<'_> {
            let reply = self.reply.clone();
            Box::pin(async move { reply.map_err(|e| anyhow::anyhow!(e)) })
        }
    }

    struct StalledSource;

    impl JudgmentSource for StalledSource {
        fn name(&self) -> &str {
            "stalled"
        }

        fn request(&self, _prompt: String) -> SourceFuture<'_> {
            Box::pin(async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(RawJudgment::FreeText("too late".into()))
            })
        }
    }

    fn source(name: &'static str, reply: Result<RawJudgment, String>) -> Arc<dyn JudgmentSource> {
        Arc::new(CannedSource { name, reply })
    }

    #[tokio::test]
    async fn test_fan_out_tolerates_partial_failure() {
        let sources: Vec<Arc<dyn JudgmentSource>> = vec![
            source(
                "alpha",
                Ok(RawJudgment::Structured(json!({
                    "manipulation_likelihood": "high",
                    "confidence": 0.9
                }))),
            ),
            source(
                "beta",
                Ok(RawJudgment::FreeText(
                    "sure thing {\"manipulation_likelihood\":\"low\",\"confidence\":0.4} bye"
                        .into(),
                )),
            ),
            source("gamma", Err("connection refused".into())),
            source("delta", Ok(RawJudgment::FreeText("no json here".into()))),
        ];

        let mut batch = gather_judgments(&sources, "prompt", TEST_TIMEOUT).await;
        batch.records.sort_by(|a, b| a.provider.cmp(&b.provider));
        batch.failures.sort_by(|a, b| a.source.cmp(&b.source));

        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.records[0].provider, "alpha");
        assert_eq!(batch.records[1].provider, "beta");

        // Every non-voting source is reported, with its reason.
        assert_eq!(batch.failures.len(), 2);
        assert_eq!(batch.failures[0].source, "delta");
        assert!(batch.failures[0].error.contains("rejected"));
        assert_eq!(batch.failures[1].source, "gamma");
        assert!(batch.failures[1].error.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_slow_source_times_out_into_a_failure() {
        let sources: Vec<Arc<dyn JudgmentSource>> = vec![Arc::new(StalledSource)];

        let batch = gather_judgments(&sources, "prompt", Duration::from_millis(50)).await;

        assert!(batch.records.is_empty());
        assert_eq!(batch.failures.len(), 1);
        assert_eq!(batch.failures[0].source, "stalled");
        assert!(batch.failures[0].error.contains("timed out"));
    }

    #[tokio::test]
    async fn test_fan_out_with_no_sources_is_empty() {
        let batch = gather_judgments(&[], "prompt", TEST_TIMEOUT).await;
        assert!(batch.records.is_empty());
        assert!(batch.failures.is_empty());
    }
}
