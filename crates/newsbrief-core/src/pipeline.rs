//! One batch run: checkpoint, collect, filter, summarize, post, checkpoint.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset};

use crate::ai::providers::{ChatModel, OpenAiChatModel};
use crate::ai::{Summarizer, Summary, SummaryOutcome, TiktokenCounter, TokenCounter};
use crate::checkpoint::CheckpointStore;
use crate::config::{AppConfig, Credentials, FeedSource};
use crate::content::{ContentResolver, HttpContentResolver};
use crate::feed::{EntrySource, Entry, FeedFetcher};
use crate::filter::{EntryFilter, FilterStats};
use crate::notify::{DryRunNotifier, Notifier, SlackNotifier};
use crate::Result;

/// Outcome counters of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub started_at: DateTime<FixedOffset>,
    pub last_checkpoint: DateTime<FixedOffset>,
    pub fetched: usize,
    pub filter: FilterStats,
    pub parsed: usize,
    pub fallbacks: usize,
    pub posted: usize,
    pub post_failures: usize,
}

impl RunReport {
    pub fn targeted(&self) -> usize {
        self.filter.accepted
    }
}

/// Collects candidates and narrows them down to the entries of this run
pub struct TargetSelector {
    collector: Box<dyn EntrySource>,
    resolver: Box<dyn ContentResolver>,
    counter: Box<dyn TokenCounter>,
    token_budget: usize,
}

impl TargetSelector {
    pub fn new(
        collector: Box<dyn EntrySource>,
        resolver: Box<dyn ContentResolver>,
        counter: Box<dyn TokenCounter>,
        token_budget: usize,
    ) -> Self {
        Self {
            collector,
            resolver,
            counter,
            token_budget,
        }
    }

    /// Network-backed selector built from configuration
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let timeout = config.general.request_timeout_secs;

        Ok(Self::new(
            Box::new(FeedFetcher::new(timeout, config.reference_offset()?)?),
            Box::new(HttpContentResolver::new(timeout)?),
            Box::new(TiktokenCounter::for_model(&config.openai.model)?),
            config.openai.token_budget(),
        ))
    }

    /// Returns the target entries in discovery order, the number of fetched
    /// candidates and the filter statistics
    pub async fn select(
        &self,
        sources: &[FeedSource],
        last: DateTime<FixedOffset>,
    ) -> (Vec<Entry>, usize, FilterStats) {
        let candidates = self.collector.collect(sources).await;
        let fetched = candidates.len();

        let filter = EntryFilter::new(self.resolver.as_ref(), self.counter.as_ref(), self.token_budget);
        let (targets, stats) = filter.filter(candidates, last).await;

        (targets, fetched, stats)
    }
}

/// The full summarize-and-post batch job
pub struct Pipeline {
    sources: Vec<FeedSource>,
    channel: String,
    checkpoint: CheckpointStore,
    selector: TargetSelector,
    summarizer: Summarizer,
    notifier: Box<dyn Notifier>,
    persist_checkpoint: bool,
}

impl Pipeline {
    pub fn new(
        config: &AppConfig,
        checkpoint: CheckpointStore,
        selector: TargetSelector,
        model: Arc<dyn ChatModel>,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        Self {
            sources: config.feeds.clone(),
            channel: config.slack.channel.clone(),
            checkpoint,
            selector,
            summarizer: Summarizer::new(model, &config.summary),
            notifier,
            persist_checkpoint: true,
        }
    }

    /// Leave the checkpoint untouched after the run (dry runs)
    pub fn without_checkpoint_update(mut self) -> Self {
        self.persist_checkpoint = false;
        self
    }

    /// Wire the OpenAI, Slack (or dry-run) and HTTP collaborators
    pub fn from_config(config: &AppConfig, credentials: &Credentials, dry_run: bool) -> Result<Self> {
        let timeout = config.general.request_timeout_secs;

        let checkpoint = CheckpointStore::new(
            config.checkpoint_path(),
            config.reference_offset()?,
            config.general.lookback_minutes,
        );
        let model: Arc<dyn ChatModel> = Arc::new(OpenAiChatModel::new(
            &credentials.openai_api_key,
            &config.openai,
            timeout,
        )?);
        let notifier: Box<dyn Notifier> = if dry_run {
            Box::new(DryRunNotifier::new(&config.slack.header))
        } else {
            Box::new(SlackNotifier::new(credentials.slack_token()?, &config.slack, timeout)?)
        };

        let pipeline = Self::new(
            config,
            checkpoint,
            TargetSelector::from_config(config)?,
            model,
            notifier,
        );

        Ok(if dry_run {
            pipeline.without_checkpoint_update()
        } else {
            pipeline
        })
    }

    /// Process everything published since the last checkpoint.
    ///
    /// Per-entry failures are logged and counted; only a failed checkpoint
    /// write is returned as an error. The checkpoint is set to `now`, the
    /// instant the run started.
    pub async fn run(&self, now: DateTime<FixedOffset>) -> Result<RunReport> {
        tracing::info!("Run started at {}", now);
        let last = self.checkpoint.load(now);
        tracing::info!("Last executed at {}", last);

        let (targets, fetched, filter) = self.selector.select(&self.sources, last).await;

        let mut report = RunReport {
            started_at: now,
            last_checkpoint: last,
            fetched,
            filter,
            parsed: 0,
            fallbacks: 0,
            posted: 0,
            post_failures: 0,
        };

        if targets.is_empty() {
            tracing::info!("No new entries since {}", last);
            self.finish(now)?;
            return Ok(report);
        }

        let summaries = self.summarize_all(&targets, &mut report).await;
        self.post_all(&summaries, &mut report).await;

        self.finish(now)?;
        tracing::info!(
            fetched = report.fetched,
            targeted = report.targeted(),
            parsed = report.parsed,
            fallbacks = report.fallbacks,
            posted = report.posted,
            post_failures = report.post_failures,
            "Run finished"
        );

        Ok(report)
    }

    fn finish(&self, now: DateTime<FixedOffset>) -> Result<()> {
        if self.persist_checkpoint {
            self.checkpoint.save(now)
        } else {
            tracing::info!("Checkpoint left at its previous value");
            Ok(())
        }
    }

    async fn summarize_all(&self, targets: &[Entry], report: &mut RunReport) -> Vec<Summary> {
        tracing::info!("Summarizing {} entries", targets.len());
        let mut summaries = Vec::with_capacity(targets.len());

        for (i, entry) in targets.iter().enumerate() {
            let (summary, outcome) = self.summarizer.summarize(entry).await;
            match outcome {
                SummaryOutcome::Parsed { .. } => report.parsed += 1,
                SummaryOutcome::Fallback { .. } => report.fallbacks += 1,
            }
            tracing::info!("Summarized {}/{}", i + 1, targets.len());
            summaries.push(summary);
        }

        summaries
    }

    /// Post every summary; a failed post never stops the remaining ones
    async fn post_all(&self, summaries: &[Summary], report: &mut RunReport) {
        tracing::info!("Posting {} summaries to #{}", summaries.len(), self.channel);

        for (i, summary) in summaries.iter().enumerate() {
            match self.notifier.post(summary, &self.channel).await {
                Ok(()) => {
                    report.posted += 1;
                    tracing::info!("Posted {}/{}", i + 1, summaries.len());
                }
                Err(e) => {
                    report.post_failures += 1;
                    tracing::error!(
                        "Failed to post {}/{} '{}': {}",
                        i + 1,
                        summaries.len(),
                        summary.raw_title,
                        e
                    );
                }
            }
        }

        tracing::info!(
            "Finished posting: {} posted, {} failed",
            report.posted,
            report.post_failures
        );
    }
}
