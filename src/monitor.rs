//! Monitor driver
//!
//! Runs the [`Trigger`] against a page source on a single thread: sleep until
//! the next timer deadline or mutation scan, dispatch, repeat. Results go to a
//! [`ResultSink`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::analysis::{analyze_document, AnalysisError, AnalysisResult, PageMeta};
use crate::error::Result;
use crate::fetch::{PageContent, PageSource};
use crate::mutation::{is_significant_batch, Snapshot};
use crate::node::HtmlDocument;
use crate::payment::observe;
use crate::rules::ExtractionRules;
use crate::trigger::{TimerKind, Trigger, TriggerConfig};

/// Longest uninterrupted sleep, so Ctrl+C is noticed promptly
const MAX_SLEEP: Duration = Duration::from_millis(250);

/// Receives everything a pass produces
pub trait ResultSink {
    /// A completed pass
    fn publish(&mut self, result: &AnalysisResult) -> Result<()>;
    /// A pass that failed; the payload carries an empty result
    fn publish_error(&mut self, error: &AnalysisError);
    /// First noteworthy result of the page view
    fn disclose(&mut self, result: &AnalysisResult);
}

/// Something that can produce page snapshots
pub trait PageLoader {
    fn load(&mut self) -> Result<PageContent>;
    /// Whether repeated loads can observe new page states
    fn is_live(&self) -> bool;
}

impl PageLoader for PageSource {
    fn load(&mut self) -> Result<PageContent> {
        PageSource::load(self)
    }

    fn is_live(&self) -> bool {
        PageSource::is_live(self)
    }
}

/// Everything the driver needs besides the loader and sink
#[derive(Debug, Clone)]
pub struct MonitorOptions {
    pub site: String,
    pub trigger: TriggerConfig,
    pub mutation_scan: Duration,
    /// How long to keep watching for mutations once nothing is pending
    pub linger: Duration,
    pub rules: ExtractionRules,
    pub default_currency: String,
}

/// Summary of a monitoring session
#[derive(Debug, Clone, Default)]
pub struct MonitorReport {
    pub passes: u32,
    pub disclosed: bool,
    pub last_result: Option<AnalysisResult>,
    /// Stopped by the caller rather than by settling
    pub interrupted: bool,
}

struct Driver<'a, L: PageLoader, S: ResultSink> {
    loader: &'a mut L,
    sink: &'a mut S,
    options: &'a MonitorOptions,
    trigger: Trigger,
    snapshot: Snapshot,
    report: MonitorReport,
}

impl<'a, L: PageLoader, S: ResultSink> Driver<'a, L, S> {
    fn meta(&self, doc: &HtmlDocument) -> PageMeta {
        PageMeta::from_document(doc, &self.options.site, &self.options.default_currency)
    }

    fn refresh(&mut self) -> Result<()> {
        if self.loader.is_live() {
            let page = self.loader.load()?;
            self.snapshot = Snapshot::new(page.html);
        }
        Ok(())
    }

    fn analyze_current(&mut self) -> Result<AnalysisResult> {
        self.refresh()?;
        let doc = HtmlDocument::parse(self.snapshot.html());
        let result = analyze_document(
            &doc,
            &self.options.site,
            &self.options.rules,
            &self.options.default_currency,
        );
        self.sink.publish(&result)?;
        Ok(result)
    }

    fn run_pass(&mut self) {
        let result = match self.analyze_current() {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "analysis pass failed");
                let doc = HtmlDocument::parse(self.snapshot.html());
                let payload = AnalysisError::new(&self.meta(&doc), &e);
                self.sink.publish_error(&payload);
                payload.result
            }
        };

        self.report.passes += 1;
        if self.trigger.complete(&result) {
            self.sink.disclose(&result);
            self.report.disclosed = true;
        }
        self.report.last_result = Some(result);
    }

    fn dispatch(&mut self, kind: TimerKind, now: Instant) {
        debug!(?kind, "timer fired");
        match kind {
            TimerKind::Poll => {
                let doc = HtmlDocument::parse(self.snapshot.html());
                let observation = observe(&doc.root(), &doc.body());
                self.trigger.on_poll(observation, now);
            }
            TimerKind::HardTimeout => {
                self.trigger.on_hard_timeout(now);
            }
            TimerKind::Settle => self.run_pass(),
            TimerKind::Reanalysis => {
                self.trigger.on_reanalysis_due(now);
            }
        }
    }

    fn scan_for_mutations(&mut self, now: Instant) {
        let page = match self.loader.load() {
            Ok(page) => page,
            Err(e) => {
                warn!(error = %e, "could not re-read page");
                return;
            }
        };
        let next = Snapshot::new(page.html);
        if next.hash() == self.snapshot.hash() {
            return;
        }
        let significant = is_significant_batch(&self.snapshot, &next);
        self.snapshot = next;
        if self.trigger.on_mutation(significant, now) {
            info!("page changed, re-analysis scheduled");
        }
    }
}

/// Monitor a page until it settles, the pass ceiling is reached, or
/// `running` is cleared.
///
/// Only the initial load can fail; later failures become error payloads.
pub fn run<L: PageLoader, S: ResultSink>(
    loader: &mut L,
    sink: &mut S,
    options: &MonitorOptions,
    running: &AtomicBool,
) -> Result<MonitorReport> {
    let first = loader.load()?;
    let live = loader.is_live();

    let mut driver = Driver {
        loader,
        sink,
        options,
        trigger: Trigger::new(options.trigger.clone()),
        snapshot: Snapshot::new(first.html),
        report: MonitorReport::default(),
    };

    let start = Instant::now();
    driver.trigger.page_ready(start);
    let mut next_scan = start + options.mutation_scan;
    let mut settled_since: Option<Instant> = None;

    loop {
        if !running.load(Ordering::SeqCst) {
            driver.report.interrupted = true;
            break;
        }

        let now = Instant::now();
        while let Some(kind) = driver.trigger.take_due(now) {
            driver.dispatch(kind, now);
        }

        if live && now >= next_scan {
            if driver.trigger.observes_mutations() {
                driver.scan_for_mutations(now);
            }
            next_scan = now + options.mutation_scan;
        }

        let mut wake = driver.trigger.next_deadline();
        if driver.trigger.is_settled() {
            let since = *settled_since.get_or_insert(now);
            let lingered = now.duration_since(since) >= options.linger;
            if !live || !driver.trigger.passes_remaining() || lingered {
                break;
            }
            wake = Some(wake.map_or(since + options.linger, |w| w.min(since + options.linger)));
        } else {
            settled_since = None;
        }

        if live {
            wake = Some(wake.map_or(next_scan, |w| w.min(next_scan)));
        }

        let pause = wake
            .map(|w| w.saturating_duration_since(Instant::now()))
            .unwrap_or(MAX_SLEEP)
            .min(MAX_SLEEP);
        if !pause.is_zero() {
            std::thread::sleep(pause);
        }
    }

    info!(passes = driver.report.passes, "monitoring finished");
    Ok(driver.report)
}
