//! Domain statistics collector for the exporter.
//!
//! Each scrape runs one collection cycle: list the account's domains, fetch
//! every domain's statistics concurrently, and report one gauge per statistic
//! followed by the cumulative scrape counters. Cycles never overlap.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use futures::future::join_all;
use log::{debug, info, warn};
use tokio::sync::Mutex;
use crate::core::qrator::{QratorClient, QratorError};
use crate::core::sink::{MetricDesc, MetricKind, MetricSink};
use crate::models::{Domain, DomainStatistics, QratorConfig};
use crate::utils::parse_account_id;

pub const BYPASSED_TRAFFIC: &str = "qrator_bypassed_traffic";
pub const INCOMING_TRAFFIC: &str = "qrator_incoming_traffic";
pub const OUTGOING_TRAFFIC: &str = "qrator_outgoing_traffic";
pub const BYPASSED_PACKETS: &str = "qrator_bypassed_packets";
pub const INCOMING_PACKETS: &str = "qrator_incoming_packets";
pub const REQUEST_RATE: &str = "qrator_request_rate";
pub const SLOW_REQUESTS_COUNT: &str = "qrator_slow_requests_count";
pub const REQUESTS_COUNT: &str = "qrator_requests_count_total";
pub const ERRORS_COUNT: &str = "qrator_errors_count";
pub const BANNED_IPS: &str = "qrator_banned_ip_addresses_count";
pub const BILLABLE_TRAFFIC: &str = "qrator_billable_traffic";
pub const SCRAPES_TOTAL: &str = "qrator_exporter_scrapes_total";
pub const FAILED_DOMAIN_SCRAPES: &str = "qrator_exporter_failed_domain_scrapes_total";
pub const FAILED_DOMAIN_STATS_SCRAPES: &str = "qrator_exporter_failed_domain_stats_scrapes_total";

const fn gauge_desc(name: &'static str, help: &'static str, labels: &'static [&'static str]) -> MetricDesc {
    MetricDesc { name, help, kind: MetricKind::Gauge, labels }
}

const fn counter_desc(name: &'static str, help: &'static str) -> MetricDesc {
    MetricDesc { name, help, kind: MetricKind::Counter, labels: &[] }
}

/// Every metric family the collector exports
pub const DESCRIPTORS: [MetricDesc; 14] = [
    gauge_desc(BYPASSED_TRAFFIC, "Bypassed traffic (bps)", &["domain"]),
    gauge_desc(INCOMING_TRAFFIC, "Incoming traffic (bps)", &["domain"]),
    gauge_desc(OUTGOING_TRAFFIC, "Outgoing traffic (bps)", &["domain"]),
    gauge_desc(BYPASSED_PACKETS, "Bypassed packets (pps)", &["domain"]),
    gauge_desc(INCOMING_PACKETS, "Incoming packets (pps)", &["domain"]),
    gauge_desc(REQUEST_RATE, "Request rate (rps)", &["domain"]),
    gauge_desc(SLOW_REQUESTS_COUNT, "Slow request count by treshold", &["domain", "treshold_seconds"]),
    gauge_desc(REQUESTS_COUNT, "Requests count", &["domain"]),
    gauge_desc(ERRORS_COUNT, "Errors count by code", &["domain", "code"]),
    gauge_desc(BANNED_IPS, "Number of IPs banned by Qrator", &["domain", "source"]),
    gauge_desc(BILLABLE_TRAFFIC, "Billable traffic (Mbps)", &["domain"]),
    counter_desc(SCRAPES_TOTAL, "Count of total scrapes"),
    counter_desc(FAILED_DOMAIN_SCRAPES, "Count of failed domains scrapes"),
    counter_desc(FAILED_DOMAIN_STATS_SCRAPES, "Count of failed stats scrapes"),
];

/// One gauge value derived from a statistics snapshot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaugeObservation {
    pub name: &'static str,
    /// Label besides `domain`, if the family has one
    pub label: Option<(&'static str, &'static str)>,
    pub value: f64,
}

impl GaugeObservation {
    fn plain(name: &'static str, value: f64) -> Self {
        Self { name, label: None, value }
    }

    fn labeled(name: &'static str, key: &'static str, label_value: &'static str, value: u64) -> Self {
        Self { name, label: Some((key, label_value)), value: value as f64 }
    }
}

/// Map a snapshot onto the 20 gauge series reported per domain
pub fn gauge_observations(stats: &DomainStatistics) -> [GaugeObservation; 20] {
    use GaugeObservation as G;

    [
        G::plain(BYPASSED_TRAFFIC, stats.bsend),
        G::plain(INCOMING_TRAFFIC, stats.brecv),
        G::plain(OUTGOING_TRAFFIC, stats.bout),
        G::plain(BYPASSED_PACKETS, stats.psend),
        G::plain(INCOMING_PACKETS, stats.precv),
        G::plain(REQUEST_RATE, stats.reqspeed),
        G::labeled(SLOW_REQUESTS_COUNT, "treshold_seconds", "0.2", stats.reqlonger02s),
        G::labeled(SLOW_REQUESTS_COUNT, "treshold_seconds", "0.5", stats.reqlonger05s),
        G::labeled(SLOW_REQUESTS_COUNT, "treshold_seconds", "0.7", stats.reqlonger07s),
        G::labeled(SLOW_REQUESTS_COUNT, "treshold_seconds", "1.0", stats.reqlonger10s),
        G::plain(REQUESTS_COUNT, stats.reqall as f64),
        G::labeled(ERRORS_COUNT, "code", "50X", stats.err50x),
        G::labeled(ERRORS_COUNT, "code", "501", stats.err501),
        G::labeled(ERRORS_COUNT, "code", "502", stats.err502),
        G::labeled(ERRORS_COUNT, "code", "503", stats.err503),
        G::labeled(ERRORS_COUNT, "code", "504", stats.err504),
        G::labeled(BANNED_IPS, "source", "Qrator", stats.ban),
        G::labeled(BANNED_IPS, "source", "Qrator.API", stats.ban_api),
        G::labeled(BANNED_IPS, "source", "WAF", stats.ban_waf),
        G::plain(BILLABLE_TRAFFIC, stats.billable as f64),
    ]
}

/// Cumulative counters, kept for the process lifetime
#[derive(Debug, Default)]
struct ScrapeCounters {
    total: AtomicU64,
    failed_domains: AtomicU64,
    failed_stats: AtomicU64,
}

/// Outcome of one collection cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    /// Domains listed upstream
    pub domains: usize,
    /// Domains whose statistics could not be fetched
    pub failed_domains: usize,
    /// Whether the domain list itself could be fetched
    pub listed: bool,
}

/// Collects Qrator statistics for every domain of one account
pub struct Collector {
    /// API client
    client: QratorClient,
    /// Validated account identifier
    client_id: u64,
    /// Where observations go
    sink: Arc<dyn MetricSink>,
    /// Process counters
    counters: ScrapeCounters,
    /// Held for the whole of a collection cycle
    cycle: Mutex<()>,
}

impl Collector {
    /// Validate the account and ping the API
    ///
    /// The collector is only returned once `ping` succeeded with the given
    /// credentials.
    ///
    /// # Returns
    ///
    /// * `Err(QratorError::Validation)` if the client id is not all digits
    /// * `Err(QratorError)` from the liveness check otherwise
    pub async fn new(settings: &QratorConfig, sink: Arc<dyn MetricSink>) -> Result<Self, QratorError> {
        let client_id = parse_account_id(&settings.client_id)
            .ok_or_else(|| QratorError::Validation(settings.client_id.clone()))?;

        let client = QratorClient::new(
            &settings.api_url,
            &settings.auth_token,
            Duration::from_secs(settings.request_timeout_seconds),
        )?;
        client.ping(client_id).await?;
        info!("Qrator API reachable for client {}", client_id);

        Ok(Self {
            client,
            client_id,
            sink,
            counters: ScrapeCounters::default(),
            cycle: Mutex::new(()),
        })
    }

    /// Register every metric family with the sink
    pub fn describe(&self) {
        for desc in DESCRIPTORS.iter() {
            self.sink.describe(desc);
        }
    }

    /// Run one collection cycle
    ///
    /// Failures never propagate: they are logged and counted, and whatever
    /// could be fetched is still reported.
    pub async fn collect(&self) -> CycleSummary {
        let _cycle = self.cycle.lock().await;
        let started = Instant::now();
        let mut summary = CycleSummary::default();

        self.sink.begin_cycle();
        self.counters.total.fetch_add(1, Ordering::Relaxed);

        let domains = match self.client.list_domains(self.client_id).await {
            Ok(domains) => {
                summary.listed = true;
                domains
            }
            Err(e) => {
                warn!("Cannot list domains for client {}: {}", self.client_id, e);
                self.counters.failed_domains.fetch_add(1, Ordering::Relaxed);
                Vec::new()
            }
        };
        summary.domains = domains.len();

        let results = join_all(domains.iter().map(|domain| self.collect_domain(domain))).await;
        summary.failed_domains = results.iter().filter(|ok| !**ok).count();

        self.emit_counters();
        self.sink.finish_cycle();

        info!(
            "Collected {} of {} domains in {:?}",
            summary.domains - summary.failed_domains,
            summary.domains,
            started.elapsed()
        );
        summary
    }

    /// Fetch and report one domain, returns whether it succeeded
    async fn collect_domain(&self, domain: &Domain) -> bool {
        let stats = match self.client.get_statistics(domain).await {
            Ok(stats) => stats,
            Err(e) => {
                warn!("Cannot get statistics for domain {} ({}): {}", domain.name, domain.id, e);
                self.counters.failed_stats.fetch_add(1, Ordering::Relaxed);
                return false;
            }
        };

        debug!("Got statistics for domain {}", domain.name);
        for observation in gauge_observations(&stats) {
            let mut labels = vec![("domain", domain.name.clone())];
            if let Some((key, value)) = observation.label {
                labels.push((key, value.to_string()));
            }
            self.sink.gauge(observation.name, &labels, observation.value);
        }
        true
    }

    fn emit_counters(&self) {
        self.sink.counter(SCRAPES_TOTAL, self.counters.total.load(Ordering::Relaxed));
        self.sink.counter(FAILED_DOMAIN_SCRAPES, self.counters.failed_domains.load(Ordering::Relaxed));
        self.sink.counter(FAILED_DOMAIN_STATS_SCRAPES, self.counters.failed_stats.load(Ordering::Relaxed));
    }
}
