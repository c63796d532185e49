#![allow(dead_code)]

use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use qrator_exporter::core::{MetricDesc, MetricSink};
use qrator_exporter::models::QratorConfig;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const CLIENT_ID: u64 = 123;
pub const SECRET: &str = "12345";
pub const DOMAIN_ID: u64 = 321;

pub const PONG: &str = r#"{"result":"pong","error":null,"id":1}"#;
pub const ONE_DOMAIN: &str = r#"{"result":[{"id":321,"name":"www.example.com","status":"online","ip":["1.2.3.4"],"ip_json":{"balancer":"roundrobin","weights":false,"backups":true,"clusters":false,"upstreams":[{"type":"primary","ip":"1.2.3.4","weight":1,"name":""}]},"qratorIp":"1.2.3.4","isService":false,"ports":null}],"error":null,"id":1}"#;
pub const STATISTICS: &str = r#"{"result":{"time":1557754384,"bsend":4111803.56044,"brecv":4203930.28571,"bout":19965551.42857,"psend":1772.3022,"precv":1898.25275,"reqspeed":151.68681,"reqlonger10s":657,"reqlonger07s":1123,"reqlonger05s":1899,"reqlonger02s":4073,"reqall":27606,"err50x":16,"err501":0,"err502":0,"err503":0,"err504":14,"ban":0,"ban_api":4,"ban_waf":0,"ban_geo":[],"billable":19},"error":null,"id":1}"#;
pub const TRUNCATED: &str = r#"{"error":"bad_json","id":1"#;
pub const ACL_EXCEPTION: &str = r#"{"result":null,"error":"ACLException","id":1}"#;
pub const BAD_REQUEST: &str = r#"{"result":null,"error":"BadRequest","id":1}"#;

/// Canned behaviour of the fake Qrator API
#[derive(Clone)]
pub struct Upstream {
    pub ping: String,
    pub domains: String,
    /// Statistics body per domain id
    pub stats: HashMap<u64, String>,
    /// Applied before answering any request
    pub delay: Duration,
    /// Paths of every authorized request, in arrival order
    pub requests: Arc<Mutex<Vec<String>>>,
    /// Once set, every statistics call answers with a truncated body
    pub broken_stats: Arc<AtomicBool>,
}

impl Default for Upstream {
    fn default() -> Self {
        Self {
            ping: PONG.to_string(),
            domains: ONE_DOMAIN.to_string(),
            stats: HashMap::from([(DOMAIN_ID, STATISTICS.to_string())]),
            delay: Duration::ZERO,
            requests: Arc::new(Mutex::new(Vec::new())),
            broken_stats: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl Upstream {
    pub fn requested_paths(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn break_statistics(&self) {
        self.broken_stats.store(true, Ordering::SeqCst);
    }
}

async fn dispatch(req: HttpRequest, body: web::Bytes, upstream: web::Data<Upstream>) -> HttpResponse {
    if !upstream.delay.is_zero() {
        actix_rt::time::sleep(upstream.delay).await;
    }

    let authorized = req
        .headers()
        .get("X-Qrator-Auth")
        .and_then(|value| value.to_str().ok())
        == Some(SECRET);
    if !authorized {
        return json(ACL_EXCEPTION);
    }
    upstream.requests.lock().unwrap().push(req.path().to_string());

    let method = serde_json::from_slice::<serde_json::Value>(&body)
        .ok()
        .and_then(|request| request["method"].as_str().map(str::to_owned))
        .unwrap_or_default();

    if req.path() == format!("/client/{}", CLIENT_ID) {
        return match method.as_str() {
            "ping" => json(&upstream.ping),
            "domains_get" => json(&upstream.domains),
            _ => json(BAD_REQUEST),
        };
    }

    let stats = req
        .path()
        .strip_prefix("/domain/")
        .and_then(|id| id.parse::<u64>().ok())
        .filter(|_| method == "statistics_get")
        .and_then(|id| upstream.stats.get(&id));

    match stats {
        Some(_) if upstream.broken_stats.load(Ordering::SeqCst) => json(TRUNCATED),
        Some(body) => json(body),
        None => json(BAD_REQUEST),
    }
}

fn json(body: &str) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("application/json")
        .body(body.to_string())
}

/// Serve `upstream` on an ephemeral local port and return its base URL
pub async fn start_upstream(upstream: Upstream) -> String {
    let data = web::Data::new(upstream);
    let server = HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .default_service(web::to(dispatch))
    })
    .workers(1)
    .bind(("127.0.0.1", 0))
    .unwrap();

    let addr = server.addrs()[0];
    actix_rt::spawn(server.run());

    format!("http://{}", addr)
}

pub fn settings(api_url: &str) -> QratorConfig {
    QratorConfig {
        api_url: api_url.to_string(),
        client_id: CLIENT_ID.to_string(),
        auth_token: SECRET.to_string(),
        request_timeout_seconds: 5,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    Gauge {
        name: &'static str,
        labels: Vec<(&'static str, String)>,
        value: f64,
    },
    Counter {
        name: &'static str,
        value: u64,
    },
}

/// Value of the series `name` carrying all of `labels` in a Prometheus text body
pub fn series_value(body: &str, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
    body.lines()
        .filter(|line| !line.starts_with('#'))
        .filter(|line| {
            let series = line.rsplit_once(' ').map(|(series, _)| series).unwrap_or("");
            let family = series.split('{').next().unwrap_or("");
            family == name
                && labels
                    .iter()
                    .all(|(k, v)| series.contains(&format!("{}=\"{}\"", k, v)))
        })
        .find_map(|line| line.rsplit_once(' ').and_then(|(_, value)| value.parse().ok()))
}

/// Sink that keeps everything it is given, in order
#[derive(Default)]
pub struct RecordingSink {
    described: Mutex<Vec<MetricDesc>>,
    observations: Mutex<Vec<Observation>>,
    cycles: AtomicUsize,
}

impl RecordingSink {
    /// Number of cycles that reached `finish_cycle`
    pub fn finished_cycles(&self) -> usize {
        self.cycles.load(Ordering::SeqCst)
    }

    pub fn described(&self) -> Vec<MetricDesc> {
        self.described.lock().unwrap().clone()
    }

    pub fn observations(&self) -> Vec<Observation> {
        self.observations.lock().unwrap().clone()
    }

    pub fn gauges(&self) -> Vec<Observation> {
        self.observations()
            .into_iter()
            .filter(|o| matches!(o, Observation::Gauge { .. }))
            .collect()
    }

    /// Latest value of the gauge series matching all of `labels`
    pub fn gauge_value(&self, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
        self.observations().into_iter().rev().find_map(|o| match o {
            Observation::Gauge { name: n, labels: l, value }
                if n == name
                    && labels.len() == l.len()
                    && labels.iter().all(|(k, v)| l.iter().any(|(lk, lv)| lk == k && lv == v)) =>
            {
                Some(value)
            }
            _ => None,
        })
    }

    /// Latest value reported for a counter
    pub fn counter_value(&self, name: &str) -> Option<u64> {
        self.observations().into_iter().rev().find_map(|o| match o {
            Observation::Counter { name: n, value } if n == name => Some(value),
            _ => None,
        })
    }
}

impl MetricSink for RecordingSink {
    fn describe(&self, desc: &MetricDesc) {
        self.described.lock().unwrap().push(*desc);
    }

    fn begin_cycle(&self) {}

    fn gauge(&self, name: &'static str, labels: &[(&'static str, String)], value: f64) {
        self.observations.lock().unwrap().push(Observation::Gauge {
            name,
            labels: labels.to_vec(),
            value,
        });
    }

    fn counter(&self, name: &'static str, value: u64) {
        self.observations
            .lock()
            .unwrap()
            .push(Observation::Counter { name, value });
    }

    fn finish_cycle(&self) {
        self.cycles.fetch_add(1, Ordering::SeqCst);
    }
}
