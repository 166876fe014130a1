//! Shared fixtures for sift-screen integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sift_config::{ScreeningConfig, TierBudget};
use sift_core::entities::CandidateRecord;
use sift_core::enums::{ExclusionReason, ReviewerRole, Verdict};
use sift_db::SiftService;
use sift_screen::{
    Assessment, DecisionOracle, OracleError, OracleReply, OracleRequest, RateLimiter,
    ScreeningMachine, parse_reply,
};

/// What the scripted oracle does for one `(record, role)`.
#[derive(Debug, Clone)]
pub enum Script {
    Reply(Assessment),
    Raw(String),
    Fail,
    Hang,
    /// Reply after a delay.
    Slow(Duration, Assessment),
}

impl Script {
    pub fn include() -> Self {
        Self::Reply(Assessment::new(Verdict::Include, 0.9, "meets criteria"))
    }

    pub fn exclude(reason: Option<ExclusionReason>) -> Self {
        let assessment = Assessment::new(Verdict::Exclude, 0.85, "fails criteria");
        Self::Reply(match reason {
            Some(r) => assessment.with_reason(r),
            None => assessment,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Call {
    pub record_id: String,
    pub role: ReviewerRole,
    pub prior_roles: Vec<ReviewerRole>,
    pub tier: String,
    pub started: tokio::time::Instant,
}

/// Deterministic oracle that counts and logs every call.
pub struct ScriptedOracle {
    scripts: Mutex<HashMap<(String, ReviewerRole), Script>>,
    default: Script,
    calls: AtomicUsize,
    log: Mutex<Vec<Call>>,
}

impl ScriptedOracle {
    pub fn new(default: Script) -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            default,
            calls: AtomicUsize::new(0),
            log: Mutex::new(Vec::new()),
        }
    }

    pub fn script(self, record_id: &str, role: ReviewerRole, script: Script) -> Self {
        self.scripts.lock().unwrap().insert((record_id.to_string(), role), script);
        self
    }

    pub fn set(&self, record_id: &str, role: ReviewerRole, script: Script) {
        self.scripts.lock().unwrap().insert((record_id.to_string(), role), script);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn log(&self) -> Vec<Call> {
        self.log.lock().unwrap().clone()
    }

    pub fn calls_for(&self, record_id: &str) -> Vec<ReviewerRole> {
        self.log().into_iter().filter(|c| c.record_id == record_id).map(|c| c.role).collect()
    }
}

impl DecisionOracle for ScriptedOracle {
    async fn evaluate(&self, request: &OracleRequest<'_>) -> Result<OracleReply, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.log.lock().unwrap().push(Call {
            record_id: request.record.id.clone(),
            role: request.role,
            prior_roles: request.prior.iter().map(|d| d.role).collect(),
            tier: request.tier.to_string(),
            started: tokio::time::Instant::now(),
        });
        let script = self
            .scripts
            .lock()
            .unwrap()
            .get(&(request.record.id.clone(), request.role))
            .cloned()
            .unwrap_or_else(|| self.default.clone());

        match script {
            Script::Reply(a) => Ok(OracleReply::Parsed(a)),
            Script::Raw(raw) => Ok(parse_reply(&raw)),
            Script::Fail => Err(OracleError::Unreachable("connection refused".into())),
            Script::Hang => std::future::pending().await,
            Script::Slow(delay, a) => {
                tokio::time::sleep(delay).await;
                Ok(OracleReply::Parsed(a))
            }
        }
    }
}

pub fn generous_limits() -> BTreeMap<String, TierBudget> {
    BTreeMap::from([
        ("fast".to_string(), TierBudget { max_calls: 10_000, window_secs: 60 }),
        ("deep".to_string(), TierBudget { max_calls: 10_000, window_secs: 60 }),
    ])
}

pub async fn store() -> Arc<SiftService> {
    Arc::new(SiftService::new_local(":memory:", None).await.unwrap())
}

pub fn machine_with(
    oracle: &Arc<ScriptedOracle>,
    store: &Arc<SiftService>,
    config: &ScreeningConfig,
) -> ScreeningMachine<ScriptedOracle, SiftService> {
    let limiter = Arc::new(RateLimiter::new(&generous_limits()).unwrap());
    ScreeningMachine::new(Arc::clone(oracle), Arc::clone(store), limiter, config).unwrap()
}

pub fn machine(
    oracle: &Arc<ScriptedOracle>,
    store: &Arc<SiftService>,
) -> ScreeningMachine<ScriptedOracle, SiftService> {
    machine_with(oracle, store, &ScreeningConfig::default())
}

pub fn records(n: usize) -> Vec<CandidateRecord> {
    (0..n).map(|i| CandidateRecord::new(format!("r{i:03}"), format!("Study number {i}"))).collect()
}
