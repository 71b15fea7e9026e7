//! Polling versus event-driven approval waits.
//!
//! Both approaches run `iterations` concurrent approvals, each answered after
//! `resolve_delay`. The polling variant re-checks a shared map every
//! `poll_interval`; the event-driven variant suspends on the wait registry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::task::{JoinError, JoinSet};

use humangate_domain::{PlanId, WaitError};

use crate::infrastructure::settings::{millis_var, SettingsError, WaitSettings};
use crate::stores::WaitRegistry;

pub const ITERATIONS_ENV: &str = "HUMANGATE_BENCH_ITERATIONS";
pub const DELAY_ENV: &str = "HUMANGATE_BENCH_DELAY_MS";
pub const POLL_ENV: &str = "HUMANGATE_BENCH_POLL_MS";

#[derive(Debug, Error)]
pub enum BenchmarkError {
    #[error("Benchmark task failed: {0}")]
    Task(#[from] JoinError),

    #[error("Wait failed: {0}")]
    Wait(#[from] WaitError),

    #[error("Invalid value for {var}: '{value}'")]
    InvalidConfig { var: &'static str, value: String },
}

impl From<SettingsError> for BenchmarkError {
    fn from(err: SettingsError) -> Self {
        match err {
            SettingsError::InvalidMillis { var, value } => Self::InvalidConfig { var, value },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BenchmarkConfig {
    pub iterations: usize,
    pub resolve_delay: Duration,
    pub poll_interval: Duration,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            iterations: 50,
            resolve_delay: Duration::from_millis(50),
            poll_interval: Duration::from_millis(10),
        }
    }
}

impl BenchmarkConfig {
    pub fn from_env() -> Result<Self, BenchmarkError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, BenchmarkError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let iterations = match lookup(ITERATIONS_ENV) {
            Some(raw) => {
                let raw = raw.trim();
                raw.parse().map_err(|_| BenchmarkError::InvalidConfig {
                    var: ITERATIONS_ENV,
                    value: raw.to_string(),
                })?
            }
            None => defaults.iterations,
        };

        Ok(Self {
            iterations,
            resolve_delay: millis_var(&lookup, DELAY_ENV)?.unwrap_or(defaults.resolve_delay),
            poll_interval: millis_var(&lookup, POLL_ENV)?.unwrap_or(defaults.poll_interval),
        })
    }

    /// Generous per-wait deadline so a slow machine does not fail the run.
    fn wait_timeout(&self) -> Duration {
        self.resolve_delay
            .saturating_mul(20)
            .saturating_add(Duration::from_secs(1))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BenchmarkReport {
    pub iterations: usize,
    pub polling: Duration,
    pub event_driven: Duration,
    /// Wake-ups spent re-checking the map in the polling variant
    pub poll_checks: u64,
}

impl BenchmarkReport {
    /// How many times faster the event-driven run finished.
    pub fn speedup(&self) -> f64 {
        let event = self.event_driven.as_secs_f64();
        if event > 0.0 {
            self.polling.as_secs_f64() / event
        } else {
            f64::INFINITY
        }
    }
}

/// Run both variants back to back.
pub async fn run(
    config: BenchmarkConfig,
    settings: WaitSettings,
) -> Result<BenchmarkReport, BenchmarkError> {
    tracing::info!(
        iterations = config.iterations,
        resolve_delay_ms = config.resolve_delay.as_millis() as u64,
        poll_interval_ms = config.poll_interval.as_millis() as u64,
        "Running wait benchmarks"
    );

    let (polling, poll_checks) = run_polling(config).await?;
    tracing::info!(elapsed_ms = polling.as_millis() as u64, poll_checks, "Polling finished");

    let event_driven = run_event_driven(config, settings).await?;
    tracing::info!(elapsed_ms = event_driven.as_millis() as u64, "Event-driven finished");

    Ok(BenchmarkReport {
        iterations: config.iterations,
        polling,
        event_driven,
        poll_checks,
    })
}

/// Waiters repeatedly check a shared map until their answer shows up.
pub async fn run_polling(config: BenchmarkConfig) -> Result<(Duration, u64), BenchmarkError> {
    let answers: Arc<Mutex<HashMap<String, Option<bool>>>> = Arc::new(Mutex::new(HashMap::new()));
    let started = Instant::now();
    let mut waiters = JoinSet::new();
    let mut resolvers = JoinSet::new();

    for i in 0..config.iterations {
        let plan_id = format!("plan_{i}");
        answers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(plan_id.clone(), None);

        let answers_for_waiter = Arc::clone(&answers);
        let waiter_plan = plan_id.clone();
        waiters.spawn(async move {
            let mut checks = 0u64;
            loop {
                checks += 1;
                let answer = answers_for_waiter
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .get(&waiter_plan)
                    .copied()
                    .flatten();
                if answer.is_some() {
                    return checks;
                }
                tokio::time::sleep(config.poll_interval).await;
            }
        });

        let answers_for_resolver = Arc::clone(&answers);
        resolvers.spawn(async move {
            tokio::time::sleep(config.resolve_delay).await;
            answers_for_resolver
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(plan_id, Some(true));
        });
    }

    let mut checks = 0u64;
    while let Some(result) = waiters.join_next().await {
        checks += result?;
    }
    while let Some(result) = resolvers.join_next().await {
        result?;
    }

    Ok((started.elapsed(), checks))
}

/// Waiters suspend on the registry and are woken by the resolver.
pub async fn run_event_driven(
    config: BenchmarkConfig,
    settings: WaitSettings,
) -> Result<Duration, BenchmarkError> {
    let registry = Arc::new(WaitRegistry::new(settings));
    let timeout = config.wait_timeout();
    let started = Instant::now();
    let mut waiters = JoinSet::new();
    let mut resolvers = JoinSet::new();

    for i in 0..config.iterations {
        let plan_id = PlanId::from(format!("plan_{i}"));
        registry.register_approval(plan_id.clone())?;

        let waiter_registry = Arc::clone(&registry);
        let waiter_plan = plan_id.clone();
        waiters.spawn(async move {
            waiter_registry
                .wait_for_approval(&waiter_plan, Some(timeout))
                .await
        });

        let resolver_registry = Arc::clone(&registry);
        resolvers.spawn(async move {
            tokio::time::sleep(config.resolve_delay).await;
            resolver_registry.resolve_approval(&plan_id, true)
        });
    }

    while let Some(result) = resolvers.join_next().await {
        result??;
    }
    while let Some(result) = waiters.join_next().await {
        result??;
    }

    Ok(started.elapsed())
}
