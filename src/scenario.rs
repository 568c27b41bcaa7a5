//! Scenario model and sequential runner
//!
//! Scenarios run strictly in declaration order; later scenarios may read
//! state mutated by earlier ones, so each declares the state labels it
//! assumes (`preconditions`) and the labels it establishes (`provides`).
//! Ordering is validated up front, before any network traffic.

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use crate::error::HarnessError;

type ScenarioFuture = Pin<Box<dyn Future<Output = Result<(), HarnessError>> + Send>>;

/// Per-scenario policy for remote rejections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionPolicy {
    /// Expected-success path: a rejection fails the scenario.
    FailScenario,
    /// Permission-denial path: a rejection is the expected outcome.
    ExpectRejection,
}

/// A named sequence of submissions and queries exercising one behavior.
pub struct Scenario {
    pub name: &'static str,
    pub policy: RejectionPolicy,
    /// State labels this scenario assumes earlier scenarios established.
    pub preconditions: &'static [&'static str],
    /// State labels this scenario establishes for later scenarios.
    pub provides: &'static [&'static str],
    procedure: ScenarioFuture,
}

impl Scenario {
    pub fn expect_success(
        name: &'static str,
        preconditions: &'static [&'static str],
        provides: &'static [&'static str],
        procedure: impl Future<Output = Result<(), HarnessError>> + Send + 'static,
    ) -> Self {
        Self {
            name,
            policy: RejectionPolicy::FailScenario,
            preconditions,
            provides,
            procedure: Box::pin(procedure),
        }
    }

    pub fn expect_rejection(
        name: &'static str,
        preconditions: &'static [&'static str],
        provides: &'static [&'static str],
        procedure: impl Future<Output = Result<(), HarnessError>> + Send + 'static,
    ) -> Self {
        Self {
            name,
            policy: RejectionPolicy::ExpectRejection,
            preconditions,
            provides,
            procedure: Box::pin(procedure),
        }
    }
}

/// Failure-tolerant region for permission-denial scenarios.
///
/// Maps a rejection to success (it IS the expected outcome, logged for
/// the record) and an unexpected success to an assertion failure, so the
/// scenario can continue and verify that state was left untouched.
/// Transport failures and timeouts pass through untouched.
pub fn tolerate_rejection<T>(
    context: &str,
    outcome: Result<T, HarnessError>,
) -> Result<(), HarnessError> {
    match outcome {
        Err(e) if e.is_rejection() => {
            warn!("{} rejected as expected: {}", context, e);
            Ok(())
        }
        Err(e) => Err(e),
        Ok(_) => Err(HarnessError::Assertion {
            context: context.to_string(),
            expected: "remote rejection".to_string(),
            actual: "submission succeeded".to_string(),
        }),
    }
}

/// Outcome of one scenario.
#[derive(Debug)]
pub enum ScenarioOutcome {
    Passed,
    /// Rejection propagated out of an `ExpectRejection` scenario.
    PassedExpectedRejection,
    Failed(HarnessError),
    /// Not run because an earlier transport failure aborted the run.
    Skipped,
}

impl ScenarioOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, ScenarioOutcome::Failed(_))
    }
}

/// Per-scenario report entry.
#[derive(Debug)]
pub struct ScenarioReport {
    pub name: &'static str,
    pub outcome: ScenarioOutcome,
    pub duration: Duration,
}

/// Aggregated results of a full run.
#[derive(Debug, Default)]
pub struct RunReport {
    pub reports: Vec<ScenarioReport>,
    pub total_duration: Duration,
    /// True when a transport failure stopped the run early.
    pub aborted: bool,
}

impl RunReport {
    pub fn passed_count(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| {
                matches!(
                    r.outcome,
                    ScenarioOutcome::Passed | ScenarioOutcome::PassedExpectedRejection
                )
            })
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.reports.iter().filter(|r| r.outcome.is_failure()).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| matches!(r.outcome, ScenarioOutcome::Skipped))
            .count()
    }

    /// Non-zero process exit is warranted when this is true.
    pub fn has_failures(&self) -> bool {
        self.aborted || self.failed_count() > 0
    }

    pub fn print_summary(&self) {
        println!("\n=== Scenario Run Summary ===");
        println!("Total Duration: {:?}", self.total_duration);
        println!("Passed: {}", self.passed_count());
        println!("Failed: {}", self.failed_count());
        if self.skipped_count() > 0 {
            println!("Skipped: {}", self.skipped_count());
        }
        println!();

        for report in &self.reports {
            match &report.outcome {
                ScenarioOutcome::Passed => {
                    println!("PASS {} ({:?})", report.name, report.duration)
                }
                ScenarioOutcome::PassedExpectedRejection => println!(
                    "PASS {} (rejection expected, {:?})",
                    report.name, report.duration
                ),
                ScenarioOutcome::Failed(e) => println!("FAIL {}: {}", report.name, e),
                ScenarioOutcome::Skipped => println!("SKIP {} (run aborted)", report.name),
            }
        }

        if self.aborted {
            println!("\nRun aborted on transport failure.");
        }
        println!();
    }
}

/// Sequences scenarios one at a time, in declaration order.
pub struct Runner;

impl Runner {
    /// Check that every declared precondition is provided by an earlier
    /// scenario. Runs before any scenario procedure.
    pub fn validate_ordering(scenarios: &[Scenario]) -> Result<(), HarnessError> {
        let mut provided: HashSet<&str> = HashSet::new();

        for scenario in scenarios {
            for precondition in scenario.preconditions {
                if !provided.contains(precondition) {
                    return Err(HarnessError::Config(format!(
                        "scenario {} assumes '{}' which no earlier scenario provides",
                        scenario.name, precondition
                    )));
                }
            }
            provided.extend(scenario.provides.iter().copied());
        }

        Ok(())
    }

    /// Run all scenarios sequentially and aggregate a report.
    ///
    /// A transport failure stops the run: the failing scenario is marked
    /// failed, the rest skipped, and the report flagged aborted.
    pub async fn run(scenarios: Vec<Scenario>) -> Result<RunReport, HarnessError> {
        Self::validate_ordering(&scenarios)?;

        info!("Running {} scenarios", scenarios.len());
        let run_start = Instant::now();

        let mut report = RunReport::default();
        let mut abort = false;

        for scenario in scenarios {
            if abort {
                report.reports.push(ScenarioReport {
                    name: scenario.name,
                    outcome: ScenarioOutcome::Skipped,
                    duration: Duration::ZERO,
                });
                continue;
            }

            info!("Scenario {} starting", scenario.name);
            let start = Instant::now();
            let result = scenario.procedure.await;
            let duration = start.elapsed();

            let outcome = match result {
                Ok(()) => {
                    info!("Scenario {} passed in {:?}", scenario.name, duration);
                    ScenarioOutcome::Passed
                }
                Err(e) if e.is_rejection() && scenario.policy == RejectionPolicy::ExpectRejection => {
                    warn!("Scenario {} rejected as expected: {}", scenario.name, e);
                    ScenarioOutcome::PassedExpectedRejection
                }
                Err(e) => {
                    error!("Scenario {} failed: {}", scenario.name, e);
                    if e.is_transport() {
                        abort = true;
                    }
                    ScenarioOutcome::Failed(e)
                }
            };

            report.reports.push(ScenarioReport {
                name: scenario.name,
                outcome,
                duration,
            });
        }

        report.aborted = abort;
        report.total_duration = run_start.elapsed();

        info!(
            "Run finished: {} passed, {} failed, {} skipped",
            report.passed_count(),
            report.failed_count(),
            report.skipped_count()
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recording_scenario(
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
        preconditions: &'static [&'static str],
        provides: &'static [&'static str],
    ) -> Scenario {
        Scenario::expect_success(name, preconditions, provides, async move {
            log.lock().unwrap().push(name);
            Ok(())
        })
    }

    #[tokio::test]
    async fn test_scenarios_run_in_declaration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let scenarios = vec![
            recording_scenario("first", log.clone(), &[], &["base"]),
            recording_scenario("second", log.clone(), &["base"], &[]),
            recording_scenario("third", log.clone(), &["base"], &[]),
        ];

        let report = Runner::run(scenarios).await.unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["first", "second", "third"]);
        assert_eq!(report.passed_count(), 3);
        assert!(!report.has_failures());
    }

    #[tokio::test]
    async fn test_later_scenario_observes_earlier_mutation() {
        let state = Arc::new(Mutex::new(0u64));

        let writer_state = state.clone();
        let reader_state = state.clone();
        let scenarios = vec![
            Scenario::expect_success("write", &[], &["value_set"], async move {
                *writer_state.lock().unwrap() = 30;
                Ok(())
            }),
            Scenario::expect_success("read", &["value_set"], &[], async move {
                crate::utils::ensure_eq("value", &30u64, &*reader_state.lock().unwrap())
            }),
        ];

        let report = Runner::run(scenarios).await.unwrap();
        assert_eq!(report.passed_count(), 2);
    }

    #[tokio::test]
    async fn test_unprovided_precondition_fails_before_running() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let scenarios = vec![recording_scenario(
            "needy",
            log.clone(),
            &["never_provided"],
            &[],
        )];

        let err = Runner::run(scenarios).await.unwrap_err();
        assert!(matches!(err, HarnessError::Config(_)));
        assert!(log.lock().unwrap().is_empty(), "no procedure should have run");
    }

    #[tokio::test]
    async fn test_rejection_passes_tolerant_scenario() {
        let scenarios = vec![Scenario::expect_rejection("denied", &[], &[], async {
            Err(HarnessError::Rejected {
                reason: "execution reverted: Only owner".to_string(),
            })
        })];

        let report = Runner::run(scenarios).await.unwrap();
        assert_eq!(report.passed_count(), 1);
        assert!(!report.has_failures());
    }

    #[tokio::test]
    async fn test_rejection_fails_strict_scenario() {
        let scenarios = vec![Scenario::expect_success("strict", &[], &[], async {
            Err(HarnessError::Rejected {
                reason: "execution reverted".to_string(),
            })
        })];

        let report = Runner::run(scenarios).await.unwrap();
        assert_eq!(report.failed_count(), 1);
        assert!(report.has_failures());
    }

    #[tokio::test]
    async fn test_transport_failure_aborts_run() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let scenarios = vec![
            Scenario::expect_success("broken", &[], &[], async {
                Err(HarnessError::Transport {
                    reason: "connection refused".to_string(),
                })
            }),
            recording_scenario("never_runs", log.clone(), &[], &[]),
        ];

        let report = Runner::run(scenarios).await.unwrap();

        assert!(report.aborted);
        assert_eq!(report.failed_count(), 1);
        assert_eq!(report.skipped_count(), 1);
        assert!(report.has_failures());
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_assertion_failure_fails_scenario_without_aborting() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let scenarios = vec![
            Scenario::expect_success("mismatch", &[], &[], async {
                crate::utils::ensure_eq("value", &30u64, &40u64)
            }),
            recording_scenario("still_runs", log.clone(), &[], &[]),
        ];

        let report = Runner::run(scenarios).await.unwrap();

        assert!(!report.aborted);
        assert_eq!(report.failed_count(), 1);
        assert_eq!(report.passed_count(), 1);
        assert_eq!(*log.lock().unwrap(), vec!["still_runs"]);
    }

    #[test]
    fn test_tolerate_rejection_mapping() {
        let rejected: Result<(), _> = Err(HarnessError::Rejected {
            reason: "revert".to_string(),
        });
        assert!(tolerate_rejection("denied call", rejected).is_ok());

        let succeeded: Result<(), HarnessError> = Ok(());
        let err = tolerate_rejection("denied call", succeeded).unwrap_err();
        assert!(matches!(err, HarnessError::Assertion { .. }));

        let transport: Result<(), _> = Err(HarnessError::Transport {
            reason: "connection refused".to_string(),
        });
        let err = tolerate_rejection("denied call", transport).unwrap_err();
        assert!(err.is_transport());
    }
}
