//! Tests for the Orchestrator module

use super::builder::OrchestratorBuilder;
use super::executor::Orchestrator;
use crate::benchmark::{BenchmarkId, BenchmarkStatus};
use crate::config::{EfficiencyStrategy, EnginePoolConfig, OrchestratorConfig};
use crate::error::BenchErrorKind;
use crate::execution::{ExecutionStatus, FailureKind};
use crate::metrics::{Counter, InMemoryMetrics};
use crate::test_support::{MockEngineClient, MockRepository};
use crate::traits::EngineClient;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Helper functions
// ============================================================================

fn orchestrator(
    repository: Arc<MockRepository>,
    clients: Vec<Arc<MockEngineClient>>,
    config: OrchestratorConfig,
) -> Orchestrator {
    OrchestratorBuilder::new()
        .config(config)
        .repository(repository)
        .engines(clients.into_iter().map(|c| c as Arc<dyn EngineClient>))
        .build()
        .expect("Failed to build orchestrator")
}

fn fast_config() -> OrchestratorConfig {
    OrchestratorConfig::new(2)
        .with_query_timeout(Duration::from_secs(5))
        .with_ping_timeout(Duration::from_millis(200))
}

// ============================================================================
// Builder Tests
// ============================================================================

#[test]
fn test_builder_missing_repository() {
    let result = OrchestratorBuilder::new()
        .engine(MockEngineClient::new("trino").arc())
        .build();

    let err = result.unwrap_err();
    assert!(err.message.contains("repository"));
}

#[test]
fn test_builder_missing_engines() {
    let result = OrchestratorBuilder::new()
        .repository(MockRepository::new())
        .build();

    assert!(result.unwrap_err().message.contains("engines"));
}

#[test]
fn test_builder_rejects_invalid_config() {
    let result = OrchestratorBuilder::new()
        .repository(MockRepository::new())
        .engine(MockEngineClient::new("trino").arc())
        .concurrency(0)
        .build();

    assert_eq!(result.unwrap_err().kind, BenchErrorKind::Config);
}

#[test]
fn test_builder_registers_engines_by_name() {
    let orchestrator = OrchestratorBuilder::new()
        .repository(MockRepository::new())
        .engine(MockEngineClient::new("trino").arc())
        .engine(MockEngineClient::new("presto").arc())
        .engine_pool("trino", EnginePoolConfig::with_concurrency(3))
        .build()
        .unwrap();

    assert_eq!(orchestrator.engine_names(), vec!["presto", "trino"]);
    assert_eq!(orchestrator.config().pool_for("trino").concurrency, 3);
}

// ============================================================================
// Run Tests
// ============================================================================

#[tokio::test]
async fn test_run_two_engines_success_failure_and_timeout() {
    let repository = MockRepository::new();
    let id = repository
        .insert(1, &["alpha", "beta"], &["SELECT 1", "SELECT 2"])
        .await;

    let alpha = MockEngineClient::new("alpha").arc();
    let beta = MockEngineClient::new("beta")
        .failing_on("SELECT 1")
        .hanging_on("SELECT 2")
        .arc();
    let config = fast_config().with_engine_pool(
        "beta",
        EnginePoolConfig::default().query_timeout(Duration::from_millis(50)),
    );
    let orchestrator = orchestrator(repository.clone(), vec![alpha, beta], config);

    let summary = orchestrator.run_to_completion(id).await.unwrap();

    assert_eq!(summary.status, BenchmarkStatus::Completed);
    assert_eq!(summary.planned, 4);
    assert!(!summary.cancelled);
    assert_eq!(summary.results.len(), 2);

    let alpha = &summary.results[0];
    assert_eq!(alpha.engine, "alpha");
    assert_eq!(
        (alpha.total_queries, alpha.successful_queries, alpha.failed_queries),
        (2, 2, 0)
    );
    assert!(alpha.throughput > 0.0);

    let beta = &summary.results[1];
    assert_eq!(beta.engine, "beta");
    assert_eq!(
        (beta.total_queries, beta.successful_queries, beta.failed_queries),
        (2, 0, 2)
    );
    assert_eq!(beta.efficiency_score, 0.0);

    assert_eq!(repository.status(id).await, BenchmarkStatus::Completed);
    assert_eq!(
        repository.transitions(id).await,
        vec![BenchmarkStatus::Running, BenchmarkStatus::Completed]
    );

    let saved = repository.saved_executions(id).await;
    let kinds: Vec<FailureKind> = saved
        .iter()
        .filter(|e| e.engine == "beta")
        .filter_map(|e| e.failure.as_ref().map(|f| f.kind))
        .collect();
    assert!(kinds.contains(&FailureKind::ExecutionFailure));
    assert!(kinds.contains(&FailureKind::Timeout));

    let results = orchestrator.get_results(id).await.unwrap();
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.id.is_some()));
}

#[tokio::test]
async fn test_run_only_engine_fails_ping() {
    let repository = MockRepository::new();
    let id = repository.insert(1, &["alpha"], &["SELECT 1"]).await;
    let alpha = MockEngineClient::new("alpha").unreachable().arc();
    let metrics = Arc::new(InMemoryMetrics::new());

    let orchestrator = OrchestratorBuilder::new()
        .config(fast_config())
        .repository(repository.clone())
        .engine(alpha.clone())
        .metrics(metrics.clone())
        .build()
        .unwrap();

    let err = orchestrator.run(id).await.unwrap_err();
    assert_eq!(err.kind, BenchErrorKind::EngineUnavailable);
    assert!(err.message.contains("alpha"));

    assert_eq!(repository.status(id).await, BenchmarkStatus::Failed);
    assert_eq!(alpha.executed.load(Ordering::SeqCst), 0);
    assert_eq!(orchestrator.tracker().snapshot(id).total, 0);
    assert!(repository.saved_executions(id).await.is_empty());
    assert_eq!(metrics.counter(Counter::BenchmarksFailed, None), 1);

    let status = orchestrator.get_status(id).await.unwrap();
    assert_eq!(status.status, BenchmarkStatus::Failed);
    assert_eq!(status.total, 0);
}

#[tokio::test]
async fn test_run_excludes_engine_failing_ping() {
    let repository = MockRepository::new();
    let id = repository
        .insert(1, &["alpha", "beta", "gamma"], &["SELECT 1", "SELECT 2", "SELECT 3"])
        .await;
    let alpha = MockEngineClient::new("alpha").arc();
    let beta = MockEngineClient::new("beta").unreachable().arc();

    // gamma has no registered client and counts as unavailable
    let orchestrator = orchestrator(
        repository.clone(),
        vec![alpha, beta.clone()],
        fast_config(),
    );

    let handle = orchestrator.run(id).await.unwrap();
    assert_eq!(handle.planned_executions(), 3);
    assert_eq!(handle.engines(), ["alpha".to_string()]);
    assert_eq!(
        handle.unavailable_engines(),
        ["beta".to_string(), "gamma".to_string()]
    );

    let summary = handle.wait().await.unwrap();
    assert_eq!(summary.results.len(), 1);
    assert_eq!(summary.results[0].engine, "alpha");
    assert_eq!(summary.unavailable_engines, vec!["beta", "gamma"]);
    assert_eq!(beta.executed.load(Ordering::SeqCst), 0);
    assert_eq!(repository.status(id).await, BenchmarkStatus::Completed);
}

#[tokio::test]
async fn test_run_require_all_engines() {
    let repository = MockRepository::new();
    let id = repository.insert(1, &["alpha", "beta"], &["SELECT 1"]).await;
    let alpha = MockEngineClient::new("alpha").arc();
    let beta = MockEngineClient::new("beta").unreachable().arc();

    let orchestrator = orchestrator(
        repository.clone(),
        vec![alpha.clone(), beta],
        fast_config().with_require_all_engines(true),
    );

    let err = orchestrator.run(id).await.unwrap_err();
    assert_eq!(err.kind, BenchErrorKind::EngineUnavailable);
    assert_eq!(repository.status(id).await, BenchmarkStatus::Failed);
    assert_eq!(alpha.executed.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_run_zero_ms_query_throughput_is_one() {
    let repository = MockRepository::new();
    let id = repository.insert(1, &["alpha"], &["SELECT 1"]).await;
    let orchestrator = orchestrator(
        repository,
        vec![MockEngineClient::new("alpha").arc()],
        fast_config().with_efficiency(EfficiencyStrategy::ThroughputOnly),
    );

    let summary = orchestrator.run_to_completion(id).await.unwrap();
    let result = &summary.results[0];
    assert_eq!(result.successful_queries, 1);
    // The wall clock may tick a few ms; with zero elapsed it is exactly 1
    assert!(result.throughput >= 1.0);
    assert_eq!(result.efficiency_strategy, "throughput_only");
}

#[tokio::test]
async fn test_run_rejects_non_created_and_unknown() {
    let repository = MockRepository::new();
    let id = repository.insert(1, &["alpha"], &["SELECT 1"]).await;
    let orchestrator = orchestrator(
        repository,
        vec![MockEngineClient::new("alpha").arc()],
        fast_config(),
    );

    orchestrator.run_to_completion(id).await.unwrap();

    let err = orchestrator.run(id).await.unwrap_err();
    assert_eq!(err.kind, BenchErrorKind::InvalidState);

    let err = orchestrator.run(BenchmarkId(99)).await.unwrap_err();
    assert_eq!(err.kind, BenchErrorKind::NotFound);
    let err = orchestrator.get_results(BenchmarkId(99)).await.unwrap_err();
    assert_eq!(err.kind, BenchErrorKind::NotFound);
    let err = orchestrator.get_status(BenchmarkId(99)).await.unwrap_err();
    assert_eq!(err.kind, BenchErrorKind::NotFound);
}

#[tokio::test]
async fn test_run_rejects_concurrent_second_run() {
    let repository = MockRepository::new();
    let id = repository.insert(1, &["alpha"], &["SELECT slow"]).await;
    let alpha = MockEngineClient::new("alpha").hanging_on("SELECT slow").arc();
    let orchestrator = orchestrator(repository, vec![alpha], fast_config());

    let handle = orchestrator.run(id).await.unwrap();
    let err = orchestrator.run(id).await.unwrap_err();
    assert_eq!(err.kind, BenchErrorKind::InvalidState);

    handle.cancel();
    handle.wait().await.unwrap();
}

#[tokio::test]
async fn test_run_bounds_engine_concurrency() {
    let repository = MockRepository::new();
    let sqls: Vec<String> = (0..8).map(|i| format!("SELECT {i}")).collect();
    let sql_refs: Vec<&str> = sqls.iter().map(String::as_str).collect();
    let id = repository.insert(1, &["alpha", "beta"], &sql_refs).await;

    let alpha = MockEngineClient::new("alpha")
        .with_delay(Duration::from_millis(20))
        .arc();
    let beta = MockEngineClient::new("beta")
        .with_delay(Duration::from_millis(20))
        .arc();
    let config = fast_config().with_engine_pool("beta", EnginePoolConfig::with_concurrency(4));
    let orchestrator = orchestrator(repository, vec![alpha.clone(), beta.clone()], config);

    let summary = orchestrator.run_to_completion(id).await.unwrap();

    assert_eq!(summary.completed, 16);
    assert_eq!(alpha.executed.load(Ordering::SeqCst), 8);
    assert_eq!(beta.executed.load(Ordering::SeqCst), 8);
    assert!(alpha.max_in_flight.load(Ordering::SeqCst) <= 2);
    assert!(beta.max_in_flight.load(Ordering::SeqCst) <= 4);
    assert!(beta.max_in_flight.load(Ordering::SeqCst) > 1);
}

#[tokio::test]
async fn test_run_without_queries_completes_without_results() {
    let repository = MockRepository::new();
    let id = repository.insert(1, &["alpha"], &[]).await;
    let orchestrator = orchestrator(
        repository.clone(),
        vec![MockEngineClient::new("alpha").arc()],
        fast_config(),
    );

    let summary = orchestrator.run_to_completion(id).await.unwrap();
    assert_eq!(summary.planned, 0);
    assert!(summary.results.is_empty());
    assert_eq!(repository.status(id).await, BenchmarkStatus::Completed);

    let status = orchestrator.get_status(id).await.unwrap();
    assert_eq!(status.progress_percent, 100.0);
}

// ============================================================================
// Cancellation Tests
// ============================================================================

#[tokio::test]
async fn test_cancel_leaves_no_running_executions() {
    let repository = MockRepository::new();
    let id = repository
        .insert(1, &["alpha"], &["SELECT slow", "SELECT 2", "SELECT 3"])
        .await;
    let alpha = MockEngineClient::new("alpha").hanging_on("SELECT slow").arc();
    let orchestrator = orchestrator(
        repository.clone(),
        vec![alpha],
        OrchestratorConfig::new(1).with_query_timeout(Duration::from_secs(60)),
    );

    let handle = orchestrator.run(id).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let status = orchestrator.get_status(id).await.unwrap();
    assert_eq!(status.status, BenchmarkStatus::Running);
    assert_eq!(status.running, 1);

    orchestrator.cancel(id).await.unwrap();
    let summary = handle.wait().await.unwrap();

    assert!(summary.cancelled);
    assert_eq!(summary.status, BenchmarkStatus::Completed);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.never_dispatched, 2);
    assert_eq!(summary.results.len(), 1);
    assert_eq!(summary.results[0].total_queries, 1);

    let status = orchestrator.get_status(id).await.unwrap();
    assert_eq!(status.running, 0);
    assert_eq!(status.pending, 2);
    let cancelled = status
        .executions
        .iter()
        .find(|e| e.status == ExecutionStatus::Failed)
        .unwrap();
    assert_eq!(cancelled.failure.as_ref().unwrap().kind, FailureKind::Cancelled);

    // The run is over, so there is nothing left to cancel
    let err = orchestrator.cancel(id).await.unwrap_err();
    assert_eq!(err.kind, BenchErrorKind::InvalidState);
}

#[tokio::test]
async fn test_cancel_unknown_benchmark() {
    let orchestrator = orchestrator(
        MockRepository::new(),
        vec![MockEngineClient::new("alpha").arc()],
        fast_config(),
    );
    let err = orchestrator.cancel(BenchmarkId(7)).await.unwrap_err();
    assert_eq!(err.kind, BenchErrorKind::NotFound);
}

#[tokio::test]
async fn test_shutdown_cancels_and_closes_clients() {
    let repository = MockRepository::new();
    let id = repository.insert(1, &["alpha"], &["SELECT slow"]).await;
    let alpha = MockEngineClient::new("alpha").hanging_on("SELECT slow").arc();
    let orchestrator = orchestrator(repository, vec![alpha.clone()], fast_config());

    let handle = orchestrator.run(id).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    orchestrator.shutdown().await;

    let summary = handle.wait().await.unwrap();
    assert!(summary.cancelled);
    assert!(alpha.closed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_shutdown_after_rejected_run_closes_clients() {
    let repository = MockRepository::new();
    let id = repository.insert(1, &["alpha"], &["SELECT 1"]).await;
    let alpha = MockEngineClient::new("alpha").unreachable().arc();
    let orchestrator = orchestrator(repository.clone(), vec![alpha.clone()], fast_config());

    assert!(orchestrator.run(id).await.is_err());
    orchestrator.shutdown().await;

    assert!(alpha.closed.load(Ordering::SeqCst));
    assert_eq!(repository.status(id).await, BenchmarkStatus::Failed);
}

// ============================================================================
// Fault and Metrics Tests
// ============================================================================

#[tokio::test]
async fn test_storage_failure_fails_benchmark() {
    let repository = MockRepository::new();
    let id = repository.insert(1, &["alpha"], &["SELECT 1"]).await;
    repository.fail_result_saves();
    let orchestrator = orchestrator(
        repository.clone(),
        vec![MockEngineClient::new("alpha").arc()],
        fast_config(),
    );

    let err = orchestrator.run_to_completion(id).await.unwrap_err();
    assert_eq!(err.kind, BenchErrorKind::Storage);
    assert_eq!(repository.status(id).await, BenchmarkStatus::Failed);
    assert_eq!(
        repository.transitions(id).await,
        vec![BenchmarkStatus::Running, BenchmarkStatus::Failed]
    );
}

#[tokio::test]
async fn test_running_status_write_failure_fails_benchmark() {
    let repository = MockRepository::new();
    let id = repository.insert(1, &["alpha"], &["SELECT 1", "SELECT 2"]).await;
    repository.fail_status_writes(BenchmarkStatus::Running);
    let alpha = MockEngineClient::new("alpha").arc();
    let metrics = Arc::new(InMemoryMetrics::new());
    let orchestrator = OrchestratorBuilder::new()
        .config(fast_config())
        .repository(repository.clone())
        .engine(alpha.clone())
        .metrics(metrics.clone())
        .build()
        .unwrap();

    let err = orchestrator.run(id).await.unwrap_err();
    assert_eq!(err.kind, BenchErrorKind::Storage);
    assert_eq!(repository.status(id).await, BenchmarkStatus::Failed);
    assert_eq!(repository.transitions(id).await, vec![BenchmarkStatus::Failed]);
    assert_eq!(orchestrator.tracker().snapshot(id).total, 0);
    assert_eq!(alpha.executed.load(Ordering::SeqCst), 0);
    assert_eq!(metrics.counter(Counter::BenchmarksFailed, None), 1);
    assert_eq!(metrics.counter(Counter::BenchmarksStarted, None), 0);

    // Not left registered as active
    let err = orchestrator.cancel(id).await.unwrap_err();
    assert_eq!(err.kind, BenchErrorKind::InvalidState);
}

#[tokio::test]
async fn test_unavailable_engine_reported_when_failed_status_write_fails() {
    let repository = MockRepository::new();
    let id = repository.insert(1, &["alpha"], &["SELECT 1"]).await;
    repository.fail_status_writes(BenchmarkStatus::Failed);
    let orchestrator = orchestrator(
        repository.clone(),
        vec![MockEngineClient::new("alpha").unreachable().arc()],
        fast_config(),
    );

    let err = orchestrator.run(id).await.unwrap_err();
    assert_eq!(err.kind, BenchErrorKind::EngineUnavailable);
    assert!(err.message.contains("alpha"));
    assert_eq!(repository.status(id).await, BenchmarkStatus::Created);
}

#[tokio::test]
async fn test_status_after_run_reads_persisted_executions() {
    let repository = MockRepository::new();
    let id = repository.insert(1, &["alpha"], &["SELECT 1", "SELECT 2"]).await;
    let orchestrator = orchestrator(
        repository.clone(),
        vec![MockEngineClient::new("alpha").arc()],
        fast_config(),
    );

    orchestrator.run_to_completion(id).await.unwrap();
    assert_eq!(orchestrator.tracker().snapshot(id).total, 0);

    let status = orchestrator.get_status(id).await.unwrap();
    assert_eq!(status.status, BenchmarkStatus::Completed);
    assert_eq!(status.total, 2);
    assert_eq!(status.completed, 2);
    assert!((status.progress_percent - 100.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_metrics_counters() {
    let repository = MockRepository::new();
    let id = repository
        .insert(1, &["alpha"], &["SELECT 1", "SELECT bad"])
        .await;
    let metrics = Arc::new(InMemoryMetrics::new());
    let orchestrator = OrchestratorBuilder::new()
        .config(fast_config())
        .repository(repository)
        .engine(MockEngineClient::new("alpha").failing_on("SELECT bad").arc())
        .metrics(metrics.clone())
        .build()
        .unwrap();

    orchestrator.run_to_completion(id).await.unwrap();

    assert_eq!(metrics.counter(Counter::BenchmarksStarted, None), 1);
    assert_eq!(metrics.counter(Counter::BenchmarksCompleted, None), 1);
    assert_eq!(metrics.counter(Counter::ExecutionsCompleted, Some("alpha")), 1);
    assert_eq!(metrics.counter(Counter::ExecutionsFailed, Some("alpha")), 1);
}

#[tokio::test]
async fn test_status_before_run_and_plan_capture() {
    let repository = MockRepository::new();
    let id = repository.insert(1, &["alpha"], &["SELECT 1"]).await;
    let orchestrator = orchestrator(
        repository,
        vec![MockEngineClient::new("alpha").with_plans().arc()],
        fast_config().with_capture_plans(true),
    );

    let status = orchestrator.get_status(id).await.unwrap();
    assert_eq!(status.status, BenchmarkStatus::Created);
    assert_eq!(status.progress_percent, 0.0);
    assert_eq!(status.total, 0);

    orchestrator.run_to_completion(id).await.unwrap();

    let status = orchestrator.get_status(id).await.unwrap();
    assert_eq!(status.status, BenchmarkStatus::Completed);
    assert_eq!(status.progress_percent, 100.0);
    assert_eq!(
        status.executions[0].query_plan.as_deref(),
        Some("PLAN SELECT 1")
    );
}
