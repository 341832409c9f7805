//! Execution plan construction

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::benchmark::{Benchmark, ExecutionId};
use crate::execution::QueryExecution;
use crate::worker::PlannedExecution;

/// One execution per (query, live engine)
#[derive(Debug)]
pub(crate) struct ExecutionPlan {
    /// Pending executions to register, engine-major in query order
    pub executions: Vec<QueryExecution>,
    /// Work list per engine, in the order engines were selected
    pub per_engine: Vec<(String, Arc<[PlannedExecution]>)>,
}

impl ExecutionPlan {
    /// Plan every query of `benchmark` on every engine in `engines`
    pub fn build(benchmark: &Benchmark, engines: &[String], next_id: &AtomicU64) -> Self {
        let mut executions = Vec::with_capacity(benchmark.queries.len() * engines.len());
        let mut per_engine = Vec::with_capacity(engines.len());

        for engine in engines {
            let work: Vec<PlannedExecution> = benchmark
                .queries
                .iter()
                .map(|query| {
                    let id = ExecutionId(next_id.fetch_add(1, Ordering::SeqCst));
                    executions.push(QueryExecution::pending(
                        id,
                        benchmark.id,
                        query.id,
                        engine.as_str(),
                    ));
                    PlannedExecution {
                        execution_id: id,
                        query_id: query.id,
                        query_name: query.name.clone(),
                        sql: Arc::from(query.sql.as_str()),
                    }
                })
                .collect();
            per_engine.push((engine.clone(), Arc::from(work)));
        }

        Self {
            executions,
            per_engine,
        }
    }

    /// Number of planned executions
    pub fn len(&self) -> usize {
        self.executions.len()
    }
}
