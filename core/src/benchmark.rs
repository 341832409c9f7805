//! Benchmark and query definitions

use serde::{Deserialize, Serialize};

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }
    };
}

numeric_id!(
    /// Unique benchmark identifier
    BenchmarkId
);
numeric_id!(
    /// Unique query identifier
    QueryId
);
numeric_id!(
    /// Unique query execution identifier
    ExecutionId
);
numeric_id!(
    /// Unique aggregated result identifier
    ResultId
);

/// Storage layout of the benchmarked tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableFormat {
    /// Hive tables (directory layout + metastore)
    Hive,
    /// Apache Iceberg tables
    Iceberg,
}

impl std::fmt::Display for TableFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableFormat::Hive => write!(f, "hive"),
            TableFormat::Iceberg => write!(f, "iceberg"),
        }
    }
}

impl std::str::FromStr for TableFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hive" => Ok(TableFormat::Hive),
            "iceberg" => Ok(TableFormat::Iceberg),
            _ => Err(format!("Unknown table format: {}", s)),
        }
    }
}

/// Relative size of the benchmark dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetSize {
    /// Small dataset
    Small,
    /// Medium dataset
    Medium,
    /// Large dataset
    Large,
}

/// Lifecycle of a benchmark
///
/// Transitions are monotonic: `created -> running -> {completed, failed}`.
/// A benchmark that fails before dispatch may also go `created -> failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BenchmarkStatus {
    /// Defined but never run
    Created,
    /// Executions are being dispatched
    Running,
    /// Every engine's result has been produced
    Completed,
    /// The run aborted on an orchestration-level fault
    Failed,
}

impl BenchmarkStatus {
    /// Whether this status is final
    pub fn is_terminal(&self) -> bool {
        matches!(self, BenchmarkStatus::Completed | BenchmarkStatus::Failed)
    }

    /// Whether moving from `self` to `next` keeps the status monotonic
    pub fn can_transition_to(&self, next: BenchmarkStatus) -> bool {
        use BenchmarkStatus::*;
        matches!(
            (self, next),
            (Created, Running) | (Created, Failed) | (Running, Completed) | (Running, Failed)
        )
    }
}

impl std::fmt::Display for BenchmarkStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BenchmarkStatus::Created => write!(f, "created"),
            BenchmarkStatus::Running => write!(f, "running"),
            BenchmarkStatus::Completed => write!(f, "completed"),
            BenchmarkStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Shape of a benchmark query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    /// Plain projection/filter
    Select,
    /// Group-by / aggregate functions
    Aggregation,
    /// Multi-table join
    Join,
    /// Window functions
    Window,
}

/// Rough complexity class of a benchmark query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    /// Single table, few operators
    Simple,
    /// A handful of operators or a small join
    Medium,
    /// Deep plans, several joins or windows
    Complex,
}

/// A SQL query owned by a benchmark
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    /// Query identifier
    pub id: QueryId,
    /// Owning benchmark (lookup only)
    pub benchmark_id: BenchmarkId,
    /// Display name
    pub name: String,
    /// SQL text sent to every engine
    pub sql: String,
    /// Query classification
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_type: Option<QueryType>,
    /// Complexity classification
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complexity: Option<Complexity>,
}

/// A named run of a query set across engines and a table format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Benchmark {
    /// Benchmark identifier
    pub id: BenchmarkId,
    /// Display name
    pub name: String,
    /// Free-form description
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Table format under test
    pub table_format: TableFormat,
    /// Dataset the queries run against
    pub dataset_name: String,
    /// Dataset size class
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset_size: Option<DatasetSize>,
    /// Names of the engines selected for this benchmark
    pub engines: Vec<String>,
    /// Current lifecycle status
    pub status: BenchmarkStatus,
    /// Creation time
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// Last status change
    pub updated_at: chrono::DateTime<chrono::Utc>,
    /// Queries owned by this benchmark
    #[serde(default)]
    pub queries: Vec<Query>,
}

impl Benchmark {
    /// Selected engine names with duplicates removed, in selection order
    pub fn selected_engines(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        self.engines
            .iter()
            .map(String::as_str)
            .filter(|name| seen.insert(*name))
            .collect()
    }
}

/// Input for creating a benchmark in a repository
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBenchmark {
    /// Display name
    pub name: String,
    /// Free-form description
    #[serde(default)]
    pub description: String,
    /// Table format under test
    pub table_format: TableFormat,
    /// Dataset the queries run against
    pub dataset_name: String,
    /// Dataset size class
    #[serde(default)]
    pub dataset_size: Option<DatasetSize>,
    /// Names of the engines to run against
    pub engines: Vec<String>,
    /// Queries to benchmark
    #[serde(default)]
    pub queries: Vec<NewQuery>,
}

/// Input for creating a query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewQuery {
    /// Display name
    pub name: String,
    /// SQL text
    pub sql: String,
    /// Query classification
    #[serde(default)]
    pub query_type: Option<QueryType>,
    /// Complexity classification
    #[serde(default)]
    pub complexity: Option<Complexity>,
}

impl NewBenchmark {
    /// Validate the definition before it is stored
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("benchmark name must not be empty".into());
        }
        if self.dataset_name.trim().is_empty() {
            return Err("dataset name must not be empty".into());
        }
        if self.engines.is_empty() {
            return Err("at least one engine must be selected".into());
        }
        if let Some(query) = self.queries.iter().find(|q| q.sql.trim().is_empty()) {
            return Err(format!("query '{}' has empty SQL", query.name));
        }
        Ok(())
    }
}
