use chrono::NaiveDate;
use core_types::{Instrument, PortfolioKind};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    #[serde(default)]
    pub selection: SelectionPolicy,
    #[serde(default)]
    pub dates: DateSettings,
    #[serde(default)]
    pub table: TableSettings,
    #[serde(default)]
    pub orchestrator: OrchestratorSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// The instruments offered as candidates for the working set.
    #[serde(default)]
    pub catalog: Vec<Instrument>,
}

/// Where the analysis service lives and how long a single call may take.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Base URL of the analysis service, e.g. "http://127.0.0.1:5000".
    pub base_url: String,
    /// Upper bound for a single remote call. A call that exceeds it is failed.
    #[serde(with = "humantime_serde", default = "default_call_timeout")]
    pub call_timeout: Duration,
}

/// Cardinality bounds for the working set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SelectionPolicy {
    /// Fewest instruments an optimization may run with.
    pub min_instruments: usize,
    /// Most instruments the working set may hold. `None` means unbounded.
    #[serde(default)]
    pub max_instruments: Option<usize>,
}

/// Temporal policy for the analysis window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct DateSettings {
    /// The window must cover at least this many calendar months.
    pub minimum_span_months: u32,
    /// Earliest start date the service has data for.
    #[serde(default)]
    pub earliest_date: Option<NaiveDate>,
}

/// Layout of the multi-portfolio table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TableSettings {
    /// Row order. Kinds left out here are never shown.
    pub rows: Vec<PortfolioKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct OrchestratorSettings {
    /// Issue the cumulative-chart call only after the baseline call has finished.
    pub sequence_cumulative_after_baseline: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG` when set.
    pub level: String,
    /// When set, logs are also written to a daily-rolling file in this directory.
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

// --- Default Implementations ---
// These allow a user to omit whole sections from their toml and still get
// the canonical policy: 4 to 10 instruments, a 3-month minimum window and
// data from 2009 onwards.

fn default_call_timeout() -> Duration {
    Duration::from_secs(30)
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self {
            min_instruments: 4,
            max_instruments: Some(10),
        }
    }
}

impl Default for DateSettings {
    fn default() -> Self {
        Self {
            minimum_span_months: 3,
            earliest_date: NaiveDate::from_ymd_opt(2009, 1, 1),
        }
    }
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            rows: PortfolioKind::ALL.to_vec(),
        }
    }
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            sequence_cumulative_after_baseline: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}
