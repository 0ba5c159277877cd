//! Metrics reports exported by world tests as CI artifacts.
//!
//! Reports are plain JSON so regressions in spawn counts or tick cost show up
//! in a diff without special tooling.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

/// Top-level metrics report written by a single test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsReport {
    /// Test identifier
    pub test_name: String,

    /// Timestamp when metrics were collected (ISO 8601)
    pub timestamp: String,

    /// Overall test result
    pub result: TestResult,

    /// World generation metrics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub world: Option<WorldMetrics>,

    /// Mob simulation metrics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobs: Option<MobMetrics>,

    /// Animation and command metrics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub animations: Option<AnimationMetrics>,

    /// Test execution metrics
    pub test_execution: TestExecutionMetrics,
}

/// Test outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestResult {
    /// Test passed
    Pass,
    /// Test failed
    Fail,
    /// Test skipped
    Skip,
}

/// Chunk generation metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldMetrics {
    /// Chunks generated during the run
    pub chunks_generated: usize,

    /// Ticks simulated
    pub ticks: u64,

    /// Average time per tick (microseconds)
    pub avg_tick_time_us: f64,
}

/// Mob simulation metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MobMetrics {
    /// Total mobs spawned
    pub total_spawned: usize,

    /// Mobs alive at end of test
    pub mobs_alive: usize,

    /// Breakdown by mob definition
    #[serde(skip_serializing_if = "Option::is_none")]
    pub by_type: Option<HashMap<String, usize>>,
}

/// Animation engine metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimationMetrics {
    /// Commands executed across the run
    pub commands_executed: usize,

    /// Animations still playing at end of test
    pub animations_active: usize,
}

/// Test execution and infrastructure metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestExecutionMetrics {
    /// Total test duration (seconds)
    pub duration_seconds: f64,

    /// Number of assertions checked
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assertions_checked: Option<usize>,
}

/// Builder for constructing metrics reports
pub struct MetricsReportBuilder {
    report: MetricsReport,
}

impl MetricsReportBuilder {
    /// Create a new builder with test name
    pub fn new(test_name: impl Into<String>) -> Self {
        Self {
            report: MetricsReport {
                test_name: test_name.into(),
                timestamp: chrono::Utc::now().to_rfc3339(),
                result: TestResult::Pass,
                world: None,
                mobs: None,
                animations: None,
                test_execution: TestExecutionMetrics {
                    duration_seconds: 0.0,
                    assertions_checked: None,
                },
            },
        }
    }

    /// Set test result
    pub fn result(mut self, result: TestResult) -> Self {
        self.report.result = result;
        self
    }

    /// Set world metrics
    pub fn world(mut self, metrics: WorldMetrics) -> Self {
        self.report.world = Some(metrics);
        self
    }

    /// Set mob metrics
    pub fn mobs(mut self, metrics: MobMetrics) -> Self {
        self.report.mobs = Some(metrics);
        self
    }

    /// Set animation metrics
    pub fn animations(mut self, metrics: AnimationMetrics) -> Self {
        self.report.animations = Some(metrics);
        self
    }

    /// Set test execution metrics
    pub fn execution(mut self, metrics: TestExecutionMetrics) -> Self {
        self.report.test_execution = metrics;
        self
    }

    /// Build the metrics report
    pub fn build(self) -> MetricsReport {
        self.report
    }
}

/// Sink for writing metrics reports to JSON files
pub struct MetricsSink {
    path: std::path::PathBuf,
}

impl MetricsSink {
    /// Create a new metrics sink at the specified path
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(Self { path })
    }

    /// Write metrics report to file
    pub fn write(&self, report: &MetricsReport) -> Result<()> {
        let json = serde_json::to_string_pretty(report)?;
        let mut file = File::create(&self.path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}
