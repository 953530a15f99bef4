//! Validation monitoring: JSONL append log with threshold alerts.
//!
//! Every emitted summary becomes one JSON object per line. Alerts are raised
//! when a summary's PBO, DSR or net Sharpe crosses the configured alert
//! thresholds; they are logged at `warn` and returned to the caller. A write
//! failure is logged and reported as `logged: false`, never propagated into
//! the validation result.

use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use scorelab_core::domain::{GateMode, GateStatus, StrategyKind};

use crate::config::MonitorConfig;
use crate::gate::GateThresholds;
use crate::walk_forward::{MonitoringOutcome, ProtocolEcho, ValidationMetrics, ValidationSummary};

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("monitor log I/O on {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("monitor record serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertThresholds {
    pub max_pbo: f64,
    pub min_dsr: f64,
    pub min_net_sharpe: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        MonitorConfig::default().alerts()
    }
}

/// Alert tokens such as `pbo>0.30`, in PBO, DSR, Sharpe order.
pub fn build_alerts(metrics: &ValidationMetrics, thresholds: &AlertThresholds) -> Vec<String> {
    let mut alerts = Vec::new();
    if metrics.pbo > thresholds.max_pbo {
        alerts.push(format!("pbo>{:.2}", thresholds.max_pbo));
    }
    if metrics.dsr < thresholds.min_dsr {
        alerts.push(format!("dsr<{:.2}", thresholds.min_dsr));
    }
    if metrics.net_sharpe < thresholds.min_net_sharpe {
        alerts.push(format!("netSharpe<{:.2}", thresholds.min_net_sharpe));
    }
    alerts
}

/// One line of the monitoring log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorRecord {
    pub logged_at_utc: String,
    pub strategy: StrategyKind,
    pub as_of_date: NaiveDate,
    pub mode: GateMode,
    pub gate_status: GateStatus,
    pub gate_passed: bool,
    pub insufficient_data: bool,
    pub protocol: ProtocolEcho,
    pub thresholds: GateThresholds,
    pub metrics: ValidationMetrics,
    pub alerts: Vec<String>,
}

impl MonitorRecord {
    fn from_summary(summary: &ValidationSummary, alerts: Vec<String>) -> Self {
        Self {
            logged_at_utc: Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            strategy: summary.strategy,
            as_of_date: summary.as_of_date,
            mode: summary.mode,
            gate_status: summary.gate_status,
            gate_passed: summary.gate_passed,
            insufficient_data: summary.insufficient_data,
            protocol: summary.protocol.clone(),
            thresholds: summary.thresholds,
            metrics: summary.metrics,
            alerts,
        }
    }
}

/// Append-only JSONL monitoring log.
#[derive(Debug, Clone)]
pub struct MonitorLog {
    path: PathBuf,
    alerts: AlertThresholds,
}

impl MonitorLog {
    pub fn new(path: PathBuf, alerts: AlertThresholds) -> Self {
        Self { path, alerts }
    }

    /// `None` when monitoring is disabled.
    pub fn from_config(config: &MonitorConfig) -> Option<Self> {
        config
            .enabled
            .then(|| Self::new(config.log_path.clone(), config.alerts()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record for `summary`; returns its alerts.
    pub fn append(&self, summary: &ValidationSummary) -> Result<Vec<String>, MonitorError> {
        let alerts = build_alerts(&summary.metrics, &self.alerts);
        let record = MonitorRecord::from_summary(summary, alerts.clone());
        let json = serde_json::to_string(&record)?;

        let io_err = |source: io::Error| MonitorError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(io_err)?;
        writeln!(file, "{json}").map_err(io_err)?;
        file.flush().map_err(io_err)?;
        Ok(alerts)
    }

    /// Append and fold the result into the summary's monitoring block.
    pub fn emit(&self, summary: &ValidationSummary) -> MonitoringOutcome {
        match self.append(summary) {
            Ok(alerts) => {
                if !alerts.is_empty() {
                    warn!(
                        strategy = %summary.strategy,
                        as_of = %summary.as_of_date,
                        alerts = %alerts.join(","),
                        "validation monitor alert"
                    );
                }
                MonitoringOutcome {
                    logged: true,
                    alerts,
                }
            }
            Err(e) => {
                warn!(error = %e, "validation monitor write failed");
                MonitoringOutcome {
                    logged: false,
                    alerts: build_alerts(&summary.metrics, &self.alerts),
                }
            }
        }
    }

    /// All records in the log. Malformed lines are skipped.
    pub fn read_all(&self) -> Result<Vec<MonitorRecord>, MonitorError> {
        let file = match fs::File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(MonitorError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        let mut records = Vec::new();
        for line in io::BufReader::new(file).lines() {
            let line = line.map_err(|source| MonitorError::Io {
                path: self.path.clone(),
                source,
            })?;
            if line.trim().is_empty() {
                continue;
            }
            if let Ok(record) = serde_json::from_str::<MonitorRecord>(&line) {
                records.push(record);
            }
        }
        Ok(records)
    }
}
