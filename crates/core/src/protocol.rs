use crate::manifest::DownloadStatus;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DownloadEvent {
    /// A new progress value for `model`, never a repeat of the previous one
    Progress { model: String, progress: f64 },
    /// The poller reached a terminal state. Always the last event of a poller.
    Finished {
        model: String,
        outcome: DownloadOutcome,
    },
}

impl DownloadEvent {
    pub fn model(&self) -> &str {
        match self {
            DownloadEvent::Progress { model, .. } | DownloadEvent::Finished { model, .. } => model,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DownloadOutcome {
    /// The backend flagged the download complete
    Completed(DownloadStatus),
    /// The backend refused the download or reported an error for it
    Failed(FailureReason),
    /// No completion before the deadline
    TimedOut {
        after: Duration,
        last_progress: Option<f64>,
    },
    /// Stopped by the caller
    Cancelled,
}

impl DownloadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, DownloadOutcome::Completed(_))
    }

    /// Failed or timed out. Cancellation is neither a success nor a failure.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            DownloadOutcome::Failed(_) | DownloadOutcome::TimedOut { .. }
        )
    }
}

impl fmt::Display for DownloadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadOutcome::Completed(_) => write!(f, "completed"),
            DownloadOutcome::Failed(reason) => write!(f, "failed: {}", reason),
            DownloadOutcome::TimedOut { after, .. } => {
                write!(f, "timed out after {}s", after.as_secs())
            }
            DownloadOutcome::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    /// The start-download call itself failed
    Rejected(String),
    /// The backend reported an error while the download was running
    Remote(String),
    /// Another poller already owns this model name
    AlreadyActive,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Rejected(msg) => write!(f, "download request rejected ({})", msg),
            FailureReason::Remote(msg) => write!(f, "{}", msg),
            FailureReason::AlreadyActive => write!(f, "a download for this model is already running"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BatchEvent {
    /// A member's progress changed; `overall` is the mean across all members
    Progress {
        model: String,
        progress: f64,
        overall: f64,
    },
    MemberFinished {
        model: String,
        outcome: DownloadOutcome,
    },
    /// Every member is terminal
    Finished(BatchReport),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberOutcome {
    pub model: String,
    pub outcome: DownloadOutcome,
}

/// Final word on a batch, one entry per member in input order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub outcomes: Vec<MemberOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> Vec<&str> {
        self.names_where(DownloadOutcome::is_success)
    }

    pub fn failed(&self) -> Vec<&str> {
        self.names_where(DownloadOutcome::is_failure)
    }

    pub fn cancelled(&self) -> Vec<&str> {
        self.names_where(|o| matches!(o, DownloadOutcome::Cancelled))
    }

    pub fn outcome(&self, model: &str) -> Option<&DownloadOutcome> {
        self.outcomes
            .iter()
            .find(|m| m.model == model)
            .map(|m| &m.outcome)
    }

    /// True only when every member completed.
    pub fn is_success(&self) -> bool {
        !self.outcomes.is_empty() && self.outcomes.iter().all(|m| m.outcome.is_success())
    }

    fn names_where(&self, pred: impl Fn(&DownloadOutcome) -> bool) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|m| pred(&m.outcome))
            .map(|m| m.model.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(model: &str, outcome: DownloadOutcome) -> MemberOutcome {
        MemberOutcome {
            model: model.to_string(),
            outcome,
        }
    }

    #[test]
    fn report_partitions_members() {
        let report = BatchReport {
            outcomes: vec![
                member(
                    "a",
                    DownloadOutcome::TimedOut {
                        after: Duration::from_secs(1),
                        last_progress: Some(40.0),
                    },
                ),
                member("b", DownloadOutcome::Cancelled),
                member("c", DownloadOutcome::Failed(FailureReason::AlreadyActive)),
            ],
        };

        assert_eq!(report.failed(), vec!["a", "c"]);
        assert_eq!(report.cancelled(), vec!["b"]);
        assert!(report.succeeded().is_empty());
        assert!(!report.is_success());
        assert_eq!(report.outcome("b"), Some(&DownloadOutcome::Cancelled));
    }

    #[test]
    fn empty_report_is_not_a_success() {
        assert!(!BatchReport::default().is_success());
    }
}
