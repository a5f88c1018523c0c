use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Command accepted by `PUT /jobs/{id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobCommand {
    Start,
    Pause,
    Resume,
    Empty,
    ClearFailed,
}

impl JobCommand {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Empty => "empty",
            Self::ClearFailed => "clear-failed",
        }
    }
}

impl fmt::Display for JobCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobCommand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(Self::Start),
            "pause" => Ok(Self::Pause),
            "resume" => Ok(Self::Resume),
            "empty" => Ok(Self::Empty),
            "clear-failed" => Ok(Self::ClearFailed),
            other => Err(format!("unknown job command: {other}")),
        }
    }
}

/// Manual job accepted by `POST /jobs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobName {
    PersonCleanup,
    TagCleanup,
    UserCleanup,
}

impl JobName {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PersonCleanup => "person-cleanup",
            Self::TagCleanup => "tag-cleanup",
            Self::UserCleanup => "user-cleanup",
        }
    }
}

impl fmt::Display for JobName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "person-cleanup" => Ok(Self::PersonCleanup),
            "tag-cleanup" => Ok(Self::TagCleanup),
            "user-cleanup" => Ok(Self::UserCleanup),
            other => Err(format!("unknown job name: {other}")),
        }
    }
}

/// Body of `PUT /jobs/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCommandRequest {
    pub command: JobCommand,
    #[serde(default)]
    pub force: bool,
}

/// Body of `POST /jobs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateJobRequest {
    pub name: JobName,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobCounts {
    pub active: u64,
    pub completed: u64,
    pub failed: u64,
    pub delayed: u64,
    pub waiting: u64,
    pub paused: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QueueStatus {
    pub is_active: bool,
    pub is_paused: bool,
}

/// State of one job queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JobStatus {
    pub job_counts: JobCounts,
    pub queue_status: QueueStatus,
}

/// Response of `GET /jobs`, keyed by queue name (`thumbnailGeneration`, ...).
pub type AllJobStatus = BTreeMap<String, JobStatus>;
