//! Job tracking for background work such as reservation imports.
//!
//! Jobs live in memory only. Each job belongs to the tenant that started it
//! and is invisible to every other tenant. Finished jobs are dropped once
//! they have been done for longer than the tracker's TTL.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::TenantId;

/// A single log entry with timestamp and message.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LogEntry {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub level: LogLevel,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub job_id: String,
    pub tenant_id: TenantId,
    /// What the job does, e.g. `reservation-import`.
    pub kind: String,
    pub status: JobStatus,
    pub logs: Vec<LogEntry>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub result: Option<serde_json::Value>,
}

/// Seconds a completed or failed job stays readable.
pub const FINISHED_JOB_TTL_SECS: i64 = 3600;

#[derive(Clone)]
pub struct JobTracker {
    jobs: Arc<RwLock<HashMap<String, Job>>>,
    ttl: chrono::Duration,
}

impl JobTracker {
    pub fn new() -> Self {
        Self::with_ttl(chrono::Duration::seconds(FINISHED_JOB_TTL_SECS))
    }

    pub fn with_ttl(ttl: chrono::Duration) -> Self {
        Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Drop finished jobs older than the TTL. Running jobs are never evicted.
    pub fn evict_expired(&self) -> usize {
        let cutoff = chrono::Utc::now() - self.ttl;
        let mut jobs = self.jobs.write();
        let before = jobs.len();
        jobs.retain(|_, job| job.completed_at.is_none_or(|done| done > cutoff));
        let evicted = before - jobs.len();
        if evicted > 0 {
            log::debug!("Evicted {} finished jobs", evicted);
        }
        evicted
    }

    /// Register a running job for `tenant_id` and return its id.
    pub fn create_job(&self, tenant_id: TenantId, kind: impl Into<String>) -> String {
        self.evict_expired();
        let job_id = Uuid::new_v4().to_string();
        let job = Job {
            job_id: job_id.clone(),
            tenant_id,
            kind: kind.into(),
            status: JobStatus::Running,
            logs: vec![],
            created_at: chrono::Utc::now(),
            completed_at: None,
            result: None,
        };
        self.jobs.write().insert(job_id.clone(), job);
        job_id
    }

    pub fn log(&self, job_id: &str, level: LogLevel, message: impl Into<String>) {
        let mut jobs = self.jobs.write();
        if let Some(job) = jobs.get_mut(job_id) {
            job.logs.push(LogEntry {
                timestamp: chrono::Utc::now(),
                level,
                message: message.into(),
            });
        }
    }

    pub fn complete_job(&self, job_id: &str, result: Option<serde_json::Value>) {
        let mut jobs = self.jobs.write();
        if let Some(job) = jobs.get_mut(job_id) {
            job.status = JobStatus::Completed;
            job.completed_at = Some(chrono::Utc::now());
            job.result = result;
        }
    }

    pub fn fail_job(&self, job_id: &str, error_message: impl Into<String>) {
        let mut jobs = self.jobs.write();
        if let Some(job) = jobs.get_mut(job_id) {
            job.status = JobStatus::Failed;
            job.completed_at = Some(chrono::Utc::now());
            job.logs.push(LogEntry {
                timestamp: chrono::Utc::now(),
                level: LogLevel::Error,
                message: error_message.into(),
            });
        }
    }

    /// The job, if it exists and belongs to `tenant_id`.
    pub fn get_job(&self, tenant_id: TenantId, job_id: &str) -> Option<Job> {
        self.jobs
            .read()
            .get(job_id)
            .filter(|job| job.tenant_id == tenant_id)
            .cloned()
    }

    /// Log entries from index `from` on, plus the job status at read time.
    pub fn logs_since(&self, job_id: &str, from: usize) -> Option<(Vec<LogEntry>, JobStatus)> {
        self.jobs.read().get(job_id).map(|job| {
            (
                job.logs.iter().skip(from).cloned().collect(),
                job.status,
            )
        })
    }
}

impl Default for JobTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_lifecycle() {
        let tracker = JobTracker::new();
        let tenant = TenantId::generate();
        let id = tracker.create_job(tenant, "reservation-import");

        tracker.log(&id, LogLevel::Info, "started");
        tracker.complete_job(&id, Some(serde_json::json!({"created": 2})));

        let job = tracker.get_job(tenant, &id).unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.logs.len(), 1);
        assert!(job.completed_at.is_some());
    }

    #[test]
    fn test_finished_jobs_expire() {
        let tracker = JobTracker::with_ttl(chrono::Duration::zero());
        let tenant = TenantId::generate();
        let done = tracker.create_job(tenant, "reservation-import");
        let failed = tracker.create_job(tenant, "reservation-import");
        let running = tracker.create_job(tenant, "reservation-import");
        tracker.complete_job(&done, None);
        tracker.fail_job(&failed, "boom");

        let next = tracker.create_job(tenant, "reservation-import");
        assert!(tracker.get_job(tenant, &done).is_none());
        assert!(tracker.get_job(tenant, &failed).is_none());
        assert!(tracker.get_job(tenant, &running).is_some());
        assert!(tracker.get_job(tenant, &next).is_some());
        assert_eq!(tracker.evict_expired(), 0);
    }

    #[test]
    fn test_recent_jobs_survive_eviction() {
        let tracker = JobTracker::new();
        let tenant = TenantId::generate();
        let id = tracker.create_job(tenant, "reservation-import");
        tracker.complete_job(&id, None);
        assert_eq!(tracker.evict_expired(), 0);
        assert!(tracker.get_job(tenant, &id).is_some());
    }

    #[test]
    fn test_jobs_are_tenant_private() {
        let tracker = JobTracker::new();
        let owner = TenantId::generate();
        let id = tracker.create_job(owner, "reservation-import");
        assert!(tracker.get_job(TenantId::generate(), &id).is_none());
        assert!(tracker.get_job(owner, &id).is_some());
    }

    #[test]
    fn test_logs_since_skips_seen_entries() {
        let tracker = JobTracker::new();
        let id = tracker.create_job(TenantId::generate(), "reservation-import");
        tracker.log(&id, LogLevel::Info, "one");
        tracker.log(&id, LogLevel::Warning, "two");
        tracker.fail_job(&id, "boom");

        let (logs, status) = tracker.logs_since(&id, 1).unwrap();
        assert_eq!(status, JobStatus::Failed);
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].message, "two");
        assert_eq!(logs[1].level, LogLevel::Error);
        assert!(tracker.logs_since("missing", 0).is_none());
    }
}
