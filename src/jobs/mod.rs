pub mod queue;
pub mod scheduler;

/// Everything the worker knows how to run. Global kinds are single-flight
/// across processes; per-id kinds are single-flight on `kind:id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobKind {
    FullSweep { force: bool },
    MissingIds,
    PruneDeleted,
    ChangesSync,
    CreateTables,
    AddMovie(i64),
    AddSeries(i64),
    TestWebhook(String),
}

impl JobKind {
    pub fn name(&self) -> &'static str {
        match self {
            JobKind::FullSweep { .. } => "full_sweep",
            JobKind::MissingIds => "missing_ids",
            JobKind::PruneDeleted => "prune_deleted",
            JobKind::ChangesSync => "changes_sync",
            JobKind::CreateTables => "create_tables",
            JobKind::AddMovie(_) => "add_movie",
            JobKind::AddSeries(_) => "add_series",
            JobKind::TestWebhook(_) => "test_webhook",
        }
    }

    /// Queue payload column for this job, if any.
    pub fn payload(&self) -> Option<String> {
        match self {
            JobKind::FullSweep { force } => Some(force.to_string()),
            JobKind::AddMovie(id) | JobKind::AddSeries(id) => Some(id.to_string()),
            JobKind::TestWebhook(message) => Some(message.clone()),
            _ => None,
        }
    }

    /// Parse a dequeued row back into a job. Unknown kinds and malformed
    /// payloads yield None.
    pub fn parse(job_type: &str, payload: Option<&str>) -> Option<JobKind> {
        match job_type {
            "full_sweep" => {
                let force = matches!(payload, Some("true") | Some("True") | Some("1"));
                Some(JobKind::FullSweep { force })
            }
            "missing_ids" => Some(JobKind::MissingIds),
            "prune_deleted" => Some(JobKind::PruneDeleted),
            "changes_sync" => Some(JobKind::ChangesSync),
            "create_tables" => Some(JobKind::CreateTables),
            "add_movie" => payload?.parse().ok().map(JobKind::AddMovie),
            "add_series" => payload?.parse().ok().map(JobKind::AddSeries),
            "test_webhook" => Some(JobKind::TestWebhook(
                payload.unwrap_or("Test webhook message").to_string(),
            )),
            _ => None,
        }
    }

    /// Global jobs hold a process-spanning named lock for their duration.
    pub fn is_global(&self) -> bool {
        matches!(
            self,
            JobKind::FullSweep { .. }
                | JobKind::MissingIds
                | JobKind::PruneDeleted
                | JobKind::ChangesSync
        )
    }

    /// Single-flight key; None means concurrent runs are harmless.
    pub fn lock_key(&self) -> Option<String> {
        match self {
            JobKind::AddMovie(id) => Some(format!("add_movie:{id}")),
            JobKind::AddSeries(id) => Some(format!("add_series:{id}")),
            JobKind::TestWebhook(_) => None,
            _ => Some(self.name().to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_round_trip() {
        let kinds = [
            JobKind::FullSweep { force: true },
            JobKind::FullSweep { force: false },
            JobKind::MissingIds,
            JobKind::PruneDeleted,
            JobKind::ChangesSync,
            JobKind::CreateTables,
            JobKind::AddMovie(603),
            JobKind::AddSeries(1396),
            JobKind::TestWebhook("hello".to_string()),
        ];
        for kind in kinds {
            let payload = kind.payload();
            let parsed = JobKind::parse(kind.name(), payload.as_deref());
            assert_eq!(parsed, Some(kind));
        }
    }

    #[test]
    fn unknown_and_malformed_jobs_are_rejected() {
        assert_eq!(JobKind::parse("resync_everything", None), None);
        assert_eq!(JobKind::parse("add_movie", None), None);
        assert_eq!(JobKind::parse("add_movie", Some("not-a-number")), None);
    }

    #[test]
    fn per_id_jobs_lock_on_kind_and_id() {
        assert_eq!(
            JobKind::AddMovie(603).lock_key().as_deref(),
            Some("add_movie:603")
        );
        assert_eq!(
            JobKind::FullSweep { force: false }.lock_key().as_deref(),
            Some("full_sweep")
        );
        assert_eq!(JobKind::TestWebhook(String::new()).lock_key(), None);
    }

    #[test]
    fn only_the_four_reconciliation_jobs_are_global() {
        assert!(JobKind::FullSweep { force: false }.is_global());
        assert!(JobKind::MissingIds.is_global());
        assert!(JobKind::PruneDeleted.is_global());
        assert!(JobKind::ChangesSync.is_global());
        assert!(!JobKind::CreateTables.is_global());
        assert!(!JobKind::AddMovie(1).is_global());
        assert!(!JobKind::TestWebhook(String::new()).is_global());
    }
}
