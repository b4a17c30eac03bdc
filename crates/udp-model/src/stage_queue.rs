use crate::job::JobId;

/// A row in `stage_arrival_queue`: a bundle ready for staging.
#[derive(Debug, Clone, PartialEq)]
pub struct StageArrivalRow {
    pub archive_file_name: String,
    pub job_id: JobId,
}

/// A row in `stage_pending_queue`: the next expected bundle for a namespace.
#[derive(Debug, Clone, PartialEq)]
pub struct StagePendingRow {
    pub archive_file_name: String,
}
