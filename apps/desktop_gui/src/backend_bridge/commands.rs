//! Backend commands queued from UI to backend worker.

/// Commands the UI queues to the backend worker.
///
/// `generation` is the submission token issued by the session; every event
/// the worker emits for this command carries it back.
pub enum BackendCommand {
    ProcessPrompt { generation: u64, text: String },
}
