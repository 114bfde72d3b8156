#![forbid(unsafe_code)]

/// Events emitted by launched application processes.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessEvent {
    /// A launched process exited.
    ///
    /// `exit_code` is `None` when the process was terminated by a signal.
    Exited {
        project_id: String,
        exit_code: Option<i32>,
    },
}
