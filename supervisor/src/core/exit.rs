//! Classification of worker exits, used only for logging

use std::fmt;
use std::process::ExitStatus;

/// Why a worker process ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitReason {
    /// Terminated by a signal (name when known, number otherwise)
    Signal(String),
    /// Exited with a non-zero code
    Code(i32),
    /// Exited with code zero
    Clean,
    /// The exit status could not be collected
    Unknown(String),
}

impl ExitReason {
    /// Classify from the raw parts of an exit status; a signal wins over a code
    pub fn from_parts(code: Option<i32>, signal: Option<i32>) -> Self {
        if let Some(signal) = signal {
            return ExitReason::Signal(signal_name(signal));
        }
        match code {
            Some(0) => ExitReason::Clean,
            Some(code) => ExitReason::Code(code),
            None => ExitReason::Unknown("no exit code".to_string()),
        }
    }

    pub fn from_status(status: ExitStatus) -> Self {
        #[cfg(unix)]
        let signal = std::os::unix::process::ExitStatusExt::signal(&status);
        #[cfg(not(unix))]
        let signal = None;

        Self::from_parts(status.code(), signal)
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::Signal(signal) => write!(f, "Worker was killed by signal: {signal}"),
            ExitReason::Code(code) => write!(f, "Worker exited with error code: {code}"),
            ExitReason::Clean => write!(f, "Worker exited successfully"),
            ExitReason::Unknown(detail) => write!(f, "Worker exit status unavailable: {detail}"),
        }
    }
}

#[cfg(unix)]
fn signal_name(signal: i32) -> String {
    nix::sys::signal::Signal::try_from(signal)
        .map(|s| s.as_str().to_string())
        .unwrap_or_else(|_| signal.to_string())
}

#[cfg(not(unix))]
fn signal_name(signal: i32) -> String {
    signal.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert_eq!(ExitReason::from_parts(Some(0), None), ExitReason::Clean);
        assert_eq!(ExitReason::from_parts(Some(1), None), ExitReason::Code(1));
        assert!(matches!(ExitReason::from_parts(None, Some(9)), ExitReason::Signal(_)));
        assert!(matches!(ExitReason::from_parts(None, None), ExitReason::Unknown(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_signal_names() {
        assert_eq!(ExitReason::from_parts(None, Some(9)), ExitReason::Signal("SIGKILL".to_string()));
        assert_eq!(ExitReason::from_parts(None, Some(15)), ExitReason::Signal("SIGTERM".to_string()));
    }

    #[test]
    fn test_display() {
        assert_eq!(ExitReason::Code(3).to_string(), "Worker exited with error code: 3");
        assert_eq!(ExitReason::Clean.to_string(), "Worker exited successfully");
        assert_eq!(
            ExitReason::Signal("SIGKILL".to_string()).to_string(),
            "Worker was killed by signal: SIGKILL"
        );
    }
}
