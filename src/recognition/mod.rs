//! Speech recognition
//!
//! A [`RecognitionEngine`] delivers bounded listening streams and reports
//! what it hears as [`RecognitionEvent`]s on a channel. The
//! [`RecognitionSession`] turns those into a continuous session and feeds
//! final transcripts to the command executor.

mod session;
mod stdin;

use std::fmt;

use tokio::sync::mpsc;

pub use session::{RecognitionSession, SessionControl, SessionPhase};
pub use stdin::StdinRecognitionEngine;

use crate::{Error, Result};

/// Sender half used by engines to report events
pub type EventSender = mpsc::UnboundedSender<RecognitionEvent>;

/// Receiver half consumed by the session
pub type EventReceiver = mpsc::UnboundedReceiver<RecognitionEvent>;

/// Create the channel connecting an engine to its session
#[must_use]
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Something the recognition engine observed
#[derive(Debug, Clone, PartialEq)]
pub enum RecognitionEvent {
    /// The engine began listening
    Started,
    /// Interim or final transcript
    Result {
        transcript: String,
        is_final: bool,
        confidence: f32,
    },
    /// The engine reported an error; usually followed by `Ended`
    Error(RecognitionError),
    /// The listening stream ended
    Ended,
}

/// Error codes reported by a recognition engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionError {
    /// Microphone access refused
    NotAllowed,
    /// Nothing was heard before the stream timed out
    NoSpeech,
    /// Network failure in a remote recognizer
    Network,
    /// The stream was aborted
    Aborted,
    /// Any other engine-specific code
    Other(String),
}

impl RecognitionError {
    /// Parse an engine error code such as `not-allowed`
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code {
            "not-allowed" | "service-not-allowed" => Self::NotAllowed,
            "no-speech" => Self::NoSpeech,
            "network" => Self::Network,
            "aborted" => Self::Aborted,
            other => Self::Other(other.to_string()),
        }
    }

    /// Engine error code
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::NotAllowed => "not-allowed",
            Self::NoSpeech => "no-speech",
            Self::Network => "network",
            Self::Aborted => "aborted",
            Self::Other(code) => code,
        }
    }
}

impl fmt::Display for RecognitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl From<RecognitionError> for Error {
    fn from(e: RecognitionError) -> Self {
        match e {
            RecognitionError::NotAllowed => Self::PermissionDenied,
            other => Self::Recognition(other.code().to_string()),
        }
    }
}

/// Speech-to-text backend
///
/// `start` and `stop` only request a change; the engine confirms through
/// [`RecognitionEvent::Started`] and [`RecognitionEvent::Ended`].
pub trait RecognitionEngine: Send + Sync {
    /// Whether recognition is available in this runtime
    fn is_supported(&self) -> bool {
        true
    }

    /// Begin a listening stream
    ///
    /// # Errors
    ///
    /// Returns error if the engine cannot start listening
    fn start(&self) -> Result<()>;

    /// End the current listening stream
    ///
    /// # Errors
    ///
    /// Returns error if the engine fails to stop
    fn stop(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(RecognitionError::from_code("not-allowed"), RecognitionError::NotAllowed);
        assert_eq!(RecognitionError::from_code("no-speech").code(), "no-speech");
        assert_eq!(
            RecognitionError::from_code("audio-capture"),
            RecognitionError::Other("audio-capture".to_string())
        );
        assert_eq!(RecognitionError::Network.to_string(), "network");
    }

    #[test]
    fn test_into_error() {
        assert!(matches!(
            Error::from(RecognitionError::NotAllowed),
            Error::PermissionDenied
        ));
        assert!(matches!(
            Error::from(RecognitionError::Aborted),
            Error::Recognition(code) if code == "aborted"
        ));
    }
}
