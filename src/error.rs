use thiserror::Error;

use crate::tws::messages::error_code;

/// Failures raised while reading tokens off the queue.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    /// The queue ran dry, or hit a message boundary, before the routine finished.
    #[error("{0}")]
    Underrun(String),

    #[error("invalid {kind} token: {token:?}")]
    InvalidNumber { kind: &'static str, token: String },

    #[error("unknown order condition type: {0}")]
    UnknownConditionType(i32),
}

impl DecodeError {
    pub fn is_underrun(&self) -> bool {
        matches!(self, DecodeError::Underrun(_))
    }
}

pub type DecodeResult<T> = Result<T, DecodeError>;

/// Misuse of the connection state machine or a failing transport.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("Cannot connect if already connected.")]
    AlreadyConnected,

    #[error("Cannot disconnect if already disconnected.")]
    NotConnected,

    #[error("Cannot send data when disconnected.")]
    SendWhileDisconnected,

    #[error("Could not connect: {0}")]
    ConnectFailed(String),

    #[error("Failed to send message: {0}")]
    SendFailed(String),
}

impl ControllerError {
    /// Protocol error code reported alongside this error on the error channel.
    pub fn code(&self) -> i32 {
        match self {
            ControllerError::AlreadyConnected => error_code::ALREADY_CONNECTED,
            ControllerError::NotConnected | ControllerError::SendWhileDisconnected => {
                error_code::NOT_CONNECTED
            }
            ControllerError::ConnectFailed(_) => error_code::CONNECT_FAIL,
            ControllerError::SendFailed(_) => error_code::FAIL_SEND,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_underrun_classification() {
        assert!(DecodeError::Underrun("End of message reached.".into()).is_underrun());
        assert!(!DecodeError::UnknownConditionType(9).is_underrun());
    }

    #[test]
    fn test_controller_error_codes() {
        assert_eq!(ControllerError::AlreadyConnected.code(), 501);
        assert_eq!(ControllerError::NotConnected.code(), 504);
        assert_eq!(ControllerError::SendWhileDisconnected.code(), 504);
        assert_eq!(ControllerError::ConnectFailed("refused".into()).code(), 502);
        assert_eq!(ControllerError::SendFailed("broken pipe".into()).code(), 509);
    }

    #[test]
    fn test_display_messages() {
        assert_eq!(
            ControllerError::SendWhileDisconnected.to_string(),
            "Cannot send data when disconnected."
        );
        let err = DecodeError::InvalidNumber { kind: "int", token: "abc".into() };
        assert_eq!(err.to_string(), "invalid int token: \"abc\"");
    }
}
