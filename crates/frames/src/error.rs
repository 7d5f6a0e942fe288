//! Frame stack contract violations.
//!
//! These are programming errors in an adapter, not recoverable runtime conditions.
//! The stack refuses the operation and leaves its state untouched so that a single
//! bad call cannot shift attribution for every later operation.

use core_types::FrameId;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameError {
    /// The frame is not (or no longer) part of the forest.
    UnknownFrame(FrameId),
    /// Ending a frame that is not the current one.
    NotCurrent {
        frame: FrameId,
        current: Option<FrameId>,
    },
    /// Ending or attributing to a frame that has already ended.
    AlreadyEnded(FrameId),
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::UnknownFrame(id) => write!(f, "unknown frame {id}"),
            FrameError::NotCurrent { frame, current } => match current {
                Some(current) => write!(f, "frame {frame} is not current (current is {current})"),
                None => write!(f, "frame {frame} is not current (no frame is open)"),
            },
            FrameError::AlreadyEnded(id) => write!(f, "frame {id} has already ended"),
        }
    }
}

impl std::error::Error for FrameError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_not_current() {
        let err = FrameError::NotCurrent {
            frame: FrameId(2),
            current: Some(FrameId(5)),
        };
        assert_eq!(err.to_string(), "frame f2 is not current (current is f5)");
        let err = FrameError::NotCurrent {
            frame: FrameId(2),
            current: None,
        };
        assert_eq!(err.to_string(), "frame f2 is not current (no frame is open)");
    }

    #[test]
    fn display_already_ended() {
        assert_eq!(
            FrameError::AlreadyEnded(FrameId(1)).to_string(),
            "frame f1 has already ended"
        );
    }
}
