//! 定义了库中所有可能的错误类型。
//! Defines all possible error types in the library.

use thiserror::Error;

/// Default message carried by a cancellation error when the caller does not
/// supply one.
/// 当调用者未提供消息时，取消错误携带的默认消息。
pub const DEFAULT_CANCEL_MESSAGE: &str = "the operation was cancelled";

/// The primary error type for the long-horizon timer library.
///
/// Scheduling itself is infallible: an out-of-range delay degrades to an
/// unbounded timer that never fires, and clearing a callback-style timer is a
/// silent no-op. The only failure surfaced to callers is cancellation of a
/// suspended delay operation.
///
/// 长时定时器库的主要错误类型。
///
/// 调度本身不会失败：超出范围的延迟会退化为永不触发的无界定时器，
/// 清除回调式定时器则是静默空操作。唯一向调用者暴露的失败是
/// 挂起中的延迟操作被取消。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The operation was cancelled through its cancellation signal before it
    /// could complete.
    /// 操作在完成之前通过其取消信号被取消。
    #[error("{message}")]
    Cancelled {
        /// Human-readable description of the cancellation.
        /// 取消原因的人类可读描述。
        message: String,
    },
}

impl Error {
    /// Creates a cancellation error with the default message.
    /// 使用默认消息创建取消错误。
    pub fn cancelled() -> Self {
        Error::Cancelled {
            message: DEFAULT_CANCEL_MESSAGE.to_string(),
        }
    }

    /// Creates a cancellation error with a caller-supplied message.
    /// 使用调用者提供的消息创建取消错误。
    pub fn cancelled_with(message: impl Into<String>) -> Self {
        Error::Cancelled {
            message: message.into(),
        }
    }

    /// Returns true if this error is the cancellation kind.
    /// 如果此错误是取消类型则返回 true。
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled { .. })
    }
}

/// A specialized `Result` type for this library.
/// 本库专用的 `Result` 类型。
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_message_is_stable() {
        let err = Error::cancelled();
        assert!(err.is_cancelled());
        assert_eq!(err.to_string(), DEFAULT_CANCEL_MESSAGE);
    }

    #[test]
    fn override_message_is_preserved() {
        let err = Error::cancelled_with("shutdown requested");
        assert!(err.is_cancelled());
        assert_eq!(err.to_string(), "shutdown requested");
    }
}
