//! 错误类型定义
//!
//! 提供 xattr 操作的错误类型。

use core::fmt;

/// xattr 操作错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    kind: ErrorKind,
    message: &'static str,
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// I/O 错误（块读写失败）
    Io,
    /// 无效参数
    InvalidInput,
    /// 磁盘记录损坏
    Corrupted,
    /// 属性不存在
    NotFound,
    /// 属性已存在
    AlreadyExists,
    /// 空间或内存不足
    NoSpace,
    /// 目标缓冲区太小
    RangeTooSmall,
    /// 值超过允许的最大长度
    TooLarge,
    /// 资源忙（例如嵌套事务）
    Busy,
    /// 无效状态（例如不在事务中）
    InvalidState,
    /// 不支持的操作
    Unsupported,
}

impl Error {
    /// 创建新错误
    pub const fn new(kind: ErrorKind, message: &'static str) -> Self {
        Self { kind, message }
    }

    /// 创建带原因的错误（简化版，忽略 cause）
    ///
    /// 注意：在 no_std 环境下，cause 参数会被忽略
    pub fn with_cause(kind: ErrorKind, message: &'static str, _cause: impl core::fmt::Debug) -> Self {
        Self { kind, message }
    }

    /// 获取错误类型
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// 获取错误消息
    pub const fn message(&self) -> &'static str {
        self.message
    }

    /// 是否为磁盘损坏错误
    pub const fn is_corrupted(&self) -> bool {
        matches!(self.kind, ErrorKind::Corrupted)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result 类型别名
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_display() {
        let err = Error::new(ErrorKind::RangeTooSmall, "xattr won't fit in the buffer");
        assert_eq!(err.to_string(), "RangeTooSmall: xattr won't fit in the buffer");
    }

    #[test]
    fn test_with_cause_keeps_kind() {
        let cause = Error::new(ErrorKind::Io, "read failed");
        let err = Error::with_cause(ErrorKind::Corrupted, "bad record", cause);
        assert!(err.is_corrupted());
        assert_eq!(err.message(), "bad record");
    }
}
