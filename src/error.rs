//! 错误类型定义
//!
//! 提供闪存块设备操作的错误类型。

use crate::flash::IapStatus;
use core::fmt;

/// 块设备操作错误
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Error {
    kind: ErrorKind,
    message: &'static str,
    status: Option<IapStatus>,
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// 无效参数（缓冲区长度、配置）
    InvalidInput,
    /// 逻辑块无法映射到任何闪存区域
    InvalidBlock,
    /// 读取闪存失败（不改变闪存内容）
    Io,
    /// 擦除 / 编程原语返回了非成功状态
    Flash,
    /// 编程后比较不一致
    VerifyFailed,
    /// 等待闪存控制器超时
    Timeout,
    /// 设备已因先前的致命错误失效
    DeviceFailed,
}

impl Error {
    /// 创建新错误
    pub const fn new(kind: ErrorKind, message: &'static str) -> Self {
        Self {
            kind,
            message,
            status: None,
        }
    }

    /// 创建携带闪存状态码的错误
    pub const fn with_status(kind: ErrorKind, message: &'static str, status: IapStatus) -> Self {
        Self {
            kind,
            message,
            status: Some(status),
        }
    }

    /// 获取错误类型
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// 获取错误消息
    pub const fn message(&self) -> &'static str {
        self.message
    }

    /// 导致错误的闪存状态码（如果有）
    pub const fn status(&self) -> Option<IapStatus> {
        self.status
    }

    /// 是否为致命错误
    ///
    /// 致命错误会使设备进入失效状态，直到重新 `init()`。
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::Flash | ErrorKind::VerifyFailed | ErrorKind::Timeout | ErrorKind::DeviceFailed
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{:?}: {} ({})", self.kind, self.message, status.message()),
            None => write!(f, "{:?}: {}", self.kind, self.message),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result 类型别名
pub type Result<T> = core::result::Result<T, Error>;
