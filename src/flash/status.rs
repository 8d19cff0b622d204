//! IAP 结果码
//!
//! 对应 LPC 系列 IAP 命令返回的 `CMD_SUCCESS` .. `BUSY`

/// IAP 命令结果码
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IapStatus {
    /// 命令成功
    Success,
    /// 无效命令
    InvalidCommand,
    /// 源地址未按字对齐
    SrcAddrError,
    /// 目标地址未对齐
    DstAddrError,
    /// 源地址不在内存映射中
    SrcAddrNotMapped,
    /// 目标地址不在内存映射中
    DstAddrNotMapped,
    /// 字节数错误
    CountError,
    /// 扇区号无效
    InvalidSector,
    /// 扇区非空
    SectorNotBlank,
    /// 扇区未准备好写操作
    SectorNotPrepared,
    /// 源与目标数据不一致
    CompareError,
    /// 闪存接口忙
    Busy,
    /// 未知结果码
    Unknown(u32),
}

impl IapStatus {
    /// 从原始 IAP 结果码转换
    pub const fn from_code(code: u32) -> Self {
        match code {
            0 => IapStatus::Success,
            1 => IapStatus::InvalidCommand,
            2 => IapStatus::SrcAddrError,
            3 => IapStatus::DstAddrError,
            4 => IapStatus::SrcAddrNotMapped,
            5 => IapStatus::DstAddrNotMapped,
            6 => IapStatus::CountError,
            7 => IapStatus::InvalidSector,
            8 => IapStatus::SectorNotBlank,
            9 => IapStatus::SectorNotPrepared,
            10 => IapStatus::CompareError,
            11 => IapStatus::Busy,
            other => IapStatus::Unknown(other),
        }
    }

    /// 转换为原始 IAP 结果码
    pub const fn code(self) -> u32 {
        match self {
            IapStatus::Success => 0,
            IapStatus::InvalidCommand => 1,
            IapStatus::SrcAddrError => 2,
            IapStatus::DstAddrError => 3,
            IapStatus::SrcAddrNotMapped => 4,
            IapStatus::DstAddrNotMapped => 5,
            IapStatus::CountError => 6,
            IapStatus::InvalidSector => 7,
            IapStatus::SectorNotBlank => 8,
            IapStatus::SectorNotPrepared => 9,
            IapStatus::CompareError => 10,
            IapStatus::Busy => 11,
            IapStatus::Unknown(code) => code,
        }
    }

    /// 诊断信息
    pub const fn message(self) -> &'static str {
        match self {
            IapStatus::Success => "CMD success",
            IapStatus::InvalidCommand => "Invalid command",
            IapStatus::SrcAddrError => "SRC address error",
            IapStatus::DstAddrError => "DST address error",
            IapStatus::SrcAddrNotMapped => "SRC addr not map",
            IapStatus::DstAddrNotMapped => "DST addr not map",
            IapStatus::CountError => "COUNT error",
            IapStatus::InvalidSector => "Invalid sector",
            IapStatus::SectorNotBlank => "Sector not blank",
            IapStatus::SectorNotPrepared => "Sector not prepared",
            IapStatus::CompareError => "Compare error",
            IapStatus::Busy => "BUSY",
            IapStatus::Unknown(_) => "Unknown IAP status",
        }
    }

    /// 是否成功
    #[inline]
    pub const fn is_success(self) -> bool {
        matches!(self, IapStatus::Success)
    }

    /// 是否为地址类错误
    pub const fn is_address_error(self) -> bool {
        matches!(
            self,
            IapStatus::SrcAddrError
                | IapStatus::DstAddrError
                | IapStatus::SrcAddrNotMapped
                | IapStatus::DstAddrNotMapped
        )
    }

    /// 擦除阶段可以重试的状态
    pub const fn is_erase_retryable(self) -> bool {
        matches!(self, IapStatus::SectorNotBlank | IapStatus::Busy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_mapping() {
        for code in 0..=11 {
            assert_eq!(IapStatus::from_code(code).code(), code);
        }
        assert_eq!(IapStatus::from_code(0), IapStatus::Success);
        assert_eq!(IapStatus::from_code(8), IapStatus::SectorNotBlank);
        assert_eq!(IapStatus::from_code(11), IapStatus::Busy);
        assert_eq!(IapStatus::from_code(42), IapStatus::Unknown(42));
    }

    #[test]
    fn test_classification() {
        assert!(IapStatus::Success.is_success());
        assert!(!IapStatus::Busy.is_success());
        assert!(IapStatus::DstAddrNotMapped.is_address_error());
        assert!(!IapStatus::CountError.is_address_error());
        assert!(IapStatus::Busy.is_erase_retryable());
        assert!(IapStatus::SectorNotBlank.is_erase_retryable());
        assert!(!IapStatus::CompareError.is_erase_retryable());
    }

    #[test]
    fn test_messages() {
        assert_eq!(IapStatus::CompareError.message(), "Compare error");
        assert_eq!(IapStatus::SectorNotPrepared.message(), "Sector not prepared");
    }
}
