//! 控制命令
//!
//! 磁盘层（如 FatFs 的 `disk_ioctl`）通过数字命令码控制设备。

use super::FlashDisk;
use crate::error::{Error, ErrorKind, Result};
use crate::flash::{FlashPrimitives, TickSource};

/// 控制命令码
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum IoctlCmd {
    /// 初始化设备
    Init = 1,
    /// 关闭设备（写回缓存）
    Deinit = 2,
    /// 同步（写回缓存）
    Sync = 3,
    /// 查询块数
    SecCount = 4,
    /// 查询块大小
    SecSize = 5,
}

impl IoctlCmd {
    /// 从命令码解析
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            1 => Some(IoctlCmd::Init),
            2 => Some(IoctlCmd::Deinit),
            3 => Some(IoctlCmd::Sync),
            4 => Some(IoctlCmd::SecCount),
            5 => Some(IoctlCmd::SecSize),
            _ => None,
        }
    }
}

impl<F: FlashPrimitives, T: TickSource> FlashDisk<F, T> {
    /// 执行控制命令
    ///
    /// # 返回
    ///
    /// 查询命令返回 `Some(值)`，其他命令返回 `None`
    pub fn ioctl(&mut self, cmd: IoctlCmd) -> Result<Option<u32>> {
        match cmd {
            IoctlCmd::Init => self.init().map(|_| None),
            IoctlCmd::Deinit | IoctlCmd::Sync => self.flush().map(|_| None),
            IoctlCmd::SecCount => Ok(Some(self.block_count())),
            IoctlCmd::SecSize => Ok(Some(self.block_size())),
        }
    }

    /// 执行原始命令码
    pub fn ioctl_raw(&mut self, raw: u32) -> Result<Option<u32>> {
        match IoctlCmd::from_raw(raw) {
            Some(cmd) => self.ioctl(cmd),
            None => {
                log::warn!("[DISK] unknown ioctl command {}", raw);
                Err(Error::new(ErrorKind::InvalidInput, "unknown ioctl command"))
            }
        }
    }
}
