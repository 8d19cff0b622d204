//! 扇区写回序列
//!
//! 一次写回依次执行：
//!
//! 1. `prepare_for_write` + `erase` + `blank_check`，查空失败时重新擦除，
//!    最多重试 `erase_retries` 次
//! 2. `prepare_for_write` + `program` 把整个缓冲区编程回扇区
//! 3. `compare` 校验
//!
//! 每个原语返回 `Busy` 时原地重试，直到 `busy_timeout_ms` 超时。
//! 整个序列由调用方放在临界区内执行。

use crate::consts::BUSY_POLL_LIMIT;
use crate::error::{Error, ErrorKind, Result};
use crate::flash::{FlashPrimitives, IapStatus, TickSource};
use crate::translate::Sector;

pub(super) struct WriteBack<'a, F, T> {
    flash: &'a mut F,
    tick: &'a T,
    sector: Sector,
    erase_retries: u32,
    busy_timeout_ms: u32,
    retries: u32,
}

impl<'a, F: FlashPrimitives, T: TickSource> WriteBack<'a, F, T> {
    pub(super) fn new(
        flash: &'a mut F,
        tick: &'a T,
        sector: Sector,
        erase_retries: u32,
        busy_timeout_ms: u32,
    ) -> Self {
        Self {
            flash,
            tick,
            sector,
            erase_retries,
            busy_timeout_ms,
            retries: 0,
        }
    }

    /// 本次写回中擦除重试的次数
    pub(super) fn retries(&self) -> u32 {
        self.retries
    }

    /// 擦除扇区并确认为空白
    pub(super) fn erase(&mut self) -> Result<()> {
        loop {
            let status = self.erase_once()?;
            if status.is_success() {
                return Ok(());
            }
            if status.is_erase_retryable() && self.retries < self.erase_retries {
                self.retries += 1;
                log::warn!(
                    "[FLASH] erase of sector {:#x} failed ({}), retry {}/{}",
                    self.sector.start,
                    status.message(),
                    self.retries,
                    self.erase_retries
                );
                continue;
            }
            log::error!(
                "[FLASH] erase of sector {:#x} failed: {}",
                self.sector.start,
                status.message()
            );
            return Err(Error::with_status(ErrorKind::Flash, "sector erase failed", status));
        }
    }

    /// 把缓冲区编程到已擦除的扇区
    pub(super) fn program(&mut self, data: &[u8]) -> Result<()> {
        let sector = self.sector;
        let status = self.wait(|flash| flash.prepare_for_write(sector))?;
        check(status, "prepare for program failed")?;
        let status = self.wait(|flash| flash.program(sector.start, data))?;
        check(status, "sector program failed")
    }

    /// 逐字节比较闪存与缓冲区
    pub(super) fn verify(&mut self, data: &[u8]) -> Result<()> {
        let start = self.sector.start;
        match self.wait(|flash| flash.compare(start, data))? {
            IapStatus::Success => Ok(()),
            IapStatus::CompareError => {
                log::error!("[FLASH] verify of sector {:#x} failed, medium is defective", start);
                Err(Error::with_status(
                    ErrorKind::VerifyFailed,
                    "programmed data does not match",
                    IapStatus::CompareError,
                ))
            }
            status => check(status, "sector compare failed"),
        }
    }

    fn erase_once(&mut self) -> Result<IapStatus> {
        let sector = self.sector;
        let status = self.wait(|flash| flash.prepare_for_write(sector))?;
        if !status.is_success() {
            return Ok(status);
        }
        let status = self.wait(|flash| flash.erase(sector))?;
        if !status.is_success() {
            return Ok(status);
        }
        self.wait(|flash| flash.blank_check(sector.start, sector.size))
    }

    /// 执行原语，`Busy` 时重试直到超时
    fn wait(&mut self, mut op: impl FnMut(&mut F) -> IapStatus) -> Result<IapStatus> {
        let started = self.tick.now_ms();
        let mut polls: u32 = 0;
        loop {
            let status = op(&mut *self.flash);
            if status != IapStatus::Busy {
                return Ok(status);
            }
            polls += 1;
            let elapsed = self.tick.now_ms().wrapping_sub(started);
            if elapsed >= self.busy_timeout_ms || polls >= BUSY_POLL_LIMIT {
                log::error!(
                    "[FLASH] controller busy for {} ms ({} polls) on sector {:#x}",
                    elapsed,
                    polls,
                    self.sector.start
                );
                return Err(Error::with_status(
                    ErrorKind::Timeout,
                    "flash controller stayed busy",
                    IapStatus::Busy,
                ));
            }
        }
    }
}

fn check(status: IapStatus, message: &'static str) -> Result<()> {
    if status.is_success() {
        Ok(())
    } else {
        log::error!("[FLASH] {}: {}", message, status.message());
        Err(Error::with_status(ErrorKind::Flash, message, status))
    }
}
