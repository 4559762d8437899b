//! 内存块存储
//!
//! `BlockStore` 的参考实现，用于开发和测试：
//! - 物理块从 1 开始编号（0 保留给空洞）
//! - 释放的块优先复用
//! - 支持注入读错误、限制容量
//! - 记录 I/O 事件顺序，便于检查批量读取

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::vec;
use alloc::vec::Vec;
use core::cell::RefCell;

use super::BlockStore;
use crate::{
    error::{Error, ErrorKind, Result},
    types::Extent,
};

/// I/O 事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoEvent {
    /// 发起读取
    Submit(u64),
    /// 等待读取完成
    Wait(u64),
    /// 写入
    Write(u64),
}

/// 内存块存储
#[derive(Debug, Clone)]
pub struct MemBlockStore {
    block_size: u32,
    /// 最多可同时分配的块数
    capacity: u64,
    /// 下一个从未使用过的物理块号
    next_paddr: u64,
    /// 已释放、可复用的块
    free: BTreeSet<u64>,
    /// 已分配块的数据
    data: BTreeMap<u64, Vec<u8>>,
    /// (stream_id, 起始逻辑块) -> extent
    extents: BTreeMap<(u64, u64), Extent>,
    /// 读取时返回 I/O 错误的块
    bad_blocks: BTreeSet<u64>,
    /// I/O 事件日志
    events: RefCell<Vec<IoEvent>>,
}

impl MemBlockStore {
    /// 创建新的内存块存储
    ///
    /// # 参数
    ///
    /// * `block_size` - 块大小
    /// * `capacity` - 最多可分配的块数
    pub fn new(block_size: u32, capacity: u64) -> Self {
        Self {
            block_size,
            capacity,
            next_paddr: 1,
            free: BTreeSet::new(),
            data: BTreeMap::new(),
            extents: BTreeMap::new(),
            bad_blocks: BTreeSet::new(),
            events: RefCell::new(Vec::new()),
        }
    }

    /// 当前已分配的块数
    pub fn allocated_blocks(&self) -> usize {
        self.data.len()
    }

    /// 块是否已分配
    pub fn is_allocated(&self, paddr: u64) -> bool {
        self.data.contains_key(&paddr)
    }

    /// 修改容量
    pub fn set_capacity(&mut self, capacity: u64) {
        self.capacity = capacity;
    }

    /// 让某个块的读取失败
    pub fn inject_read_error(&mut self, paddr: u64) {
        self.bad_blocks.insert(paddr);
    }

    /// 某个 dstream 已记录的所有 extent（按逻辑块排序）
    pub fn extents_of(&self, stream_id: u64) -> Vec<Extent> {
        self.extents
            .range((stream_id, 0)..=(stream_id, u64::MAX))
            .map(|(_, ext)| *ext)
            .collect()
    }

    /// 直接读取块内容（测试检查用）
    pub fn block_data(&self, paddr: u64) -> Option<&[u8]> {
        self.data.get(&paddr).map(|d| d.as_slice())
    }

    /// 取出并清空 I/O 事件日志
    pub fn take_events(&self) -> Vec<IoEvent> {
        core::mem::take(&mut *self.events.borrow_mut())
    }

    fn log_event(&self, event: IoEvent) {
        self.events.borrow_mut().push(event);
    }

    fn release(&mut self, paddr: u64) {
        if paddr != 0 && self.data.remove(&paddr).is_some() {
            self.free.insert(paddr);
        }
    }
}

impl BlockStore for MemBlockStore {
    fn block_size(&self) -> u32 {
        self.block_size
    }

    fn allocate_block(&mut self, stream_id: u64, logical: u64) -> Result<u64> {
        if self.data.len() as u64 >= self.capacity {
            log::warn!(
                "[MEMBLK] no free blocks for stream {:#x} logical {}",
                stream_id,
                logical
            );
            return Err(Error::new(ErrorKind::NoSpace, "No free blocks available"));
        }

        let paddr = match self.free.pop_first() {
            Some(paddr) => paddr,
            None => {
                let paddr = self.next_paddr;
                self.next_paddr += 1;
                paddr
            }
        };
        self.data.insert(paddr, vec![0u8; self.block_size as usize]);
        Ok(paddr)
    }

    fn lookup_extent(&self, stream_id: u64, logical: u64) -> Result<Option<Extent>> {
        let found = self
            .extents
            .range((stream_id, 0)..=(stream_id, logical))
            .next_back()
            .map(|(_, ext)| *ext)
            .filter(|ext| ext.contains(logical));
        Ok(found)
    }

    fn record_extent(&mut self, stream_id: u64, extent: &Extent) -> Result<()> {
        if extent.len == 0 {
            return Err(Error::new(ErrorKind::InvalidInput, "empty extent"));
        }
        self.extents.insert((stream_id, extent.logical_block), *extent);
        Ok(())
    }

    fn submit_read(&self, paddr: u64) -> Result<()> {
        self.log_event(IoEvent::Submit(paddr));
        Ok(())
    }

    fn read_block(&self, paddr: u64, buf: &mut [u8]) -> Result<()> {
        self.log_event(IoEvent::Wait(paddr));
        if self.bad_blocks.contains(&paddr) {
            return Err(Error::new(ErrorKind::Io, "block read failed"));
        }
        let data = self
            .data
            .get(&paddr)
            .ok_or(Error::new(ErrorKind::Io, "read of unallocated block"))?;
        let len = buf.len().min(data.len());
        buf[..len].copy_from_slice(&data[..len]);
        Ok(())
    }

    fn write_block(&mut self, paddr: u64, data: &[u8]) -> Result<()> {
        self.log_event(IoEvent::Write(paddr));
        let block = self
            .data
            .get_mut(&paddr)
            .ok_or(Error::new(ErrorKind::Io, "write to unallocated block"))?;
        if data.len() > block.len() {
            return Err(Error::new(ErrorKind::InvalidInput, "write larger than block"));
        }
        block[..data.len()].copy_from_slice(data);
        Ok(())
    }

    fn free_blocks_from(&mut self, stream_id: u64, from_logical: u64) -> Result<u64> {
        let affected: Vec<Extent> = self
            .extents
            .range((stream_id, 0)..=(stream_id, u64::MAX))
            .map(|(_, ext)| *ext)
            .filter(|ext| ext.logical_end() > from_logical)
            .collect();

        let mut freed = 0;
        for ext in affected {
            let keep = from_logical.saturating_sub(ext.logical_block);
            if !ext.is_hole() {
                for i in keep..ext.len {
                    self.release(ext.phys_block + i);
                    freed += 1;
                }
            }

            if keep == 0 {
                self.extents.remove(&(stream_id, ext.logical_block));
            } else {
                self.extents.insert(
                    (stream_id, ext.logical_block),
                    Extent::new(ext.logical_block, ext.phys_block, keep),
                );
            }
        }
        Ok(freed)
    }

    fn free_block(&mut self, paddr: u64) -> Result<()> {
        if !self.data.contains_key(&paddr) {
            return Err(Error::new(ErrorKind::InvalidInput, "free of unallocated block"));
        }
        self.release(paddr);
        Ok(())
    }

    fn forget_extents(&mut self, stream_id: u64) -> Result<()> {
        self.extents.retain(|&(id, _), _| id != stream_id);
        Ok(())
    }
}
