//! dstream 内存信息
//!
//! 对应 APFS 的 `struct apfs_dstream_info`

use alloc::vec::Vec;

use super::cache::ExtentCache;
use crate::{
    block::BlockStore,
    error::{Error, ErrorKind, Result},
    transaction::{Transaction, TxResource},
    types::DstreamRef,
};

/// dstream 信息
///
/// 每个实例只属于一个 xattr 记录，只在单次操作期间存在
#[derive(Debug)]
pub struct DstreamInfo {
    /// dstream 对象 ID
    id: u64,
    /// 逻辑大小（字节）
    size: u64,
    /// 块大小
    block_size: u32,
    /// extent 缓存
    cache: ExtentCache,
    /// 本次操作新分配、还没交给 catalog 的物理块
    fresh: Vec<u64>,
}

impl DstreamInfo {
    /// 创建空 dstream
    pub(crate) fn empty(id: u64, block_size: u32, cache_size: usize) -> Self {
        Self {
            id,
            size: 0,
            block_size,
            cache: ExtentCache::new(cache_size),
            fresh: Vec::new(),
        }
    }

    /// 从 xattr 记录中的 dstream 引用重建（不做 I/O）
    ///
    /// 对应 `apfs_dstream_from_xattr()`
    pub fn from_xattr(dref: &DstreamRef, block_size: u32, cache_size: usize) -> Self {
        Self {
            id: dref.obj_id,
            size: dref.size,
            block_size,
            cache: ExtentCache::new(cache_size),
            fresh: Vec::new(),
        }
    }

    /// dstream 对象 ID
    pub fn id(&self) -> u64 {
        self.id
    }

    /// 逻辑大小
    pub fn size(&self) -> u64 {
        self.size
    }

    pub(crate) fn set_size(&mut self, size: u64) {
        self.size = size;
    }

    /// 块大小
    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    /// 覆盖 `size` 字节需要的块数
    pub fn blocks_for(&self, size: u64) -> u64 {
        size.div_ceil(u64::from(self.block_size))
    }

    /// 已分配大小（按块对齐）
    ///
    /// 对应 `apfs_alloced_size()`
    pub fn alloced_size(&self) -> u64 {
        self.blocks_for(self.size) * u64::from(self.block_size)
    }

    /// extent 缓存是否有未写回的修改
    pub fn is_ext_dirty(&self) -> bool {
        self.cache.is_dirty()
    }

    pub(crate) fn cache_mut(&mut self) -> &mut ExtentCache {
        &mut self.cache
    }

    /// 生成磁盘引用
    ///
    /// 加密卷上 default_crypto_id 使用 dstream 自己的 ID
    pub fn to_ref(&self, encrypted: bool) -> DstreamRef {
        DstreamRef {
            obj_id: self.id,
            size: self.size,
            alloced_size: self.alloced_size(),
            default_crypto_id: if encrypted { self.id } else { 0 },
        }
    }

    /// 逻辑块号转物理块号
    ///
    /// 对应 `apfs_logic_to_phys_bno()`。xattr 的 dstream 不允许有空洞，
    /// 找不到映射或映射到空洞都视为损坏。
    pub fn resolve_block<B: BlockStore + ?Sized>(&mut self, blocks: &B, logical: u64) -> Result<u64> {
        let ext = match self.cache.lookup(logical) {
            Some(ext) => ext,
            None => {
                let ext = blocks.lookup_extent(self.id, logical)?.ok_or(Error::new(
                    ErrorKind::Corrupted,
                    "missing extent in xattr dstream",
                ))?;
                if !ext.contains(logical) {
                    return Err(Error::new(ErrorKind::Corrupted, "extent lookup returned wrong range"));
                }
                self.cache.insert_clean(ext);
                ext
            }
        };

        let paddr = ext.phys_of(logical);
        if paddr == 0 {
            log::warn!("[DSTREAM] hole at block {} of xattr dstream {:#x}", logical, self.id);
            return Err(Error::new(ErrorKind::Corrupted, "hole in xattr dstream"));
        }
        Ok(paddr)
    }

    /// 为逻辑块分配新的物理块
    ///
    /// 对应 `apfs_dstream_get_new_bno()`。新块加入事务并记入 pending extent。
    ///
    /// 块一经分配就登记为新块，之后任何一步失败都可以用
    /// [`release_fresh`](Self::release_fresh) 回收。
    pub fn alloc_block<B, X>(&mut self, blocks: &mut B, trans: &mut X, logical: u64) -> Result<u64>
    where
        B: BlockStore + ?Sized,
        X: Transaction + ?Sized,
    {
        let paddr = blocks.allocate_block(self.id, logical)?;
        self.fresh.push(paddr);
        trans.join(TxResource::Block(paddr))?;

        if let Some(full) = self.cache.push_block(logical, paddr) {
            blocks.record_extent(self.id, &full)?;
            self.cache.insert_clean(full);
        }
        Ok(paddr)
    }

    /// 写回 pending extent
    ///
    /// 对应 `apfs_flush_extent_cache()`
    pub fn flush_extent_cache<B: BlockStore + ?Sized>(&mut self, blocks: &mut B) -> Result<()> {
        if let Some(ext) = self.cache.take_pending() {
            log::trace!(
                "[DSTREAM] flush extent {}+{} -> {} for {:#x}",
                ext.logical_block,
                ext.len,
                ext.phys_block,
                self.id
            );
            if let Err(e) = blocks.record_extent(self.id, &ext) {
                // 写回失败，保留为脏
                self.cache.restore_pending(ext);
                return Err(e);
            }
            self.cache.insert_clean(ext);
        }
        Ok(())
    }

    /// 本次操作新分配的块数
    pub fn fresh_blocks(&self) -> usize {
        self.fresh.len()
    }

    /// 新块已由 catalog 记录引用，不再需要回收
    pub(crate) fn keep_fresh(&mut self) {
        self.fresh.clear();
    }

    /// 回收本次操作新分配的所有块
    ///
    /// 不依赖 extent 是否写回：先删除已持久化的 extent 记录，再按物理块号
    /// 逐个释放，pending extent 直接丢弃。单个块释放失败时继续释放其余块，
    /// 返回第一个错误。
    pub(crate) fn release_fresh<B: BlockStore + ?Sized>(&mut self, blocks: &mut B) -> Result<()> {
        self.cache.invalidate_from(0);
        self.size = 0;

        let mut result = blocks.forget_extents(self.id);
        for paddr in self.fresh.drain(..) {
            if let Err(e) = blocks.free_block(paddr) {
                log::error!("[DSTREAM] failed to free block {:#x} of {:#x}: {}", paddr, self.id, e);
                result = result.and(Err(e));
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::MemBlockStore;
    use crate::types::Extent;

    #[test]
    fn test_from_xattr_and_sizes() {
        let dref = DstreamRef { obj_id: 77, size: 5000, alloced_size: 8192, default_crypto_id: 0 };
        let ds = DstreamInfo::from_xattr(&dref, 4096, 4);
        assert_eq!(ds.id(), 77);
        assert_eq!(ds.size(), 5000);
        assert_eq!(ds.alloced_size(), 8192);
        assert_eq!(ds.blocks_for(4096), 1);
        assert!(!ds.is_ext_dirty());

        assert_eq!(ds.to_ref(false), dref);
        assert_eq!(ds.to_ref(true).default_crypto_id, 77);
    }

    #[test]
    fn test_resolve_block_through_store() {
        let mut store = MemBlockStore::new(512, 8);
        store.record_extent(5, &Extent::new(0, 40, 3)).unwrap();
        let mut ds = DstreamInfo::empty(5, 512, 4);
        ds.set_size(1536);

        assert_eq!(ds.resolve_block(&store, 2).unwrap(), 42);
        // 第二次从缓存命中
        assert_eq!(ds.resolve_block(&store, 0).unwrap(), 40);
    }

    #[test]
    fn test_resolve_hole_is_corrupted() {
        let mut store = MemBlockStore::new(512, 8);
        store.record_extent(5, &Extent::new(0, 0, 2)).unwrap();
        let mut ds = DstreamInfo::empty(5, 512, 4);

        let err = ds.resolve_block(&store, 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Corrupted);

        let err = ds.resolve_block(&store, 9).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Corrupted);
    }
}
