//! 为大属性值创建 dstream
//!
//! 对应 `apfs_create_xattr_dstream()`

use super::DstreamInfo;
use crate::{
    block::BlockStore,
    error::Result,
    fs::{VolumeSuperblock, XattrConfig},
    transaction::Transaction,
};

use alloc::vec;

/// 创建 dstream 并写入值
///
/// # 参数
///
/// * `blocks` - 块存储
/// * `trans` - 当前事务（必须活跃）
/// * `sb` - 卷 superblock，提供新的对象 ID
/// * `config` - xattr 配置
/// * `value` - 属性值
///
/// # 返回
///
/// 成功返回新的 dstream，pending extent 已写回
///
/// # 实现说明
///
/// 1. 从 superblock 取新的对象 ID（superblock 加入事务）
/// 2. 按块分配物理块并写入数据，最后一块不足部分补零
/// 3. 写回 extent 缓存
///
/// 中途失败时按物理块号释放已分配的所有块（包括 extent 没能写回的块），
/// 不把半成品交给调用者
pub fn create<B, X>(
    blocks: &mut B,
    trans: &mut X,
    sb: &mut VolumeSuperblock,
    config: &XattrConfig,
    value: &[u8],
) -> Result<DstreamInfo>
where
    B: BlockStore + ?Sized,
    X: Transaction + ?Sized,
{
    let id = sb.alloc_obj_id(trans)?;
    let mut ds = DstreamInfo::empty(id, blocks.block_size(), config.extent_cache_size);

    log::debug!("[DSTREAM] create {:#x} for {} byte value", id, value.len());

    if let Err(e) = fill(&mut ds, blocks, trans, value) {
        log::warn!(
            "[DSTREAM] create {:#x} failed ({:?}), releasing {} blocks",
            id,
            e.kind(),
            ds.fresh_blocks()
        );
        if let Err(cleanup) = ds.release_fresh(blocks) {
            log::error!("[DSTREAM] cleanup of {:#x} failed: {}", id, cleanup);
        }
        return Err(e);
    }

    ds.keep_fresh();
    Ok(ds)
}

/// 分配、写入并记录所有块
fn fill<B, X>(ds: &mut DstreamInfo, blocks: &mut B, trans: &mut X, value: &[u8]) -> Result<()>
where
    B: BlockStore + ?Sized,
    X: Transaction + ?Sized,
{
    let block_size = ds.block_size() as usize;
    let mut buf = vec![0u8; block_size];

    for (i, chunk) in value.chunks(block_size).enumerate() {
        let paddr = ds.alloc_block(blocks, trans, i as u64)?;

        buf[..chunk.len()].copy_from_slice(chunk);
        buf[chunk.len()..].fill(0);
        blocks.write_block(paddr, &buf)?;

        ds.set_size(ds.size() + chunk.len() as u64);
    }

    ds.flush_extent_cache(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::MemBlockStore;
    use crate::error::ErrorKind;
    use crate::error::Error;
    use crate::transaction::{MaxOps, SimpleTransaction, TransactionManager, TxResource};
    use crate::types::Extent;
    use alloc::vec::Vec;

    type Trans = SimpleTransaction<(), MemBlockStore>;

    fn setup(capacity: u64) -> (MemBlockStore, Trans, VolumeSuperblock) {
        let store = MemBlockStore::new(512, capacity);
        let sb = VolumeSuperblock::new(100, false);
        let mut trans = Trans::new();
        trans.start(MaxOps::default(), &(), &store, &sb).unwrap();
        (store, trans, sb)
    }

    #[test]
    fn test_create_writes_padded_blocks() {
        let (mut store, mut trans, mut sb) = setup(16);
        let value: Vec<u8> = (0..1300u32).map(|i| (i % 251) as u8).collect();

        let ds = create(&mut store, &mut trans, &mut sb, &XattrConfig::default(), &value).unwrap();
        assert_eq!(ds.id(), 100);
        assert_eq!(ds.size(), 1300);
        assert_eq!(ds.alloced_size(), 1536);
        assert!(!ds.is_ext_dirty());
        assert_eq!(sb.next_obj_id(), 101);

        assert_eq!(store.extents_of(100), vec![Extent::new(0, 1, 3)]);
        let last = store.block_data(3).unwrap();
        assert_eq!(&last[..276], &value[1024..]);
        assert!(last[276..].iter().all(|&b| b == 0));
        assert!(trans.joined().contains(&TxResource::Block(2)));
    }

    #[test]
    fn test_create_failure_frees_everything() {
        let (mut store, mut trans, mut sb) = setup(2);
        let value = vec![7u8; 2000];

        let err = create(&mut store, &mut trans, &mut sb, &XattrConfig::default(), &value).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoSpace);
        assert_eq!(store.allocated_blocks(), 0);
        assert!(store.extents_of(100).is_empty());
    }

    /// extent 记录总是失败的块存储
    struct FailingRecord(MemBlockStore);

    impl BlockStore for FailingRecord {
        fn block_size(&self) -> u32 {
            self.0.block_size()
        }
        fn allocate_block(&mut self, stream_id: u64, logical: u64) -> Result<u64> {
            self.0.allocate_block(stream_id, logical)
        }
        fn lookup_extent(&self, stream_id: u64, logical: u64) -> Result<Option<Extent>> {
            self.0.lookup_extent(stream_id, logical)
        }
        fn record_extent(&mut self, _stream_id: u64, _extent: &Extent) -> Result<()> {
            Err(Error::new(ErrorKind::Io, "extent tree write failed"))
        }
        fn read_block(&self, paddr: u64, buf: &mut [u8]) -> Result<()> {
            self.0.read_block(paddr, buf)
        }
        fn write_block(&mut self, paddr: u64, data: &[u8]) -> Result<()> {
            self.0.write_block(paddr, data)
        }
        fn free_blocks_from(&mut self, stream_id: u64, from_logical: u64) -> Result<u64> {
            self.0.free_blocks_from(stream_id, from_logical)
        }
        fn free_block(&mut self, paddr: u64) -> Result<()> {
            self.0.free_block(paddr)
        }
        fn forget_extents(&mut self, stream_id: u64) -> Result<()> {
            self.0.forget_extents(stream_id)
        }
    }

    /// 只接受 superblock 加入的事务
    struct RejectBlocks;

    impl Transaction for RejectBlocks {
        fn is_active(&self) -> bool {
            true
        }
        fn join(&mut self, res: TxResource) -> Result<()> {
            match res {
                TxResource::Block(_) => Err(Error::new(ErrorKind::NoSpace, "transaction full")),
                _ => Ok(()),
            }
        }
    }

    #[test]
    fn test_create_record_failure_frees_blocks() {
        let (store, mut trans, mut sb) = setup(16);
        let mut store = FailingRecord(store);

        // 4 个连续块，最后的 flush 失败
        let err = create(&mut store, &mut trans, &mut sb, &XattrConfig::default(), &[7u8; 2000]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert_eq!(store.0.allocated_blocks(), 0);
        assert!(store.0.extents_of(100).is_empty());
    }

    #[test]
    fn test_create_failure_with_split_extent() {
        let (mut store, mut trans, mut sb) = setup(16);
        // 占用 1..=3 再释放 2，新 dstream 拿到 2 和 4，不连续
        for i in 0..3 {
            store.allocate_block(9, i).unwrap();
        }
        store.free_block(2).unwrap();
        let mut store = FailingRecord(store);

        let err = create(&mut store, &mut trans, &mut sb, &XattrConfig::default(), &[7u8; 2000]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert_eq!(store.0.allocated_blocks(), 2);
        assert!(store.0.is_allocated(1) && store.0.is_allocated(3));
        assert!(!store.0.is_allocated(2) && !store.0.is_allocated(4));
    }

    #[test]
    fn test_create_join_failure_frees_block() {
        let mut store = MemBlockStore::new(512, 16);
        let mut sb = VolumeSuperblock::new(100, false);

        let err = create(&mut store, &mut RejectBlocks, &mut sb, &XattrConfig::default(), &[1u8; 600]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoSpace);
        assert_eq!(store.allocated_blocks(), 0);
    }

    #[test]
    fn test_create_requires_transaction() {
        let mut store = MemBlockStore::new(512, 4);
        let mut sb = VolumeSuperblock::new(100, false);
        let mut trans = Trans::new();

        let err = create(&mut store, &mut trans, &mut sb, &XattrConfig::default(), b"abc").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(store.allocated_blocks(), 0);
    }
}
