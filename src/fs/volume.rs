//! 卷对象
//!
//! `Volume` 把 xattr 需要的协作者组合在一起：catalog、块存储、卷 superblock
//! 和事务管理器。xattr 操作通过它访问这些资源，保证在同一个事务里修改。

use core::sync::atomic::{AtomicU64, Ordering};

use super::types::XattrConfig;
use crate::{
    block::{BlockStore, MemBlockStore},
    catalog::{CatalogIndex, MemCatalog},
    error::{Error, ErrorKind, Result},
    transaction::{MaxOps, SimpleTransaction, Transaction, TransactionManager, TxResource},
};

/// 卷 superblock 中 xattr 用到的部分
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeSuperblock {
    /// 下一个可用的对象 ID
    next_obj_id: u64,
    /// 卷是否加密
    encrypted: bool,
}

impl VolumeSuperblock {
    /// 创建 superblock
    pub fn new(next_obj_id: u64, encrypted: bool) -> Self {
        Self { next_obj_id, encrypted }
    }

    /// 下一个可用的对象 ID
    pub fn next_obj_id(&self) -> u64 {
        self.next_obj_id
    }

    /// 直接设置对象 ID 计数器
    pub fn set_next_obj_id(&mut self, id: u64) {
        self.next_obj_id = id;
    }

    /// 卷是否加密
    pub fn is_encrypted(&self) -> bool {
        self.encrypted
    }

    /// 分配一个新的对象 ID
    ///
    /// superblock 必须先加入当前事务
    pub fn alloc_obj_id<X: Transaction + ?Sized>(&mut self, trans: &mut X) -> Result<u64> {
        if !trans.is_active() {
            return Err(Error::new(ErrorKind::InvalidState, "object id allocation outside transaction"));
        }
        trans.join(TxResource::Superblock)?;

        let id = self.next_obj_id;
        self.next_obj_id = id
            .checked_add(1)
            .ok_or(Error::new(ErrorKind::NoSpace, "object ids exhausted"))?;
        Ok(id)
    }
}

/// 修改操作需要同时可变借用的卷部件
pub struct VolumeParts<'a, C, B, T> {
    /// catalog
    pub catalog: &'a mut C,
    /// 块存储
    pub blocks: &'a mut B,
    /// 卷 superblock
    pub sb: &'a mut VolumeSuperblock,
    /// 事务管理器
    pub trans: &'a mut T,
    /// 配置
    pub config: &'a XattrConfig,
}

/// 卷
pub struct Volume<C, B, T> {
    catalog: C,
    blocks: B,
    sb: VolumeSuperblock,
    trans: T,
    config: XattrConfig,
    /// 检测到的损坏记录数
    corrupt_records: AtomicU64,
}

/// 内存卷
pub type MemVolume = Volume<MemCatalog, MemBlockStore, SimpleTransaction<MemCatalog, MemBlockStore>>;

impl MemVolume {
    /// 创建内存卷
    ///
    /// # 参数
    ///
    /// * `block_size` - 块大小
    /// * `capacity` - 可分配的块数
    pub fn in_memory(block_size: u32, capacity: u64) -> Self {
        Volume::new(
            MemCatalog::new(),
            MemBlockStore::new(block_size, capacity),
            VolumeSuperblock::new(1024, false),
            SimpleTransaction::new(),
            XattrConfig::default(),
        )
    }
}

impl<C, B, T> Volume<C, B, T>
where
    C: CatalogIndex,
    B: BlockStore,
    T: TransactionManager<C, B>,
{
    /// 组装卷
    pub fn new(catalog: C, blocks: B, sb: VolumeSuperblock, trans: T, config: XattrConfig) -> Self {
        Self {
            catalog,
            blocks,
            sb,
            trans,
            config,
            corrupt_records: AtomicU64::new(0),
        }
    }

    /// catalog
    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// 块存储
    pub fn blocks(&self) -> &B {
        &self.blocks
    }

    /// 块存储（可变）
    ///
    /// ⚠️ **警告**：直接修改块存储会绕过事务跟踪！
    pub fn blocks_mut(&mut self) -> &mut B {
        &mut self.blocks
    }

    /// catalog（可变）
    ///
    /// ⚠️ **警告**：直接修改 catalog 会绕过事务跟踪！
    pub fn catalog_mut(&mut self) -> &mut C {
        &mut self.catalog
    }

    /// 卷 superblock
    pub fn superblock(&self) -> &VolumeSuperblock {
        &self.sb
    }

    /// 事务管理器
    pub fn transaction(&self) -> &T {
        &self.trans
    }

    /// 配置
    pub fn config(&self) -> &XattrConfig {
        &self.config
    }

    /// 同时获取所有部件的可变引用（避免借用冲突）
    pub fn parts_mut(&mut self) -> VolumeParts<'_, C, B, T> {
        VolumeParts {
            catalog: &mut self.catalog,
            blocks: &mut self.blocks,
            sb: &mut self.sb,
            trans: &mut self.trans,
            config: &self.config,
        }
    }

    /// 开始事务
    pub fn transaction_start(&mut self, maxops: MaxOps) -> Result<()> {
        self.trans.start(maxops, &self.catalog, &self.blocks, &self.sb)
    }

    /// 提交事务
    pub fn transaction_commit(&mut self) -> Result<()> {
        self.trans.commit()
    }

    /// 回滚事务
    pub fn transaction_abort(&mut self) {
        self.trans.abort(&mut self.catalog, &mut self.blocks, &mut self.sb);
    }

    /// 检查是否在事务中
    ///
    /// 对应 `apfs_assert_in_transaction()`
    pub fn assert_in_transaction(&self) -> Result<()> {
        if !self.trans.is_active() {
            return Err(Error::new(ErrorKind::InvalidState, "xattr update outside transaction"));
        }
        Ok(())
    }

    /// 报告损坏的 xattr 记录
    ///
    /// 对应 `apfs_alert()`：记录错误日志并计数
    pub fn report_corruption(&self, owner: u64) {
        self.corrupt_records.fetch_add(1, Ordering::Relaxed);
        log::error!("[XATTR] bad xattr record in inode {:#x}", owner);
    }

    /// 已检测到的损坏记录数
    pub fn corruption_count(&self) -> u64 {
        self.corrupt_records.load(Ordering::Relaxed)
    }
}
