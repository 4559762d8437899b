//! Transaction 系统
//!
//! 所有修改 xattr 的操作都必须在一个事务中执行：catalog 修改、块分配和
//! 块写入要么一起生效，要么都不生效。
//!
//! ## 模块结构
//!
//! - `simple` - 基于检查点的简化事务（不使用 journal）
//!
//! ## 使用说明
//!
//! ```rust,ignore
//! use apfs_xattr::transaction::MaxOps;
//!
//! vol.transaction_start(MaxOps { cat: 1, blks: 0 })?;
//! match xattr::set(&mut vol, &access, ino, "user.a", Some(b"v"), XattrSetFlags::empty()) {
//!     Ok(()) => vol.transaction_commit()?,
//!     Err(e) => {
//!         vol.transaction_abort();
//!         return Err(e);
//!     }
//! }
//! ```

mod simple;

pub use simple::{SimpleTransaction, TransactionState};

use crate::{error::Result, fs::VolumeSuperblock};

/// 事务预估的最大操作数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MaxOps {
    /// catalog 操作数
    pub cat: u32,
    /// 块操作数
    pub blks: u32,
}

/// 加入事务的资源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxResource {
    /// 卷 superblock（对象 ID 计数器）
    Superblock,
    /// catalog 树
    Catalog,
    /// 物理块
    Block(u64),
}

/// 正在运行的事务
pub trait Transaction {
    /// 事务是否活跃
    fn is_active(&self) -> bool;

    /// 把资源加入当前事务
    fn join(&mut self, res: TxResource) -> Result<()>;
}

/// 事务管理器
///
/// `start` 和 `abort` 接收被保护的卷状态，检查点式或 journal 式实现都可以
/// 据此保存和恢复修改。
pub trait TransactionManager<C, B>: Transaction {
    /// 开始事务
    fn start(&mut self, maxops: MaxOps, catalog: &C, blocks: &B, sb: &VolumeSuperblock) -> Result<()>;

    /// 提交事务
    fn commit(&mut self) -> Result<()>;

    /// 回滚事务，撤销自 `start` 以来的全部修改
    fn abort(&mut self, catalog: &mut C, blocks: &mut B, sb: &mut VolumeSuperblock);
}
