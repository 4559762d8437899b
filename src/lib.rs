//! apfs_xattr: APFS extended attribute storage in pure Rust
//!
//! 这是 APFS 扩展属性（xattr）存储的纯 Rust 实现，旨在提供：
//! - **零 unsafe 代码**（可选的 parking_lot 锁适配除外）
//! - **Rust 惯用风格**的 API
//! - **完整的磁盘记录校验**
//! - **事务化的修改**：catalog 修改和块分配一起生效或一起回滚
//!
//! catalog 索引、块分配器和事务引擎都是外部协作者，以 trait 的形式给出
//! （[`CatalogIndex`]、[`BlockStore`]、[`TransactionManager`]），并各自附带
//! 一个内存实现，用于开发和测试。
//!
//! # 示例
//!
//! ```rust,ignore
//! use apfs_xattr::{BigSem, MemVolume, NoLock, XattrSetFlags, xattr};
//!
//! fn main() -> apfs_xattr::Result<()> {
//!     let mut vol = MemVolume::in_memory(4096, 1024);
//!     let sem = BigSem::new(NoLock);
//!
//!     xattr::handler::set(&mut vol, &sem, 100, "osx.user.color", Some(b"red"), XattrSetFlags::CREATE)?;
//!
//!     let mut buf = [0u8; 16];
//!     let len = xattr::handler::get(&vol, &sem, 100, "osx.user.color", Some(&mut buf))?;
//!     assert_eq!(&buf[..len], b"red");
//!
//!     Ok(())
//! }
//! ```
//!
//! # 模块结构
//!
//! - [`error`] - 错误类型定义
//! - [`consts`] - 常量定义
//! - [`types`] - 记录数据结构
//! - [`block`] - 块存储抽象
//! - [`catalog`] - 有序索引抽象
//! - [`transaction`] - 事务抽象
//! - [`fs`] - 卷、配置和 big lock
//! - [`dstream`] - dstream 管理
//! - [`xattr`] - 扩展属性操作

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

extern crate alloc;

#[cfg(any(test, feature = "std"))]
extern crate std;

// ===== 核心模块 =====

/// 错误处理
pub mod error;

/// 常量定义
pub mod consts;

/// 数据结构定义
pub mod types;

/// 块存储抽象
pub mod block;

/// Catalog 索引抽象
pub mod catalog;

/// Transaction 系统
pub mod transaction;

/// 卷级对象
pub mod fs;

/// Dstream 管理
pub mod dstream;

/// Extended Attributes (xattr)
pub mod xattr;

// ===== 公共导出 =====

// 错误处理
pub use error::{Error, ErrorKind, Result};

// 块存储
pub use block::{BlockStore, MemBlockStore};

// Catalog
pub use catalog::{CatalogIndex, CatalogRecord, MemCatalog};

// Transaction
pub use transaction::{MaxOps, SimpleTransaction, Transaction, TransactionManager, TxResource};

// 卷
pub use fs::{BigSem, ExclusiveAccess, MemVolume, NoLock, SharedAccess, Volume, VolumeSuperblock, XattrConfig};

// 数据结构
pub use types::{DstreamRef, Extent, Xattr, XattrData, XattrFlags};

// Dstream
pub use dstream::DstreamInfo;

// Xattr
pub use xattr::{
    delete_all as xattr_delete_all, get as xattr_get, list as xattr_list, set as xattr_set,
    XattrSetFlags,
};
