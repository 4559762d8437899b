//! "osx." 命名空间的 xattr 处理函数
//!
//! 对应 `apfs_xattr_osx_get()`、`apfs_xattr_osx_set()` 和 `apfs_listxattr()`
//! 的 VFS 入口：去掉前缀、获取 big lock、必要时开启事务，再调用核心操作。

use super::{list as core_list, prefix::extract_xattr_name, read, write, XattrSetFlags};
use crate::{
    block::BlockStore,
    catalog::CatalogIndex,
    consts::*,
    error::{Error, ErrorKind, Result},
    fs::{BigSem, RawBigLock, Volume},
    transaction::{MaxOps, TransactionManager},
};

/// 去掉 "osx." 前缀并检查长度
fn disk_name(full_name: &str) -> Result<&str> {
    let name = extract_xattr_name(full_name)
        .ok_or(Error::new(ErrorKind::Unsupported, "xattr name outside osx namespace"))?;
    if name.len() > XATTR_NAME_MAX {
        return Err(Error::new(ErrorKind::InvalidInput, "xattr name too long"));
    }
    Ok(name)
}

/// 读取属性
///
/// 只接受完整读取；结果超过 `XATTR_SIZE_MAX` 时返回 `TooLarge`
pub fn get<C, B, T, L>(
    vol: &Volume<C, B, T>,
    sem: &BigSem<L>,
    owner: u64,
    full_name: &str,
    buffer: Option<&mut [u8]>,
) -> Result<usize>
where
    C: CatalogIndex,
    B: BlockStore,
    T: TransactionManager<C, B>,
    L: RawBigLock,
{
    let name = disk_name(full_name)?;
    let len = {
        let access = sem.read();
        read::get(vol, &access, owner, name, buffer)?
    };
    if len > XATTR_SIZE_MAX {
        return Err(Error::new(ErrorKind::TooLarge, "xattr value exceeds XATTR_SIZE_MAX"));
    }
    Ok(len)
}

/// 设置或删除属性（`value` 为 None 时删除）
///
/// 在独立事务中执行：成功则提交，任何错误（包括提交失败）都回滚
pub fn set<C, B, T, L>(
    vol: &mut Volume<C, B, T>,
    sem: &BigSem<L>,
    owner: u64,
    full_name: &str,
    value: Option<&[u8]>,
    flags: XattrSetFlags,
) -> Result<()>
where
    C: CatalogIndex,
    B: BlockStore,
    T: TransactionManager<C, B>,
    L: RawBigLock,
{
    let name = disk_name(full_name)?;
    let access = sem.write();

    vol.transaction_start(MaxOps { cat: APFS_XATTR_SET_MAXOPS, blks: 0 })?;
    let result = write::set(vol, &access, owner, name, value, flags).and_then(|()| vol.transaction_commit());
    if let Err(e) = result {
        log::debug!("[XATTR] set of {} on inode {:#x} failed: {}", full_name, owner, e);
        vol.transaction_abort();
        return Err(e);
    }
    Ok(())
}

/// 删除属性
pub fn remove<C, B, T, L>(vol: &mut Volume<C, B, T>, sem: &BigSem<L>, owner: u64, full_name: &str) -> Result<()>
where
    C: CatalogIndex,
    B: BlockStore,
    T: TransactionManager<C, B>,
    L: RawBigLock,
{
    set(vol, sem, owner, full_name, None, XattrSetFlags::REPLACE)
}

/// 列出属性
pub fn list<C, B, T, L>(vol: &Volume<C, B, T>, sem: &BigSem<L>, owner: u64, buffer: Option<&mut [u8]>) -> Result<usize>
where
    C: CatalogIndex,
    B: BlockStore,
    T: TransactionManager<C, B>,
    L: RawBigLock,
{
    let access = sem.read();
    core_list(vol, &access, owner, buffer)
}
