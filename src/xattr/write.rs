//! xattr 写操作
//!
//! 对应 `apfs_xattr_set()`、`apfs_delete_xattr()` 和
//! `apfs_delete_all_xattrs()`
//!
//! 所有函数都要求调用者已持有独占访问并开启了事务。

use bitflags::bitflags;

use super::codec::{check_name, decode, encode_inline_value, encode_key, encode_stream_value};
use super::read::report_corrupted;
use crate::{
    block::BlockStore,
    catalog::{CatalogIndex, CatalogRecord},
    consts::APFS_TYPE_XATTR,
    dstream::{self, truncate, DstreamInfo},
    error::{Error, ErrorKind, Result},
    fs::{ExclusiveAccess, Volume},
    transaction::{TransactionManager, TxResource},
    types::{DstreamRef, XattrFlags},
};

bitflags! {
    /// set 操作标志
    ///
    /// 对应 VFS 的 `XATTR_CREATE` / `XATTR_REPLACE`
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct XattrSetFlags: u32 {
        /// 只允许创建新属性
        const CREATE  = 0x1;
        /// 只允许替换已有属性
        const REPLACE = 0x2;
    }
}

/// 设置扩展属性
///
/// # 参数
///
/// * `vol` - 卷（必须在事务中）
/// * `access` - 独占访问能力
/// * `owner` - 所属 inode
/// * `name` - 磁盘属性名
/// * `value` - 属性值；None 表示删除
/// * `flags` - CREATE / REPLACE
///
/// # 实现说明
///
/// 1. 值超过内联阈值时先创建 dstream（在修改 catalog 之前）
/// 2. 精确查找已有记录，按标志决定插入、替换、删除或报错
/// 3. 编码新记录；符号链接属性额外设置 FILE_SYSTEM_OWNED
/// 4. 插入或替换 catalog 记录
/// 5. catalog 不再引用旧 dstream 之后，才截断回收旧 dstream
///
/// 第 4 步之前失败时，第 1 步创建的 dstream 会被立即回收
pub fn set<C, B, T>(
    vol: &mut Volume<C, B, T>,
    access: &ExclusiveAccess<'_>,
    owner: u64,
    name: &str,
    value: Option<&[u8]>,
    flags: XattrSetFlags,
) -> Result<()>
where
    C: CatalogIndex,
    B: BlockStore,
    T: TransactionManager<C, B>,
{
    access.assert_held();
    vol.assert_in_transaction()?;
    let name = check_name(name)?;
    if let Some(value) = value {
        if value.len() as u64 > vol.config().max_value_size {
            return Err(Error::new(ErrorKind::TooLarge, "xattr value too large"));
        }
    }

    let new_ds = match value {
        Some(value) if vol.config().needs_dstream(value.len()) => {
            let parts = vol.parts_mut();
            Some(dstream::create(parts.blocks, parts.trans, parts.sb, parts.config, value)?)
        }
        _ => None,
    };

    let old = match update_record(vol, owner, name, value, flags, new_ds.as_ref()) {
        Ok(old) => old,
        Err(e) => {
            if let Some(mut ds) = new_ds {
                if let Err(cleanup) = truncate(&mut ds, vol.blocks_mut(), 0) {
                    log::error!("[XATTR] failed to reclaim dstream {:#x}: {}", ds.id(), cleanup);
                }
            }
            return Err(report_corrupted(vol, owner, e));
        }
    };

    if let Some(dref) = old {
        release_dstream(vol, &dref)?;
    }
    Ok(())
}

/// 查找并修改 catalog 记录
///
/// 返回被替换掉的旧 dstream（如果有）
fn update_record<C, B, T>(
    vol: &mut Volume<C, B, T>,
    owner: u64,
    name: &[u8],
    value: Option<&[u8]>,
    flags: XattrSetFlags,
    new_ds: Option<&DstreamInfo>,
) -> Result<Option<DstreamRef>>
where
    C: CatalogIndex,
    B: BlockStore,
    T: TransactionManager<C, B>,
{
    let key = encode_key(owner, name)?;
    let found = vol.catalog().query_exact(&key)?;

    let old = match (&found, value) {
        (None, _) if flags.contains(XattrSetFlags::REPLACE) => {
            return Err(Error::new(ErrorKind::NotFound, "xattr not found"));
        }
        (None, None) => return Err(Error::new(ErrorKind::NotFound, "xattr not found")),
        (Some(_), _) if flags.contains(XattrSetFlags::CREATE) => {
            return Err(Error::new(ErrorKind::AlreadyExists, "xattr already exists"));
        }
        (Some(rec), None) => {
            delete_xattr(vol, rec)?;
            return Ok(None);
        }
        (Some(rec), Some(_)) => decode(&rec.key, &rec.val)?.dstream(),
        (None, Some(_)) => None,
    };

    let extra = XattrFlags::for_name(name);
    let val = match new_ds {
        Some(ds) => encode_stream_value(&ds.to_ref(vol.superblock().is_encrypted()), extra),
        None => encode_inline_value(value.unwrap_or_default(), extra)?,
    };

    let parts = vol.parts_mut();
    parts.trans.join(TxResource::Catalog)?;
    if found.is_some() {
        parts.catalog.replace(&key, &val)?;
    } else {
        parts.catalog.insert(&key, &val)?;
    }

    log::debug!(
        "[XATTR] {} xattr of inode {:#x}, {} byte value{}",
        if found.is_some() { "replaced" } else { "created" },
        owner,
        value.map_or(0, <[u8]>::len),
        if new_ds.is_some() { " in dstream" } else { "" }
    );
    Ok(old)
}

/// 删除一条 xattr 记录
///
/// 先删除 catalog 记录，再回收它引用的 dstream
fn delete_xattr<C, B, T>(vol: &mut Volume<C, B, T>, rec: &CatalogRecord) -> Result<()>
where
    C: CatalogIndex,
    B: BlockStore,
    T: TransactionManager<C, B>,
{
    let xattr = decode(&rec.key, &rec.val)?;
    let owner = xattr.owner;
    let dref = xattr.dstream();

    let parts = vol.parts_mut();
    parts.trans.join(TxResource::Catalog)?;
    parts.catalog.remove(rec)?;
    log::debug!("[XATTR] deleted xattr of inode {:#x}", owner);

    if let Some(dref) = dref {
        release_dstream(vol, &dref)?;
    }
    Ok(())
}

/// 截断到 0，回收 dstream 的全部块
fn release_dstream<C, B, T>(vol: &mut Volume<C, B, T>, dref: &DstreamRef) -> Result<()>
where
    C: CatalogIndex,
    B: BlockStore,
    T: TransactionManager<C, B>,
{
    let parts = vol.parts_mut();
    let mut ds = DstreamInfo::from_xattr(dref, parts.blocks.block_size(), parts.config.extent_cache_size);
    truncate(&mut ds, parts.blocks, 0)
}

/// 删除 inode 的所有扩展属性
///
/// 每次删除都可能重组 catalog，所以每删一条就重新查询，直到没有记录。
pub fn delete_all<C, B, T>(vol: &mut Volume<C, B, T>, access: &ExclusiveAccess<'_>, owner: u64) -> Result<()>
where
    C: CatalogIndex,
    B: BlockStore,
    T: TransactionManager<C, B>,
{
    access.assert_held();
    vol.assert_in_transaction()?;

    loop {
        let next = vol.catalog().query_prefix(owner, APFS_TYPE_XATTR)?.next();
        let Some(rec) = next.transpose()? else {
            break;
        };
        delete_xattr(vol, &rec).map_err(|e| report_corrupted(vol, owner, e))?;
    }
    Ok(())
}
