//! xattr 读取
//!
//! 对应 `apfs_xattr_get()`、`apfs_xattr_inline_read()` 和
//! `apfs_xattr_extents_read()`

use alloc::vec;
use alloc::vec::Vec;

use super::codec::{check_name, decode, encode_key};
use crate::{
    block::BlockStore,
    catalog::CatalogIndex,
    dstream::DstreamInfo,
    error::{Error, ErrorKind, Result},
    fs::{ReadAccess, Volume, XattrConfig},
    transaction::TransactionManager,
    types::{DstreamRef, Xattr, XattrData},
};

/// 获取扩展属性值
///
/// # 参数
///
/// * `vol` - 卷
/// * `access` - 共享或独占访问能力
/// * `owner` - 所属 inode
/// * `name` - 磁盘属性名（不含 "osx." 前缀）
/// * `buffer` - 输出缓冲区；为 None 时只返回值的长度
///
/// # 返回
///
/// 有缓冲区时返回复制的字节数，否则返回值的长度
///
/// # 错误
///
/// - `NotFound` - 属性不存在
/// - `RangeTooSmall` - 缓冲区放不下整个值
/// - `Corrupted` - 记录或 dstream 损坏
/// - `Io` - dstream 块读取失败
/// - `TooLarge` - 值超过配置的最大长度
pub fn get<C, B, T, A>(
    vol: &Volume<C, B, T>,
    access: &A,
    owner: u64,
    name: &str,
    buffer: Option<&mut [u8]>,
) -> Result<usize>
where
    C: CatalogIndex,
    B: BlockStore,
    T: TransactionManager<C, B>,
    A: ReadAccess,
{
    get_value(vol, access, owner, name, buffer, true)
}

/// 获取扩展属性值的前一部分
///
/// 与 [`get`] 相同，但缓冲区不足时只复制能放下的部分，不报错。
/// 用于只需要读取值头部的场合。
pub fn get_partial<C, B, T, A>(
    vol: &Volume<C, B, T>,
    access: &A,
    owner: u64,
    name: &str,
    buffer: Option<&mut [u8]>,
) -> Result<usize>
where
    C: CatalogIndex,
    B: BlockStore,
    T: TransactionManager<C, B>,
    A: ReadAccess,
{
    get_value(vol, access, owner, name, buffer, false)
}

fn get_value<C, B, T, A>(
    vol: &Volume<C, B, T>,
    _access: &A,
    owner: u64,
    name: &str,
    buffer: Option<&mut [u8]>,
    only_whole: bool,
) -> Result<usize>
where
    C: CatalogIndex,
    B: BlockStore,
    T: TransactionManager<C, B>,
    A: ReadAccess,
{
    let key = encode_key(owner, check_name(name)?)?;
    let rec = vol
        .catalog()
        .query_exact(&key)?
        .ok_or(Error::new(ErrorKind::NotFound, "xattr not found"))?;

    decode(&rec.key, &rec.val)
        .and_then(|xattr| xattr_read(vol.blocks(), vol.config(), &xattr, buffer, only_whole))
        .map_err(|e| report_corrupted(vol, owner, e))
}

/// 损坏错误额外在卷上报告一次
pub(super) fn report_corrupted<C, B, T>(vol: &Volume<C, B, T>, owner: u64, e: Error) -> Error
where
    C: CatalogIndex,
    B: BlockStore,
    T: TransactionManager<C, B>,
{
    if e.is_corrupted() {
        vol.report_corruption(owner);
    }
    e
}

/// 读取已解码记录的值
fn xattr_read<B: BlockStore + ?Sized>(
    blocks: &B,
    config: &XattrConfig,
    xattr: &Xattr<'_>,
    buffer: Option<&mut [u8]>,
    only_whole: bool,
) -> Result<usize> {
    match xattr.data {
        XattrData::Inline(bytes) => inline_read(bytes, buffer, only_whole),
        XattrData::Stream(dref) => extents_read(blocks, config, &dref, buffer, only_whole),
    }
}

/// 内联值读取
fn inline_read(bytes: &[u8], buffer: Option<&mut [u8]>, only_whole: bool) -> Result<usize> {
    let Some(buf) = buffer else {
        return Ok(bytes.len());
    };

    let mut length = bytes.len();
    if length > buf.len() {
        if only_whole {
            return Err(Error::new(ErrorKind::RangeTooSmall, "xattr buffer too small"));
        }
        length = buf.len();
    }
    buf[..length].copy_from_slice(&bytes[..length]);
    Ok(length)
}

/// dstream 值读取
///
/// 先解析所有块的物理地址，再一次性发起所有读取，全部完成后才复制数据。
/// 任意一个块失败则整个读取失败。
fn extents_read<B: BlockStore + ?Sized>(
    blocks: &B,
    config: &XattrConfig,
    dref: &DstreamRef,
    buffer: Option<&mut [u8]>,
    only_whole: bool,
) -> Result<usize> {
    if dref.size > config.max_value_size {
        return Err(Error::new(ErrorKind::TooLarge, "xattr dstream too large"));
    }
    let mut length = usize::try_from(dref.size)
        .map_err(|_| Error::new(ErrorKind::TooLarge, "xattr dstream too large"))?;

    let Some(buf) = buffer else {
        return Ok(length);
    };
    if length > buf.len() {
        if only_whole {
            return Err(Error::new(ErrorKind::RangeTooSmall, "xattr buffer too small"));
        }
        length = buf.len();
    }

    let block_size = blocks.block_size() as usize;
    let mut ds = DstreamInfo::from_xattr(dref, blocks.block_size(), config.extent_cache_size);
    let blkcnt = ds.blocks_for(length as u64);

    let mut paddrs = Vec::with_capacity(blkcnt as usize);
    for logical in 0..blkcnt {
        paddrs.push(ds.resolve_block(blocks, logical)?);
    }

    for &paddr in &paddrs {
        blocks.submit_read(paddr)?;
    }

    let mut staging = vec![0u8; paddrs.len() * block_size];
    for (&paddr, chunk) in paddrs.iter().zip(staging.chunks_mut(block_size)) {
        blocks.read_block(paddr, chunk).map_err(|e| {
            log::warn!("[XATTR] failed to read block {:#x} of dstream {:#x}", paddr, dref.obj_id);
            Error::with_cause(ErrorKind::Io, "xattr dstream read failed", e)
        })?;
    }

    buf[..length].copy_from_slice(&staging[..length]);
    Ok(length)
}
