//! xattr 记录编解码
//!
//! 对应 `apfs_xattr_from_query()`、`apfs_build_xattr_key()`、
//! `apfs_build_inline_xattr()` 和 `apfs_build_dstream_xattr()`。
//!
//! 记录的结构校验只在 [`decode`] 中进行，其余模块拿到的都是已校验的
//! [`Xattr`]。

use alloc::vec;
use alloc::vec::Vec;

use byteorder::{ByteOrder, LittleEndian};

use crate::{
    consts::*,
    error::{Error, ErrorKind, Result},
    types::{DstreamRef, Xattr, XattrData, XattrFlags},
};

const fn corrupted(message: &'static str) -> Error {
    Error::new(ErrorKind::Corrupted, message)
}

/// 解码 catalog 查询返回的 xattr 记录
///
/// # 参数
///
/// * `key` - 原始 key 字节
/// * `val` - 原始 value 字节
///
/// # 返回
///
/// 校验通过的记录，名称和内联值借用自输入
///
/// # 错误
///
/// 任何布局不一致都返回 `Corrupted`：
/// - key 头部不完整或记录类型不是 xattr
/// - 名称为空，或 name_len 字段与实际长度不一致
/// - 名称没有以 NUL 结尾
/// - dstream 记录的 xdata 长度不等于 dstream 引用大小
/// - 内联记录的 xdata_len 字段与实际长度不一致
pub fn decode<'a>(key: &'a [u8], val: &'a [u8]) -> Result<Xattr<'a>> {
    if key.len() < XATTR_KEY_HDR_SIZE {
        return Err(corrupted("xattr key too short"));
    }
    let hdr = LittleEndian::read_u64(&key[..8]);
    if (hdr & OBJ_TYPE_MASK) >> OBJ_TYPE_SHIFT != u64::from(APFS_TYPE_XATTR) {
        return Err(corrupted("not an xattr record"));
    }

    let raw_name = &key[XATTR_KEY_HDR_SIZE..];
    let name_len = usize::from(LittleEndian::read_u16(&key[8..10]));
    if name_len == 0 || raw_name.is_empty() {
        return Err(corrupted("empty xattr name"));
    }
    if name_len != raw_name.len() {
        return Err(corrupted("xattr name length mismatch"));
    }
    let (&last, name) = raw_name.split_last().ok_or(corrupted("empty xattr name"))?;
    if last != 0 {
        return Err(corrupted("xattr name not NUL terminated"));
    }
    if name.is_empty() {
        return Err(corrupted("empty xattr name"));
    }

    if val.len() < XATTR_VAL_HDR_SIZE {
        return Err(corrupted("xattr value too short"));
    }
    let flags = XattrFlags::from_bits_retain(LittleEndian::read_u16(&val[..2]));
    let xdata_len = usize::from(LittleEndian::read_u16(&val[2..4]));
    let xdata = &val[XATTR_VAL_HDR_SIZE..];

    let data = if flags.contains(XattrFlags::DATA_STREAM) {
        if xdata.len() != XATTR_DSTREAM_SIZE {
            return Err(corrupted("bad xattr dstream size"));
        }
        XattrData::Stream(DstreamRef {
            obj_id: LittleEndian::read_u64(&xdata[0..8]),
            size: LittleEndian::read_u64(&xdata[8..16]),
            alloced_size: LittleEndian::read_u64(&xdata[16..24]),
            default_crypto_id: LittleEndian::read_u64(&xdata[24..32]),
        })
    } else {
        if xdata.len() != xdata_len {
            return Err(corrupted("xattr value length mismatch"));
        }
        XattrData::Inline(xdata)
    };

    Ok(Xattr {
        owner: hdr & OBJ_ID_MASK,
        name,
        flags,
        data,
    })
}

/// 检查调用者传入的属性名
///
/// 名称不能为空，也不能包含 NUL（磁盘上 NUL 是结束符）
pub fn check_name(name: &str) -> Result<&[u8]> {
    if name.is_empty() {
        return Err(Error::new(ErrorKind::InvalidInput, "empty xattr name"));
    }
    if name.as_bytes().contains(&0) {
        return Err(Error::new(ErrorKind::InvalidInput, "NUL in xattr name"));
    }
    Ok(name.as_bytes())
}

/// 构造 xattr catalog key
///
/// `name` 不含结尾 NUL，编码时自动追加
pub fn encode_key(owner: u64, name: &[u8]) -> Result<Vec<u8>> {
    let name_len = u16::try_from(name.len() + 1)
        .map_err(|_| Error::new(ErrorKind::InvalidInput, "xattr name too long"))?;

    let mut key = vec![0u8; XATTR_KEY_HDR_SIZE + usize::from(name_len)];
    LittleEndian::write_u64(
        &mut key[..8],
        (owner & OBJ_ID_MASK) | (u64::from(APFS_TYPE_XATTR) << OBJ_TYPE_SHIFT),
    );
    LittleEndian::write_u16(&mut key[8..10], name_len);
    key[XATTR_KEY_HDR_SIZE..XATTR_KEY_HDR_SIZE + name.len()].copy_from_slice(name);
    Ok(key)
}

/// 构造内联 xattr value
///
/// `extra` 为附加标志（如 FILE_SYSTEM_OWNED），DATA_EMBEDDED 自动设置
pub fn encode_inline_value(value: &[u8], extra: XattrFlags) -> Result<Vec<u8>> {
    let len = u16::try_from(value.len())
        .map_err(|_| Error::new(ErrorKind::TooLarge, "inline xattr value too large"))?;

    let mut val = vec![0u8; XATTR_VAL_HDR_SIZE + value.len()];
    LittleEndian::write_u16(&mut val[0..2], (extra | XattrFlags::DATA_EMBEDDED).bits());
    LittleEndian::write_u16(&mut val[2..4], len);
    val[XATTR_VAL_HDR_SIZE..].copy_from_slice(value);
    Ok(val)
}

/// 构造 dstream xattr value
///
/// 统计字段写 0
pub fn encode_stream_value(dref: &DstreamRef, extra: XattrFlags) -> Vec<u8> {
    let mut val = vec![0u8; XATTR_VAL_HDR_SIZE + XATTR_DSTREAM_SIZE];
    LittleEndian::write_u16(&mut val[0..2], (extra | XattrFlags::DATA_STREAM).bits());
    LittleEndian::write_u16(&mut val[2..4], XATTR_DSTREAM_SIZE as u16);

    let xdata = &mut val[XATTR_VAL_HDR_SIZE..];
    LittleEndian::write_u64(&mut xdata[0..8], dref.obj_id);
    LittleEndian::write_u64(&mut xdata[8..16], dref.size);
    LittleEndian::write_u64(&mut xdata[16..24], dref.alloced_size);
    LittleEndian::write_u64(&mut xdata[24..32], dref.default_crypto_id);
    val
}
