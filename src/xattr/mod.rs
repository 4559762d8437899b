//! APFS 扩展属性 (Extended Attributes) 实现
//!
//! 扩展属性以 name-value 对的形式存储在 catalog 中，key 为
//! (inode, 属性名)。值有两种存储方式：
//!
//! 1. **内联** - 不超过 3804 字节的值直接存放在 catalog 记录中
//! 2. **dstream** - 更大的值存放在独立的块流中，记录里只保存 dstream 引用
//!
//! # 模块结构
//!
//! - `codec` - 记录编解码与结构校验
//! - `read` - 读取（内联与 dstream）
//! - `write` - 创建、替换、删除
//! - `list` - 列出属性名
//! - `prefix` - "osx." 伪命名空间
//! - [`handler`] - 带锁和事务的 VFS 入口
//!
//! # 使用示例
//!
//! ```rust,ignore
//! use apfs_xattr::{fs::{BigSem, MemVolume, NoLock}, xattr::{self, XattrSetFlags}};
//!
//! let mut vol = MemVolume::in_memory(4096, 1024);
//! let sem = BigSem::new(NoLock);
//!
//! xattr::handler::set(&mut vol, &sem, ino, "osx.user.author", Some(b"Alice"), XattrSetFlags::CREATE)?;
//!
//! let mut buf = [0u8; 64];
//! let len = xattr::handler::get(&vol, &sem, ino, "osx.user.author", Some(&mut buf))?;
//!
//! xattr::handler::remove(&mut vol, &sem, ino, "osx.user.author")?;
//! ```

mod codec;
mod list;
mod prefix;
mod read;
mod write;

pub mod handler;

pub use codec::{check_name, decode, encode_inline_value, encode_key, encode_stream_value};
pub use list::list;
pub use prefix::{extract_xattr_name, get_xattr_name_prefix, list_entry_size};
pub use read::{get, get_partial};
pub use write::{delete_all, set, XattrSetFlags};
