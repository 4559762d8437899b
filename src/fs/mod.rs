//! 卷级对象
//!
//! 这个模块提供 xattr 操作所依附的卷：协作者组合、配置和 big lock。

mod lock;
mod types;
mod volume;

pub use lock::{BigSem, ExclusiveAccess, NoLock, RawBigLock, ReadAccess, SharedAccess};
pub use types::XattrConfig;
pub use volume::{MemVolume, Volume, VolumeParts, VolumeSuperblock};
