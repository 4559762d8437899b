//! 卷级读写锁（big lock）
//!
//! 对应 APFS 容器的 `nx_big_sem`
//!
//! 读操作（get/list）需要共享访问，修改操作（set/delete_all）需要独占访问。
//! 访问权以能力对象的形式传给各个操作：
//!
//! ```rust,ignore
//! let sem = BigSem::new(NoLock);
//!
//! let access = sem.read();
//! let len = xattr::get(&vol, &access, ino, "user.a", None)?;
//! drop(access);
//!
//! let access = sem.write();
//! xattr::delete_all(&mut vol, &access, ino)?;
//! ```

/// 底层读写锁
///
/// # 设计说明
///
/// - `NoLock` - 单线程环境，无锁（默认）
/// - `parking_lot::RawRwLock` - 多线程环境（需要 `std` 特性）
/// - 自定义锁实现
pub trait RawBigLock: Send + Sync {
    /// 获取共享锁
    fn lock_shared(&self);

    /// 释放共享锁
    fn unlock_shared(&self);

    /// 获取独占锁
    fn lock_exclusive(&self);

    /// 释放独占锁
    fn unlock_exclusive(&self);

    /// 是否被独占持有
    fn is_locked_exclusive(&self) -> bool;
}

/// 无锁实现
///
/// 用于单线程环境，独占检查总是成功
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLock;

impl RawBigLock for NoLock {
    #[inline]
    fn lock_shared(&self) {}

    #[inline]
    fn unlock_shared(&self) {}

    #[inline]
    fn lock_exclusive(&self) {}

    #[inline]
    fn unlock_exclusive(&self) {}

    #[inline]
    fn is_locked_exclusive(&self) -> bool {
        true
    }
}

#[cfg(feature = "std")]
mod std_locks {
    use super::RawBigLock;

    impl RawBigLock for parking_lot::RawRwLock {
        fn lock_shared(&self) {
            parking_lot::lock_api::RawRwLock::lock_shared(self);
        }

        fn unlock_shared(&self) {
            // SAFETY: 只由 SharedAccess 的 Drop 调用，与 lock_shared 一一对应
            unsafe { parking_lot::lock_api::RawRwLock::unlock_shared(self) }
        }

        fn lock_exclusive(&self) {
            parking_lot::lock_api::RawRwLock::lock_exclusive(self);
        }

        fn unlock_exclusive(&self) {
            // SAFETY: 只由 ExclusiveAccess 的 Drop 调用，与 lock_exclusive 一一对应
            unsafe { parking_lot::lock_api::RawRwLock::unlock_exclusive(self) }
        }

        fn is_locked_exclusive(&self) -> bool {
            parking_lot::lock_api::RawRwLock::is_locked_exclusive(self)
        }
    }
}

/// 卷级读写信号量
#[derive(Debug, Default)]
pub struct BigSem<L: RawBigLock = NoLock> {
    raw: L,
}

impl<L: RawBigLock> BigSem<L> {
    /// 用底层锁创建信号量
    pub const fn new(raw: L) -> Self {
        Self { raw }
    }

    /// 底层锁
    pub fn raw(&self) -> &L {
        &self.raw
    }

    /// 获取共享访问
    pub fn read(&self) -> SharedAccess<'_> {
        self.raw.lock_shared();
        SharedAccess { raw: &self.raw }
    }

    /// 获取独占访问
    pub fn write(&self) -> ExclusiveAccess<'_> {
        self.raw.lock_exclusive();
        ExclusiveAccess { raw: &self.raw }
    }
}

/// 共享访问能力，Drop 时释放
pub struct SharedAccess<'a> {
    raw: &'a dyn RawBigLock,
}

impl Drop for SharedAccess<'_> {
    fn drop(&mut self) {
        self.raw.unlock_shared();
    }
}

/// 独占访问能力，Drop 时释放
pub struct ExclusiveAccess<'a> {
    raw: &'a dyn RawBigLock,
}

impl ExclusiveAccess<'_> {
    /// 断言锁仍被独占持有
    ///
    /// 对应 `lockdep_assert_held_write()`
    pub fn assert_held(&self) {
        debug_assert!(self.raw.is_locked_exclusive(), "big lock not held for write");
    }
}

impl Drop for ExclusiveAccess<'_> {
    fn drop(&mut self) {
        self.raw.unlock_exclusive();
    }
}

mod sealed {
    pub trait Sealed {}
}

/// 允许读取的访问能力（共享或独占）
pub trait ReadAccess: sealed::Sealed {}

impl sealed::Sealed for SharedAccess<'_> {}
impl sealed::Sealed for ExclusiveAccess<'_> {}
impl ReadAccess for SharedAccess<'_> {}
impl ReadAccess for ExclusiveAccess<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn needs_read<A: ReadAccess>(_access: &A) -> bool {
        true
    }

    #[test]
    fn test_no_lock() {
        let sem = BigSem::new(NoLock);
        let shared = sem.read();
        assert!(needs_read(&shared));
        drop(shared);

        let exclusive = sem.write();
        exclusive.assert_held();
        assert!(needs_read(&exclusive));
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_parking_lot_lock() {
        use parking_lot::lock_api::RawRwLock as _;

        let sem = BigSem::new(<parking_lot::RawRwLock as parking_lot::lock_api::RawRwLock>::INIT);
        {
            let _shared = sem.read();
            assert!(!sem.raw().try_lock_exclusive());
            let _shared2 = sem.read();
        }

        let exclusive = sem.write();
        exclusive.assert_held();
        assert!(!sem.raw().try_lock_shared());
        drop(exclusive);

        assert!(!RawBigLock::is_locked_exclusive(sem.raw()));
    }
}
