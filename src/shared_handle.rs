//! Four-mode permission lattice for concurrent access to an object with a
//! content part and a hash part, used by the trie layer
//! that consumes a [`crate::stock::Stock`] to guard a node's bytes and its
//! cached hash independently: read / view / hash / write.
//!
//! Two `RwLock<()>`s back the four modes, matching how plain `std::sync`
//! primitives are used elsewhere in this crate rather than reaching for
//! `parking_lot` (no async runtime is needed at this layer, and nothing
//! else in the stack pulls it in for non-networked code).
//!
//! |   want \ held | none | read | view | hash | write |
//! |---|:---:|:---:|:---:|:---:|:---:|
//! | read  | v | v | v | v | x |
//! | view  | v | v | v | x | x |
//! | hash  | v | v | x | x | x |
//! | write | v | x | x | x | x |

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// An object shared under the four-mode read/view/hash/write lattice.
/// Carries no payload itself — callers typically store this alongside (or
/// embedded in) the data it guards.
#[derive(Default)]
pub struct SharedObject {
    content: RwLock<()>,
    hash: RwLock<()>,
}

impl SharedObject {
    pub fn new() -> Self {
        SharedObject {
            content: RwLock::new(()),
            hash: RwLock::new(()),
        }
    }

    /// Blocks until a read handle is grantable: blocked only by a held
    /// write handle.
    pub fn read(&self) -> ReadHandle<'_> {
        ReadHandle {
            _content: self.content.read().unwrap(),
        }
    }

    /// Non-blocking [`read`](Self::read).
    pub fn try_read(&self) -> Option<ReadHandle<'_>> {
        self.content
            .try_read()
            .ok()
            .map(|content| ReadHandle { _content: content })
    }

    /// Blocks until a view handle is grantable: blocked by a held hash or
    /// write handle.
    pub fn view(&self) -> ViewHandle<'_> {
        let content = self.content.read().unwrap();
        let hash = self.hash.read().unwrap();
        ViewHandle {
            _content: content,
            _hash: hash,
        }
    }

    /// Non-blocking [`view`](Self::view).
    pub fn try_view(&self) -> Option<ViewHandle<'_>> {
        let content = self.content.try_read().ok()?;
        let hash = self.hash.try_read().ok()?;
        Some(ViewHandle {
            _content: content,
            _hash: hash,
        })
    }

    /// Blocks until a hash handle is grantable: blocked by a held view,
    /// hash, or write handle.
    pub fn hash(&self) -> HashHandle<'_> {
        let content = self.content.read().unwrap();
        let hash = self.hash.write().unwrap();
        HashHandle {
            _content: content,
            _hash: hash,
        }
    }

    /// Non-blocking [`hash`](Self::hash).
    pub fn try_hash(&self) -> Option<HashHandle<'_>> {
        let content = self.content.try_read().ok()?;
        let hash = self.hash.try_write().ok()?;
        Some(HashHandle {
            _content: content,
            _hash: hash,
        })
    }

    /// Blocks until a write handle is grantable: exclusive against every
    /// other mode, including other writers.
    pub fn write(&self) -> WriteHandle<'_> {
        WriteHandle {
            object: self,
            _content: self.content.write().unwrap(),
        }
    }

    /// Non-blocking [`write`](Self::write).
    pub fn try_write(&self) -> Option<WriteHandle<'_>> {
        self.content
            .try_write()
            .ok()
            .map(|content| WriteHandle {
                object: self,
                _content: content,
            })
    }
}

/// Proof of read permission. Opaque and non-copyable; release by dropping
/// or calling [`release`](Self::release).
pub struct ReadHandle<'a> {
    _content: RwLockReadGuard<'a, ()>,
}

impl<'a> ReadHandle<'a> {
    pub fn release(self) {}
}

/// Proof of view permission (read of both content and hash).
pub struct ViewHandle<'a> {
    _content: RwLockReadGuard<'a, ()>,
    _hash: RwLockReadGuard<'a, ()>,
}

impl<'a> ViewHandle<'a> {
    pub fn release(self) {}
}

/// Proof of hash permission (read content, exclusive on hash).
pub struct HashHandle<'a> {
    _content: RwLockReadGuard<'a, ()>,
    _hash: RwLockWriteGuard<'a, ()>,
}

impl<'a> HashHandle<'a> {
    pub fn release(self) {}
}

/// Proof of write permission (exclusive on content).
pub struct WriteHandle<'a> {
    object: &'a SharedObject,
    _content: RwLockWriteGuard<'a, ()>,
}

impl<'a> WriteHandle<'a> {
    pub fn release(self) {}

    /// Downgrades into a read permission proof. `std::sync::RwLock` has no
    /// atomic downgrade primitive, so this releases the exclusive lock
    /// before reacquiring it in shared mode; a writer on another thread can
    /// win the gap in between. The returned handle is a fresh proof of
    /// permission, not a view into the write handle's former lock hold.
    pub fn downgrade_to_read(self) -> ReadHandle<'a> {
        let object = self.object;
        drop(self);
        object.read()
    }

    /// As [`downgrade_to_read`](Self::downgrade_to_read), but to a view
    /// handle.
    pub fn downgrade_to_view(self) -> ViewHandle<'a> {
        let object = self.object;
        drop(self);
        object.view()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiple_reads_coexist() {
        let obj = SharedObject::new();
        let r1 = obj.try_read();
        let r2 = obj.try_read();
        assert!(r1.is_some());
        assert!(r2.is_some());
    }

    #[test]
    fn multiple_views_coexist() {
        let obj = SharedObject::new();
        let v1 = obj.try_view();
        let v2 = obj.try_view();
        assert!(v1.is_some());
        assert!(v2.is_some());
    }

    #[test]
    fn read_coexists_with_hash() {
        let obj = SharedObject::new();
        let _h = obj.try_hash().unwrap();
        assert!(obj.try_read().is_some());
    }

    #[test]
    fn view_blocked_by_hash() {
        let obj = SharedObject::new();
        let _h = obj.try_hash().unwrap();
        assert!(obj.try_view().is_none());
    }

    #[test]
    fn hash_blocked_by_view() {
        let obj = SharedObject::new();
        let _v = obj.try_view().unwrap();
        assert!(obj.try_hash().is_none());
    }

    #[test]
    fn hash_blocked_by_hash() {
        let obj = SharedObject::new();
        let _h1 = obj.try_hash().unwrap();
        assert!(obj.try_hash().is_none());
    }

    #[test]
    fn write_blocked_by_read() {
        let obj = SharedObject::new();
        let _r = obj.try_read().unwrap();
        assert!(obj.try_write().is_none());
    }

    #[test]
    fn write_blocked_by_write() {
        let obj = SharedObject::new();
        let _w1 = obj.try_write().unwrap();
        assert!(obj.try_write().is_none());
    }

    #[test]
    fn read_blocked_by_write() {
        let obj = SharedObject::new();
        let _w = obj.try_write().unwrap();
        assert!(obj.try_read().is_none());
    }

    #[test]
    fn release_frees_the_lock_for_subsequent_acquires() {
        let obj = SharedObject::new();
        let w = obj.try_write().unwrap();
        w.release();
        assert!(obj.try_read().is_some());
    }

    #[test]
    fn write_downgrades_to_read() {
        let obj = SharedObject::new();
        let w = obj.write();
        let r = w.downgrade_to_read();
        // a second reader can now also be granted
        assert!(obj.try_read().is_some());
        r.release();
    }
}
