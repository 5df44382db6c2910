use crate::file::FileId;
use crate::flags::OpenFlags;

pub type Fd = usize;

/// One open descriptor on a file: independent read/write positions, a
/// current-block cache, and the (already-normalised) rights it was opened
/// with.
pub struct Descriptor {
    pub file: FileId,
    /// Index into the owning file's block chain, valid only while the
    /// descriptor holds exactly one of {read, write}. Holding both
    /// invalidates it unconditionally (spec section 3): with both
    /// permissions the read and write heads may diverge, and a single
    /// cache cannot serve both.
    pub cached_block: Option<usize>,
    pub pos_reading: usize,
    pub pos_writing: usize,
    pub rights: OpenFlags,
}

impl Descriptor {
    pub fn new(file: FileId, rights: OpenFlags) -> Self {
        Descriptor {
            file,
            cached_block: None,
            pos_reading: 0,
            pos_writing: 0,
            rights,
        }
    }

    /// True when the descriptor holds both read and write rights, in which
    /// case the current-block cache must never be trusted.
    pub fn has_mixed_rights(&self) -> bool {
        self.rights.is_readable() && self.rights.is_writable()
    }

    pub fn invalidate_cache(&mut self) {
        self.cached_block = None;
    }
}

/// A sparse, grow-by-one table of open descriptors.
///
/// `alloc` reuses the lowest empty index, matching
/// `get_free_space_in_fd_array`/`resize_fd_array` in the original; the table
/// drops back to capacity 0 once every slot empties (spec section 5), which
/// lets tests observe a clean full teardown.
#[derive(Default)]
pub struct DescriptorTable {
    slots: Vec<Option<Descriptor>>,
}

impl DescriptorTable {
    pub fn new() -> Self {
        DescriptorTable { slots: Vec::new() }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn get(&self, fd: Fd) -> Option<&Descriptor> {
        self.slots.get(fd).and_then(|s| s.as_ref())
    }

    pub fn get_mut(&mut self, fd: Fd) -> Option<&mut Descriptor> {
        self.slots.get_mut(fd).and_then(|s| s.as_mut())
    }

    pub fn alloc(&mut self, descriptor: Descriptor) -> Fd {
        if let Some(fd) = self.slots.iter().position(|slot| slot.is_none()) {
            self.slots[fd] = Some(descriptor);
            fd
        } else {
            self.slots.push(Some(descriptor));
            self.slots.len() - 1
        }
    }

    /// Frees a descriptor's slot. If every slot is now empty, the backing
    /// storage is dropped entirely (capacity returns to 0).
    pub fn free(&mut self, fd: Fd) {
        if fd < self.slots.len() {
            self.slots[fd] = None;
        }
        if self.slots.iter().all(Option::is_none) {
            self.slots.clear();
            self.slots.shrink_to_fit();
        }
    }
}
