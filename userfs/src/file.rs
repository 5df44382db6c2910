use crate::block::Block;

/// A stable index into a [`FileTable`]'s arena. Never reused while a `File`
/// at that slot is live; once the slot is freed a later `create` may hand
/// the same numeric value back out, but never while any descriptor still
/// holds it (ghost semantics keep the slot alive until `refs` drops to 0).
pub type FileId = usize;

/// One file: a name, its block chain, and the bookkeeping needed for
/// ghost-file (delete-while-open) semantics.
pub struct File {
    pub name: String,
    pub blocks: Vec<Block>,
    /// Total size in bytes; equals the sum of `occupied` across fully
    /// committed writes, but is tracked directly rather than recomputed.
    pub size: usize,
    pub ghost: bool,
    pub refs: usize,
}

impl File {
    fn new(name: String) -> Self {
        File {
            name,
            blocks: Vec::new(),
            size: 0,
            ghost: false,
            refs: 0,
        }
    }

    /// Appends a freshly allocated block to the chain and returns its index.
    pub fn push_back_block(&mut self) -> usize {
        self.blocks.push(Block::new());
        self.blocks.len() - 1
    }

    /// Removes the tail block, if any.
    pub fn pop_back_block(&mut self) {
        self.blocks.pop();
    }

    pub fn last_block_index(&self) -> Option<usize> {
        if self.blocks.is_empty() {
            None
        } else {
            Some(self.blocks.len() - 1)
        }
    }
}

/// The set of all files known to a [`crate::Ufs`] instance: a name-indexed
/// table that keeps ghost files alive (but invisible to plain lookups via
/// `find_visible`) until their last descriptor closes.
///
/// Modeled as an arena (`Vec<Option<File>>`) with free-slot reuse rather
/// than the original's intrusive doubly-linked list: `FileId`s are stable
/// across interior removal, satisfying the same "O(1) removal, no iterator
/// invalidation" property the original's linked list gave for free. See
/// DESIGN.md.
#[derive(Default)]
pub struct FileTable {
    slots: Vec<Option<File>>,
}

impl FileTable {
    pub fn new() -> Self {
        FileTable { slots: Vec::new() }
    }

    pub fn get(&self, id: FileId) -> Option<&File> {
        self.slots.get(id).and_then(|s| s.as_ref())
    }

    pub fn get_mut(&mut self, id: FileId) -> Option<&mut File> {
        self.slots.get_mut(id).and_then(|s| s.as_mut())
    }

    /// Linear scan by name. Ghost files are visible to this lookup (they
    /// behave as absent only to `open` without `CREATE`, per spec section
    /// 4.7); a name is expected to appear at most once among *non-ghost*
    /// files, but may additionally appear once among ghost files while a
    /// shadowing `create` has taken place.
    pub fn find(&self, name: &str) -> Option<FileId> {
        self.slots
            .iter()
            .position(|slot| matches!(slot, Some(f) if f.name == name && !f.ghost))
            .or_else(|| {
                self.slots
                    .iter()
                    .position(|slot| matches!(slot, Some(f) if f.name == name))
            })
    }

    /// Creates a new file, reusing the lowest free slot if any. Does not
    /// check for name uniqueness: callers must have already resolved the
    /// name via `find` (spec section 4.7) — this is what lets a ghost file
    /// and its shadowing replacement coexist under the same name.
    pub fn create(&mut self, name: String) -> FileId {
        let file = File::new(name);
        if let Some(id) = self.slots.iter().position(|slot| slot.is_none()) {
            self.slots[id] = Some(file);
            id
        } else {
            self.slots.push(Some(file));
            self.slots.len() - 1
        }
    }

    /// Frees a file's slot (its block chain, name, and record all drop with
    /// it). Caller is responsible for having already checked `refs == 0`.
    pub fn remove(&mut self, id: FileId) {
        self.slots[id] = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_reuses_freed_slots() {
        let mut table = FileTable::new();
        let a = table.create("a".into());
        let b = table.create("b".into());
        table.remove(a);
        let c = table.create("c".into());
        assert_eq!(c, a, "freed slot should be reused before growing");
        assert_ne!(b, c);
    }

    #[test]
    fn find_sees_ghosts_but_prefers_live_file() {
        let mut table = FileTable::new();
        let ghost = table.create("f".into());
        table.get_mut(ghost).unwrap().ghost = true;
        let live = table.create("f".into());

        assert_eq!(table.find("f"), Some(live));
        table.remove(live);
        assert_eq!(table.find("f"), Some(ghost));
    }

    #[test]
    fn chain_push_pop_round_trips() {
        let mut file = File::new("x".into());
        let i0 = file.push_back_block();
        let i1 = file.push_back_block();
        assert_eq!((i0, i1), (0, 1));
        assert_eq!(file.last_block_index(), Some(1));
        file.pop_back_block();
        assert_eq!(file.last_block_index(), Some(0));
        file.pop_back_block();
        assert_eq!(file.last_block_index(), None);
    }
}
