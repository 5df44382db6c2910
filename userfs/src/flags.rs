use bitflags::bitflags;

bitflags! {
    /// Flags accepted by [`crate::Ufs::open`].
    ///
    /// Bit positions are part of the observable API (spec section 6) and
    /// must not change: `CREATE = 1, READ = 2, WRITE = 4, APPEND = 8`.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct OpenFlags: u8 {
        const CREATE = 0b0001;
        const READ   = 0b0010;
        const WRITE  = 0b0100;
        const APPEND = 0b1000;
    }
}

impl OpenFlags {
    /// `READ | WRITE`, the convenience combination named in spec section 6.
    pub const READ_WRITE: OpenFlags = OpenFlags::READ.union(OpenFlags::WRITE);

    /// Applies the "neither READ nor WRITE requested" normalisation from
    /// spec section 4.8: such a descriptor is promoted to
    /// `READ | WRITE | APPEND`, a permissive default meant for quick manual
    /// testing of the filesystem.
    pub fn normalised(self) -> OpenFlags {
        if !self.intersects(OpenFlags::READ | OpenFlags::WRITE) {
            self | OpenFlags::READ | OpenFlags::WRITE | OpenFlags::APPEND
        } else {
            self
        }
    }

    pub fn is_readable(self) -> bool {
        self.contains(OpenFlags::READ)
    }

    pub fn is_writable(self) -> bool {
        self.contains(OpenFlags::WRITE)
    }

    pub fn is_append(self) -> bool {
        self.contains(OpenFlags::APPEND)
    }

    pub fn is_create(self) -> bool {
        self.contains(OpenFlags::CREATE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_positions_are_pinned() {
        assert_eq!(OpenFlags::CREATE.bits(), 1);
        assert_eq!(OpenFlags::READ.bits(), 2);
        assert_eq!(OpenFlags::WRITE.bits(), 4);
        assert_eq!(OpenFlags::APPEND.bits(), 8);
        assert_eq!(OpenFlags::READ_WRITE.bits(), 6);
    }

    #[test]
    fn normalises_neither_read_nor_write() {
        let f = OpenFlags::CREATE.normalised();
        assert!(f.is_readable());
        assert!(f.is_writable());
        assert!(f.is_append());
    }

    #[test]
    fn leaves_explicit_rights_alone() {
        let f = OpenFlags::WRITE.normalised();
        assert!(!f.is_readable());
        assert!(f.is_writable());
        assert!(!f.is_append());
    }
}
