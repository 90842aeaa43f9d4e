//! DatasetFingerprint - change detection digest

use std::fmt;

/// Digest over the ordered `(id, updated_at, name)` tuples of one poll.
///
/// Only ever compared for equality; the bytes carry no other meaning.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct DatasetFingerprint([u8; 32]);

impl DatasetFingerprint {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Short hex prefix for logs
    pub fn short(&self) -> String {
        self.0[..6].iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Debug for DatasetFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DatasetFingerprint({})", self.short())
    }
}

impl fmt::Display for DatasetFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short())
    }
}
