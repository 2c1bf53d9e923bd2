//! Host byte order normalization.
//!
//! The wire is always little-endian. Values are produced in host order and
//! passed through [`canonicalize`], which reverses them on big-endian hosts.
//! The same call converts wire bytes back to host order.

/// Byte order of a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    /// Byte order of the compilation target.
    pub const NATIVE: Endian = if cfg!(target_endian = "big") {
        Endian::Big
    } else {
        Endian::Little
    };
}

/// Convert between host order (for `host`) and wire order.
pub fn canonicalize<const N: usize>(mut bytes: [u8; N], host: Endian) -> [u8; N] {
    canonicalize_in_place(&mut bytes, host);
    bytes
}

/// In-place variant of [`canonicalize`].
pub fn canonicalize_in_place(bytes: &mut [u8], host: Endian) {
    if host == Endian::Big {
        bytes.reverse();
    }
}
