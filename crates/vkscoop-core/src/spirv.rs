//! SPIR-V version-word helpers.
//!
//! Word 1 of a SPIR-V binary encodes the version as `0x00MMmm00`:
//! major in bits [16, 24), minor in bits [8, 16).

/// Magic number at word 0 of every SPIR-V binary.
pub const SPIRV_MAGIC: u32 = 0x0723_0203;

/// Pack a major/minor pair into a version word.
pub fn version_word(major: u8, minor: u8) -> u32 {
    (u32::from(major) << 16) | (u32::from(minor) << 8)
}

/// Major version from a version word.
pub fn version_major(word: u32) -> u8 {
    ((word >> 16) & 0xff) as u8
}

/// Minor version from a version word.
pub fn version_minor(word: u32) -> u8 {
    ((word >> 8) & 0xff) as u8
}
