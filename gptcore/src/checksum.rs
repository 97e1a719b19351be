// SPDX-License-Identifier: MIT

//! CRC-32 (ISO-HDLC, the zlib/Ethernet variant) over GPT structures.

use crate::layout::HDR_HEADER_CRC32;

const CRC_FIELD_LEN: usize = 4;

/// CRC-32 of `raw` (the first `header_size` bytes of a header) with the
/// stored checksum at offset 16..20 treated as zero.
pub fn header_crc32(raw: &[u8]) -> u32 {
    let split = HDR_HEADER_CRC32.min(raw.len());
    let (head, rest) = raw.split_at(split);
    let zeroed = rest.len().min(CRC_FIELD_LEN);

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(head);
    hasher.update(&[0u8; CRC_FIELD_LEN][..zeroed]);
    hasher.update(&rest[zeroed..]);
    hasher.finalize()
}

/// CRC-32 over the raw entry array, every slot included.
#[inline]
pub fn table_crc32(raw: &[u8]) -> u32 {
    crc32fast::hash(raw)
}
