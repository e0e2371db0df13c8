//! Locates packet boundaries in a corruption-tolerant byte stream and
//! verifies packet integrity before any payload is decoded.

use crate::packet::{PacketHeader, PacketType, HEADER_LEN, PACKET_MAGIC};
use anyhow::{bail, Result};
use std::io::Read;

/// Upper bound on a declared payload length. The decoded packet types are
/// tiny in any real description; anything larger is treated as corruption
/// so a mangled length field cannot drive an allocation.
pub const MAX_PAYLOAD_LEN: u64 = 64 * 1024 * 1024;

/// Scan forward until the 8-byte packet magic has been consumed.
///
/// Single-byte automaton over the prefix-match length: on a mismatching
/// byte the state resets to 1 if that byte itself starts a new match,
/// otherwise to 0. Corruption may leave the stream unaligned, so this is
/// the only way packets are ever located.
fn find_marker<R: Read>(r: &mut R) -> std::io::Result<()> {
    let mut matched = 0usize;
    let mut byte = [0u8; 1];
    while matched < PACKET_MAGIC.len() {
        r.read_exact(&mut byte)?;
        if PACKET_MAGIC[matched] == byte[0] {
            matched += 1;
            continue;
        }
        matched = usize::from(PACKET_MAGIC[0] == byte[0]);
    }
    Ok(())
}

/// Find the next marker and decode the remaining 56 fixed header bytes.
/// Any read failure here ends the assembly pass.
pub fn read_header<R: Read>(r: &mut R) -> std::io::Result<PacketHeader> {
    find_marker(r)?;
    let mut buf = [0u8; 56];
    r.read_exact(&mut buf)?;
    let total_len = u64::from_le_bytes(buf[..8].try_into().unwrap());
    // Declared length counts the header; callers only care about the payload.
    let payload_len = total_len.saturating_sub(HEADER_LEN);
    let packet_hash: [u8; 16] = buf[8..24].try_into().unwrap();
    let hashed_tail: [u8; 32] = buf[24..56].try_into().unwrap();
    let set_id: [u8; 16] = buf[24..40].try_into().unwrap();
    let tag: [u8; 16] = buf[40..56].try_into().unwrap();
    Ok(PacketHeader {
        payload_len,
        packet_hash,
        set_id,
        packet_type: PacketType::from_tag(&tag),
        hashed_tail,
    })
}

/// Read the packet's payload and check the declared MD5, which covers the
/// set id, the type tag, and the payload. A short read, an oversized
/// declared length, or a digest mismatch rejects the packet; the caller
/// resumes scanning at the next marker.
pub fn read_payload<R: Read>(r: &mut R, hdr: &PacketHeader) -> Result<Vec<u8>> {
    if hdr.payload_len > MAX_PAYLOAD_LEN {
        bail!("declared payload length {} exceeds cap", hdr.payload_len);
    }
    let mut buf = vec![0u8; hdr.payload_len as usize];
    r.read_exact(&mut buf)?;
    let mut ctx = md5::Context::new();
    ctx.consume(hdr.hashed_tail);
    ctx.consume(&buf);
    if ctx.compute().0 != hdr.packet_hash {
        bail!("packet MD5 does not match packet contents");
    }
    Ok(buf)
}
