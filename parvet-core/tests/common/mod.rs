#![allow(dead_code)]

//! Builders that synthesize well-formed PAR 2.0 description streams for
//! tests. The packet MD5 covers set id + type tag + payload, matching what
//! the assembler checks.

use parvet_core::packet::{TYPE_FILE_DESC, TYPE_IFSC, TYPE_MAIN};

pub const MAGIC: &[u8; 8] = b"PAR2\0PKT";

pub fn packet(set_id: &[u8; 16], type_tag: &[u8; 16], payload: &[u8]) -> Vec<u8> {
    let total_len = 64 + payload.len() as u64;
    let mut ctx = md5::Context::new();
    ctx.consume(set_id);
    ctx.consume(type_tag);
    ctx.consume(payload);
    let digest: [u8; 16] = ctx.compute().0;
    let mut out = Vec::with_capacity(64 + payload.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&total_len.to_le_bytes());
    out.extend_from_slice(&digest);
    out.extend_from_slice(set_id);
    out.extend_from_slice(type_tag);
    out.extend_from_slice(payload);
    out
}

pub fn main_packet(set_id: &[u8; 16], slice_len: u64, file_ids: &[[u8; 16]]) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&slice_len.to_le_bytes());
    payload.extend_from_slice(&(file_ids.len() as u32).to_le_bytes());
    for id in file_ids {
        payload.extend_from_slice(id);
    }
    packet(set_id, &TYPE_MAIN, &payload)
}

pub fn file_desc_packet(set_id: &[u8; 16], file_id: &[u8; 16], length: u64, name: &str) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(file_id);
    payload.extend_from_slice(&[0u8; 16]); // whole-file MD5, unused
    payload.extend_from_slice(&[0u8; 16]); // 16 KiB-prefix MD5, unused
    payload.extend_from_slice(&length.to_le_bytes());
    payload.extend_from_slice(name.as_bytes());
    // names are NUL-padded to a multiple of 4 on the wire
    while payload.len() % 4 != 0 {
        payload.push(0);
    }
    packet(set_id, &TYPE_FILE_DESC, &payload)
}

pub fn checksums_packet(set_id: &[u8; 16], file_id: &[u8; 16], hashes: &[[u8; 16]]) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(file_id);
    for h in hashes {
        payload.extend_from_slice(h);
        payload.extend_from_slice(&[0u8; 4]); // per-block CRC, unused
    }
    packet(set_id, &TYPE_IFSC, &payload)
}

/// MD5 of one block, zero-extended to the slice length as the format
/// requires for a short final block.
pub fn block_md5(block: &[u8], slice_len: usize) -> [u8; 16] {
    let mut buf = block.to_vec();
    buf.resize(slice_len, 0);
    md5::compute(&buf).0
}

pub fn block_hashes(data: &[u8], slice_len: usize) -> Vec<[u8; 16]> {
    data.chunks(slice_len).map(|c| block_md5(c, slice_len)).collect()
}

/// Canonical-order description (main, then per file: descriptor + block
/// checksums) for files given as (id, name, contents).
pub fn description(set_id: &[u8; 16], slice_len: u64, files: &[([u8; 16], &str, &[u8])]) -> Vec<u8> {
    let ids: Vec<[u8; 16]> = files.iter().map(|(id, _, _)| *id).collect();
    let mut out = main_packet(set_id, slice_len, &ids);
    for (id, name, data) in files {
        out.extend_from_slice(&file_desc_packet(set_id, id, data.len() as u64, name));
        out.extend_from_slice(&checksums_packet(
            set_id,
            id,
            &block_hashes(data, slice_len as usize),
        ));
    }
    out
}
