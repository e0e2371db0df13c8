#![allow(dead_code)]

//! Minimal PAR 2.0 description builder for CLI tests.

use parvet_core::packet::{TYPE_FILE_DESC, TYPE_IFSC, TYPE_MAIN};

pub fn packet(set_id: &[u8; 16], type_tag: &[u8; 16], payload: &[u8]) -> Vec<u8> {
    let total_len = 64 + payload.len() as u64;
    let mut ctx = md5::Context::new();
    ctx.consume(set_id);
    ctx.consume(type_tag);
    ctx.consume(payload);
    let digest: [u8; 16] = ctx.compute().0;
    let mut out = Vec::with_capacity(64 + payload.len());
    out.extend_from_slice(b"PAR2\0PKT");
    out.extend_from_slice(&total_len.to_le_bytes());
    out.extend_from_slice(&digest);
    out.extend_from_slice(set_id);
    out.extend_from_slice(type_tag);
    out.extend_from_slice(payload);
    out
}

pub fn block_hashes(data: &[u8], slice_len: usize) -> Vec<[u8; 16]> {
    data.chunks(slice_len)
        .map(|c| {
            let mut buf = c.to_vec();
            buf.resize(slice_len, 0);
            md5::compute(&buf).0
        })
        .collect()
}

/// Complete description (main + descriptor + block checksums per file) for
/// files given as (id, name, contents).
pub fn description(set_id: &[u8; 16], slice_len: u64, files: &[([u8; 16], &str, &[u8])]) -> Vec<u8> {
    let mut main = Vec::new();
    main.extend_from_slice(&slice_len.to_le_bytes());
    main.extend_from_slice(&(files.len() as u32).to_le_bytes());
    for (id, _, _) in files {
        main.extend_from_slice(id);
    }
    let mut out = packet(set_id, &TYPE_MAIN, &main);

    for (id, name, data) in files {
        let mut desc = Vec::new();
        desc.extend_from_slice(id);
        desc.extend_from_slice(&[0u8; 32]);
        desc.extend_from_slice(&(data.len() as u64).to_le_bytes());
        desc.extend_from_slice(name.as_bytes());
        while desc.len() % 4 != 0 {
            desc.push(0);
        }
        out.extend_from_slice(&packet(set_id, &TYPE_FILE_DESC, &desc));

        let mut sums = Vec::new();
        sums.extend_from_slice(id);
        for h in block_hashes(data, slice_len as usize) {
            sums.extend_from_slice(&h);
            sums.extend_from_slice(&[0u8; 4]);
        }
        out.extend_from_slice(&packet(set_id, &TYPE_IFSC, &sums));
    }
    out
}
