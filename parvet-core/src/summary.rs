//! Serializable projection of an assembled fileset for reporting.

use crate::fileset::Fileset;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct FileSummary {
    pub file_id_hex: String,
    pub name: String,
    pub length: u64,
    pub block_count: usize,
    pub has_checksums: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SetSummary {
    pub set_id_hex: String,
    pub slice_len: u64,
    pub complete: bool,
    pub files: Vec<FileSummary>,
}

impl Fileset {
    /// Snapshot of the set, files sorted by name (nameless placeholders
    /// first) so output is stable across runs.
    pub fn summary(&self) -> SetSummary {
        let mut files: Vec<FileSummary> = self
            .files()
            .map(|(id, f)| FileSummary {
                file_id_hex: hex(id),
                name: f.name.clone(),
                length: f.length,
                block_count: f.block_count(self.slice_len()),
                has_checksums: f.checksums().is_some(),
            })
            .collect();
        files.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.file_id_hex.cmp(&b.file_id_hex)));
        SetSummary {
            set_id_hex: self.set_id().map(|id| hex(id)).unwrap_or_default(),
            slice_len: self.slice_len(),
            complete: self.can_verify(),
            files,
        }
    }
}

pub fn hex(bytes: &[u8]) -> String {
    const LUT: &[u8; 16] = b"0123456789abcdef";
    let mut s = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        s.push(LUT[(b >> 4) as usize] as char);
        s.push(LUT[(b & 0xF) as usize] as char);
    }
    s
}
