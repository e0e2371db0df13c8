//! Folds decoded packets into the cross-referenced index verification runs
//! against: file records keyed by id, plus a global block-checksum lookup.

use crate::framer;
use crate::packet::{
    decode_block_checksums, decode_file_desc, decode_main, BlockHash, FileDescPacket, FileId,
    PacketType, SetId,
};
use std::collections::HashMap;
use std::io::{BufReader, Read};
use std::sync::atomic::{AtomicBool, Ordering};

/// One file covered by a description. Three packet types can observe a file
/// in any order, so records start as placeholders and fill in incrementally;
/// a field is never overwritten once set.
#[derive(Debug, Clone, Default)]
pub struct FileEntry {
    pub name: String,
    pub length: u64,
    pub(crate) checksums: Option<Vec<BlockHash>>,
}

impl FileEntry {
    /// Number of slice-length blocks covering this file.
    pub fn block_count(&self, slice_len: u64) -> usize {
        if slice_len == 0 {
            return 0;
        }
        self.length.div_ceil(slice_len) as usize
    }

    pub fn checksums(&self) -> Option<&[BlockHash]> {
        self.checksums.as_deref()
    }

    /// Fill-if-empty merge. The descriptor may arrive after the file was
    /// discovered through a checksum or set-descriptor packet.
    fn merge_descriptor(&mut self, desc: FileDescPacket) {
        if self.name.is_empty() {
            self.name = desc.name;
            self.length = desc.length;
        }
    }
}

/// Non-owning handle from a block checksum back into the owning file table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRef {
    pub file_id: FileId,
    pub block_index: usize,
}

/// The parsed aggregate of all packets belonging to one set identifier.
/// Built once by [`Fileset::from_reader`]; immutable afterwards except for
/// the cached completeness flag.
#[derive(Debug, Default)]
pub struct Fileset {
    set_id: Option<SetId>,
    slice_len: u64,
    complete: AtomicBool,
    files: HashMap<FileId, FileEntry>,
    checksums: HashMap<BlockHash, BlockRef>,
}

impl Fileset {
    /// Assemble a fileset from a description stream. Best effort by
    /// contract: corrupt packets are skipped, a read failure ends the pass,
    /// and whatever was folded so far is returned. Callers probe
    /// [`Fileset::can_verify`] before relying on the result.
    pub fn from_reader<R: Read>(reader: R) -> Fileset {
        let mut r = BufReader::new(reader);
        let mut fset = Fileset::default();
        loop {
            let hdr = match framer::read_header(&mut r) {
                Ok(h) => h,
                Err(_) => break,
            };
            match fset.set_id {
                None => fset.set_id = Some(hdr.set_id),
                // A different set id means an unrelated description got
                // concatenated onto this one. Stop rather than guess.
                Some(id) if id != hdr.set_id => return fset,
                Some(_) => {}
            }
            match hdr.packet_type {
                PacketType::Main => {
                    let Ok(payload) = framer::read_payload(&mut r, &hdr) else { continue };
                    let Some(pkt) = decode_main(&payload) else { continue };
                    fset.slice_len = pkt.slice_len;
                    for id in pkt.file_ids {
                        fset.files.entry(id).or_default();
                    }
                }
                PacketType::FileDesc => {
                    let Ok(payload) = framer::read_payload(&mut r, &hdr) else { continue };
                    let Some(pkt) = decode_file_desc(&payload) else { continue };
                    fset.files.entry(pkt.file_id).or_default().merge_descriptor(pkt);
                }
                PacketType::BlockChecksums => {
                    let Ok(payload) = framer::read_payload(&mut r, &hdr) else { continue };
                    let Some(pkt) = decode_block_checksums(&payload) else { continue };
                    fset.fold_block_checksums(pkt.file_id, pkt.block_hashes);
                }
                // Recovery slices are recognized but never decoded here, and
                // unknown tags are skipped. Their payloads are not consumed
                // by declared length either: scanning resumes right after
                // the header, so a mangled length cannot jump past valid
                // packets.
                PacketType::RecoverySlice | PacketType::Creator | PacketType::Unknown => {}
            }
        }
        fset.can_verify();
        fset
    }

    /// First checksum list for a file wins, and only that first list is
    /// indexed into the global map. On colliding block hashes the last
    /// indexed block wins.
    fn fold_block_checksums(&mut self, file_id: FileId, block_hashes: Vec<BlockHash>) {
        let entry = self.files.entry(file_id).or_default();
        if entry.checksums.is_some() {
            return;
        }
        for (block_index, hash) in block_hashes.iter().enumerate() {
            self.checksums.insert(*hash, BlockRef { file_id, block_index });
        }
        entry.checksums = Some(block_hashes);
    }

    /// Whether the fileset can be used for verification: a known slice
    /// length, and a name plus checksum list for every known file.
    /// Idempotent; once true it stays true.
    pub fn can_verify(&self) -> bool {
        if self.complete.load(Ordering::Relaxed) {
            return true;
        }
        if self.slice_len == 0 {
            return false;
        }
        for file in self.files.values() {
            if file.name.is_empty() || file.checksums.is_none() {
                return false;
            }
        }
        self.complete.store(true, Ordering::Relaxed);
        true
    }

    pub fn set_id(&self) -> Option<&SetId> {
        self.set_id.as_ref()
    }

    /// Block size shared by the whole set; 0 until a set descriptor is seen.
    pub fn slice_len(&self) -> u64 {
        self.slice_len
    }

    pub fn file(&self, id: &FileId) -> Option<&FileEntry> {
        self.files.get(id)
    }

    pub fn files(&self) -> impl Iterator<Item = (&FileId, &FileEntry)> {
        self.files.iter()
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub(crate) fn lookup_block(&self, hash: &BlockHash) -> Option<BlockRef> {
        self.checksums.get(hash).copied()
    }
}
