//! Streams candidate files block by block and matches the block hashes
//! against an assembled fileset.

use crate::fileset::Fileset;
use crate::packet::FileId;
use crate::progress::Progress;
use rayon::prelude::*;
use std::collections::HashSet;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};

/// Bit vector of matched block indexes, growing as bits are set.
#[derive(Debug, Clone, Default)]
pub struct BlockBitmap {
    words: Vec<u64>,
}

impl BlockBitmap {
    pub fn set(&mut self, index: usize) {
        let word = index / 64;
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        self.words[word] |= 1 << (index % 64);
    }

    pub fn get(&self, index: usize) -> bool {
        self.words.get(index / 64).is_some_and(|w| w >> (index % 64) & 1 == 1)
    }

    /// Unset bits within `[0, block_count)`.
    pub fn missing_in(&self, block_count: usize) -> usize {
        (0..block_count).filter(|&i| !self.get(i)).count()
    }

    pub fn matched(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }
}

#[derive(Debug)]
pub enum MatchError {
    /// The file is described by the set but no supplied path matched it.
    Missing,
    /// The candidate path could not be opened.
    Open(std::io::Error),
}

impl fmt::Display for MatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchError::Missing => write!(f, "file missing"),
            MatchError::Open(e) => write!(f, "open failed: {e}"),
        }
    }
}

impl std::error::Error for MatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MatchError::Missing => None,
            MatchError::Open(e) => Some(e),
        }
    }
}

/// Outcome of verifying one candidate path, or the missing-file report for
/// a described file no path matched.
///
/// A path binds to at most one file: the first matched block decides, and
/// later matches pointing at a different file are discarded as checksum
/// collisions. A file colliding with an already-bound one can therefore
/// look more incomplete than it is.
#[derive(Debug)]
pub struct FileMatch {
    /// Candidate path; `None` on missing-file reports.
    pub path: Option<PathBuf>,
    pub error: Option<MatchError>,
    /// Id of the bound file, resolvable through [`Fileset::file`].
    pub file_id: Option<FileId>,
    pub blocks: Option<BlockBitmap>,
}

impl Fileset {
    /// Verify the files at `paths` against this set. Returns the matches
    /// and the total number of blocks a repair would need.
    ///
    /// An incomplete set verifies nothing: the result is empty and zero.
    /// Paths that cannot be opened are reported with their error and count
    /// for nothing; paths matching no block at all are silently excluded;
    /// described files bound to no path are appended as missing, their full
    /// block count added to the total.
    pub fn verify(&self, paths: &[PathBuf]) -> (Vec<FileMatch>, usize) {
        self.verify_with_progress(paths, &Progress::new(false))
    }

    /// [`Fileset::verify`] with a progress handle: per-slice byte counts
    /// and a file tick as each path finishes.
    pub fn verify_with_progress(
        &self,
        paths: &[PathBuf],
        progress: &Progress,
    ) -> (Vec<FileMatch>, usize) {
        if !self.can_verify() {
            return (Vec::new(), 0);
        }
        // Each scan owns its buffer, binding, and bitmap; the checksum
        // index is immutable once assembly is done. Totals merge in the
        // sequential reduction below, so nothing here needs a lock.
        let scanned: Vec<Option<(FileMatch, usize)>> = paths
            .par_iter()
            .map(|path| {
                let outcome = self.verify_path(path, progress);
                progress.inc_file();
                outcome
            })
            .collect();

        let mut matches = Vec::with_capacity(paths.len());
        let mut blocks_needed = 0usize;
        let mut bound: HashSet<FileId> = HashSet::new();
        for (fm, missing) in scanned.into_iter().flatten() {
            if let Some(id) = fm.file_id {
                bound.insert(id);
            }
            blocks_needed += missing;
            matches.push(fm);
        }

        // Whatever was never bound must be recovered from scratch.
        let mut absent: Vec<_> = self.files().filter(|(id, _)| !bound.contains(*id)).collect();
        absent.sort_by(|a, b| a.1.name.cmp(&b.1.name));
        for (id, file) in absent {
            blocks_needed += file.block_count(self.slice_len());
            matches.push(FileMatch {
                path: None,
                error: Some(MatchError::Missing),
                file_id: Some(*id),
                blocks: None,
            });
        }
        (matches, blocks_needed)
    }

    /// Stream one candidate in slice-length blocks. `None` means the path
    /// matched nothing and is not part of this set.
    fn verify_path(&self, path: &Path, progress: &Progress) -> Option<(FileMatch, usize)> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) => {
                return Some((
                    FileMatch {
                        path: Some(path.to_path_buf()),
                        error: Some(MatchError::Open(e)),
                        file_id: None,
                        blocks: None,
                    },
                    0,
                ))
            }
        };
        let slice_len = self.slice_len() as usize;
        let mut reader = BufReader::new(file);
        let mut buf = vec![0u8; slice_len];
        let mut binding: Option<(FileId, BlockBitmap)> = None;
        loop {
            let (n, stop) = read_slice(&mut reader, &mut buf);
            if n == 0 {
                break;
            }
            progress.add_bytes(n);
            if n < slice_len {
                // Short final block: the format hashes it zero-extended to
                // the full slice length.
                buf[n..].fill(0);
            }
            let digest: [u8; 16] = md5::compute(&buf).0;
            if let Some(block) = self.lookup_block(&digest) {
                match &mut binding {
                    None => {
                        let mut blocks = BlockBitmap::default();
                        blocks.set(block.block_index);
                        binding = Some((block.file_id, blocks));
                    }
                    Some((bound_id, blocks)) => {
                        if *bound_id == block.file_id {
                            blocks.set(block.block_index);
                        }
                        // else: collision against a different file after
                        // binding; dropped, never a rebind.
                    }
                }
            }
            if stop {
                break;
            }
        }
        let (file_id, blocks) = binding?;
        let entry = self.file(&file_id)?;
        let missing = blocks.missing_in(entry.block_count(self.slice_len()));
        Some((
            FileMatch {
                path: Some(path.to_path_buf()),
                error: None,
                file_id: Some(file_id),
                blocks: Some(blocks),
            },
            missing,
        ))
    }
}

/// Fill `buf` as far as the stream allows. Returns the filled byte count
/// and whether the scan must stop after this block (end of file or a read
/// error; the partial block still gets hashed first).
fn read_slice<R: Read>(r: &mut R, buf: &mut [u8]) -> (usize, bool) {
    let mut filled = 0usize;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => return (filled, true),
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(_) => return (filled, true),
        }
    }
    (filled, false)
}
