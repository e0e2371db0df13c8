//! PAR 2.0 wire constants and the typed packet bodies this core decodes.

/// 16-byte identifier shared by every packet of one description set.
pub type SetId = [u8; 16];
/// 16-byte identifier of one file within a set.
pub type FileId = [u8; 16];
/// MD5 of one slice-length block (a short final block is zero-extended first).
pub type BlockHash = [u8; 16];

/// Magic marker beginning every packet.
pub const PACKET_MAGIC: [u8; 8] = *b"PAR2\0PKT";
/// Fixed header size: magic + length + packet MD5 + set id + type tag.
pub const HEADER_LEN: u64 = 64;

pub const TYPE_MAIN: [u8; 16] = *b"PAR 2.0\0Main\0\0\0\0";
pub const TYPE_FILE_DESC: [u8; 16] = *b"PAR 2.0\0FileDesc";
pub const TYPE_IFSC: [u8; 16] = *b"PAR 2.0\0IFSC\0\0\0\0";
pub const TYPE_RECV_SLICE: [u8; 16] = *b"PAR 2.0\0RecvSlic";
pub const TYPE_CREATOR: [u8; 16] = *b"PAR 2.0\0Creator\0";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    Main,
    FileDesc,
    BlockChecksums,
    RecoverySlice,
    Creator,
    Unknown,
}

impl PacketType {
    pub fn from_tag(tag: &[u8; 16]) -> Self {
        match tag {
            t if t == &TYPE_MAIN => Self::Main,
            t if t == &TYPE_FILE_DESC => Self::FileDesc,
            t if t == &TYPE_IFSC => Self::BlockChecksums,
            t if t == &TYPE_RECV_SLICE => Self::RecoverySlice,
            t if t == &TYPE_CREATOR => Self::Creator,
            _ => Self::Unknown,
        }
    }
}

/// Decoded fixed packet header. `payload_len` is the declared total length
/// with the 64-byte header already subtracted. `hashed_tail` keeps the raw
/// set-id and type-tag bytes: the declared packet MD5 covers those 32 bytes
/// plus the payload.
#[derive(Debug, Clone)]
pub struct PacketHeader {
    pub payload_len: u64,
    pub packet_hash: [u8; 16],
    pub set_id: SetId,
    pub packet_type: PacketType,
    pub(crate) hashed_tail: [u8; 32],
}

/// Set-descriptor payload: slice length plus the ids of every covered file.
#[derive(Debug, Clone)]
pub struct MainPacket {
    pub slice_len: u64,
    pub file_ids: Vec<FileId>,
}

/// File-descriptor payload: name and length for one file id.
#[derive(Debug, Clone)]
pub struct FileDescPacket {
    pub file_id: FileId,
    pub length: u64,
    pub name: String,
}

/// Per-file block-checksum payload, ordered by block index.
#[derive(Debug, Clone)]
pub struct BlockChecksumsPacket {
    pub file_id: FileId,
    pub block_hashes: Vec<BlockHash>,
}

fn take16(buf: &[u8]) -> [u8; 16] {
    buf[..16].try_into().unwrap()
}

/// Payload: u64 slice length, 4 reserved bytes, then 16-byte file ids.
/// The reserved field nominally carries the file count; the ids are taken
/// from the remaining payload instead so a bogus count cannot overrun.
pub fn decode_main(payload: &[u8]) -> Option<MainPacket> {
    if payload.len() < 12 {
        return None;
    }
    let slice_len = u64::from_le_bytes(payload[..8].try_into().unwrap());
    let file_ids: Vec<FileId> = payload[12..].chunks_exact(16).map(|c| take16(c)).collect();
    Some(MainPacket { slice_len, file_ids })
}

/// Payload: file id, MD5 of the file, MD5 of its first 16 KiB (both unused
/// here), u64 length, then the NUL-padded name filling the rest.
pub fn decode_file_desc(payload: &[u8]) -> Option<FileDescPacket> {
    if payload.len() < 56 {
        return None;
    }
    let file_id = take16(payload);
    let length = u64::from_le_bytes(payload[48..56].try_into().unwrap());
    let mut name_bytes = &payload[56..];
    while let [rest @ .., 0] = name_bytes {
        name_bytes = rest;
    }
    let name = String::from_utf8_lossy(name_bytes).into_owned();
    Some(FileDescPacket { file_id, length, name })
}

/// Payload: file id, then 20-byte records of block MD5 + 4-byte block CRC.
/// The CRC is consumed and ignored.
pub fn decode_block_checksums(payload: &[u8]) -> Option<BlockChecksumsPacket> {
    if payload.len() < 16 {
        return None;
    }
    let file_id = take16(payload);
    let block_hashes: Vec<BlockHash> =
        payload[16..].chunks_exact(20).map(|rec| take16(rec)).collect();
    Some(BlockChecksumsPacket { file_id, block_hashes })
}
