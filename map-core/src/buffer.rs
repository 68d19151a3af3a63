use byteorder::{ByteOrder, LittleEndian};
use std::collections::{HashMap, VecDeque};
use thiserror::Error;

/// Patch protocol faults. Both variants indicate a writer bug, not bad
/// input data: reserves and patches must always come in matched pairs.
#[derive(Debug, Error)]
pub enum PatchError {
    #[error("unknown patch site: no pending offset recorded for tag `{0}`")]
    UnknownPatchSite(&'static str),

    #[error("unresolved patch sites left at finalize: {0:?}")]
    UnresolvedPatchSites(Vec<&'static str>),
}

/// Growable byte buffer with named forward-reference patch sites.
///
/// A tagged append reserves a slot whose final value is not known yet;
/// `patch_here`/`patch_u32` later overwrite the oldest pending slot for
/// that tag. Several pending sites may share one tag and resolve in
/// first-reserved-first-resolved order, which is how a section writer
/// reuses one tag for every descriptor in the section.
///
/// [`PatchBuffer::finish`] refuses to hand out the bytes while any site is
/// still pending, so a forgotten patch is a hard failure instead of a
/// placeholder zero silently reaching the file.
#[derive(Debug, Default)]
pub struct PatchBuffer {
    data: Vec<u8>,
    pending: HashMap<&'static str, VecDeque<usize>>,
}

impl PatchBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current end-of-buffer offset.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Append raw bytes.
    pub fn append(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Append raw bytes, recording their start offset as a patch site
    /// under `tag`.
    pub fn append_tagged(&mut self, tag: &'static str, bytes: &[u8]) {
        self.pending.entry(tag).or_default().push_back(self.data.len());
        self.data.extend_from_slice(bytes);
    }

    /// Reserve a zeroed 4-byte slot under `tag`.
    pub fn reserve_u32(&mut self, tag: &'static str) {
        self.append_tagged(tag, &[0u8; 4]);
    }

    pub fn append_u8(&mut self, value: u8) {
        self.data.push(value);
    }

    pub fn append_u32(&mut self, value: u32) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn append_i32(&mut self, value: i32) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn append_f32(&mut self, value: f32) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    /// Resolve the oldest pending site for `tag` to the buffer's current
    /// length: "this forward reference points at what comes next".
    pub fn patch_here(&mut self, tag: &'static str) -> Result<(), PatchError> {
        let here = self.data.len() as u32;
        self.patch_u32(tag, here)
    }

    /// Resolve the oldest pending site for `tag` to a literal value.
    pub fn patch_u32(&mut self, tag: &'static str, value: u32) -> Result<(), PatchError> {
        let offset = self.take_site(tag)?;
        LittleEndian::write_u32(&mut self.data[offset..offset + 4], value);
        Ok(())
    }

    fn take_site(&mut self, tag: &'static str) -> Result<usize, PatchError> {
        self.pending
            .get_mut(tag)
            .and_then(VecDeque::pop_front)
            .ok_or(PatchError::UnknownPatchSite(tag))
    }

    /// Finalize, yielding the bytes. Fails if any patch site was reserved
    /// but never resolved.
    pub fn finish(self) -> Result<Vec<u8>, PatchError> {
        let mut unresolved: Vec<&'static str> = self
            .pending
            .iter()
            .filter(|(_, queue)| !queue.is_empty())
            .map(|(&tag, _)| tag)
            .collect();
        if !unresolved.is_empty() {
            unresolved.sort_unstable();
            return Err(PatchError::UnresolvedPatchSites(unresolved));
        }
        Ok(self.data)
    }
}
