#![forbid(unsafe_code)]

/// A payload placed in the static data segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Blob {
    pub addr: u32,
    pub len: u32,
}

/// Write-once static data. Payloads are appended back to back and never
/// moved, so an address handed out stays valid for the whole compilation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Segment {
    data: Vec<u8>,
    blobs: Vec<Blob>,
}

impl Segment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `raw` and returns its address.
    pub fn add_raw(&mut self, raw: &[u8]) -> u32 {
        let addr = self.data.len() as u32;
        self.data.extend_from_slice(raw);
        self.blobs.push(Blob {
            addr,
            len: raw.len() as u32,
        });
        addr
    }

    pub fn read(&self, addr: u32, len: u32) -> Option<&[u8]> {
        let start = addr as usize;
        let end = start.checked_add(len as usize)?;
        self.data.get(start..end)
    }

    pub fn blobs(&self) -> &[Blob] {
        &self.blobs
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn size(&self) -> u32 {
        self.data.len() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payloads_are_appended_in_order() {
        let mut seg = Segment::new();
        let a = seg.add_raw(b"hi\0");
        let b = seg.add_raw(&[0, 0, 0, 0]);

        assert_eq!(a, 0);
        assert_eq!(b, 3);
        assert_eq!(seg.size(), 7);
        assert_eq!(seg.read(a, 3), Some(&b"hi\0"[..]));
        assert_eq!(seg.blobs().len(), 2);
    }

    #[test]
    fn out_of_range_read_is_none() {
        let mut seg = Segment::new();
        seg.add_raw(b"abc");
        assert_eq!(seg.read(2, 4), None);
        assert_eq!(seg.read(u32::MAX, u32::MAX), None);
    }
}
