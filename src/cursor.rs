use std::fs::File;
use std::io::Read;
use std::io::{Cursor as IoCursor, Seek, SeekFrom};
use std::path::Path;

use binrw::{BinRead, BinReaderExt, Endian};

use crate::errors::EMObsError;

/// Whole-file, in-memory reader with three independent position pointers:
///
/// - `read_pos`: the cursor typed field reads advance.
/// - `seek_pos`: where the next TLC scan resumes from.
/// - `last_tlc_pos`: the offset of the most recently located TLC.
///
/// All three index into the same owned buffer. There is no file handle kept
/// open after `open()` returns.
#[derive(Debug)]
pub struct Cursor {
    buf: Vec<u8>,
    read_pos: usize,
    seek_pos: usize,
    last_tlc_pos: usize,
}

impl Cursor {
    /// Loads the whole file into memory.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, EMObsError> {
        let mut file = File::open(path)?;
        let len = file.metadata()?.len();
        let mut buf = Vec::with_capacity(len as usize);
        file.read_to_end(&mut buf)?;
        Ok(Self::from_bytes(buf))
    }

    /// Wraps an already-loaded buffer (used by tests).
    pub fn from_bytes(buf: Vec<u8>) -> Self {
        Self {
            buf,
            read_pos: 0,
            seek_pos: 0,
            last_tlc_pos: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn read_pos(&self) -> usize {
        self.read_pos
    }

    pub fn set_read_pos(&mut self, pos: usize) -> Result<(), EMObsError> {
        self.check_bounds(pos)?;
        self.read_pos = pos;
        Ok(())
    }

    pub fn seek_pos(&self) -> usize {
        self.seek_pos
    }

    pub fn set_seek_pos(&mut self, pos: usize) -> Result<(), EMObsError> {
        self.check_bounds(pos)?;
        self.seek_pos = pos;
        Ok(())
    }

    pub fn last_tlc_pos(&self) -> usize {
        self.last_tlc_pos
    }

    pub fn set_last_tlc_pos(&mut self, pos: usize) {
        self.last_tlc_pos = pos;
    }

    /// Moves `seek_pos` to the current `read_pos`, so the next TLC scan
    /// resumes from wherever typed reads last left off.
    pub fn snap_seek_to_read(&mut self) {
        self.seek_pos = self.read_pos;
    }

    /// Moves `read_pos` to the current `seek_pos`, so typed reads continue
    /// from wherever the TLC scan last landed.
    pub fn snap_read_to_seek(&mut self) {
        self.read_pos = self.seek_pos;
    }

    /// Moves `read_pos` to the start of the most recently located TLC.
    pub fn snap_read_to_last_tlc(&mut self) {
        self.read_pos = self.last_tlc_pos;
    }

    fn check_bounds(&self, pos: usize) -> Result<(), EMObsError> {
        if pos > self.buf.len() {
            Err(EMObsError::OutOfBounds{pos, len: self.buf.len()})
        } else {
            Ok(())
        }
    }

    /// Remaining bytes after `read_pos`.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.read_pos
    }

    fn read_type<T>(&mut self) -> Result<T, EMObsError>
    where
        T: BinRead,
        <T as BinRead>::Args<'static>: Sized + Clone + Default,
    {
        let needed = std::mem::size_of::<T>();
        if self.read_pos + needed > self.buf.len() {
            return Err(EMObsError::Truncated{
                context: format!("reading {} bytes", needed),
                pos: self.read_pos,
            });
        }
        let mut rdr = IoCursor::new(&self.buf[self.read_pos..]);
        let val = rdr.read_type::<T>(Endian::Little)?;
        self.read_pos += needed;
        Ok(val)
    }

    pub fn read_u8(&mut self) -> Result<u8, EMObsError> {
        self.read_type::<u8>()
    }

    pub fn read_i16(&mut self) -> Result<i16, EMObsError> {
        self.read_type::<i16>()
    }

    pub fn read_i32(&mut self) -> Result<i32, EMObsError> {
        self.read_type::<i32>()
    }

    pub fn read_i64(&mut self) -> Result<i64, EMObsError> {
        self.read_type::<i64>()
    }

    pub fn read_f32(&mut self) -> Result<f32, EMObsError> {
        self.read_type::<f32>()
    }

    pub fn read_f64(&mut self) -> Result<f64, EMObsError> {
        self.read_type::<f64>()
    }

    /// Reads `n` bytes verbatim, advancing `read_pos`.
    pub fn read_fixed(&mut self, n: usize) -> Result<Vec<u8>, EMObsError> {
        if self.read_pos + n > self.buf.len() {
            return Err(EMObsError::Truncated{
                context: format!("reading {n} bytes"),
                pos: self.read_pos,
            });
        }
        let out = self.buf[self.read_pos..self.read_pos + n].to_vec();
        self.read_pos += n;
        Ok(out)
    }

    /// Peeks `n` bytes at `read_pos` without advancing it.
    pub fn peek_fixed(&self, n: usize) -> Result<&[u8], EMObsError> {
        if self.read_pos + n > self.buf.len() {
            return Err(EMObsError::OutOfBounds{pos: self.read_pos + n, len: self.buf.len()});
        }
        Ok(&self.buf[self.read_pos..self.read_pos + n])
    }

    /// Peeks `n` bytes at an arbitrary offset without touching any pointer.
    pub fn peek_at(&self, pos: usize, n: usize) -> Result<&[u8], EMObsError> {
        if pos + n > self.buf.len() {
            return Err(EMObsError::OutOfBounds{pos: pos + n, len: self.buf.len()});
        }
        Ok(&self.buf[pos..pos + n])
    }
}

/// Satisfies `Seek` for callers that want to reuse `binrw` combinators
/// directly against the owned buffer (diagnostics only; the record parser
/// uses the typed methods above).
impl Seek for Cursor {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        let mut c = IoCursor::new(&self.buf);
        c.set_position(self.read_pos as u64);
        let new_pos = c.seek(pos)?;
        self.read_pos = new_pos as usize;
        Ok(new_pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian_primitives() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&1i32.to_le_bytes());
        buf.extend_from_slice(&2i16.to_le_bytes());
        let mut cur = Cursor::from_bytes(buf);
        assert_eq!(cur.read_i32().unwrap(), 1);
        assert_eq!(cur.read_i16().unwrap(), 2);
    }

    #[test]
    fn out_of_bounds_read_is_truncated() {
        let mut cur = Cursor::from_bytes(vec![0u8; 2]);
        assert!(matches!(cur.read_i32(), Err(EMObsError::Truncated{..})));
    }

    #[test]
    fn pointer_snaps_track_independently() {
        let mut cur = Cursor::from_bytes(vec![0u8; 16]);
        cur.set_read_pos(4).unwrap();
        cur.set_seek_pos(10).unwrap();
        cur.set_last_tlc_pos(2);
        assert_eq!(cur.read_pos(), 4);
        assert_eq!(cur.seek_pos(), 10);
        cur.snap_read_to_last_tlc();
        assert_eq!(cur.read_pos(), 2);
        cur.snap_seek_to_read();
        assert_eq!(cur.seek_pos(), 2);
    }
}
