use crate::cursor::Cursor;
use crate::errors::EMObsError;

/// A three-letter record tag plus its trailing version byte.
///
/// The direct analogue of the teacher's `FourCC`: a small fixed-size tag
/// type read straight off the buffer, compared by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tlc {
    pub letters: [u8; 3],
    pub version: u8,
}

impl Tlc {
    pub fn as_str(&self) -> String {
        self.letters.iter().map(|b| *b as char).collect()
    }
}

impl std::fmt::Display for Tlc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn is_upper(b: u8) -> bool {
    b.is_ascii_uppercase()
}

fn is_upper_or_digit(b: u8) -> bool {
    b.is_ascii_uppercase() || b.is_ascii_digit()
}

/// Tests whether the four bytes at `buf[k..k+4]` form an accepted TLC
/// candidate (§4.2 rule 1-4). Returns `None` if `k+4` runs past `buf`.
fn candidate_at(buf: &[u8], k: usize) -> Option<Tlc> {
    let b = buf.get(k..k + 4)?;
    if is_upper(b[0]) && is_upper_or_digit(b[1]) && is_upper_or_digit(b[2]) && b[3] <= 5 {
        Some(Tlc{letters: [b[0], b[1], b[2]], version: b[3]})
    } else {
        None
    }
}

/// Non-mutating test of the candidate at `read_pos`. Distinguishes
/// end-of-buffer (also `None`) only in that no pointer moves either way.
pub fn peek_next_tlc(cursor: &Cursor) -> Option<Tlc> {
    candidate_at(cursor.bytes(), cursor.read_pos())
}

/// The result of a TLC scan: the tag found, and the byte range spanning
/// from that tag up to (but not including) the next accepted candidate,
/// or the end of the buffer if none follows.
#[derive(Debug, Clone)]
pub struct TlcScan {
    pub tlc: Tlc,
    pub start: usize,
    pub end: usize,
}

/// Scans forward from `cursor.seek_pos()` for the next accepted TLC
/// candidate, then from `first + 3` for the one after it (§4.2).
/// Updates `seek_pos` to the second position (or buffer end) and
/// `last_tlc_pos` to the first. Returns `NoMoreRecords` if none is found.
pub fn next_tlc(cursor: &mut Cursor) -> Result<TlcScan, EMObsError> {
    let buf = cursor.bytes();
    let len = buf.len();

    let mut first = None;
    let mut k = cursor.seek_pos();
    while k + 4 <= len {
        if let Some(tlc) = candidate_at(buf, k) {
            first = Some((k, tlc));
            break;
        }
        k += 1;
    }

    let (first_pos, tlc) = match first {
        Some(v) => v,
        None => return Err(EMObsError::NoMoreRecords),
    };

    let mut second = len;
    let mut j = first_pos + 3;
    while j + 4 <= len {
        if candidate_at(buf, j).is_some() {
            second = j;
            break;
        }
        j += 1;
    }

    cursor.set_seek_pos(second)?;
    cursor.set_last_tlc_pos(first_pos);

    Ok(TlcScan{tlc, start: first_pos, end: second})
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_ebs_v4() {
        let buf = b"EBS\x04".to_vec();
        let cur = Cursor::from_bytes(buf);
        let tlc = peek_next_tlc(&cur).unwrap();
        assert_eq!(tlc.as_str(), "EBS");
        assert_eq!(tlc.version, 4);
    }

    #[test]
    fn rejects_lowercase_and_bad_version() {
        let buf = b"ebs\x04".to_vec();
        let cur = Cursor::from_bytes(buf);
        assert!(peek_next_tlc(&cur).is_none());

        let buf = b"EBS\x09".to_vec();
        let cur = Cursor::from_bytes(buf);
        assert!(peek_next_tlc(&cur).is_none());
    }

    #[test]
    fn scan_finds_two_successive_tags_in_order() {
        let mut buf = b"EBS\x04".to_vec();
        buf.extend_from_slice(b"opaquejunk");
        buf.extend_from_slice(b"IDA\x05");
        let mut cur = Cursor::from_bytes(buf);
        let first = next_tlc(&mut cur).unwrap();
        assert_eq!(first.tlc.as_str(), "EBS");
        assert_eq!(first.start, 0);

        let second = next_tlc(&mut cur).unwrap();
        assert_eq!(second.tlc.as_str(), "IDA");
        assert!(second.start > first.start + 3);
    }

    #[test]
    fn no_more_records_at_end_of_buffer() {
        let mut cur = Cursor::from_bytes(b"....".to_vec());
        assert!(matches!(next_tlc(&mut cur), Err(EMObsError::NoMoreRecords)));
    }
}
