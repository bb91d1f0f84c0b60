use crate::cursor::Cursor;
use crate::errors::EMObsError;

/// Maximum code-unit count accepted for a wstring (`-n <= 512`, §4.1).
const MAX_WSTRING_LEN: i32 = 512;

/// Reads a length-prefixed wide string: a negated int32 count followed by
/// that many UTF-16-LE code units.
pub fn read_wstring(cursor: &mut Cursor) -> Result<String, EMObsError> {
    let n = cursor.read_i32()?;
    if n > 0 || -n > MAX_WSTRING_LEN {
        return Err(EMObsError::Malformed{
            context: format!("wstring length prefix {n} out of range"),
        });
    }
    let count = (-n) as usize;

    let mut units = Vec::with_capacity(count);
    for _ in 0..count {
        let bytes = cursor.read_fixed(2).map_err(|_| EMObsError::Truncated{
            context: format!("wstring expected {count} code units"),
            pos: cursor.read_pos(),
        })?;
        units.push(u16::from_le_bytes([bytes[0], bytes[1]]));
    }

    String::from_utf16(&units).map_err(|_| EMObsError::Malformed{
        context: "wstring contains an unpaired UTF-16 surrogate".to_string(),
    })
}

/// A 2D string matrix indexed `[x][y]`, decoded from the `MAT` record body.
#[derive(Debug, Clone, Default)]
pub struct Mat {
    pub dim_x: usize,
    pub dim_y: usize,
    values: Vec<Vec<String>>,
}

impl Mat {
    pub fn get(&self, x: usize, y: usize) -> Option<&str> {
        self.values.get(x).and_then(|col| col.get(y)).map(|s| s.as_str())
    }
}

const MAT_LITERAL: &[u8; 4] = b"MAT\0";

/// Reads the `MAT\0` literal, two int32 dimensions, then `dimX*dimY`
/// wstrings in `for y { for x { .. } }` order, storing them `[x][y]`.
pub fn read_mat(cursor: &mut Cursor) -> Result<Mat, EMObsError> {
    let literal = cursor.read_fixed(4)?;
    if literal.as_slice() != MAT_LITERAL {
        return Err(EMObsError::Malformed{
            context: "MAT record missing 'MAT\\0' literal".to_string(),
        });
    }

    let dim_x = cursor.read_i32()?;
    let dim_y = cursor.read_i32()?;
    if dim_x < 0 || dim_y < 0 {
        return Err(EMObsError::Malformed{
            context: format!("MAT dimensions ({dim_x}, {dim_y}) must be non-negative"),
        });
    }
    let (dim_x, dim_y) = (dim_x as usize, dim_y as usize);

    let mut values = vec![vec![String::new(); dim_y]; dim_x];
    for y in 0..dim_y {
        for x in 0..dim_x {
            values[x][y] = read_wstring(cursor)?;
        }
    }

    Ok(Mat{dim_x, dim_y, values})
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wstring_bytes(s: &str) -> Vec<u8> {
        let units: Vec<u16> = s.encode_utf16().collect();
        let mut out = (-(units.len() as i32)).to_le_bytes().to_vec();
        for u in units {
            out.extend_from_slice(&u.to_le_bytes());
        }
        out
    }

    #[test]
    fn reads_basic_wstring() {
        let buf = wstring_bytes("./px");
        let mut cur = Cursor::from_bytes(buf);
        assert_eq!(read_wstring(&mut cur).unwrap(), "./px");
    }

    #[test]
    fn rejects_oversized_wstring() {
        let mut buf = (-600i32).to_le_bytes().to_vec();
        buf.extend(std::iter::repeat(0u8).take(1200));
        let mut cur = Cursor::from_bytes(buf);
        assert!(matches!(read_wstring(&mut cur), Err(EMObsError::Malformed{..})));
    }

    #[test]
    fn truncated_wstring_reports_truncated() {
        let mut buf = (-100i32).to_le_bytes().to_vec();
        buf.extend_from_slice(&[0u8; 2]);
        let mut cur = Cursor::from_bytes(buf);
        assert!(matches!(read_wstring(&mut cur), Err(EMObsError::Truncated{..})));
    }

    #[test]
    fn reads_1x1_mat() {
        let mut buf = MAT_LITERAL.to_vec();
        buf.extend_from_slice(&1i32.to_le_bytes());
        buf.extend_from_slice(&1i32.to_le_bytes());
        buf.extend_from_slice(&wstring_bytes("op"));
        let mut cur = Cursor::from_bytes(buf);
        let mat = read_mat(&mut cur).unwrap();
        assert_eq!(mat.get(0, 0), Some("op"));
    }

    #[test]
    fn reads_5x1_mat_in_row_major_y_order() {
        let mut buf = MAT_LITERAL.to_vec();
        buf.extend_from_slice(&5i32.to_le_bytes());
        buf.extend_from_slice(&1i32.to_le_bytes());
        for s in ["Fam", "Gen", "Sp", "", "3"] {
            buf.extend_from_slice(&wstring_bytes(s));
        }
        let mut cur = Cursor::from_bytes(buf);
        let mat = read_mat(&mut cur).unwrap();
        assert_eq!(mat.get(0, 0), Some("Fam"));
        assert_eq!(mat.get(4, 0), Some("3"));
    }

    #[test]
    fn rejects_missing_literal() {
        let mut cur = Cursor::from_bytes(b"NOPE".to_vec());
        assert!(matches!(read_mat(&mut cur), Err(EMObsError::Malformed{..})));
    }
}
