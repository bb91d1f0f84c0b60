//! Recursive-descent record parser (§4.3). One `parse_*` per TLC: assert
//! the tag, read the version byte, dispatch on it, consume the body in
//! declared order. Grounded on the teacher's `Atom::stts`/`stsz`/`stco`/
//! `hdlr` methods (assert tag, read fields in order, construct a struct).

use crate::cursor::Cursor;
use crate::diagnostics::Diagnostics;
use crate::errors::EMObsError;
use crate::fields::{read_mat, read_wstring};
use crate::record::{Cin, Cpt, Ebs, Fra, Ida, Pd3, Pda, Pdl, Ptn, TRAILER_TAGS};

fn expect_tlc(cursor: &mut Cursor, expected: &'static str) -> Result<u8, EMObsError> {
    let letters = cursor.read_fixed(3)?;
    let found: String = letters.iter().map(|b| *b as char).collect();
    if found != expected {
        return Err(EMObsError::UnexpectedTag{expected, found});
    }
    cursor.read_u8().map_err(|_| EMObsError::Truncated{
        context: format!("{expected} version byte"),
        pos: cursor.read_pos(),
    })
}

pub fn parse_cpt(cursor: &mut Cursor) -> Result<Cpt, EMObsError> {
    let version = expect_tlc(cursor, "CPT")?;
    if version != 0 {
        return Err(EMObsError::UnsupportedVersion{tag: "CPT", version});
    }
    let x = cursor.read_f64()?;
    let y = cursor.read_f64()?;
    Ok(Cpt{x, y})
}

/// Requires version 1. Camera indices outside `{0, 1}` are reported via
/// `diag` and the value is kept as-is (§7 `SuspiciousValue`, non-fatal).
pub fn parse_fra(cursor: &mut Cursor) -> Result<Fra, EMObsError> {
    let version = expect_tlc(cursor, "FRA")?;
    if version != 1 {
        return Err(EMObsError::UnsupportedVersion{tag: "FRA", version});
    }
    let camera = cursor.read_i32()?;
    let frame = cursor.read_i32()?;
    let media = read_wstring(cursor)?;
    Ok(Fra{camera, frame, media})
}

/// Same as [`parse_fra`] but reports a camera index outside `{0, 1}`
/// through `diag` instead of silently accepting it.
pub fn parse_fra_checked(cursor: &mut Cursor, diag: &mut dyn Diagnostics) -> Result<Fra, EMObsError> {
    let fra = parse_fra(cursor)?;
    if fra.camera != 0 && fra.camera != 1 {
        diag.warn(format!("FRA camera index {} not in {{0, 1}}", fra.camera));
    }
    Ok(fra)
}

pub fn parse_cin(cursor: &mut Cursor) -> Result<Cin, EMObsError> {
    let version = expect_tlc(cursor, "CIN")?;
    if version != 0 {
        return Err(EMObsError::UnsupportedVersion{tag: "CIN", version});
    }
    let field_titles = read_mat(cursor)?;
    let field_values = read_mat(cursor)?;
    Ok(Cin{field_titles, field_values})
}

pub fn parse_ptn(cursor: &mut Cursor) -> Result<Ptn, EMObsError> {
    let version = expect_tlc(cursor, "PTN")?;
    if version != 0 {
        return Err(EMObsError::UnsupportedVersion{tag: "PTN", version});
    }
    let titles = read_mat(cursor)?;
    let i_data1 = cursor.read_i32()?;
    Ok(Ptn{titles, i_data1})
}

pub fn parse_ebs(cursor: &mut Cursor) -> Result<Ebs, EMObsError> {
    let version = expect_tlc(cursor, "EBS")?;
    if version != 4 && version != 5 {
        return Err(EMObsError::UnsupportedVersion{tag: "EBS", version});
    }
    let picture_directory = read_wstring(cursor)?;
    let cin = parse_cin(cursor)?;
    let ptn = parse_ptn(cursor)?;
    Ok(Ebs{version, picture_directory, cin, ptn})
}

pub fn parse_pda(cursor: &mut Cursor) -> Result<Pda, EMObsError> {
    let version = expect_tlc(cursor, "PDA")?;
    if version != 0 && version != 1 {
        return Err(EMObsError::UnsupportedVersion{tag: "PDA", version});
    }
    let cpt = parse_cpt(cursor)?;
    let mat = read_mat(cursor)?;
    let opaque = if version == 1 {
        Some(crate::support::vec2arr::<u8, 16>(cursor.read_fixed(16)?))
    } else {
        None
    };
    Ok(Pda{version, cpt, mat, opaque})
}

/// Requires version 1. Both sentinel int32s are expected to equal 2;
/// a different value is reported via `diag` and the row is still built
/// (§3, §7).
pub fn parse_pdl(cursor: &mut Cursor, diag: &mut dyn Diagnostics) -> Result<Pdl, EMObsError> {
    let version = expect_tlc(cursor, "PDL")?;
    if version != 1 {
        return Err(EMObsError::UnsupportedVersion{tag: "PDL", version});
    }
    let sentinel1 = cursor.read_i32()?;
    if sentinel1 != 2 {
        diag.warn(format!("PDL leading sentinel {sentinel1} != 2"));
    }
    let cpt1 = parse_cpt(cursor)?;
    let cpt2 = parse_cpt(cursor)?;
    let sentinel2 = cursor.read_i32()?;
    if sentinel2 != 2 {
        diag.warn(format!("PDL trailing sentinel {sentinel2} != 2"));
    }
    let cpt3 = parse_cpt(cursor)?;
    let cpt4 = parse_cpt(cursor)?;
    let fra = parse_fra_checked(cursor, diag)?;
    let mat = read_mat(cursor)?;
    Ok(Pdl{cpt1, cpt2, cpt3, cpt4, fra, mat})
}

pub fn parse_pd3(cursor: &mut Cursor, diag: &mut dyn Diagnostics) -> Result<Pd3, EMObsError> {
    let version = expect_tlc(cursor, "PD3")?;
    if version != 0 {
        return Err(EMObsError::UnsupportedVersion{tag: "PD3", version});
    }
    let cpt1 = parse_cpt(cursor)?;
    let cpt2 = parse_cpt(cursor)?;
    let fra = parse_fra_checked(cursor, diag)?;
    let mat = read_mat(cursor)?;
    Ok(Pd3{cpt1, cpt2, fra, mat})
}

pub fn parse_ida(cursor: &mut Cursor, diag: &mut dyn Diagnostics) -> Result<Ida, EMObsError> {
    let version = expect_tlc(cursor, "IDA")?;
    if version != 5 {
        return Err(EMObsError::UnsupportedVersion{tag: "IDA", version});
    }
    let fra = parse_fra_checked(cursor, diag)?;

    let n_pda = cursor.read_i32()?;
    let pdas = (0..n_pda.max(0)).map(|_| parse_pda(cursor)).collect::<Result<Vec<_>, _>>()?;

    let opaque1 = crate::support::vec2arr::<u8, 16>(cursor.read_fixed(16)?);
    let period_name = read_wstring(cursor)?;

    let n_pdl = cursor.read_i32()?;
    let pdls = (0..n_pdl.max(0)).map(|_| parse_pdl(cursor, diag)).collect::<Result<Vec<_>, _>>()?;

    let n_pd3 = cursor.read_i32()?;
    let pd3s = (0..n_pd3.max(0)).map(|_| parse_pd3(cursor, diag)).collect::<Result<Vec<_>, _>>()?;

    let opaque2 = crate::support::vec2arr::<u8, 16>(cursor.read_fixed(16)?);

    Ok(Ida{fra, pdas, opaque1, period_name, pdls, pd3s, opaque2})
}

/// Drives the top-level loop described in §4.3: after `parse_ebs` at
/// offset 0, repeatedly scan for the next TLC and dispatch. Returns the
/// root `Ebs` plus every `Ida` found before a trailer, an unknown tag, or
/// `NoMoreRecords` ends the scan. An unrecognized top-level tag is reported
/// through `diag` along with a hex dump of the slice up to the next TLC (or
/// buffer end), then the scan stops.
pub fn parse_file(cursor: &mut Cursor, diag: &mut dyn Diagnostics) -> Result<(Ebs, Vec<Ida>), EMObsError> {
    cursor.set_read_pos(0)?;
    let ebs = parse_ebs(cursor)?;
    cursor.snap_seek_to_read();

    let mut idas = Vec::new();
    loop {
        let scan = match crate::tlc::next_tlc(cursor) {
            Ok(scan) => scan,
            Err(EMObsError::NoMoreRecords) => break,
            Err(e) => return Err(e),
        };
        cursor.snap_read_to_last_tlc();

        let tag = scan.tlc.as_str();
        if tag == "IDA" {
            let ida = parse_ida(cursor, diag)?;
            cursor.snap_seek_to_read();
            idas.push(ida);
        } else if TRAILER_TAGS.contains(&tag.as_str()) {
            break;
        } else {
            diag.warn(format!("unexpected top-level TLC '{tag}' at offset {:#010x}", scan.start));
            let dump = crate::diagnostics::HexDump::default();
            for page in dump.render(&cursor.bytes()[scan.start..scan.end]) {
                for line in page {
                    diag.warn(line);
                }
            }
            break;
        }
    }

    Ok((ebs, idas))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::VecDiagnostics;

    fn wstring_bytes(s: &str) -> Vec<u8> {
        let units: Vec<u16> = s.encode_utf16().collect();
        let mut out = (-(units.len() as i32)).to_le_bytes().to_vec();
        for u in units {
            out.extend_from_slice(&u.to_le_bytes());
        }
        out
    }

    fn mat_bytes(dim_x: i32, dim_y: i32, values: &[&str]) -> Vec<u8> {
        let mut out = b"MAT\0".to_vec();
        out.extend_from_slice(&dim_x.to_le_bytes());
        out.extend_from_slice(&dim_y.to_le_bytes());
        for v in values {
            out.extend_from_slice(&wstring_bytes(v));
        }
        out
    }

    fn s1_ebs_bytes() -> Vec<u8> {
        let mut buf = b"EBS\x04".to_vec();
        buf.extend_from_slice(&wstring_bytes("./px"));
        buf.extend_from_slice(b"CIN\0");
        buf.extend_from_slice(&mat_bytes(1, 1, &["op"]));
        buf.extend_from_slice(&mat_bytes(1, 1, &["opval"]));
        buf.extend_from_slice(b"PTN\0");
        buf.extend_from_slice(&mat_bytes(1, 1, &["t"]));
        buf.extend_from_slice(&86i32.to_le_bytes());
        buf
    }

    #[test]
    fn s1_minimal_ebs() {
        let mut cur = Cursor::from_bytes(s1_ebs_bytes());
        let ebs = parse_ebs(&mut cur).unwrap();
        assert_eq!(ebs.picture_directory, "./px");
        assert_eq!(ebs.cin.field_titles.get(0, 0), Some("op"));
        assert_eq!(ebs.ptn.titles.get(0, 0), Some("t"));
        assert_eq!(ebs.ptn.i_data1, 86);
    }

    #[test]
    fn s5_unsupported_ebs_version() {
        let mut buf = b"EBS\x03".to_vec();
        buf.extend_from_slice(&wstring_bytes("x"));
        let mut cur = Cursor::from_bytes(buf);
        assert!(matches!(
            parse_ebs(&mut cur),
            Err(EMObsError::UnsupportedVersion{tag: "EBS", version: 3})
        ));
    }

    #[test]
    fn s6_truncated_wstring_reports_truncated() {
        let mut buf = b"EBS\x04".to_vec();
        buf.extend_from_slice(&(-100i32).to_le_bytes());
        buf.extend_from_slice(&[0u8; 2]);
        let mut cur = Cursor::from_bytes(buf);
        assert!(matches!(parse_ebs(&mut cur), Err(EMObsError::Truncated{..})));
    }

    fn s2_ida_bytes() -> Vec<u8> {
        let mut buf = b"IDA\x05".to_vec();
        buf.extend_from_slice(b"FRA\x01");
        buf.extend_from_slice(&0i32.to_le_bytes());
        buf.extend_from_slice(&42i32.to_le_bytes());
        buf.extend_from_slice(&wstring_bytes("L.mp4"));
        buf.extend_from_slice(&1i32.to_le_bytes());
        buf.extend_from_slice(b"PDA\x01");
        buf.extend_from_slice(b"CPT\0");
        buf.extend_from_slice(&10.5f64.to_le_bytes());
        buf.extend_from_slice(&20.25f64.to_le_bytes());
        buf.extend_from_slice(&mat_bytes(5, 1, &["Fam", "Gen", "Sp", "", "3"]));
        buf.extend_from_slice(&[0u8; 16]);
        buf.extend_from_slice(&[0u8; 16]);
        buf.extend_from_slice(&wstring_bytes("P1"));
        buf.extend_from_slice(&0i32.to_le_bytes());
        buf.extend_from_slice(&0i32.to_le_bytes());
        buf.extend_from_slice(&[0u8; 16]);
        buf
    }

    #[test]
    fn s2_one_pda_left_camera() {
        let mut cur = Cursor::from_bytes(s2_ida_bytes());
        let mut diag = VecDiagnostics::default();
        let ida = parse_ida(&mut cur, &mut diag).unwrap();
        assert_eq!(ida.fra.camera, 0);
        assert_eq!(ida.pdas.len(), 1);
        assert_eq!(ida.pdas[0].cpt.x, 10.5);
        assert_eq!(ida.pdas[0].mat.get(4, 0), Some("3"));
        assert_eq!(ida.period_name, "P1");
        assert!(diag.0.is_empty());
    }

    #[test]
    fn s4_trailer_stops_driver() {
        let mut buf = s1_ebs_bytes();
        buf.extend_from_slice(&s2_ida_bytes());
        buf.extend_from_slice(&s2_ida_bytes());
        buf.extend_from_slice(b"PER\0");
        let mut cur = Cursor::from_bytes(buf);
        let mut diag = VecDiagnostics::default();
        let (_ebs, idas) = parse_file(&mut cur, &mut diag).unwrap();
        assert_eq!(idas.len(), 2);
    }

    #[test]
    fn unknown_top_level_tag_hex_dumps_before_stopping() {
        let mut buf = s1_ebs_bytes();
        buf.extend_from_slice(b"ZZZ\x00garbage");
        let mut cur = Cursor::from_bytes(buf);
        let mut diag = VecDiagnostics::default();
        let (_ebs, idas) = parse_file(&mut cur, &mut diag).unwrap();
        assert!(idas.is_empty());
        assert!(diag.0[0].contains("unexpected top-level TLC 'ZZZ'"));
        assert!(diag.0.len() > 1, "expected hex dump lines after the warning");
        assert!(diag.0.iter().any(|l| l.contains("5A 5A 5A 00")), "expected a hex dump line covering 'ZZZ\\0'");
    }

    #[test]
    fn pdl_sentinel_violation_is_non_fatal() {
        let mut buf = b"PDL\x01".to_vec();
        buf.extend_from_slice(&3i32.to_le_bytes());
        buf.extend_from_slice(b"CPT\0");
        buf.extend_from_slice(&1.0f64.to_le_bytes());
        buf.extend_from_slice(&2.0f64.to_le_bytes());
        buf.extend_from_slice(b"CPT\0");
        buf.extend_from_slice(&3.0f64.to_le_bytes());
        buf.extend_from_slice(&4.0f64.to_le_bytes());
        buf.extend_from_slice(&2i32.to_le_bytes());
        buf.extend_from_slice(b"CPT\0");
        buf.extend_from_slice(&5.0f64.to_le_bytes());
        buf.extend_from_slice(&6.0f64.to_le_bytes());
        buf.extend_from_slice(b"CPT\0");
        buf.extend_from_slice(&7.0f64.to_le_bytes());
        buf.extend_from_slice(&8.0f64.to_le_bytes());
        buf.extend_from_slice(b"FRA\x01");
        buf.extend_from_slice(&1i32.to_le_bytes());
        buf.extend_from_slice(&1i32.to_le_bytes());
        buf.extend_from_slice(&wstring_bytes("R.mp4"));
        buf.extend_from_slice(&mat_bytes(5, 1, &["F", "G", "S", "", ""]));

        let mut cur = Cursor::from_bytes(buf);
        let mut diag = VecDiagnostics::default();
        let pdl = parse_pdl(&mut cur, &mut diag).unwrap();
        assert_eq!(pdl.cpt1.x, 1.0);
        assert_eq!(pdl.cpt4.y, 8.0);
        assert_eq!(diag.0.len(), 1);
        assert!(diag.0[0].contains("leading sentinel"));
    }
}
