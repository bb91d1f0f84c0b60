/// Renders a byte as its ASCII glyph, or `.` for anything non-printable.
/// Used by `diagnostics::HexDump`'s right-hand column.
pub(crate) fn printable_ascii(byte: u8) -> char {
    match byte {
        0x20..=0x7e => byte as char,
        _ => '.',
    }
}

/// Converts a `Vec<T>` into a sized array, panicking on length mismatch.
pub(crate) fn vec2arr<T, const N: usize>(v: Vec<T>) -> [T; N] {
    v.try_into()
        .unwrap_or_else(|v: Vec<T>| panic!("Expected a Vec of length {} but received length {}", N, v.len()))
}
