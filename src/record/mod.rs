//! Typed record tree (§3). One struct per TLC, grounded on the teacher's
//! `atom_types/*.rs`: a plain struct per record type, fields in declared
//! body order, no shared ownership between parent and children.

pub mod parser;

use crate::fields::Mat;

/// File-level header; the sole root of the tree (§3, §4.3).
#[derive(Debug, Clone)]
pub struct Ebs {
    pub version: u8,
    pub picture_directory: String,
    pub cin: Cin,
    pub ptn: Ptn,
}

/// Info fields: two parallel MATs, field titles and field values.
#[derive(Debug, Clone)]
pub struct Cin {
    pub field_titles: Mat,
    pub field_values: Mat,
}

/// Collection column titles plus a trailing int32 (observed 86 in the wild,
/// semantics undocumented).
#[derive(Debug, Clone)]
pub struct Ptn {
    pub titles: Mat,
    pub i_data1: i32,
}

/// An observation group tied to a frame.
#[derive(Debug, Clone)]
pub struct Ida {
    pub fra: Fra,
    pub pdas: Vec<Pda>,
    pub opaque1: [u8; 16],
    pub period_name: String,
    pub pdls: Vec<Pdl>,
    pub pd3s: Vec<Pd3>,
    pub opaque2: [u8; 16],
}

/// Frame reference: camera side + frame index + media filename.
#[derive(Debug, Clone)]
pub struct Fra {
    pub camera: i32,
    pub frame: i32,
    pub media: String,
}

/// 2D point. `opaque` is `Some` only for version 1 (§3, §9 open question).
#[derive(Debug, Clone)]
pub struct Pda {
    pub version: u8,
    pub cpt: Cpt,
    pub mat: Mat,
    pub opaque: Option<[u8; 16]>,
}

/// 3D measurement: two points on the left camera paired with two on the
/// right, plus the right-side frame reference.
#[derive(Debug, Clone)]
pub struct Pdl {
    pub cpt1: Cpt,
    pub cpt2: Cpt,
    pub cpt3: Cpt,
    pub cpt4: Cpt,
    pub fra: Fra,
    pub mat: Mat,
}

/// 3D single-camera point pair.
#[derive(Debug, Clone)]
pub struct Pd3 {
    pub cpt1: Cpt,
    pub cpt2: Cpt,
    pub fra: Fra,
    pub mat: Mat,
}

/// Coordinate: a pair of doubles.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cpt {
    pub x: f64,
    pub y: f64,
}

/// Annotation records attached to an `Ida`, in the order the row projector
/// walks them: `PDAs ++ PDLs ++ PD3s` (§4.4).
#[derive(Debug, Clone)]
pub enum Annotation {
    Pda(Pda),
    Pdl(Pdl),
    Pd3(Pd3),
}

impl Ida {
    /// `PDAs ++ PDLs ++ PD3s`, the exact order `RowProjector` walks them.
    pub fn annotations(&self) -> Vec<Annotation> {
        let mut out = Vec::with_capacity(self.pdas.len() + self.pdls.len() + self.pd3s.len());
        out.extend(self.pdas.iter().cloned().map(Annotation::Pda));
        out.extend(self.pdls.iter().cloned().map(Annotation::Pdl));
        out.extend(self.pd3s.iter().cloned().map(Annotation::Pd3));
        out
    }
}

/// Recognized top-level trailer tags; their bodies are never parsed (§3,
/// §4.3, §4.7) — encountering any one of them stops the top-level scan
/// cleanly.
pub const TRAILER_TAGS: [&str; 3] = ["CMS", "PER", "CCC"];
