//! Flattens an `Ebs` tree and its `Ida` children into the 26-column row
//! schema (§4.4, §6). Grounded on the teacher's `track/sample.rs`: walk a
//! parent's children, emit one output value per child, carry a running
//! index across the walk.

use crate::diagnostics::Diagnostics;
use crate::fields::Mat;
use crate::record::{Annotation, Ebs, Ida};

/// One of the five row-type literals from §6. `Point3D` is never
/// constructed by [`RowProjector::project`] — it exists only so the tab
/// writer can print the literal `3DPoint` the schema documents as a
/// possible value, mirroring the original's own declared-but-unused
/// `RowType::Point3D` enumerator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowType {
    MeasurementPoint3D,
    Point3D,
    Point3DLeftCamera,
    Point3DRightCamera,
    Point2DLeftCamera,
    Point2DRightCamera,
    Unknown,
}

impl RowType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RowType::MeasurementPoint3D => "3D Measurement",
            RowType::Point3D | RowType::Point3DLeftCamera | RowType::Point3DRightCamera => "3DPoint",
            RowType::Point2DLeftCamera => "2DPoint Left",
            RowType::Point2DRightCamera => "2DPoint Right",
            RowType::Unknown => "Unknown",
        }
    }
}

/// One output row, the in-memory counterpart of a tab-delimited line.
/// `None` denotes an empty field, written as an empty string by the
/// collaborator writer.
#[derive(Debug, Clone)]
pub struct Row {
    pub row: usize,
    pub row_type: RowType,
    pub period: String,
    pub path: String,
    pub file_left: Option<String>,
    pub frame_left: Option<i32>,
    pub point_lx1: Option<f64>,
    pub point_ly1: Option<f64>,
    pub point_lx2: Option<f64>,
    pub point_ly2: Option<f64>,
    pub file_right: Option<String>,
    pub frame_right: Option<i32>,
    pub point_rx1: Option<f64>,
    pub point_ry1: Option<f64>,
    pub point_rx2: Option<f64>,
    pub point_ry2: Option<f64>,
    pub family: String,
    pub genus: String,
    pub species: String,
    pub count: i32,
    pub op_code: String,
}

/// Replaces literal tabs in `s` with `<Tab>`. Idempotent: running it twice
/// is the same as running it once, since the output never contains a raw
/// tab (§8 property 6).
pub fn replace_tabs(s: &str) -> String {
    s.replace('\t', "<Tab>")
}

fn taxonomy(mat: &Mat, diag: &mut dyn Diagnostics) -> (String, String, String, i32) {
    let family = mat.get(0, 0).unwrap_or("").to_string();
    let genus = mat.get(1, 0).unwrap_or("").to_string();
    let species = mat.get(2, 0).unwrap_or("").to_string();
    let count = match mat.get(4, 0) {
        None | Some("") => 1,
        Some(s) => match s.trim().parse::<i32>() {
            Ok(n) => n,
            Err(_) => {
                diag.warn(format!("unparseable count field {s:?}"));
                -1
            }
        },
    };
    (family, genus, species, count)
}

pub struct RowProjector;

impl RowProjector {
    /// Projects `ebs`'s `Ida` list into rows, starting the row counter at
    /// `start_row` (1 for a fresh file, `last+1` when appending).
    pub fn project(ebs: &Ebs, idas: &[Ida], start_row: usize, diag: &mut dyn Diagnostics) -> Vec<Row> {
        let op = ebs.cin.field_values.get(0, 0).unwrap_or("").to_string();
        let path = ebs.picture_directory.clone();

        let mut rows = Vec::new();
        let mut next_row = start_row;

        for ida in idas {
            let outer = &ida.fra;
            let period = ida.period_name.clone();

            for annotation in ida.annotations() {
                let row = match annotation {
                    Annotation::Pda(pda) => {
                        let (family, genus, species, count) = taxonomy(&pda.mat, diag);
                        let mut row = Row{
                            row: next_row,
                            row_type: if outer.camera == 0 {
                                RowType::Point2DLeftCamera
                            } else {
                                RowType::Point2DRightCamera
                            },
                            period: period.clone(),
                            path: path.clone(),
                            file_left: None,
                            frame_left: None,
                            point_lx1: None,
                            point_ly1: None,
                            point_lx2: None,
                            point_ly2: None,
                            file_right: None,
                            frame_right: None,
                            point_rx1: None,
                            point_ry1: None,
                            point_rx2: None,
                            point_ry2: None,
                            family,
                            genus,
                            species,
                            count,
                            op_code: op.clone(),
                        };
                        if outer.camera == 0 {
                            row.file_left = Some(outer.media.clone());
                            row.frame_left = Some(outer.frame);
                            row.point_lx1 = Some(pda.cpt.x);
                            row.point_ly1 = Some(pda.cpt.y);
                        } else {
                            row.file_right = Some(outer.media.clone());
                            row.frame_right = Some(outer.frame);
                            row.point_rx1 = Some(pda.cpt.x);
                            row.point_ry1 = Some(pda.cpt.y);
                        }
                        row
                    }
                    Annotation::Pdl(pdl) => {
                        if !(outer.camera == 0 && pdl.fra.camera == 1) {
                            diag.warn(format!(
                                "PDL camera mismatch: outer={} inner={}",
                                outer.camera, pdl.fra.camera
                            ));
                        }
                        let (family, genus, species, count) = taxonomy(&pdl.mat, diag);
                        Row{
                            row: next_row,
                            row_type: RowType::MeasurementPoint3D,
                            period: period.clone(),
                            path: path.clone(),
                            file_left: Some(outer.media.clone()),
                            frame_left: Some(outer.frame),
                            point_lx1: Some(pdl.cpt1.x),
                            point_ly1: Some(pdl.cpt1.y),
                            point_lx2: Some(pdl.cpt2.x),
                            point_ly2: Some(pdl.cpt2.y),
                            file_right: Some(pdl.fra.media.clone()),
                            frame_right: Some(pdl.fra.frame),
                            point_rx1: Some(pdl.cpt3.x),
                            point_ry1: Some(pdl.cpt3.y),
                            point_rx2: Some(pdl.cpt4.x),
                            point_ry2: Some(pdl.cpt4.y),
                            family,
                            genus,
                            species,
                            count,
                            op_code: op.clone(),
                        }
                    }
                    Annotation::Pd3(pd3) => {
                        let (family, genus, species, count) = taxonomy(&pd3.mat, diag);
                        let mut row = Row{
                            row: next_row,
                            row_type: if outer.camera == 0 {
                                RowType::Point3DLeftCamera
                            } else {
                                RowType::Point3DRightCamera
                            },
                            period: period.clone(),
                            path: path.clone(),
                            file_left: None,
                            frame_left: None,
                            point_lx1: None,
                            point_ly1: None,
                            point_lx2: None,
                            point_ly2: None,
                            file_right: None,
                            frame_right: None,
                            point_rx1: None,
                            point_ry1: None,
                            point_rx2: None,
                            point_ry2: None,
                            family,
                            genus,
                            species,
                            count,
                            op_code: op.clone(),
                        };
                        if outer.camera == 0 {
                            row.file_left = Some(outer.media.clone());
                            row.frame_left = Some(outer.frame);
                            row.point_lx1 = Some(pd3.cpt1.x);
                            row.point_ly1 = Some(pd3.cpt1.y);
                            row.point_lx2 = Some(pd3.cpt2.x);
                            row.point_ly2 = Some(pd3.cpt2.y);
                        } else {
                            // Preserves the source's asymmetry (§9): File/Frame
                            // on the right side come from the inner PD3's own
                            // FRA, not the outer IDA's FRA.
                            row.file_right = Some(pd3.fra.media.clone());
                            row.frame_right = Some(pd3.fra.frame);
                            row.point_rx1 = Some(pd3.cpt1.x);
                            row.point_ry1 = Some(pd3.cpt1.y);
                            row.point_rx2 = Some(pd3.cpt2.x);
                            row.point_ry2 = Some(pd3.cpt2.y);
                        }
                        row
                    }
                };
                rows.push(row);
                next_row += 1;
            }
        }

        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::VecDiagnostics;
    use crate::record::{Cin, Cpt, Fra, Pd3, Pda, Ptn};

    fn mat(values: Vec<Vec<&str>>) -> Mat {
        let dim_x = values.len();
        let dim_y = if dim_x > 0 {values[0].len()} else {0};
        let mut buf = b"MAT\0".to_vec();
        buf.extend_from_slice(&(dim_x as i32).to_le_bytes());
        buf.extend_from_slice(&(dim_y as i32).to_le_bytes());
        for y in 0..dim_y {
            for x in 0..dim_x {
                let s = values[x][y];
                let units: Vec<u16> = s.encode_utf16().collect();
                buf.extend_from_slice(&(-(units.len() as i32)).to_le_bytes());
                for u in units {
                    buf.extend_from_slice(&u.to_le_bytes());
                }
            }
        }
        let mut cur = crate::cursor::Cursor::from_bytes(buf);
        crate::fields::read_mat(&mut cur).unwrap()
    }

    fn empty_ebs(op: &str, picture_dir: &str) -> Ebs {
        Ebs{
            version: 5,
            picture_directory: picture_dir.to_string(),
            cin: Cin{
                field_titles: mat(vec![vec!["title"]]),
                field_values: mat(vec![vec![op]]),
            },
            ptn: Ptn{titles: mat(vec![vec!["t"]]), i_data1: 86},
        }
    }

    #[test]
    fn s2_projects_single_left_pda_row() {
        let ebs = empty_ebs("op", "./px");
        let ida = crate::record::Ida{
            fra: Fra{camera: 0, frame: 42, media: "L.mp4".to_string()},
            pdas: vec![Pda{
                version: 1,
                cpt: Cpt{x: 10.5, y: 20.25},
                mat: mat(vec![vec!["Fam"], vec!["Gen"], vec!["Sp"], vec![""], vec!["3"]]),
                opaque: Some([0u8; 16]),
            }],
            opaque1: [0u8; 16],
            period_name: "P1".to_string(),
            pdls: vec![],
            pd3s: vec![],
            opaque2: [0u8; 16],
        };
        let mut diag = VecDiagnostics::default();
        let rows = RowProjector::project(&ebs, &[ida], 1, &mut diag);
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.row_type.as_str(), "2DPoint Left");
        assert_eq!(row.file_left.as_deref(), Some("L.mp4"));
        assert_eq!(row.frame_left, Some(42));
        assert_eq!(row.point_lx1, Some(10.5));
        assert_eq!(row.point_ly1, Some(20.25));
        assert_eq!(row.count, 3);
        assert!(row.file_right.is_none());
    }

    #[test]
    fn pd3_camera1_substitutes_inner_fra_for_right_side() {
        let ebs = empty_ebs("op", "./px");
        let ida = crate::record::Ida{
            fra: Fra{camera: 1, frame: 7, media: "outer.mp4".to_string()},
            pdas: vec![],
            opaque1: [0u8; 16],
            period_name: "P1".to_string(),
            pdls: vec![],
            pd3s: vec![Pd3{
                cpt1: Cpt{x: 1.0, y: 2.0},
                cpt2: Cpt{x: 3.0, y: 4.0},
                fra: Fra{camera: 1, frame: 99, media: "inner.mp4".to_string()},
                mat: mat(vec![vec!["F"], vec!["G"], vec!["S"], vec![""], vec![""]]),
            }],
            opaque2: [0u8; 16],
        };
        let mut diag = VecDiagnostics::default();
        let rows = RowProjector::project(&ebs, &[ida], 1, &mut diag);
        let row = &rows[0];
        assert_eq!(row.row_type.as_str(), "3DPoint");
        assert_eq!(row.file_right.as_deref(), Some("inner.mp4"));
        assert_eq!(row.frame_right, Some(99));
        assert!(row.file_left.is_none());
    }

    #[test]
    fn replace_tabs_is_idempotent() {
        let once = replace_tabs("a\tb");
        let twice = replace_tabs(&once);
        assert_eq!(once, twice);
    }
}
