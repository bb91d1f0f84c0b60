//! Reads EMObs stereo-video annotation files: a tag-structured, not
//! self-delimiting binary format produced by a proprietary annotation
//! tool. Walks the tree of three-letter-code ("TLC") records, reconstructs
//! it into typed records, and projects it into a flat stream of
//! annotation rows.
//!
//! ```rs
//! use emobs::cursor::Cursor;
//! use emobs::record::parser::parse_file;
//! use emobs::row::RowProjector;
//! use emobs::diagnostics::VecDiagnostics;
//!
//! fn main() -> Result<(), emobs::errors::EMObsError> {
//!     let mut cursor = Cursor::open("OBSERVATIONS.EMObs")?;
//!     let mut diag = VecDiagnostics::default();
//!     let (ebs, idas) = parse_file(&mut cursor, &mut diag)?;
//!     let rows = RowProjector::project(&ebs, &idas, 1, &mut diag);
//!     println!("{} rows, {} diagnostics", rows.len(), diag.0.len());
//!     Ok(())
//! }
//! ```

pub mod cursor;
pub mod diagnostics;
pub mod errors;
pub mod fields;
pub mod record;
pub mod row;
pub(crate) mod support;
pub mod tlc;

pub use cursor::Cursor;
pub use diagnostics::{Diagnostics, HexDump, StderrDiagnostics, TlcListing, VecDiagnostics};
pub use errors::EMObsError;
pub use fields::Mat;
pub use record::parser::parse_file;
pub use record::{Annotation, Cin, Cpt, Ebs, Fra, Ida, Pd3, Pda, Pdl, Ptn};
pub use row::{Row, RowProjector, RowType};
pub use tlc::{Tlc, TlcScan};
