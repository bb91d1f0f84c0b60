//! CLI driver: argument parsing, directory traversal, media cross-reference,
//! and the tab-delimited / diagnostic writers around the `emobs` core.
//! Grounded on `original_source/EMObsReader/main.cpp`, `FileFind.{h,cpp}`,
//! `FileMapping.{h,cpp}`.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use emobs::diagnostics::{Diagnostics, HexDump, StderrDiagnostics, TlcListing};
use emobs::record::parser::parse_file;
use emobs::row::{Row, RowProjector, RowType};
use emobs::Cursor;

struct Config {
    search_path: PathBuf,
    file_spec: String,
    search_subdirs: bool,
    output_data: PathBuf,
    output_tlc_list: PathBuf,
    output_tlc_hierarchy: PathBuf,
    output_hex_dump: PathBuf,
    data_mode: bool,
    append_mode: bool,
    tlc_mode: bool,
    tlc_hierarchy_mode: bool,
    hex_dump_mode: bool,
    file_mapping: Option<PathBuf>,
}

fn usage() {
    eprintln!("Usage: emobs <filespec> [/s] [/o:<outputfile>] [/a] [/t] [/th] [/h] [/no] [/f:<filemapping>]");
    eprintln!("                         /s                 search sub-directories");
    eprintln!("                         /o:<outputfile>     output to outputfile (default EMObs_Data.txt)");
    eprintln!("                         /a                  append to output file");
    eprintln!("                         /t                  additionally export the TLCs (three letter codes)");
    eprintln!("                         /th                 additionally export the TLCs in their hierarchy");
    eprintln!("                         /h                  additionally dump the file to hex");
    eprintln!("                         /no                 don't export the row data");
    eprintln!("                         /f:<filemapping>    two-column tab delimited file renaming EMObs media references");
}

/// Parses argv into a [`Config`] (§6). Grounded on the original's
/// `parseArguments`: a positional file-or-wildcard path plus `/`-prefixed
/// flags, none of which take a space before their argument.
fn parse_args(args: &[String]) -> Option<Config> {
    let first = args.first()?;
    let full = Path::new(first);
    let search_path = full.parent().filter(|p| !p.as_os_str().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let file_spec = full.file_name()?.to_string_lossy().to_string();
    if file_spec.is_empty() {
        return None;
    }

    let mut search_subdirs = false;
    let mut append_mode = false;
    let mut tlc_mode = false;
    let mut tlc_hierarchy_mode = false;
    let mut hex_dump_mode = false;
    let mut data_mode = true;
    let mut output_data: Option<PathBuf> = None;
    let mut file_mapping: Option<PathBuf> = None;

    for arg in &args[1..] {
        let lower = arg.to_ascii_lowercase();
        if lower == "/s" {
            search_subdirs = true;
        } else if lower == "/a" {
            append_mode = true;
        } else if lower == "/t" {
            tlc_mode = true;
        } else if lower == "/th" {
            tlc_hierarchy_mode = true;
        } else if lower == "/h" {
            hex_dump_mode = true;
        } else if lower == "/no" {
            data_mode = false;
        } else if lower.starts_with("/o:") {
            output_data = Some(PathBuf::from(&arg[3..]));
        } else if lower.starts_with("/f:") {
            file_mapping = Some(PathBuf::from(&arg[3..]));
        }
    }

    let base_stem = output_data
        .as_ref()
        .map(|p| {
            let dir = p.parent().filter(|d| !d.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));
            dir.join(p.file_stem().unwrap_or_default())
        })
        .unwrap_or_else(|| PathBuf::from("EMObs"));

    let with_suffix = |suffix: &str| {
        let mut s = base_stem.as_os_str().to_os_string();
        s.push(suffix);
        PathBuf::from(s)
    };

    Some(Config{
        search_path,
        file_spec,
        search_subdirs,
        output_data: output_data.unwrap_or_else(|| with_suffix("_Data.txt")),
        output_tlc_list: with_suffix("_TLCList.txt"),
        output_tlc_hierarchy: with_suffix("_TLCHierarchy.txt"),
        output_hex_dump: with_suffix("_HexDump.txt"),
        data_mode,
        append_mode,
        tlc_mode,
        tlc_hierarchy_mode,
        hex_dump_mode,
        file_mapping,
    })
}

/// Loads a rename-map text file: one `old_name\tnew_name` entry per line,
/// compared case-insensitively (§6). Tolerates UTF-16LE (BOM-prefixed, as
/// the original tool's own text files are) or plain UTF-8.
fn load_file_mapping(path: &Path) -> HashMap<String, String> {
    let mut map = HashMap::new();
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(_) => return map,
    };
    let text = decode_text(&bytes);
    for line in text.lines() {
        let mut parts = line.splitn(2, '\t');
        let (Some(old), Some(new)) = (parts.next(), parts.next()) else { continue };
        let (old, new) = (old.trim(), new.trim());
        if !old.is_empty() && !new.is_empty() {
            map.insert(old.to_ascii_uppercase(), new.to_string());
        }
    }
    map
}

fn decode_text(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFF && bytes[1] == 0xFE {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        String::from_utf8_lossy(bytes).into_owned()
    }
}

fn rename(map: &HashMap<String, String>, name: &str) -> String {
    map.get(&name.to_ascii_uppercase()).cloned().unwrap_or_else(|| name.to_string())
}

/// One entry per physical file found on disk during the media scan: its
/// full path and size, keyed by uppercased filename (§6, `FileFind::ScanFiles`).
struct MediaIndex(HashMap<String, Vec<(PathBuf, u64)>>);

impl MediaIndex {
    /// Recursively indexes every regular file under `root` by uppercased
    /// filename. Dotfiles are skipped as the practical stand-in for the
    /// original's hidden/system attribute check.
    fn scan(root: &Path) -> Self {
        let mut map: HashMap<String, Vec<(PathBuf, u64)>> = HashMap::new();
        let mut stack = vec![root.to_path_buf()];
        while let Some(dir) = stack.pop() {
            let entries = match fs::read_dir(&dir) {
                Ok(e) => e,
                Err(_) => continue,
            };
            for entry in entries.flatten() {
                let path = entry.path();
                let name = entry.file_name().to_string_lossy().into_owned();
                if name.starts_with('.') {
                    continue;
                }
                if path.is_dir() {
                    stack.push(path);
                } else if path.is_file() {
                    let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
                    map.entry(name.to_ascii_uppercase()).or_default().push((path, size));
                }
            }
        }
        Self(map)
    }

    fn find(&self, name: &str) -> &[(PathBuf, u64)] {
        self.0.get(&name.to_ascii_uppercase()).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Warns (non-fatal) for every indexed filename matching `*.EMObs` with
    /// more than one candidate on disk — the original's up-front duplicate
    /// check, since per-video delivery directories are sometimes later
    /// combined into one EMObs directory without removing the originals.
    fn warn_duplicate_emobs(&self, diag: &mut dyn Diagnostics) {
        for (name, candidates) in &self.0 {
            if candidates.len() > 1 && name.to_ascii_uppercase().ends_with(".EMOBS") {
                let listing: Vec<String> = candidates
                    .iter()
                    .map(|(p, size)| format!("{} ({size} bytes)", p.display()))
                    .collect();
                diag.warn(format!("duplicate EMObs files found for '{name}': {}", listing.join(", ")));
            }
        }
    }
}

/// Resolved path/status for one side (left or right) of a row, after
/// cross-referencing against the [`MediaIndex`] (§6).
struct SideResolution {
    dir: String,
    file: String,
    status: String,
}

fn resolve_side(media: &MediaIndex, file_name: &str, row_no: usize, diag: &mut dyn Diagnostics) -> SideResolution {
    let found = media.find(file_name);
    match found.len() {
        1 => {
            let (path, _) = &found[0];
            SideResolution{
                dir: path.parent().map(|p| p.to_string_lossy().into_owned()).unwrap_or_default(),
                file: path.file_name().map(|f| f.to_string_lossy().into_owned()).unwrap_or_default(),
                status: "Ok".to_string(),
            }
        }
        0 => SideResolution{dir: String::new(), file: String::new(), status: "Missing".to_string()},
        n => {
            let listing: Vec<String> = found.iter().map(|(p, size)| format!("{} (size {size})", p.display())).collect();
            diag.warn(format!("row {row_no}: '{file_name}' matched {n} files: {}", listing.join(", ")));
            SideResolution{dir: String::new(), file: String::new(), status: format!("Found:{n}")}
        }
    }
}

/// A row plus the per-file prefix columns (`path_emobs`/`file_emobs`) the
/// core never carries, collected before cross-referencing against disk.
struct TaggedRow {
    row: Row,
    path_emobs: String,
    file_emobs: String,
}

/// A fully resolved output row: the library's [`Row`] plus the per-file
/// prefix columns and the cross-referenced left/right media status the
/// core never computes.
struct OutputRow {
    row: Row,
    path_emobs: String,
    file_emobs: String,
    file_left_status: String,
    file_right_status: String,
}

/// Mirrors the original's cross-reference `switch (item->rowType)` exactly:
/// only `MeasurementPoint3D`, `Point2DLeftCamera` and `Point2DRightCamera`
/// are resolved against disk. `Point3DLeftCamera`/`Point3DRightCamera` have
/// no matching case in the original and so are never looked up, even though
/// the enum declares them — an observed quirk, not reproduced as a bug fix.
fn cross_reference(
    rows: Vec<Row>,
    media: &MediaIndex,
    mapping: &HashMap<String, String>,
    diag: &mut dyn Diagnostics,
) -> Vec<OutputRow> {
    rows.into_iter()
        .map(|mut row| {
            let (mut file_left_status, mut file_right_status) = (String::new(), String::new());
            match row.row_type {
                RowType::MeasurementPoint3D => {
                    if let (Some(l), Some(r)) = (row.file_left.clone(), row.file_right.clone()) {
                        let left = resolve_side(media, &rename(mapping, &l), row.row, diag);
                        let right = resolve_side(media, &rename(mapping, &r), row.row, diag);
                        if left.status == "Ok" && right.status == "Ok" && left.dir == right.dir {
                            row.file_left = Some(left.file);
                            row.file_right = Some(right.file);
                            file_left_status = "Ok".to_string();
                            file_right_status = "Ok".to_string();
                        } else if left.status == "Ok" && right.status == "Ok" {
                            diag.warn(format!(
                                "row {}: '{l}' and '{r}' resolve to different directories ('{}' vs '{}')",
                                row.row, left.dir, right.dir
                            ));
                            file_left_status = format!("Path differ:{}", left.dir);
                            file_right_status = format!("Path differ:{}", right.dir);
                        } else {
                            file_left_status = left.status;
                            file_right_status = right.status;
                        }
                    }
                }
                RowType::Point2DLeftCamera => {
                    if let Some(l) = row.file_left.clone() {
                        let left = resolve_side(media, &rename(mapping, &l), row.row, diag);
                        if left.status == "Ok" {
                            row.file_left = Some(left.file);
                        }
                        file_left_status = left.status;
                    }
                }
                RowType::Point2DRightCamera => {
                    if let Some(r) = row.file_right.clone() {
                        let right = resolve_side(media, &rename(mapping, &r), row.row, diag);
                        if right.status == "Ok" {
                            row.file_right = Some(right.file);
                        }
                        file_right_status = right.status;
                    }
                }
                _ => {}
            }
            OutputRow{row, path_emobs: String::new(), file_emobs: String::new(), file_left_status, file_right_status}
        })
        .collect()
}

fn fmt_opt_i32(v: Option<i32>) -> String {
    v.map(|n| n.to_string()).unwrap_or_default()
}

fn fmt_opt_f64(v: Option<f64>) -> String {
    v.map(|n| n.to_string()).unwrap_or_default()
}

fn write_data_file(config: &Config, rows: &[OutputRow]) -> std::io::Result<()> {
    let mut file = fs::OpenOptions::new()
        .create(true)
        .write(true)
        .append(config.append_mode)
        .truncate(!config.append_mode)
        .open(&config.output_data)?;

    if !config.append_mode {
        writeln!(
            file,
            "Row\tPathEMObs\tFileEMObs\tOpCode\tRowType\tPeriod\tPath\tFileLeft\tFileLeftStatus\tFrameLeft\tPointLX1\tPointLY1\tPointLX2\tPointLY2\tFileRight\tFileRightStatus\tFrameRight\tPointRX1\tPointRY1\tPointRX2\tPointRY2\tLength\tFamily\tGenus\tSpecies\tCount"
        )?;
    }

    for r in rows {
        let row = &r.row;
        writeln!(
            file,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            row.row,
            emobs::row::replace_tabs(&r.path_emobs),
            emobs::row::replace_tabs(&r.file_emobs),
            emobs::row::replace_tabs(&row.op_code),
            row.row_type.as_str(),
            emobs::row::replace_tabs(&row.period),
            emobs::row::replace_tabs(&row.path),
            row.file_left.as_deref().map(emobs::row::replace_tabs).unwrap_or_default(),
            r.file_left_status,
            fmt_opt_i32(row.frame_left),
            fmt_opt_f64(row.point_lx1),
            fmt_opt_f64(row.point_ly1),
            fmt_opt_f64(row.point_lx2),
            fmt_opt_f64(row.point_ly2),
            row.file_right.as_deref().map(emobs::row::replace_tabs).unwrap_or_default(),
            r.file_right_status,
            fmt_opt_i32(row.frame_right),
            fmt_opt_f64(row.point_rx1),
            fmt_opt_f64(row.point_ry1),
            fmt_opt_f64(row.point_rx2),
            fmt_opt_f64(row.point_ry2),
            0,
            emobs::row::replace_tabs(&row.family),
            emobs::row::replace_tabs(&row.genus),
            emobs::row::replace_tabs(&row.species),
            row.count,
        )?;
    }
    Ok(())
}

/// Truncates `path` once (creating it if absent), matching the original's
/// `std::ios::trunc` for the TLC-list, TLC-hierarchy and hex-dump output
/// streams — unlike the data file, `/a` never gates these three.
fn truncate_output(path: &Path) -> std::io::Result<()> {
    fs::File::create(path)?;
    Ok(())
}

const TLC_LIST_HEADER: &str = "Row\tPath\tFileName\tOffset\tTLC\tByte\tData1\tData2\tData3";

fn write_tlc_list(path: &Path, path_emobs: &str, file_emobs: &str, cursor: &mut Cursor) -> std::io::Result<()> {
    let mut file = fs::OpenOptions::new().create(true).append(true).open(path)?;
    for entry in TlcListing::walk(cursor) {
        let mut diags = entry.diagnostics.into_iter();
        writeln!(
            file,
            "{}\t{}\t{}\t{:08X}\t{}\t{}\t{}\t{}\t{}",
            entry.row,
            path_emobs,
            file_emobs,
            entry.offset,
            entry.tlc,
            entry.version,
            diags.next().unwrap_or_default(),
            diags.next().unwrap_or_default(),
            diags.next().unwrap_or_default(),
        )?;
    }
    Ok(())
}

/// Renders the nested `TLC<version>>` hierarchy text exactly as the
/// original: `EBS`/`IDA`/trailer tags start a new top-level block indented
/// 3 spaces; `PDA`/`PDL`/`PD3` are indented 18 spaces under the block.
fn write_tlc_hierarchy(path: &Path, file_emobs: &str, cursor: &mut Cursor) -> std::io::Result<()> {
    let mut file = fs::OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "\n{file_emobs}")?;
    let mut out = String::new();
    for entry in TlcListing::walk(cursor) {
        match entry.tlc.as_str() {
            "EBS" | "IDA" | "CCC" | "CMS" | "PER" => {
                if entry.tlc != "EBS" {
                    out.push('\n');
                }
                out.push_str(&format!("{:08X}   ", entry.offset));
            }
            "PDA" | "PDL" | "PD3" => {
                out.push_str(&format!("\n{:18}", ""));
            }
            _ => {}
        }
        out.push_str(&format!("{}{}>", entry.tlc, entry.version));
    }
    writeln!(file, "{out}")?;
    Ok(())
}

fn write_hex_dump(path: &Path, file_emobs: &str, buf: &[u8]) -> std::io::Result<()> {
    let mut file = fs::OpenOptions::new().create(true).append(true).open(path)?;
    let dump = HexDump::default();
    let pages = dump.render(buf);
    let page_count = buf.len() / (dump.width * dump.rows_per_page);
    writeln!(file, "\n{file_emobs}  Size: {} bytes  Pages:{page_count}", buf.len())?;
    for (i, page) in pages.iter().enumerate() {
        if i > 0 {
            write!(file, "\x0C")?;
        }
        for line in page {
            writeln!(file, "{line}")?;
        }
    }
    Ok(())
}

/// Expands `config`'s file-or-wildcard spec into the matching paths under
/// `search_path` (recursively if `/s` was given). Grounded on the original's
/// `convertWildcardToRegex` + `directory_iterator`, using the `glob` crate's
/// own pattern matcher for the `*`/`?` semantics instead of hand-rolled regex.
fn find_input_files(config: &Config) -> Vec<PathBuf> {
    let pattern = glob::Pattern::new(&config.file_spec).ok();
    let mut out = Vec::new();
    let mut stack = vec![config.search_path.clone()];
    while let Some(dir) = stack.pop() {
        let entries = match fs::read_dir(&dir) {
            Ok(e) => e,
            Err(_) => continue,
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                if config.search_subdirs {
                    stack.push(path);
                }
                continue;
            }
            let name = match path.file_name() {
                Some(n) => n.to_string_lossy().into_owned(),
                None => continue,
            };
            let matches = pattern.as_ref().map(|p| p.matches(&name)).unwrap_or(false);
            if matches {
                out.push(path);
            }
        }
    }
    out.sort();
    out
}

fn run(args: &[String]) -> Result<(), String> {
    let config = parse_args(args).ok_or_else(|| "invalid arguments".to_string())?;

    let mapping = config.file_mapping.as_deref().map(load_file_mapping).unwrap_or_default();

    let files = find_input_files(&config);
    if files.is_empty() {
        eprintln!("no files matched '{}' under '{}'", config.file_spec, config.search_path.display());
    }

    let mut diag = StderrDiagnostics;
    let mut tagged_rows: Vec<TaggedRow> = Vec::new();
    let mut next_row = 1usize;

    // Truncated once up front, same as the original's `std::ios::trunc`
    // streams: `/a` only ever gates the data file, never these three.
    if config.tlc_mode {
        if let Err(e) = fs::write(&config.output_tlc_list, format!("{TLC_LIST_HEADER}\n")) {
            eprintln!("writing TLC list header: {e}");
        }
    }
    if config.tlc_hierarchy_mode {
        if let Err(e) = truncate_output(&config.output_tlc_hierarchy) {
            eprintln!("creating TLC hierarchy file: {e}");
        }
    }
    if config.hex_dump_mode {
        if let Err(e) = truncate_output(&config.output_hex_dump) {
            eprintln!("creating hex dump file: {e}");
        }
    }

    for path in &files {
        println!("Found: {}", path.display());
        let path_emobs = path.parent().map(|p| p.to_string_lossy().into_owned()).unwrap_or_default();
        let file_emobs = path.file_name().map(|f| f.to_string_lossy().into_owned()).unwrap_or_default();

        let mut cursor = match Cursor::open(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("{}: {e}", path.display());
                continue;
            }
        };

        if config.tlc_mode {
            let mut scan_cursor = Cursor::from_bytes(cursor.bytes().to_vec());
            if let Err(e) = write_tlc_list(&config.output_tlc_list, &path_emobs, &file_emobs, &mut scan_cursor) {
                eprintln!("writing TLC list for {}: {e}", path.display());
            }
        }
        if config.tlc_hierarchy_mode {
            let mut scan_cursor = Cursor::from_bytes(cursor.bytes().to_vec());
            if let Err(e) = write_tlc_hierarchy(&config.output_tlc_hierarchy, &file_emobs, &mut scan_cursor) {
                eprintln!("writing TLC hierarchy for {}: {e}", path.display());
            }
        }
        if config.hex_dump_mode {
            if let Err(e) = write_hex_dump(&config.output_hex_dump, &file_emobs, cursor.bytes()) {
                eprintln!("writing hex dump for {}: {e}", path.display());
            }
        }

        if config.data_mode {
            match parse_file(&mut cursor, &mut diag) {
                Ok((ebs, idas)) => {
                    let rows = RowProjector::project(&ebs, &idas, next_row, &mut diag);
                    next_row += rows.len();
                    for row in rows {
                        tagged_rows.push(TaggedRow{row, path_emobs: path_emobs.clone(), file_emobs: file_emobs.clone()});
                    }
                }
                Err(e) => eprintln!("{}: {e}", path.display()),
            }
        }
    }

    if config.data_mode && !tagged_rows.is_empty() {
        // Cross-reference against the media tree rooted at the search path,
        // same as `fileFind.ScanFiles(Config->searchPath)` in the original.
        let media = MediaIndex::scan(&config.search_path);
        media.warn_duplicate_emobs(&mut diag);
        let rows: Vec<Row> = tagged_rows.iter().map(|t| t.row.clone()).collect();
        let resolved = cross_reference(rows, &media, &mapping, &mut diag);
        let final_rows: Vec<OutputRow> = tagged_rows
            .into_iter()
            .zip(resolved)
            .map(|(tagged, resolved)| OutputRow{
                row: resolved.row,
                path_emobs: tagged.path_emobs,
                file_emobs: tagged.file_emobs,
                file_left_status: resolved.file_left_status,
                file_right_status: resolved.file_right_status,
            })
            .collect();
        if let Err(e) = write_data_file(&config, &final_rows) {
            eprintln!("writing data file: {e}");
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        usage();
        return ExitCode::from(1);
    }
    match run(&args) {
        Ok(()) => ExitCode::from(0),
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(1)
        }
    }
}
