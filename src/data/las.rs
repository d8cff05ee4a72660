//! LAS 2.0 well-log reader.
//!
//! A LAS file is a set of `~`-prefixed sections. Header sections hold
//! `MNEM.UNIT  VALUE : DESCRIPTION` lines; the `~A` section holds one row of
//! whitespace-delimited samples per depth step (or a flat wrapped stream when
//! `WRAP` is `YES`). The first curve is the index and becomes `DEPTH`.

use std::collections::HashMap;

use anyhow::{Context, Result, bail};

use super::model::{Column, HeaderItem, Table};

/// Canonical name of the index curve after loading.
pub const DEPTH: &str = "DEPTH";

const DEFAULT_NULL: f64 = -999.25;

/// Parsed LAS file.
#[derive(Debug, Clone, PartialEq)]
pub struct LasFile {
    pub version: Vec<HeaderItem>,
    pub well: Vec<HeaderItem>,
    pub curves: Vec<HeaderItem>,
    pub params: Vec<HeaderItem>,
    /// Free text of the `~O` section.
    pub other: String,
    /// One row per depth sample, one column per curve; DEPTH first.
    pub table: Table,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Version,
    Well,
    Curves,
    Params,
    Other,
    Data,
    Unknown,
}

impl Section {
    fn from_marker(line: &str) -> Section {
        match line[1..].chars().next().map(|c| c.to_ascii_uppercase()) {
            Some('V') => Section::Version,
            Some('W') => Section::Well,
            Some('C') => Section::Curves,
            Some('P') => Section::Params,
            Some('O') => Section::Other,
            Some('A') => Section::Data,
            _ => Section::Unknown,
        }
    }
}

/// Parse LAS text into header sections and a depth-indexed table.
pub fn parse_las(text: &str) -> Result<LasFile> {
    let mut version = Vec::new();
    let mut well = Vec::new();
    let mut curves = Vec::new();
    let mut params = Vec::new();
    let mut other = String::new();
    // (line number, tokens) for every non-empty data line.
    let mut data_lines: Vec<(usize, Vec<&str>)> = Vec::new();

    let mut section = Section::Unknown;
    let mut saw_data_section = false;

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line.starts_with('~') {
            section = Section::from_marker(line);
            saw_data_section |= section == Section::Data;
            continue;
        }
        let items = match section {
            Section::Version => &mut version,
            Section::Well => &mut well,
            Section::Curves => &mut curves,
            Section::Params => &mut params,
            Section::Other => {
                other.push_str(line);
                other.push('\n');
                continue;
            }
            Section::Data => {
                data_lines.push((line_no, line.split_whitespace().collect()));
                continue;
            }
            Section::Unknown => continue,
        };
        match parse_header_line(line) {
            Some(item) => items.push(item),
            None => log::warn!("LAS line {line_no}: no '.' after the mnemonic, skipped"),
        }
    }

    if !saw_data_section {
        bail!("no ~A data section found");
    }
    if curves.is_empty() {
        bail!("no curve definitions in the ~C section");
    }

    let wrapped = header_value(&version, "WRAP")
        .map(|v| v.eq_ignore_ascii_case("YES"))
        .unwrap_or(false);
    let null_value = match header_value(&well, "NULL") {
        Some(v) => v
            .parse::<f64>()
            .with_context(|| format!("NULL value '{v}' is not a number"))?,
        None => DEFAULT_NULL,
    };

    let names = curve_names(&curves);
    let n_curves = names.len();
    let mut values: Vec<Vec<f64>> = vec![Vec::new(); n_curves];

    let mut push_row = |row: &[&str], line_no: usize| -> Result<()> {
        for (col, tok) in row.iter().enumerate() {
            let v: f64 = tok.parse().with_context(|| {
                format!("line {line_no}, curve {}: '{tok}' is not a number", names[col])
            })?;
            values[col].push(if (v - null_value).abs() < 1e-9 { f64::NAN } else { v });
        }
        Ok(())
    };

    if wrapped {
        let flat: Vec<(usize, &str)> = data_lines
            .iter()
            .flat_map(|(n, toks)| toks.iter().map(move |t| (*n, *t)))
            .collect();
        if flat.len() % n_curves != 0 {
            bail!(
                "wrapped data has {} values, not a multiple of {n_curves} curves",
                flat.len()
            );
        }
        for chunk in flat.chunks(n_curves) {
            let row: Vec<&str> = chunk.iter().map(|(_, t)| *t).collect();
            push_row(&row, chunk[0].0)?;
        }
    } else {
        for (line_no, toks) in &data_lines {
            if toks.len() != n_curves {
                bail!(
                    "line {line_no}: expected {n_curves} values, found {}",
                    toks.len()
                );
            }
            push_row(&toks[..], *line_no)?;
        }
    }

    orient_depth(&mut values)?;

    let columns = names
        .into_iter()
        .zip(values)
        .map(|(name, vals)| Column::numeric(name, vals))
        .collect();
    let table = Table::new(columns)?;

    Ok(LasFile {
        version,
        well,
        curves,
        params,
        other,
        table,
    })
}

/// `MNEM.UNIT  VALUE : DESCRIPTION`. The unit ends at the first whitespace
/// after the dot; the description starts after the last colon. `None` when
/// the line has no dot at all.
fn parse_header_line(line: &str) -> Option<HeaderItem> {
    let (mnemonic, rest) = line.split_once('.')?;
    let unit_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
    let (unit, rest) = rest.split_at(unit_end);
    let (value, description) = match rest.rfind(':') {
        Some(pos) => (&rest[..pos], &rest[pos + 1..]),
        None => (rest, ""),
    };
    Some(HeaderItem {
        mnemonic: mnemonic.trim().to_string(),
        unit: unit.trim().to_string(),
        value: value.trim().to_string(),
        description: description.trim().to_string(),
    })
}

fn header_value<'a>(items: &'a [HeaderItem], mnemonic: &str) -> Option<&'a str> {
    items
        .iter()
        .find(|i| i.mnemonic.eq_ignore_ascii_case(mnemonic))
        .map(|i| i.value.as_str())
}

/// Column names. The index curve becomes `DEPTH`; repeated mnemonics,
/// including a later curve also called `DEPTH`, become `GR:1`, `GR:2`, ...
fn curve_names(curves: &[HeaderItem]) -> Vec<String> {
    let mnemonics: Vec<&str> = curves
        .iter()
        .enumerate()
        .map(|(i, c)| if i == 0 { DEPTH } else { c.mnemonic.as_str() })
        .collect();
    let mut totals: HashMap<&str, usize> = HashMap::new();
    for &m in &mnemonics {
        *totals.entry(m).or_default() += 1;
    }
    let mut seen: HashMap<&str, usize> = HashMap::new();
    mnemonics
        .iter()
        .enumerate()
        .map(|(i, &m)| {
            if i == 0 {
                DEPTH.to_string()
            } else if totals[m] > 1 {
                let n = seen.entry(m).or_default();
                *n += 1;
                format!("{m}:{n}")
            } else {
                m.to_string()
            }
        })
        .collect()
}

/// Ensure the index curve is non-decreasing, reversing a log recorded
/// bottom-up.
fn orient_depth(values: &mut [Vec<f64>]) -> Result<()> {
    let depth = &values[0];
    if depth.iter().any(|d| d.is_nan()) {
        bail!("index curve has missing depth values");
    }
    let increasing = depth.windows(2).all(|w| w[0] <= w[1]);
    if increasing {
        return Ok(());
    }
    let decreasing = depth.windows(2).all(|w| w[0] >= w[1]);
    if !decreasing {
        bail!("index curve is not monotonic");
    }
    for col in values.iter_mut() {
        col.reverse();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASIC: &str = "\
~VERSION INFORMATION
 VERS.   2.0 : CWLS LOG ASCII STANDARD - VERSION 2.0
 WRAP.   NO  : ONE LINE PER DEPTH STEP
~WELL INFORMATION
 STRT.M  100.0 : START DEPTH
 STOP.M  100.5 : STOP DEPTH
 STEP.M  0.25  : STEP
 NULL.   -999.25 : NULL VALUE
 WELL.   SYNTH-1 : WELL
 DATE.   2024-03-01 10:30 : LOG DATE
~CURVE INFORMATION
 DEPT.M      : DEPTH
 GR  .GAPI   : GAMMA RAY
 RHOB.G/CC   : BULK DENSITY
~PARAMETER INFORMATION
 BHT .DEGC  85.0 : BOTTOM HOLE TEMPERATURE
~OTHER
 Synthetic test log
~A  DEPT GR RHOB
100.00  45.2  2.45
100.25  60.1  -999.25
100.50  75.3  2.51
";

    #[test]
    fn parses_sections_and_data() {
        let las = parse_las(BASIC).unwrap();
        assert_eq!(las.table.column_names(), vec!["DEPTH", "GR", "RHOB"]);
        assert_eq!(las.table.n_rows(), 3);
        assert_eq!(las.table.numeric("DEPTH").unwrap(), &[100.0, 100.25, 100.5]);
        assert!(las.table.numeric("RHOB").unwrap()[1].is_nan());
        assert_eq!(las.params[0].mnemonic, "BHT");
        assert_eq!(las.params[0].unit, "DEGC");
        assert!(las.other.contains("Synthetic"));
    }

    #[test]
    fn header_value_with_colon_keeps_time() {
        let las = parse_las(BASIC).unwrap();
        let date = las.well.iter().find(|i| i.mnemonic == "DATE").unwrap();
        assert_eq!(date.value, "2024-03-01 10:30");
        assert_eq!(date.description, "LOG DATE");
        let well = las.well.iter().find(|i| i.mnemonic == "WELL").unwrap();
        assert_eq!(well.unit, "");
        assert_eq!(well.value, "SYNTH-1");
    }

    #[test]
    fn wrapped_data_is_chunked_by_curve_count() {
        let text = "\
~V
 WRAP. YES : MULTIPLE LINES PER DEPTH STEP
~C
 DEPT.M : DEPTH
 GR.GAPI : GR
 NPHI.V/V : NEUTRON
~A
10.0
 50.0 0.2
11.0
 55.0 0.25
";
        let las = parse_las(text).unwrap();
        assert_eq!(las.table.n_rows(), 2);
        assert_eq!(las.table.numeric("NPHI").unwrap(), &[0.2, 0.25]);
    }

    #[test]
    fn duplicate_mnemonics_get_suffixes() {
        let text = "~C\n DEPT.M : D\n GR.GAPI : a\n GR.GAPI : b\n~A\n1 2 3\n";
        let las = parse_las(text).unwrap();
        assert_eq!(las.table.column_names(), vec!["DEPTH", "GR:1", "GR:2"]);
    }

    #[test]
    fn curve_named_depth_does_not_clash_with_index() {
        let text = "~C\n DEPT.M : D\n DEPTH.M : tvd\n GR.GAPI : g\n~A\n1 0.9 10\n2 1.8 20\n";
        let las = parse_las(text).unwrap();
        assert_eq!(las.table.column_names(), vec!["DEPTH", "DEPTH:1", "GR"]);
        assert_eq!(las.table.numeric("DEPTH").unwrap(), &[1.0, 2.0]);
        assert_eq!(las.table.numeric("DEPTH:1").unwrap(), &[0.9, 1.8]);
    }

    #[test]
    fn header_line_without_dot_is_skipped() {
        let text = "~W\n WELL. W-7 : name\n free text without a separator\n\
                    ~C\n DEPT.M : D\n GR.GAPI : g\n~A\n1 10\n";
        let las = parse_las(text).unwrap();
        assert_eq!(las.well.len(), 1);
        assert_eq!(las.well[0].value, "W-7");
        assert_eq!(las.table.numeric("GR").unwrap(), &[10.0]);
    }

    #[test]
    fn bottom_up_log_is_reversed() {
        let text = "~C\n DEPT.M : D\n GR.GAPI : g\n~A\n3 30\n2 20\n1 10\n";
        let las = parse_las(text).unwrap();
        assert_eq!(las.table.numeric("DEPTH").unwrap(), &[1.0, 2.0, 3.0]);
        assert_eq!(las.table.numeric("GR").unwrap(), &[10.0, 20.0, 30.0]);
    }

    #[test]
    fn non_monotonic_depth_is_rejected() {
        let text = "~C\n DEPT.M : D\n~A\n1\n3\n2\n";
        let err = parse_las(text).unwrap_err();
        assert!(err.to_string().contains("monotonic"));
    }

    #[test]
    fn short_row_reports_line() {
        let text = "~C\n DEPT.M : D\n GR.GAPI : g\n~A\n1 10\n2\n";
        let err = parse_las(text).unwrap_err();
        assert!(err.to_string().contains("line 6"), "{err}");
    }

    #[test]
    fn missing_data_section_fails() {
        assert!(parse_las("~V\n VERS. 2.0 : v\n").is_err());
    }
}
