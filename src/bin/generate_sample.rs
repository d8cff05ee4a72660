//! Writes the synthetic sample datasets the dashboard loads at start-up:
//! a LAS well log, a multi-well production table (CSV plus a Parquet twin)
//! and a drilling parameter table.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Date32Array, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{Duration, NaiveDate};
use parquet::arrow::ArrowWriter;

use rusty_derrick::config::DashboardConfig;
use rusty_derrick::data::model::DataKind;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

// ---------------------------------------------------------------------------
// Geology shared by the well log and drilling tables
// ---------------------------------------------------------------------------

/// (top depth, name, hardness 1..10, base GR, base density)
const FORMATIONS: [(f64, &str, f64, f64, f64); 5] = [
    (1000.0, "Shale A", 3.0, 95.0, 2.45),
    (1120.0, "Sandstone B", 5.0, 45.0, 2.30),
    (1230.0, "Limestone C", 8.0, 25.0, 2.65),
    (1340.0, "Shale D", 4.0, 105.0, 2.50),
    (1420.0, "Dolomite E", 9.0, 20.0, 2.80),
];

fn formation_at(depth: f64) -> (&'static str, f64, f64, f64) {
    let (_, name, hardness, gr, rhob) = FORMATIONS
        .iter()
        .rev()
        .find(|f| depth >= f.0)
        .copied()
        .unwrap_or(FORMATIONS[0]);
    (name, hardness, gr, rhob)
}

// ---------------------------------------------------------------------------
// Well log (LAS 2.0)
// ---------------------------------------------------------------------------

fn write_well_log(path: &Path, rng: &mut SimpleRng) -> Result<usize> {
    let mut text = String::new();
    text.push_str(
        "~VERSION INFORMATION\n\
         \x20VERS.   2.0 : CWLS LOG ASCII STANDARD - VERSION 2.0\n\
         \x20WRAP.   NO  : ONE LINE PER DEPTH STEP\n\
         ~WELL INFORMATION\n\
         \x20STRT.M   1000.0 : START DEPTH\n\
         \x20STOP.M   1500.0 : STOP DEPTH\n\
         \x20STEP.M   0.5    : STEP\n\
         \x20NULL.    -999.25 : NULL VALUE\n\
         \x20COMP.    DERRICK ENERGY : COMPANY\n\
         \x20WELL.    SYNTHETIC-1 : WELL\n\
         \x20FLD .    NORTH FIELD : FIELD\n\
         \x20DATE.    2024-05-01 : LOG DATE\n\
         ~CURVE INFORMATION\n\
         \x20DEPT.M       : DEPTH\n\
         \x20GR  .GAPI    : GAMMA RAY\n\
         \x20RHOB.G/CC    : BULK DENSITY\n\
         \x20NPHI.V/V     : NEUTRON POROSITY\n\
         \x20RT  .OHMM    : DEEP RESISTIVITY\n\
         \x20DT  .US/FT   : SONIC TRAVEL TIME\n\
         \x20CALI.IN      : CALIPER\n\
         ~A  DEPT GR RHOB NPHI RT DT CALI\n",
    );

    let mut rows = 0;
    for i in 0..=1000 {
        let depth = 1000.0 + i as f64 * 0.5;
        let (_, _, gr_base, rhob_base) = formation_at(depth);
        let gr = gr_base + rng.gauss(0.0, 6.0);
        let rhob = rhob_base + rng.gauss(0.0, 0.03);
        let nphi = (0.45 - (rhob - 2.0) * 0.35 + rng.gauss(0.0, 0.01)).clamp(0.01, 0.45);
        let rt = (10f64).powf(1.8 - gr / 80.0 + rng.gauss(0.0, 0.1));
        let dt = 189.0 - (rhob - 1.0) * 60.0 + rng.gauss(0.0, 2.0);
        let cali = 8.5 + if gr > 80.0 { rng.next_f64() * 0.8 } else { 0.0 };
        // A short gap in the resistivity log.
        let rt = if (1300.0..1302.0).contains(&depth) { -999.25 } else { rt };
        writeln!(
            text,
            "{depth:.1} {gr:.3} {rhob:.4} {nphi:.4} {rt:.3} {dt:.2} {cali:.3}"
        )?;
        rows += 1;
    }
    fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Production (CSV + Parquet)
// ---------------------------------------------------------------------------

struct ProductionRow {
    date: NaiveDate,
    well: String,
    oil: f64,
    gas: f64,
    water: f64,
}

fn production_rows(rng: &mut SimpleRng) -> Vec<ProductionRow> {
    let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default();
    // (well, initial rate bbl/d, nominal decline per day, b-factor, gas-oil ratio)
    let wells = [
        ("WELL-A", 850.0, 0.004, 0.5, 1.2),
        ("WELL-B", 620.0, 0.003, 0.8, 1.6),
        ("WELL-C", 400.0, 0.002, 0.0, 0.9),
    ];
    let mut rows = Vec::new();
    for day in 0..365 {
        let date = start + Duration::days(day);
        let t = day as f64;
        for &(well, qi, di, b, gor) in &wells {
            let q = if b == 0.0 {
                qi * (-di * t).exp()
            } else {
                qi / (1.0 + b * di * t).powf(1.0 / b)
            };
            let oil = (q * (1.0 + rng.gauss(0.0, 0.05))).max(0.0);
            rows.push(ProductionRow {
                date,
                well: well.to_string(),
                oil,
                gas: (oil * gor * (1.0 + rng.gauss(0.0, 0.04))).max(0.0),
                water: (qi - q) * 0.6 * (1.0 + rng.gauss(0.0, 0.05)).max(0.0),
            });
        }
    }
    rows
}

fn write_production_csv(path: &Path, rows: &[ProductionRow]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    writer.write_record([
        "Date",
        "Well_ID",
        "Oil_Production_bbl",
        "Gas_Production_mcf",
        "Water_Production_bbl",
    ])?;
    for r in rows {
        writer.write_record([
            r.date.format("%Y-%m-%d").to_string(),
            r.well.clone(),
            format!("{:.2}", r.oil),
            format!("{:.2}", r.gas),
            format!("{:.2}", r.water),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_production_parquet(path: &Path, rows: &[ProductionRow]) -> Result<()> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();
    let schema = Arc::new(Schema::new(vec![
        Field::new("Date", DataType::Date32, false),
        Field::new("Well_ID", DataType::Utf8, false),
        Field::new("Oil_Production_bbl", DataType::Float64, false),
        Field::new("Gas_Production_mcf", DataType::Float64, false),
        Field::new("Water_Production_bbl", DataType::Float64, false),
    ]));
    let dates = Date32Array::from(
        rows.iter()
            .map(|r| (r.date - epoch).num_days() as i32)
            .collect::<Vec<_>>(),
    );
    let wells = StringArray::from(rows.iter().map(|r| r.well.as_str()).collect::<Vec<_>>());
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(dates),
            Arc::new(wells),
            Arc::new(Float64Array::from(rows.iter().map(|r| r.oil).collect::<Vec<_>>())),
            Arc::new(Float64Array::from(rows.iter().map(|r| r.gas).collect::<Vec<_>>())),
            Arc::new(Float64Array::from(rows.iter().map(|r| r.water).collect::<Vec<_>>())),
        ],
    )
    .context("building production record batch")?;

    let file = fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing production batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Drilling (CSV)
// ---------------------------------------------------------------------------

fn write_drilling(path: &Path, rng: &mut SimpleRng) -> Result<usize> {
    let start = NaiveDate::from_ymd_opt(2024, 5, 1)
        .and_then(|d| d.and_hms_opt(6, 0, 0))
        .unwrap_or_default();
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    writer.write_record([
        "Timestamp",
        "Depth",
        "ROP",
        "WOB",
        "RPM",
        "Torque",
        "Flow_Rate",
        "SPP",
        "Formation",
        "Formation_Hardness",
    ])?;

    let mut time = start;
    let mut rows = 0;
    let mut depth = 1000.0;
    while depth <= 1500.0 {
        let (name, hardness, _, _) = formation_at(depth);
        let wob = 15.0 + hardness * 1.5 + rng.gauss(0.0, 1.5);
        let rpm = 140.0 - hardness * 4.0 + rng.gauss(0.0, 5.0);
        let rop = (60.0 / hardness * (wob / 20.0) * (rpm / 120.0) + rng.gauss(0.0, 1.0)).max(0.5);
        let torque = 4.0 + wob * 0.35 + hardness * 0.4 + rng.gauss(0.0, 0.5);
        let flow = 550.0 + rng.gauss(0.0, 15.0);
        let spp = 2200.0 + depth * 0.6 + rng.gauss(0.0, 40.0);
        writer.write_record([
            time.format("%Y-%m-%d %H:%M:%S%.f").to_string(),
            format!("{depth:.1}"),
            format!("{rop:.2}"),
            format!("{wob:.2}"),
            format!("{rpm:.1}"),
            format!("{torque:.2}"),
            format!("{flow:.1}"),
            format!("{spp:.1}"),
            name.to_string(),
            format!("{hardness:.0}"),
        ])?;
        // One metre per row at the current rate of penetration.
        time += Duration::milliseconds((3_600_000.0 / rop) as i64);
        depth += 1.0;
        rows += 1;
    }
    writer.flush()?;
    Ok(rows)
}

fn main() -> Result<()> {
    env_logger::init();
    let config = DashboardConfig::load();
    fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("creating {}", config.data_dir.display()))?;
    let mut rng = SimpleRng::new(42);

    let las_path = config.sample_path(DataKind::WellLog);
    let n = write_well_log(&las_path, &mut rng)?;
    println!("Wrote {n} depth steps to {}", las_path.display());

    let rows = production_rows(&mut rng);
    let csv_path = config.sample_path(DataKind::Production);
    write_production_csv(&csv_path, &rows)?;
    let parquet_path = csv_path.with_extension("parquet");
    write_production_parquet(&parquet_path, &rows)?;
    println!(
        "Wrote {} production rows to {} and {}",
        rows.len(),
        csv_path.display(),
        parquet_path.display()
    );

    let drilling_path = config.sample_path(DataKind::Drilling);
    let n = write_drilling(&drilling_path, &mut rng)?;
    println!("Wrote {n} drilling rows to {}", drilling_path.display());
    Ok(())
}
