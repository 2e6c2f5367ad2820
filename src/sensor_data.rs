//! # Sensor data モジュール
//!
//! センサーデータファイルの読み込みと生成を行います。
//!
//! ファイルは1行1センサーのプレーンテキストで、空白区切りの5フィールド
//! `id x y z energy_consumption` から成ります。
//!
//! - 不正な行（フィールド数違い・数値解析失敗）は警告を出してスキップ
//! - 重複IDは最初の行を採用し、以降は警告を出してスキップ
//! - ファイルが存在しない場合は警告を出し、空のセンサー集合を返す

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

use rand::Rng;
use rand_distr::{Distribution, Normal, NormalError};
use thiserror::Error;
use tracing::{info, warn};

use crate::models::{Point, Sensor};

/// センサー高度の上限 [m]
const MAX_SENSOR_ALTITUDE: f64 = 50.0;
/// エネルギー消費率の分布（平均・標準偏差・下限・上限）
const CONSUMPTION_MEAN: f64 = 550.0;
const CONSUMPTION_STD_DEV: f64 = 150.0;
const CONSUMPTION_MIN: f64 = 100.0;
const CONSUMPTION_MAX: f64 = 1000.0;

/// 行単位の解析エラー
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SensorDataError {
    #[error("{line}行目: フィールド数が不正です (5個必要, {found}個)")]
    FieldCount { line: usize, found: usize },

    #[error("{line}行目: {field} の値 '{value}' を解析できません")]
    InvalidNumber { line: usize, field: &'static str, value: String },
}

/// ファイル1行分のセンサー情報
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorRecord {
    pub id: u32,
    pub position: Point,
    pub energy_consumption: f64,
}

impl SensorRecord {
    pub fn into_sensor(self, battery_cap: f64) -> Sensor {
        Sensor::new(self.id, self.position, battery_cap).with_consumption_rate(self.energy_consumption)
    }
}

fn parse_field<T: std::str::FromStr>(line: usize, field: &'static str, value: &str) -> Result<T, SensorDataError> {
    value.parse().map_err(|_| SensorDataError::InvalidNumber {
        line,
        field,
        value: value.to_string(),
    })
}

/// `nan` や `inf` も不正な数値として扱う
fn parse_finite(line: usize, field: &'static str, value: &str) -> Result<f64, SensorDataError> {
    let number: f64 = parse_field(line, field, value)?;
    if !number.is_finite() {
        return Err(SensorDataError::InvalidNumber {
            line,
            field,
            value: value.to_string(),
        });
    }
    Ok(number)
}

/// 1行を解析する（`line` はエラー表示用の1始まりの行番号）
pub fn parse_sensor_line(line: usize, text: &str) -> Result<SensorRecord, SensorDataError> {
    let fields: Vec<&str> = text.split_whitespace().collect();
    if fields.len() != 5 {
        return Err(SensorDataError::FieldCount { line, found: fields.len() });
    }

    let id = parse_field(line, "id", fields[0])?;
    let x = parse_finite(line, "x", fields[1])?;
    let y = parse_finite(line, "y", fields[2])?;
    let z = parse_finite(line, "z", fields[3])?;
    let energy_consumption = parse_finite(line, "energy_consumption", fields[4])?;

    Ok(SensorRecord {
        id,
        position: Point::new(x, y, z),
        energy_consumption,
    })
}

/// 任意のリーダーからセンサーを読み込む
pub fn read_sensors<R: BufRead>(reader: R, battery_cap: f64) -> Vec<Sensor> {
    let mut sensors = Vec::new();
    let mut seen = HashSet::new();

    for (index, line) in reader.lines().enumerate() {
        let line_num = index + 1;
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("{}行目の読み込みに失敗したため以降を読み飛ばします: {}", line_num, e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        match parse_sensor_line(line_num, &line) {
            Ok(record) => {
                if !seen.insert(record.id) {
                    warn!("{}行目: センサーID {} が重複しているためスキップ", line_num, record.id);
                    continue;
                }
                sensors.push(record.into_sensor(battery_cap));
            }
            Err(e) => warn!("{}、スキップします", e),
        }
    }

    sensors
}

/// センサーデータファイルを読み込む
///
/// ファイルを開けない場合は空のセンサー集合を返します（システムは何もしない状態で動作）。
pub fn load_sensors<P: AsRef<Path>>(path: P, battery_cap: f64) -> Vec<Sensor> {
    let path = path.as_ref();
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!(
                "センサーデータファイル {} が見つかりません。先に --generate で生成してください",
                path.display()
            );
            return Vec::new();
        }
        Err(e) => {
            warn!("センサーデータファイル {} を開けません: {}", path.display(), e);
            return Vec::new();
        }
    };

    let sensors = read_sensors(BufReader::new(file), battery_cap);
    info!("{}個のセンサーを読み込みました ({})", sensors.len(), path.display());
    sensors
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// センサーデータをランダムに生成する
///
/// IDは1から連番、x/yはエリア内の一様分布、zは `[0, 50]` の一様分布、
/// エネルギー消費率は正規分布 N(550, 150) を `[100, 1000]` にクリップ。値は小数2桁に丸める。
pub fn generate_sensors<R: Rng>(
    count: u32,
    length: f64,
    width: f64,
    rng: &mut R,
) -> Result<Vec<SensorRecord>, NormalError> {
    let consumption = Normal::new(CONSUMPTION_MEAN, CONSUMPTION_STD_DEV)?;

    let records = (1..=count)
        .map(|id| {
            let x = round2(rng.gen_range(0.0..=length));
            let y = round2(rng.gen_range(0.0..=width));
            let z = round2(rng.gen_range(0.0..=MAX_SENSOR_ALTITUDE));
            let energy = round2(consumption.sample(&mut *rng).clamp(CONSUMPTION_MIN, CONSUMPTION_MAX));
            SensorRecord {
                id,
                position: Point::new(x, y, z),
                energy_consumption: energy,
            }
        })
        .collect();
    Ok(records)
}

/// 固定幅フォーマットの1行
pub fn format_sensor_line(record: &SensorRecord) -> String {
    format!(
        "{:<2} {:>9.2} {:>9.2} {:>9.2} {:>9.2}",
        record.id, record.position.x, record.position.y, record.position.z, record.energy_consumption
    )
}

/// センサーデータをファイルへ書き出す（親ディレクトリがなければ作成）
pub fn write_sensor_file<P: AsRef<Path>>(path: P, records: &[SensorRecord]) -> io::Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut file = io::BufWriter::new(File::create(path)?);
    for record in records {
        writeln!(file, "{}", format_sensor_line(record))?;
    }
    file.flush()?;

    info!("{}個のセンサーデータを {} に保存しました", records.len(), path.display());
    Ok(())
}
