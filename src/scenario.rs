//! # Scenario モジュール
//!
//! YAMLのシナリオファイルを読み込み、シミュレーション全体の設定を提供します。
//! 各セクションは省略可能で、省略した項目は既定値になります（空の文書も有効）。

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::energy::{AirframeParams, ChannelParams};
use crate::models::Point;

/// シナリオメタデータ
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScenarioMeta {
    pub version: String,
    pub name: String,
    pub description: String,
}

impl Default for ScenarioMeta {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            name: "default".to_string(),
            description: "UAVによる無線充電センサーネットワークの標準シナリオ".to_string(),
        }
    }
}

/// シミュレーション設定
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// 時間刻み [s]
    pub tick_s: f64,
    /// データ収集・充電サイクルの長さ [s]
    pub cycle_length_s: f64,
    /// センサーのデータ生成間隔 [s]
    pub data_generation_interval_s: f64,
    /// センサー割り当て・データ生成用の乱数シード
    pub seed: u64,
    /// 最大サイクル数（終了条件）
    pub max_cycles: Option<u64>,
    /// 最大シミュレーション時間 [s]（終了条件）
    pub max_time_s: Option<f64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_s: 1.0,
            cycle_length_s: 60.0,
            data_generation_interval_s: 10.0,
            seed: 42,
            max_cycles: Some(10_000),
            max_time_s: None,
        }
    }
}

/// 対象エリアと基地局
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AreaConfig {
    pub length_m: f64,
    pub width_m: f64,
    pub base_station_altitude_m: f64,
}

impl Default for AreaConfig {
    fn default() -> Self {
        Self {
            length_m: 200.0,
            width_m: 100.0,
            base_station_altitude_m: 10.0,
        }
    }
}

impl AreaConfig {
    /// 基地局はエリア中心の固定高度に置く
    pub fn base_station(&self) -> Point {
        Point::new(self.length_m / 2.0, self.width_m / 2.0, self.base_station_altitude_m)
    }
}

/// UAV編成
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UavConfig {
    pub count: u32,
    pub speed_mps: f64,
    pub max_energy_j: f64,
    /// 充電送信電力 [W]
    pub transfer_power_w: f64,
    /// 無線電力伝送の効率 (0, 1]
    pub transfer_efficiency: f64,
}

impl Default for UavConfig {
    fn default() -> Self {
        Self {
            count: 3,
            speed_mps: 20.0,
            max_energy_j: 1_000_000.0,
            transfer_power_w: 3.0,
            transfer_efficiency: 0.9,
        }
    }
}

/// センサー群
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SensorFleetConfig {
    /// センサーデータ生成時の個数
    pub count: u32,
    pub battery_capacity_j: f64,
    /// ホバリング点の高さ（センサー上方）[m]
    pub hover_offset_m: f64,
    /// 充電時のUAV-センサー間距離 [m]
    pub hover_distance_m: f64,
    /// センサーデータファイル
    pub data_file: PathBuf,
}

impl Default for SensorFleetConfig {
    fn default() -> Self {
        Self {
            count: 50,
            battery_capacity_j: 6000.0,
            hover_offset_m: 1.0,
            hover_distance_m: 1.0,
            data_file: PathBuf::from("data/sensor_data.txt"),
        }
    }
}

/// 完全なシナリオ設定
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub meta: ScenarioMeta,
    pub sim: SimulationConfig,
    pub area: AreaConfig,
    pub uav: UavConfig,
    pub sensor: SensorFleetConfig,
    pub airframe: AirframeParams,
    pub channel: ChannelParams,
}

impl ScenarioConfig {
    /// YAMLファイルからシナリオ設定を読み込み
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.to_path_buf()));
        }

        let contents = fs::read_to_string(path).map_err(|e| ScenarioError::Io(path.to_path_buf(), e))?;

        Self::parse(&contents, path)
    }

    /// YAML文字列を解析して検証する（`source` はエラー表示用）
    fn parse(contents: &str, source: &Path) -> Result<Self, ScenarioError> {
        let config: ScenarioConfig =
            serde_yaml::from_str(contents).map_err(|e| ScenarioError::Parse(source.to_path_buf(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// 設定の基本的な検証
    pub fn validate(&self) -> Result<(), ScenarioError> {
        let positive = |name: &str, value: f64| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(ScenarioError::Validation(format!("{} must be positive (got {})", name, value)))
            }
        };

        positive("sim.tick_s", self.sim.tick_s)?;
        positive("sim.cycle_length_s", self.sim.cycle_length_s)?;
        positive("sim.data_generation_interval_s", self.sim.data_generation_interval_s)?;

        match (self.sim.max_cycles, self.sim.max_time_s) {
            (None, None) => {
                return Err(ScenarioError::Validation(
                    "either sim.max_cycles or sim.max_time_s must be set".to_string(),
                ));
            }
            (Some(0), _) => {
                return Err(ScenarioError::Validation("sim.max_cycles must be at least 1".to_string()));
            }
            (_, Some(max_time)) => positive("sim.max_time_s", max_time)?,
            _ => {}
        }

        positive("area.length_m", self.area.length_m)?;
        positive("area.width_m", self.area.width_m)?;
        if self.area.base_station_altitude_m < 0.0 {
            return Err(ScenarioError::Validation("area.base_station_altitude_m must not be negative".to_string()));
        }

        if self.uav.count == 0 {
            return Err(ScenarioError::Validation("uav.count must be at least 1".to_string()));
        }
        positive("uav.speed_mps", self.uav.speed_mps)?;
        positive("uav.max_energy_j", self.uav.max_energy_j)?;
        positive("uav.transfer_power_w", self.uav.transfer_power_w)?;
        if !(self.uav.transfer_efficiency > 0.0 && self.uav.transfer_efficiency <= 1.0) {
            return Err(ScenarioError::Validation(format!(
                "uav.transfer_efficiency must be in (0, 1] (got {})",
                self.uav.transfer_efficiency
            )));
        }

        positive("sensor.battery_capacity_j", self.sensor.battery_capacity_j)?;
        positive("sensor.hover_distance_m", self.sensor.hover_distance_m)?;
        if self.sensor.hover_offset_m < 0.0 {
            return Err(ScenarioError::Validation("sensor.hover_offset_m must not be negative".to_string()));
        }

        Ok(())
    }

    /// シナリオの概要を表示
    pub fn print_summary(&self) {
        println!("=== シナリオ情報 ===");
        println!("名前: {}", self.meta.name);
        println!("説明: {}", self.meta.description);
        println!("バージョン: {}", self.meta.version);
        println!();

        println!("=== シミュレーション設定 ===");
        println!("時間刻み: {:.3}秒", self.sim.tick_s);
        println!("サイクル長: {:.1}秒", self.sim.cycle_length_s);
        println!("データ生成間隔: {:.1}秒", self.sim.data_generation_interval_s);
        println!("シード値: {}", self.sim.seed);
        match self.sim.max_cycles {
            Some(cycles) => println!("最大サイクル数: {}", cycles),
            None => println!("最大サイクル数: 無制限"),
        }
        match self.sim.max_time_s {
            Some(time) => println!("最大時間: {:.1}秒 ({:.1}分)", time, time / 60.0),
            None => println!("最大時間: 無制限"),
        }
        println!();

        println!("=== エリア ===");
        println!("大きさ: {:.0}m x {:.0}m", self.area.length_m, self.area.width_m);
        println!("基地局: {}", self.area.base_station());
        println!();

        println!("=== UAV編成 ===");
        println!("機数: {}機", self.uav.count);
        println!("速度: {:.1}m/s", self.uav.speed_mps);
        println!("最大電力: {:.0}J", self.uav.max_energy_j);
        println!("充電送信電力: {:.1}W (効率 {:.2})", self.uav.transfer_power_w, self.uav.transfer_efficiency);
        println!();

        println!("=== センサー ===");
        println!("バッテリー容量: {:.0}J", self.sensor.battery_capacity_j);
        println!("生成個数: {}個", self.sensor.count);
        println!("データファイル: {}", self.sensor.data_file.display());
    }
}

/// シナリオ読み込みエラー
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("シナリオファイルが見つかりません: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("ファイル読み込みエラー {}: {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),

    #[error("YAML解析エラー {}: {}", .0.display(), .1)]
    Parse(PathBuf, #[source] serde_yaml::Error),

    #[error("設定検証エラー: {0}")]
    Validation(String),
}
