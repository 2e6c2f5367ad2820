//! # Network モジュール
//!
//! センサー・UAV・担当割り当て・収集データ台帳・システム時計をまとめた
//! シミュレーション全体の状態（`NetworkState`）を提供します。
//!
//! 状態を書き換えるのはミッションのコミット（`mission` モジュール）と
//! サイクルスケジューラ（`simulation` モジュール）のみです。

use std::collections::BTreeMap;
use std::fmt;

use rand::Rng;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::assignment::{Assignment, AssignmentError};
use crate::energy::EnergyError;
use crate::mission::{MissionError, MissionSimulator};
use crate::models::{Point, Sensor, Uav};
use crate::scenario::ScenarioConfig;

/// センサーID → センサー（ID昇順で走査される）
pub type SensorRegistry = BTreeMap<u32, Sensor>;

/// センサーが生成した1件のデータ
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataRecord {
    pub sensor_id: u32,
    /// センサーごとの通し番号
    pub sequence: u64,
    /// 生成時刻 [s]
    pub timestamp: f64,
}

/// 収集データ台帳
///
/// UAVが訪問したセンサーの記録は空にリセットされます（データ量や転送時間はモデル化しない）。
#[derive(Debug, Clone, Default)]
pub struct DataLedger {
    records: BTreeMap<u32, Vec<DataRecord>>,
    last_generation: BTreeMap<u32, f64>,
    next_sequence: BTreeMap<u32, u64>,
}

impl DataLedger {
    /// センサーを登録（生成時刻の基準は `time`）
    pub fn register(&mut self, sensor_id: u32, time: f64) {
        self.records.entry(sensor_id).or_default();
        self.last_generation.insert(sensor_id, time);
    }

    /// 生成間隔に達していればデータを1件記録し、記録した場合は true を返す
    pub fn generate_if_due(&mut self, sensor_id: u32, time: f64, interval: f64) -> bool {
        let last = self.last_generation.get(&sensor_id).copied().unwrap_or(0.0);
        if time - last < interval {
            return false;
        }
        self.push(sensor_id, time);
        self.last_generation.insert(sensor_id, time);
        true
    }

    pub fn push(&mut self, sensor_id: u32, timestamp: f64) {
        let sequence = self.next_sequence.entry(sensor_id).or_insert(0);
        let record = DataRecord { sensor_id, sequence: *sequence, timestamp };
        *sequence += 1;
        self.records.entry(sensor_id).or_default().push(record);
    }

    /// センサーの記録を空にし、破棄した件数を返す
    pub fn clear(&mut self, sensor_id: u32) -> usize {
        self.records
            .get_mut(&sensor_id)
            .map(|records| std::mem::take(records).len())
            .unwrap_or(0)
    }

    pub fn total_count(&self) -> usize {
        self.records.values().map(Vec::len).sum()
    }
}

/// 終了理由（一度設定されたら変更されない）
#[derive(Debug, Clone, PartialEq)]
pub enum TerminationReason {
    /// サイクル開始時点でUAVの電力が尽きていた
    UavExhausted { uav_id: u32 },
    /// 計画したミッションの所要エネルギーがUAVの残量を超えた
    InsufficientEnergy { uav_id: u32 },
    /// 電力不足以外の理由でミッションを実行できなかった
    MissionFailed { uav_id: u32, detail: String },
    /// 最大サイクル数に到達
    CycleLimit { cycles: u64 },
    /// 最大シミュレーション時間に到達
    TimeLimit { time_s: f64 },
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationReason::UavExhausted { uav_id } => {
                write!(f, "UAV{}の電力が枯渇しました", uav_id)
            }
            TerminationReason::InsufficientEnergy { uav_id } => {
                write!(f, "UAV{}の電力不足によりミッションを実行できません", uav_id)
            }
            TerminationReason::MissionFailed { uav_id, detail } => {
                write!(f, "UAV{}のミッションが失敗しました: {}", uav_id, detail)
            }
            TerminationReason::CycleLimit { cycles } => {
                write!(f, "最大サイクル数({})に到達しました", cycles)
            }
            TerminationReason::TimeLimit { time_s } => {
                write!(f, "最大シミュレーション時間({:.1}秒)に到達しました", time_s)
            }
        }
    }
}

/// システム時計と終了状態
#[derive(Debug, Clone, Default)]
pub struct SystemClock {
    pub system_time: f64,
    pub cycle_start_time: f64,
    pub cycle_num: u64,
    terminated: bool,
    termination_reason: Option<TerminationReason>,
}

impl SystemClock {
    /// 終了状態へ遷移する。既に終了していれば何もせず false を返す
    pub fn terminate(&mut self, reason: TerminationReason) -> bool {
        if self.terminated {
            return false;
        }
        info!("システム終了: {}", reason);
        self.terminated = true;
        self.termination_reason = Some(reason);
        true
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    pub fn termination_reason(&self) -> Option<&TerminationReason> {
        self.termination_reason.as_ref()
    }
}

/// 外部に公開するシステム状態のスナップショット
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemStatus {
    pub cycle_num: u64,
    pub system_time: f64,
    pub active_sensors: usize,
    pub total_sensors: usize,
    pub active_uavs: usize,
    pub total_uavs: usize,
    pub terminated: bool,
    pub termination_reason: Option<String>,
    pub collected_data_count: usize,
}

/// ネットワーク全体の状態
#[derive(Debug, Clone)]
pub struct NetworkState {
    pub sensors: SensorRegistry,
    /// ID昇順に並んだUAV
    pub uavs: Vec<Uav>,
    pub base_station: Point,
    pub assignment: Assignment,
    pub ledger: DataLedger,
    pub clock: SystemClock,
}

impl NetworkState {
    /// シナリオ設定とセンサー一覧から状態を構築します
    ///
    /// UAVは基地局に配置され、ID `0..count` が振られます。
    /// 重複したセンサーIDは最初のものだけを採用します。
    pub fn new(scenario: &ScenarioConfig, sensors: Vec<Sensor>) -> Result<Self, EnergyError> {
        let base_station = scenario.area.base_station();

        let mut registry = SensorRegistry::new();
        let mut ledger = DataLedger::default();
        for sensor in sensors {
            if registry.contains_key(&sensor.id) {
                warn!("センサーID {} が重複しているためスキップします", sensor.id);
                continue;
            }
            ledger.register(sensor.id, 0.0);
            registry.insert(sensor.id, sensor);
        }

        let uavs = (0..scenario.uav.count)
            .map(|id| {
                Uav::new(
                    id,
                    base_station,
                    scenario.uav.speed_mps,
                    scenario.uav.max_energy_j,
                    scenario.uav.transfer_power_w,
                    &scenario.airframe,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        if registry.is_empty() {
            warn!("センサーが0個のため、シミュレーションは何も行いません");
        }
        info!("ネットワーク構築完了: センサー{}個, UAV{}機", registry.len(), uavs.len());

        Ok(Self {
            sensors: registry,
            uavs,
            base_station,
            assignment: Assignment::default(),
            ledger,
            clock: SystemClock::default(),
        })
    }

    /// センサーをUAVへランダムに割り当てる（既存の割り当ては丸ごと置き換える）
    pub fn assign_sensors<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<(), AssignmentError> {
        let sensor_ids: Vec<u32> = self.sensors.keys().copied().collect();
        let uav_ids: Vec<u32> = self.uavs.iter().map(|uav| uav.id).collect();
        self.assignment = Assignment::partition(&sensor_ids, &uav_ids, rng)?;

        for (uav_id, group) in self.assignment.groups() {
            debug!("UAV{}の担当センサー: {:?}", uav_id, group);
        }
        if !uav_ids.is_empty() {
            info!(
                "センサー割り当て完了: センサー{}個 / UAV{}機 (平均{:.1}個)",
                sensor_ids.len(),
                uav_ids.len(),
                sensor_ids.len() as f64 / uav_ids.len() as f64
            );
        }
        Ok(())
    }

    pub fn uav(&self, uav_id: u32) -> Option<&Uav> {
        self.uavs.iter().find(|uav| uav.id == uav_id)
    }

    /// UAVに割り当てられたセンサー（割り当て順）
    pub fn assigned_sensors(&self, uav_id: u32) -> Vec<&Sensor> {
        self.assignment
            .sensors_of(uav_id)
            .iter()
            .filter_map(|id| self.sensors.get(id))
            .collect()
    }

    /// 稼働中センサーのデータ生成（生成した件数を返す）
    pub fn generate_data(&mut self, interval: f64) -> usize {
        let now = self.clock.system_time;
        let mut generated = 0;
        for sensor in self.sensors.values().filter(|sensor| sensor.is_active) {
            if self.ledger.generate_if_due(sensor.id, now, interval) {
                generated += 1;
            }
        }
        generated
    }

    /// 指定UAVが指定センサーを満充電するのに必要なホバリング時間 [s]
    pub fn hover_time(
        &self,
        simulator: &MissionSimulator,
        uav_id: u32,
        sensor_id: u32,
    ) -> Result<f64, MissionError> {
        let uav = self.uav(uav_id).ok_or(MissionError::UnknownUav { uav_id })?;
        let sensor = self
            .sensors
            .get(&sensor_id)
            .ok_or(MissionError::UnknownSensor { uav_id, sensor_id })?;
        Ok(simulator.stop_cost(uav, sensor)?.hover_time)
    }

    /// 指定UAVが担当する稼働中センサーすべての合計ホバリング時間 [s]
    pub fn total_hover_time(&self, simulator: &MissionSimulator, uav_id: u32) -> Result<f64, MissionError> {
        let uav = self.uav(uav_id).ok_or(MissionError::UnknownUav { uav_id })?;
        let mut total = 0.0;
        for sensor in self.assigned_sensors(uav_id).into_iter().filter(|s| s.is_active) {
            total += simulator.stop_cost(uav, sensor)?.hover_time;
        }
        Ok(total)
    }

    pub fn status(&self) -> SystemStatus {
        SystemStatus {
            cycle_num: self.clock.cycle_num,
            system_time: self.clock.system_time,
            active_sensors: self.sensors.values().filter(|s| s.is_active).count(),
            total_sensors: self.sensors.len(),
            active_uavs: self.uavs.iter().filter(|u| !u.is_depleted()).count(),
            total_uavs: self.uavs.len(),
            terminated: self.clock.is_terminated(),
            termination_reason: self.clock.termination_reason().map(ToString::to_string),
            collected_data_count: self.ledger.total_count(),
        }
    }
}
