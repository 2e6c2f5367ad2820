//! # Mission モジュール
//!
//! 1機のUAVの巡回ミッションについて、所要エネルギーを計算し、
//! 実行可能な場合のみ状態をまとめて更新（コミット）します。
//!
//! 計算は経路全体について先に行い、途中の区間ごとに電力を差し引くことはしません。
//! 残量が足りない場合はUAVの位置・電力ともに一切変更されません。

use thiserror::Error;
use tracing::{debug, warn};

use crate::energy::{self, ChannelParams, EnergyError};
use crate::models::{Point, Sensor, Uav};
use crate::network::{DataLedger, SensorRegistry};
use crate::planner::Waypoint;
use crate::scenario::ScenarioConfig;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MissionError {
    /// 所要エネルギーが残量を超える（状態は変更されていない）
    #[error("UAV{uav_id}の電力不足: 必要 {required:.2}J / 残量 {available:.2}J")]
    Infeasible { uav_id: u32, required: f64, available: f64 },

    #[error("UAV{uav_id}の経路に未知のセンサー {sensor_id} が含まれています")]
    UnknownSensor { uav_id: u32, sensor_id: u32 },

    #[error("UAV{uav_id} は存在しません")]
    UnknownUav { uav_id: u32 },

    #[error(transparent)]
    Energy(#[from] EnergyError),
}

/// 1か所のセンサーでの充電コスト
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StopCost {
    pub sensor_id: u32,
    /// 満充電までに必要なエネルギー [J]
    pub energy_needed: f64,
    /// ホバリング時間 [s]
    pub hover_time: f64,
    /// ホバリング消費エネルギー [J]
    pub hover_energy: f64,
    /// 無線伝送でUAVが放出するエネルギー [J]
    pub transfer_energy: f64,
}

/// ミッション全体の所要エネルギーの内訳
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MissionCost {
    /// 総飛行距離（基地局への帰還を含む） [m]
    pub flight_distance: f64,
    pub flight_energy: f64,
    pub hover_time: f64,
    pub hover_energy: f64,
    pub transfer_energy: f64,
    pub total_energy: f64,
    pub stops: Vec<StopCost>,
}

/// コミット済みミッションの結果
#[derive(Debug, Clone, PartialEq)]
pub struct MissionReport {
    pub uav_id: u32,
    pub cost: MissionCost,
    /// 訪問したセンサー（訪問順）
    pub visited: Vec<u32>,
    /// 回収（リセット）したデータ件数
    pub records_collected: usize,
    /// コミット後の残量 [J]
    pub remaining_energy: f64,
}

/// ミッションのエネルギー計算とコミットを行う
#[derive(Debug, Clone)]
pub struct MissionSimulator {
    /// 帰還先の基地局
    pub base_station: Point,
    /// ホバリング点とセンサーの距離 [m]
    pub hover_distance: f64,
    /// 無線電力伝送の効率
    pub efficiency: f64,
    pub channel: ChannelParams,
}

impl MissionSimulator {
    pub fn new(base_station: Point, hover_distance: f64, efficiency: f64, channel: ChannelParams) -> Self {
        Self { base_station, hover_distance, efficiency, channel }
    }

    pub fn from_scenario(scenario: &ScenarioConfig) -> Self {
        Self::new(
            scenario.area.base_station(),
            scenario.sensor.hover_distance_m,
            scenario.uav.transfer_efficiency,
            scenario.channel.clone(),
        )
    }

    /// センサー1か所を満充電するためのコスト
    pub fn stop_cost(&self, uav: &Uav, sensor: &Sensor) -> Result<StopCost, EnergyError> {
        let energy_needed = sensor.energy_deficit();
        let hover_time = energy::wireless_charge_time(
            energy_needed,
            self.hover_distance,
            uav.p_tra,
            self.efficiency,
            &self.channel,
        )?;
        let hover_energy = if hover_time > 0.0 { energy::hover_energy(hover_time, uav.p_hov) } else { 0.0 };

        Ok(StopCost {
            sensor_id: sensor.id,
            energy_needed,
            hover_time,
            hover_energy,
            transfer_energy: energy::transfer_energy(energy_needed, self.efficiency),
        })
    }

    /// 経路全体の所要エネルギーを計算（状態は変更しない）
    ///
    /// 現在位置 → 各ウェイポイント → 基地局 の飛行エネルギーと、
    /// 各センサーでのホバリング・伝送エネルギーの合計。
    pub fn estimate(
        &self,
        uav: &Uav,
        route: &[Waypoint],
        sensors: &SensorRegistry,
    ) -> Result<MissionCost, MissionError> {
        let mut cost = MissionCost::default();
        let mut current = uav.pos;

        for waypoint in route {
            let sensor = sensors.get(&waypoint.sensor_id).ok_or(MissionError::UnknownSensor {
                uav_id: uav.id,
                sensor_id: waypoint.sensor_id,
            })?;

            let leg = current.distance_3d(&waypoint.target);
            cost.flight_distance += leg;
            cost.flight_energy += energy::flight_energy(leg, uav.vel, uav.p_mov)?;

            let stop = self.stop_cost(uav, sensor)?;
            cost.hover_time += stop.hover_time;
            cost.hover_energy += stop.hover_energy;
            cost.transfer_energy += stop.transfer_energy;
            cost.stops.push(stop);

            current = waypoint.target;
        }

        let return_leg = current.distance_3d(&self.base_station);
        cost.flight_distance += return_leg;
        cost.flight_energy += energy::flight_energy(return_leg, uav.vel, uav.p_mov)?;

        cost.total_energy = cost.flight_energy + cost.hover_energy + cost.transfer_energy;
        Ok(cost)
    }

    /// ミッションを実行する
    ///
    /// 所要エネルギーが残量以下の場合のみ、残量の減算・基地局への帰還・
    /// 訪問センサーの満充電とデータ回収をまとめて反映します。
    /// それ以外の場合は `MissionError::Infeasible` を返し、何も変更しません。
    pub fn execute(
        &self,
        uav: &mut Uav,
        route: &[Waypoint],
        sensors: &mut SensorRegistry,
        ledger: &mut DataLedger,
    ) -> Result<MissionReport, MissionError> {
        let cost = self.estimate(uav, route, sensors)?;

        if cost.total_energy.is_nan() || cost.total_energy > uav.curr_e {
            warn!(
                "UAV{}: 所要エネルギー {:.2}J が残量 {:.2}J を超えるためミッションを中止",
                uav.id, cost.total_energy, uav.curr_e
            );
            return Err(MissionError::Infeasible {
                uav_id: uav.id,
                required: cost.total_energy,
                available: uav.curr_e,
            });
        }

        uav.curr_e -= cost.total_energy;
        uav.pos = self.base_station;

        let mut visited = Vec::with_capacity(route.len());
        let mut records_collected = 0;
        for waypoint in route {
            if let Some(sensor) = sensors.get_mut(&waypoint.sensor_id) {
                sensor.recharge();
            }
            records_collected += ledger.clear(waypoint.sensor_id);
            visited.push(waypoint.sensor_id);
        }

        debug!(
            "UAV{}: ミッション完了 (飛行 {:.1}m, ホバリング {:.2}秒, 消費 {:.2}J, 残量 {:.2}J)",
            uav.id, cost.flight_distance, cost.hover_time, cost.total_energy, uav.curr_e
        );

        Ok(MissionReport {
            uav_id: uav.id,
            cost,
            visited,
            records_collected,
            remaining_energy: uav.curr_e,
        })
    }
}
