//! # Simulation モジュール
//!
//! UAVによる巡回充電シミュレーションの中核となるサイクルスケジューラを提供します。
//!
//! 固定時間刻みで時刻を進め、サイクル長に達するたびにデータ収集・充電サイクルを
//! 開始します。サイクル内ではUAVをID昇順に1機ずつ処理し、終了条件を満たした時点で
//! `Terminated` に遷移します（以後、状態は変化しません）。
//!
//! ## サイクル内の処理順序
//!
//! 1. **電力枯渇チェック**: 残量0以下のUAVがあれば即時終了
//! 2. **担当なしのスキップ**: 担当センサーがないUAVは何もしない
//! 3. **経路計画とミッション実行**: 電力不足で実行できなければ即時終了し、
//!    残りのUAVは処理しない
//! 4. **サイクル完了**: 全UAVの処理が終わればサイクル番号を進める
//!
//! ## 使用例
//!
//! ```rust,ignore
//! let scenario = ScenarioConfig::from_file("scenarios/default.yaml")?;
//! let sensors = sensor_data::load_sensors(&scenario.sensor.data_file, scenario.sensor.battery_capacity_j);
//!
//! let mut engine = SimulationEngine::new(scenario, sensors, 1)?;
//! engine.initialize()?;
//! let status = engine.run();
//! ```

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;
use tracing::{debug, error, info, trace, warn};

use crate::assignment::AssignmentError;
use crate::energy::EnergyError;
use crate::mission::{MissionError, MissionSimulator};
use crate::models::Sensor;
use crate::network::{NetworkState, SystemStatus, TerminationReason};
use crate::planner::{GreedyPlanner, RoutePlanner};
use crate::scenario::ScenarioConfig;

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("UAVの初期化に失敗しました: {0}")]
    Energy(#[from] EnergyError),

    #[error("センサー割り当てに失敗しました: {0}")]
    Assignment(#[from] AssignmentError),

    #[error("終了条件（最大サイクル数または最大時間）が設定されていません")]
    Unbounded,
}

/// スケジューラの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Running,
    Terminated,
}

/// 1サイクルの処理結果
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// 全UAVが完了またはスキップした
    Completed { missions: usize, skipped: usize },
    /// 途中で終了状態になった
    Aborted(TerminationReason),
}

pub struct SimulationEngine {
    pub tick: f64,
    pub cycle_length: f64,
    pub data_interval: f64,
    pub max_cycles: Option<u64>,
    pub max_time: Option<f64>,
    pub step_count: u64,

    pub state: NetworkState,
    pub simulator: MissionSimulator,
    pub planner: GreedyPlanner,
    rng: ChaCha8Rng,

    pub scenario_config: ScenarioConfig,
    pub verbose_level: u8,
}

impl SimulationEngine {
    pub fn new(scenario: ScenarioConfig, sensors: Vec<Sensor>, verbose_level: u8) -> Result<Self, SimulationError> {
        if scenario.sim.max_cycles.is_none() && scenario.sim.max_time_s.is_none() {
            return Err(SimulationError::Unbounded);
        }

        let state = NetworkState::new(&scenario, sensors)?;

        Ok(Self {
            tick: scenario.sim.tick_s,
            cycle_length: scenario.sim.cycle_length_s,
            data_interval: scenario.sim.data_generation_interval_s,
            max_cycles: scenario.sim.max_cycles,
            max_time: scenario.sim.max_time_s,
            step_count: 0,
            state,
            simulator: MissionSimulator::from_scenario(&scenario),
            planner: GreedyPlanner::new(scenario.sensor.hover_offset_m),
            rng: ChaCha8Rng::seed_from_u64(scenario.sim.seed),
            scenario_config: scenario,
            verbose_level,
        })
    }

    /// センサーをUAVに割り当てる（再実行すると割り当てを置き換える）
    pub fn initialize(&mut self) -> Result<(), SimulationError> {
        if self.verbose_level > 0 {
            info!("シミュレーションエンジンを初期化中...");
        }

        self.state.assign_sensors(&mut self.rng)?;

        if self.verbose_level > 0 {
            info!("初期化完了:");
            info!("  基地局: {}", self.state.base_station);
            info!("  センサー: {}個", self.state.sensors.len());
            info!("  UAV: {}機", self.state.uavs.len());
        }
        if self.verbose_level > 1 {
            for uav in &self.state.uavs {
                debug!(
                    "UAV{} 初期化 (P_mov: {:.2}W, P_hov: {:.2}W, 最大飛行距離: {:.0}m)",
                    uav.id,
                    uav.p_mov,
                    uav.p_hov,
                    uav.max_flight_distance()
                );
            }
        }

        Ok(())
    }

    pub fn scheduler_state(&self) -> SchedulerState {
        if self.state.clock.is_terminated() {
            SchedulerState::Terminated
        } else {
            SchedulerState::Running
        }
    }

    pub fn status(&self) -> SystemStatus {
        self.state.status()
    }

    /// 終了状態になるまでステップを繰り返し、最終状態を返す
    pub fn run(&mut self) -> SystemStatus {
        info!("=== シミュレーション実行開始 ===");

        while self.scheduler_state() == SchedulerState::Running {
            self.step();

            if self.verbose_level > 2 {
                trace!("時刻: {:.1}秒 (ステップ: {})", self.state.clock.system_time, self.step_count);
            }
        }

        let status = self.status();
        info!("=== シミュレーション完了 ===");
        info!("終了理由: {}", status.termination_reason.as_deref().unwrap_or("-"));
        info!("完了サイクル数: {}", status.cycle_num);
        info!("シミュレーション時間: {:.1}秒", status.system_time);
        info!("総ステップ数: {}", self.step_count);

        status
    }

    /// 1ステップ進める
    ///
    /// 最大時間の判定はデータ生成とサイクル判定より先に行います。シミュレーション時間は
    /// `[0, max_time_s)` の半開区間で、ちょうど `max_time_s` に予定されたサイクルは実行されません。
    pub fn step(&mut self) {
        if self.state.clock.is_terminated() {
            return;
        }

        if let Some(max_time) = self.max_time {
            if self.state.clock.system_time >= max_time {
                self.state.clock.terminate(TerminationReason::TimeLimit { time_s: max_time });
                return;
            }
        }

        let generated = self.state.generate_data(self.data_interval);
        if generated > 0 && self.verbose_level > 2 {
            trace!("{}件のセンサーデータを生成", generated);
        }

        let clock = &self.state.clock;
        if clock.system_time - clock.cycle_start_time >= self.cycle_length {
            self.run_cycle();
        }

        self.state.clock.system_time += self.tick;
        self.step_count += 1;
    }

    /// データ収集・充電サイクルを1回実行する
    ///
    /// 既に終了状態であれば何も変更せず、確定済みの終了理由を返します。
    pub fn run_cycle(&mut self) -> CycleOutcome {
        if let Some(reason) = self.state.clock.termination_reason() {
            return CycleOutcome::Aborted(reason.clone());
        }

        let cycle = self.state.clock.cycle_num + 1;
        info!("第{}サイクル開始 (時刻: {:.1}秒)", cycle, self.state.clock.system_time);

        let mut missions = 0;
        let mut skipped = 0;

        for index in 0..self.state.uavs.len() {
            let uav_id = self.state.uavs[index].id;

            if self.state.uavs[index].is_depleted() {
                warn!("UAV{}の電力が枯渇しています", uav_id);
                return self.abort(TerminationReason::UavExhausted { uav_id });
            }

            let route = {
                let assigned = self.state.assigned_sensors(uav_id);
                if assigned.is_empty() {
                    debug!("UAV{}は担当センサーがないためスキップ", uav_id);
                    skipped += 1;
                    continue;
                }
                self.planner.plan(self.state.uavs[index].pos, &assigned)
            };
            if route.is_empty() {
                debug!("UAV{}の担当センサーに稼働中のものがないためスキップ", uav_id);
                skipped += 1;
                continue;
            }

            if self.verbose_level > 1 {
                let order: Vec<u32> = route.iter().map(|w| w.sensor_id).collect();
                debug!("UAV{}の巡回順: {:?}", uav_id, order);
            }

            let result = self.simulator.execute(
                &mut self.state.uavs[index],
                &route,
                &mut self.state.sensors,
                &mut self.state.ledger,
            );
            match result {
                Ok(report) => {
                    missions += 1;
                    info!(
                        "UAV{}: {}個のセンサーを充電 (消費 {:.2}J, 残量 {:.2}J)",
                        uav_id,
                        report.visited.len(),
                        report.cost.total_energy,
                        report.remaining_energy
                    );
                }
                Err(MissionError::Infeasible { .. }) => {
                    return self.abort(TerminationReason::InsufficientEnergy { uav_id });
                }
                Err(other) => {
                    error!("UAV{}のミッションでエラーが発生しました: {}", uav_id, other);
                    return self.abort(TerminationReason::MissionFailed {
                        uav_id,
                        detail: other.to_string(),
                    });
                }
            }
        }

        let clock = &mut self.state.clock;
        clock.cycle_start_time = clock.system_time;
        clock.cycle_num = cycle;
        info!("第{}サイクル完了 (ミッション: {}, スキップ: {})", cycle, missions, skipped);

        if let Some(max_cycles) = self.max_cycles {
            if cycle >= max_cycles {
                self.state.clock.terminate(TerminationReason::CycleLimit { cycles: max_cycles });
            }
        }

        CycleOutcome::Completed { missions, skipped }
    }

    fn abort(&mut self, reason: TerminationReason) -> CycleOutcome {
        self.state.clock.terminate(reason.clone());
        CycleOutcome::Aborted(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Point;

    /// 200m x 100m エリアに格子状に並べた空でないセンサー群
    fn grid_sensors(count: u32) -> Vec<Sensor> {
        (0..count)
            .map(|i| {
                let x = 20.0 + (i % 8) as f64 * 20.0;
                let y = 15.0 + (i / 8) as f64 * 20.0;
                Sensor::new(i + 1, Point::new(x, y, 0.0), 6000.0)
            })
            .collect()
    }

    fn scenario(uavs: u32, max_cycles: Option<u64>) -> ScenarioConfig {
        let mut scenario = ScenarioConfig::default();
        scenario.uav.count = uavs;
        scenario.sim.max_cycles = max_cycles;
        scenario
    }

    fn engine(scenario: ScenarioConfig, sensors: Vec<Sensor>) -> SimulationEngine {
        let mut engine = SimulationEngine::new(scenario, sensors, 0).unwrap();
        engine.initialize().unwrap();
        engine
    }

    #[test]
    fn test_unbounded_engine_is_rejected() {
        let mut scenario = ScenarioConfig::default();
        scenario.sim.max_cycles = None;
        scenario.sim.max_time_s = None;
        assert!(matches!(
            SimulationEngine::new(scenario, Vec::new(), 0),
            Err(SimulationError::Unbounded)
        ));
    }

    #[test]
    fn test_first_cycle_fires_after_cycle_length() {
        let mut engine = engine(scenario(2, Some(100)), grid_sensors(6));

        for _ in 0..60 {
            engine.step();
        }
        assert_eq!(engine.state.clock.cycle_num, 0);

        engine.step();
        assert_eq!(engine.state.clock.cycle_num, 1);
        assert_eq!(engine.state.clock.cycle_start_time, 60.0);
        for uav in &engine.state.uavs {
            assert!(uav.curr_e < uav.max_e);
            assert_eq!(uav.pos, engine.state.base_station);
        }
    }

    #[test]
    fn test_cycle_limit_terminates() {
        let mut engine = engine(scenario(3, Some(4)), grid_sensors(12));
        let status = engine.run();

        assert!(status.terminated);
        assert_eq!(status.cycle_num, 4);
        assert_eq!(
            engine.state.clock.termination_reason(),
            Some(&TerminationReason::CycleLimit { cycles: 4 })
        );
        assert_eq!(engine.scheduler_state(), SchedulerState::Terminated);
    }

    #[test]
    fn test_time_limit_terminates() {
        let mut scenario = scenario(1, None);
        scenario.sim.max_time_s = Some(150.0);
        let mut engine = engine(scenario, grid_sensors(3));
        let status = engine.run();

        assert_eq!(status.cycle_num, 2);
        assert_eq!(status.system_time, 150.0);
        assert!(matches!(
            engine.state.clock.termination_reason(),
            Some(TerminationReason::TimeLimit { .. })
        ));
    }

    #[test]
    fn test_energy_depletion_terminates_before_cycle_limit() {
        let mut scenario = scenario(2, Some(1_000_000));
        scenario.uav.max_energy_j = 20_000.0;
        let mut engine = engine(scenario, grid_sensors(16));
        let status = engine.run();

        assert!(status.terminated);
        assert!(status.cycle_num < 1_000_000);
        assert!(matches!(
            engine.state.clock.termination_reason(),
            Some(TerminationReason::InsufficientEnergy { .. })
        ));
        for uav in &engine.state.uavs {
            assert!(uav.curr_e >= 0.0 && uav.curr_e <= uav.max_e);
        }
    }

    #[test]
    fn test_infeasible_mission_stops_remaining_uavs() {
        let mut engine = engine(scenario(3, Some(10)), grid_sensors(9));
        engine.state.uavs[0].curr_e = 1.0;
        let before: Vec<f64> = engine.state.uavs.iter().map(|u| u.curr_e).collect();

        let outcome = engine.run_cycle();
        assert_eq!(
            outcome,
            CycleOutcome::Aborted(TerminationReason::InsufficientEnergy { uav_id: 0 })
        );
        let after: Vec<f64> = engine.state.uavs.iter().map(|u| u.curr_e).collect();
        assert_eq!(before, after);
        assert_eq!(engine.state.clock.cycle_num, 0);
        assert!(engine.state.clock.is_terminated());
    }

    #[test]
    fn test_exhausted_uav_terminates() {
        let mut engine = engine(scenario(2, Some(10)), grid_sensors(4));
        engine.state.uavs[1].curr_e = 0.0;

        let outcome = engine.run_cycle();
        assert_eq!(outcome, CycleOutcome::Aborted(TerminationReason::UavExhausted { uav_id: 1 }));
        assert!(engine.state.uavs[0].curr_e < engine.state.uavs[0].max_e);
    }

    #[test]
    fn test_uav_without_sensors_is_skipped() {
        let mut engine = engine(scenario(3, Some(10)), grid_sensors(2));
        let outcome = engine.run_cycle();
        assert_eq!(outcome, CycleOutcome::Completed { missions: 2, skipped: 1 });
        assert_eq!(engine.state.clock.cycle_num, 1);
    }

    #[test]
    fn test_empty_network_runs_as_no_op() {
        let mut engine = engine(scenario(3, Some(3)), Vec::new());
        let status = engine.run();
        assert_eq!(status.cycle_num, 3);
        assert_eq!(status.total_sensors, 0);
        assert_eq!(status.active_uavs, 3);
        for uav in &engine.state.uavs {
            assert_eq!(uav.curr_e, uav.max_e);
        }
    }

    #[test]
    fn test_mission_recharges_and_collects() {
        let mut engine = engine(scenario(1, Some(10)), grid_sensors(4));
        for sensor in engine.state.sensors.values_mut() {
            sensor.cur_energy = 1000.0;
        }
        for _ in 0..=60 {
            engine.step();
        }

        assert_eq!(engine.state.clock.cycle_num, 1);
        for sensor in engine.state.sensors.values() {
            assert_eq!(sensor.cur_energy, sensor.battery_cap);
        }
        // t=60 で生成された記録はミッションで回収される
        assert_eq!(engine.status().collected_data_count, 0);
    }

    #[test]
    fn test_terminated_engine_does_not_advance() {
        let mut engine = engine(scenario(1, Some(1)), grid_sensors(2));
        engine.run();
        let time = engine.state.clock.system_time;
        let steps = engine.step_count;

        engine.step();
        assert_eq!(engine.state.clock.system_time, time);
        assert_eq!(engine.step_count, steps);
    }

    #[test]
    fn test_cycle_after_termination_changes_nothing() {
        let mut engine = engine(scenario(1, Some(1)), grid_sensors(4));
        engine.run();
        for sensor in engine.state.sensors.values_mut() {
            sensor.cur_energy = 0.0;
        }
        let uav_before = engine.state.uavs[0].clone();
        let cycles_before = engine.state.clock.cycle_num;

        let outcome = engine.run_cycle();
        assert_eq!(outcome, CycleOutcome::Aborted(TerminationReason::CycleLimit { cycles: 1 }));
        assert_eq!(engine.state.uavs[0], uav_before);
        assert_eq!(engine.state.clock.cycle_num, cycles_before);
        assert!(engine.state.sensors.values().all(|s| s.cur_energy == 0.0));
    }

    #[test]
    fn test_cycle_due_at_time_limit_is_not_run() {
        let mut scenario = scenario(1, None);
        scenario.sim.max_time_s = Some(120.0);
        let mut engine = engine(scenario, grid_sensors(3));
        let status = engine.run();

        // t=60 のサイクルのみ実行され、t=120 は区間外
        assert_eq!(status.cycle_num, 1);
        assert_eq!(status.system_time, 120.0);
        assert_eq!(engine.state.clock.cycle_start_time, 60.0);
        assert_eq!(
            engine.state.clock.termination_reason(),
            Some(&TerminationReason::TimeLimit { time_s: 120.0 })
        );
    }

    #[test]
    fn test_same_seed_same_run() {
        let run = || {
            let mut engine = engine(scenario(3, Some(5)), grid_sensors(20));
            engine.run();
            engine.state.uavs.iter().map(|u| u.curr_e).collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }
}
