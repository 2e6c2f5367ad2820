use crate::energy::{self, AirframeParams, EnergyError};
use crate::models::common::Point;

/// 充電用UAVエージェント
///
/// 推進電力 `p_mov` / `p_hov` は生成時に速度から一度だけ計算します。
/// 生成後に変化するのは `curr_e` と `pos` のみで、ミッションのコミット時にだけ更新されます。
#[derive(Debug, Clone, PartialEq)]
pub struct Uav {
    pub id: u32,
    /// 現在位置
    pub pos: Point,
    /// 飛行速度 [m/s]
    pub vel: f64,
    /// 最大蓄積エネルギー [J]
    pub max_e: f64,
    /// 現在の残存エネルギー [J]
    pub curr_e: f64,
    /// 巡航電力 [W]
    pub p_mov: f64,
    /// ホバリング電力 [W]
    pub p_hov: f64,
    /// 充電送信電力 [W]
    pub p_tra: f64,
}

impl Uav {
    /// 満充電の新しいUAVを作成します
    ///
    /// 速度が正でない場合は `EnergyError::Domain` を返します。
    pub fn new(
        id: u32,
        pos: Point,
        vel: f64,
        max_e: f64,
        p_tra: f64,
        airframe: &AirframeParams,
    ) -> Result<Self, EnergyError> {
        let powers = energy::propulsion_powers(vel, airframe)?;
        let max_e = max_e.max(0.0);
        Ok(Self {
            id,
            pos,
            vel,
            max_e,
            curr_e: max_e,
            p_mov: powers.p_mov,
            p_hov: powers.p_hov,
            p_tra,
        })
    }

    pub fn is_depleted(&self) -> bool {
        self.curr_e <= 0.0
    }

    /// 全エネルギーを飛行に使った場合の最大飛行距離 [m]
    pub fn max_flight_distance(&self) -> f64 {
        self.max_e / self.p_mov * self.vel
    }

    /// センサー1台を満充電（`node_energy`）して往復できる最大半径 [m]
    ///
    /// 充電に使うエネルギーを差し引いた残りで往復飛行する前提。0未満にはならない。
    pub fn max_service_radius(&self, node_energy: f64) -> f64 {
        let flight_budget = (self.max_e - node_energy).max(0.0);
        flight_budget / self.p_mov * self.vel / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uav() -> Uav {
        Uav::new(0, Point::default(), 20.0, 60_000.0, 3.0, &AirframeParams::default()).unwrap()
    }

    #[test]
    fn test_new_uav_is_full() {
        let uav = uav();
        assert_eq!(uav.curr_e, uav.max_e);
        assert!(uav.p_mov > 0.0 && uav.p_hov > 0.0);
        assert!(!uav.is_depleted());
    }

    #[test]
    fn test_new_uav_rejects_zero_velocity() {
        let result = Uav::new(0, Point::default(), 0.0, 1000.0, 3.0, &AirframeParams::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_range_estimates() {
        let uav = uav();
        let full = uav.max_flight_distance();
        assert!((full - 60_000.0 / uav.p_mov * 20.0).abs() < 1e-6);

        let radius = uav.max_service_radius(6000.0);
        assert!(radius < full / 2.0);
        assert_eq!(uav.max_service_radius(1e9), 0.0);
    }
}
