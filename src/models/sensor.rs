use crate::models::common::{NodeKind, Point};

/// 地上センサーノード
///
/// バッテリーで動作し、UAVからの無線電力伝送で再充電されます。
/// `cur_energy` は常に `0 <= cur_energy <= battery_cap` を満たします。
#[derive(Debug, Clone, PartialEq)]
pub struct Sensor {
    /// センサーの一意識別子
    pub id: u32,
    /// センサーの3次元位置
    pub position: Point,
    /// ノード種別（センサーデータファイル由来のノードは常に `Sensor`）
    pub kind: NodeKind,
    /// バッテリー容量 [J]
    pub battery_cap: f64,
    /// 現在の残量 [J]
    pub cur_energy: f64,
    /// 稼働中かどうか
    pub is_active: bool,
    /// エネルギー消費率（参考値。シミュレーションループでは消費しない）
    pub energy_consumption_rate: f64,
}

impl Sensor {
    /// 満充電・稼働状態の新しいセンサーを作成します
    pub fn new(id: u32, position: Point, battery_cap: f64) -> Self {
        let battery_cap = battery_cap.max(0.0);
        Self {
            id,
            position,
            kind: NodeKind::Sensor,
            battery_cap,
            cur_energy: battery_cap,
            is_active: true,
            energy_consumption_rate: 0.0,
        }
    }

    pub fn with_consumption_rate(mut self, rate: f64) -> Self {
        self.energy_consumption_rate = rate;
        self
    }

    /// 満充電までに必要なエネルギー [J]（負にはならない）
    pub fn energy_deficit(&self) -> f64 {
        (self.battery_cap - self.cur_energy).max(0.0)
    }

    /// 満充電にする
    pub fn recharge(&mut self) {
        self.cur_energy = self.battery_cap;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_sensor_is_full_and_active() {
        let sensor = Sensor::new(7, Point::new(1.0, 2.0, 3.0), 6000.0);
        assert_eq!(sensor.cur_energy, 6000.0);
        assert!(sensor.is_active);
        assert_eq!(sensor.kind, NodeKind::Sensor);
        assert_eq!(sensor.energy_deficit(), 0.0);
    }

    #[test]
    fn test_deficit_never_negative() {
        let mut sensor = Sensor::new(1, Point::default(), 100.0);
        sensor.cur_energy = 0.0;
        assert_eq!(sensor.energy_deficit(), 100.0);

        sensor.cur_energy = 150.0;
        assert_eq!(sensor.energy_deficit(), 0.0);
    }

    #[test]
    fn test_recharge_fills_battery() {
        let mut sensor = Sensor::new(1, Point::default(), 100.0);
        sensor.cur_energy = 10.0;
        sensor.recharge();
        assert_eq!(sensor.cur_energy, 100.0);
        assert!(sensor.is_active);
    }
}
