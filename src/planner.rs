//! # Planner モジュール
//!
//! UAVが担当センサーを巡回する順序（ホバリング点の列）を決定します。
//!
//! 各ウェイポイントは座標だけでなく対象センサーのIDを保持するため、
//! 下流の処理で浮動小数点座標からセンサーを再特定する必要はありません。

use crate::models::{Point, Sensor};

/// デフォルトのホバリング高度オフセット [m]（センサーの真上1m）
pub const DEFAULT_HOVER_OFFSET: f64 = 1.0;

/// 巡回経路上の1地点
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoint {
    /// ホバリング点
    pub target: Point,
    /// 充電対象のセンサーID
    pub sensor_id: u32,
}

/// 経路計画アルゴリズムのインターフェース
pub trait RoutePlanner {
    /// `start` から出発して `candidates` のうち稼働中のセンサーを巡る経路を返す
    fn plan(&self, start: Point, candidates: &[&Sensor]) -> Vec<Waypoint>;
}

/// 最近傍貪欲法による経路計画
///
/// 現在位置から最も近いホバリング点を逐次選ぶ O(n²) のヒューリスティックで、
/// 巡回長の最適性は保証しません。距離が等しい候補は入力順で先に現れたものを選びます
/// （この順序は実装上の都合で、意味は持ちません）。
#[derive(Debug, Clone, Copy)]
pub struct GreedyPlanner {
    pub hover_offset: f64,
}

impl Default for GreedyPlanner {
    fn default() -> Self {
        Self { hover_offset: DEFAULT_HOVER_OFFSET }
    }
}

impl GreedyPlanner {
    pub fn new(hover_offset: f64) -> Self {
        Self { hover_offset }
    }
}

impl RoutePlanner for GreedyPlanner {
    fn plan(&self, start: Point, candidates: &[&Sensor]) -> Vec<Waypoint> {
        let mut remaining: Vec<Waypoint> = candidates
            .iter()
            .filter(|sensor| sensor.is_active)
            .map(|sensor| Waypoint {
                target: sensor.position.raised(self.hover_offset),
                sensor_id: sensor.id,
            })
            .collect();

        let mut route = Vec::with_capacity(remaining.len());
        let mut current = start;

        while !remaining.is_empty() {
            let mut nearest = 0;
            let mut nearest_distance = f64::INFINITY;
            for (index, waypoint) in remaining.iter().enumerate() {
                let distance = current.distance_3d(&waypoint.target);
                // 厳密な `<` で最初に見つかった候補を残す
                if distance < nearest_distance {
                    nearest = index;
                    nearest_distance = distance;
                }
            }

            let next = remaining.remove(nearest);
            current = next.target;
            route.push(next);
        }

        route
    }
}
