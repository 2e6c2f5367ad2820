use std::fmt;
use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

/// 3次元座標を表す構造体
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64, // m
    pub y: f64, // m
    pub z: f64, // m (高度)
}

impl Point {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// 3次元ユークリッド距離を計算
    pub fn distance_3d(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2) + (self.z - other.z).powi(2)).sqrt()
    }

    /// 鉛直方向にオフセットした座標を返す（ホバリング点の算出用）
    pub fn raised(&self, dz: f64) -> Self {
        Self::new(self.x, self.y, self.z + dz)
    }
}

impl Add for Point {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl Sub for Point {
    type Output = Self;

    fn sub(self, other: Self) -> Self::Output {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

/// ネットワークノードの種類
///
/// 基地局・センサー・中継ノードの3種類のみなので、継承ではなく
/// タグ付きの列挙型としてノードに持たせる。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NodeKind {
    /// 基地局（BS）
    BaseStation,
    /// センサーノード（SN）
    #[default]
    Sensor,
    /// 中継ノード（RN）
    Relay,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            NodeKind::BaseStation => "BS",
            NodeKind::Sensor => "SN",
            NodeKind::Relay => "RN",
        };
        f.write_str(label)
    }
}
