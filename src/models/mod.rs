// 基本的なデータ型（座標・ノード種別）
pub mod common;

// 各エージェントモデルの実装
pub mod sensor;
pub mod uav;

// 便利な re-export
pub use common::Point;
pub use sensor::Sensor;
pub use uav::Uav;
