//! # Assignment モジュール
//!
//! センサーをUAVへランダムかつほぼ均等に分割して割り当てます。
//!
//! 割り当ては互いに素な分割であり、同じセンサーを2機のUAVが担当することはありません。
//! シナリオのシードから作った乱数生成器を渡すことで、結果は再現可能です。

use std::collections::BTreeMap;

use rand::Rng;
use rand::seq::SliceRandom;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssignmentError {
    #[error("UAVが0機のため {sensor_count} 個のセンサーを割り当てられません")]
    NoUavs { sensor_count: usize },
}

/// UAV ⇔ センサーの担当関係
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Assignment {
    /// UAV ID → 担当センサーIDの列（シャッフル後の順序を保持）
    uav_sensors: BTreeMap<u32, Vec<u32>>,
    /// センサーID → 担当UAV ID
    sensor_uav: BTreeMap<u32, u32>,
}

impl Assignment {
    /// センサーIDをシャッフルし、`uav_ids` の順に連続したグループへ分割します
    ///
    /// 各グループの大きさは `floor(n/k)` で、先頭の `n mod k` グループが1つ多く受け持ちます。
    /// センサーが空の場合、UAVの有無にかかわらず空の割り当てを返します。
    pub fn partition<R: Rng + ?Sized>(
        sensor_ids: &[u32],
        uav_ids: &[u32],
        rng: &mut R,
    ) -> Result<Self, AssignmentError> {
        let mut assignment = Self::default();
        for &uav_id in uav_ids {
            assignment.uav_sensors.insert(uav_id, Vec::new());
        }
        if sensor_ids.is_empty() {
            return Ok(assignment);
        }
        if uav_ids.is_empty() {
            return Err(AssignmentError::NoUavs { sensor_count: sensor_ids.len() });
        }

        let mut shuffled = sensor_ids.to_vec();
        shuffled.shuffle(rng);

        let base_size = shuffled.len() / uav_ids.len();
        let extra = shuffled.len() % uav_ids.len();

        let mut start = 0;
        for (index, &uav_id) in uav_ids.iter().enumerate() {
            let size = base_size + usize::from(index < extra);
            let group = shuffled[start..start + size].to_vec();
            for &sensor_id in &group {
                assignment.sensor_uav.insert(sensor_id, uav_id);
            }
            assignment.uav_sensors.insert(uav_id, group);
            start += size;
        }

        Ok(assignment)
    }

    /// UAVの担当センサーID（未登録のUAVは空）
    pub fn sensors_of(&self, uav_id: u32) -> &[u32] {
        self.uav_sensors.get(&uav_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// センサーを担当するUAV
    pub fn owner_of(&self, sensor_id: u32) -> Option<u32> {
        self.sensor_uav.get(&sensor_id).copied()
    }

    pub fn groups(&self) -> impl Iterator<Item = (u32, &[u32])> {
        self.uav_sensors.iter().map(|(id, sensors)| (*id, sensors.as_slice()))
    }
}
