//! # Energy モジュール
//!
//! UAVの推進電力モデルと無線電力伝送（WPT）モデルを提供します。
//!
//! すべての関数は状態を持たない純粋関数で、物理定数は `AirframeParams` と
//! `ChannelParams` として明示的に受け取ります。グローバル定数は使用しません。
//!
//! ## 主要機能
//!
//! - **推進電力**: 回転翼機の巡航電力 `P_mov` とホバリング電力 `P_hov`
//! - **経路損失**: 距離に対して単調減少するチャネル利得（線形値）
//! - **達成可能レート**: シャノン形式 `log2(1 + P·g/σ²)`
//! - **充電時間**: 必要エネルギーを伝送するのに必要なホバリング時間
//!
//! 不正な距離・速度（0以下や非有限値）は `EnergyError::Domain` として明示的に
//! 通知し、NaN や無限大を黙って伝播させません。

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// エネルギー計算のエラー
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EnergyError {
    /// 定義域外の入力（0以下の距離・速度など）
    #[error("定義域エラー: {quantity} = {value} (正の有限値が必要)")]
    Domain { quantity: &'static str, value: f64 },
}

fn require_positive(quantity: &'static str, value: f64) -> Result<f64, EnergyError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(EnergyError::Domain { quantity, value })
    }
}

/// 回転翼機の機体パラメータ
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AirframeParams {
    /// 機体重量 W [N]
    pub weight_n: f64,
    /// 空気密度 ρ [kg/m³]
    pub air_density: f64,
    /// ローター半径 R [m]
    pub rotor_radius_m: f64,
    /// ローター円盤面積 A [m²]
    pub rotor_disc_area_m2: f64,
    /// ブレード角速度 Ω [rad/s]
    pub blade_angular_velocity: f64,
    /// ブレード先端速度 U_tip [m/s]
    pub tip_speed_mps: f64,
    /// ローターソリディティ s
    pub rotor_solidity: f64,
    /// 胴体抵抗比 d0
    pub fuselage_drag_ratio: f64,
    /// 誘導電力補正係数 k
    pub induced_power_correction: f64,
    /// ホバリング時の平均誘導速度 v0 [m/s]
    pub hover_induced_velocity: f64,
    /// プロファイル抵抗係数 δ
    pub profile_drag_coefficient: f64,
}

impl Default for AirframeParams {
    fn default() -> Self {
        Self {
            weight_n: 20.0,
            air_density: 1.225,
            rotor_radius_m: 0.4,
            rotor_disc_area_m2: 0.503,
            blade_angular_velocity: 300.0,
            tip_speed_mps: 120.0,
            rotor_solidity: 0.05,
            fuselage_drag_ratio: 0.6,
            induced_power_correction: 0.1,
            hover_induced_velocity: 4.03,
            profile_drag_coefficient: 0.012,
        }
    }
}

/// 無線チャネルのパラメータ
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ChannelParams {
    /// 基準距離(1m)でのチャネル利得 β0 [dB]
    pub reference_gain_db: f64,
    /// 経路損失指数 α
    pub path_loss_exponent: f64,
    /// 雑音電力 σ² [dBm]
    pub noise_power_dbm: f64,
    /// レート計算に用いる送信電力 Pk [W]
    pub link_tx_power_w: f64,
    /// 帯域幅 B [Hz]
    pub bandwidth_hz: f64,
}

impl Default for ChannelParams {
    fn default() -> Self {
        Self {
            reference_gain_db: -60.0,
            path_loss_exponent: 2.0,
            noise_power_dbm: -110.0,
            link_tx_power_w: 0.3,
            bandwidth_hz: 1.0e6,
        }
    }
}

/// 推進電力の組（巡航・ホバリング）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PropulsionPower {
    /// 巡航電力 [W]
    pub p_mov: f64,
    /// ホバリング電力 [W]
    pub p_hov: f64,
}

/// 速度 `vel` での巡航電力とホバリング電力を計算
///
/// ブレードプロファイル電力、誘導電力、寄生抗力電力の和で表す回転翼機モデル:
///
/// ```text
/// P0    = δ/8 · ρ · s · A · Ω³ · R³
/// Pi    = (1 + k) · W^{3/2} / √(2ρA)
/// P_hov = P0 + Pi
/// P_mov = P0(1 + 3v²/U_tip²) + Pi·√(√(1 + v⁴/(4v0⁴)) − v²/(2v0²)) + ½·d0·ρ·s·A·v³
/// ```
pub fn propulsion_powers(vel: f64, airframe: &AirframeParams) -> Result<PropulsionPower, EnergyError> {
    let v = require_positive("velocity", vel)?;
    let a = airframe;

    let blade_profile = (a.profile_drag_coefficient / 8.0)
        * a.air_density
        * a.rotor_solidity
        * a.rotor_disc_area_m2
        * a.blade_angular_velocity.powi(3)
        * a.rotor_radius_m.powi(3);
    let induced = (1.0 + a.induced_power_correction) * a.weight_n.powf(1.5)
        / (2.0 * a.air_density * a.rotor_disc_area_m2).sqrt();

    let v0 = a.hover_induced_velocity;
    let profile_term = blade_profile * (1.0 + 3.0 * v.powi(2) / a.tip_speed_mps.powi(2));
    let induced_term = induced
        * ((1.0 + v.powi(4) / (4.0 * v0.powi(4))).sqrt() - v.powi(2) / (2.0 * v0.powi(2))).sqrt();
    let parasite_term =
        0.5 * a.fuselage_drag_ratio * a.air_density * a.rotor_solidity * a.rotor_disc_area_m2 * v.powi(3);

    Ok(PropulsionPower {
        p_mov: profile_term + induced_term + parasite_term,
        p_hov: blade_profile + induced,
    })
}

pub fn db_to_linear(db: f64) -> f64 {
    10f64.powf(db / 10.0)
}

pub fn dbm_to_watts(dbm: f64) -> f64 {
    db_to_linear(dbm) * 1e-3
}

/// 距離 `distance` [m] での経路損失を線形のチャネル利得として返す
///
/// `β0[dB] − 10·α·log10(d)` を線形値に変換したもの。距離に対して単調減少します。
pub fn path_loss(distance: f64, channel: &ChannelParams) -> Result<f64, EnergyError> {
    let d = require_positive("distance", distance)?;
    Ok(db_to_linear(channel.reference_gain_db - 10.0 * channel.path_loss_exponent * d.log10()))
}

/// 線形チャネル利得から達成可能レート [bit/s/Hz] を計算
///
/// 括弧内が1以下（または非有限）の場合は負値ではなく0を返します。
/// 呼び出し側は0を「伝送不可能」として扱うこと。
pub fn achievable_rate(gain_linear: f64, channel: &ChannelParams) -> f64 {
    let noise_w = dbm_to_watts(channel.noise_power_dbm);
    let bracket = 1.0 + channel.link_tx_power_w * gain_linear / noise_w;
    if !bracket.is_finite() || bracket <= 1.0 {
        return 0.0;
    }
    bracket.log2()
}

/// 距離 `distance` [m] でのリンク容量 [bit/s]（帯域幅 × 達成可能レート）
pub fn link_capacity(distance: f64, channel: &ChannelParams) -> Result<f64, EnergyError> {
    Ok(channel.bandwidth_hz * achievable_rate(path_loss(distance, channel)?, channel))
}

/// 必要エネルギーを無線伝送するのに要する時間 [s]
///
/// `energy_needed / (tx_power · efficiency · rate)`。
///
/// - `energy_needed <= 0` の場合は 0
/// - 分母が0以下の場合は `f64::INFINITY`（充電不可能を示す番兵値）
/// - 距離が不正な場合のみ `EnergyError::Domain`
pub fn wireless_charge_time(
    energy_needed: f64,
    distance: f64,
    tx_power: f64,
    efficiency: f64,
    channel: &ChannelParams,
) -> Result<f64, EnergyError> {
    if energy_needed <= 0.0 {
        return Ok(0.0);
    }
    let rate = achievable_rate(path_loss(distance, channel)?, channel);
    let denominator = tx_power * efficiency * rate;
    if denominator.is_nan() || denominator <= 0.0 {
        return Ok(f64::INFINITY);
    }
    Ok(energy_needed / denominator)
}

/// 距離 `distance` を速度 `vel` で飛行したときの消費エネルギー [J]
pub fn flight_energy(distance: f64, vel: f64, p_mov: f64) -> Result<f64, EnergyError> {
    let v = require_positive("velocity", vel)?;
    Ok(distance / v * p_mov)
}

/// ホバリング消費エネルギー [J]
pub fn hover_energy(time: f64, p_hov: f64) -> f64 {
    time * p_hov
}

/// 効率 `efficiency` のリンクで `energy_needed` を届けるためにUAVが放出するエネルギー [J]
pub fn transfer_energy(energy_needed: f64, efficiency: f64) -> f64 {
    if energy_needed <= 0.0 {
        return 0.0;
    }
    if efficiency.is_nan() || efficiency <= 0.0 {
        return f64::INFINITY;
    }
    energy_needed / efficiency
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-6;

    #[test]
    fn test_hover_power_matches_closed_form() {
        let airframe = AirframeParams::default();
        let powers = propulsion_powers(20.0, &airframe).unwrap();

        let p0 = 0.012 / 8.0 * 1.225 * 0.05 * 0.503 * 300f64.powi(3) * 0.4f64.powi(3);
        let pi = 1.1 * 20f64.powf(1.5) / (2.0 * 1.225 * 0.503f64).sqrt();
        assert!((powers.p_hov - (p0 + pi)).abs() < EPS);
        assert!(powers.p_mov > 0.0);
    }

    #[test]
    fn test_propulsion_rejects_non_positive_velocity() {
        let airframe = AirframeParams::default();
        assert!(matches!(
            propulsion_powers(0.0, &airframe),
            Err(EnergyError::Domain { quantity: "velocity", .. })
        ));
        assert!(propulsion_powers(-3.0, &airframe).is_err());
        assert!(propulsion_powers(f64::NAN, &airframe).is_err());
    }

    #[test]
    fn test_path_loss_reference_and_monotonic() {
        let channel = ChannelParams::default();
        let at_one = path_loss(1.0, &channel).unwrap();
        assert!((at_one - 1e-6).abs() < 1e-15);

        let mut previous = f64::INFINITY;
        for d in [0.5, 1.0, 2.0, 10.0, 100.0] {
            let gain = path_loss(d, &channel).unwrap();
            assert!(gain < previous);
            previous = gain;
        }
    }

    #[test]
    fn test_path_loss_rejects_non_positive_distance() {
        let channel = ChannelParams::default();
        assert!(path_loss(0.0, &channel).is_err());
        assert!(path_loss(-1.0, &channel).is_err());
        assert!(path_loss(f64::INFINITY, &channel).is_err());
    }

    #[test]
    fn test_achievable_rate_never_negative() {
        let channel = ChannelParams::default();
        assert_eq!(achievable_rate(0.0, &channel), 0.0);
        assert_eq!(achievable_rate(-1.0, &channel), 0.0);

        // 0.3 W · 1e-6 / 1e-14 W = 3e7
        let rate = achievable_rate(1e-6, &channel);
        assert!((rate - (1.0 + 3e7f64).log2()).abs() < EPS);
    }

    #[test]
    fn test_charge_time_edge_cases() {
        let channel = ChannelParams::default();
        assert_eq!(wireless_charge_time(0.0, 1.0, 3.0, 0.9, &channel).unwrap(), 0.0);
        assert_eq!(wireless_charge_time(-5.0, 1.0, 3.0, 0.9, &channel).unwrap(), 0.0);
        assert_eq!(wireless_charge_time(100.0, 1.0, 0.0, 0.9, &channel).unwrap(), f64::INFINITY);
        assert_eq!(wireless_charge_time(100.0, 1.0, 3.0, 0.0, &channel).unwrap(), f64::INFINITY);
        assert!(wireless_charge_time(100.0, 0.0, 3.0, 0.9, &channel).is_err());
    }

    #[test]
    fn test_charge_time_monotonic() {
        let channel = ChannelParams::default();

        let mut previous = 0.0;
        for energy in [10.0, 100.0, 1000.0, 6000.0] {
            let t = wireless_charge_time(energy, 1.0, 3.0, 0.9, &channel).unwrap();
            assert!(t >= previous);
            previous = t;
        }

        let mut previous = f64::INFINITY;
        for tx_power in [0.5, 1.0, 3.0, 10.0] {
            let t = wireless_charge_time(6000.0, 1.0, tx_power, 0.9, &channel).unwrap();
            assert!(t <= previous);
            previous = t;
        }
    }

    #[test]
    fn test_flight_and_hover_energy() {
        assert!((flight_energy(200.0, 20.0, 150.0).unwrap() - 1500.0).abs() < EPS);
        assert!(flight_energy(200.0, 0.0, 150.0).is_err());
        assert!((hover_energy(12.0, 100.0) - 1200.0).abs() < EPS);
    }

    #[test]
    fn test_transfer_energy() {
        assert_eq!(transfer_energy(0.0, 0.9), 0.0);
        assert!((transfer_energy(900.0, 0.9) - 1000.0).abs() < EPS);
        assert_eq!(transfer_energy(900.0, 0.0), f64::INFINITY);
    }

    #[test]
    fn test_db_conversions() {
        assert!((db_to_linear(-60.0) - 1e-6).abs() < 1e-15);
        assert!((dbm_to_watts(-110.0) - 1e-14).abs() < 1e-24);
    }

    #[test]
    fn test_link_capacity_scales_with_bandwidth() {
        let channel = ChannelParams::default();
        let expected = 1.0e6 * (1.0 + 0.3 * 1e-6 / 1e-14_f64).log2();
        assert!((link_capacity(1.0, &channel).unwrap() - expected).abs() < 1e-3);

        let narrow = ChannelParams { bandwidth_hz: 5.0e5, ..ChannelParams::default() };
        assert!((link_capacity(1.0, &narrow).unwrap() * 2.0 - expected).abs() < 1e-3);
        assert!(link_capacity(10.0, &channel).unwrap() < expected);
        assert!(link_capacity(0.0, &channel).is_err());
    }
}
