//! # Easing 模块
//!
//! 缓动方程库，用于动作进度与逐字进度分布的插值。
//!
//! 所有曲线均为 Penner 系列的归一化形式（起点 0、终点 1、时长 1），
//! 设计师按具体曲线调校时序，因此数值需与常见实现保持一致。

use std::f32::consts::PI;

use serde::{Deserialize, Serialize};

/// 缓动方程
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EasingEquation {
    /// 线性（匀速）
    #[default]
    Linear,
    QuadEaseIn,
    QuadEaseOut,
    QuadEaseInOut,
    QuadEaseOutIn,
    CubicEaseIn,
    CubicEaseOut,
    CubicEaseInOut,
    CubicEaseOutIn,
    QuartEaseIn,
    QuartEaseOut,
    QuartEaseInOut,
    QuartEaseOutIn,
    QuintEaseIn,
    QuintEaseOut,
    QuintEaseInOut,
    QuintEaseOutIn,
    SineEaseIn,
    SineEaseOut,
    SineEaseInOut,
    SineEaseOutIn,
    ExpoEaseIn,
    ExpoEaseOut,
    ExpoEaseInOut,
    ExpoEaseOutIn,
    CircEaseIn,
    CircEaseOut,
    CircEaseInOut,
    CircEaseOutIn,
    /// 回退（起止处会越过边界）
    BackEaseIn,
    BackEaseOut,
    BackEaseInOut,
    BackEaseOutIn,
    /// 弹性
    ElasticEaseIn,
    ElasticEaseOut,
    ElasticEaseInOut,
    ElasticEaseOutIn,
    /// 弹跳
    BounceEaseIn,
    BounceEaseOut,
    BounceEaseInOut,
    BounceEaseOutIn,
}

/// 曲线族
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Curve {
    Quad,
    Cubic,
    Quart,
    Quint,
    Sine,
    Expo,
    Circ,
    Back,
    Elastic,
    Bounce,
}

/// 曲线方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    In,
    Out,
    InOut,
    OutIn,
}

const BACK_OVERSHOOT: f32 = 1.70158;
const ELASTIC_PERIOD: f32 = 0.3;

impl EasingEquation {
    /// 全部缓动方程（编辑器下拉与测试用）
    pub const ALL: [EasingEquation; 41] = [
        Self::Linear,
        Self::QuadEaseIn,
        Self::QuadEaseOut,
        Self::QuadEaseInOut,
        Self::QuadEaseOutIn,
        Self::CubicEaseIn,
        Self::CubicEaseOut,
        Self::CubicEaseInOut,
        Self::CubicEaseOutIn,
        Self::QuartEaseIn,
        Self::QuartEaseOut,
        Self::QuartEaseInOut,
        Self::QuartEaseOutIn,
        Self::QuintEaseIn,
        Self::QuintEaseOut,
        Self::QuintEaseInOut,
        Self::QuintEaseOutIn,
        Self::SineEaseIn,
        Self::SineEaseOut,
        Self::SineEaseInOut,
        Self::SineEaseOutIn,
        Self::ExpoEaseIn,
        Self::ExpoEaseOut,
        Self::ExpoEaseInOut,
        Self::ExpoEaseOutIn,
        Self::CircEaseIn,
        Self::CircEaseOut,
        Self::CircEaseInOut,
        Self::CircEaseOutIn,
        Self::BackEaseIn,
        Self::BackEaseOut,
        Self::BackEaseInOut,
        Self::BackEaseOutIn,
        Self::ElasticEaseIn,
        Self::ElasticEaseOut,
        Self::ElasticEaseInOut,
        Self::ElasticEaseOutIn,
        Self::BounceEaseIn,
        Self::BounceEaseOut,
        Self::BounceEaseInOut,
        Self::BounceEaseOutIn,
    ];

    fn parts(self) -> Option<(Curve, Mode)> {
        use EasingEquation::*;
        let parts = match self {
            Linear => return None,
            QuadEaseIn => (Curve::Quad, Mode::In),
            QuadEaseOut => (Curve::Quad, Mode::Out),
            QuadEaseInOut => (Curve::Quad, Mode::InOut),
            QuadEaseOutIn => (Curve::Quad, Mode::OutIn),
            CubicEaseIn => (Curve::Cubic, Mode::In),
            CubicEaseOut => (Curve::Cubic, Mode::Out),
            CubicEaseInOut => (Curve::Cubic, Mode::InOut),
            CubicEaseOutIn => (Curve::Cubic, Mode::OutIn),
            QuartEaseIn => (Curve::Quart, Mode::In),
            QuartEaseOut => (Curve::Quart, Mode::Out),
            QuartEaseInOut => (Curve::Quart, Mode::InOut),
            QuartEaseOutIn => (Curve::Quart, Mode::OutIn),
            QuintEaseIn => (Curve::Quint, Mode::In),
            QuintEaseOut => (Curve::Quint, Mode::Out),
            QuintEaseInOut => (Curve::Quint, Mode::InOut),
            QuintEaseOutIn => (Curve::Quint, Mode::OutIn),
            SineEaseIn => (Curve::Sine, Mode::In),
            SineEaseOut => (Curve::Sine, Mode::Out),
            SineEaseInOut => (Curve::Sine, Mode::InOut),
            SineEaseOutIn => (Curve::Sine, Mode::OutIn),
            ExpoEaseIn => (Curve::Expo, Mode::In),
            ExpoEaseOut => (Curve::Expo, Mode::Out),
            ExpoEaseInOut => (Curve::Expo, Mode::InOut),
            ExpoEaseOutIn => (Curve::Expo, Mode::OutIn),
            CircEaseIn => (Curve::Circ, Mode::In),
            CircEaseOut => (Curve::Circ, Mode::Out),
            CircEaseInOut => (Curve::Circ, Mode::InOut),
            CircEaseOutIn => (Curve::Circ, Mode::OutIn),
            BackEaseIn => (Curve::Back, Mode::In),
            BackEaseOut => (Curve::Back, Mode::Out),
            BackEaseInOut => (Curve::Back, Mode::InOut),
            BackEaseOutIn => (Curve::Back, Mode::OutIn),
            ElasticEaseIn => (Curve::Elastic, Mode::In),
            ElasticEaseOut => (Curve::Elastic, Mode::Out),
            ElasticEaseInOut => (Curve::Elastic, Mode::InOut),
            ElasticEaseOutIn => (Curve::Elastic, Mode::OutIn),
            BounceEaseIn => (Curve::Bounce, Mode::In),
            BounceEaseOut => (Curve::Bounce, Mode::Out),
            BounceEaseInOut => (Curve::Bounce, Mode::InOut),
            BounceEaseOutIn => (Curve::Bounce, Mode::OutIn),
        };
        Some(parts)
    }

    /// 计算缓动值
    ///
    /// # 参数
    /// - `t`: 线性进度，超出 [0, 1] 的部分会被截断
    ///
    /// # 返回
    /// - 缓动后的进度；Back / Elastic 曲线在中途可能超出 [0, 1]
    pub fn ease(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        let Some((curve, mode)) = self.parts() else {
            return t;
        };

        match (curve, mode) {
            (Curve::Back, Mode::InOut) => back_in_out(t),
            (Curve::Elastic, Mode::InOut) => elastic_in_out(t),
            (_, Mode::In) => ease_in(curve, t),
            (_, Mode::Out) => ease_out(curve, t),
            (_, Mode::InOut) => {
                if t < 0.5 {
                    ease_in(curve, t * 2.0) / 2.0
                } else {
                    0.5 + ease_out(curve, t * 2.0 - 1.0) / 2.0
                }
            }
            (_, Mode::OutIn) => {
                if t < 0.5 {
                    ease_out(curve, t * 2.0) / 2.0
                } else {
                    0.5 + ease_in(curve, t * 2.0 - 1.0) / 2.0
                }
            }
        }
    }

    /// 镜像曲线：In ↔ Out，InOut ↔ OutIn，Linear 保持不变
    ///
    /// 用于三段式（from → to → to_to）进度的后半段。
    pub fn opposite(self) -> Self {
        use EasingEquation::*;
        match self {
            Linear => Linear,
            QuadEaseIn => QuadEaseOut,
            QuadEaseOut => QuadEaseIn,
            QuadEaseInOut => QuadEaseOutIn,
            QuadEaseOutIn => QuadEaseInOut,
            CubicEaseIn => CubicEaseOut,
            CubicEaseOut => CubicEaseIn,
            CubicEaseInOut => CubicEaseOutIn,
            CubicEaseOutIn => CubicEaseInOut,
            QuartEaseIn => QuartEaseOut,
            QuartEaseOut => QuartEaseIn,
            QuartEaseInOut => QuartEaseOutIn,
            QuartEaseOutIn => QuartEaseInOut,
            QuintEaseIn => QuintEaseOut,
            QuintEaseOut => QuintEaseIn,
            QuintEaseInOut => QuintEaseOutIn,
            QuintEaseOutIn => QuintEaseInOut,
            SineEaseIn => SineEaseOut,
            SineEaseOut => SineEaseIn,
            SineEaseInOut => SineEaseOutIn,
            SineEaseOutIn => SineEaseInOut,
            ExpoEaseIn => ExpoEaseOut,
            ExpoEaseOut => ExpoEaseIn,
            ExpoEaseInOut => ExpoEaseOutIn,
            ExpoEaseOutIn => ExpoEaseInOut,
            CircEaseIn => CircEaseOut,
            CircEaseOut => CircEaseIn,
            CircEaseInOut => CircEaseOutIn,
            CircEaseOutIn => CircEaseInOut,
            BackEaseIn => BackEaseOut,
            BackEaseOut => BackEaseIn,
            BackEaseInOut => BackEaseOutIn,
            BackEaseOutIn => BackEaseInOut,
            ElasticEaseIn => ElasticEaseOut,
            ElasticEaseOut => ElasticEaseIn,
            ElasticEaseInOut => ElasticEaseOutIn,
            ElasticEaseOutIn => ElasticEaseInOut,
            BounceEaseIn => BounceEaseOut,
            BounceEaseOut => BounceEaseIn,
            BounceEaseInOut => BounceEaseOutIn,
            BounceEaseOutIn => BounceEaseInOut,
        }
    }
}

fn ease_in(curve: Curve, t: f32) -> f32 {
    match curve {
        Curve::Quad => t * t,
        Curve::Cubic => t * t * t,
        Curve::Quart => t.powi(4),
        Curve::Quint => t.powi(5),
        Curve::Sine => 1.0 - (t * PI / 2.0).cos(),
        Curve::Expo => {
            if t == 0.0 {
                0.0
            } else {
                2.0_f32.powf(10.0 * (t - 1.0))
            }
        }
        Curve::Circ => 1.0 - (1.0 - t * t).max(0.0).sqrt(),
        Curve::Back => t * t * ((BACK_OVERSHOOT + 1.0) * t - BACK_OVERSHOOT),
        Curve::Elastic => {
            if t == 0.0 || t == 1.0 {
                return t;
            }
            let s = ELASTIC_PERIOD / 4.0;
            let t = t - 1.0;
            -(2.0_f32.powf(10.0 * t) * ((t - s) * (2.0 * PI) / ELASTIC_PERIOD).sin())
        }
        Curve::Bounce => 1.0 - bounce_out(1.0 - t),
    }
}

fn ease_out(curve: Curve, t: f32) -> f32 {
    match curve {
        Curve::Bounce => bounce_out(t),
        Curve::Expo => {
            if t == 1.0 {
                1.0
            } else {
                1.0 - 2.0_f32.powf(-10.0 * t)
            }
        }
        Curve::Elastic => {
            if t == 0.0 || t == 1.0 {
                return t;
            }
            let s = ELASTIC_PERIOD / 4.0;
            2.0_f32.powf(-10.0 * t) * ((t - s) * (2.0 * PI) / ELASTIC_PERIOD).sin() + 1.0
        }
        _ => 1.0 - ease_in(curve, 1.0 - t),
    }
}

fn bounce_out(t: f32) -> f32 {
    if t < 1.0 / 2.75 {
        7.5625 * t * t
    } else if t < 2.0 / 2.75 {
        let t = t - 1.5 / 2.75;
        7.5625 * t * t + 0.75
    } else if t < 2.5 / 2.75 {
        let t = t - 2.25 / 2.75;
        7.5625 * t * t + 0.9375
    } else {
        let t = t - 2.625 / 2.75;
        7.5625 * t * t + 0.984375
    }
}

/// Penner 的 BackEaseInOut 使用放大的回退量
fn back_in_out(t: f32) -> f32 {
    let s = BACK_OVERSHOOT * 1.525;
    let t = t * 2.0;
    if t < 1.0 {
        0.5 * (t * t * ((s + 1.0) * t - s))
    } else {
        let t = t - 2.0;
        0.5 * (t * t * ((s + 1.0) * t + s) + 2.0)
    }
}

/// Penner 的 ElasticEaseInOut 使用 1.5 倍周期
fn elastic_in_out(t: f32) -> f32 {
    if t == 0.0 || t == 1.0 {
        return t;
    }
    let p = ELASTIC_PERIOD * 1.5;
    let s = p / 4.0;
    let t = t * 2.0 - 1.0;
    if t < 0.0 {
        -0.5 * (2.0_f32.powf(10.0 * t) * ((t - s) * (2.0 * PI) / p).sin())
    } else {
        2.0_f32.powf(-10.0 * t) * ((t - s) * (2.0 * PI) / p).sin() * 0.5 + 1.0
    }
}
