//! 可参与进度计算的值类型

use std::fmt::Debug;

use glam::Vec3;
use rand::Rng;

use crate::color::{Color, VertexColor};

/// 进度值
///
/// 进度计算只需要"偏移起点 + 插值 + 随机采样"三种运算，
/// 浮点、向量与颜色分别实现即可共享同一套解析逻辑。
pub trait ProgressionValue: Copy + PartialEq + Debug {
    /// 偏移叠加的起点（无偏移时的基值）
    const ZERO: Self;

    /// 尚未解析时读取到的值
    const UNRESOLVED: Self;

    /// 逐分量相加
    fn offset_by(self, offset: Self) -> Self;

    /// `from + (to - from) * t`，不截断 `t`
    fn interpolate(from: Self, to: Self, t: f32) -> Self;

    /// 在 `from` 与 `to` 之间均匀采样
    fn sample<R: Rng + ?Sized>(from: Self, to: Self, rng: &mut R) -> Self;
}

impl ProgressionValue for f32 {
    const ZERO: Self = 0.0;
    const UNRESOLVED: Self = 0.0;

    fn offset_by(self, offset: Self) -> Self {
        self + offset
    }

    fn interpolate(from: Self, to: Self, t: f32) -> Self {
        from + (to - from) * t
    }

    fn sample<R: Rng + ?Sized>(from: Self, to: Self, rng: &mut R) -> Self {
        from + (to - from) * rng.random::<f32>()
    }
}

impl ProgressionValue for Vec3 {
    const ZERO: Self = Vec3::ZERO;
    const UNRESOLVED: Self = Vec3::ZERO;

    fn offset_by(self, offset: Self) -> Self {
        self + offset
    }

    fn interpolate(from: Self, to: Self, t: f32) -> Self {
        from + (to - from) * t
    }

    /// 三个轴各自独立采样
    fn sample<R: Rng + ?Sized>(from: Self, to: Self, rng: &mut R) -> Self {
        Vec3::new(
            f32::sample(from.x, to.x, rng),
            f32::sample(from.y, to.y, rng),
            f32::sample(from.z, to.z, rng),
        )
    }
}

impl ProgressionValue for Color {
    const ZERO: Self = Color::CLEAR;
    const UNRESOLVED: Self = Color::WHITE;

    fn offset_by(self, offset: Self) -> Self {
        self + offset
    }

    fn interpolate(from: Self, to: Self, t: f32) -> Self {
        from + (to - from) * t
    }

    /// 所有通道共用一次采样，颜色沿 from → to 的直线分布
    fn sample<R: Rng + ?Sized>(from: Self, to: Self, rng: &mut R) -> Self {
        Self::interpolate(from, to, rng.random::<f32>())
    }
}

impl ProgressionValue for VertexColor {
    const ZERO: Self = VertexColor::CLEAR;
    const UNRESOLVED: Self = VertexColor::WHITE;

    fn offset_by(self, offset: Self) -> Self {
        self + offset
    }

    fn interpolate(from: Self, to: Self, t: f32) -> Self {
        from + (to - from) * t
    }

    fn sample<R: Rng + ?Sized>(from: Self, to: Self, rng: &mut R) -> Self {
        Self::interpolate(from, to, rng.random::<f32>())
    }
}
