//! # Color 模块
//!
//! 顶点颜色类型：单色 [`Color`] 与四角渐变 [`VertexColor`]。
//!
//! 两者都支持逐通道的加减与数乘，进度计算把颜色当作普通向量处理
//! （偏移叠加时 alpha 也参与相加）。

use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

/// RGBA 颜色（各通道 0.0 - 1.0，计算中允许越界）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);
    /// 全零颜色，作为偏移叠加的起点
    pub const CLEAR: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);

    /// 创建颜色
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// 线性插值，`t` 截断到 [0, 1]
    pub fn lerp(self, other: Color, t: f32) -> Color {
        let t = t.clamp(0.0, 1.0);
        self + (other - self) * t
    }

    /// 转为 `[r, g, b, a]`
    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl Add for Color {
    type Output = Color;

    fn add(self, rhs: Color) -> Color {
        Color::rgba(self.r + rhs.r, self.g + rhs.g, self.b + rhs.b, self.a + rhs.a)
    }
}

impl Sub for Color {
    type Output = Color;

    fn sub(self, rhs: Color) -> Color {
        Color::rgba(self.r - rhs.r, self.g - rhs.g, self.b - rhs.b, self.a - rhs.a)
    }
}

impl Mul<f32> for Color {
    type Output = Color;

    fn mul(self, rhs: f32) -> Color {
        Color::rgba(self.r * rhs, self.g * rhs, self.b * rhs, self.a * rhs)
    }
}

/// 四角顶点颜色（渐变）
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct VertexColor {
    pub top_left: Color,
    pub top_right: Color,
    pub bottom_right: Color,
    pub bottom_left: Color,
}

impl VertexColor {
    /// 四角相同的颜色
    pub const fn splat(color: Color) -> Self {
        Self {
            top_left: color,
            top_right: color,
            bottom_right: color,
            bottom_left: color,
        }
    }

    pub const WHITE: VertexColor = VertexColor::splat(Color::WHITE);
    pub const CLEAR: VertexColor = VertexColor::splat(Color::CLEAR);

    fn map2(self, rhs: VertexColor, f: impl Fn(Color, Color) -> Color) -> VertexColor {
        VertexColor {
            top_left: f(self.top_left, rhs.top_left),
            top_right: f(self.top_right, rhs.top_right),
            bottom_right: f(self.bottom_right, rhs.bottom_right),
            bottom_left: f(self.bottom_left, rhs.bottom_left),
        }
    }
}

impl From<Color> for VertexColor {
    fn from(color: Color) -> Self {
        VertexColor::splat(color)
    }
}

impl Add for VertexColor {
    type Output = VertexColor;

    fn add(self, rhs: VertexColor) -> VertexColor {
        self.map2(rhs, |a, b| a + b)
    }
}

impl Sub for VertexColor {
    type Output = VertexColor;

    fn sub(self, rhs: VertexColor) -> VertexColor {
        self.map2(rhs, |a, b| a - b)
    }
}

impl Mul<f32> for VertexColor {
    type Output = VertexColor;

    fn mul(self, rhs: f32) -> VertexColor {
        self.map2(self, |a, _| a * rhs)
    }
}
