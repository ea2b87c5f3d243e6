//! # Font 模块
//!
//! 字形度量：布局只依赖 [`GlyphProvider`] 这一个接口。
//!
//! 内置的 [`BitmapFont`] 读取 BMFont 描述文件（XML 或纯文本格式），
//! 宿主也可以接入自己的字体引擎，只需实现 `glyph(char)`。

mod bitmap;

use serde::{Deserialize, Serialize};

pub use bitmap::BitmapFont;

/// 矩形（左下为原点的纹理 / 网格坐标）
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// 单个字形的度量信息
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GlyphInfo {
    /// 光标前进宽度
    pub advance: f32,
    /// 网格矩形：`x/y` 为相对光标的偏移，`height` 向下为负
    pub vert: Rect,
    /// 纹理坐标
    pub uv: Rect,
    /// 纹理在图集中被旋转存放
    pub flipped: bool,
}

impl GlyphInfo {
    /// 按字号缩放网格尺寸与前进宽度（纹理坐标不变）
    ///
    /// # 参数
    /// - `scale`: 缩放除数，即 `10 / character_size`
    pub fn scaled(&self, scale: f32) -> GlyphInfo {
        GlyphInfo {
            advance: self.advance / scale,
            vert: Rect::new(
                self.vert.x / scale,
                self.vert.y / scale,
                self.vert.width / scale,
                self.vert.height / scale,
            ),
            ..*self
        }
    }
}

/// 字形度量来源
pub trait GlyphProvider {
    /// 查询字符的字形；字体中不存在时返回 `None`
    fn glyph(&self, character: char) -> Option<GlyphInfo>;
}

impl<F: Fn(char) -> Option<GlyphInfo>> GlyphProvider for F {
    fn glyph(&self, character: char) -> Option<GlyphInfo> {
        self(character)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaled_keeps_uv() {
        let info = GlyphInfo {
            advance: 20.0,
            vert: Rect::new(2.0, -4.0, 16.0, -30.0),
            uv: Rect::new(0.5, 0.25, 0.1, 0.2),
            flipped: true,
        };
        let scaled = info.scaled(10.0);
        assert_eq!(scaled.advance, 2.0);
        assert_eq!(scaled.vert, Rect::new(0.2, -0.4, 1.6, -3.0));
        assert_eq!(scaled.uv, info.uv);
        assert!(scaled.flipped);
    }

    #[test]
    fn test_closure_provider() {
        let provider = |c: char| (c == 'a').then(GlyphInfo::default);
        assert!(provider.glyph('a').is_some());
        assert!(provider.glyph('b').is_none());
    }
}
