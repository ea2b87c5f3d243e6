//! # Layout 模块
//!
//! 文本排版：把字符串拆成逐字符的放置信息，并计算每行的尺寸数据。
//!
//! ## 流程
//!
//! 1. [`layout_text`] 依次推进光标，记录每个可见字符的字形、
//!    字 / 词 / 行序号与光标偏移，遇到超出 `max_width` 的单词时整词换行
//! 2. 收尾时为每行生成 [`TextSizeData`]，并回填全文宽高
//! 3. 字符通过 [`TextSizeData::base_offset`] 按锚点、对齐方式与排版方向
//!    得到最终的基准偏移
//!
//! 空格与换行不生成字符，只推进光标与词 / 行计数；`\r` 被丢弃，`\t` 被跳过。

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::font::{GlyphInfo, GlyphProvider};
use crate::progression::ProgressionIndices;

/// 字号换算基数：`font_scale = FONT_SCALE_FACTOR / character_size`
pub const FONT_SCALE_FACTOR: f32 = 10.0;

/// 行高基数，乘以配置的行高系数
pub const BASE_LINE_HEIGHT: f32 = 1.05;

/// 九宫格锚点
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextAnchor {
    UpperLeft,
    UpperCenter,
    UpperRight,
    MiddleLeft,
    #[default]
    MiddleCenter,
    MiddleRight,
    LowerLeft,
    LowerCenter,
    LowerRight,
}

/// 锚点的水平分量
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HorizontalAnchor {
    Left,
    Center,
    Right,
}

/// 锚点的垂直分量
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalAnchor {
    Upper,
    Middle,
    Lower,
}

impl TextAnchor {
    pub fn horizontal(self) -> HorizontalAnchor {
        match self {
            Self::UpperLeft | Self::MiddleLeft | Self::LowerLeft => HorizontalAnchor::Left,
            Self::UpperCenter | Self::MiddleCenter | Self::LowerCenter => HorizontalAnchor::Center,
            Self::UpperRight | Self::MiddleRight | Self::LowerRight => HorizontalAnchor::Right,
        }
    }

    pub fn vertical(self) -> VerticalAnchor {
        match self {
            Self::UpperLeft | Self::UpperCenter | Self::UpperRight => VerticalAnchor::Upper,
            Self::MiddleLeft | Self::MiddleCenter | Self::MiddleRight => VerticalAnchor::Middle,
            Self::LowerLeft | Self::LowerCenter | Self::LowerRight => VerticalAnchor::Lower,
        }
    }

    /// 尺寸为 `width x height` 的矩形内锚点相对左上角的偏移
    ///
    /// 字形高度向下为负，因此 `height` 通常为负值。
    pub fn offset_within(self, width: f32, height: f32) -> Vec3 {
        let x = match self.horizontal() {
            HorizontalAnchor::Left => 0.0,
            HorizontalAnchor::Center => width / 2.0,
            HorizontalAnchor::Right => width,
        };
        let y = match self.vertical() {
            VerticalAnchor::Upper => 0.0,
            VerticalAnchor::Middle => height / 2.0,
            VerticalAnchor::Lower => height,
        };
        Vec3::new(x, y, 0.0)
    }
}

/// 行内对齐
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextAlignment {
    #[default]
    Left,
    Center,
    Right,
}

/// 排版方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextDisplayAxis {
    /// 从左到右，行向下排列
    #[default]
    Horizontal,
    /// 从上到下，列向右排列
    Vertical,
}

/// 排版设置
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextSettings {
    /// 字号
    #[serde(default = "default_character_size")]
    pub character_size: f32,

    #[serde(default)]
    pub display_axis: TextDisplayAxis,

    /// 整段文本相对原点的锚点
    #[serde(default)]
    pub text_anchor: TextAnchor,

    #[serde(default)]
    pub alignment: TextAlignment,

    /// 行高系数
    #[serde(default = "default_line_height")]
    pub line_height: f32,

    /// 字间距（像素）
    #[serde(default)]
    pub px_offset: Vec2,

    /// 自动换行宽度，0 表示不换行
    #[serde(default)]
    pub max_width: f32,
}

fn default_character_size() -> f32 {
    1.0
}

fn default_line_height() -> f32 {
    1.0
}

impl Default for TextSettings {
    fn default() -> Self {
        Self {
            character_size: default_character_size(),
            display_axis: TextDisplayAxis::default(),
            text_anchor: TextAnchor::default(),
            alignment: TextAlignment::default(),
            line_height: default_line_height(),
            px_offset: Vec2::ZERO,
            max_width: 0.0,
        }
    }
}

impl TextSettings {
    /// 字形度量的缩放除数
    pub fn font_scale(&self) -> f32 {
        FONT_SCALE_FACTOR / self.character_size
    }

    /// 实际行高系数
    pub fn line_height_factor(&self) -> f32 {
        self.line_height * BASE_LINE_HEIGHT
    }

    fn is_horizontal(&self) -> bool {
        self.display_axis == TextDisplayAxis::Horizontal
    }

    /// 沿排版方向的光标偏移
    fn cursor(&self, offset: f32) -> Vec3 {
        if self.is_horizontal() {
            Vec3::new(offset, 0.0, 0.0)
        } else {
            Vec3::new(0.0, offset, 0.0)
        }
    }

    /// 一个字符占据的光标步长（含字间距）
    fn step(&self, glyph: &GlyphInfo) -> f32 {
        if self.is_horizontal() {
            glyph.advance + self.px_offset.x / self.font_scale()
        } else {
            glyph.vert.height - self.px_offset.y / self.font_scale()
        }
    }
}

/// 一行（或竖排时一列）的尺寸数据
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TextSizeData {
    pub line_width: f32,
    pub line_height: f32,
    pub total_width: f32,
    pub total_height: f32,
    /// 本行之前所有行的累计高度（竖排时为宽度）
    pub line_height_offset: f32,
    /// 本行字形顶部的最大值
    pub y_max: f32,
}

impl TextSizeData {
    fn new(line_width: f32, line_height: f32, line_height_offset: f32, y_max: f32) -> Self {
        Self {
            line_width,
            line_height,
            line_height_offset,
            y_max,
            ..Default::default()
        }
    }

    /// 计算字符的基准偏移
    ///
    /// # 参数
    /// - `cursor`: 排版阶段记录的光标偏移
    /// - `glyph`: 已缩放的字形
    ///
    /// # 返回
    /// 叠加了字形偏移、行偏移、锚点与对齐后的位置
    pub fn base_offset(&self, cursor: Vec3, glyph: &GlyphInfo, settings: &TextSettings) -> Vec3 {
        let horizontal = settings.is_horizontal();
        let anchor = settings.text_anchor;
        let mut offset = cursor;

        if horizontal {
            offset += Vec3::new(glyph.vert.x, glyph.vert.y - self.line_height_offset, 0.0);
        } else {
            offset += Vec3::new(self.line_height_offset, 0.0, 0.0);
        }
        offset.y -= self.y_max;

        match anchor.vertical() {
            VerticalAnchor::Upper => {}
            VerticalAnchor::Middle => offset.y += self.total_height / 2.0,
            VerticalAnchor::Lower => offset.y += self.total_height,
        }

        let mut alignment_offset = 0.0;
        if horizontal {
            alignment_offset = match settings.alignment {
                TextAlignment::Left => 0.0,
                TextAlignment::Center => (self.total_width - self.line_width) / 2.0,
                TextAlignment::Right => self.total_width - self.line_width,
            };
        } else {
            match settings.alignment {
                TextAlignment::Left => {}
                TextAlignment::Center => {
                    offset.y -= (self.total_height - self.line_height) / 2.0;
                }
                TextAlignment::Right => offset.y -= self.total_height - self.line_height,
            }
        }

        match anchor.horizontal() {
            HorizontalAnchor::Right => offset.x -= self.total_width - alignment_offset,
            HorizontalAnchor::Center => offset.x -= self.total_width / 2.0 - alignment_offset,
            HorizontalAnchor::Left => offset.x += alignment_offset,
        }
        offset
    }
}

/// 一个可见字符的放置信息
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedGlyph {
    pub character: char,
    /// 已按字号缩放的字形
    pub glyph: GlyphInfo,
    pub indices: ProgressionIndices,
    /// 行内光标偏移（尚未叠加行与锚点偏移）
    pub cursor: Vec3,
}

/// 排版结果
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextLayout {
    pub glyphs: Vec<PlacedGlyph>,
    pub lines: Vec<TextSizeData>,
    pub word_count: usize,
    pub line_count: usize,
    pub total_width: f32,
    pub total_height: f32,
}

impl TextLayout {
    /// 字符所在行的尺寸数据
    pub fn line_data(&self, line: usize) -> Option<&TextSizeData> {
        self.lines.get(line)
    }
}

/// 排版过程中的行状态
#[derive(Default)]
struct LineState {
    y_max: f32,
    y_min: f32,
    x_max: f32,
    x_min: f32,
    text_width: f32,
    text_height: f32,
    /// 本行已处理的字符数（含空格）
    letter_in_line: usize,
    width_at_last_space: f32,
    space_advance: f32,
    last_space_y_max: f32,
    last_space_y_min: f32,
    /// 上一个空格之后第一个字符的序号
    first_after_space: Option<usize>,
    last_glyph: Option<GlyphInfo>,
}

/// 跨行累计的尺寸
#[derive(Default)]
struct Totals {
    line_height_offset: f32,
    width: f32,
    height: f32,
}

impl Totals {
    /// 结束一行；最后一行不乘行高系数
    fn push_line(
        &mut self,
        line: &mut LineState,
        lines: &mut Vec<TextSizeData>,
        settings: &TextSettings,
        final_line: bool,
    ) {
        let spacing = if final_line {
            1.0
        } else {
            settings.line_height_factor()
        };
        if settings.is_horizontal() {
            let height = (line.y_max - line.y_min).abs() * spacing;
            if !final_line {
                if let Some(last) = line.last_glyph {
                    // 行末字符按网格宽度而非前进宽度计算
                    line.text_width += -last.advance + last.vert.width + last.vert.x;
                }
            }
            lines.push(TextSizeData::new(
                line.text_width,
                height,
                self.line_height_offset,
                line.y_max,
            ));
            self.line_height_offset += height;
            self.width = self.width.max(line.text_width);
            self.height += height;
        } else {
            let width = (line.x_max - line.x_min).abs() * spacing;
            lines.push(TextSizeData::new(
                width,
                -line.text_height,
                self.line_height_offset,
                0.0,
            ));
            self.line_height_offset += width;
            self.width += width;
            self.height = self.height.min(line.text_height);
        }
        *line = LineState::default();
    }
}

/// 排版文本
///
/// 缺失的字形按零宽处理并输出警告，不会中断排版。
pub fn layout_text(text: &str, settings: &TextSettings, glyphs: &dyn GlyphProvider) -> TextLayout {
    let chars: Vec<char> = text.chars().filter(|c| *c != '\r').collect();
    let horizontal = settings.is_horizontal();
    let scale = settings.font_scale();

    let mut placed: Vec<PlacedGlyph> = Vec::new();
    let mut lines = Vec::new();
    let mut totals = Totals::default();
    let mut line = LineState::default();
    let mut offset = 0.0f32;
    let mut line_idx = 0usize;
    let mut word_idx = 0usize;

    for (char_idx, &character) in chars.iter().enumerate() {
        if character == '\t' {
            continue;
        }

        let glyph = match glyphs.glyph(character) {
            Some(glyph) => glyph.scaled(scale),
            None if character == '\n' => GlyphInfo::default(),
            None => {
                warn!(character = %character, "字体中缺少字形，按零宽排版");
                GlyphInfo::default()
            }
        };

        match character {
            ' ' => {
                if horizontal {
                    line.width_at_last_space = line.text_width;
                    line.space_advance = glyph.advance;
                    line.last_space_y_max = line.y_max;
                    line.last_space_y_min = line.y_min;
                    line.first_after_space = Some(placed.len());
                    line.text_width += glyph.advance;
                    offset += glyph.advance;
                } else {
                    offset -= glyph.advance;
                }
                word_idx += 1;
            }
            '\n' => {
                totals.push_line(&mut line, &mut lines, settings, false);
                offset = 0.0;
                line_idx += 1;
                word_idx += 1;
                continue;
            }
            _ => {
                let is_last = char_idx + 1 == chars.len();
                if horizontal {
                    let top = glyph.vert.y;
                    let bottom = glyph.vert.y + glyph.vert.height;
                    if line.letter_in_line == 0 || top > line.y_max {
                        line.y_max = top;
                    }
                    if line.letter_in_line == 0 || bottom < line.y_min {
                        line.y_min = bottom;
                    }

                    line.text_width += if is_last {
                        glyph.vert.width + glyph.vert.x
                    } else {
                        glyph.advance
                    };

                    if let Some(first) = line.first_after_space.filter(|_| settings.max_width > 0.0) {
                        let actual_width = if is_last {
                            line.text_width
                        } else {
                            line.text_width - glyph.advance + glyph.vert.width + glyph.vert.x
                        };
                        if actual_width > settings.max_width {
                            let new_width =
                                line.text_width - line.width_at_last_space - line.space_advance;
                            let (new_y_min, new_y_max) = (line.last_space_y_min, line.last_space_y_max);

                            line.text_width = line.width_at_last_space;
                            line.y_max = line.last_space_y_max;
                            line.y_min = line.last_space_y_min;

                            offset = 0.0;
                            line_idx += 1;
                            for moved in &mut placed[first..] {
                                moved.indices.line = line_idx;
                                moved.cursor = settings.cursor(offset);
                                offset += settings.step(&moved.glyph);
                            }

                            totals.push_line(&mut line, &mut lines, settings, false);
                            line.text_width = new_width;
                            line.y_min = new_y_min;
                            line.y_max = new_y_max;
                        }
                    }
                } else {
                    let right = glyph.vert.x + glyph.vert.width;
                    if line.letter_in_line == 0 || right > line.x_max {
                        line.x_max = right;
                    }
                    if line.letter_in_line == 0 || glyph.vert.x < line.x_min {
                        line.x_min = glyph.vert.x;
                    }
                    line.text_height += glyph.vert.height;
                }

                placed.push(PlacedGlyph {
                    character,
                    glyph,
                    indices: ProgressionIndices {
                        letter: placed.len(),
                        word: word_idx,
                        line: line_idx,
                    },
                    cursor: settings.cursor(offset),
                });
                offset += settings.step(&glyph);
                line.last_glyph = Some(glyph);
            }
        }
        line.letter_in_line += 1;
    }

    totals.push_line(&mut line, &mut lines, settings, true);

    let total_height = if horizontal {
        totals.height
    } else {
        -totals.height
    };
    let total_width = if settings.max_width > 0.0 {
        settings.max_width
    } else {
        totals.width
    };
    for data in &mut lines {
        data.total_height = total_height;
        data.total_width = total_width;
    }

    TextLayout {
        glyphs: placed,
        lines,
        word_count: word_idx + 1,
        line_count: line_idx + 1,
        total_width: totals.width,
        total_height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::Rect;

    /// 等宽测试字体：前进 10，网格 8x-10（缩放前）
    fn mono(c: char) -> Option<GlyphInfo> {
        (c != '#').then_some(GlyphInfo {
            advance: 10.0,
            vert: Rect::new(1.0, 0.0, 8.0, -10.0),
            uv: Rect::new(0.0, 0.0, 0.1, 0.1),
            flipped: false,
        })
    }

    fn settings() -> TextSettings {
        TextSettings {
            character_size: 10.0,
            text_anchor: TextAnchor::UpperLeft,
            ..Default::default()
        }
    }

    #[test]
    fn test_counts_and_cursor() {
        let layout = layout_text("ab c\r\nd", &settings(), &mono);
        assert_eq!(layout.glyphs.len(), 4);
        assert_eq!(layout.word_count, 3);
        assert_eq!(layout.line_count, 2);

        let c = layout.glyphs[2];
        assert_eq!(c.character, 'c');
        assert_eq!(c.indices.word, 1);
        assert_eq!(c.indices.letter, 2);
        assert_eq!(c.cursor, Vec3::new(30.0, 0.0, 0.0));

        let d = layout.glyphs[3];
        assert_eq!(d.indices.line, 1);
        assert_eq!(d.indices.word, 2);
        assert_eq!(d.cursor, Vec3::ZERO);
    }

    #[test]
    fn test_line_metrics() {
        let layout = layout_text("ab\ncd", &settings(), &mono);
        assert_eq!(layout.lines.len(), 2);
        let first = layout.lines[0];
        // 末字符按网格宽度：10 + 1 + 8
        assert_eq!(first.line_width, 19.0);
        assert!((first.line_height - 10.5).abs() < 1e-5);
        let second = layout.lines[1];
        assert_eq!(second.line_width, 19.0);
        assert_eq!(second.line_height, 10.0);
        assert!((second.line_height_offset - 10.5).abs() < 1e-5);
        assert!((second.total_height - 20.5).abs() < 1e-5);
        assert_eq!(second.total_width, 19.0);
    }

    #[test]
    fn test_word_wrap_moves_word() {
        let wrap = TextSettings {
            max_width: 35.0,
            ..settings()
        };
        let layout = layout_text("aa bb", &wrap, &mono);
        assert_eq!(layout.line_count, 2);
        let b0 = layout.glyphs[2];
        let b1 = layout.glyphs[3];
        assert_eq!(b0.indices.line, 1);
        assert_eq!(b0.cursor, Vec3::ZERO);
        assert_eq!(b1.cursor, Vec3::new(10.0, 0.0, 0.0));
        assert_eq!(layout.lines[0].line_width, 19.0);
        assert_eq!(layout.lines[1].total_width, 35.0);
    }

    #[test]
    fn test_missing_glyph_is_zero_width() {
        let layout = layout_text("a#b", &settings(), &mono);
        assert_eq!(layout.glyphs.len(), 3);
        assert_eq!(layout.glyphs[1].glyph.advance, 0.0);
        assert_eq!(layout.glyphs[2].cursor, Vec3::new(10.0, 0.0, 0.0));
    }

    #[test]
    fn test_base_offset_anchors() {
        let layout = layout_text("ab", &settings(), &mono);
        let data = layout.lines[0];
        let a = layout.glyphs[0];

        let upper_left = data.base_offset(a.cursor, &a.glyph, &settings());
        assert_eq!(upper_left, Vec3::new(1.0, 0.0, 0.0));

        let centered = TextSettings {
            text_anchor: TextAnchor::MiddleCenter,
            ..settings()
        };
        let offset = data.base_offset(a.cursor, &a.glyph, &centered);
        assert!((offset.x - (1.0 - 9.5)).abs() < 1e-5);
        assert!((offset.y - 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_alignment_right() {
        let right = TextSettings {
            alignment: TextAlignment::Right,
            ..settings()
        };
        let layout = layout_text("abc\na", &right, &mono);
        let last = layout.glyphs[3];
        let data = layout.lines[last.indices.line];
        let offset = data.base_offset(last.cursor, &last.glyph, &right);
        // 第二行比第一行窄 20
        assert!((offset.x - 21.0).abs() < 1e-5);
    }

    #[test]
    fn test_vertical_axis_stacks_down() {
        let vertical = TextSettings {
            display_axis: TextDisplayAxis::Vertical,
            ..settings()
        };
        let layout = layout_text("ab", &vertical, &mono);
        assert_eq!(layout.glyphs[1].cursor, Vec3::new(0.0, -10.0, 0.0));
        assert_eq!(layout.lines[0].line_height, 20.0);
        assert_eq!(layout.lines[0].total_height, 20.0);
    }

    #[test]
    fn test_anchor_offset_within() {
        assert_eq!(
            TextAnchor::LowerRight.offset_within(4.0, -2.0),
            Vec3::new(4.0, -2.0, 0.0)
        );
        assert_eq!(
            TextAnchor::MiddleCenter.offset_within(4.0, -2.0),
            Vec3::new(2.0, -1.0, 0.0)
        );
        assert_eq!(TextAnchor::UpperLeft.offset_within(4.0, -2.0), Vec3::ZERO);
    }
}
