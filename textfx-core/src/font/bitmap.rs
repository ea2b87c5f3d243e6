//! BMFont 位图字体描述
//!
//! 支持两种导出格式：
//! - XML：`<font><common scaleW=".." scaleH=".."/><chars><char .../></chars></font>`
//! - 纯文本：首行以 `info` 开头，`common` / `char` 行为 `key=value` 字段

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tracing::debug;

use super::{GlyphInfo, GlyphProvider, Rect};
use crate::error::FontError;

/// 一个字形在描述文件中的原始字段（像素单位）
struct RawGlyph {
    id: u32,
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    xoffset: f32,
    yoffset: f32,
    xadvance: f32,
}

impl RawGlyph {
    /// 换算为归一化纹理坐标与网格矩形
    fn into_glyph(self, texture_width: f32, texture_height: f32, y_adjust: f32) -> GlyphInfo {
        GlyphInfo {
            advance: self.xadvance,
            vert: Rect::new(self.xoffset, -self.yoffset + y_adjust, self.width, -self.height),
            uv: Rect::new(
                self.x / texture_width,
                1.0 - self.y / texture_height - self.height / texture_height,
                self.width / texture_width,
                self.height / texture_height,
            ),
            flipped: false,
        }
    }
}

/// 位图字体
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BitmapFont {
    texture_width: f32,
    texture_height: f32,
    glyphs: BTreeMap<u32, GlyphInfo>,
}

impl BitmapFont {
    /// 从文件读取并解析
    pub fn load(path: impl AsRef<Path>) -> Result<Self, FontError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| FontError::Io {
            message: format!("{}: {}", path.display(), e),
        })?;
        Self::parse(&content)
    }

    /// 解析描述文本，按内容判断格式
    pub fn parse(content: &str) -> Result<Self, FontError> {
        let trimmed = content.trim_start_matches('\u{feff}').trim_start();
        let font = if trimmed.starts_with('<') {
            Self::parse_xml(trimmed)?
        } else if trimmed.starts_with("info") {
            Self::parse_text(trimmed)?
        } else {
            return Err(FontError::UnknownFormat);
        };
        debug!(glyphs = font.glyphs.len(), "位图字体解析完成");
        Ok(font)
    }

    /// 贴图尺寸
    pub fn texture_size(&self) -> (f32, f32) {
        (self.texture_width, self.texture_height)
    }

    /// 字形表（按字符码排序）
    pub fn glyphs(&self) -> &BTreeMap<u32, GlyphInfo> {
        &self.glyphs
    }

    fn parse_xml(content: &str) -> Result<Self, FontError> {
        let doc = roxmltree::Document::parse(content).map_err(|e| FontError::InvalidXml {
            message: e.to_string(),
        })?;
        let common = doc
            .descendants()
            .find(|n| n.has_tag_name("common"))
            .ok_or(FontError::MissingCommon)?;
        let common_line = line_of(&doc, common);
        let texture_width = attr(common, "scaleW", common_line)?;
        let texture_height = attr(common, "scaleH", common_line)?;

        let mut glyphs = BTreeMap::new();
        for node in doc.descendants().filter(|n| n.has_tag_name("char")) {
            let line = line_of(&doc, node);
            let raw = RawGlyph {
                id: attr(node, "id", line)? as u32,
                x: attr(node, "x", line)?,
                y: attr(node, "y", line)?,
                width: attr(node, "width", line)?,
                height: attr(node, "height", line)?,
                xoffset: attr(node, "xoffset", line)?,
                yoffset: attr(node, "yoffset", line)?,
                xadvance: attr(node, "xadvance", line)?,
            };
            glyphs.insert(raw.id, raw.into_glyph(texture_width, texture_height, 0.0));
        }

        Ok(Self {
            texture_width,
            texture_height,
            glyphs,
        })
    }

    fn parse_text(content: &str) -> Result<Self, FontError> {
        let lines: Vec<(usize, &str)> = content
            .lines()
            .enumerate()
            .map(|(i, l)| (i + 1, l.trim()))
            .collect();

        let (common_line, common) = lines
            .iter()
            .find(|(_, l)| l.starts_with("common"))
            .map(|(n, l)| (*n, fields(l)))
            .ok_or(FontError::MissingCommon)?;
        let texture_width = field(&common, "common", "scaleW", common_line)?;
        let texture_height = field(&common, "common", "scaleH", common_line)?;

        let mut glyphs = BTreeMap::new();
        for (line, text) in lines.iter().filter(|(_, l)| l.starts_with("char ")) {
            let values = fields(text);
            let get = |name: &str| field(&values, "char", name, *line);
            let raw = RawGlyph {
                id: get("id")? as u32,
                x: get("x")?,
                y: get("y")?,
                width: get("width")?,
                height: get("height")?,
                xoffset: get("xoffset")?,
                yoffset: get("yoffset")?,
                xadvance: get("xadvance")?,
            };
            // 文本格式的 yoffset 基线比 XML 低一个像素
            glyphs.insert(raw.id, raw.into_glyph(texture_width, texture_height, 1.0));
        }

        Ok(Self {
            texture_width,
            texture_height,
            glyphs,
        })
    }
}

impl GlyphProvider for BitmapFont {
    fn glyph(&self, character: char) -> Option<GlyphInfo> {
        self.glyphs.get(&(character as u32)).copied()
    }
}

fn line_of(doc: &roxmltree::Document, node: roxmltree::Node) -> usize {
    doc.text_pos_at(node.range().start).row as usize
}

fn attr(node: roxmltree::Node, name: &str, line: usize) -> Result<f32, FontError> {
    let value = node
        .attribute(name)
        .ok_or_else(|| FontError::MissingAttribute {
            line,
            element: node.tag_name().name().to_string(),
            attribute: name.to_string(),
        })?;
    parse_number(value, name, line)
}

/// 拆分 `key=value` 字段
fn fields(line: &str) -> Vec<(&str, &str)> {
    line.split_whitespace()
        .filter_map(|token| token.split_once('='))
        .collect()
}

fn field(values: &[(&str, &str)], element: &str, name: &str, line: usize) -> Result<f32, FontError> {
    let value = values
        .iter()
        .find(|(key, _)| *key == name)
        .map(|(_, v)| *v)
        .ok_or_else(|| FontError::MissingAttribute {
            line,
            element: element.to_string(),
            attribute: name.to_string(),
        })?;
    parse_number(value, name, line)
}

fn parse_number(value: &str, attribute: &str, line: usize) -> Result<f32, FontError> {
    value
        .trim_matches('"')
        .parse::<f32>()
        .map_err(|_| FontError::InvalidAttribute {
            line,
            attribute: attribute.to_string(),
            value: value.to_string(),
        })
}
