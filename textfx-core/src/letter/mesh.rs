//! 字符四边形：基础几何与按动作进度计算的输出网格

use glam::{EulerRot, Mat3, Quat, Vec2, Vec3};

use crate::action::{AxisEasing, LetterAction};
use crate::color::{Color, VertexColor};
use crate::font::GlyphInfo;
use crate::progression::{AnimatePer, ProgressionIndices};
use crate::sinks::ParticlePlacement;

/// 输出网格：4 个顶点与 4 个顶点颜色
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LetterQuad {
    pub vertices: [Vec3; 4],
    pub colors: [Color; 4],
}

impl Default for LetterQuad {
    fn default() -> Self {
        Self {
            vertices: [Vec3::ZERO; 4],
            colors: [Color::WHITE; 4],
        }
    }
}

impl LetterQuad {
    /// 四个顶点的中心
    pub fn centroid(&self) -> Vec3 {
        self.vertices.iter().copied().sum::<Vec3>() / 4.0
    }

    /// 第一个三角形 (2, 1, 0) 的法线；退化时为零向量
    pub fn normal(&self) -> Vec3 {
        let [v0, v1, v2, _] = self.vertices;
        (v1 - v2).cross(v0 - v2).normalize_or_zero()
    }

    /// 粒子发射器在本网格上的摆放
    ///
    /// 发射器朝向网格法线，偏移在该朝向下旋转后叠加到中心点上。
    pub fn placement(&self, offset: Vec3) -> ParticlePlacement {
        let normal = self.normal();
        if normal == Vec3::ZERO {
            return ParticlePlacement {
                position: self.centroid() + offset,
                rotation: Quat::IDENTITY,
            };
        }
        let up = if self.vertices[1] == self.vertices[2] {
            Vec3::Z
        } else {
            self.vertices[1] - self.vertices[2]
        };
        let rotation = look_rotation(normal, up);
        ParticlePlacement {
            position: self.centroid() + rotation * offset,
            rotation,
        }
    }
}

/// 以 `forward` 为 +Z、`up` 为近似 +Y 的朝向
fn look_rotation(forward: Vec3, up: Vec3) -> Quat {
    let z = forward.normalize_or_zero();
    let x = up.cross(z).try_normalize().unwrap_or_else(|| z.any_orthonormal_vector());
    let y = z.cross(x);
    Quat::from_mat3(&Mat3::from_cols(x, y, z))
}

/// Unity 约定的欧拉角（度）：先绕 Z，再绕 X，最后绕 Y
pub fn euler_rotation(degrees: Vec3) -> Quat {
    Quat::from_euler(
        EulerRot::YXZ,
        degrees.y.to_radians(),
        degrees.x.to_radians(),
        degrees.z.to_radians(),
    )
}

/// 一个动作通道的插值：有逐轴缓动时各轴独立作用于线性进度
fn lerp_channel(from: Vec3, to: Vec3, axis_ease: Option<&AxisEasing>, progress: PoseProgress) -> Vec3 {
    match axis_ease {
        Some(ease) => from + (to - from) * ease.ease(progress.linear),
        None => from.lerp(to, progress.eased),
    }
}

/// 渲染一帧所需的进度
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PoseProgress {
    /// 缓动后的动作进度
    pub eased: f32,
    /// 线性进度（逐轴缓动使用）
    pub linear: f32,
}

impl PoseProgress {
    pub fn new(eased: f32, linear: f32) -> Self {
        Self { eased, linear }
    }

    /// 静态姿态：两种进度相同
    pub fn uniform(progress: f32) -> Self {
        Self::new(progress, progress)
    }
}

/// 字符的基础几何（排版得到，不随动画变化）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphQuad {
    pub info: GlyphInfo,
    pub vertices: [Vec3; 4],
    pub uvs: [Vec2; 4],
}

impl GlyphQuad {
    pub fn new(info: GlyphInfo) -> Self {
        let (w, h) = (info.vert.width, info.vert.height);
        let vertices = if info.flipped {
            [
                Vec3::ZERO,
                Vec3::new(0.0, h, 0.0),
                Vec3::new(w, h, 0.0),
                Vec3::new(w, 0.0, 0.0),
            ]
        } else {
            [
                Vec3::new(w, 0.0, 0.0),
                Vec3::ZERO,
                Vec3::new(0.0, h, 0.0),
                Vec3::new(w, h, 0.0),
            ]
        };

        let uv = info.uv;
        let mut uvs = [
            Vec2::new(uv.x + uv.width, uv.y + uv.height),
            Vec2::new(uv.x, uv.y + uv.height),
            Vec2::new(uv.x, uv.y),
            Vec2::new(uv.x + uv.width, uv.y),
        ];
        if info.flipped {
            uvs.reverse();
        }

        Self {
            info,
            vertices,
            uvs,
        }
    }

    pub fn width(&self) -> f32 {
        self.info.vert.width
    }

    pub fn height(&self) -> f32 {
        self.info.vert.height
    }

    /// 默认姿态：基础顶点加基准偏移，白色
    pub fn base_pose(&self, base_offset: Vec3, out: &mut LetterQuad) {
        for (vertex, base) in out.vertices.iter_mut().zip(self.vertices) {
            *vertex = base + base_offset;
        }
        out.colors = [Color::WHITE; 4];
    }

    /// 按动作与进度计算输出网格
    ///
    /// 几何：减去锚点 → 缩放 → 旋转 → 加回锚点 → 平移。
    /// 静止通道在非首帧时跳过计算，保留上一帧的结果。
    ///
    /// # 参数
    /// - `first_call`: 动作的第一帧（或强制渲染），忽略静止标记
    #[allow(clippy::too_many_arguments)]
    pub fn render(
        &self,
        out: &mut LetterQuad,
        base_offset: Vec3,
        action: &LetterAction,
        indices: &ProgressionIndices,
        per: AnimatePer,
        progress: PoseProgress,
        first_call: bool,
    ) {
        let flags = action.static_flags;

        if first_call || !flags.geometry() {
            let anchor = action.letter_anchor.offset_within(self.width(), self.height());

            let scale = lerp_channel(
                action.start_scale.value(indices, per),
                action.end_scale.value(indices, per),
                action.scale_axis_ease.as_ref(),
                progress,
            );
            let rotation = euler_rotation(lerp_channel(
                action.start_euler_rotation.value(indices, per),
                action.end_euler_rotation.value(indices, per),
                action.rotation_axis_ease.as_ref(),
                progress,
            ));

            let position_from = action.start_pos.resolve_against(base_offset, indices, per);
            let position_to = action.end_pos.resolve_against(base_offset, indices, per);
            let translation = lerp_channel(
                position_from,
                position_to,
                action.position_axis_ease.as_ref(),
                progress,
            );

            for (vertex, base) in out.vertices.iter_mut().zip(self.vertices) {
                *vertex = rotation * ((base - anchor) * scale) + anchor + translation;
            }
        }

        if first_call || !flags.colour {
            let start = if action.gradient_start() {
                action.start_vertex_colour.value(indices, per)
            } else {
                VertexColor::from(action.start_colour.value(indices, per))
            };
            let end = if action.gradient_end() {
                action.end_vertex_colour.value(indices, per)
            } else {
                VertexColor::from(action.end_colour.value(indices, per))
            };
            let t = progress.eased;
            out.colors = if self.info.flipped {
                [
                    start.top_left.lerp(end.top_left, t),
                    start.bottom_left.lerp(end.bottom_left, t),
                    start.bottom_right.lerp(end.bottom_right, t),
                    start.top_right.lerp(end.top_right, t),
                ]
            } else {
                [
                    start.top_right.lerp(end.top_right, t),
                    start.top_left.lerp(end.top_left, t),
                    start.bottom_left.lerp(end.bottom_left, t),
                    start.bottom_right.lerp(end.bottom_right, t),
                ]
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::Rect;
    use crate::layout::TextAnchor;
    use crate::progression::{PopulationCounts, Vector3Progression};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn glyph(flipped: bool) -> GlyphInfo {
        GlyphInfo {
            advance: 1.0,
            vert: Rect::new(0.0, 0.0, 2.0, -4.0),
            uv: Rect::new(0.0, 0.0, 0.5, 0.25),
            flipped,
        }
    }

    fn prepared(mut action: LetterAction) -> LetterAction {
        let counts = PopulationCounts {
            letters: 1,
            words: 1,
            lines: 1,
        };
        action.prepare_data(&counts, None, AnimatePer::Letter, &mut StdRng::seed_from_u64(0));
        action
    }

    fn assert_vec_eq(a: Vec3, b: Vec3) {
        assert!((a - b).length() < 1e-5, "{a:?} != {b:?}");
    }

    #[test]
    fn test_base_vertices_and_uvs() {
        let quad = GlyphQuad::new(glyph(false));
        assert_eq!(quad.vertices[0], Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(quad.vertices[2], Vec3::new(0.0, -4.0, 0.0));
        assert_eq!(quad.uvs[0], Vec2::new(0.5, 0.25));

        let flipped = GlyphQuad::new(glyph(true));
        assert_eq!(flipped.vertices[0], Vec3::ZERO);
        assert_eq!(flipped.uvs[3], Vec2::new(0.5, 0.25));
    }

    #[test]
    fn test_translation_midpoint() {
        let action = prepared(LetterAction {
            end_pos: Vector3Progression::constant(Vec3::new(1.0, 0.0, 0.0)).into(),
            ..Default::default()
        });
        let quad = GlyphQuad::new(glyph(false));
        let mut out = LetterQuad::default();
        let base = Vec3::new(10.0, 0.0, 0.0);
        quad.render(
            &mut out,
            base,
            &action,
            &ProgressionIndices::default(),
            AnimatePer::Letter,
            PoseProgress::uniform(0.5),
            true,
        );
        assert_vec_eq(out.vertices[1], Vec3::new(10.5, 0.0, 0.0));
        assert_vec_eq(out.vertices[0], Vec3::new(12.5, 0.0, 0.0));
    }

    #[test]
    fn test_scale_about_anchor() {
        let action = prepared(LetterAction {
            start_scale: Vector3Progression::constant(Vec3::ZERO),
            end_scale: Vector3Progression::constant(Vec3::ZERO),
            letter_anchor: TextAnchor::MiddleCenter,
            ..Default::default()
        });
        let quad = GlyphQuad::new(glyph(false));
        let mut out = LetterQuad::default();
        quad.render(
            &mut out,
            Vec3::ZERO,
            &action,
            &ProgressionIndices::default(),
            AnimatePer::Letter,
            PoseProgress::uniform(1.0),
            true,
        );
        for vertex in out.vertices {
            assert_vec_eq(vertex, Vec3::new(1.0, -2.0, 0.0));
        }
    }

    #[test]
    fn test_rotation_z_quarter_turn() {
        let action = prepared(LetterAction {
            end_euler_rotation: Vector3Progression::constant(Vec3::new(0.0, 0.0, 90.0)),
            letter_anchor: TextAnchor::UpperLeft,
            ..Default::default()
        });
        let quad = GlyphQuad::new(glyph(false));
        let mut out = LetterQuad::default();
        quad.render(
            &mut out,
            Vec3::ZERO,
            &action,
            &ProgressionIndices::default(),
            AnimatePer::Letter,
            PoseProgress::uniform(1.0),
            true,
        );
        // (2, 0, 0) 绕 Z 轴旋转 90 度
        assert_vec_eq(out.vertices[0], Vec3::new(0.0, 2.0, 0.0));
    }

    #[test]
    fn test_force_position_override_ignores_base() {
        let mut end = crate::progression::PositionProgression::new(Vector3Progression::constant(
            Vec3::new(5.0, 5.0, 0.0),
        ));
        end.force_position_override = true;
        let action = prepared(LetterAction {
            end_pos: end,
            ..Default::default()
        });
        let quad = GlyphQuad::new(glyph(false));
        let mut out = LetterQuad::default();
        quad.render(
            &mut out,
            Vec3::new(100.0, 0.0, 0.0),
            &action,
            &ProgressionIndices::default(),
            AnimatePer::Letter,
            PoseProgress::uniform(1.0),
            true,
        );
        assert_vec_eq(out.vertices[1], Vec3::new(5.0, 5.0, 0.0));
    }

    #[test]
    fn test_colour_corner_order() {
        let red = Color::rgba(1.0, 0.0, 0.0, 1.0);
        let action = prepared(LetterAction {
            use_gradient_start: true,
            start_vertex_colour: crate::progression::VertexColorProgression::constant(VertexColor {
                top_right: red,
                ..VertexColor::WHITE
            }),
            use_gradient_end: true,
            end_vertex_colour: crate::progression::VertexColorProgression::constant(VertexColor {
                top_right: red,
                ..VertexColor::WHITE
            }),
            ..Default::default()
        });
        let mut out = LetterQuad::default();
        let indices = ProgressionIndices::default();
        GlyphQuad::new(glyph(false)).render(
            &mut out,
            Vec3::ZERO,
            &action,
            &indices,
            AnimatePer::Letter,
            PoseProgress::uniform(0.0),
            true,
        );
        assert_eq!(out.colors[0], red);
        GlyphQuad::new(glyph(true)).render(
            &mut out,
            Vec3::ZERO,
            &action,
            &indices,
            AnimatePer::Letter,
            PoseProgress::uniform(0.0),
            true,
        );
        assert_eq!(out.colors[3], red);
    }

    #[test]
    fn test_render_is_idempotent() {
        let action = prepared(LetterAction {
            end_euler_rotation: Vector3Progression::constant(Vec3::new(10.0, 20.0, 30.0)),
            end_scale: Vector3Progression::constant(Vec3::splat(2.0)),
            ..Default::default()
        });
        let quad = GlyphQuad::new(glyph(false));
        let render = || {
            let mut out = LetterQuad::default();
            quad.render(
                &mut out,
                Vec3::ONE,
                &action,
                &ProgressionIndices::default(),
                AnimatePer::Letter,
                PoseProgress::new(0.3, 0.7),
                true,
            );
            out
        };
        assert_eq!(render(), render());
    }

    #[test]
    fn test_static_action_skips_after_first_frame() {
        let action = prepared(LetterAction::default());
        let quad = GlyphQuad::new(glyph(false));
        let mut out = LetterQuad::default();
        let sentinel = [Vec3::splat(7.0); 4];
        out.vertices = sentinel;
        quad.render(
            &mut out,
            Vec3::ZERO,
            &action,
            &ProgressionIndices::default(),
            AnimatePer::Letter,
            PoseProgress::uniform(0.5),
            false,
        );
        assert_eq!(out.vertices, sentinel);
    }

    #[test]
    fn test_placement_faces_normal() {
        let mut out = LetterQuad::default();
        GlyphQuad::new(glyph(false)).base_pose(Vec3::ZERO, &mut out);
        let placement = out.placement(Vec3::ZERO);
        assert_vec_eq(placement.position, Vec3::new(1.0, -2.0, 0.0));
        assert_vec_eq(placement.rotation * Vec3::Z, out.normal());
    }
}
