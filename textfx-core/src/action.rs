//! # Action 模块
//!
//! 动作：一段带时序的字符动画参数集合（位置、旋转、缩放、颜色、
//! 延迟与时长，以及开始 / 结束时的音效与粒子触发）。
//!
//! 动作在播放前需要通过 [`LetterAction::prepare_data`] 针对当前文本的
//! 字 / 词 / 行数量解析全部进度。`offset_from_last` 的动作读取上一个动作
//! 已解析结果的只读快照 [`ResolvedState`]，不与之共享可变数组。

use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::color::{Color, VertexColor};
use crate::easing::EasingEquation;
use crate::error::AnimationError;
use crate::layout::TextAnchor;
use crate::progression::{
    AnimatePer, ColorProgression, FloatProgression, PopulationCounts, PositionProgression,
    Progression, ProgressionIndices, ProgressionValue, Vector3Progression,
    VertexColorProgression,
};

/// 动作类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ActionType {
    /// 普通动画段
    #[default]
    AnimSequence,
    /// 暂停点：时长为暂停长度，时长为 0 时需外部调用 continue 才会继续
    Break,
}

/// 逐轴缓动覆盖
///
/// 设置后该通道的三个轴各自使用自己的曲线作用于线性进度，
/// 不再使用动作整体的缓动结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AxisEasing {
    pub x: EasingEquation,
    pub y: EasingEquation,
    pub z: EasingEquation,
}

impl AxisEasing {
    /// 按轴计算插值系数
    pub fn ease(&self, linear_progress: f32) -> Vec3 {
        Vec3::new(
            self.x.ease(linear_progress),
            self.y.ease(linear_progress),
            self.z.ease(linear_progress),
        )
    }
}

/// 音效触发参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioTrigger {
    /// 音频资源标识
    pub clip: String,
    pub delay: FloatProgression,
    /// 从音频的哪个位置开始播放（秒）
    pub offset: FloatProgression,
    pub volume: FloatProgression,
    pub pitch: FloatProgression,
}

impl Default for AudioTrigger {
    fn default() -> Self {
        Self {
            clip: String::new(),
            delay: FloatProgression::constant(0.0),
            offset: FloatProgression::constant(0.0),
            volume: FloatProgression::constant(1.0),
            pitch: FloatProgression::constant(1.0),
        }
    }
}

impl AudioTrigger {
    pub fn new(clip: impl Into<String>) -> Self {
        Self {
            clip: clip.into(),
            ..Default::default()
        }
    }

    fn resolve<R: Rng + ?Sized>(&mut self, counts: &PopulationCounts, per: AnimatePer, rng: &mut R) {
        for p in [&mut self.volume, &mut self.offset, &mut self.delay, &mut self.pitch] {
            resolve_for(p, counts, per, None, rng);
        }
    }

    fn redraw_unique<R: Rng + ?Sized>(
        &mut self,
        indices: &ProgressionIndices,
        per: AnimatePer,
        rng: &mut R,
    ) -> Result<(), AnimationError> {
        for p in [&mut self.volume, &mut self.delay, &mut self.offset, &mut self.pitch] {
            redraw_unique(p, indices, per, None, rng)?;
        }
        Ok(())
    }
}

/// 粒子触发参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleTrigger {
    /// 粒子发射器标识
    pub emitter: String,
    /// 为 false 时只在第一个字符上触发
    pub per_letter: bool,
    pub delay: FloatProgression,
    /// 持续发射时长；为 0 时只发射一次
    pub duration: FloatProgression,
    /// 是否持续跟随字符网格
    pub follow_mesh: bool,
    /// 相对字符中心的偏移
    pub offset: Vector3Progression,
}

impl Default for ParticleTrigger {
    fn default() -> Self {
        Self {
            emitter: String::new(),
            per_letter: true,
            delay: FloatProgression::constant(0.0),
            duration: FloatProgression::constant(0.0),
            follow_mesh: false,
            offset: Vector3Progression::constant(Vec3::ZERO),
        }
    }
}

impl ParticleTrigger {
    pub fn new(emitter: impl Into<String>) -> Self {
        Self {
            emitter: emitter.into(),
            ..Default::default()
        }
    }

    fn resolve<R: Rng + ?Sized>(&mut self, counts: &PopulationCounts, per: AnimatePer, rng: &mut R) {
        resolve_for(&mut self.offset, counts, per, None, rng);
        resolve_for(&mut self.delay, counts, per, None, rng);
        resolve_for(&mut self.duration, counts, per, None, rng);
    }

    fn redraw_unique<R: Rng + ?Sized>(
        &mut self,
        indices: &ProgressionIndices,
        per: AnimatePer,
        rng: &mut R,
    ) -> Result<(), AnimationError> {
        redraw_unique(&mut self.offset, indices, per, None, rng)?;
        redraw_unique(&mut self.delay, indices, per, None, rng)?;
        redraw_unique(&mut self.duration, indices, per, None, rng)
    }
}

/// 按进度自身的粒度取目标数并解析
fn resolve_for<T: ProgressionValue, R: Rng + ?Sized>(
    progression: &mut Progression<T>,
    counts: &PopulationCounts,
    default_per: AnimatePer,
    offsets: Option<&[T]>,
    rng: &mut R,
) {
    let count = counts.get(progression.animate_per(default_per));
    progression.resolve(count, offsets, rng);
}

/// 仅对"唯一随机"进度重新采样
fn redraw_unique<T: ProgressionValue, R: Rng + ?Sized>(
    progression: &mut Progression<T>,
    indices: &ProgressionIndices,
    default_per: AnimatePer,
    offsets: Option<&[T]>,
    rng: &mut R,
) -> Result<(), AnimationError> {
    if progression.is_unique_random() {
        progression.resolve_unique(indices, default_per, offsets, rng)?;
    }
    Ok(())
}

/// 动作某一端（开始或结束）已解析状态的只读快照
///
/// 下一个动作的偏移链接与循环重放时的重新采样都从快照读取。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResolvedState {
    /// 颜色是否为四角渐变
    pub gradient: bool,
    pub colours: Vec<Color>,
    pub vertex_colours: Vec<VertexColor>,
    pub positions: Vec<Vec3>,
    pub rotations: Vec<Vec3>,
    pub scales: Vec<Vec3>,
}

impl ResolvedState {
    /// 以四角颜色读取（单色会被广播）
    pub fn vertex_colour_offsets(&self) -> Vec<VertexColor> {
        if self.gradient {
            self.vertex_colours.clone()
        } else {
            self.colours.iter().copied().map(VertexColor::from).collect()
        }
    }
}

/// 渲染优化标记：对应通道在整个动作中不变
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StaticFlags {
    pub colour: bool,
    pub position: bool,
    pub rotation: bool,
    pub scale: bool,
}

impl StaticFlags {
    /// 几何通道全部静止
    pub fn geometry(&self) -> bool {
        self.position && self.rotation && self.scale
    }
}

/// 字符动作
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LetterAction {
    pub action_type: ActionType,
    /// 开始状态直接接续上一个动作的结束状态
    pub offset_from_last: bool,

    pub use_gradient_start: bool,
    pub start_colour: ColorProgression,
    pub start_vertex_colour: VertexColorProgression,
    pub use_gradient_end: bool,
    pub end_colour: ColorProgression,
    pub end_vertex_colour: VertexColorProgression,

    pub position_axis_ease: Option<AxisEasing>,
    pub start_pos: PositionProgression,
    pub end_pos: PositionProgression,
    pub rotation_axis_ease: Option<AxisEasing>,
    /// 欧拉角（度）
    pub start_euler_rotation: Vector3Progression,
    pub end_euler_rotation: Vector3Progression,
    pub scale_axis_ease: Option<AxisEasing>,
    pub start_scale: Vector3Progression,
    pub end_scale: Vector3Progression,

    /// 所有字符同时开始本动作（同步屏障）
    pub force_same_start_time: bool,
    pub delay: FloatProgression,
    pub duration: FloatProgression,
    /// 动作整体进度的缓动
    pub ease_type: EasingEquation,
    /// 旋转与缩放围绕的锚点
    pub letter_anchor: TextAnchor,

    /// 为 true 时开始音效只在第一个字符上播放（延迟逐字变化时除外）
    pub starting_in_sync: bool,
    pub audio_on_start: Option<AudioTrigger>,
    pub audio_on_finish: Option<AudioTrigger>,
    pub emitter_on_start: Option<ParticleTrigger>,
    pub emitter_on_finish: Option<ParticleTrigger>,

    /// 静止标记，每次 prepare 时重新计算
    #[serde(skip)]
    pub static_flags: StaticFlags,
}

impl Default for LetterAction {
    fn default() -> Self {
        Self {
            action_type: ActionType::AnimSequence,
            offset_from_last: false,
            use_gradient_start: false,
            start_colour: ColorProgression::constant(Color::WHITE),
            start_vertex_colour: VertexColorProgression::constant(VertexColor::WHITE),
            use_gradient_end: false,
            end_colour: ColorProgression::constant(Color::WHITE),
            end_vertex_colour: VertexColorProgression::constant(VertexColor::WHITE),
            position_axis_ease: None,
            start_pos: PositionProgression::default(),
            end_pos: PositionProgression::default(),
            rotation_axis_ease: None,
            start_euler_rotation: Vector3Progression::constant(Vec3::ZERO),
            end_euler_rotation: Vector3Progression::constant(Vec3::ZERO),
            scale_axis_ease: None,
            start_scale: Vector3Progression::constant(Vec3::ONE),
            end_scale: Vector3Progression::constant(Vec3::ONE),
            force_same_start_time: false,
            delay: FloatProgression::constant(0.0),
            duration: FloatProgression::constant(1.0),
            ease_type: EasingEquation::Linear,
            letter_anchor: TextAnchor::MiddleCenter,
            starting_in_sync: true,
            audio_on_start: None,
            audio_on_finish: None,
            emitter_on_start: None,
            emitter_on_finish: None,
            static_flags: StaticFlags::default(),
        }
    }
}

impl LetterAction {
    /// 创建暂停点
    ///
    /// # 参数
    /// - `duration`: 暂停时长；0 表示无限暂停，直到外部调用 continue
    pub fn pause(duration: f32) -> Self {
        Self {
            action_type: ActionType::Break,
            duration: FloatProgression::constant(duration),
            ..Default::default()
        }
    }

    pub fn is_break(&self) -> bool {
        self.action_type == ActionType::Break
    }

    /// 开始颜色实际使用四角渐变
    pub fn gradient_start(&self) -> bool {
        self.use_gradient_start
    }

    /// 结束颜色实际使用四角渐变
    pub fn gradient_end(&self) -> bool {
        self.use_gradient_end
    }

    /// 结束状态快照
    pub fn end_state(&self) -> ResolvedState {
        ResolvedState {
            gradient: self.use_gradient_end,
            colours: self.end_colour.values().to_vec(),
            vertex_colours: self.end_vertex_colour.values().to_vec(),
            positions: self.end_pos.progression.values().to_vec(),
            rotations: self.end_euler_rotation.values().to_vec(),
            scales: self.end_scale.values().to_vec(),
        }
    }

    /// 解析本动作的全部进度
    ///
    /// # 参数
    /// - `counts`: 字 / 词 / 行数量
    /// - `prev`: 上一个动作的结束状态快照，首个动作为 `None`
    /// - `animate_per`: 动画默认的解析粒度
    pub fn prepare_data<R: Rng + ?Sized>(
        &mut self,
        counts: &PopulationCounts,
        prev: Option<&ResolvedState>,
        animate_per: AnimatePer,
        rng: &mut R,
    ) {
        self.static_flags = StaticFlags::default();

        resolve_for(&mut self.duration, counts, animate_per, None, rng);

        if let Some(audio) = self.audio_on_start.as_mut() {
            audio.resolve(counts, animate_per, rng);
        }
        if let Some(audio) = self.audio_on_finish.as_mut() {
            audio.resolve(counts, animate_per, rng);
        }
        if let Some(emitter) = self.emitter_on_start.as_mut() {
            emitter.resolve(counts, animate_per, rng);
        }
        if let Some(emitter) = self.emitter_on_finish.as_mut() {
            emitter.resolve(counts, animate_per, rng);
        }

        if self.is_break() {
            return;
        }

        resolve_for(&mut self.delay, counts, animate_per, None, rng);

        self.prepare_colours(counts, prev, animate_per, rng);
        self.prepare_transforms(counts, prev, animate_per, rng);
    }

    fn prepare_colours<R: Rng + ?Sized>(
        &mut self,
        counts: &PopulationCounts,
        prev: Option<&ResolvedState>,
        per: AnimatePer,
        rng: &mut R,
    ) {
        match prev {
            Some(prev) if self.offset_from_last => {
                self.use_gradient_start = prev.gradient;
                if prev.gradient {
                    self.start_vertex_colour.set_values(prev.vertex_colours.clone());
                } else {
                    self.start_colour.set_values(prev.colours.clone());
                }
            }
            _ => {
                let prev_gradient = prev.is_some_and(|p| p.gradient);
                if self.use_gradient_start || prev_gradient {
                    if !self.use_gradient_start {
                        // 单色升级为四角渐变，以便与渐变状态插值
                        self.use_gradient_start = true;
                        self.start_vertex_colour =
                            VertexColorProgression::from_flat(&self.start_colour);
                    }
                    let offsets = prev.map(ResolvedState::vertex_colour_offsets);
                    resolve_for(
                        &mut self.start_vertex_colour,
                        counts,
                        per,
                        offsets.as_deref(),
                        rng,
                    );
                } else {
                    let offsets = prev.map(|p| p.colours.as_slice());
                    resolve_for(&mut self.start_colour, counts, per, offsets, rng);
                }
            }
        }

        if self.use_gradient_end || self.use_gradient_start {
            if !self.use_gradient_end {
                self.use_gradient_end = true;
                self.end_vertex_colour = VertexColorProgression::from_flat(&self.end_colour);
            }
            let offsets: Vec<VertexColor> = if self.use_gradient_start {
                self.start_vertex_colour.values().to_vec()
            } else {
                self.start_colour
                    .values()
                    .iter()
                    .copied()
                    .map(VertexColor::from)
                    .collect()
            };
            resolve_for(&mut self.end_vertex_colour, counts, per, Some(&offsets), rng);
        } else {
            resolve_for(
                &mut self.end_colour,
                counts,
                per,
                Some(self.start_colour.values()),
                rng,
            );
        }

        self.static_flags.colour = if self.use_gradient_start && self.use_gradient_end {
            single_and_equal(self.start_vertex_colour.values(), self.end_vertex_colour.values())
        } else if !self.use_gradient_start && !self.use_gradient_end {
            single_and_equal(self.start_colour.values(), self.end_colour.values())
        } else {
            false
        };
    }

    fn prepare_transforms<R: Rng + ?Sized>(
        &mut self,
        counts: &PopulationCounts,
        prev: Option<&ResolvedState>,
        per: AnimatePer,
        rng: &mut R,
    ) {
        match prev {
            Some(prev) if self.offset_from_last => {
                self.start_pos.progression.set_values(prev.positions.clone());
                self.start_euler_rotation.set_values(prev.rotations.clone());
                self.start_scale.set_values(prev.scales.clone());
            }
            _ => {
                let zero = [Vec3::ZERO];
                let (positions, rotations, scales) = match prev {
                    Some(p) => (p.positions.as_slice(), p.rotations.as_slice(), p.scales.as_slice()),
                    None => (&zero[..], &zero[..], &zero[..]),
                };
                resolve_for(&mut self.start_pos.progression, counts, per, Some(positions), rng);
                resolve_for(&mut self.start_euler_rotation, counts, per, Some(rotations), rng);
                resolve_for(&mut self.start_scale, counts, per, Some(scales), rng);
            }
        }

        resolve_for(
            &mut self.end_pos.progression,
            counts,
            per,
            Some(self.start_pos.progression.values()),
            rng,
        );
        resolve_for(
            &mut self.end_euler_rotation,
            counts,
            per,
            Some(self.start_euler_rotation.values()),
            rng,
        );
        resolve_for(
            &mut self.end_scale,
            counts,
            per,
            Some(self.start_scale.values()),
            rng,
        );

        self.static_flags.position = single_and_equal(
            self.start_pos.progression.values(),
            self.end_pos.progression.values(),
        ) && self.start_pos.force_position_override == self.end_pos.force_position_override;
        self.static_flags.rotation = single_and_equal(
            self.start_euler_rotation.values(),
            self.end_euler_rotation.values(),
        );
        self.static_flags.scale =
            single_and_equal(self.start_scale.values(), self.end_scale.values());
    }

    /// 循环重放本动作时，为一个字符重新采样所有"唯一随机"进度
    ///
    /// # 参数
    /// - `prev`: 上一个播放动作的结束状态快照
    /// - `first_action`: 本动作是否为序列中的第一个动作（此时不重采样开始状态）
    pub fn soft_reset<R: Rng + ?Sized>(
        &mut self,
        prev: Option<&ResolvedState>,
        indices: &ProgressionIndices,
        per: AnimatePer,
        first_action: bool,
        rng: &mut R,
    ) -> Result<(), AnimationError> {
        if !first_action {
            self.redraw_starts(prev, indices, per, rng)?;
        }

        if !self.is_break() {
            if self.use_gradient_end {
                let offsets = self.start_vertex_colour.values().to_vec();
                redraw_unique(&mut self.end_vertex_colour, indices, per, Some(&offsets), rng)?;
            } else {
                let offsets = self.start_colour.values().to_vec();
                redraw_unique(&mut self.end_colour, indices, per, Some(&offsets), rng)?;
            }
            let offsets = self.start_pos.progression.values().to_vec();
            redraw_unique(&mut self.end_pos.progression, indices, per, Some(&offsets), rng)?;
            let offsets = self.start_euler_rotation.values().to_vec();
            redraw_unique(&mut self.end_euler_rotation, indices, per, Some(&offsets), rng)?;
            let offsets = self.start_scale.values().to_vec();
            redraw_unique(&mut self.end_scale, indices, per, Some(&offsets), rng)?;

            redraw_unique(&mut self.delay, indices, per, None, rng)?;
        }
        redraw_unique(&mut self.duration, indices, per, None, rng)?;

        if let Some(audio) = self.audio_on_start.as_mut() {
            audio.redraw_unique(indices, per, rng)?;
        }
        if let Some(audio) = self.audio_on_finish.as_mut() {
            audio.redraw_unique(indices, per, rng)?;
        }
        if let Some(emitter) = self.emitter_on_start.as_mut() {
            emitter.redraw_unique(indices, per, rng)?;
        }
        if let Some(emitter) = self.emitter_on_finish.as_mut() {
            emitter.redraw_unique(indices, per, rng)?;
        }
        Ok(())
    }

    /// 反向重放时只重新采样开始状态
    pub fn soft_reset_starts<R: Rng + ?Sized>(
        &mut self,
        prev: Option<&ResolvedState>,
        indices: &ProgressionIndices,
        per: AnimatePer,
        rng: &mut R,
    ) -> Result<(), AnimationError> {
        self.redraw_starts(prev, indices, per, rng)
    }

    fn redraw_starts<R: Rng + ?Sized>(
        &mut self,
        prev: Option<&ResolvedState>,
        indices: &ProgressionIndices,
        per: AnimatePer,
        rng: &mut R,
    ) -> Result<(), AnimationError> {
        if self.offset_from_last || self.is_break() {
            return Ok(());
        }

        if self.use_gradient_start {
            let offsets = prev.map(ResolvedState::vertex_colour_offsets);
            redraw_unique(&mut self.start_vertex_colour, indices, per, offsets.as_deref(), rng)?;
        } else {
            let offsets = prev.map(|p| p.colours.as_slice());
            redraw_unique(&mut self.start_colour, indices, per, offsets, rng)?;
        }
        redraw_unique(
            &mut self.start_pos.progression,
            indices,
            per,
            prev.map(|p| p.positions.as_slice()),
            rng,
        )?;
        redraw_unique(
            &mut self.start_euler_rotation,
            indices,
            per,
            prev.map(|p| p.rotations.as_slice()),
            rng,
        )?;
        redraw_unique(
            &mut self.start_scale,
            indices,
            per,
            prev.map(|p| p.scales.as_slice()),
            rng,
        )
    }

    /// 生成接续本动作结束状态的新动作（编辑器"添加动作"）
    ///
    /// 新动作的开始与结束都等于本动作的结束描述，延迟 0、时长 1。
    pub fn continue_from(&self) -> LetterAction {
        LetterAction {
            offset_from_last: true,
            use_gradient_start: self.use_gradient_end,
            use_gradient_end: self.use_gradient_end,
            position_axis_ease: self.position_axis_ease,
            rotation_axis_ease: self.rotation_axis_ease,
            scale_axis_ease: self.scale_axis_ease,
            start_colour: self.end_colour.clone(),
            end_colour: self.end_colour.clone(),
            start_vertex_colour: self.end_vertex_colour.clone(),
            end_vertex_colour: self.end_vertex_colour.clone(),
            start_pos: self.end_pos.clone(),
            end_pos: self.end_pos.clone(),
            start_euler_rotation: self.end_euler_rotation.clone(),
            end_euler_rotation: self.end_euler_rotation.clone(),
            start_scale: self.end_scale.clone(),
            end_scale: self.end_scale.clone(),
            letter_anchor: self.letter_anchor,
            ease_type: self.ease_type,
            ..Default::default()
        }
    }
}

fn single_and_equal<T: PartialEq>(a: &[T], b: &[T]) -> bool {
    matches!((a, b), ([x], [y]) if x == y)
}
