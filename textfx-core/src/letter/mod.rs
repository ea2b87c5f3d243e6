//! # Letter 模块
//!
//! 单个字符的运行时状态机：按动作序列推进延迟、时长、缓动、循环与同步等待，
//! 每次推进后把结果写入字符自己的输出网格。
//!
//! 字符不直接调用音效或粒子接口，触发事件写入 [`LetterTick::triggers`]，
//! 由管理器在整次更新结束后分发。

mod mesh;
mod state;

pub use mesh::{GlyphQuad, LetterQuad, PoseProgress, euler_rotation};
pub use state::{AnimationStateVariables, LetterState};

use glam::{Vec2, Vec3};
use rand::RngCore;
use tracing::trace;

use crate::action::LetterAction;
use crate::animation::LetterAnimation;
use crate::error::AnimationError;
use crate::layout::{PlacedGlyph, TextSettings, TextSizeData};
use crate::loop_cycle::{ActiveLoop, LoopType};
use crate::progression::{AnimatePer, ProgressionIndices, ValueProgression};
use crate::sinks::{AudioCue, ParticleCue, TriggerEvent};

/// 一次推进所需的上下文
pub struct LetterTick<'a> {
    /// 只按当前进度重新渲染，不推进状态
    pub force_render: bool,
    /// 动画计时
    pub timer: f32,
    /// 上一次更新结束时所有字符中最小的动作推进数
    pub lowest_action_progress: usize,
    pub animate_per: AnimatePer,
    pub delta_time: f32,
    /// 本字符是动画的首个字符（同步音效与非逐字粒子只在首字符上触发）
    pub lead_letter: bool,
    pub rng: &'a mut dyn RngCore,
    pub triggers: &'a mut Vec<TriggerEvent>,
}

/// 当前动作缓存的延迟与时长
#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct CurrentAction {
    delay: f32,
    duration: f32,
}

/// 字符
#[derive(Debug, Clone)]
pub struct LetterSetup {
    character: char,
    indices: ProgressionIndices,
    glyph: GlyphQuad,
    /// 排版阶段的光标偏移
    cursor: Vec3,
    base_offset: Vec3,
    base_offset_setup: bool,
    state: AnimationStateVariables,
    current: Option<CurrentAction>,
    quad: LetterQuad,
}

impl LetterSetup {
    pub fn new(placed: &PlacedGlyph) -> Self {
        let glyph = GlyphQuad::new(placed.glyph);
        let mut letter = Self {
            character: placed.character,
            indices: placed.indices,
            glyph,
            cursor: placed.cursor,
            base_offset: Vec3::ZERO,
            base_offset_setup: false,
            state: AnimationStateVariables::default(),
            current: None,
            quad: LetterQuad::default(),
        };
        letter.render_base_pose();
        letter
    }

    /// 复用已有字符：替换字形与序号，保留动画状态
    pub fn recycle(&mut self, placed: &PlacedGlyph) {
        self.character = placed.character;
        self.indices = placed.indices;
        self.glyph = GlyphQuad::new(placed.glyph);
        self.cursor = placed.cursor;
        self.base_offset = Vec3::ZERO;
        self.base_offset_setup = false;
        self.current = None;
    }

    /// 根据所在行的尺寸数据计算基准偏移
    pub fn set_base_offset(&mut self, line: &TextSizeData, settings: &TextSettings) {
        self.base_offset = line.base_offset(self.cursor, &self.glyph.info, settings);
        self.base_offset_setup = true;
    }

    /// 复制另一个字符的动画状态（文本在播放中被修改时，新字符跟上已有进度）
    pub fn copy_state_from(&mut self, other: &LetterSetup) {
        self.state = other.state.clone();
        self.current = None;
    }

    /// 回到动画开头，并登记从动作 0 开始的循环
    pub fn reset(&mut self, animation: &LetterAnimation) {
        self.state.reset();
        self.current = None;
        if !animation.loop_cycles.is_empty() {
            self.update_loop_list(animation);
        }
    }

    /// 清空动画状态（不登记循环）
    pub(crate) fn clear_state(&mut self) {
        self.state.reset();
        self.current = None;
    }

    pub fn character(&self) -> char {
        self.character
    }

    pub fn indices(&self) -> &ProgressionIndices {
        &self.indices
    }

    pub fn glyph(&self) -> &GlyphQuad {
        &self.glyph
    }

    pub fn uvs(&self) -> &[Vec2; 4] {
        &self.glyph.uvs
    }

    pub fn base_offset(&self) -> Vec3 {
        self.base_offset
    }

    pub fn base_offset_setup(&self) -> bool {
        self.base_offset_setup
    }

    pub fn state(&self) -> &AnimationStateVariables {
        &self.state
    }

    pub fn quad(&self) -> &LetterQuad {
        &self.quad
    }

    pub fn is_active(&self) -> bool {
        self.state.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.state.active = active;
    }

    pub fn is_waiting(&self) -> bool {
        self.state.waiting_to_sync
    }

    pub fn action_index(&self) -> usize {
        self.state.action_index
    }

    /// 已推进过的动作个数（含循环重复）
    pub fn action_index_progress(&self) -> usize {
        self.state.action_index_progress
    }

    pub fn in_reverse(&self) -> bool {
        self.state.reverse
    }

    pub fn active_loops(&self) -> &[ActiveLoop] {
        &self.state.active_loops
    }

    /// 默认姿态
    pub fn render_base_pose(&mut self) {
        self.glyph.base_pose(self.base_offset, &mut self.quad);
    }

    /// 渲染任意动作在任意进度下的姿态
    ///
    /// 暂停点没有运动数据，渲染它之前最近的普通动作的结束姿态；
    /// 索引越界时回到默认姿态。
    pub fn render_pose(
        &mut self,
        animation: &LetterAnimation,
        action_index: usize,
        progress: f32,
        per: AnimatePer,
    ) {
        let Some(action) = animation.actions.get(action_index) else {
            self.render_base_pose();
            return;
        };

        let (action, progress) = if action.is_break() {
            match animation.actions[..action_index]
                .iter()
                .rev()
                .find(|a| !a.is_break())
            {
                Some(prev) => (prev, 1.0),
                None => {
                    self.render_base_pose();
                    return;
                }
            }
        } else {
            (action, progress.clamp(0.0, 1.0))
        };
        self.render_action(action, per, PoseProgress::uniform(progress), true);
    }

    fn render_action(
        &mut self,
        action: &LetterAction,
        per: AnimatePer,
        progress: PoseProgress,
        first_call: bool,
    ) {
        self.glyph.render(
            &mut self.quad,
            self.base_offset,
            action,
            &self.indices,
            per,
            progress,
            first_call,
        );
    }

    /// 推进一帧
    ///
    /// # 返回
    /// 推进后的状态；动作数据未解析时返回 `InvalidState`
    pub fn advance(
        &mut self,
        animation: &mut LetterAnimation,
        tick: &mut LetterTick<'_>,
    ) -> Result<LetterState, AnimationError> {
        let num_actions = animation.actions.len();
        if num_actions == 0 || self.state.action_index >= num_actions {
            self.render_base_pose();
            self.state.active = false;
            return Ok(LetterState::Stopped);
        }
        if !self.state.active && !tick.force_render {
            return Ok(LetterState::Stopped);
        }

        let per = tick.animate_per;
        let mut first_call = false;
        if self.state.prev_action_index != Some(self.state.action_index) {
            self.set_current_action(animation, per)?;
            first_call = true;
            self.state.started_action = false;
        } else if self.current.is_none() {
            self.set_current_action(animation, per)?;
        }
        self.state.prev_action_index = Some(self.state.action_index);

        let index = self.state.action_index;
        let is_break = animation.actions[index].is_break();

        if tick.force_render && !is_break {
            let progress = PoseProgress::new(self.state.action_progress, self.state.linear_progress);
            self.render_action(&animation.actions[index], per, progress, true);
        }

        if self.state.waiting_to_sync {
            if is_break {
                if !tick.force_render && self.state.break_delay > 0.0 {
                    self.state.break_delay -= tick.delta_time;
                    if self.state.break_delay <= 0.0 {
                        self.continue_action(animation, tick)?;
                        return Ok(LetterState::Playing);
                    }
                }
                return Ok(LetterState::Waiting);
            } else if tick.lowest_action_progress < self.state.action_index_progress {
                return Ok(LetterState::Playing);
            } else if !tick.force_render {
                self.state.waiting_to_sync = false;
                // 扣除等待同步所花的时间
                self.state.timer_offset = tick.timer;
            }
        } else if !tick.force_render
            && (is_break
                || (!self.state.reverse
                    && animation.actions[index].force_same_start_time
                    && tick.lowest_action_progress < self.state.action_index_progress))
        {
            self.state.waiting_to_sync = true;
            self.state.break_delay = self.current.map_or(0.0, |c| c.duration);
            return Ok(LetterState::Playing);
        }

        if tick.force_render {
            return Ok(self.active_state());
        }

        let CurrentAction { delay, duration } = self.current.unwrap_or_default();
        let reverse = self.state.reverse;
        let mut finished = false;
        self.state.action_progress = 0.0;
        self.state.linear_progress = 0.0;

        let action_timer = tick.timer - self.state.timer_offset;
        if reverse || action_timer > delay {
            let linear = if reverse {
                if action_timer >= duration {
                    0.0
                } else {
                    1.0 - action_timer / duration
                }
            } else if duration <= 0.0 {
                1.0
            } else {
                (action_timer - delay) / duration
            };
            self.state.linear_progress = linear.clamp(0.0, 1.0);

            if !self.state.started_action {
                self.push_start_triggers(&animation.actions[index], tick);
                self.state.started_action = true;
            }

            self.state.action_progress = animation.actions[index]
                .ease_type
                .ease(self.state.linear_progress);

            if (!reverse && self.state.linear_progress >= 1.0)
                || (reverse && action_timer >= duration + delay)
            {
                let end = if reverse { 0.0 } else { 1.0 };
                self.state.action_progress = end;
                self.state.linear_progress = end;
                finished = !reverse;

                self.set_next_action_index(animation);

                if self.state.active {
                    let next = self.state.action_index;
                    if !self.state.reverse {
                        self.state.started_action = false;
                    }
                    self.soft_reset_next(animation, index, tick)?;

                    self.state.timer_offset += delay + duration;

                    if next != index {
                        self.update_loop_list(animation);
                    } else {
                        self.set_current_action(animation, per)?;
                    }
                }
            }
        }

        let progress = PoseProgress::new(self.state.action_progress, self.state.linear_progress);
        if !is_break {
            self.render_action(&animation.actions[index], per, progress, first_call);
        }

        if finished {
            self.push_finish_triggers(&animation.actions[index], tick);
        }

        Ok(self.active_state())
    }

    fn active_state(&self) -> LetterState {
        if self.state.active {
            LetterState::Playing
        } else {
            LetterState::Stopped
        }
    }

    /// 进入下一个动作时为本字符重新采样"唯一随机"进度
    fn soft_reset_next(
        &mut self,
        animation: &mut LetterAnimation,
        prev_index: usize,
        tick: &mut LetterTick<'_>,
    ) -> Result<(), AnimationError> {
        let next = self.state.action_index;
        let repeating = self.state.action_index_progress > next;
        if !self.state.reverse && !repeating {
            return Ok(());
        }

        let prev = animation.resolved_end_state(prev_index);
        let action = &mut animation.actions[next];
        if self.state.reverse {
            action.soft_reset_starts(prev.as_ref(), &self.indices, tick.animate_per, &mut *tick.rng)
        } else {
            action.soft_reset(
                prev.as_ref(),
                &self.indices,
                tick.animate_per,
                next == 0,
                &mut *tick.rng,
            )
        }
    }

    /// 结束暂停点或同步等待，进入下一个动作
    pub fn continue_action(
        &mut self,
        animation: &mut LetterAnimation,
        tick: &mut LetterTick<'_>,
    ) -> Result<(), AnimationError> {
        if !self.state.waiting_to_sync {
            return Ok(());
        }
        self.state.break_delay = 0.0;
        self.state.waiting_to_sync = false;
        self.state.timer_offset = tick.timer;

        let prev_index = self.state.action_index;
        self.set_next_action_index(animation);

        if self.state.active {
            let next = self.state.action_index;
            if !self.state.reverse && self.state.action_index_progress > next {
                let prev = animation.resolved_end_state(prev_index);
                animation.actions[next].soft_reset(
                    prev.as_ref(),
                    &self.indices,
                    tick.animate_per,
                    next == 0,
                    &mut *tick.rng,
                )?;
            }
            if next != prev_index {
                self.update_loop_list(animation);
            }
        }
        trace!(letter = self.indices.letter, index = self.state.action_index, "继续动画");
        Ok(())
    }

    /// 结束最内层的活动循环（完成当前一遍后退出）
    pub fn finish_current_loop(&mut self) {
        if let Some(active) = self.state.active_loops.first_mut() {
            active.finish_after_current();
        }
    }

    /// 按活动循环计算下一个动作索引
    fn set_next_action_index(&mut self, animation: &LetterAnimation) {
        self.state.action_index_progress += 1;

        // 总是处理最内层的活动循环，耗尽后移除并检查外层
        while let Some(active) = self.state.active_loops.first().copied() {
            let cycle = active.cycle;
            let index = self.state.action_index;
            let at_boundary = match cycle.loop_type {
                LoopType::Loop => index == cycle.end_action,
                LoopType::LoopReverse => {
                    (self.state.reverse && index == cycle.start_action)
                        || (!self.state.reverse && index == cycle.end_action)
                }
            };
            if !at_boundary {
                break;
            }

            // 普通循环在终点完成一遍；往返循环在回到起点时完成一遍
            let end_of_cycle = cycle.loop_type == LoopType::Loop || self.state.reverse;
            let exhausted = {
                let active = &mut self.state.active_loops[0];
                if end_of_cycle {
                    active.complete_pass()
                } else {
                    active.first_pass = false;
                    false
                }
            };
            if cycle.loop_type == LoopType::LoopReverse {
                self.state.reverse = !self.state.reverse;
            }

            if exhausted {
                self.state.active_loops.remove(0);
                if cycle.loop_type == LoopType::LoopReverse {
                    // 不允许倒退穿过循环，直接跳到循环终点之后
                    self.state.action_index = cycle.end_action;
                }
                continue;
            }

            if cycle.loop_type == LoopType::Loop {
                self.state.action_index = cycle.start_action;
            }
            return;
        }

        let next = if self.state.reverse {
            self.state.action_index.checked_sub(1)
        } else {
            Some(self.state.action_index + 1)
        };
        match next {
            Some(next) if next < animation.actions.len() => self.state.action_index = next,
            Some(_) => {
                self.state.active = false;
                self.state.action_index = animation.actions.len().saturating_sub(1);
            }
            None => {
                self.state.active = false;
                self.state.action_index = 0;
            }
        }
    }

    /// 登记从当前动作开始的循环，按区间跨度升序插入
    fn update_loop_list(&mut self, animation: &LetterAnimation) {
        let index = self.state.action_index;
        for cycle in animation.loop_cycles.iter().filter(|c| c.start_action == index) {
            let loops = &mut self.state.active_loops;
            if loops.iter().any(|active| active.cycle.same_span(cycle)) {
                continue;
            }
            let span = cycle.span_width();
            let position = loops
                .iter()
                .position(|active| span < active.cycle.span_width())
                .unwrap_or(loops.len());
            loops.insert(position, ActiveLoop::new(*cycle));
        }
    }

    /// 缓存当前动作的延迟与时长
    fn set_current_action(
        &mut self,
        animation: &LetterAnimation,
        per: AnimatePer,
    ) -> Result<(), AnimationError> {
        let index = self.state.action_index;
        let action = animation
            .actions
            .get(index)
            .ok_or(AnimationError::InvalidActionIndex {
                index,
                max: animation.actions.len(),
            })?;

        let mut delay = if action.is_break() {
            0.0
        } else {
            action.delay.try_value(&self.indices, per)?.max(0.0)
        };
        let duration = action.duration.try_value(&self.indices, per)?.max(0.0);

        // 循环只在第一遍使用逐字变化的延迟
        if let Some(active) = self.state.active_loops.first()
            && active.cycle.delay_first_only
            && !active.first_pass
            && action.delay.mode != ValueProgression::Constant
            && (self.state.reverse || !action.force_same_start_time)
        {
            delay = 0.0;
        }

        self.current = Some(CurrentAction { delay, duration });
        Ok(())
    }

    fn push_start_triggers(&self, action: &LetterAction, tick: &mut LetterTick<'_>) {
        let per = tick.animate_per;
        if let Some(audio) = &action.audio_on_start
            && (tick.lead_letter
                || !action.starting_in_sync
                || audio.delay.mode != ValueProgression::Constant)
        {
            tick.triggers.push(TriggerEvent::Audio(AudioCue {
                letter: self.indices.letter,
                clip: audio.clip.clone(),
                delay: audio.delay.value(&self.indices, per),
                offset: audio.offset.value(&self.indices, per),
                volume: audio.volume.value(&self.indices, per),
                pitch: audio.pitch.value(&self.indices, per),
            }));
        }
        if let Some(emitter) = &action.emitter_on_start
            && (emitter.per_letter || tick.lead_letter)
        {
            tick.triggers.push(TriggerEvent::Particle(ParticleCue {
                letter: self.indices.letter,
                emitter: emitter.emitter.clone(),
                delay: emitter.delay.value(&self.indices, per),
                duration: emitter.duration.value(&self.indices, per),
                offset: emitter.offset.value(&self.indices, per),
                follow_mesh: emitter.follow_mesh,
                quad: self.quad,
            }));
        }
    }

    fn push_finish_triggers(&self, action: &LetterAction, tick: &mut LetterTick<'_>) {
        let per = tick.animate_per;
        if let Some(audio) = &action.audio_on_finish
            && (tick.lead_letter || !action.starting_in_sync)
        {
            tick.triggers.push(TriggerEvent::Audio(AudioCue {
                letter: self.indices.letter,
                clip: audio.clip.clone(),
                delay: audio.delay.value(&self.indices, per),
                offset: audio.offset.value(&self.indices, per),
                volume: audio.volume.value(&self.indices, per),
                pitch: audio.pitch.value(&self.indices, per),
            }));
        }
        if let Some(emitter) = &action.emitter_on_finish
            && (emitter.per_letter || tick.lead_letter)
        {
            tick.triggers.push(TriggerEvent::Particle(ParticleCue {
                letter: self.indices.letter,
                emitter: emitter.emitter.clone(),
                delay: emitter.delay.value(&self.indices, per),
                duration: emitter.duration.value(&self.indices, per),
                offset: emitter.offset.value(&self.indices, per),
                follow_mesh: emitter.follow_mesh,
                quad: self.quad,
            }));
        }
    }
}
