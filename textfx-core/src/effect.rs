//! # Effect 模块
//!
//! [`EffectManager`] 持有一段文本的全部字符与动画，是宿主唯一需要直接驱动的对象。
//!
//! ## 更新流程
//!
//! 一次更新分两个阶段：
//! 1. 逐动画、逐字符推进状态，字符读取的是上一次更新结束时的最小动作推进数；
//! 2. 全部字符推进完毕后，才用本次得到的最小值抬高全局同步屏障。
//!
//! 推进过程中产生的音效 / 粒子触发在阶段结束后统一分发，随后重建合并网格并提交。

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, warn};

use crate::animation::LetterAnimation;
use crate::config::{EffectConfig, OnFinishAction};
use crate::error::{AnimationError, TextFxResult};
use crate::font::GlyphProvider;
use crate::layout::{TextLayout, TextSettings, layout_text};
use crate::letter::{LetterSetup, LetterState, LetterTick};
use crate::particles::ParticleEffectInstance;
use crate::progression::{AnimatePer, PopulationCounts, ProgressionIndices};
use crate::sinks::{EffectSinks, TextMesh, TriggerEvent};
use crate::timer::{AnimationTime, Countdown, FrameClock};

/// 排版结果不一致时的最大重试次数
pub const MAX_LAYOUT_ATTEMPTS: usize = 3;

/// 播放结束回调
pub type FinishCallback = Box<dyn FnMut()>;

/// 文本效果管理器
pub struct EffectManager {
    glyphs: Box<dyn GlyphProvider>,
    sinks: EffectSinks,
    settings: TextSettings,
    animate_per: AnimatePer,
    on_finish: OnFinishAction,

    text: String,
    layout: TextLayout,
    counts: PopulationCounts,
    letters: Vec<LetterSetup>,
    animations: Vec<LetterAnimation>,
    mesh: TextMesh,

    rng: StdRng,
    clock: FrameClock,
    /// 开始前的倒计时
    begin_countdown: Option<Countdown>,
    animation_timer: f32,
    running: bool,
    paused: bool,
    enabled: bool,
    callback: Option<FinishCallback>,

    particles: Vec<ParticleEffectInstance>,
    /// 本次更新中收集的触发事件
    triggers: Vec<TriggerEvent>,
}

impl std::fmt::Debug for EffectManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectManager")
            .field("text", &self.text)
            .field("letters", &self.letters.len())
            .field("animations", &self.animations.len())
            .field("running", &self.running)
            .field("paused", &self.paused)
            .field("enabled", &self.enabled)
            .field("animation_timer", &self.animation_timer)
            .finish_non_exhaustive()
    }
}

impl EffectManager {
    /// 创建空文本的管理器
    ///
    /// # 参数
    /// - `glyphs`: 字形度量来源
    /// - `sinks`: 网格 / 音效 / 粒子的宿主实现
    /// - `settings`: 排版参数
    pub fn new(glyphs: Box<dyn GlyphProvider>, sinks: EffectSinks, settings: TextSettings) -> Self {
        Self {
            glyphs,
            sinks,
            settings,
            animate_per: AnimatePer::default(),
            on_finish: OnFinishAction::default(),
            text: String::new(),
            layout: TextLayout::default(),
            counts: PopulationCounts::default(),
            letters: Vec::new(),
            animations: Vec::new(),
            mesh: TextMesh::default(),
            rng: StdRng::from_os_rng(),
            clock: FrameClock::new(AnimationTime::default()),
            begin_countdown: None,
            animation_timer: 0.0,
            running: false,
            paused: false,
            enabled: true,
            callback: None,
            particles: Vec::new(),
            triggers: Vec::new(),
        }
    }

    /// 按配置创建管理器，排版文本并按需开始播放
    pub fn from_config(
        config: &EffectConfig,
        glyphs: Box<dyn GlyphProvider>,
        sinks: EffectSinks,
    ) -> TextFxResult<Self> {
        config.validate()?;

        let mut manager = Self::new(glyphs, sinks, config.settings)
            .with_animate_per(config.animate_per)
            .with_time_type(config.time_type)
            .with_on_finish(config.on_finish);
        if let Some(seed) = config.random_seed {
            manager = manager.with_seed(seed);
        }
        manager.animations = config.animations.clone();
        manager.set_text(&config.text)?;

        if config.begin_on_start {
            manager.play_animation(config.begin_delay);
        }
        Ok(manager)
    }

    /// 固定随机种子（相同种子得到相同的随机进度）
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn with_animate_per(mut self, per: AnimatePer) -> Self {
        self.animate_per = per;
        self
    }

    pub fn with_time_type(mut self, time_type: AnimationTime) -> Self {
        self.clock = FrameClock::new(time_type);
        self
    }

    pub fn with_on_finish(mut self, on_finish: OnFinishAction) -> Self {
        self.on_finish = on_finish;
        self
    }

    // ── 访问器 ──

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn settings(&self) -> &TextSettings {
        &self.settings
    }

    pub fn layout(&self) -> &TextLayout {
        &self.layout
    }

    pub fn letters(&self) -> &[LetterSetup] {
        &self.letters
    }

    /// 最近一次提交的合并网格
    pub fn mesh(&self) -> &TextMesh {
        &self.mesh
    }

    pub fn animations(&self) -> &[LetterAnimation] {
        &self.animations
    }

    /// 编辑动画数据；修改后需要调用 [`Self::prepare_animation_data`]
    pub fn animations_mut(&mut self) -> &mut Vec<LetterAnimation> {
        &mut self.animations
    }

    /// 追加动画并立即解析
    pub fn add_animation(&mut self, animation: LetterAnimation) {
        self.animations.push(animation);
        self.prepare_animation_data();
    }

    pub fn counts(&self) -> &PopulationCounts {
        &self.counts
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// 为 false 时宿主应隐藏文本（播放结束动作为 `Disable`）
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// 正在等待开始倒计时
    pub fn is_counting_down(&self) -> bool {
        self.begin_countdown.is_some()
    }

    pub fn animation_timer(&self) -> f32 {
        self.animation_timer
    }

    /// 仍在播放的动画中最低的同步屏障
    pub fn lowest_action_progress(&self) -> usize {
        self.animations
            .iter()
            .filter(|a| a.state() != LetterState::Stopped)
            .map(LetterAnimation::lowest_action_progress)
            .min()
            .unwrap_or(0)
    }

    /// 仍在运行的粒子效果数
    pub fn particle_effect_count(&self) -> usize {
        self.particles.len()
    }

    /// 动作数最多的动画的动作数
    fn longest_action_list(&self) -> usize {
        self.animations
            .iter()
            .map(|a| a.actions.len())
            .max()
            .unwrap_or(0)
    }

    // ── 文本 ──

    /// 设置文本
    ///
    /// 已有字符按序号复用并保留动画状态；新增的字符复制最后一个旧字符的状态，
    /// 这样在播放中修改文本时新字符能跟上进度。
    pub fn set_text(&mut self, text: &str) -> TextFxResult<()> {
        let layout = self.layout_consistent(text)?;

        let previous = std::mem::take(&mut self.letters);
        let reused = previous.len().min(layout.glyphs.len());
        let mut letters: Vec<LetterSetup> = previous.into_iter().take(reused).collect();
        for (letter, placed) in letters.iter_mut().zip(&layout.glyphs) {
            letter.recycle(placed);
        }
        for placed in &layout.glyphs[reused..] {
            let mut letter = LetterSetup::new(placed);
            if let Some(last) = reused.checked_sub(1).map(|i| &letters[i]) {
                letter.copy_state_from(last);
            }
            letters.push(letter);
        }

        for letter in &mut letters {
            if let Some(line) = layout.line_data(letter.indices().line) {
                letter.set_base_offset(line, &self.settings);
            }
        }

        self.counts = PopulationCounts {
            letters: letters.len(),
            words: layout.word_count,
            lines: layout.line_count,
        };
        self.letters = letters;
        self.layout = layout;
        self.text = text.to_string();
        debug!(text, letters = self.letters.len(), "文本已设置");

        self.prepare_animation_data();
        self.animate_letters(true, 0.0)?;
        self.dispatch_triggers();
        self.submit_mesh();
        Ok(())
    }

    /// 重新排版文本，直到每个字符都能找到所在行的尺寸数据
    fn layout_consistent(&self, text: &str) -> TextFxResult<TextLayout> {
        for attempt in 1..=MAX_LAYOUT_ATTEMPTS {
            let layout = layout_text(text, &self.settings, self.glyphs.as_ref());
            let consistent = layout.lines.len() == layout.line_count
                && layout
                    .glyphs
                    .iter()
                    .all(|g| g.indices.line < layout.lines.len());
            if consistent {
                return Ok(layout);
            }
            warn!(attempt, "排版数据不一致，重新排版");
        }
        Err(AnimationError::LayoutInconsistent {
            attempts: MAX_LAYOUT_ATTEMPTS,
        }
        .into())
    }

    /// 针对当前文本重新解析全部动画
    pub fn prepare_animation_data(&mut self) {
        let indices: Vec<ProgressionIndices> =
            self.letters.iter().map(|l| *l.indices()).collect();
        for animation in &mut self.animations {
            animation.prepare_data(&indices, &self.counts, self.animate_per, &mut self.rng);
        }
    }

    // ── 播放控制 ──

    /// 从头播放
    ///
    /// # 参数
    /// - `delay`: 开始前的等待时间（秒），0 表示立即开始
    pub fn play_animation(&mut self, delay: f32) {
        if self.animations.is_empty() {
            warn!("没有可播放的动画");
            return;
        }

        self.stop_all_particle_effects(true);
        for animation in &mut self.animations {
            animation.set_state(LetterState::Playing);
            animation.clear_barrier();
            for &index in animation.letters() {
                if let Some(letter) = self.letters.get_mut(index) {
                    letter.reset(animation);
                    letter.set_active(true);
                }
            }
        }

        self.animation_timer = 0.0;
        self.begin_countdown = None;

        if delay > 0.0 {
            self.begin_countdown = Some(Countdown::new(delay));
            self.clock.restart();
        } else {
            self.start_running();
        }
        debug!(delay, animations = self.animations.len(), "开始播放");
    }

    /// 从头播放，结束时调用 `callback`
    pub fn play_animation_with_callback(&mut self, delay: f32, callback: impl FnMut() + 'static) {
        self.callback = Some(Box::new(callback));
        self.play_animation(delay);
    }

    fn start_running(&mut self) {
        self.clock.restart();
        self.running = true;
        self.paused = false;
    }

    /// 宿主每帧调用一次
    ///
    /// # 参数
    /// - `frame_dt`: 宿主帧间隔，真实时间模式下忽略
    ///
    /// # 返回
    /// 动画是否仍在运行（含开始前的倒计时）
    pub fn tick(&mut self, frame_dt: f32) -> TextFxResult<bool> {
        if !self.enabled || self.paused {
            return Ok(self.running || self.begin_countdown.is_some());
        }

        let dt = self.clock.delta(frame_dt);
        if let Some(countdown) = self.begin_countdown.as_mut() {
            if !countdown.update(dt) {
                return Ok(true);
            }
            self.begin_countdown = None;
            self.start_running();
            return Ok(true);
        }

        if self.running {
            return self.update_animation(dt);
        }
        Ok(false)
    }

    /// 推进动画
    ///
    /// # 返回
    /// 动画是否仍在运行
    pub fn update_animation(&mut self, dt: f32) -> TextFxResult<bool> {
        self.animation_timer += dt;

        let finished = self.animate_letters(false, dt)?;
        self.dispatch_triggers();
        self.submit_mesh();

        if finished {
            self.running = false;
            debug!(timer = self.animation_timer, "动画播放完毕");

            if let Some(callback) = self.callback.as_mut() {
                callback();
            }
            match self.on_finish {
                OnFinishAction::None => {}
                OnFinishAction::ResetAnimation => self.reset_animation(),
                OnFinishAction::Disable => self.enabled = false,
            }
            self.stop_all_particle_effects(false);
        }

        if self.running && !self.particles.is_empty() {
            self.update_particles(dt);
        }
        Ok(self.running)
    }

    /// 结束暂停点或当前循环
    ///
    /// # 参数
    /// - `animation_index`: 只作用于指定动画；`None` 表示全部动画
    pub fn continue_animation(&mut self, animation_index: Option<usize>) -> TextFxResult<()> {
        let range = match animation_index {
            Some(index) if index >= self.animations.len() => {
                return Err(AnimationError::invalid_state(format!(
                    "动画 {index} 不存在，共 {} 个",
                    self.animations.len()
                ))
                .into());
            }
            Some(index) => index..index + 1,
            None => 0..self.animations.len(),
        };

        let timer = self.animation_timer;
        let per = self.animate_per;

        let Self {
            animations,
            letters,
            rng,
            triggers,
            ..
        } = self;
        for animation in &mut animations[range] {
            animation.set_state(LetterState::Playing);
            let barrier = animation.lowest_action_progress();
            let indices = animation.letters().to_vec();
            let lead = indices.first().copied();
            for index in indices {
                let Some(letter) = letters.get_mut(index) else {
                    continue;
                };
                if letter.is_waiting() {
                    let mut tick = LetterTick {
                        force_render: false,
                        timer,
                        lowest_action_progress: barrier,
                        animate_per: per,
                        delta_time: 0.0,
                        lead_letter: lead == Some(index),
                        rng: &mut *rng,
                        triggers: &mut *triggers,
                    };
                    letter.continue_action(animation, &mut tick)?;
                } else if !letter.active_loops().is_empty() {
                    letter.finish_current_loop();
                }
            }
        }
        debug!(?animation_index, "继续播放");
        Ok(())
    }

    /// 回到初始姿态并清空全部字符状态
    pub fn reset_animation(&mut self) {
        self.pose_letters(0, 0.0);
        for letter in &mut self.letters {
            letter.clear_state();
        }
        self.running = false;
        self.paused = false;
        self.begin_countdown = None;
        for animation in &mut self.animations {
            animation.clear_barrier();
        }
        self.animation_timer = 0.0;
        self.stop_all_particle_effects(true);
        self.submit_mesh();
        debug!("动画已重置");
    }

    /// 停止播放并显示最后一个动作的结束姿态
    pub fn set_end_state(&mut self) {
        self.running = false;
        self.paused = false;
        self.begin_countdown = None;
        let last = self.longest_action_list().saturating_sub(1);
        self.pose_letters(last, 1.0);
        self.submit_mesh();
    }

    /// 显示指定动作在指定进度下的静态姿态
    ///
    /// # 参数
    /// - `action_index`: 动作索引，动作较少的动画取其最后一个动作
    /// - `progress`: 动作进度 `[0, 1]`
    /// - `update_action_values`: 先重新解析动画数据
    pub fn set_animation_state(
        &mut self,
        action_index: usize,
        progress: f32,
        update_action_values: bool,
    ) -> TextFxResult<()> {
        let longest = self.longest_action_list();
        if longest > 0 && action_index >= longest {
            return Err(AnimationError::InvalidActionIndex {
                index: action_index,
                max: longest,
            }
            .into());
        }

        if update_action_values {
            self.prepare_animation_data();
        }
        self.pose_letters(action_index, progress);
        self.submit_mesh();
        Ok(())
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            self.clock.restart();
        }
    }

    /// 停止全部粒子效果
    ///
    /// # 参数
    /// - `force`: 同时清除已发射的粒子
    pub fn stop_all_particle_effects(&mut self, force: bool) {
        let sink = self.sinks.particles.as_mut();
        for effect in &mut self.particles {
            effect.stop(force, sink);
        }
        self.particles.clear();
    }

    // ── 内部更新 ──

    /// 推进全部字符
    ///
    /// # 返回
    /// 是否所有字符都已停止
    fn animate_letters(&mut self, force_render: bool, dt: f32) -> TextFxResult<bool> {
        let mut all_finished = true;
        let mut covered = vec![false; self.letters.len()];
        let timer = self.animation_timer;
        let per = self.animate_per;

        let Self {
            animations,
            letters,
            rng,
            triggers,
            ..
        } = self;
        for animation in animations.iter_mut() {
            if animation.letters().is_empty() {
                animation.set_state(LetterState::Stopped);
                continue;
            }

            let indices = animation.letters().to_vec();
            let lead = indices.first().copied();
            // 屏障只看本动画的字符，上一帧的值在本帧内不变
            let barrier = animation.lowest_action_progress();
            let mut lowest: Option<usize> = None;
            let mut all_waiting = true;
            let mut all_stopped = true;

            for index in indices {
                let Some(letter) = letters.get_mut(index) else {
                    continue;
                };
                covered[index] = true;

                let progress_before = letter.action_index_progress();
                let mut tick = LetterTick {
                    force_render,
                    timer,
                    lowest_action_progress: barrier,
                    animate_per: per,
                    delta_time: dt,
                    lead_letter: lead == Some(index),
                    rng: &mut *rng,
                    triggers: &mut *triggers,
                };
                let state = letter.advance(animation, &mut tick)?;

                // 已停止的字符不再阻挡其他字符
                if state != LetterState::Stopped {
                    lowest = Some(lowest.map_or(progress_before, |l| l.min(progress_before)));
                }

                match state {
                    LetterState::Playing => {
                        all_finished = false;
                        all_waiting = false;
                        all_stopped = false;
                    }
                    LetterState::Waiting => {
                        all_finished = false;
                        all_stopped = false;
                    }
                    LetterState::Stopped => all_waiting = false,
                }
            }

            let state = if all_stopped {
                LetterState::Stopped
            } else if all_waiting && !force_render {
                LetterState::Waiting
            } else {
                LetterState::Playing
            };
            animation.set_state(state);
            if let Some(lowest) = lowest {
                animation.raise_barrier(lowest);
            }
        }

        for (letter, covered) in letters.iter_mut().zip(covered) {
            if !covered {
                letter.render_base_pose();
            }
        }
        Ok(all_finished)
    }

    /// 所有动画的字符显示指定动作的静态姿态
    fn pose_letters(&mut self, action_index: usize, progress: f32) {
        let mut covered = vec![false; self.letters.len()];
        for animation in &self.animations {
            let index = action_index.min(animation.actions.len().saturating_sub(1));
            for &letter_index in animation.letters() {
                if let Some(letter) = self.letters.get_mut(letter_index) {
                    letter.render_pose(animation, index, progress, self.animate_per);
                    covered[letter_index] = true;
                }
            }
        }
        for (letter, covered) in self.letters.iter_mut().zip(covered) {
            if !covered {
                letter.render_base_pose();
            }
        }
    }

    /// 把本次收集的触发事件发给宿主
    fn dispatch_triggers(&mut self) {
        for trigger in self.triggers.drain(..) {
            match trigger {
                TriggerEvent::Audio(cue) => {
                    self.sinks
                        .audio
                        .play_clip(&cue.clip, cue.delay, cue.offset, cue.volume, cue.pitch);
                }
                TriggerEvent::Particle(cue) => {
                    let effect =
                        ParticleEffectInstance::spawn(&cue, self.sinks.particles.as_mut());
                    self.particles.push(effect);
                }
            }
        }
    }

    fn update_particles(&mut self, dt: f32) {
        let letters = &self.letters;
        let sink = self.sinks.particles.as_mut();
        self.particles.retain_mut(|effect| {
            let quad = letters
                .get(effect.letter())
                .map(|l| *l.quad())
                .unwrap_or_default();
            !effect.update(dt, &quad, &mut *sink)
        });
    }

    /// 合并全部字符网格并提交
    fn submit_mesh(&mut self) {
        self.mesh.clear();
        for letter in &self.letters {
            self.mesh.push_quad(letter.quad(), letter.uvs());
        }
        self.sinks.mesh.submit(&self.mesh);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::LetterAction;
    use crate::animation::LettersToAnimate;
    use crate::font::{GlyphInfo, Rect};
    use crate::loop_cycle::LoopCycle;
    use crate::progression::{FloatProgression, Vector3Progression};
    use glam::Vec3;
    use std::cell::Cell;
    use std::rc::Rc;

    /// 等宽字体：除 `#` 外都有字形
    fn mono(character: char) -> Option<GlyphInfo> {
        (character != '#').then_some(GlyphInfo {
            advance: 10.0,
            vert: Rect::new(0.0, 10.0, 10.0, -10.0),
            uv: Rect::new(0.0, 0.0, 0.1, 0.1),
            flipped: false,
        })
    }

    fn manager(text: &str, animations: Vec<LetterAnimation>) -> EffectManager {
        let mut manager =
            EffectManager::new(Box::new(mono), EffectSinks::default(), TextSettings::default())
                .with_seed(3);
        *manager.animations_mut() = animations;
        manager.set_text(text).unwrap();
        manager
    }

    fn move_action(duration: f32) -> LetterAction {
        LetterAction {
            end_pos: Vector3Progression::constant(Vec3::X).into(),
            duration: FloatProgression::constant(duration),
            ..Default::default()
        }
    }

    /// 字符当前位置相对默认姿态的偏移
    fn displacement(manager: &EffectManager, index: usize) -> Vec3 {
        let letter = &manager.letters()[index];
        let mut base = *letter.quad();
        letter.glyph().base_pose(letter.base_offset(), &mut base);
        letter.quad().vertices[0] - base.vertices[0]
    }

    #[test]
    fn test_set_text_builds_letters_and_mesh() {
        let manager = manager("ab c", vec![]);
        assert_eq!(manager.letters().len(), 3);
        assert_eq!(manager.counts().words, 2);
        assert_eq!(manager.mesh().quad_count(), 3);
        assert_eq!(manager.mesh().triangles.len(), 18);
    }

    #[test]
    fn test_set_text_reuses_letter_state() {
        let mut manager = manager("ab", vec![LetterAnimation::new(vec![move_action(1.0)])]);
        manager.play_animation(0.0);
        manager.update_animation(0.5).unwrap();

        manager.set_text("abc").unwrap();
        assert_eq!(manager.letters().len(), 3);
        // 新字符复制最后一个旧字符的状态
        assert_eq!(manager.letters()[2].state(), manager.letters()[1].state());
        assert!(manager.letters()[2].is_active());
    }

    #[test]
    fn test_play_and_finish() {
        let finished = Rc::new(Cell::new(0));
        let counter = finished.clone();
        let mut manager = manager("AB", vec![LetterAnimation::new(vec![move_action(1.0)])]);
        manager.play_animation_with_callback(0.0, move || counter.set(counter.get() + 1));
        assert!(manager.is_running());

        assert!(manager.update_animation(0.5).unwrap());
        assert!((displacement(&manager, 0).x - 0.5).abs() < 1e-4);

        assert!(!manager.update_animation(0.6).unwrap());
        assert!(!manager.is_running());
        assert_eq!(finished.get(), 1);
        assert!((displacement(&manager, 1).x - 1.0).abs() < 1e-4);
        assert_eq!(manager.animations()[0].state(), LetterState::Stopped);
    }

    #[test]
    fn test_play_without_animations_does_nothing() {
        let mut manager = manager("AB", vec![]);
        manager.play_animation(0.0);
        assert!(!manager.is_running());
    }

    #[test]
    fn test_begin_delay_counts_down() {
        let mut manager = manager("A", vec![LetterAnimation::new(vec![move_action(1.0)])]);
        manager.play_animation(0.5);
        assert!(!manager.is_running());
        assert!(manager.is_counting_down());

        assert!(manager.tick(0.3).unwrap());
        assert!(!manager.is_running());
        assert!(manager.tick(0.3).unwrap());
        assert!(manager.is_running());
        assert_eq!(manager.animation_timer(), 0.0);
    }

    #[test]
    fn test_pause_gates_tick() {
        let mut manager = manager("A", vec![LetterAnimation::new(vec![move_action(1.0)])]);
        manager.play_animation(0.0);
        manager.pause();
        assert!(manager.is_paused());
        manager.tick(0.5).unwrap();
        assert_eq!(manager.animation_timer(), 0.0);

        manager.resume();
        manager.tick(0.5).unwrap();
        assert_eq!(manager.animation_timer(), 0.5);
    }

    #[test]
    fn test_on_finish_disable() {
        let mut manager = manager("A", vec![LetterAnimation::new(vec![move_action(0.5)])])
            .with_on_finish(OnFinishAction::Disable);
        manager.play_animation(0.0);
        manager.tick(1.0).unwrap();
        assert!(!manager.is_enabled());
        assert!(!manager.tick(1.0).unwrap());
    }

    #[test]
    fn test_on_finish_reset() {
        let mut manager = manager("A", vec![LetterAnimation::new(vec![move_action(0.5)])])
            .with_on_finish(OnFinishAction::ResetAnimation);
        manager.play_animation(0.0);
        manager.update_animation(1.0).unwrap();
        assert!(displacement(&manager, 0).length() < 1e-5);
        assert!(!manager.letters()[0].is_active());
    }

    #[test]
    fn test_uncovered_letters_keep_base_pose() {
        let animation =
            LetterAnimation::new(vec![move_action(1.0)]).with_letters(LettersToAnimate::FirstLetter);
        let mut manager = manager("AB", vec![animation]);
        manager.play_animation(0.0);
        manager.update_animation(0.5).unwrap();
        assert!(displacement(&manager, 0).x > 0.0);
        assert_eq!(displacement(&manager, 1), Vec3::ZERO);
    }

    #[test]
    fn test_set_animation_state_and_end_state() {
        let mut manager = manager("AB", vec![LetterAnimation::new(vec![move_action(1.0)])]);
        manager.set_animation_state(0, 0.25, false).unwrap();
        assert!((displacement(&manager, 0).x - 0.25).abs() < 1e-4);

        let result = manager.set_animation_state(3, 0.0, false);
        assert!(matches!(
            result,
            Err(crate::error::TextFxError::Animation(
                AnimationError::InvalidActionIndex { index: 3, max: 1 }
            ))
        ));

        manager.set_end_state();
        assert!((displacement(&manager, 1).x - 1.0).abs() < 1e-4);
        assert!(!manager.is_running());
    }

    #[test]
    fn test_continue_releases_break() {
        let animation = LetterAnimation::new(vec![LetterAction::pause(0.0), move_action(1.0)]);
        let mut manager = manager("AB", vec![animation]);
        manager.play_animation(0.0);

        for _ in 0..5 {
            manager.update_animation(1.0).unwrap();
        }
        assert_eq!(manager.animations()[0].state(), LetterState::Waiting);
        assert!(manager.letters().iter().all(|l| l.action_index() == 0));

        manager.continue_animation(None).unwrap();
        assert_eq!(manager.letters()[0].action_index(), 1);
        assert!(manager.continue_animation(Some(4)).is_err());
    }

    #[test]
    fn test_continue_finishes_current_loop() {
        let animation =
            LetterAnimation::new(vec![move_action(1.0)]).with_loop(LoopCycle::new(0, 0, 0));
        let mut manager = manager("A", vec![animation]);
        manager.play_animation(0.0);
        for _ in 0..4 {
            assert!(manager.update_animation(1.0).unwrap());
        }

        manager.continue_animation(Some(0)).unwrap();
        assert!(!manager.update_animation(1.0).unwrap());
    }

    #[test]
    fn test_from_config_plays_on_start() {
        let config = EffectConfig {
            text: "Hi".to_string(),
            random_seed: Some(1),
            animations: vec![LetterAnimation::new(vec![move_action(1.0)])],
            ..Default::default()
        };
        let manager =
            EffectManager::from_config(&config, Box::new(mono), EffectSinks::default()).unwrap();
        assert!(manager.is_running());
        assert_eq!(manager.text(), "Hi");
    }

    #[test]
    fn test_from_config_validates() {
        let mut config = EffectConfig::default();
        config.settings.character_size = 0.0;
        assert!(EffectManager::from_config(&config, Box::new(mono), EffectSinks::default()).is_err());
    }
}
