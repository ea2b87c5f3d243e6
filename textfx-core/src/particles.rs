//! # Particles 模块
//!
//! 正在运行的粒子效果实例。宿主只负责生成和控制发射器，
//! 延迟、持续发射时长与跟随字符网格都在这里按帧推进。

use glam::Vec3;

use crate::letter::LetterQuad;
use crate::sinks::{ParticleCue, ParticleHandle, ParticleSink};

/// 粒子效果实例
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleEffectInstance {
    handle: ParticleHandle,
    /// 所附着的字符
    letter: usize,
    delay: f32,
    duration: f32,
    offset: Vec3,
    follow_mesh: bool,
    active: bool,
}

impl ParticleEffectInstance {
    /// 生成发射器并摆放到触发时刻的字符网格上
    pub fn spawn(cue: &ParticleCue, sink: &mut dyn ParticleSink) -> Self {
        let handle = sink.spawn(&cue.emitter, cue.quad.placement(cue.offset));
        sink.set_emitting(handle, false);
        Self {
            handle,
            letter: cue.letter,
            delay: cue.delay,
            duration: cue.duration,
            offset: cue.offset,
            follow_mesh: cue.follow_mesh,
            active: false,
        }
    }

    pub fn handle(&self) -> ParticleHandle {
        self.handle
    }

    pub fn letter(&self) -> usize {
        self.letter
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// 推进一帧
    ///
    /// # 参数
    /// - `quad`: 所附着字符当前的网格（跟随网格时使用）
    ///
    /// # 返回
    /// 效果已完全结束（不再发射且没有存活粒子）
    pub fn update(&mut self, dt: f32, quad: &LetterQuad, sink: &mut dyn ParticleSink) -> bool {
        if !self.active {
            if self.delay > 0.0 {
                self.delay = (self.delay - dt).max(0.0);
                return false;
            }

            self.active = true;
            if self.duration > 0.0 {
                sink.set_emitting(self.handle, true);
            } else {
                sink.emit_burst(self.handle);
            }
        }

        if self.follow_mesh {
            sink.set_placement(self.handle, quad.placement(self.offset));
        }

        self.duration -= dt;
        if self.duration > 0.0 {
            return false;
        }

        sink.set_emitting(self.handle, false);
        sink.particle_count(self.handle) == 0
    }

    /// 停止发射；`force` 为 true 时同时清除已有粒子
    pub fn stop(&mut self, force: bool, sink: &mut dyn ParticleSink) {
        sink.stop(self.handle, force);
        self.duration = 0.0;
        self.delay = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::ParticlePlacement;

    /// 记录调用的粒子接口
    #[derive(Default)]
    struct RecordingParticles {
        calls: Vec<String>,
        alive: usize,
    }

    impl ParticleSink for RecordingParticles {
        fn spawn(&mut self, emitter: &str, _placement: ParticlePlacement) -> ParticleHandle {
            self.calls.push(format!("spawn {emitter}"));
            ParticleHandle(1)
        }

        fn set_placement(&mut self, _handle: ParticleHandle, _placement: ParticlePlacement) {
            self.calls.push("place".to_string());
        }

        fn set_emitting(&mut self, _handle: ParticleHandle, emitting: bool) {
            self.calls.push(format!("emitting {emitting}"));
        }

        fn emit_burst(&mut self, _handle: ParticleHandle) {
            self.calls.push("burst".to_string());
        }

        fn particle_count(&self, _handle: ParticleHandle) -> usize {
            self.alive
        }

        fn stop(&mut self, _handle: ParticleHandle, clear: bool) {
            self.calls.push(format!("stop {clear}"));
        }
    }

    fn cue(delay: f32, duration: f32, follow_mesh: bool) -> ParticleCue {
        ParticleCue {
            letter: 2,
            emitter: "spark".to_string(),
            delay,
            duration,
            offset: Vec3::ZERO,
            follow_mesh,
            quad: LetterQuad::default(),
        }
    }

    #[test]
    fn test_burst_after_delay() {
        let mut sink = RecordingParticles::default();
        let mut effect = ParticleEffectInstance::spawn(&cue(0.2, 0.0, false), &mut sink);
        assert_eq!(effect.letter(), 2);

        assert!(!effect.update(0.1, &LetterQuad::default(), &mut sink));
        assert!(!effect.is_active());
        assert!(!effect.update(0.15, &LetterQuad::default(), &mut sink));
        // 延迟结束后的下一帧才激活
        assert!(effect.update(0.1, &LetterQuad::default(), &mut sink));
        assert!(sink.calls.contains(&"burst".to_string()));
    }

    #[test]
    fn test_continuous_emission_waits_for_particles() {
        let mut sink = RecordingParticles {
            alive: 3,
            ..Default::default()
        };
        let mut effect = ParticleEffectInstance::spawn(&cue(0.0, 0.5, true), &mut sink);
        assert!(!effect.update(0.3, &LetterQuad::default(), &mut sink));
        assert_eq!(sink.calls[2], "emitting true");
        assert_eq!(sink.calls[3], "place");

        assert!(!effect.update(0.3, &LetterQuad::default(), &mut sink));
        assert_eq!(sink.calls.last().map(String::as_str), Some("emitting false"));

        sink.alive = 0;
        assert!(effect.update(0.1, &LetterQuad::default(), &mut sink));
    }

    #[test]
    fn test_stop_force_clears() {
        let mut sink = RecordingParticles::default();
        let mut effect = ParticleEffectInstance::spawn(&cue(1.0, 1.0, false), &mut sink);
        effect.stop(true, &mut sink);
        assert_eq!(sink.calls.last().map(String::as_str), Some("stop true"));
    }
}
