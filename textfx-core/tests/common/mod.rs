//! 集成测试共用的字体与记录接口

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec3;
use textfx_core::{
    AudioSink, EffectManager, EffectSinks, FloatProgression, GlyphInfo, LetterAction,
    LetterAnimation, MeshSink, ParticleHandle, ParticlePlacement, ParticleSink, Rect,
    TextMesh, TextSettings, Vector3Progression,
};

/// 等宽测试字体：`#` 不在字体中
pub fn mono(character: char) -> Option<GlyphInfo> {
    (character != '#').then_some(GlyphInfo {
        advance: 10.0,
        vert: Rect::new(0.0, 10.0, 10.0, -10.0),
        uv: Rect::new(0.0, 0.0, 0.1, 0.1),
        flipped: false,
    })
}

/// 记录下来的外部调用
#[derive(Debug, Default)]
pub struct Recording {
    pub clips: Vec<String>,
    pub spawned: Vec<String>,
    pub bursts: usize,
    pub submits: usize,
    pub last_mesh: TextMesh,
}

#[derive(Clone, Default)]
pub struct RecordingSinks(pub Rc<RefCell<Recording>>);

impl AudioSink for RecordingSinks {
    fn play_clip(&mut self, clip: &str, _delay: f32, _offset: f32, _volume: f32, _pitch: f32) {
        self.0.borrow_mut().clips.push(clip.to_string());
    }
}

impl ParticleSink for RecordingSinks {
    fn spawn(&mut self, emitter: &str, _placement: ParticlePlacement) -> ParticleHandle {
        let mut recording = self.0.borrow_mut();
        recording.spawned.push(emitter.to_string());
        ParticleHandle(recording.spawned.len() as u64)
    }

    fn set_placement(&mut self, _handle: ParticleHandle, _placement: ParticlePlacement) {}

    fn set_emitting(&mut self, _handle: ParticleHandle, _emitting: bool) {}

    fn emit_burst(&mut self, _handle: ParticleHandle) {
        self.0.borrow_mut().bursts += 1;
    }

    fn particle_count(&self, _handle: ParticleHandle) -> usize {
        0
    }

    fn stop(&mut self, _handle: ParticleHandle, _clear: bool) {}
}

impl MeshSink for RecordingSinks {
    fn submit(&mut self, mesh: &TextMesh) {
        let mut recording = self.0.borrow_mut();
        recording.submits += 1;
        recording.last_mesh = mesh.clone();
    }
}

impl RecordingSinks {
    pub fn sinks(&self) -> EffectSinks {
        EffectSinks {
            audio: Box::new(self.clone()),
            particles: Box::new(self.clone()),
            mesh: Box::new(self.clone()),
        }
    }
}

/// 创建管理器并设置文本（固定随机种子）
pub fn effect(text: &str, animations: Vec<LetterAnimation>) -> (EffectManager, RecordingSinks) {
    let recording = RecordingSinks::default();
    let mut effect =
        EffectManager::new(Box::new(mono), recording.sinks(), TextSettings::default()).with_seed(11);
    *effect.animations_mut() = animations;
    effect.set_text(text).expect("排版失败");
    (effect, recording)
}

/// 从原点移动到 `to` 的动作
pub fn move_to(to: Vec3, duration: f32) -> LetterAction {
    LetterAction {
        end_pos: Vector3Progression::constant(to).into(),
        duration: FloatProgression::constant(duration),
        ..Default::default()
    }
}

/// 字符相对默认姿态的位移
pub fn displacement(effect: &EffectManager, index: usize) -> Vec3 {
    let letter = &effect.letters()[index];
    let mut base = *letter.quad();
    letter.glyph().base_pose(letter.base_offset(), &mut base);
    letter.quad().vertices[0] - base.vertices[0]
}
