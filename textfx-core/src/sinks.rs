//! # Sinks 模块
//!
//! 外部协作者接口：网格提交、音效播放与粒子发射。
//!
//! 核心不直接调用宿主引擎。字符在推进过程中只产生 [`TriggerEvent`]，
//! 由 [`crate::effect::EffectManager`] 在一次 tick 结束后统一分发到这里的 trait。
//! 宿主通过 [`EffectSinks`] 在构造时注入实现；不关心的通道保留 [`NullSinks`] 即可。

use glam::{Quat, Vec2, Vec3};

use crate::color::Color;
use crate::letter::LetterQuad;

/// 音效播放
pub trait AudioSink {
    /// 播放一次音效
    ///
    /// # 参数
    /// - `clip`: 音频资源标识
    /// - `delay`: 延迟播放（秒）
    /// - `offset`: 从音频的哪个位置开始（秒）
    fn play_clip(&mut self, clip: &str, delay: f32, offset: f32, volume: f32, pitch: f32);
}

/// 粒子实例句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParticleHandle(pub u64);

/// 粒子发射器的摆放
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticlePlacement {
    pub position: Vec3,
    pub rotation: Quat,
}

/// 粒子发射
///
/// 核心负责每帧推进已生成的实例（延迟、持续时间、跟随网格），
/// 宿主只需提供发射器的生成与控制。
pub trait ParticleSink {
    /// 生成一个处于静止状态的发射器实例
    fn spawn(&mut self, emitter: &str, placement: ParticlePlacement) -> ParticleHandle;

    /// 更新摆放
    fn set_placement(&mut self, handle: ParticleHandle, placement: ParticlePlacement);

    /// 开启或关闭持续发射
    fn set_emitting(&mut self, handle: ParticleHandle, emitting: bool);

    /// 一次性爆发
    fn emit_burst(&mut self, handle: ParticleHandle);

    /// 当前仍存活的粒子数
    fn particle_count(&self, handle: ParticleHandle) -> usize;

    /// 停止发射；`clear` 为 true 时同时清除已有粒子
    fn stop(&mut self, handle: ParticleHandle, clear: bool);
}

/// 网格提交
pub trait MeshSink {
    /// 每次更新后提交合并后的文本网格
    fn submit(&mut self, mesh: &TextMesh);
}

/// 不做任何事的默认实现
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSinks;

impl AudioSink for NullSinks {
    fn play_clip(&mut self, _clip: &str, _delay: f32, _offset: f32, _volume: f32, _pitch: f32) {}
}

impl ParticleSink for NullSinks {
    fn spawn(&mut self, _emitter: &str, _placement: ParticlePlacement) -> ParticleHandle {
        ParticleHandle(0)
    }

    fn set_placement(&mut self, _handle: ParticleHandle, _placement: ParticlePlacement) {}

    fn set_emitting(&mut self, _handle: ParticleHandle, _emitting: bool) {}

    fn emit_burst(&mut self, _handle: ParticleHandle) {}

    fn particle_count(&self, _handle: ParticleHandle) -> usize {
        0
    }

    fn stop(&mut self, _handle: ParticleHandle, _clear: bool) {}
}

impl MeshSink for NullSinks {
    fn submit(&mut self, _mesh: &TextMesh) {}
}

/// 注入到管理器中的全部协作者
pub struct EffectSinks {
    pub audio: Box<dyn AudioSink>,
    pub particles: Box<dyn ParticleSink>,
    pub mesh: Box<dyn MeshSink>,
}

impl Default for EffectSinks {
    fn default() -> Self {
        Self {
            audio: Box::new(NullSinks),
            particles: Box::new(NullSinks),
            mesh: Box::new(NullSinks),
        }
    }
}

impl std::fmt::Debug for EffectSinks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectSinks").finish_non_exhaustive()
    }
}

/// 音效触发
#[derive(Debug, Clone, PartialEq)]
pub struct AudioCue {
    pub letter: usize,
    pub clip: String,
    pub delay: f32,
    pub offset: f32,
    pub volume: f32,
    pub pitch: f32,
}

/// 粒子触发
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleCue {
    pub letter: usize,
    pub emitter: String,
    pub delay: f32,
    pub duration: f32,
    pub offset: Vec3,
    pub follow_mesh: bool,
    /// 触发时刻字符的网格
    pub quad: LetterQuad,
}

/// 字符在推进中产生的触发事件
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerEvent {
    Audio(AudioCue),
    Particle(ParticleCue),
}

/// 合并后的文本网格
///
/// 每个字符占 4 个顶点、4 个颜色、4 个纹理坐标与 6 个三角形索引。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextMesh {
    pub vertices: Vec<Vec3>,
    pub colors: Vec<Color>,
    pub uvs: Vec<Vec2>,
    pub triangles: Vec<u32>,
}

impl TextMesh {
    /// 单个字符的三角形索引
    pub const QUAD_TRIANGLES: [u32; 6] = [2, 1, 0, 3, 2, 0];

    pub fn with_capacity(letters: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(letters * 4),
            colors: Vec::with_capacity(letters * 4),
            uvs: Vec::with_capacity(letters * 4),
            triangles: Vec::with_capacity(letters * 6),
        }
    }

    /// 追加一个字符
    pub fn push_quad(&mut self, quad: &LetterQuad, uvs: &[Vec2; 4]) {
        let base = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&quad.vertices);
        self.colors.extend_from_slice(&quad.colors);
        self.uvs.extend_from_slice(uvs);
        self.triangles
            .extend(Self::QUAD_TRIANGLES.iter().map(|i| base + i));
    }

    /// 字符数
    pub fn quad_count(&self) -> usize {
        self.vertices.len() / 4
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
        self.colors.clear();
        self.uvs.clear();
        self.triangles.clear();
    }
}
