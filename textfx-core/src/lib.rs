//! # TextFx Core
//!
//! 逐字文本动画的核心库。
//!
//! ## 架构概述
//!
//! `textfx-core` 不依赖任何渲染或音频引擎。宿主注入字形度量与三个输出接口，
//! 每帧调用一次 [`EffectManager::tick`]：
//!
//! ```text
//! Host                              Core
//!   │                                 │
//!   │──── GlyphProvider / Sinks ────►│ EffectManager::new
//!   │──── tick(frame_dt) ───────────►│
//!   │                                 │ 推进每个字符的动作序列
//!   │◄─── MeshSink::submit ──────────│
//!   │◄─── AudioSink / ParticleSink ──│
//! ```
//!
//! ## 使用示例
//!
//! ```ignore
//! use textfx_core::{BitmapFont, EffectConfig, EffectManager, EffectSinks};
//!
//! let font = BitmapFont::load("font.fnt")?;
//! let config = EffectConfig::load("effect.json")?;
//! let mut effect = EffectManager::from_config(&config, Box::new(font), EffectSinks::default())?;
//!
//! while effect.tick(1.0 / 60.0)? {
//!     // 宿主绘制 effect.mesh()
//! }
//! ```
//!
//! ## 模块结构
//!
//! - [`easing`]：缓动函数
//! - [`progression`]：按字 / 词 / 行解析的数值进度
//! - [`action`]：单个动作的数据与解析
//! - [`loop_cycle`]：循环区间
//! - [`animation`]：动作序列与作用范围
//! - [`letter`]：字符状态机与网格计算
//! - [`font`]、[`layout`]：字形度量与排版
//! - [`effect`]：管理器
//! - [`config`]、[`error`]：配置与错误类型

pub mod action;
pub mod animation;
pub mod color;
pub mod config;
pub mod easing;
pub mod effect;
pub mod error;
pub mod font;
pub mod layout;
pub mod letter;
pub mod loop_cycle;
pub mod particles;
pub mod progression;
pub mod sinks;
pub mod timer;

// 重导出核心类型
pub use action::{ActionType, AudioTrigger, AxisEasing, LetterAction, ParticleTrigger};
pub use animation::{LetterAnimation, LettersToAnimate};
pub use color::{Color, VertexColor};
pub use config::{EffectConfig, OnFinishAction};
pub use easing::EasingEquation;
pub use effect::{EffectManager, MAX_LAYOUT_ATTEMPTS};
pub use error::{AnimationError, ConfigError, FontError, TextFxError, TextFxResult};
pub use font::{BitmapFont, GlyphInfo, GlyphProvider, Rect};
pub use layout::{TextAlignment, TextAnchor, TextDisplayAxis, TextSettings};
pub use letter::{LetterQuad, LetterSetup, LetterState};
pub use loop_cycle::{LoopCycle, LoopType};
pub use progression::{
    AnimatePer, ColorProgression, FloatProgression, PositionProgression, Vector3Progression,
    VertexColorProgression,
};
pub use sinks::{
    AudioSink, EffectSinks, MeshSink, NullSinks, ParticleHandle, ParticlePlacement, ParticleSink,
    TextMesh,
};
pub use timer::AnimationTime;
