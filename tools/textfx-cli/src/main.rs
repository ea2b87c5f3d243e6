//! # TextFx CLI
//!
//! 无界面文本动画模拟器：加载效果配置与位图字体，按固定步长运行动画，
//! 以 JSON 输出每一步的状态和最终网格。
//!
//! ## 用法
//!
//! ```bash
//! cargo run -p textfx-cli -- effect.json --font font.fnt
//! cargo run -p textfx-cli -- effect.json --steps 240 --dt 0.0166 --trace
//! cargo run -p textfx-cli -- effect.json --continue-at 60 -vv
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::{Level, info};

use textfx_core::{
    AudioSink, BitmapFont, EffectConfig, EffectManager, EffectSinks, GlyphInfo, GlyphProvider,
    LetterState, NullSinks, ParticleHandle, ParticlePlacement, ParticleSink, Rect, TextMesh,
};

#[derive(Parser)]
#[command(name = "textfx")]
#[command(about = "文本动画模拟器 - 按固定步长运行效果配置并输出网格")]
#[command(version)]
struct Cli {
    /// 效果配置（JSON）
    config: PathBuf,

    /// BMFont 字体描述；未指定时使用等宽占位字形
    #[arg(short, long)]
    font: Option<PathBuf>,

    /// 最多模拟的步数
    #[arg(short, long, default_value = "600")]
    steps: usize,

    /// 每步时长（秒）
    #[arg(long, default_value = "0.0166667")]
    dt: f32,

    /// 在第 n 步调用 continue（释放暂停点）
    #[arg(long)]
    continue_at: Vec<usize>,

    /// 输出每一步的状态
    #[arg(long)]
    trace: bool,

    /// 日志详细程度（-v 信息，-vv 调试，-vvv 追踪）
    #[arg(short, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// 等宽占位字形：每个字符都是 1 x 1 的方块
fn placeholder_glyph(_character: char) -> Option<GlyphInfo> {
    Some(GlyphInfo {
        advance: 10.0,
        vert: Rect::new(0.0, 10.0, 10.0, -10.0),
        uv: Rect::new(0.0, 0.0, 1.0, 1.0),
        flipped: false,
    })
}

/// 把音效与粒子触发写入日志
#[derive(Default)]
struct LoggingSinks {
    next_handle: u64,
}

impl AudioSink for LoggingSinks {
    fn play_clip(&mut self, clip: &str, delay: f32, offset: f32, volume: f32, pitch: f32) {
        info!(clip, delay, offset, volume, pitch, "播放音效");
    }
}

impl ParticleSink for LoggingSinks {
    fn spawn(&mut self, emitter: &str, placement: ParticlePlacement) -> ParticleHandle {
        self.next_handle += 1;
        info!(emitter, handle = self.next_handle, position = ?placement.position, "生成粒子");
        ParticleHandle(self.next_handle)
    }

    fn set_placement(&mut self, _handle: ParticleHandle, _placement: ParticlePlacement) {}

    fn set_emitting(&mut self, handle: ParticleHandle, emitting: bool) {
        tracing::debug!(handle = handle.0, emitting, "粒子发射开关");
    }

    fn emit_burst(&mut self, handle: ParticleHandle) {
        info!(handle = handle.0, "粒子爆发");
    }

    fn particle_count(&self, _handle: ParticleHandle) -> usize {
        0
    }

    fn stop(&mut self, handle: ParticleHandle, clear: bool) {
        tracing::debug!(handle = handle.0, clear, "停止粒子");
    }
}

#[derive(Serialize)]
struct LetterReport {
    character: char,
    action_index: usize,
    action_progress: f32,
    active: bool,
    waiting: bool,
}

#[derive(Serialize)]
struct StepReport {
    step: usize,
    timer: f32,
    running: bool,
    lowest_action_progress: usize,
    animations: Vec<&'static str>,
    letters: Vec<LetterReport>,
}

#[derive(Serialize)]
struct MeshReport {
    vertices: Vec<[f32; 3]>,
    colors: Vec<[f32; 4]>,
    uvs: Vec<[f32; 2]>,
    triangles: Vec<u32>,
}

impl From<&TextMesh> for MeshReport {
    fn from(mesh: &TextMesh) -> Self {
        Self {
            vertices: mesh.vertices.iter().map(|v| v.to_array()).collect(),
            colors: mesh.colors.iter().map(|c| [c.r, c.g, c.b, c.a]).collect(),
            uvs: mesh.uvs.iter().map(|uv| uv.to_array()).collect(),
            triangles: mesh.triangles.clone(),
        }
    }
}

#[derive(Serialize)]
struct FinalReport {
    text: String,
    steps: usize,
    finished: bool,
    enabled: bool,
    mesh: MeshReport,
}

fn state_name(state: LetterState) -> &'static str {
    match state {
        LetterState::Stopped => "stopped",
        LetterState::Playing => "playing",
        LetterState::Waiting => "waiting",
    }
}

fn step_report(step: usize, effect: &EffectManager) -> StepReport {
    StepReport {
        step,
        timer: effect.animation_timer(),
        running: effect.is_running(),
        lowest_action_progress: effect.lowest_action_progress(),
        animations: effect
            .animations()
            .iter()
            .map(|a| state_name(a.state()))
            .collect(),
        letters: effect
            .letters()
            .iter()
            .map(|l| LetterReport {
                character: l.character(),
                action_index: l.action_index(),
                action_progress: l.state().action_progress,
                active: l.is_active(),
                waiting: l.is_waiting(),
            })
            .collect(),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = EffectConfig::load(&cli.config)
        .with_context(|| format!("无法加载效果配置: {}", cli.config.display()))?;

    let glyphs: Box<dyn GlyphProvider> = match &cli.font {
        Some(path) => Box::new(
            BitmapFont::load(path)
                .with_context(|| format!("无法加载字体: {}", path.display()))?,
        ),
        None => Box::new(placeholder_glyph),
    };

    let sinks = EffectSinks {
        audio: Box::new(LoggingSinks::default()),
        particles: Box::new(LoggingSinks::default()),
        mesh: Box::new(NullSinks),
    };

    let mut effect =
        EffectManager::from_config(&config, glyphs, sinks).context("无法创建文本效果")?;
    if !config.begin_on_start {
        effect.play_animation(config.begin_delay);
    }
    info!(
        text = %config.text,
        letters = effect.letters().len(),
        animations = effect.animations().len(),
        "开始模拟"
    );

    let mut steps = 0;
    let mut finished = false;
    while steps < cli.steps {
        if cli.continue_at.contains(&steps) {
            effect.continue_animation(None)?;
        }

        let running = effect.tick(cli.dt)?;
        steps += 1;

        if cli.trace {
            println!("{}", serde_json::to_string(&step_report(steps, &effect))?);
        }
        if !running {
            finished = true;
            break;
        }
    }
    info!(steps, finished, "模拟结束");

    let report = FinalReport {
        text: config.text.clone(),
        steps,
        finished,
        enabled: effect.is_enabled(),
        mesh: MeshReport::from(effect.mesh()),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
