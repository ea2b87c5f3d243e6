//! # Timer 模块
//!
//! 时间源与倒计时。
//!
//! 宿主每帧调用一次，[`FrameClock`] 把帧间隔换算成模拟步长：
//! 游戏时间直接使用宿主给出的帧间隔，真实时间读取挂钟并限制单步上限，
//! 避免卡顿后出现大跨度跳变。

use std::time::Instant;

use serde::{Deserialize, Serialize};

/// 真实时间模式下单步的上限（秒）
pub const MAX_REAL_TIME_STEP: f32 = 0.1;

/// 时间源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AnimationTime {
    /// 宿主帧间隔（受游戏暂停 / 时间缩放影响）
    #[default]
    GameTime,
    /// 挂钟时间
    RealTime,
}

/// 帧时钟
#[derive(Debug, Clone)]
pub struct FrameClock {
    time_type: AnimationTime,
    last_instant: Option<Instant>,
}

impl FrameClock {
    pub fn new(time_type: AnimationTime) -> Self {
        Self {
            time_type,
            last_instant: None,
        }
    }

    pub fn time_type(&self) -> AnimationTime {
        self.time_type
    }

    /// 重新记录挂钟起点（开始播放或恢复时调用）
    pub fn restart(&mut self) {
        self.restart_at(Instant::now());
    }

    pub fn restart_at(&mut self, now: Instant) {
        self.last_instant = Some(now);
    }

    /// 本帧的模拟步长
    pub fn delta(&mut self, frame_dt: f32) -> f32 {
        self.delta_at(frame_dt, Instant::now())
    }

    /// 以给定时刻计算本帧的模拟步长
    ///
    /// # 参数
    /// - `frame_dt`: 宿主给出的帧间隔，仅游戏时间模式使用
    /// - `now`: 当前挂钟时刻，仅真实时间模式使用
    pub fn delta_at(&mut self, frame_dt: f32, now: Instant) -> f32 {
        match self.time_type {
            AnimationTime::GameTime => frame_dt.max(0.0),
            AnimationTime::RealTime => {
                let elapsed = self
                    .last_instant
                    .map_or(0.0, |last| now.saturating_duration_since(last).as_secs_f32());
                self.last_instant = Some(now);
                elapsed.min(MAX_REAL_TIME_STEP)
            }
        }
    }
}

/// 倒计时
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Countdown {
    remaining: f32,
}

impl Countdown {
    pub fn new(seconds: f32) -> Self {
        Self {
            remaining: seconds.max(0.0),
        }
    }

    pub fn remaining(&self) -> f32 {
        self.remaining
    }

    pub fn is_finished(&self) -> bool {
        self.remaining <= 0.0
    }

    /// 推进倒计时，返回是否已结束
    pub fn update(&mut self, dt: f32) -> bool {
        self.remaining -= dt;
        self.is_finished()
    }
}
