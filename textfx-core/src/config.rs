//! # Config 模块
//!
//! 效果配置：文本、排版参数、时间源、播放选项与全部动画数据。
//!
//! 配置以 JSON 保存，缺省字段使用默认值。越界的循环区间不算验证错误，
//! 会在解析动画数据时被移除。

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::animation::LetterAnimation;
use crate::error::{ConfigError, TextFxResult};
use crate::layout::TextSettings;
use crate::progression::AnimatePer;
use crate::timer::AnimationTime;

/// 动画播放结束后的处理
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OnFinishAction {
    /// 保持结束姿态
    #[default]
    None,
    /// 回到初始姿态
    ResetAnimation,
    /// 禁用效果（宿主读取 `enabled` 后隐藏）
    Disable,
}

/// 效果配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectConfig {
    /// 显示的文本
    #[serde(default)]
    pub text: String,

    /// 排版参数
    #[serde(default)]
    pub settings: TextSettings,

    /// 进度默认的解析粒度
    #[serde(default)]
    pub animate_per: AnimatePer,

    /// 时间源
    #[serde(default)]
    pub time_type: AnimationTime,

    /// 创建后立即播放
    #[serde(default = "default_begin_on_start")]
    pub begin_on_start: bool,

    /// 开始播放前的延迟（秒）
    #[serde(default)]
    pub begin_delay: f32,

    /// 播放结束后的处理
    #[serde(default)]
    pub on_finish: OnFinishAction,

    /// 随机种子；未设置时使用系统熵
    #[serde(default)]
    pub random_seed: Option<u64>,

    /// 动画列表
    #[serde(default)]
    pub animations: Vec<LetterAnimation>,
}

fn default_begin_on_start() -> bool {
    true
}

impl Default for EffectConfig {
    fn default() -> Self {
        Self {
            text: String::new(),
            settings: TextSettings::default(),
            animate_per: AnimatePer::default(),
            time_type: AnimationTime::default(),
            begin_on_start: default_begin_on_start(),
            begin_delay: 0.0,
            on_finish: OnFinishAction::default(),
            random_seed: None,
            animations: Vec::new(),
        }
    }
}

impl EffectConfig {
    /// 从文件加载配置
    pub fn load(path: impl AsRef<Path>) -> TextFxResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&content)
    }

    /// 从 JSON 字符串解析配置
    pub fn from_json_str(json: &str) -> TextFxResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Serialization(e.to_string()))?;
        Ok(config)
    }

    /// 保存配置到文件
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Serialization(e.to_string()))?;

        fs::write(path, json).map_err(|e| ConfigError::Io(e.to_string()))?;

        Ok(())
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        let settings = &self.settings;
        if settings.character_size <= 0.0 {
            return Err(ConfigError::Validation(format!(
                "字号必须大于 0，当前为 {}",
                settings.character_size
            )));
        }

        if settings.line_height <= 0.0 {
            return Err(ConfigError::Validation(format!(
                "行高必须大于 0，当前为 {}",
                settings.line_height
            )));
        }

        if settings.max_width < 0.0 {
            return Err(ConfigError::Validation(format!(
                "最大行宽不能为负数，当前为 {}",
                settings.max_width
            )));
        }

        if self.begin_delay < 0.0 {
            return Err(ConfigError::Validation(
                "开始延迟不能为负数".to_string(),
            ));
        }

        for (anim_idx, animation) in self.animations.iter().enumerate() {
            for cycle in &animation.loop_cycles {
                if cycle.start_action > cycle.end_action {
                    return Err(ConfigError::Validation(format!(
                        "动画 {anim_idx} 的循环起点 {} 大于终点 {}",
                        cycle.start_action, cycle.end_action
                    )));
                }
            }
        }

        Ok(())
    }
}
