//! # Error 模块
//!
//! 定义 textfx-core 中使用的错误类型。

use thiserror::Error;

/// 字体描述解析错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FontError {
    /// XML 语法错误
    #[error("字体描述 XML 无效: {message}")]
    InvalidXml { message: String },

    /// 缺少 common 段（无法得到贴图尺寸）
    #[error("字体描述缺少 common 段")]
    MissingCommon,

    /// 缺少必需属性
    #[error("第 {line} 行：'{element}' 缺少属性 '{attribute}'")]
    MissingAttribute {
        line: usize,
        element: String,
        attribute: String,
    },

    /// 属性值无法解析
    #[error("第 {line} 行：属性 '{attribute}' 的值 '{value}' 无效")]
    InvalidAttribute {
        line: usize,
        attribute: String,
        value: String,
    },

    /// 描述文件为空或无法识别
    #[error("无法识别的字体描述格式")]
    UnknownFormat,

    /// IO 错误
    #[error("字体描述读取失败: {message}")]
    Io { message: String },
}

/// 动画运行错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnimationError {
    /// 无效的状态操作（例如在 prepare 之前读取进度值）
    #[error("无效的状态操作: {message}")]
    InvalidState { message: String },

    /// 动作索引越界
    #[error("无效的动作索引 {index}，有效范围是 0..{max}")]
    InvalidActionIndex { index: usize, max: usize },

    /// 布局在重试上限内仍无法得到一致结果
    #[error("文本布局在 {attempts} 次尝试后仍不一致")]
    LayoutInconsistent { attempts: usize },
}

/// 配置错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// 序列化或反序列化失败
    #[error("配置序列化失败: {0}")]
    Serialization(String),

    /// IO 错误
    #[error("配置 IO 错误: {0}")]
    Io(String),

    /// 验证失败
    #[error("配置验证失败: {0}")]
    Validation(String),
}

/// textfx-core 统一错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TextFxError {
    /// 字体错误
    #[error("字体错误: {0}")]
    Font(#[from] FontError),

    /// 动画错误
    #[error("动画错误: {0}")]
    Animation(#[from] AnimationError),

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// Result 类型别名
pub type TextFxResult<T> = Result<T, TextFxError>;

impl AnimationError {
    /// 构造 InvalidState 错误
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion() {
        let err: TextFxError = AnimationError::invalid_state("未解析").into();
        assert!(matches!(
            err,
            TextFxError::Animation(AnimationError::InvalidState { .. })
        ));
        assert_eq!(err.to_string(), "动画错误: 无效的状态操作: 未解析");
    }

    #[test]
    fn test_font_error_display() {
        let err = FontError::MissingAttribute {
            line: 3,
            element: "char".to_string(),
            attribute: "xadvance".to_string(),
        };
        assert_eq!(err.to_string(), "第 3 行：'char' 缺少属性 'xadvance'");
    }
}
