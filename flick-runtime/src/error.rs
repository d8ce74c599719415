//! # Error 模块
//!
//! 定义 flick-runtime 中使用的错误类型。
//!
//! 行为脚本的错误（[`ScriptError`] / [`RuntimeError`]）不会越过沙箱边界，
//! 只会变成一条 `log` 事件；其余错误由宿主层处理。

use thiserror::Error;

/// 行为脚本解析错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScriptError {
    /// 无法识别的字符
    #[error("第 {line} 行：意外字符 '{found}'")]
    UnexpectedChar { line: usize, found: char },

    /// 字符串字面量未闭合
    #[error("第 {line} 行：字符串字面量未闭合")]
    UnterminatedString { line: usize },

    /// 无效的语法
    #[error("第 {line} 行：无效的语法 - {message}")]
    InvalidSyntax { line: usize, message: String },

    /// 不在能力表中的指令
    #[error("第 {line} 行：未知指令 '{command}'")]
    UnknownCommand { line: usize, command: String },

    /// 参数数量不符
    #[error("第 {line} 行：指令 '{command}' 需要 {expected} 个参数，实际 {actual} 个")]
    ArgumentCount {
        line: usize,
        command: String,
        expected: String,
        actual: usize,
    },
}

impl ScriptError {
    /// 错误所在行号（从 1 开始）
    pub fn line(&self) -> usize {
        match self {
            Self::UnexpectedChar { line, .. }
            | Self::UnterminatedString { line }
            | Self::InvalidSyntax { line, .. }
            | Self::UnknownCommand { line, .. }
            | Self::ArgumentCount { line, .. } => *line,
        }
    }
}

/// 行为脚本运行时错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuntimeError {
    /// 对象不存在
    #[error("场景 '{scene}' 中不存在对象 '{object}'")]
    UnknownObject { scene: String, object: String },

    /// 场景不存在
    #[error("场景 '{scene}' 不存在")]
    UnknownScene { scene: String },

    /// 绘图不存在
    #[error("绘图 '{drawing}' 不存在")]
    UnknownDrawing { drawing: String },

    /// 变量未定义
    #[error("变量 '{name}' 未定义")]
    UndefinedVariable { name: String },

    /// 类型不匹配
    #[error("类型不匹配: 期望 {expected}，实际 {actual} ({context})")]
    TypeMismatch {
        expected: &'static str,
        actual: String,
        context: String,
    },

    /// 参数值无效
    #[error("指令 '{command}' 的参数无效 - {message}")]
    InvalidArgument { command: String, message: String },
}

/// 位图字体加载错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FontError {
    /// 字符格尺寸为 0
    #[error("字符格尺寸无效: {width}x{height}")]
    InvalidCellSize { width: u32, height: u32 },

    /// 码位区间语法错误
    #[error("无效的码位区间 '{run}'")]
    InvalidRun { run: String },

    /// 码位不是合法字符
    #[error("无效的码位 {codepoint}")]
    InvalidCodepoint { codepoint: u32 },

    /// 图集放不下全部字符
    #[error("字体图集过小：需要 {required} 个字符格，实际只有 {available} 个")]
    AtlasTooSmall { required: usize, available: usize },
}

/// 播放器错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlayerError {
    /// 项目中没有任何场景
    #[error("项目中没有任何场景")]
    NoScenes,

    /// 场景不存在
    #[error("场景 '{scene}' 不存在")]
    UnknownScene { scene: String },
}

/// 播放器配置错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// 场景尺寸为 0
    #[error("场景尺寸无效: {width}x{height}")]
    InvalidSceneSize { width: u32, height: u32 },

    /// 对话框几何参数为 0
    #[error("{field} 必须大于 0")]
    ZeroDialogueSize { field: &'static str },

    /// 逐字间隔为负数或非有限值
    #[error("char_delay 无效: {value}")]
    InvalidCharDelay { value: f64 },

    /// 颜色无法解析
    #[error("无法解析颜色 {field}: '{value}'")]
    InvalidColor { field: &'static str, value: String },
}

/// flick-runtime 统一错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FlickError {
    /// 脚本解析错误
    #[error("脚本解析错误: {0}")]
    Script(#[from] ScriptError),

    /// 脚本运行时错误
    #[error("脚本运行时错误: {0}")]
    Runtime(#[from] RuntimeError),

    /// 字体错误
    #[error("字体错误: {0}")]
    Font(#[from] FontError),

    /// 播放器错误
    #[error("播放器错误: {0}")]
    Player(#[from] PlayerError),

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// Result 类型别名
pub type FlickResult<T> = Result<T, FlickError>;
