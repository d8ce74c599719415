//! # 样式模块
//!
//! 样式表按值快照到每个字形上；播放时每一帧根据快照重新计算瞬时效果。
//!
//! ## 标记语法
//!
//! | 标记 | 效果 |
//! |------|------|
//! | `{name}` / `{+name}` | 打开布尔样式 |
//! | `{-name}` | 关闭样式 |
//! | `{key=value}` | 设置键值样式 |
//!
//! ## 保留键
//!
//! - `clr`：填充颜色
//! - `shk` / `shake`：随机抖动
//! - `wvy` / `wave`：正弦波动
//! - `delay`：显示该字形前的等待秒数
//! - `r`：强制立即显示

use image::Rgba;
use rand::Rng;

use super::page::{Glyph, Offset};

/// 样式值
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StyleValue {
    /// 布尔开关
    Flag,
    /// 键值
    Value(String),
}

/// 有序样式表（保持插入顺序）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleMap {
    entries: Vec<(String, StyleValue)>,
}

impl StyleMap {
    /// 创建空样式表
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置样式，已存在的键保持原有位置
    pub fn set(&mut self, name: impl Into<String>, value: StyleValue) {
        let name = name.into();
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((name, value)),
        }
    }

    /// 移除样式
    pub fn remove(&mut self, name: &str) -> Option<StyleValue> {
        let index = self.entries.iter().position(|(key, _)| key == name)?;
        Some(self.entries.remove(index).1)
    }

    /// 获取样式
    pub fn get(&self, name: &str) -> Option<&StyleValue> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// 是否设置了样式（任意值）
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// 获取键值样式的值
    pub fn value(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            StyleValue::Value(value) => Some(value),
            StyleValue::Flag => None,
        }
    }

    /// 遍历样式
    pub fn iter(&self) -> impl Iterator<Item = (&str, &StyleValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// 样式数量
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `delay` 样式（秒），无法解析或为负数时返回 None
    pub fn delay(&self) -> Option<f64> {
        self.value("delay")
            .and_then(|value| value.trim().parse::<f64>().ok())
            .filter(|delay| delay.is_finite() && *delay >= 0.0)
    }

    fn has_any(&self, names: &[&str]) -> bool {
        names.iter().any(|name| self.contains(name))
    }
}

/// 将一条样式标记作用到样式表
///
/// 未知键按原样保存，没有视觉效果。
pub fn apply_style(styles: &mut StyleMap, style: &str) {
    let style = style.trim();
    if let Some(name) = style.strip_prefix('+') {
        styles.set(name.trim(), StyleValue::Flag);
    } else if let Some(name) = style.strip_prefix('-') {
        styles.remove(name.trim());
    } else if let Some((key, value)) = style.split_once('=') {
        styles.set(key.trim(), StyleValue::Value(value.trim().to_string()));
    } else if !style.is_empty() {
        styles.set(style, StyleValue::Flag);
    }
}

/// 解析颜色：`#rgb`、`#rrggbb`、`#rrggbbaa` 或少量 CSS 颜色名
pub fn parse_color(value: &str) -> Option<Rgba<u8>> {
    let value = value.trim();
    if let Some(hex) = value.strip_prefix('#') {
        return parse_hex(hex);
    }

    let rgb = match value.to_ascii_lowercase().as_str() {
        "white" => [255, 255, 255],
        "black" => [0, 0, 0],
        "red" => [255, 0, 0],
        "green" => [0, 128, 0],
        "lime" => [0, 255, 0],
        "blue" => [0, 0, 255],
        "yellow" => [255, 255, 0],
        "cyan" => [0, 255, 255],
        "magenta" => [255, 0, 255],
        "orange" => [255, 165, 0],
        "gray" | "grey" => [128, 128, 128],
        _ => return None,
    };
    Some(Rgba([rgb[0], rgb[1], rgb[2], 255]))
}

fn parse_hex(hex: &str) -> Option<Rgba<u8>> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();

    match hex.len() {
        3 => {
            let mut channels = [255u8; 4];
            for (i, c) in hex.chars().enumerate() {
                let nibble = c.to_digit(16)? as u8;
                channels[i] = nibble * 17;
            }
            Some(Rgba(channels))
        }
        6 => Some(Rgba([byte(0)?, byte(2)?, byte(4)?, 255])),
        8 => Some(Rgba([byte(0)?, byte(2)?, byte(4)?, byte(6)?])),
        _ => None,
    }
}

/// 每帧重新计算单个字形的瞬时样式
///
/// 所有效果都是幂等的：偏移、可见性、颜色每次都从样式快照完整推导，
/// 不改变字形位置和身份。
///
/// # 参数
///
/// - `index`: 字形在页内的序号
/// - `revealed`: 当前页已显示的字形数量
/// - `elapsed`: 当前页已播放的秒数
/// - `default_fill`: 未设置 `clr` 时的填充色
pub fn animate_glyph(
    glyph: &mut Glyph,
    index: usize,
    revealed: usize,
    elapsed: f64,
    default_fill: Rgba<u8>,
    rng: &mut impl Rng,
) {
    let styles = &glyph.styles;
    let mut offset = Offset::ZERO;

    if styles.has_any(&["shk", "shake"]) {
        offset.x = rng.gen_range(-1..=1) as f32;
        offset.y = rng.gen_range(-1..=1) as f32;
    }
    if styles.has_any(&["wvy", "wave"]) {
        offset.y = (index as f64 + elapsed).sin() as f32;
    }

    let hidden = index >= revealed && !styles.contains("r");
    let fill = styles
        .value("clr")
        .and_then(parse_color)
        .unwrap_or(default_fill);

    glyph.offset = offset;
    glyph.hidden = hidden;
    glyph.fill = fill;
}
