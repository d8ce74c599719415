//! # Scene 模块
//!
//! 项目数据模型：绘图、场景、场景对象及其行为。
//!
//! 与项目文件（JSON）结构一一对应，缺省字段使用默认值。
//! 绘图的像素数据（`data`，通常是 PNG data URL）由宿主解码，运行时只引用 id。

use std::collections::HashMap;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// 解码后的绘图：绘图 id → 位图
pub type DrawingImages = HashMap<String, RgbaImage>;

/// 项目信息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDetails {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// 起始场景 id，缺省时使用第一个场景
    #[serde(default)]
    pub start: Option<String>,
}

/// 绘图
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawingData {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// 编码后的图像数据
    #[serde(default)]
    pub data: String,
}

/// 对象位置，`z` 越大越靠上
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub z: i32,
}

/// 对象被点击时的行为
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Behaviour {
    /// 行为脚本
    #[serde(default)]
    pub script: String,
    /// 脚本结束后显示的对话
    #[serde(default)]
    pub dialogue: String,
    /// 对话结束后切换到的场景
    #[serde(default)]
    pub destination: String,
}

/// 场景对象
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneObject {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub position: Position,
    /// 绘图 id
    pub drawing: String,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub behaviour: Behaviour,
}

impl SceneObject {
    /// 用于日志的名称，名称为空时使用 id
    pub fn label(&self) -> &str {
        if self.name.is_empty() { &self.id } else { &self.name }
    }
}

/// 场景
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scene {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub objects: Vec<SceneObject>,
}

impl Scene {
    /// 用于日志的名称，名称为空时使用 id
    pub fn label(&self) -> &str {
        if self.name.is_empty() { &self.id } else { &self.name }
    }

    pub fn object(&self, id: &str) -> Option<&SceneObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    pub fn object_mut(&mut self, id: &str) -> Option<&mut SceneObject> {
        self.objects.iter_mut().find(|o| o.id == id)
    }
}

/// 项目
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectData {
    #[serde(default)]
    pub details: ProjectDetails,
    #[serde(default)]
    pub drawings: Vec<DrawingData>,
    #[serde(default)]
    pub scenes: Vec<Scene>,
}

impl ProjectData {
    /// 从 JSON 文本解析
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn scene(&self, id: &str) -> Option<&Scene> {
        self.scenes.iter().find(|s| s.id == id)
    }

    pub fn scene_mut(&mut self, id: &str) -> Option<&mut Scene> {
        self.scenes.iter_mut().find(|s| s.id == id)
    }

    pub fn drawing(&self, id: &str) -> Option<&DrawingData> {
        self.drawings.iter().find(|d| d.id == id)
    }

    /// 起始场景 id：`details.start`，缺省时为第一个场景
    pub fn start_scene(&self) -> Option<&str> {
        match &self.details.start {
            Some(start) => Some(start.as_str()),
            None => self.scenes.first().map(|s| s.id.as_str()),
        }
    }
}
