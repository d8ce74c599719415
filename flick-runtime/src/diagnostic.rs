//! # 诊断模块
//!
//! 项目静态检查，不依赖 IO 或播放器。
//!
//! ## 设计原则
//!
//! - 纯函数 API，可在无 IO 环境下运行
//! - 诊断分级：Error（必须修复）、Warn（建议修复）、Info（信息提示）
//! - 复用行为脚本的 lexer/parser，不重复解析逻辑
//!
//! ## 检查项
//!
//! - 起始场景缺失或不存在
//! - 行为脚本解析错误（带行号）
//! - 脚本中以字面量引用的绘图 / 场景 / 对象不存在
//! - `behaviour.destination` 指向不存在的场景
//! - 对象引用不存在的绘图、同一场景内对象 id 重复

use std::collections::HashSet;
use std::fmt;

use crate::scene::{ProjectData, Scene, SceneObject};
use crate::script::{BehaviorScript, Call, CommandName};

/// 诊断级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DiagnosticLevel {
    /// 信息提示
    Info,
    /// 警告（建议修复）
    Warn,
    /// 错误（必须修复）
    Error,
}

impl fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warn => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// 诊断条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// 诊断级别
    pub level: DiagnosticLevel,
    /// 位置：`场景/对象`，项目级诊断为项目名
    pub location: String,
    /// 脚本行号（如果可定位，从 1 开始）
    pub line: Option<usize>,
    /// 诊断消息
    pub message: String,
    /// 诊断详情（可选）
    pub detail: Option<String>,
}

impl Diagnostic {
    fn new(level: DiagnosticLevel, location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            location: location.into(),
            line: None,
            message: message.into(),
            detail: None,
        }
    }

    /// 创建错误诊断
    pub fn error(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Error, location, message)
    }

    /// 创建警告诊断
    pub fn warn(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Warn, location, message)
    }

    /// 创建信息诊断
    pub fn info(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Info, location, message)
    }

    /// 设置行号
    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    /// 设置详情
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.level, self.location)?;
        if let Some(line) = self.line {
            write!(f, ":{line}")?;
        }
        write!(f, ": {}", self.message)?;
        if let Some(detail) = &self.detail {
            write!(f, "\n  | {detail}")?;
        }
        Ok(())
    }
}

/// 诊断结果
#[derive(Debug, Clone, Default)]
pub struct DiagnosticResult {
    /// 诊断条目列表
    pub diagnostics: Vec<Diagnostic>,
}

impl DiagnosticResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加诊断
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// 合并另一个结果
    pub fn merge(&mut self, other: DiagnosticResult) {
        self.diagnostics.extend(other.diagnostics);
    }

    /// 错误数量
    pub fn error_count(&self) -> usize {
        self.count(DiagnosticLevel::Error)
    }

    /// 警告数量
    pub fn warn_count(&self) -> usize {
        self.count(DiagnosticLevel::Warn)
    }

    /// 是否有错误
    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// 按级别过滤
    pub fn filter_by_level(&self, min_level: DiagnosticLevel) -> Vec<&Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.level >= min_level)
            .collect()
    }

    fn count(&self, level: DiagnosticLevel) -> usize {
        self.diagnostics.iter().filter(|d| d.level == level).count()
    }
}

/// 脚本中以字面量给出的引用
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptReference {
    pub kind: ReferenceKind,
    pub id: String,
    pub line: usize,
}

/// 引用类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    Drawing,
    Scene,
    /// 当前场景中的对象
    Object,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Drawing => write!(f, "绘图"),
            Self::Scene => write!(f, "场景"),
            Self::Object => write!(f, "对象"),
        }
    }
}

//=============================================================================
// 项目分析 API
//=============================================================================

/// 分析整个项目
pub fn analyze_project(project: &ProjectData) -> DiagnosticResult {
    let mut result = DiagnosticResult::new();
    let project_label = if project.details.name.is_empty() {
        "project"
    } else {
        project.details.name.as_str()
    };

    match (&project.details.start, project.scenes.is_empty()) {
        (_, true) => result.push(Diagnostic::error(project_label, "项目中没有任何场景")),
        (None, false) => result.push(Diagnostic::info(
            project_label,
            "未指定起始场景，使用第一个场景",
        )),
        (Some(start), false) if project.scene(start).is_none() => result.push(Diagnostic::error(
            project_label,
            format!("起始场景 '{start}' 不存在"),
        )),
        _ => {}
    }

    for scene in &project.scenes {
        result.merge(analyze_scene(project, scene));
    }

    result
}

/// 分析单个场景中的全部对象
pub fn analyze_scene(project: &ProjectData, scene: &Scene) -> DiagnosticResult {
    let mut result = DiagnosticResult::new();
    let mut seen = HashSet::new();

    for object in &scene.objects {
        let location = format!("{}/{}", scene.label(), object.label());

        if !seen.insert(object.id.as_str()) {
            result.push(Diagnostic::warn(
                &location,
                format!("对象 id '{}' 在场景中重复", object.id),
            ));
        }
        if project.drawing(&object.drawing).is_none() {
            result.push(Diagnostic::warn(
                &location,
                format!("绘图 '{}' 不存在", object.drawing),
            ).with_detail("对象不会被绘制，也无法被点击"));
        }

        let destination = &object.behaviour.destination;
        if !destination.is_empty() && project.scene(destination).is_none() {
            result.push(Diagnostic::error(
                &location,
                format!("目标场景 '{destination}' 不存在"),
            ));
        }

        result.merge(analyze_behavior_script(project, scene, object, &location));
    }

    result
}

fn analyze_behavior_script(
    project: &ProjectData,
    scene: &Scene,
    object: &SceneObject,
    location: &str,
) -> DiagnosticResult {
    let mut result = DiagnosticResult::new();
    if object.behaviour.script.trim().is_empty() {
        return result;
    }

    let script = match BehaviorScript::compile(&object.behaviour.script) {
        Ok(script) => script,
        Err(error) => {
            result.push(
                Diagnostic::error(location, "行为脚本解析失败")
                    .with_line(error.line())
                    .with_detail(error.to_string()),
            );
            return result;
        }
    };

    for reference in extract_references(&script) {
        let exists = match reference.kind {
            ReferenceKind::Drawing => project.drawing(&reference.id).is_some(),
            ReferenceKind::Scene => project.scene(&reference.id).is_some(),
            ReferenceKind::Object => scene.object(&reference.id).is_some(),
        };
        if !exists {
            result.push(
                Diagnostic::error(
                    location,
                    format!("{} '{}' 不存在", reference.kind, reference.id),
                )
                .with_line(reference.line),
            );
        }
    }

    result
}

/// 提取脚本中以字面量给出的绘图 / 场景 / 对象引用
///
/// 由表达式计算出的参数无法静态确定，不在结果中。
pub fn extract_references(script: &BehaviorScript) -> Vec<ScriptReference> {
    let mut refs = Vec::new();
    for call in script.calls() {
        let kinds: &[ReferenceKind] = match call.command {
            CommandName::Reskin => &[ReferenceKind::Drawing, ReferenceKind::Object],
            CommandName::Show | CommandName::Hide | CommandName::ResetObject => {
                &[ReferenceKind::Object]
            }
            CommandName::Transfer | CommandName::ResetScene => &[ReferenceKind::Scene],
            _ => &[],
        };
        collect_literals(call, kinds, &mut refs);
    }
    refs
}

fn collect_literals(call: &Call, kinds: &[ReferenceKind], refs: &mut Vec<ScriptReference>) {
    for (arg, kind) in call.args.iter().zip(kinds) {
        if let Some(id) = arg.as_literal_str() {
            refs.push(ScriptReference {
                kind: *kind,
                id: id.to_string(),
                line: call.line,
            });
        }
    }
}
