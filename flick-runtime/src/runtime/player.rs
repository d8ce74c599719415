//! # Player 模块
//!
//! 播放器：拥有场景数据、共享变量、对话播放器，驱动一次点击引发的整个交互。
//!
//! ## 交互流程
//!
//! ```text
//! click(x, y)
//!   │ pointcast 选中对象
//!   ▼
//! Script ──(脚本结束 / 出错)──→ QueueDialogue ──→ AwaitDialogue ──(done)──→ Travel
//!   ↑ await 挂起，update / skip 时恢复                                    │
//!   └──────────────────────────────────────────────────────────────────────┘ 交互结束
//! ```
//!
//! - 脚本出错只产生一条 `log`，对话与目标场景照常执行
//! - 交互进行中对话空闲时的点击返回 [`ClickOutcome::Busy`]，不会开始新的交互
//! - 对话活动时的点击用于跳过 / 翻页

use std::rc::Rc;

use image::{Rgba, RgbaImage, imageops};
use tracing::{debug, warn};

use super::capability::{Capabilities, ScriptScope};
use super::sandbox::{BehaviorTask, TaskStatus};
use crate::completion::Completion;
use crate::config::PlayerConfig;
use crate::dialogue::DialoguePlayer;
use crate::error::{PlayerError, RuntimeError};
use crate::event::{Event, EventSink};
use crate::font::Font;
use crate::pointcast::{PointcastOptions, draw_order, pointcast};
use crate::scene::{Behaviour, DrawingImages, ProjectData, Scene, SceneObject};
use crate::script::BehaviorScript;
use crate::state::{VarValue, Variables};

/// 重启时发出的日志
pub const RESTART_MESSAGE: &str = "[已重启]";

/// 点击结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    /// 对话活动中，点击用于跳过 / 翻页
    Skipped,
    /// 上一次交互尚未结束
    Busy,
    /// 没有点中任何对象
    Missed,
    /// 触发了对象的行为
    Triggered { object_id: String },
}

#[derive(Debug)]
struct Timer {
    remaining: f64,
    completion: Completion,
}

/// 脚本能触及的全部状态
#[derive(Debug)]
struct World {
    config: PlayerConfig,
    pristine: ProjectData,
    project: ProjectData,
    drawings: DrawingImages,
    variables: Variables,
    start_scene: String,
    current_scene: String,
    dialogue: DialoguePlayer,
    timers: Vec<Timer>,
    events: EventSink,
}

impl World {
    fn scene(&self) -> Option<&Scene> {
        self.project.scene(&self.current_scene)
    }

    fn change_scene(&mut self, scene_id: &str) -> Result<(), PlayerError> {
        if self.project.scene(scene_id).is_none() {
            return Err(PlayerError::UnknownScene {
                scene: scene_id.to_string(),
            });
        }
        debug!(from = %self.current_scene, to = %scene_id, "切换场景");
        self.current_scene = scene_id.to_string();
        self.events.emit(Event::NextScene(scene_id.to_string()));
        Ok(())
    }

    fn object_mut(&mut self, scene: &str, object: &str) -> Result<&mut SceneObject, RuntimeError> {
        self.project
            .scene_mut(scene)
            .ok_or_else(|| RuntimeError::UnknownScene {
                scene: scene.to_string(),
            })?
            .object_mut(object)
            .ok_or_else(|| RuntimeError::UnknownObject {
                scene: scene.to_string(),
                object: object.to_string(),
            })
    }

    fn restart(&mut self) {
        self.project = self.pristine.clone();
        self.variables.clear();
        self.dialogue.restart();
        for timer in self.timers.drain(..) {
            timer.completion.resolve();
        }
        self.current_scene = self.start_scene.clone();
        debug!(scene = %self.current_scene, "重启游戏");
        self.events.log(RESTART_MESSAGE);
    }

    fn tick_timers(&mut self, dt: f64) {
        self.timers.retain_mut(|timer| {
            timer.remaining -= dt;
            if timer.remaining <= 0.0 {
                timer.completion.resolve();
                false
            } else {
                true
            }
        });
    }

    fn report_script_error(&self, scene: &str, object: &str, detail: &str) {
        warn!(scene = %scene, object = %object, error = %detail, "行为脚本出错");
        self.events
            .log(format!("脚本错误：场景 '{scene}' 中的对象 '{object}'：{detail}"));
    }

    /// 为被点击的对象准备一次交互，脚本编译失败时直接记录错误
    fn begin_interaction(&self, scene: &Scene, object: &SceneObject) -> Interaction {
        let behaviour = &object.behaviour;
        let mut phase = Phase::QueueDialogue;

        if !behaviour.script.trim().is_empty() {
            match BehaviorScript::compile(&behaviour.script) {
                Ok(script) => {
                    let scope = ScriptScope::new(&object.id, &scene.id);
                    phase = Phase::Script(BehaviorTask::new(script, scope));
                }
                Err(error) => {
                    self.report_script_error(scene.label(), object.label(), &error.to_string());
                }
            }
        }

        Interaction {
            scene: scene.label().to_string(),
            object: object.label().to_string(),
            dialogue: behaviour.dialogue.clone(),
            destination: behaviour.destination.clone(),
            phase,
        }
    }
}

impl Capabilities for World {
    fn variables(&self) -> &Variables {
        &self.variables
    }

    fn set_variable(&mut self, name: &str, value: VarValue) {
        self.variables.set(name, value);
    }

    fn log(&mut self, text: String) {
        self.events.log(text);
    }

    fn reskin(&mut self, scene: &str, object: &str, drawing: &str) -> Result<(), RuntimeError> {
        if self.project.drawing(drawing).is_none() {
            return Err(RuntimeError::UnknownDrawing {
                drawing: drawing.to_string(),
            });
        }
        self.object_mut(scene, object)?.drawing = drawing.to_string();
        Ok(())
    }

    fn set_hidden(&mut self, scene: &str, object: &str, hidden: bool) -> Result<(), RuntimeError> {
        self.object_mut(scene, object)?.hidden = hidden;
        Ok(())
    }

    fn transfer(&mut self, scene: &str) -> Result<(), RuntimeError> {
        self.change_scene(scene)
            .map_err(|_| RuntimeError::UnknownScene {
                scene: scene.to_string(),
            })
    }

    fn say(&mut self, text: &str) -> Completion {
        self.dialogue.queue_script(text)
    }

    fn delay(&mut self, seconds: f64) -> Completion {
        if seconds <= 0.0 {
            return Completion::resolved();
        }
        let completion = Completion::new();
        self.timers.push(Timer {
            remaining: seconds,
            completion: completion.clone(),
        });
        completion
    }

    fn dialogue_idle(&mut self) -> Completion {
        self.dialogue.wait_idle()
    }

    fn reset_object(&mut self, scene: &str, object: &str) -> Result<(), RuntimeError> {
        let original = self
            .pristine
            .scene(scene)
            .and_then(|s| s.object(object))
            .cloned()
            .ok_or_else(|| RuntimeError::UnknownObject {
                scene: scene.to_string(),
                object: object.to_string(),
            })?;
        *self.object_mut(scene, object)? = original;
        Ok(())
    }

    fn reset_scene(&mut self, scene: &str) -> Result<(), RuntimeError> {
        let unknown = || RuntimeError::UnknownScene {
            scene: scene.to_string(),
        };
        let original = self.pristine.scene(scene).cloned().ok_or_else(unknown)?;
        *self.project.scene_mut(scene).ok_or_else(unknown)? = original;
        Ok(())
    }

    fn reset_game(&mut self) {
        self.restart();
    }
}

/// 交互阶段
#[derive(Debug)]
enum Phase {
    Script(BehaviorTask),
    QueueDialogue,
    AwaitDialogue(Completion),
    Travel,
}

/// 一次点击引发的交互
#[derive(Debug)]
struct Interaction {
    /// 场景名称（日志用）
    scene: String,
    /// 对象名称（日志用）
    object: String,
    dialogue: String,
    destination: String,
    phase: Phase,
}

enum Step {
    Wait,
    Next(Phase),
    Finish(String),
}

/// 播放器
#[derive(Debug)]
pub struct Player {
    world: World,
    interaction: Option<Interaction>,
}

impl Player {
    /// 创建播放器，当前场景为项目的起始场景
    pub fn new(
        project: ProjectData,
        drawings: DrawingImages,
        font: Rc<Font>,
        config: PlayerConfig,
        events: EventSink,
    ) -> Result<Self, PlayerError> {
        let start = project
            .start_scene()
            .ok_or(PlayerError::NoScenes)?
            .to_string();
        if project.scene(&start).is_none() {
            return Err(PlayerError::UnknownScene { scene: start });
        }

        let dialogue = DialoguePlayer::new(font, config.dialogue.clone(), events.clone());
        Ok(Self {
            world: World {
                config,
                pristine: project.clone(),
                project,
                drawings,
                variables: Variables::new(),
                start_scene: start.clone(),
                current_scene: start,
                dialogue,
                timers: Vec::new(),
                events,
            },
            interaction: None,
        })
    }

    /// 处理点击
    pub fn click(&mut self, x: i32, y: i32) -> ClickOutcome {
        if !self.world.dialogue.is_idle() {
            self.world.dialogue.skip();
            self.pump();
            return ClickOutcome::Skipped;
        }
        if self.interaction.is_some() {
            return ClickOutcome::Busy;
        }

        let (object_id, interaction) = {
            let Some(scene) = self.world.scene() else {
                return ClickOutcome::Missed;
            };
            let Some(object) = pointcast(
                scene,
                &self.world.drawings,
                x,
                y,
                PointcastOptions::default(),
            ) else {
                return ClickOutcome::Missed;
            };
            debug!(object = %object.id, scene = %scene.id, "触发对象行为");
            (object.id.clone(), self.world.begin_interaction(scene, object))
        };

        self.interaction = Some(interaction);
        self.pump();
        ClickOutcome::Triggered { object_id }
    }

    /// 点 `(x, y)` 处是否有带行为的对象
    pub fn is_interactable_hovered(&self, x: i32, y: i32) -> bool {
        self.object_at(x, y)
            .is_some_and(|object| is_interactive(&object.behaviour))
    }

    /// 当前场景中点 `(x, y)` 处最上层的可见对象
    pub fn object_at(&self, x: i32, y: i32) -> Option<&SceneObject> {
        let scene = self.world.scene()?;
        pointcast(scene, &self.world.drawings, x, y, PointcastOptions::default())
    }

    /// 切换场景
    pub fn change_scene(&mut self, scene_id: &str) -> Result<(), PlayerError> {
        self.world.change_scene(scene_id)
    }

    /// 推进时间：对话逐字显示、延时、挂起的交互
    pub fn update(&mut self, dt: f64) {
        self.world.dialogue.update(dt);
        self.world.tick_timers(dt);
        self.pump();
    }

    /// 跳过当前对话页
    pub fn skip(&mut self) {
        self.world.dialogue.skip();
        self.pump();
    }

    /// 重启游戏：恢复初始数据，放弃进行中的交互
    pub fn restart(&mut self) {
        self.interaction = None;
        self.world.restart();
    }

    /// 渲染当前场景，对话活动时在底部居中叠加对话框
    pub fn render(&self) -> RgbaImage {
        let width = self.world.config.scene_width;
        let height = self.world.config.scene_height;
        let mut canvas = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255]));

        if let Some(scene) = self.world.scene() {
            for index in draw_order(scene) {
                let object = &scene.objects[index];
                if object.hidden {
                    continue;
                }
                let Some(image) = self.world.drawings.get(&object.drawing) else {
                    continue;
                };
                imageops::overlay(
                    &mut canvas,
                    image,
                    object.position.x as i64,
                    object.position.y as i64,
                );
            }
        }

        if let Some(dialogue) = self.world.dialogue.render() {
            let x = (width as i64 - dialogue.width() as i64) / 2;
            let y = height as i64 - dialogue.height() as i64;
            imageops::overlay(&mut canvas, &dialogue, x, y);
        }

        canvas
    }

    /// 是否有交互在进行
    pub fn is_busy(&self) -> bool {
        self.interaction.is_some()
    }

    pub fn current_scene_id(&self) -> &str {
        &self.world.current_scene
    }

    pub fn scene(&self) -> Option<&Scene> {
        self.world.scene()
    }

    pub fn project(&self) -> &ProjectData {
        &self.world.project
    }

    pub fn variables(&self) -> &Variables {
        &self.world.variables
    }

    pub fn dialogue(&self) -> &DialoguePlayer {
        &self.world.dialogue
    }

    pub fn dialogue_mut(&mut self) -> &mut DialoguePlayer {
        &mut self.world.dialogue
    }

    pub fn events(&self) -> &EventSink {
        &self.world.events
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.world.config
    }

    /// 推进交互，直到需要等待或交互结束
    fn pump(&mut self) {
        while let Some(interaction) = self.interaction.as_mut() {
            let step = match &mut interaction.phase {
                Phase::Script(task) => match task.resume(&mut self.world) {
                    TaskStatus::Suspended => Step::Wait,
                    TaskStatus::Finished => Step::Next(Phase::QueueDialogue),
                    TaskStatus::Failed { line, error } => {
                        self.world.report_script_error(
                            &interaction.scene,
                            &interaction.object,
                            &format!("第 {line} 行：{error}"),
                        );
                        Step::Next(Phase::QueueDialogue)
                    }
                },
                Phase::QueueDialogue => {
                    if !interaction.dialogue.is_empty() {
                        self.world.dialogue.queue_script(&interaction.dialogue);
                    }
                    Step::Next(Phase::AwaitDialogue(self.world.dialogue.wait_idle()))
                }
                Phase::AwaitDialogue(idle) => {
                    if idle.is_resolved() {
                        Step::Next(Phase::Travel)
                    } else {
                        Step::Wait
                    }
                }
                Phase::Travel => Step::Finish(std::mem::take(&mut interaction.destination)),
            };

            match step {
                Step::Wait => return,
                Step::Next(phase) => interaction.phase = phase,
                Step::Finish(destination) => {
                    let scene = std::mem::take(&mut interaction.scene);
                    let object = std::mem::take(&mut interaction.object);
                    self.interaction = None;
                    if destination.is_empty() {
                        continue;
                    }
                    if let Err(error) = self.world.change_scene(&destination) {
                        self.world
                            .report_script_error(&scene, &object, &error.to_string());
                    }
                }
            }
        }
    }
}

/// 对象是否带有任何行为
fn is_interactive(behaviour: &Behaviour) -> bool {
    !behaviour.script.trim().is_empty()
        || !behaviour.dialogue.is_empty()
        || !behaviour.destination.is_empty()
}
