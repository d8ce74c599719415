//! # Session 模块
//!
//! 无界面播放会话：固定帧长推进播放器，模拟点击，记录事件，导出帧。
//!
//! ## 执行模型
//!
//! ```text
//! click(x, y) ─→ settle() ─→ step() × N ─→ 交互结束且对话空闲
//!                              │
//!                              ├─ player.update(frame_dt)
//!                              ├─ 自动跳过（页面完全显示后翻页）
//!                              └─ 收集事件 / 导出 PNG
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::str::FromStr;

use anyhow::{Context, Result};
use flick_runtime::{ClickOutcome, Event, EventSink, Font, Player, PlayerError};
use tracing::{debug, info, warn};

use crate::assets::LoadedProject;
use crate::config::AppConfig;

/// 点击坐标（命令行格式 `x,y`）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClickPoint {
    pub x: i32,
    pub y: i32,
}

impl FromStr for ClickPoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (x, y) = s
            .split_once(',')
            .ok_or_else(|| format!("坐标格式应为 x,y: '{s}'"))?;
        let parse = |v: &str| {
            v.trim()
                .parse::<i32>()
                .map_err(|_| format!("无法解析坐标 '{s}'"))
        };
        Ok(Self {
            x: parse(x)?,
            y: parse(y)?,
        })
    }
}

impl fmt::Display for ClickPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

/// 一次 settle 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settled {
    /// 推进的帧数
    pub frames: u32,
    /// 是否在帧数上限内结束
    pub finished: bool,
}

/// 无界面播放会话
#[derive(Debug)]
pub struct HeadlessSession {
    player: Player,
    events: EventSink,
    frame_dt: f64,
    max_frames: u32,
    auto_skip: bool,
    frame: u64,
    event_log: Vec<String>,
    dump_dir: Option<PathBuf>,
}

impl HeadlessSession {
    /// 创建会话
    pub fn new(loaded: LoadedProject, font: Font, config: &AppConfig) -> Result<Self, PlayerError> {
        let events = EventSink::new();
        let player = Player::new(
            loaded.project,
            loaded.drawings,
            Rc::new(font),
            config.player.clone(),
            events.clone(),
        )?;

        Ok(Self {
            player,
            events,
            frame_dt: config.frame_dt,
            max_frames: config.max_frames,
            auto_skip: true,
            frame: 0,
            event_log: Vec::new(),
            dump_dir: None,
        })
    }

    /// 每帧导出 PNG 到 `dir`
    pub fn dump_frames_to(&mut self, dir: impl Into<PathBuf>) {
        self.dump_dir = Some(dir.into());
    }

    /// 页面完全显示后是否自动翻页
    pub fn set_auto_skip(&mut self, auto_skip: bool) {
        self.auto_skip = auto_skip;
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut Player {
        &mut self.player
    }

    /// 已推进的帧数
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// 收集到的事件（格式化后）
    pub fn event_log(&self) -> &[String] {
        &self.event_log
    }

    /// 点击并推进到交互结束
    pub fn click(&mut self, point: ClickPoint) -> Result<(ClickOutcome, Settled)> {
        let outcome = self.player.click(point.x, point.y);
        debug!(point = %point, outcome = ?outcome, "点击");
        self.collect_events();
        let settled = self.settle()?;
        Ok((outcome, settled))
    }

    /// 推进直到没有进行中的交互且对话空闲，最多 `max_frames` 帧
    pub fn settle(&mut self) -> Result<Settled> {
        let mut frames = 0;
        while self.is_active() {
            if frames >= self.max_frames {
                warn!(frames, "交互未在帧数上限内结束");
                return Ok(Settled {
                    frames,
                    finished: false,
                });
            }
            self.step()?;
            frames += 1;
        }
        Ok(Settled {
            frames,
            finished: true,
        })
    }

    /// 推进一帧
    pub fn step(&mut self) -> Result<()> {
        self.player.update(self.frame_dt);
        if self.auto_skip && self.player.dialogue().is_fully_revealed() {
            self.player.skip();
        }
        self.frame += 1;
        self.collect_events();

        if let Some(dir) = &self.dump_dir {
            let path = dir.join(format!("frame-{:05}.png", self.frame));
            self.save_frame(&path)?;
        }
        Ok(())
    }

    /// 保存当前画面
    pub fn save_frame(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("创建目录失败: {}", parent.display()))?;
        }
        self.player
            .render()
            .save(path)
            .with_context(|| format!("保存帧失败: {}", path.display()))
    }

    fn is_active(&self) -> bool {
        self.player.is_busy() || !self.player.dialogue().is_idle()
    }

    fn collect_events(&mut self) {
        for event in self.events.drain() {
            let line = describe(&event);
            info!(frame = self.frame, "{line}");
            self.event_log.push(line);
        }
    }
}

/// 事件的单行描述
pub fn describe(event: &Event) -> String {
    match event {
        Event::NextPage(page) => format!("next-page: {}", page.text()),
        Event::Done => "done".to_string(),
        Event::NextScene(scene) => format!("next-scene: {scene}"),
        Event::Log(message) => format!("log: {message}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_click_point_parse() {
        assert_eq!(
            "10, 20".parse::<ClickPoint>().unwrap(),
            ClickPoint { x: 10, y: 20 }
        );
        assert_eq!(
            "-1,0".parse::<ClickPoint>().unwrap(),
            ClickPoint { x: -1, y: 0 }
        );
        assert!("10".parse::<ClickPoint>().is_err());
        assert!("a,b".parse::<ClickPoint>().is_err());
        assert_eq!(ClickPoint { x: 3, y: 4 }.to_string(), "3,4");
    }

    #[test]
    fn test_describe_events() {
        assert_eq!(describe(&Event::Done), "done");
        assert_eq!(describe(&Event::NextScene("hall".into())), "next-scene: hall");
        assert_eq!(describe(&Event::Log("hi".into())), "log: hi");
    }
}
