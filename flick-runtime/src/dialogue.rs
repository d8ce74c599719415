//! # Dialogue 模块
//!
//! 对话播放器：页面队列、逐字显示计时、跳过 / 翻页、空闲同步。
//!
//! ## 状态
//!
//! ```text
//!          queue_script
//!   Idle ───────────────→ Active ──┐ update(dt) 逐字显示
//!    ↑                      │  ↑───┘ skip() 显示全部 / 翻页
//!    └──── 队列耗尽 (done) ──┘
//! ```
//!
//! - 页面成为当前页时同步发出 `next-page`
//! - 每次 Active → Idle 恰好发出一次 `done`

use std::collections::VecDeque;
use std::rc::Rc;

use image::{Rgba, RgbaImage};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::debug;

use crate::completion::Completion;
use crate::config::DialogueConfig;
use crate::event::{Event, EventSink};
use crate::font::Font;
use crate::text::{Page, animate_glyph, draw_page, script_to_pages};

/// 队列中的页面
#[derive(Debug)]
struct QueuedPage {
    page: Page,
    /// 仅 `queue_script` 产出的最后一页持有
    ticket: Option<Completion>,
}

/// 对话播放器
#[derive(Debug)]
pub struct DialoguePlayer {
    font: Rc<Font>,
    config: DialogueConfig,
    text_color: Rgba<u8>,
    events: EventSink,
    queue: VecDeque<QueuedPage>,
    current: Option<QueuedPage>,
    page_elapsed: f64,
    reveal_timer: f64,
    revealed: usize,
    idle_waiters: Vec<Completion>,
    rng: StdRng,
}

impl DialoguePlayer {
    /// 创建空闲的对话播放器
    pub fn new(font: Rc<Font>, config: DialogueConfig, events: EventSink) -> Self {
        let text_color = config.text_color();
        Self {
            font,
            config,
            text_color,
            events,
            queue: VecDeque::new(),
            current: None,
            page_elapsed: 0.0,
            reveal_timer: 0.0,
            revealed: 0,
            idle_waiters: Vec::new(),
            rng: StdRng::from_entropy(),
        }
    }

    /// 固定抖动效果的随机种子
    pub fn set_seed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// 排版文本并加入队列
    ///
    /// 返回的 [`Completion`] 在本次调用产出的最后一页离开当前页时完成。
    pub fn queue_script(&mut self, script: &str) -> Completion {
        let pages = script_to_pages(script, &self.font, &self.config.layout_options());
        let ticket = Completion::new();
        let last = pages.len().saturating_sub(1);

        for (i, page) in pages.into_iter().enumerate() {
            self.queue.push_back(QueuedPage {
                page,
                ticket: (i == last).then(|| ticket.clone()),
            });
        }

        if self.current.is_none() {
            self.promote_next();
        }
        ticket
    }

    /// 推进时间
    pub fn update(&mut self, dt: f64) {
        let Some(current) = self.current.as_ref() else {
            return;
        };

        self.page_elapsed += dt;
        self.reveal_timer += dt;

        let glyphs = &current.page.glyphs;
        while self.revealed < glyphs.len() {
            let delay = glyphs[self.revealed]
                .styles
                .delay()
                .unwrap_or(self.config.char_delay);
            if self.reveal_timer < delay {
                break;
            }
            self.reveal_timer -= delay;
            self.revealed += 1;
        }

        self.animate();
    }

    /// 跳过：未显示完则立即显示全部，否则翻到下一页
    pub fn skip(&mut self) {
        let Some(current) = self.current.as_ref() else {
            return;
        };

        if self.revealed < current.page.len() {
            self.revealed = current.page.len();
            self.animate();
        } else {
            self.advance_page();
        }
    }

    /// 等待对话空闲
    ///
    /// 已经空闲时返回已完成的信号，不会等到之后无关的 `done`。
    pub fn wait_idle(&mut self) -> Completion {
        if self.is_idle() {
            return Completion::resolved();
        }
        let waiter = Completion::new();
        self.idle_waiters.push(waiter.clone());
        waiter
    }

    /// 清空对话，不发出 `done`；未完成的等待直接释放
    pub fn restart(&mut self) {
        let current = self.current.take();
        for queued in current.into_iter().chain(self.queue.drain(..)) {
            if let Some(ticket) = queued.ticket {
                ticket.resolve();
            }
        }
        for waiter in self.idle_waiters.drain(..) {
            waiter.resolve();
        }
        self.reset_page_progress();
    }

    /// 是否空闲
    pub fn is_idle(&self) -> bool {
        self.current.is_none()
    }

    /// 当前页
    pub fn current_page(&self) -> Option<&Page> {
        self.current.as_ref().map(|c| &c.page)
    }

    /// 当前页已显示的字形数量
    pub fn revealed(&self) -> usize {
        self.revealed
    }

    /// 当前页是否已全部显示
    pub fn is_fully_revealed(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|c| self.revealed >= c.page.len())
    }

    /// 排队中的页数（不含当前页）
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// 当前页已播放的时间
    pub fn page_elapsed(&self) -> f64 {
        self.page_elapsed
    }

    /// 对话框尺寸
    pub fn box_size(&self) -> (u32, u32) {
        self.config.box_size(self.font.line_height)
    }

    /// 渲染对话框，空闲时返回 None
    pub fn render(&self) -> Option<RgbaImage> {
        let current = self.current.as_ref()?;
        let (width, height) = self.box_size();
        let mut image = RgbaImage::from_pixel(width, height, self.config.background_color());
        let padding = self.config.padding as i32;
        draw_page(&mut image, &current.page, padding, padding);
        Some(image)
    }

    fn advance_page(&mut self) {
        if let Some(ticket) = self.current.take().and_then(|finished| finished.ticket) {
            ticket.resolve();
        }

        if !self.promote_next() {
            debug!("对话进入空闲");
            self.events.emit(Event::Done);
            for waiter in self.idle_waiters.drain(..) {
                waiter.resolve();
            }
        }
    }

    /// 弹出下一页作为当前页，队列为空返回 false
    fn promote_next(&mut self) -> bool {
        let Some(next) = self.queue.pop_front() else {
            return false;
        };

        self.reset_page_progress();
        debug!(glyphs = next.page.len(), queued = self.queue.len(), "切换到下一页");
        let page = next.page.clone();
        self.current = Some(next);
        self.animate();
        self.events.emit(Event::NextPage(page));
        true
    }

    fn reset_page_progress(&mut self) {
        self.page_elapsed = 0.0;
        self.reveal_timer = 0.0;
        self.revealed = 0;
    }

    /// 对当前页的所有字形重新应用样式
    fn animate(&mut self) {
        let Some(current) = self.current.as_mut() else {
            return;
        };
        for (index, glyph) in current.page.glyphs.iter_mut().enumerate() {
            animate_glyph(
                glyph,
                index,
                self.revealed,
                self.page_elapsed,
                self.text_color,
                &mut self.rng,
            );
        }
    }
}
