//! # Event 模块
//!
//! 播放器向宿主发出的事件：`next-page`、`done`、`next-scene`、`log`。
//!
//! [`EventSink`] 是单生产者 / 多消费者的事件通道：
//! - 事件按发出顺序同步分发给所有观察者
//! - 同时进入待取队列，宿主每帧 [`EventSink::drain`]
//!
//! 一个 `EventSink` 通过克隆传给播放器的各个组件，所有克隆共享同一队列。

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use crate::text::Page;

/// 播放器事件
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// 新的一页成为当前页
    NextPage(Page),
    /// 对话从活动变为空闲
    Done,
    /// 切换到新场景
    NextScene(String),
    /// 面向用户的日志
    Log(String),
}

impl Event {
    /// 事件名称
    pub fn name(&self) -> &'static str {
        match self {
            Self::NextPage(_) => "next-page",
            Self::Done => "done",
            Self::NextScene(_) => "next-scene",
            Self::Log(_) => "log",
        }
    }
}

type Observer = Box<dyn FnMut(&Event)>;

#[derive(Default)]
struct Channel {
    pending: VecDeque<Event>,
    observers: Vec<Observer>,
}

/// 事件通道
#[derive(Clone, Default)]
pub struct EventSink {
    channel: Rc<RefCell<Channel>>,
}

impl fmt::Debug for EventSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let channel = self.channel.borrow();
        f.debug_struct("EventSink")
            .field("pending", &channel.pending.len())
            .field("observers", &channel.observers.len())
            .finish()
    }
}

impl EventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// 发出事件
    pub fn emit(&self, event: Event) {
        // 分发期间取出观察者，观察者内部可以安全地再次 emit
        let mut observers = {
            let mut channel = self.channel.borrow_mut();
            channel.pending.push_back(event.clone());
            std::mem::take(&mut channel.observers)
        };
        for observer in &mut observers {
            observer(&event);
        }

        let mut channel = self.channel.borrow_mut();
        observers.append(&mut channel.observers);
        channel.observers = observers;
    }

    /// 发出日志事件
    pub fn log(&self, message: impl Into<String>) {
        self.emit(Event::Log(message.into()));
    }

    /// 注册观察者
    pub fn subscribe(&self, observer: impl FnMut(&Event) + 'static) {
        self.channel.borrow_mut().observers.push(Box::new(observer));
    }

    /// 取出所有待处理事件
    pub fn drain(&self) -> Vec<Event> {
        self.channel.borrow_mut().pending.drain(..).collect()
    }

    /// 待处理事件数量
    pub fn pending(&self) -> usize {
        self.channel.borrow().pending.len()
    }
}
