//! Console channels, sinks and post history

use std::sync::{Mutex, PoisonError};

/// Severity channel of a console post
///
/// Ordered from most to least severe, so `level <= ConsoleLevel::Error`
/// selects fatal and error posts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConsoleLevel {
    Fatal = 0,
    Error = 1,
    Normal = 2,
    Log = 3,
}

impl ConsoleLevel {
    pub const ALL: [ConsoleLevel; 4] = [
        ConsoleLevel::Fatal,
        ConsoleLevel::Error,
        ConsoleLevel::Normal,
        ConsoleLevel::Log,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ConsoleLevel::Fatal => "fatal",
            ConsoleLevel::Error => "error",
            ConsoleLevel::Normal => "normal",
            ConsoleLevel::Log => "log",
        }
    }
}

/// A recorded console post
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub level: ConsoleLevel,
    pub text: String,
}

impl Post {
    pub fn new(level: ConsoleLevel, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
        }
    }
}

/// Receiver of pre-formatted console text
pub trait ConsoleSink: Send + Sync {
    fn receive(&self, level: ConsoleLevel, text: &str);
}

type TextHook = Box<dyn Fn(&str) + Send + Sync>;

/// One optional closure per console channel
#[derive(Default)]
pub struct ConsoleHooks {
    log: Option<TextHook>,
    normal: Option<TextHook>,
    error: Option<TextHook>,
    fatal: Option<TextHook>,
}

impl ConsoleHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_log(mut self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.log = Some(Box::new(hook));
        self
    }

    pub fn on_normal(mut self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.normal = Some(Box::new(hook));
        self
    }

    pub fn on_error(mut self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.error = Some(Box::new(hook));
        self
    }

    pub fn on_fatal(mut self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.fatal = Some(Box::new(hook));
        self
    }
}

impl ConsoleSink for ConsoleHooks {
    fn receive(&self, level: ConsoleLevel, text: &str) {
        let hook = match level {
            ConsoleLevel::Log => &self.log,
            ConsoleLevel::Normal => &self.normal,
            ConsoleLevel::Error => &self.error,
            ConsoleLevel::Fatal => &self.fatal,
        };
        if let Some(hook) = hook {
            hook(text);
        }
    }
}

/// Console sink that records every post
///
/// Shared between the instance (as its sink) and the host (for queries)
/// through an `Arc`.
#[derive(Debug, Default)]
pub struct ConsoleHistory {
    posts: Mutex<Vec<Post>>,
}

impl ConsoleHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, post: Post) {
        self.lock().push(post);
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Snapshot of all recorded posts, oldest first
    pub fn posts(&self) -> Vec<Post> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Number of posts at exactly `level`
    pub fn count(&self, level: ConsoleLevel) -> usize {
        self.lock().iter().filter(|p| p.level == level).count()
    }

    /// Number of posts at `level` or any more severe level
    pub fn count_to_level(&self, level: ConsoleLevel) -> usize {
        self.lock().iter().filter(|p| p.level <= level).count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Post>> {
        self.posts.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ConsoleSink for ConsoleHistory {
    fn receive(&self, level: ConsoleLevel, text: &str) {
        self.add(Post::new(level, text));
    }
}

/// Route a post to the `log` facade when no sink is installed
pub(crate) fn forward_to_log(instance_id: u64, level: ConsoleLevel, text: &str) {
    match level {
        ConsoleLevel::Fatal | ConsoleLevel::Error => log::error!("[zpd {}] {}", instance_id, text),
        ConsoleLevel::Normal => log::info!("[zpd {}] {}", instance_id, text),
        ConsoleLevel::Log => log::debug!("[zpd {}] {}", instance_id, text),
    }
}
