//! 翻回延迟与秒表的浏览器计时器。句柄被丢弃时 JS 计时器随之清除。

use gloo_timers::callback::{Interval, Timeout};

#[derive(Default)]
pub struct BoardTimers {
    revert: Option<Timeout>,
    clock: Option<Interval>,
}

impl BoardTimers {
    /// 挂上翻回计时，替换之前的那个。
    pub fn schedule_revert<F>(&mut self, delay_ms: u32, callback: F)
    where
        F: FnOnce() + 'static,
    {
        self.revert = Some(Timeout::new(delay_ms, callback));
    }

    pub fn start_clock<F>(&mut self, interval_ms: u32, callback: F)
    where
        F: FnMut() + 'static,
    {
        if self.clock.is_some() {
            return;
        }
        self.clock = Some(Interval::new(interval_ms, callback));
    }

    pub fn stop_clock(&mut self) {
        self.clock = None;
    }

    pub fn clock_active(&self) -> bool {
        self.clock.is_some()
    }

    pub fn cancel_all(&mut self) {
        self.revert = None;
        self.clock = None;
    }
}
