use std::collections::VecDeque;
use std::time::Duration;

/// 回合结束后由定时器推进的阶段转换
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// 结算展示结束：公布游戏赢家，或者公布本轮结束
    ConcludeRound,
    /// 开始下一轮
    BeginNextRound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledTransition {
    /// 会话时钟上的到期时间
    pub due: Duration,
    pub transition: Transition,
}

/// 按到期时间排序的转换队列。
///
/// 时间由调用方传入：服务端用真实流逝的时间驱动，测试直接快进。
/// 同一时刻到期的任务按加入顺序执行。
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    queue: VecDeque<ScheduledTransition>,
}

impl Scheduler {
    pub fn schedule(&mut self, due: Duration, transition: Transition) {
        let pos = self.queue.iter().position(|t| t.due > due).unwrap_or(self.queue.len());
        self.queue.insert(pos, ScheduledTransition { due, transition });
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.queue.front().map(|t| t.due)
    }

    /// 取出一个在 `now` 之前（含）到期的转换
    pub fn pop_due(&mut self, now: Duration) -> Option<ScheduledTransition> {
        if self.queue.front().is_some_and(|t| t.due <= now) {
            self.queue.pop_front()
        } else {
            None
        }
    }

    pub fn is_idle(&self) -> bool {
        self.queue.is_empty()
    }
}
