//! # Loop Cycle 模块
//!
//! 循环：动作序列中可重复的区间 `[start_action, end_action]`。
//!
//! 动画只保存值类型的循环描述；字符进入循环起点时复制一份
//! [`ActiveLoop`] 到自己的状态中计数，字符之间互不共享。

use serde::{Deserialize, Serialize};

/// 循环方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LoopType {
    /// 到达终点后跳回起点
    #[default]
    Loop,
    /// 到达终点后反向播放回起点（往返）
    LoopReverse,
}

/// 循环描述
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopCycle {
    pub start_action: usize,
    pub end_action: usize,
    /// 循环次数，0 表示无限
    pub number_of_loops: u32,
    pub loop_type: LoopType,
    /// 只在第一遍应用动作延迟
    pub delay_first_only: bool,
}

impl LoopCycle {
    pub fn new(start_action: usize, end_action: usize, number_of_loops: u32) -> Self {
        Self {
            start_action,
            end_action,
            number_of_loops,
            ..Default::default()
        }
    }

    /// 往返循环
    pub fn reverse(mut self) -> Self {
        self.loop_type = LoopType::LoopReverse;
        self
    }

    pub fn with_delay_first_only(mut self, delay_first_only: bool) -> Self {
        self.delay_first_only = delay_first_only;
        self
    }

    /// 区间跨度（用于活动循环的嵌套排序）
    pub fn span_width(&self) -> usize {
        self.end_action.saturating_sub(self.start_action)
    }

    /// 是否引用了有效的动作区间
    pub fn is_valid(&self, num_actions: usize) -> bool {
        self.start_action <= self.end_action && self.end_action < num_actions
    }

    /// 与另一个循环覆盖相同区间
    pub fn same_span(&self, other: &LoopCycle) -> bool {
        self.start_action == other.start_action && self.end_action == other.end_action
    }
}

/// 字符状态中的活动循环
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveLoop {
    pub cycle: LoopCycle,
    /// 剩余次数；`None` 表示无限
    pub remaining: Option<u32>,
    /// 仍在第一遍
    pub first_pass: bool,
}

impl ActiveLoop {
    pub fn new(cycle: LoopCycle) -> Self {
        Self {
            cycle,
            remaining: (cycle.number_of_loops > 0).then_some(cycle.number_of_loops),
            first_pass: true,
        }
    }

    /// 完成一遍，返回本循环是否已耗尽
    pub fn complete_pass(&mut self) -> bool {
        self.first_pass = false;
        match self.remaining.as_mut() {
            Some(remaining) => {
                *remaining = remaining.saturating_sub(1);
                *remaining == 0
            }
            None => false,
        }
    }

    /// 强制只再执行一遍（外部 continue 时用于结束无限循环）
    pub fn finish_after_current(&mut self) {
        self.remaining = Some(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validity() {
        assert!(LoopCycle::new(0, 2, 1).is_valid(3));
        assert!(!LoopCycle::new(0, 3, 1).is_valid(3));
        assert!(!LoopCycle::new(2, 1, 1).is_valid(3));
    }

    #[test]
    fn test_active_loop_counts_down() {
        let mut active = ActiveLoop::new(LoopCycle::new(0, 1, 2));
        assert!(active.first_pass);
        assert!(!active.complete_pass());
        assert!(!active.first_pass);
        assert!(active.complete_pass());
    }

    #[test]
    fn test_infinite_loop_never_exhausts() {
        let mut active = ActiveLoop::new(LoopCycle::new(0, 1, 0));
        for _ in 0..100 {
            assert!(!active.complete_pass());
        }
        active.finish_after_current();
        assert!(active.complete_pass());
    }

    #[test]
    fn test_deserialize() {
        let cycle: LoopCycle =
            serde_json::from_str(r#"{ "end_action": 2, "number_of_loops": 3, "loop_type": "LoopReverse" }"#)
                .unwrap();
        assert_eq!(cycle.start_action, 0);
        assert_eq!(cycle.span_width(), 2);
        assert_eq!(cycle.loop_type, LoopType::LoopReverse);
    }
}
