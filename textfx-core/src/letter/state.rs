//! 字符动画状态

use crate::loop_cycle::ActiveLoop;

/// 字符（或整个动画）在一次推进后的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LetterState {
    /// 未激活或已播放完毕
    #[default]
    Stopped,
    /// 正在推进
    Playing,
    /// 停在暂停点，等待倒计时或外部 continue
    Waiting,
}

/// 字符的运行时动画状态
///
/// 活动循环以值的形式保存，复制状态时不会与其他字符共享计数。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnimationStateVariables {
    pub active: bool,
    /// 停在同步屏障或暂停点
    pub waiting_to_sync: bool,
    /// 当前动作已越过延迟并触发过开始事件
    pub started_action: bool,
    /// 暂停点剩余时长
    pub break_delay: f32,
    /// 当前动作开始时的动画计时
    pub timer_offset: f32,
    pub action_index: usize,
    /// 正在往返循环的回程中
    pub reverse: bool,
    /// 已推进过的动作个数（含循环重复），用于同步屏障
    pub action_index_progress: usize,
    /// 上一次推进时的动作索引，`None` 表示尚未推进
    pub prev_action_index: Option<usize>,
    pub linear_progress: f32,
    pub action_progress: f32,
    /// 按区间跨度升序排列（内层循环在前）
    pub active_loops: Vec<ActiveLoop>,
}

impl AnimationStateVariables {
    /// 回到初始状态
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loop_cycle::LoopCycle;

    #[test]
    fn test_reset_clears_loops() {
        let mut state = AnimationStateVariables {
            active: true,
            action_index: 3,
            prev_action_index: Some(2),
            active_loops: vec![ActiveLoop::new(LoopCycle::new(0, 3, 2))],
            ..Default::default()
        };
        state.reset();
        assert_eq!(state, AnimationStateVariables::default());
        assert!(state.prev_action_index.is_none());
    }

    #[test]
    fn test_clone_does_not_share_loop_counts() {
        let mut a = AnimationStateVariables {
            active_loops: vec![ActiveLoop::new(LoopCycle::new(0, 1, 3))],
            ..Default::default()
        };
        let b = a.clone();
        a.active_loops[0].complete_pass();
        assert_eq!(b.active_loops[0].remaining, Some(3));
        assert_eq!(a.active_loops[0].remaining, Some(2));
    }
}
