//! # Animation 模块
//!
//! 一段动画：有序的动作列表、循环列表，以及它作用于哪些字符。
//!
//! 动作在 [`LetterAnimation::prepare_data`] 中按顺序解析，
//! 每个动作读取前一个动作结束状态的快照，解析结果只在文本或参数变化时重新计算。

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::action::{LetterAction, ResolvedState};
use crate::letter::LetterState;
use crate::loop_cycle::LoopCycle;
use crate::progression::{AnimatePer, PopulationCounts, ProgressionIndices};

/// 动画作用的字符范围
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LettersToAnimate {
    #[default]
    All,
    FirstLetter,
    LastLetter,
    /// 每个词的首字符
    FirstLetterWords,
    /// 每个词的末字符
    LastLetterWords,
    FirstLetterLines,
    LastLetterLines,
    /// 指定字符序号
    Custom(Vec<usize>),
    FirstWord,
    LastWord,
    /// 第 n 个词（从 1 开始）
    NthWord(usize),
    FirstLine,
    LastLine,
    /// 第 n 行（从 1 开始）
    NthLine(usize),
}

impl LettersToAnimate {
    /// 根据字符的词 / 行序号得到字符序号列表（升序、无重复）
    pub fn resolve(&self, letters: &[ProgressionIndices]) -> Vec<usize> {
        let n = letters.len();
        if n == 0 {
            return Vec::new();
        }
        let all = 0..n;
        let word = |i: usize| letters[i].word;
        let line = |i: usize| letters[i].line;

        match self {
            Self::All => all.collect(),
            Self::FirstLetter => vec![0],
            Self::LastLetter => vec![n - 1],
            Self::FirstLetterWords => all.filter(|&i| i == 0 || word(i) != word(i - 1)).collect(),
            Self::LastLetterWords => all.filter(|&i| i + 1 == n || word(i) != word(i + 1)).collect(),
            Self::FirstLetterLines => all.filter(|&i| i == 0 || line(i) != line(i - 1)).collect(),
            Self::LastLetterLines => all.filter(|&i| i + 1 == n || line(i) != line(i + 1)).collect(),
            Self::Custom(indices) => {
                let mut selected: Vec<usize> = indices.iter().copied().filter(|&i| i < n).collect();
                selected.sort_unstable();
                selected.dedup();
                selected
            }
            Self::FirstWord => all.filter(|&i| word(i) == word(0)).collect(),
            Self::LastWord => all.filter(|&i| word(i) == word(n - 1)).collect(),
            Self::NthWord(nth) => nth_group(letters, *nth, |l| l.word),
            Self::FirstLine => all.filter(|&i| line(i) == line(0)).collect(),
            Self::LastLine => all.filter(|&i| line(i) == line(n - 1)).collect(),
            Self::NthLine(nth) => nth_group(letters, *nth, |l| l.line),
        }
    }
}

/// 第 `nth` 个出现的分组（从 1 开始）中的字符
fn nth_group(
    letters: &[ProgressionIndices],
    nth: usize,
    key: impl Fn(&ProgressionIndices) -> usize,
) -> Vec<usize> {
    let mut groups: Vec<usize> = letters.iter().map(&key).collect();
    groups.dedup();
    let Some(target) = nth.checked_sub(1).and_then(|i| groups.get(i)).copied() else {
        return Vec::new();
    };
    letters
        .iter()
        .enumerate()
        .filter(|(_, l)| key(l) == target)
        .map(|(i, _)| i)
        .collect()
}

/// 字符动画
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LetterAnimation {
    #[serde(default)]
    pub actions: Vec<LetterAction>,
    #[serde(default)]
    pub loop_cycles: Vec<LoopCycle>,
    #[serde(default)]
    pub letters_to_animate: LettersToAnimate,
    #[serde(skip)]
    letters: Vec<usize>,
    #[serde(skip)]
    state: LetterState,
    #[serde(skip)]
    lowest_action_progress: usize,
}

impl LetterAnimation {
    pub fn new(actions: Vec<LetterAction>) -> Self {
        Self {
            actions,
            ..Default::default()
        }
    }

    pub fn with_loop(mut self, cycle: LoopCycle) -> Self {
        self.loop_cycles.push(cycle);
        self
    }

    pub fn with_letters(mut self, letters: LettersToAnimate) -> Self {
        self.letters_to_animate = letters;
        self
    }

    /// 最近一次 prepare 得到的字符序号
    pub fn letters(&self) -> &[usize] {
        &self.letters
    }

    pub fn state(&self) -> LetterState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: LetterState) {
        self.state = state;
    }

    /// 本动画内未停止字符的最低进度计数，用作同步屏障
    pub fn lowest_action_progress(&self) -> usize {
        self.lowest_action_progress
    }

    /// 屏障只升不降，重新播放时归零
    pub(crate) fn raise_barrier(&mut self, progress: usize) {
        self.lowest_action_progress = self.lowest_action_progress.max(progress);
    }

    pub(crate) fn clear_barrier(&mut self) {
        self.lowest_action_progress = 0;
    }

    /// 追加一个接续末尾动作结束状态的新动作
    pub fn add_action(&mut self) -> &mut LetterAction {
        let action = self
            .actions
            .last()
            .map(LetterAction::continue_from)
            .unwrap_or_default();
        self.actions.push(action);
        let last = self.actions.len() - 1;
        &mut self.actions[last]
    }

    /// 追加循环
    pub fn add_loop(&mut self, cycle: LoopCycle) {
        self.loop_cycles.push(cycle);
    }

    /// `index` 处（或其之前最近的非暂停）动作的结束状态
    ///
    /// 暂停点不携带运动数据，链接时跳过。
    pub fn resolved_end_state(&self, index: usize) -> Option<ResolvedState> {
        self.actions
            .get(..=index)?
            .iter()
            .rev()
            .find(|action| !action.is_break())
            .map(LetterAction::end_state)
    }

    /// 针对当前文本解析动画
    ///
    /// # 参数
    /// - `letters`: 每个字符的字 / 词 / 行序号
    /// - `counts`: 字 / 词 / 行总数
    /// - `per`: 默认解析粒度
    pub fn prepare_data<R: Rng + ?Sized>(
        &mut self,
        letters: &[ProgressionIndices],
        counts: &PopulationCounts,
        per: AnimatePer,
        rng: &mut R,
    ) {
        self.letters = self.letters_to_animate.resolve(letters);
        self.prune_loops();

        for index in 0..self.actions.len() {
            let prev = index
                .checked_sub(1)
                .and_then(|prev| self.resolved_end_state(prev));
            self.actions[index].prepare_data(counts, prev.as_ref(), per, rng);
        }
        debug!(
            actions = self.actions.len(),
            letters = self.letters.len(),
            "动画数据已解析"
        );
    }

    /// 移除引用了不存在动作的循环
    fn prune_loops(&mut self) {
        let num_actions = self.actions.len();
        self.loop_cycles.retain(|cycle| {
            let valid = cycle.is_valid(num_actions);
            if !valid {
                warn!(
                    start = cycle.start_action,
                    end = cycle.end_action,
                    actions = num_actions,
                    "循环区间无效，已移除"
                );
            }
            valid
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progression::Vector3Progression;
    use glam::Vec3;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    /// "ab cd\nef"
    fn sample_letters() -> Vec<ProgressionIndices> {
        [(0, 0), (0, 0), (1, 0), (1, 0), (2, 1), (2, 1)]
            .iter()
            .enumerate()
            .map(|(letter, &(word, line))| ProgressionIndices { letter, word, line })
            .collect()
    }

    #[test]
    fn test_letters_to_animate() {
        let letters = sample_letters();
        assert_eq!(LettersToAnimate::All.resolve(&letters).len(), 6);
        assert_eq!(LettersToAnimate::LastLetter.resolve(&letters), vec![5]);
        assert_eq!(LettersToAnimate::FirstLetterWords.resolve(&letters), vec![0, 2, 4]);
        assert_eq!(LettersToAnimate::LastLetterWords.resolve(&letters), vec![1, 3, 5]);
        assert_eq!(LettersToAnimate::FirstLetterLines.resolve(&letters), vec![0, 4]);
        assert_eq!(LettersToAnimate::LastLine.resolve(&letters), vec![4, 5]);
        assert_eq!(LettersToAnimate::NthWord(2).resolve(&letters), vec![2, 3]);
        assert_eq!(LettersToAnimate::NthLine(2).resolve(&letters), vec![4, 5]);
        assert!(LettersToAnimate::NthWord(0).resolve(&letters).is_empty());
        assert_eq!(
            LettersToAnimate::Custom(vec![9, 3, 1, 3]).resolve(&letters),
            vec![1, 3]
        );
        assert!(LettersToAnimate::FirstLetter.resolve(&[]).is_empty());
    }

    #[test]
    fn test_prepare_prunes_invalid_loops() {
        let mut animation = LetterAnimation::new(vec![LetterAction::default(); 2])
            .with_loop(LoopCycle::new(0, 1, 1))
            .with_loop(LoopCycle::new(0, 2, 1))
            .with_loop(LoopCycle::new(1, 0, 1));
        let letters = sample_letters();
        let counts = PopulationCounts {
            letters: 6,
            words: 3,
            lines: 2,
        };
        animation.prepare_data(&letters, &counts, AnimatePer::Letter, &mut StdRng::seed_from_u64(1));
        assert_eq!(animation.loop_cycles, vec![LoopCycle::new(0, 1, 1)]);
        assert_eq!(animation.letters().len(), 6);
    }

    #[test]
    fn test_chain_skips_breaks() {
        let mut animation = LetterAnimation::new(vec![
            LetterAction {
                end_pos: Vector3Progression::constant(Vec3::X).into(),
                ..Default::default()
            },
            LetterAction::pause(1.0),
        ]);
        animation.add_action();
        assert!(animation.actions[2].offset_from_last);

        let letters = sample_letters();
        let counts = PopulationCounts {
            letters: 6,
            words: 3,
            lines: 2,
        };
        animation.prepare_data(&letters, &counts, AnimatePer::Letter, &mut StdRng::seed_from_u64(1));
        assert_eq!(animation.actions[2].start_pos.progression.values(), &[Vec3::X]);
        assert_eq!(
            animation.resolved_end_state(1).map(|s| s.positions),
            Some(vec![Vec3::X])
        );
    }

    #[test]
    fn test_deserialize_animation() {
        let json = r#"{
            "actions": [{ "duration": { "from": 2.0 } }],
            "loop_cycles": [{ "end_action": 0, "number_of_loops": 0 }],
            "letters_to_animate": { "NthWord": 2 }
        }"#;
        let animation: LetterAnimation = serde_json::from_str(json).unwrap();
        assert_eq!(animation.actions[0].duration.from, 2.0);
        assert_eq!(animation.letters_to_animate, LettersToAnimate::NthWord(2));
        assert_eq!(animation.state(), LetterState::Stopped);
    }
}
