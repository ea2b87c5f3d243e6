//! # Progression 模块
//!
//! 变量进度：把一份 from / to / to_to 描述解析为针对一组目标
//! （逐字、逐词或逐行）的值数组。
//!
//! ## 解析规则
//!
//! - `Constant`：只解析出一个共享值 `from`
//! - `Random`：每个目标在 `from` 与 `to` 之间独立采样
//! - `Eased`：目标按 `i / (P - 1)` 分布在曲线上；启用 `to_to` 时曲线在 0.5 处
//!   一分为二，后半段使用镜像缓动
//!
//! 启用 `offset_from_last` 时，每个值都叠加在上一个动作已解析的结束值之上；
//! 长度为 1 的偏移数组会广播到所有目标。

mod value;

use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

pub use value::ProgressionValue;

use crate::color::{Color, VertexColor};
use crate::easing::EasingEquation;
use crate::error::AnimationError;

/// 进度模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ValueProgression {
    /// 所有目标共享同一个值
    #[default]
    Constant,
    /// 每个目标随机取值
    Random,
    /// 按目标序号沿缓动曲线分布
    Eased,
}

/// 进度解析的粒度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AnimatePer {
    #[default]
    Letter,
    Word,
    Line,
}

/// 一个字符在各粒度下的序号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProgressionIndices {
    pub letter: usize,
    pub word: usize,
    pub line: usize,
}

impl ProgressionIndices {
    /// 按粒度取序号
    pub fn get(&self, per: AnimatePer) -> usize {
        match per {
            AnimatePer::Letter => self.letter,
            AnimatePer::Word => self.word,
            AnimatePer::Line => self.line,
        }
    }
}

/// 各粒度下的目标总数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PopulationCounts {
    pub letters: usize,
    pub words: usize,
    pub lines: usize,
}

impl PopulationCounts {
    /// 按粒度取总数，至少为 1
    pub fn get(&self, per: AnimatePer) -> usize {
        let count = match per {
            AnimatePer::Letter => self.letters,
            AnimatePer::Word => self.words,
            AnimatePer::Line => self.lines,
        };
        count.max(1)
    }
}

/// 变量进度
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Progression<T: ProgressionValue> {
    pub mode: ValueProgression,
    /// `Eased` 模式下分布所用的曲线
    pub ease: EasingEquation,
    pub from: T,
    pub to: T,
    pub to_to: T,
    /// 启用第三个值 `to_to`
    pub use_to_to: bool,
    /// 叠加在上一个动作的结束值之上
    pub offset_from_last: bool,
    /// 随机值在每次循环重放时重新采样
    pub unique_randoms: bool,
    /// 覆盖动画默认的解析粒度
    pub animate_per_override: Option<AnimatePer>,
    #[serde(skip)]
    values: Vec<T>,
}

impl<T: ProgressionValue> Default for Progression<T> {
    fn default() -> Self {
        Self::constant(T::ZERO)
    }
}

/// 偏移数组的广播读取：长度为 1 时所有目标共用，越界时取最后一个
fn broadcast<T: ProgressionValue>(offsets: &[T], index: usize) -> T {
    match offsets {
        [] => T::ZERO,
        [single] => *single,
        _ => offsets[index.min(offsets.len() - 1)],
    }
}

impl<T: ProgressionValue> Progression<T> {
    /// 常量进度
    pub fn constant(value: T) -> Self {
        Self {
            mode: ValueProgression::Constant,
            ease: EasingEquation::Linear,
            from: value,
            to: value,
            to_to: value,
            use_to_to: false,
            offset_from_last: false,
            unique_randoms: false,
            animate_per_override: None,
            values: Vec::new(),
        }
    }

    /// 缓动分布进度
    pub fn eased(from: T, to: T, ease: EasingEquation) -> Self {
        Self {
            mode: ValueProgression::Eased,
            ease,
            to,
            ..Self::constant(from)
        }
    }

    /// 随机进度
    pub fn random(from: T, to: T) -> Self {
        Self {
            mode: ValueProgression::Random,
            to,
            ..Self::constant(from)
        }
    }

    /// 启用第三个值
    pub fn with_to_to(mut self, to_to: T) -> Self {
        self.to_to = to_to;
        self.use_to_to = true;
        self
    }

    /// 设置是否叠加上一个动作的结束值
    pub fn with_offset_from_last(mut self, offset_from_last: bool) -> Self {
        self.offset_from_last = offset_from_last;
        self
    }

    /// 设置循环重放时是否重新随机
    pub fn with_unique_randoms(mut self, unique: bool) -> Self {
        self.unique_randoms = unique;
        self
    }

    /// 覆盖解析粒度
    pub fn with_animate_per(mut self, per: AnimatePer) -> Self {
        self.animate_per_override = Some(per);
        self
    }

    /// 是否为"每次重放重新采样"的随机进度
    pub fn is_unique_random(&self) -> bool {
        self.mode == ValueProgression::Random && self.unique_randoms
    }

    /// 本进度实际使用的粒度
    pub fn animate_per(&self, default_per: AnimatePer) -> AnimatePer {
        self.animate_per_override.unwrap_or(default_per)
    }

    /// 取字符在本进度下的序号
    pub fn progression_index(&self, indices: &ProgressionIndices, default_per: AnimatePer) -> usize {
        indices.get(self.animate_per(default_per))
    }

    /// 已解析的值
    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// 是否已经解析
    pub fn is_resolved(&self) -> bool {
        !self.values.is_empty()
    }

    /// 直接替换解析结果（复制上一个动作的结束值时使用）
    pub(crate) fn set_values(&mut self, values: Vec<T>) {
        self.values = values;
    }

    /// 按序号读取解析值
    ///
    /// 多个值时按序号取；只有一个值时所有目标共用；未解析时返回类型默认值。
    pub fn value_at(&self, index: usize) -> T {
        match self.values.as_slice() {
            [] => T::UNRESOLVED,
            [single] => *single,
            values => values.get(index).copied().unwrap_or(T::UNRESOLVED),
        }
    }

    /// 读取某个字符的解析值
    pub fn value(&self, indices: &ProgressionIndices, default_per: AnimatePer) -> T {
        self.value_at(self.progression_index(indices, default_per))
    }

    /// 读取解析值，未解析时报错
    pub fn try_value(
        &self,
        indices: &ProgressionIndices,
        default_per: AnimatePer,
    ) -> Result<T, AnimationError> {
        if self.values.is_empty() {
            return Err(AnimationError::invalid_state(
                "进度尚未解析，需先调用 prepare_data",
            ));
        }
        Ok(self.value(indices, default_per))
    }

    /// 在 `from`、`to`、`to_to` 构成的曲线上取第 `pos` 处的值
    fn eased_at(&self, pos: f32) -> T {
        if self.use_to_to {
            if pos <= 0.5 {
                T::interpolate(self.from, self.to, self.ease.ease(pos / 0.5))
            } else {
                let t = self.ease.opposite().ease((pos - 0.5) / 0.5);
                T::interpolate(self.to, self.to_to, t)
            }
        } else {
            T::interpolate(self.from, self.to, self.ease.ease(pos))
        }
    }

    fn delta_at<R: Rng + ?Sized>(&self, index: usize, count: usize, rng: &mut R) -> T {
        match self.mode {
            ValueProgression::Constant => self.from,
            ValueProgression::Random => T::sample(self.from, self.to, rng),
            ValueProgression::Eased => {
                let pos = if count <= 1 {
                    0.0
                } else {
                    index as f32 / (count - 1) as f32
                };
                self.eased_at(pos)
            }
        }
    }

    /// 针对 `count` 个目标解析值数组
    ///
    /// # 参数
    /// - `count`: 目标数量，0 按 1 处理
    /// - `offsets`: 上一个动作的结束值，仅在 `offset_from_last` 时使用
    pub fn resolve<R: Rng + ?Sized>(&mut self, count: usize, offsets: Option<&[T]>, rng: &mut R) {
        let count = count.max(1);
        let offsets = if self.offset_from_last { offsets } else { None };
        let per_target = matches!(
            self.mode,
            ValueProgression::Eased | ValueProgression::Random
        ) || offsets.is_some_and(|o| o.len() > 1);
        let len = if per_target { count } else { 1 };

        let values: Vec<T> = (0..len)
            .map(|index| {
                let base = offsets.map_or(T::ZERO, |o| broadcast(o, index));
                base.offset_by(self.delta_at(index, len, rng))
            })
            .collect();
        self.values = values;
    }

    /// 只为一个字符重新随机采样
    ///
    /// 偏移规则与 [`Progression::resolve`] 相同；只有一个共享值时不做任何事。
    pub fn resolve_unique<R: Rng + ?Sized>(
        &mut self,
        indices: &ProgressionIndices,
        default_per: AnimatePer,
        offsets: Option<&[T]>,
        rng: &mut R,
    ) -> Result<(), AnimationError> {
        if self.values.is_empty() {
            return Err(AnimationError::invalid_state(
                "唯一随机值无法在进度解析前重新采样",
            ));
        }
        let index = self.progression_index(indices, default_per);
        let base = match offsets {
            Some(o) if self.offset_from_last => broadcast(o, index),
            _ => T::ZERO,
        };
        let value = base.offset_by(T::sample(self.from, self.to, rng));
        if let Some(slot) = self.values.get_mut(index) {
            *slot = value;
        }
        Ok(())
    }
}

pub type FloatProgression = Progression<f32>;
pub type Vector3Progression = Progression<Vec3>;
pub type ColorProgression = Progression<Color>;
pub type VertexColorProgression = Progression<VertexColor>;

impl VertexColorProgression {
    /// 由单色进度得到等价的四角进度
    ///
    /// 只复制描述，不复制解析结果。
    pub fn from_flat(flat: &ColorProgression) -> Self {
        Self {
            mode: flat.mode,
            ease: flat.ease,
            from: flat.from.into(),
            to: flat.to.into(),
            to_to: flat.to_to.into(),
            use_to_to: flat.use_to_to,
            offset_from_last: flat.offset_from_last,
            unique_randoms: flat.unique_randoms,
            animate_per_override: flat.animate_per_override,
            values: Vec::new(),
        }
    }
}

/// 位置进度：在向量进度之上可选择忽略字符的布局位置
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PositionProgression {
    #[serde(flatten)]
    pub progression: Vector3Progression,
    /// 为 true 时位置值为绝对坐标，不叠加字符的布局偏移
    #[serde(default)]
    pub force_position_override: bool,
}

impl PositionProgression {
    pub fn new(progression: Vector3Progression) -> Self {
        Self {
            progression,
            force_position_override: false,
        }
    }

    /// 字符的实际位置：布局偏移（除非被覆盖）加上解析值
    pub fn resolve_against(
        &self,
        base_offset: Vec3,
        indices: &ProgressionIndices,
        default_per: AnimatePer,
    ) -> Vec3 {
        let base = if self.force_position_override {
            Vec3::ZERO
        } else {
            base_offset
        };
        base + self.progression.value(indices, default_per)
    }
}

impl From<Vector3Progression> for PositionProgression {
    fn from(progression: Vector3Progression) -> Self {
        Self::new(progression)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const EPS: f32 = 1e-5;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn test_constant_resolves_single_value() {
        let mut p = FloatProgression::constant(2.5);
        p.resolve(10, None, &mut rng());
        assert_eq!(p.values(), &[2.5]);
        assert_eq!(p.value_at(7), 2.5);
    }

    #[test]
    fn test_zero_count_treated_as_one() {
        let mut p = FloatProgression::eased(0.0, 1.0, EasingEquation::Linear);
        p.resolve(0, None, &mut rng());
        assert_eq!(p.values(), &[0.0]);
    }

    #[test]
    fn test_eased_endpoints() {
        for count in 1..12 {
            let mut p = FloatProgression::eased(3.0, -1.0, EasingEquation::CubicEaseOut);
            p.resolve(count, None, &mut rng());
            assert_eq!(p.values().len(), count);
            assert!((p.value_at(0) - 3.0).abs() < EPS);
            if count > 1 {
                assert!((p.value_at(count - 1) - -1.0).abs() < EPS);
            }
        }
    }

    #[test]
    fn test_eased_to_to_splits_curve() {
        let mut p = FloatProgression::eased(0.0, 10.0, EasingEquation::QuadEaseIn).with_to_to(0.0);
        p.resolve(5, None, &mut rng());
        let v = p.values();
        assert!((v[0] - 0.0).abs() < EPS);
        assert!((v[2] - 10.0).abs() < EPS);
        assert!((v[4] - 0.0).abs() < EPS);
        // 前半段 QuadEaseIn(0.5) = 0.25
        assert!((v[1] - 2.5).abs() < EPS);
        // 后半段使用 QuadEaseOut(0.5) = 0.75
        assert!((v[3] - 2.5).abs() < EPS);
    }

    #[test]
    fn test_random_within_bounds() {
        let mut rng = rng();
        let mut p = Vector3Progression::random(Vec3::new(-1.0, 5.0, 0.0), Vec3::new(1.0, 2.0, 0.0));
        p.resolve(200, None, &mut rng);
        for v in p.values() {
            assert!((-1.0..=1.0).contains(&v.x));
            assert!((2.0..=5.0).contains(&v.y));
            assert_eq!(v.z, 0.0);
        }
    }

    #[test]
    fn test_random_is_deterministic_for_seed() {
        let mut a = FloatProgression::random(0.0, 1.0);
        let mut b = a.clone();
        a.resolve(8, None, &mut rng());
        b.resolve(8, None, &mut rng());
        assert_eq!(a.values(), b.values());
    }

    #[test]
    fn test_offset_broadcasts_single_value() {
        let offsets = [Vec3::new(1.0, 0.0, 0.0)];
        let mut p = Vector3Progression::eased(Vec3::ZERO, Vec3::new(0.0, 4.0, 0.0), EasingEquation::Linear)
            .with_offset_from_last(true);
        p.resolve(3, Some(&offsets), &mut rng());
        assert_eq!(p.values()[0], Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(p.values()[1], Vec3::new(1.0, 2.0, 0.0));
        assert_eq!(p.values()[2], Vec3::new(1.0, 4.0, 0.0));
    }

    #[test]
    fn test_constant_with_per_target_offsets_expands() {
        let offsets = [Vec3::X, Vec3::Y, Vec3::Z];
        let mut p = Vector3Progression::constant(Vec3::ONE).with_offset_from_last(true);
        p.resolve(3, Some(&offsets), &mut rng());
        assert_eq!(p.values().len(), 3);
        assert_eq!(p.values()[2], Vec3::new(1.0, 1.0, 2.0));
    }

    #[test]
    fn test_offsets_ignored_without_flag() {
        let offsets = [Vec3::X, Vec3::Y];
        let mut p = Vector3Progression::constant(Vec3::ONE);
        p.resolve(2, Some(&offsets), &mut rng());
        assert_eq!(p.values(), &[Vec3::ONE]);
    }

    #[test]
    fn test_value_uses_animate_per_override() {
        let mut p = FloatProgression::eased(0.0, 2.0, EasingEquation::Linear).with_animate_per(AnimatePer::Word);
        p.resolve(3, None, &mut rng());
        let indices = ProgressionIndices {
            letter: 0,
            word: 2,
            line: 0,
        };
        assert_eq!(p.value(&indices, AnimatePer::Letter), 2.0);
    }

    #[test]
    fn test_unresolved_value() {
        let p = ColorProgression::constant(Color::BLACK);
        assert_eq!(p.value_at(0), Color::WHITE);
        let err = p.try_value(&ProgressionIndices::default(), AnimatePer::Letter);
        assert!(matches!(err, Err(AnimationError::InvalidState { .. })));
    }

    #[test]
    fn test_resolve_unique_redraws_one_entry() {
        let mut rng = rng();
        let mut p = FloatProgression::random(0.0, 100.0).with_unique_randoms(true);
        assert!(p.is_unique_random());
        assert!(p.resolve_unique(&ProgressionIndices::default(), AnimatePer::Letter, None, &mut rng).is_err());

        p.resolve(4, None, &mut rng);
        let before = p.values().to_vec();
        let indices = ProgressionIndices {
            letter: 2,
            word: 0,
            line: 0,
        };
        p.resolve_unique(&indices, AnimatePer::Letter, None, &mut rng).unwrap();
        assert_eq!(p.values()[0], before[0]);
        assert_eq!(p.values()[1], before[1]);
        assert_eq!(p.values()[3], before[3]);
        assert!((0.0..=100.0).contains(&p.values()[2]));
    }

    #[test]
    fn test_vertex_from_flat() {
        let flat = ColorProgression::eased(Color::BLACK, Color::WHITE, EasingEquation::SineEaseIn)
            .with_offset_from_last(true);
        let vc = VertexColorProgression::from_flat(&flat);
        assert_eq!(vc.mode, ValueProgression::Eased);
        assert_eq!(vc.ease, EasingEquation::SineEaseIn);
        assert_eq!(vc.to.bottom_left, Color::WHITE);
        assert!(vc.offset_from_last);
        assert!(!vc.is_resolved());
    }

    #[test]
    fn test_position_progression_deserialize() {
        let json = r#"{ "mode": "Eased", "from": [0.0, 0.0, 0.0], "to": [1.0, 0.0, 0.0], "force_position_override": true }"#;
        let p: PositionProgression = serde_json::from_str(json).unwrap();
        assert!(p.force_position_override);
        assert_eq!(p.progression.mode, ValueProgression::Eased);
        assert_eq!(p.progression.to, Vec3::X);
        assert_eq!(p.progression.ease, EasingEquation::Linear);
    }
}
