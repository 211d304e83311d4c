use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// 游戏内所有随机性的唯一来源：骰子点数、钞票抽取、事件牌洗牌。
///
/// 服务端默认使用操作系统熵初始化；测试和需要复盘的场景可以用固定种子，
/// 同一种子加上同样的玩家操作序列会得到完全相同的对局。
#[derive(Debug, Clone)]
pub struct GameRng {
    inner: StdRng,
}

impl GameRng {
    pub fn from_seed(seed: u64) -> Self {
        GameRng { inner: StdRng::seed_from_u64(seed) }
    }

    pub fn from_entropy() -> Self {
        GameRng { inner: StdRng::from_os_rng() }
    }

    /// 掷一颗六面骰，返回 1..=6
    pub fn roll_die(&mut self) -> u8 {
        self.inner.random_range(1..=6)
    }

    /// 在 [0, len) 中均匀选一个下标。调用方保证 len > 0。
    pub fn pick_index(&mut self, len: usize) -> usize {
        self.inner.random_range(0..len)
    }

    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.inner);
    }
}

impl Default for GameRng {
    fn default() -> Self {
        Self::from_entropy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = GameRng::from_seed(7);
        let mut b = GameRng::from_seed(7);
        let rolls_a: Vec<u8> = (0..32).map(|_| a.roll_die()).collect();
        let rolls_b: Vec<u8> = (0..32).map(|_| b.roll_die()).collect();
        assert_eq!(rolls_a, rolls_b);
    }

    #[test]
    fn test_roll_die_stays_in_range() {
        let mut rng = GameRng::from_seed(1);
        for _ in 0..1000 {
            let face = rng.roll_die();
            assert!((1..=6).contains(&face), "点数越界: {}", face);
        }
    }
}
