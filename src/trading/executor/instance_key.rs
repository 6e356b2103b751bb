use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// 策略实例标识
///
/// (strategy_id, trading_pair_id) 二元组，仅作为路由与分片的身份键。
/// 结构相等，构造时校验两个 id 均为正数。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct InstanceKey {
    strategy_id: i64,
    trading_pair_id: i64,
}

impl InstanceKey {
    pub fn new(strategy_id: i64, trading_pair_id: i64) -> Result<Self> {
        if strategy_id <= 0 {
            return Err(anyhow!("非法的策略ID: {}", strategy_id));
        }
        if trading_pair_id <= 0 {
            return Err(anyhow!("非法的交易对ID: {}", trading_pair_id));
        }
        Ok(Self {
            strategy_id,
            trading_pair_id,
        })
    }

    pub fn strategy_id(&self) -> i64 {
        self.strategy_id
    }

    pub fn trading_pair_id(&self) -> i64 {
        self.trading_pair_id
    }

    /// 计算该实例归属的分片下标
    ///
    /// abs(31*strategy_id + trading_pair_id) mod stripe_count。
    /// 同一进程内同一 key 恒定映射到同一分片，跨进程无需一致。
    pub fn stripe_of(&self, stripe_count: usize) -> usize {
        let combined = self
            .strategy_id
            .wrapping_mul(31)
            .wrapping_add(self.trading_pair_id);
        (combined.unsigned_abs() % stripe_count.max(1) as u64) as usize
    }
}

impl std::fmt::Display for InstanceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.strategy_id, self.trading_pair_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_non_positive_ids() {
        assert!(InstanceKey::new(0, 1).is_err());
        assert!(InstanceKey::new(1, -2).is_err());
        assert!(InstanceKey::new(7, 3).is_ok());
    }

    #[test]
    fn test_structural_equality() {
        let a = InstanceKey::new(10, 20).unwrap();
        let b = InstanceKey::new(10, 20).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_stripe_is_stable_and_in_range() {
        let key = InstanceKey::new(12345, 678).unwrap();
        let first = key.stripe_of(8);
        for _ in 0..100 {
            assert_eq!(key.stripe_of(8), first);
        }
        assert!(first < 8);
    }
}
