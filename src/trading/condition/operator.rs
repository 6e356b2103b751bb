use serde::{Deserialize, Serialize};

use super::typed_value::TypedValue;

/// 比较算子
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operator {
    Gt,
    Lt,
    Gte,
    Lte,
    Eq,
    Neq,
    Contains,
    StartsWith,
    EndsWith,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Gt => "GT",
            Operator::Lt => "LT",
            Operator::Gte => "GTE",
            Operator::Lte => "LTE",
            Operator::Eq => "EQ",
            Operator::Neq => "NEQ",
            Operator::Contains => "CONTAINS",
            Operator::StartsWith => "STARTS_WITH",
            Operator::EndsWith => "ENDS_WITH",
        }
    }

    /// 执行比较
    ///
    /// 数值算子要求两侧都是数值，字符串算子要求两侧都是字符串，
    /// 类型不匹配按不命中处理（EQ/NEQ 跨类型按值不等对待）。
    pub fn apply(&self, left: &TypedValue, right: &TypedValue) -> bool {
        match self {
            Operator::Gt | Operator::Lt | Operator::Gte | Operator::Lte => {
                match (left.as_number(), right.as_number()) {
                    (Some(l), Some(r)) => match self {
                        Operator::Gt => l > r,
                        Operator::Lt => l < r,
                        Operator::Gte => l >= r,
                        Operator::Lte => l <= r,
                        _ => unreachable!(),
                    },
                    _ => false,
                }
            }
            Operator::Eq => left == right,
            Operator::Neq => left != right,
            Operator::Contains | Operator::StartsWith | Operator::EndsWith => {
                match (left.as_text(), right.as_text()) {
                    (Some(l), Some(r)) => match self {
                        Operator::Contains => l.contains(r),
                        Operator::StartsWith => l.starts_with(r),
                        Operator::EndsWith => l.ends_with(r),
                        _ => unreachable!(),
                    },
                    _ => false,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_operators() {
        let l = TypedValue::Number(25.0);
        let r = TypedValue::Number(30.0);
        assert!(Operator::Lt.apply(&l, &r));
        assert!(!Operator::Gt.apply(&l, &r));
        assert!(Operator::Lte.apply(&l, &l));
        assert!(Operator::Gte.apply(&r, &l));
    }

    #[test]
    fn test_string_operators() {
        let l = TypedValue::from("BTC-USDT");
        assert!(Operator::StartsWith.apply(&l, &TypedValue::from("BTC")));
        assert!(Operator::EndsWith.apply(&l, &TypedValue::from("USDT")));
        assert!(Operator::Contains.apply(&l, &TypedValue::from("-")));
    }

    #[test]
    fn test_type_mismatch_never_hits() {
        let l = TypedValue::Number(1.0);
        let r = TypedValue::from("1");
        assert!(!Operator::Gt.apply(&l, &r));
        assert!(!Operator::Eq.apply(&l, &r));
        assert!(Operator::Neq.apply(&l, &r));
    }
}
