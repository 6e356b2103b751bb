use serde::{Deserialize, Serialize};

/// 条件引擎中的类型化值
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum TypedValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl TypedValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            TypedValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            TypedValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// 渲染进命中明细与决策依据
    pub fn render(&self) -> String {
        match self {
            TypedValue::Bool(b) => b.to_string(),
            TypedValue::Number(n) => n.to_string(),
            TypedValue::Text(s) => s.clone(),
        }
    }
}

impl From<f64> for TypedValue {
    fn from(v: f64) -> Self {
        TypedValue::Number(v)
    }
}

impl From<&str> for TypedValue {
    fn from(v: &str) -> Self {
        TypedValue::Text(v.to_string())
    }
}

impl From<bool> for TypedValue {
    fn from(v: bool) -> Self {
        TypedValue::Bool(v)
    }
}
