use std::fmt;

use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpType {
    Update,
    Delete,
}

impl OpType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpType::Update => "update",
            OpType::Delete => "delete",
        }
    }
}

impl fmt::Display for OpType {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One change observed on a watched key
///
/// `value` is set for updates only; it carries the latest value at the time
/// of the poll, so several writes between two polls collapse into one op.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Op {
    pub op_type: OpType,
    pub key: String,
    pub value: Option<String>,
}

impl Op {
    pub fn update(
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            op_type: OpType::Update,
            key: key.into(),
            value: Some(value.into()),
        }
    }

    pub fn delete(key: impl Into<String>) -> Self {
        Self {
            op_type: OpType::Delete,
            key: key.into(),
            value: None,
        }
    }

    pub fn is_update(&self) -> bool {
        self.op_type == OpType::Update
    }

    pub fn is_delete(&self) -> bool {
        self.op_type == OpType::Delete
    }
}

impl fmt::Display for Op {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{} {}={}", self.op_type, self.key, value),
            None => write!(f, "{} {}", self.op_type, self.key),
        }
    }
}
