use serde::Serialize;

/// Ordered relation-write operations for one relation attribute
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationMutationPlan {
    pub attribute: String,
    pub operations: Vec<RelationOperation>,
}

impl RelationMutationPlan {
    /// True when the payload replaces the relation instead of editing it
    pub fn is_full_replace(&self) -> bool {
        self.operations
            .iter()
            .any(|op| op.kind == RelationOperationKind::Set)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationOperation {
    pub kind: RelationOperationKind,
    pub targets: Vec<PositionedTarget>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationOperationKind {
    Connect,
    Disconnect,
    Set,
}

impl RelationOperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationOperationKind::Connect => "connect",
            RelationOperationKind::Disconnect => "disconnect",
            RelationOperationKind::Set => "set",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionedTarget {
    pub target: RelationTarget,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<RelationPosition>,
}

impl PositionedTarget {
    pub fn unplaced(target: RelationTarget) -> Self {
        Self {
            target,
            position: None,
        }
    }
}

/// Reference to a related entry by numeric id or by document id
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum RelationTarget {
    Id {
        id: i64,
    },
    #[serde(rename_all = "camelCase")]
    Document {
        document_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        locale: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        status: Option<String>,
    },
}

impl RelationTarget {
    pub fn id(id: i64) -> Self {
        RelationTarget::Id { id }
    }

    pub fn document(document_id: &str) -> Self {
        RelationTarget::Document {
            document_id: document_id.to_string(),
            locale: None,
            status: None,
        }
    }
}

/// Placement of a connected entry inside an ordered to-many relation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationPosition {
    Before(RelationTarget),
    After(RelationTarget),
    Start,
    End,
}
