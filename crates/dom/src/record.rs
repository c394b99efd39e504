use indextree::NodeId;

/// The category of a [`MutationRecord`], used to match observer options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    ChildList,
    Attributes,
    CharacterData,
}

/// An immutable description of one edit made to an observed tree.
///
/// Records refer to live nodes by handle. By the time a batch is consumed the
/// nodes may have changed again, so consumers read current state from the
/// document rather than from the record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationRecord {
    /// Children were inserted into and/or removed from `target`.
    ChildList {
        target: NodeId,
        added: Vec<NodeId>,
        removed: Vec<NodeId>,
        previous_sibling: Option<NodeId>,
        next_sibling: Option<NodeId>,
    },
    /// An attribute of the element `target` was set or removed.
    Attributes {
        target: NodeId,
        name: String,
        old_value: Option<String>,
    },
    /// The data of the text or comment node `target` changed.
    CharacterData {
        target: NodeId,
        old_value: Option<String>,
    },
}

impl MutationRecord {
    /// The node the edit was made on (the parent, for child list changes).
    pub const fn target(&self) -> NodeId {
        match self {
            Self::ChildList { target, .. }
            | Self::Attributes { target, .. }
            | Self::CharacterData { target, .. } => *target,
        }
    }

    pub const fn kind(&self) -> MutationKind {
        match self {
            Self::ChildList { .. } => MutationKind::ChildList,
            Self::Attributes { .. } => MutationKind::Attributes,
            Self::CharacterData { .. } => MutationKind::CharacterData,
        }
    }

    /// Copy of this record with old values dropped unless requested.
    pub(crate) fn filtered(&self, keep_attribute_old: bool, keep_data_old: bool) -> Self {
        match self {
            Self::Attributes {
                target,
                name,
                old_value,
            } => Self::Attributes {
                target: *target,
                name: name.clone(),
                old_value: old_value.clone().filter(|_| keep_attribute_old),
            },
            Self::CharacterData { target, old_value } => Self::CharacterData {
                target: *target,
                old_value: old_value.clone().filter(|_| keep_data_old),
            },
            Self::ChildList { .. } => self.clone(),
        }
    }
}
