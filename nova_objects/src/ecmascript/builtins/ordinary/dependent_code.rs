// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## Dependent code
//!
//! Compiled code that bakes in an assumption about a Map or a global
//! property cell registers itself here under a [`DependencyGroup`]. When the
//! assumption breaks, the whole group is deoptimized: the code ids are moved
//! to [`Agent::deoptimized_code`] for the consumer to act on.

use crate::ecmascript::execution::Agent;

/// Opaque identifier of a piece of compiled code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CodeId(pub u32);

/// The kind of assumption a piece of code depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyGroup {
    /// The representation or field type of a field did not generalize.
    FieldType,
    /// The Map stays stable: no property is added, removed or changed on an
    /// object (typically a prototype) carrying it.
    PrototypeCheck,
    /// The Map has no outgoing transitions (a store may reuse it).
    Transition,
    /// No elements are added to objects with this Map.
    ElementsCantBeAdded,
    /// The value or type of a global property cell did not change.
    PropertyCell,
}

#[derive(Debug, Default, Clone)]
pub struct DependentCode {
    entries: Vec<(DependencyGroup, CodeId)>,
}

impl DependentCode {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, group: DependencyGroup, code: CodeId) -> bool {
        self.entries.contains(&(group, code))
    }

    pub(crate) fn insert(&mut self, group: DependencyGroup, code: CodeId) {
        if !self.contains(group, code) {
            self.entries.push((group, code));
        }
    }

    /// Remove and return every code id registered under `group`.
    pub(crate) fn take_group(&mut self, group: DependencyGroup) -> Vec<CodeId> {
        let mut taken = Vec::new();
        self.entries.retain(|(g, code)| {
            if *g == group {
                taken.push(*code);
                false
            } else {
                true
            }
        });
        taken
    }
}

/// Record `codes` as deoptimized because of `group`.
pub(crate) fn mark_code_for_deoptimization(
    agent: &mut Agent,
    group: DependencyGroup,
    codes: Vec<CodeId>,
) {
    if codes.is_empty() {
        return;
    }
    log::debug!("deoptimizing {} code objects ({group:?})", codes.len());
    for code in codes {
        if !agent.deoptimized.contains(&code) {
            agent.deoptimized.push(code);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn take_group_only_removes_that_group() {
        let mut code = DependentCode::default();
        code.insert(DependencyGroup::FieldType, CodeId(1));
        code.insert(DependencyGroup::PrototypeCheck, CodeId(2));
        code.insert(DependencyGroup::FieldType, CodeId(3));
        code.insert(DependencyGroup::FieldType, CodeId(3));
        assert_eq!(
            code.take_group(DependencyGroup::FieldType),
            vec![CodeId(1), CodeId(3)]
        );
        assert!(code.contains(DependencyGroup::PrototypeCheck, CodeId(2)));
        assert!(!code.is_empty());
    }
}
