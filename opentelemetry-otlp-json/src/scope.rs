//! Grouping of adjacent items that share an instrumentation scope.
//!
//! Groups are formed in a single forward pass. Runs of the same scope that are not
//! adjacent stay separate, so `[A, B, A]` produces three groups. Callers wanting one
//! group per scope must sort their input first.
use opentelemetry::InstrumentationScope;
use serde::{ser::SerializeMap, Serialize, Serializer};

/// Items that belong to an instrumentation scope.
pub(crate) trait Scoped {
    fn scope(&self) -> &InstrumentationScope;
}

/// Scopes are the same when both name and version match.
fn same_scope(a: &InstrumentationScope, b: &InstrumentationScope) -> bool {
    a.name() == b.name() && a.version() == b.version()
}

/// A maximal run of adjacent items sharing one scope.
#[derive(Debug)]
pub(crate) struct ScopeGroup<'a, T> {
    pub(crate) scope: &'a InstrumentationScope,
    pub(crate) items: &'a [T],
}

#[derive(Debug, Clone, Copy)]
enum GroupState<'a> {
    Idle,
    Open {
        scope: &'a InstrumentationScope,
        start: usize,
    },
}

/// Iterator over the [`ScopeGroup`]s of a slice.
#[derive(Debug)]
pub(crate) struct ScopeGroups<'a, T> {
    items: &'a [T],
    position: usize,
    state: GroupState<'a>,
}

pub(crate) fn group_by_scope<T: Scoped>(items: &[T]) -> ScopeGroups<'_, T> {
    ScopeGroups {
        items,
        position: 0,
        state: GroupState::Idle,
    }
}

impl<'a, T: Scoped> Iterator for ScopeGroups<'a, T> {
    type Item = ScopeGroup<'a, T>;

    fn next(&mut self) -> Option<Self::Item> {
        let items = self.items;
        while let Some(item) = items.get(self.position) {
            let scope = item.scope();
            match self.state {
                GroupState::Idle => {
                    self.state = GroupState::Open {
                        scope,
                        start: self.position,
                    };
                }
                GroupState::Open {
                    scope: current,
                    start,
                } if !same_scope(current, scope) => {
                    let group = ScopeGroup {
                        scope: current,
                        items: &items[start..self.position],
                    };
                    self.state = GroupState::Open {
                        scope,
                        start: self.position,
                    };
                    self.position += 1;
                    return Some(group);
                }
                GroupState::Open { .. } => {}
            }
            self.position += 1;
        }

        match std::mem::replace(&mut self.state, GroupState::Idle) {
            GroupState::Open { scope, start } => Some(ScopeGroup {
                scope,
                items: &items[start..],
            }),
            GroupState::Idle => None,
        }
    }
}

/// Writes a scope as `{"name": .., "version": ..}`. Without a scope it writes `{}`.
pub(crate) struct ScopeWriter<'a> {
    scope: Option<&'a InstrumentationScope>,
}

impl<'a> ScopeWriter<'a> {
    pub(crate) fn new(scope: &'a InstrumentationScope) -> Self {
        ScopeWriter { scope: Some(scope) }
    }

    pub(crate) fn empty() -> Self {
        ScopeWriter { scope: None }
    }
}

impl Serialize for ScopeWriter<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let Some(scope) = self.scope else {
            return serializer.serialize_map(Some(0))?.end();
        };

        let version = scope.version().filter(|version| !version.is_empty());
        let mut map = serializer.serialize_map(Some(1 + usize::from(version.is_some())))?;
        map.serialize_entry("name", scope.name())?;
        if let Some(version) = version {
            map.serialize_entry("version", version)?;
        }
        map.end()
    }
}
