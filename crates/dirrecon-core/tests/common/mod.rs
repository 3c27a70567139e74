//! In-memory directory used by the integration tests.
//!
//! Records every primitive call so tests can assert on call counts and
//! order, and lets a test make the next call of a given primitive fail with
//! a chosen result code.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use dirrecon_core::async_trait;
use dirrecon_core::error::{DirectoryError, DirectoryResult};
use dirrecon_core::operation::{AttributeSet, AttributeValue, ChangeSet};
use dirrecon_core::path::{DistinguishedPath, Rdn};
use dirrecon_core::result::OperationResult;
use dirrecon_core::traits::DirectoryConnection;
use dirrecon_core::types::OperationType;

/// Primitive operations of the fake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Compare,
    Modify,
    Rename,
    Move,
    Create,
    Delete,
    SetPassword,
}

/// A recorded primitive call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Compare {
        path: DistinguishedPath,
        attribute: String,
        value: AttributeValue,
    },
    Modify {
        path: DistinguishedPath,
        changes: ChangeSet,
    },
    Rename {
        path: DistinguishedPath,
        new_rdn: Rdn,
    },
    Move {
        path: DistinguishedPath,
        new_rdn: Rdn,
        new_parent: DistinguishedPath,
    },
    Create {
        path: DistinguishedPath,
        object_classes: Vec<String>,
        attributes: AttributeSet,
    },
    Delete {
        path: DistinguishedPath,
    },
    SetPassword {
        path: DistinguishedPath,
    },
}

impl Call {
    pub fn op(&self) -> Op {
        match self {
            Call::Compare { .. } => Op::Compare,
            Call::Modify { .. } => Op::Modify,
            Call::Rename { .. } => Op::Rename,
            Call::Move { .. } => Op::Move,
            Call::Create { .. } => Op::Create,
            Call::Delete { .. } => Op::Delete,
            Call::SetPassword { .. } => Op::SetPassword,
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    path: DistinguishedPath,
    attributes: Vec<(String, Vec<String>)>,
}

impl Entry {
    fn values(&self, attribute: &str) -> Option<&Vec<String>> {
        self.attributes
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(attribute))
            .map(|(_, values)| values)
    }

    fn replace(&mut self, attribute: &str, values: Vec<String>) {
        match self
            .attributes
            .iter_mut()
            .find(|(name, _)| name.eq_ignore_ascii_case(attribute))
        {
            Some((_, existing)) => *existing = values,
            None => self.attributes.push((attribute.to_string(), values)),
        }
    }

    fn set_path(&mut self, path: DistinguishedPath) {
        let naming_attribute = path.naming_attribute().to_string();
        let naming_value = path.naming_value().to_string();
        self.replace(&naming_attribute, vec![naming_value.clone()]);
        self.replace("name", vec![naming_value]);
        self.path = path;
    }
}

#[derive(Default)]
struct State {
    entries: Vec<Entry>,
    calls: Vec<Call>,
    failures: HashMap<Op, u32>,
    passwords: HashMap<String, String>,
}

/// Recording in-memory directory.
#[derive(Default)]
pub struct MemoryDirectory {
    state: Mutex<State>,
}

pub fn path(text: &str) -> DistinguishedPath {
    DistinguishedPath::parse(text).unwrap()
}

fn strings(value: &AttributeValue) -> Vec<String> {
    value
        .to_octets()
        .into_iter()
        .map(|v| String::from_utf8_lossy(&v).into_owned())
        .collect()
}

fn op_type(op: Op) -> OperationType {
    match op {
        Op::Compare => OperationType::Compare,
        Op::Modify | Op::SetPassword => OperationType::Modify,
        Op::Rename | Op::Move => OperationType::ModifyDn,
        Op::Create => OperationType::Add,
        Op::Delete => OperationType::Delete,
    }
}

fn failure(op: Op, code: u32, path: &DistinguishedPath) -> DirectoryError {
    DirectoryError::from_result(OperationResult::from_code(
        code,
        path.to_string(),
        "injected failure",
        op_type(op),
    ))
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry; the naming attribute and `name` are filled in from the path.
    pub fn with_entry(self, text: &str, attributes: &[(&str, &str)]) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let mut entry = Entry {
                path: path(text),
                attributes: attributes
                    .iter()
                    .map(|(name, value)| (name.to_string(), vec![value.to_string()]))
                    .collect(),
            };
            let p = entry.path.clone();
            entry.set_path(p);
            state.entries.push(entry);
        }
        self
    }

    /// Make the next call of `op` fail with `code`.
    pub fn fail_next(&self, op: Op, code: u32) {
        self.state.lock().unwrap().failures.insert(op, code);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Recorded calls, excluding compares.
    pub fn writes(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.op() != Op::Compare)
            .collect()
    }

    pub fn count(&self, op: Op) -> usize {
        self.calls().iter().filter(|c| c.op() == op).count()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn exists(&self, text: &str) -> bool {
        let p = path(text);
        self.state
            .lock()
            .unwrap()
            .entries
            .iter()
            .any(|e| e.path == p)
    }

    pub fn value(&self, text: &str, attribute: &str) -> Option<Vec<String>> {
        let p = path(text);
        self.state
            .lock()
            .unwrap()
            .entries
            .iter()
            .find(|e| e.path == p)
            .and_then(|e| e.values(attribute).cloned())
    }

    pub fn password(&self, text: &str) -> Option<String> {
        self.state.lock().unwrap().passwords.get(text).cloned()
    }

    fn record(&self, call: Call) -> Result<(), u32> {
        let mut state = self.state.lock().unwrap();
        let op = call.op();
        state.calls.push(call);
        match state.failures.remove(&op) {
            Some(code) => Err(code),
            None => Ok(()),
        }
    }

    fn with_entry_mut<T>(
        &self,
        op: Op,
        path: &DistinguishedPath,
        f: impl FnOnce(&mut Entry) -> T,
    ) -> DirectoryResult<T> {
        let mut state = self.state.lock().unwrap();
        let entry = state
            .entries
            .iter_mut()
            .find(|e| &e.path == path)
            .ok_or_else(|| failure(op, 32, path))?;
        Ok(f(entry))
    }

    fn relocate(
        &self,
        op: Op,
        path: &DistinguishedPath,
        new_path: DistinguishedPath,
    ) -> DirectoryResult<OperationResult> {
        {
            let state = self.state.lock().unwrap();
            if &new_path != path && state.entries.iter().any(|e| e.path == new_path) {
                return Err(failure(op, 68, &new_path));
            }
        }
        self.with_entry_mut(op, path, |entry| entry.set_path(new_path))?;
        Ok(OperationResult::success(op_type(op), path.to_string()))
    }
}

#[async_trait]
impl DirectoryConnection for MemoryDirectory {
    async fn compare(
        &self,
        path: &DistinguishedPath,
        attribute: &str,
        value: &AttributeValue,
    ) -> DirectoryResult<bool> {
        self.record(Call::Compare {
            path: path.clone(),
            attribute: attribute.to_string(),
            value: value.clone(),
        })
        .map_err(|code| failure(Op::Compare, code, path))?;

        let wanted = strings(value);
        self.with_entry_mut(Op::Compare, path, |entry| match entry.values(attribute) {
            Some(current) => wanted.iter().all(|w| current.contains(w)),
            None => false,
        })
    }

    async fn modify(
        &self,
        path: &DistinguishedPath,
        changes: &ChangeSet,
    ) -> DirectoryResult<OperationResult> {
        self.record(Call::Modify {
            path: path.clone(),
            changes: changes.clone(),
        })
        .map_err(|code| failure(Op::Modify, code, path))?;

        self.with_entry_mut(Op::Modify, path, |entry| {
            for change in changes {
                entry.replace(&change.name, strings(&change.value));
            }
        })?;
        Ok(OperationResult::success(OperationType::Modify, path.to_string()))
    }

    async fn rename(
        &self,
        path: &DistinguishedPath,
        new_rdn: &Rdn,
    ) -> DirectoryResult<OperationResult> {
        self.record(Call::Rename {
            path: path.clone(),
            new_rdn: new_rdn.clone(),
        })
        .map_err(|code| failure(Op::Rename, code, path))?;

        let new_path = match path.parent() {
            Ok(parent) => parent.child(new_rdn.clone()),
            Err(_) => DistinguishedPath::new(vec![new_rdn.clone()])?,
        };
        self.relocate(Op::Rename, path, new_path)
    }

    async fn move_to(
        &self,
        path: &DistinguishedPath,
        new_rdn: &Rdn,
        new_parent: &DistinguishedPath,
    ) -> DirectoryResult<OperationResult> {
        self.record(Call::Move {
            path: path.clone(),
            new_rdn: new_rdn.clone(),
            new_parent: new_parent.clone(),
        })
        .map_err(|code| failure(Op::Move, code, path))?;

        self.relocate(Op::Move, path, new_parent.child(new_rdn.clone()))
    }

    async fn create(
        &self,
        path: &DistinguishedPath,
        object_classes: &[&str],
        attributes: &AttributeSet,
    ) -> DirectoryResult<OperationResult> {
        self.record(Call::Create {
            path: path.clone(),
            object_classes: object_classes.iter().map(|s| s.to_string()).collect(),
            attributes: attributes.clone(),
        })
        .map_err(|code| failure(Op::Create, code, path))?;

        let mut state = self.state.lock().unwrap();
        if state.entries.iter().any(|e| &e.path == path) {
            return Err(failure(Op::Create, 68, path));
        }
        let mut entry = Entry {
            path: path.clone(),
            attributes: attributes
                .iter()
                .map(|(name, value)| (name.to_string(), strings(value)))
                .collect(),
        };
        entry.replace(
            "objectClass",
            object_classes.iter().map(|s| s.to_string()).collect(),
        );
        entry.set_path(path.clone());
        state.entries.push(entry);
        Ok(OperationResult::success(OperationType::Add, path.to_string()))
    }

    async fn delete(&self, path: &DistinguishedPath) -> DirectoryResult<OperationResult> {
        self.record(Call::Delete { path: path.clone() })
            .map_err(|code| failure(Op::Delete, code, path))?;

        let mut state = self.state.lock().unwrap();
        let before = state.entries.len();
        state.entries.retain(|e| &e.path != path);
        if state.entries.len() == before {
            return Err(failure(Op::Delete, 32, path));
        }
        Ok(OperationResult::success(OperationType::Delete, path.to_string()))
    }

    async fn set_password(
        &self,
        path: &DistinguishedPath,
        password: &str,
    ) -> DirectoryResult<OperationResult> {
        self.record(Call::SetPassword { path: path.clone() })
            .map_err(|code| failure(Op::SetPassword, code, path))?;

        self.with_entry_mut(Op::SetPassword, path, |_| ())?;
        self.state
            .lock()
            .unwrap()
            .passwords
            .insert(path.to_string(), password.to_string());
        Ok(OperationResult::success(OperationType::Modify, path.to_string()))
    }

    async fn check_credentials(&self, principal: &str, secret: &str) -> bool {
        !secret.is_empty()
            && self
                .state
                .lock()
                .unwrap()
                .passwords
                .get(principal)
                .is_some_and(|p| p == secret)
    }
}
