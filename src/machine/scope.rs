//! Scope tree handed over by the machine
//!
//! - [`ScopeTree`]: arena of scopes rooted at the global scope
//! - [`ScopeNode`]: one lexical environment with ordered bindings
//! - [`BindingSlot`]: a named value plus its constant/mutable flag
//!
//! Scopes are addressed by [`ScopeId`]; parent and child links store ids, never
//! references, so the tree can be cloned and inspected freely.

use super::value::RawValue;
use serde::{Deserialize, Serialize};

/// Index of a scope inside its [`ScopeTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScopeId(pub usize);

/// What kind of evaluation context produced a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeKind {
    Global,
    /// The pass-through scope created for the top level of the user program
    Program,
    Block,
    Function,
}

/// A named binding inside a scope
#[derive(Debug, Clone)]
pub struct BindingSlot {
    pub name: String,
    pub value: RawValue,
    pub constant: bool,
}

/// One lexical scope
#[derive(Debug, Clone)]
pub struct ScopeNode {
    pub id: ScopeId,
    pub name: String,
    pub kind: ScopeKind,
    pub bindings: Vec<BindingSlot>, // Kept in declaration order
    pub parent: Option<ScopeId>,
    pub children: Vec<ScopeId>,
}

impl ScopeNode {
    /// Get a binding by name
    pub fn get(&self, name: &str) -> Option<&BindingSlot> {
        self.bindings.iter().find(|b| b.name == name)
    }
}

/// The scope tree of one machine step
#[derive(Debug, Clone)]
pub struct ScopeTree {
    nodes: Vec<ScopeNode>,
}

impl ScopeTree {
    /// Create a tree holding only a global root scope
    pub fn new(root_name: &str) -> Self {
        ScopeTree {
            nodes: vec![ScopeNode {
                id: ScopeId(0),
                name: root_name.to_string(),
                kind: ScopeKind::Global,
                bindings: Vec::new(),
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    /// The global scope
    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    /// Add a child scope under `parent`, returns its id
    ///
    /// # Panics
    ///
    /// Panics if `parent` does not belong to this tree.
    pub fn add_scope(&mut self, parent: ScopeId, name: &str, kind: ScopeKind) -> ScopeId {
        assert!(parent.0 < self.nodes.len(), "Unknown parent scope {:?}", parent);
        let id = ScopeId(self.nodes.len());
        self.nodes.push(ScopeNode {
            id,
            name: name.to_string(),
            kind,
            bindings: Vec::new(),
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Declare or overwrite a binding; a redeclared name keeps its original position
    pub fn bind(&mut self, scope: ScopeId, name: &str, value: RawValue, constant: bool) {
        let node = &mut self.nodes[scope.0];
        if let Some(slot) = node.bindings.iter_mut().find(|b| b.name == name) {
            slot.value = value;
            slot.constant = constant;
        } else {
            node.bindings.push(BindingSlot {
                name: name.to_string(),
                value,
                constant,
            });
        }
    }

    /// Get a scope by id
    pub fn get(&self, id: ScopeId) -> Option<&ScopeNode> {
        self.nodes.get(id.0)
    }

    /// Get a mutable scope by id
    pub fn get_mut(&mut self, id: ScopeId) -> Option<&mut ScopeNode> {
        self.nodes.get_mut(id.0)
    }

    /// All scopes in creation order
    pub fn scopes(&self) -> &[ScopeNode] {
        &self.nodes
    }

    /// Number of scopes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// A tree always has its root, so this is never true
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rebinding_keeps_position() {
        let mut tree = ScopeTree::new("global");
        let root = tree.root();
        tree.bind(root, "a", RawValue::Number(1.0), true);
        tree.bind(root, "b", RawValue::Number(2.0), true);
        tree.bind(root, "a", RawValue::Number(3.0), false);

        let node = tree.get(root).unwrap();
        let names: Vec<_> = node.bindings.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
        assert!(!node.get("a").unwrap().constant);
    }

    #[test]
    fn children_are_linked_both_ways() {
        let mut tree = ScopeTree::new("global");
        let program = tree.add_scope(tree.root(), "program", ScopeKind::Program);
        let block = tree.add_scope(program, "block", ScopeKind::Block);

        assert_eq!(tree.get(program).unwrap().children, vec![block]);
        assert_eq!(tree.get(block).unwrap().parent, Some(program));
        assert_eq!(tree.len(), 3);
    }
}
