//! The tree of lexical scopes built by the type checker.
//!
//! Every node remembers its position among its siblings, so that later
//! passes walking the syntax tree in the same order can verify that they
//! visit the scopes exactly as they were created.

use super::types::{Context, VariableInfo};
use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct ScopeId {
    raw: u32,
}

impl ScopeId {
    pub const ROOT: Self = Self { raw: 0 };
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.raw)
    }
}

/// A variable slot. The same slot may be visible from several scopes, as
/// happens with inherited attributes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct VarId {
    raw: u32,
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<ScopeId>,
    children: Vec<ScopeId>,
    locals: Vec<VarId>,
    index: usize,
}

#[derive(Debug, Clone)]
pub struct Scope {
    nodes: Vec<Node>,
    vars: Vec<VariableInfo>,
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl Scope {
    /// Create a tree consisting only of the root scope.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: vec![],
                locals: vec![],
                index: 0,
            }],
            vars: vec![],
        }
    }

    fn node(&self, id: ScopeId) -> &Node {
        &self.nodes[id.raw as usize]
    }

    pub fn create_child(&mut self, parent: ScopeId) -> ScopeId {
        let id = ScopeId {
            raw: self.nodes.len() as u32,
        };
        let index = self.node(parent).children.len();
        self.nodes.push(Node {
            parent: Some(parent),
            children: vec![],
            locals: vec![],
            index,
        });
        self.nodes[parent.raw as usize].children.push(id);
        id
    }

    /// Allocate a variable slot without making it visible anywhere.
    pub fn alloc_variable(&mut self, info: VariableInfo) -> VarId {
        let id = VarId {
            raw: self.vars.len() as u32,
        };
        self.vars.push(info);
        id
    }

    /// Make an existing variable visible in `scope`.
    pub fn attach(&mut self, scope: ScopeId, var: VarId) {
        self.nodes[scope.raw as usize].locals.push(var);
    }

    pub fn define_variable(&mut self, scope: ScopeId, info: VariableInfo) -> VarId {
        let var = self.alloc_variable(info);
        self.attach(scope, var);
        var
    }

    /// Resolve `name` from `scope` outward. Within a scope, earlier locals
    /// shadow later ones.
    pub fn find_variable(&self, scope: ScopeId, name: &str) -> Option<VarId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let node = self.node(id);
            if let Some(var) = node.locals.iter().find(|v| self.var(**v).name == name) {
                return Some(*var);
            }
            current = node.parent;
        }
        None
    }

    pub fn var(&self, id: VarId) -> &VariableInfo {
        &self.vars[id.raw as usize]
    }

    pub fn var_mut(&mut self, id: VarId) -> &mut VariableInfo {
        &mut self.vars[id.raw as usize]
    }

    pub fn locals(&self, scope: ScopeId) -> &[VarId] {
        &self.node(scope).locals
    }

    pub fn children(&self, scope: ScopeId) -> &[ScopeId] {
        &self.node(scope).children
    }

    pub fn parent(&self, scope: ScopeId) -> Option<ScopeId> {
        self.node(scope).parent
    }

    /// The position of `scope` among its siblings.
    pub fn index(&self, scope: ScopeId) -> usize {
        self.node(scope).index
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every variable slot in the tree.
    pub fn variables(&self) -> impl Iterator<Item = &VariableInfo> + '_ {
        self.vars.iter()
    }

    pub fn variables_mut(&mut self) -> impl Iterator<Item = &mut VariableInfo> + '_ {
        self.vars.iter_mut()
    }

    pub fn display<'s>(&'s self, context: &'s Context) -> impl fmt::Display + 's {
        ScopeDisplay {
            scope: self,
            context,
        }
    }
}

struct ScopeDisplay<'s> {
    scope: &'s Scope,
    context: &'s Context,
}

impl ScopeDisplay<'_> {
    fn fmt_node(&self, f: &mut fmt::Formatter<'_>, id: ScopeId, depth: usize) -> fmt::Result {
        let indent = depth * 2;
        writeln!(f, "{:indent$}scope {}", "", id, indent = indent)?;
        for var in self.scope.locals(id) {
            let info = self.scope.var(*var);
            writeln!(
                f,
                "{:indent$}  {}: {}",
                "",
                info.name,
                self.context.name(info.ty),
                indent = indent
            )?;
        }
        for child in self.scope.children(id) {
            self.fmt_node(f, *child, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for ScopeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_node(f, ScopeId::ROOT, 0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScopeDrift {
    #[error("scope {} has no child left to enter", parent)]
    MissingChild { parent: ScopeId },

    #[error("scope {} was created as child {} but entered as child {}", scope, expected, found)]
    IndexMismatch {
        scope: ScopeId,
        expected: usize,
        found: usize,
    },

    #[error("left scope {} after visiting {} of its {} children", scope, visited, total)]
    UnvisitedChildren {
        scope: ScopeId,
        visited: usize,
        total: usize,
    },

    #[error("left the root scope")]
    Unbalanced,
}

/// Replays a pre-order walk over an existing scope tree.
#[derive(Debug)]
pub struct ScopeCursor {
    // (scope, number of children entered so far)
    path: Vec<(ScopeId, usize)>,
}

impl Default for ScopeCursor {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeCursor {
    pub fn new() -> Self {
        Self {
            path: vec![(ScopeId::ROOT, 0)],
        }
    }

    pub fn current(&self) -> ScopeId {
        self.path.last().map_or(ScopeId::ROOT, |(id, _)| *id)
    }

    /// Move to the next unvisited child of the current scope.
    pub fn enter(&mut self, scope: &Scope) -> Result<ScopeId, ScopeDrift> {
        let (parent, visited) = self.path.last_mut().ok_or(ScopeDrift::Unbalanced)?;
        let child = *scope
            .children(*parent)
            .get(*visited)
            .ok_or(ScopeDrift::MissingChild { parent: *parent })?;
        if scope.index(child) != *visited {
            return Err(ScopeDrift::IndexMismatch {
                scope: child,
                expected: scope.index(child),
                found: *visited,
            });
        }
        *visited += 1;
        self.path.push((child, 0));
        Ok(child)
    }

    /// Return to the parent scope, checking that every child was visited.
    pub fn leave(&mut self, scope: &Scope) -> Result<(), ScopeDrift> {
        if self.path.len() <= 1 {
            return Err(ScopeDrift::Unbalanced);
        }
        self.check_complete(scope)?;
        self.path.pop();
        Ok(())
    }

    /// Finish the walk at the root scope.
    pub fn finish(self, scope: &Scope) -> Result<(), ScopeDrift> {
        if self.path.len() != 1 {
            return Err(ScopeDrift::Unbalanced);
        }
        self.check_complete(scope)
    }

    fn check_complete(&self, scope: &Scope) -> Result<(), ScopeDrift> {
        let (id, visited) = *self.path.last().ok_or(ScopeDrift::Unbalanced)?;
        let total = scope.children(id).len();
        if visited != total {
            return Err(ScopeDrift::UnvisitedChildren {
                scope: id,
                visited,
                total,
            });
        }
        Ok(())
    }
}
