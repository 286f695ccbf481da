//! Semantic analysis, run as four passes over the syntax tree.
//!
//! 1. [`collector`] registers the class names,
//! 2. [`builder`] links the hierarchy and resolves the signatures,
//! 3. [`checker`] types every expression and builds the scope tree,
//! 4. [`inferer`] resolves the `AUTO_TYPE` declarations.

pub mod builder;
pub mod checker;
pub mod collector;
pub mod inferer;
pub mod scope;
pub mod types;

pub use self::{
    scope::{Scope, ScopeCursor, ScopeDrift, ScopeId, VarId},
    types::{Attribute, Context, ContextError, Method, Type, TypeId, VariableInfo},
};
