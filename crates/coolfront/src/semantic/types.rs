//! The type registry (Context) and the signatures of classes.

use crate::diagnostics::{ErrorKind, Position};
use lrkit::types::Map;
use std::{fmt, iter};

/// An index into the [`Context`] arena.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TypeId {
    raw: u32,
}

impl TypeId {
    pub const SELF_TYPE: Self = Self::new(0);
    pub const AUTO_TYPE: Self = Self::new(1);
    pub const ERROR: Self = Self::new(2);
    pub const OBJECT: Self = Self::new(3);
    pub const IO: Self = Self::new(4);
    pub const INT: Self = Self::new(5);
    pub const STRING: Self = Self::new(6);
    pub const BOOL: Self = Self::new(7);

    const fn new(raw: u32) -> Self {
        Self { raw }
    }

    #[inline]
    pub const fn into_raw(self) -> u32 {
        self.raw
    }

    /// Return `false` for the three sentinel types.
    pub fn is_concrete(self) -> bool {
        !matches!(self, Self::SELF_TYPE | Self::AUTO_TYPE | Self::ERROR)
    }
}

/// The declared type of a variable, parameter or return value.
///
/// A declaration written as `AUTO_TYPE` (or omitted) starts unresolved and is
/// fixed by the first concrete type observed for it. Later observations only
/// widen it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableInfo {
    pub name: String,
    pub ty: TypeId,
    pub auto: bool,
    pub inferred: bool,
}

impl VariableInfo {
    pub fn new(name: impl Into<String>, ty: TypeId) -> Self {
        Self {
            name: name.into(),
            ty,
            auto: ty == TypeId::AUTO_TYPE,
            inferred: false,
        }
    }

    /// Return `true` if the declaration is still waiting for inference.
    pub fn is_unresolved(&self) -> bool {
        self.auto && !self.inferred
    }

    /// Observe the type expected from a use site. Only an unresolved
    /// variable is affected.
    pub fn observe_hint(&mut self, ty: TypeId) -> bool {
        if !self.is_unresolved() || !ty.is_concrete() {
            return false;
        }
        self.ty = ty;
        self.inferred = true;
        true
    }

    /// Observe the type of a value flowing into the variable.
    pub fn observe_value(&mut self, ty: TypeId, context: &Context) -> bool {
        if !self.auto || !ty.is_concrete() {
            return false;
        }
        if !self.inferred {
            self.ty = ty;
            self.inferred = true;
            return true;
        }
        let joined = context.union(self.ty, ty);
        let changed = joined != self.ty;
        self.ty = joined;
        changed
    }

    /// Merge what two views of the same declaration have learned.
    pub fn merge(&mut self, other: &VariableInfo, context: &Context) -> bool {
        match (self.inferred, other.inferred) {
            (_, false) => false,
            (false, true) => {
                self.ty = other.ty;
                self.inferred = true;
                true
            }
            (true, true) => self.observe_value(other.ty, context),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub ty: TypeId,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Method {
    pub name: String,
    pub param_names: Vec<String>,
    pub params: Vec<VariableInfo>,
    pub ret: VariableInfo,
    pub pos: Position,
}

impl Method {
    fn builtin(name: &str, params: &[(&str, TypeId)], ret: TypeId) -> Self {
        Self {
            name: name.to_owned(),
            param_names: params.iter().map(|(n, _)| (*n).to_owned()).collect(),
            params: params
                .iter()
                .map(|(n, ty)| VariableInfo::new(*n, *ty))
                .collect(),
            ret: VariableInfo::new(name, ret),
            pos: Position::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Type {
    pub name: String,
    pub parent: Option<TypeId>,
    pub attributes: Vec<Attribute>,
    pub methods: Map<String, Method>,
    /// Cannot be inherited from.
    pub sealed: bool,
}

impl Type {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            parent: None,
            attributes: vec![],
            methods: Map::default(),
            sealed: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    #[error("type `{}` is already defined", _0)]
    DuplicateType(String),

    #[error("type `{}` is not defined", _0)]
    TypeNotFound(String),

    #[error("attribute `{}` is already defined in `{}`", name, class)]
    AttributeAlreadyDefined { name: String, class: String },

    #[error("method `{}` is already defined in `{}`", name, class)]
    MethodAlreadyDefined { name: String, class: String },
}

impl From<ContextError> for ErrorKind {
    fn from(err: ContextError) -> Self {
        match err {
            ContextError::DuplicateType(name) => Self::DuplicateType(name),
            ContextError::TypeNotFound(name) => Self::TypeNotFound(name),
            ContextError::AttributeAlreadyDefined { name, class } => {
                Self::AttributeAlreadyDefined { name, class }
            }
            ContextError::MethodAlreadyDefined { name, class } => {
                Self::MethodAlreadyDefined { name, class }
            }
        }
    }
}

/// The arena of all types known to a compilation.
#[derive(Debug, Clone)]
pub struct Context {
    types: Vec<Type>,
    names: Map<String, TypeId>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    /// Create a context holding the sentinel types and the (still empty)
    /// built-in classes.
    pub fn new() -> Self {
        let mut context = Self {
            types: vec![],
            names: Map::default(),
        };
        for (name, registered) in [
            ("SELF_TYPE", true),
            ("AUTO_TYPE", true),
            ("<error>", false),
            ("Object", true),
            ("IO", true),
            ("Int", true),
            ("String", true),
            ("Bool", true),
        ] {
            let id = TypeId::new(context.types.len() as u32);
            context.types.push(Type::new(name));
            if registered {
                context.names.insert(name.to_owned(), id);
            }
        }
        for id in [TypeId::IO, TypeId::INT, TypeId::STRING, TypeId::BOOL] {
            context.types[id.raw as usize].parent = Some(TypeId::OBJECT);
        }
        for id in [TypeId::INT, TypeId::STRING, TypeId::BOOL] {
            context.types[id.raw as usize].sealed = true;
        }
        context
    }

    /// Register the signatures of the methods of the built-in classes.
    pub fn define_builtin_methods(&mut self) {
        use TypeId as T;
        let builtins = [
            (T::OBJECT, Method::builtin("abort", &[], T::OBJECT)),
            (T::OBJECT, Method::builtin("type_name", &[], T::STRING)),
            (T::OBJECT, Method::builtin("copy", &[], T::SELF_TYPE)),
            (
                T::IO,
                Method::builtin("out_string", &[("x", T::STRING)], T::SELF_TYPE),
            ),
            (
                T::IO,
                Method::builtin("out_int", &[("x", T::INT)], T::SELF_TYPE),
            ),
            (T::IO, Method::builtin("in_string", &[], T::STRING)),
            (T::IO, Method::builtin("in_int", &[], T::INT)),
            (T::STRING, Method::builtin("length", &[], T::INT)),
            (
                T::STRING,
                Method::builtin("concat", &[("s", T::STRING)], T::STRING),
            ),
            (
                T::STRING,
                Method::builtin("substr", &[("i", T::INT), ("l", T::INT)], T::STRING),
            ),
        ];
        for (id, method) in builtins {
            self.ty_mut(id).methods.insert(method.name.clone(), method);
        }
    }

    pub fn create_type(&mut self, name: &str) -> Result<TypeId, ContextError> {
        if self.names.contains_key(name) {
            return Err(ContextError::DuplicateType(name.to_owned()));
        }
        let id = TypeId::new(self.types.len() as u32);
        self.types.push(Type::new(name));
        self.names.insert(name.to_owned(), id);
        Ok(id)
    }

    pub fn get_type(&self, name: &str) -> Result<TypeId, ContextError> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| ContextError::TypeNotFound(name.to_owned()))
    }

    pub fn ty(&self, id: TypeId) -> &Type {
        &self.types[id.raw as usize]
    }

    pub fn ty_mut(&mut self, id: TypeId) -> &mut Type {
        &mut self.types[id.raw as usize]
    }

    pub fn name(&self, id: TypeId) -> &str {
        &self.ty(id).name
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Iterate over every type except the sentinels.
    pub fn types(&self) -> impl Iterator<Item = (TypeId, &Type)> + '_ {
        self.types
            .iter()
            .enumerate()
            .map(|(i, ty)| (TypeId::new(i as u32), ty))
            .filter(|(id, _)| id.is_concrete())
    }

    pub fn set_parent(&mut self, id: TypeId, parent: TypeId) {
        self.ty_mut(id).parent = Some(parent);
    }

    /// `id` followed by its ancestors.
    ///
    /// The walk is bounded by the number of types, so it terminates even on
    /// a cyclic hierarchy.
    pub fn ancestors(&self, id: TypeId) -> impl Iterator<Item = TypeId> + '_ {
        iter::successors(Some(id), move |t| self.ty(*t).parent).take(self.types.len())
    }

    /// Nominal conformance. The error and auto types conform in both directions.
    pub fn conforms_to(&self, ty: TypeId, other: TypeId) -> bool {
        if !is_checked(ty) || !is_checked(other) {
            return true;
        }
        self.ancestors(ty).any(|t| t == other)
    }

    /// The least common ancestor of two types.
    ///
    /// The error and auto types are absorbed by the other operand.
    pub fn union(&self, a: TypeId, b: TypeId) -> TypeId {
        if !is_checked(a) {
            return b;
        }
        if !is_checked(b) || a == b {
            return a;
        }
        let left: Vec<TypeId> = self.ancestors(a).collect();
        self.ancestors(b)
            .find(|t| left.contains(t))
            .unwrap_or(TypeId::OBJECT)
    }

    /// Look up an attribute in `id` and its ancestors, returning the owner.
    pub fn get_attribute(&self, id: TypeId, name: &str) -> Option<(TypeId, &Attribute)> {
        self.ancestors(id).find_map(|owner| {
            self.ty(owner)
                .attributes
                .iter()
                .find(|attr| attr.name == name)
                .map(|attr| (owner, attr))
        })
    }

    /// Look up a method in `id` and its ancestors, returning the owner.
    pub fn get_method(&self, id: TypeId, name: &str) -> Option<(TypeId, &Method)> {
        self.ancestors(id)
            .find_map(|owner| self.ty(owner).methods.get(name).map(|m| (owner, m)))
    }

    pub fn method_mut(&mut self, owner: TypeId, name: &str) -> Option<&mut Method> {
        self.ty_mut(owner).methods.get_mut(name)
    }

    pub fn define_attribute(
        &mut self,
        id: TypeId,
        name: &str,
        ty: TypeId,
        pos: Position,
    ) -> Result<(), ContextError> {
        let owner = self.ty_mut(id);
        if owner.attributes.iter().any(|attr| attr.name == name) {
            return Err(ContextError::AttributeAlreadyDefined {
                name: name.to_owned(),
                class: owner.name.clone(),
            });
        }
        owner.attributes.push(Attribute {
            name: name.to_owned(),
            ty,
            pos,
        });
        Ok(())
    }

    pub fn define_method(
        &mut self,
        id: TypeId,
        name: &str,
        params: Vec<(String, TypeId)>,
        ret: TypeId,
        pos: Position,
    ) -> Result<(), ContextError> {
        let owner = self.ty_mut(id);
        if owner.methods.contains_key(name) {
            return Err(ContextError::MethodAlreadyDefined {
                name: name.to_owned(),
                class: owner.name.clone(),
            });
        }
        let method = Method {
            name: name.to_owned(),
            param_names: params.iter().map(|(n, _)| n.clone()).collect(),
            params: params
                .into_iter()
                .map(|(n, ty)| VariableInfo::new(n, ty))
                .collect(),
            ret: VariableInfo::new(name, ret),
            pos,
        };
        owner.methods.insert(name.to_owned(), method);
        Ok(())
    }
}

fn is_checked(ty: TypeId) -> bool {
    !matches!(ty, TypeId::ERROR | TypeId::AUTO_TYPE)
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (_, ty)) in self.types().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            match ty.parent {
                Some(parent) => writeln!(f, "type {} : {} {{", ty.name, self.name(parent))?,
                None => writeln!(f, "type {} {{", ty.name)?,
            }
            for attr in &ty.attributes {
                writeln!(f, "    attribute {} : {};", attr.name, self.name(attr.ty))?;
            }
            for method in ty.methods.values() {
                write!(f, "    method {}(", method.name)?;
                for (i, param) in method.params.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", param.name, self.name(param.ty))?;
                }
                writeln!(f, ") : {};", self.name(method.ret.ty))?;
            }
            writeln!(f, "}}")?;
        }
        Ok(())
    }
}
