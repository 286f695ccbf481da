//! Resolves the declarations left as `AUTO_TYPE`.
//!
//! Each walk replays the scope tree built by the checker. Types flow in two
//! directions: an expected type is handed down to sub-expressions (operators,
//! conditions, arguments, declared types), and the type of a value flows back
//! into the variable it is stored into. Walks are repeated until nothing
//! changes.

use super::{
    scope::{Scope, ScopeCursor, ScopeDrift, ScopeId, VarId},
    types::{Context, TypeId, VariableInfo},
};
use crate::ast::{AttrDecl, BinOp, ClassDecl, Expr, ExprKind, Feature, MethodDecl, Program};
use std::mem;

/// Run inference walks to a fixpoint, then default whatever is still
/// unresolved to `Object`. Returns the number of walks.
pub fn infer(
    program: &mut Program,
    classes: &[Option<TypeId>],
    context: &mut Context,
    scope: &mut Scope,
    max_rounds: usize,
) -> Result<usize, ScopeDrift> {
    let mut inferer = TypeInferer {
        context,
        scope,
        cursor: ScopeCursor::new(),
        current_type: TypeId::OBJECT,
        changed: false,
    };

    let mut rounds = 0;
    for defaulted in [false, true] {
        if defaulted {
            let count = inferer.default_unresolved();
            tracing::debug!(count, "defaulted unresolved declarations to Object");
        }
        let mut walks = 0;
        loop {
            walks += 1;
            rounds += 1;
            let changed = inferer.walk(program, classes)?;
            tracing::debug!(round = rounds, changed, "inference walk");
            if !changed {
                break;
            }
            if walks >= max_rounds {
                tracing::warn!(walks, "inference did not reach a fixpoint");
                break;
            }
        }
    }

    Ok(rounds)
}

struct TypeInferer<'a> {
    context: &'a mut Context,
    scope: &'a mut Scope,
    cursor: ScopeCursor,
    current_type: TypeId,
    changed: bool,
}

impl TypeInferer<'_> {
    fn walk(
        &mut self,
        program: &mut Program,
        classes: &[Option<TypeId>],
    ) -> Result<bool, ScopeDrift> {
        self.cursor = ScopeCursor::new();
        self.changed = false;

        for (decl, id) in program.classes.iter_mut().zip(classes) {
            if let Some(id) = *id {
                self.visit_class(decl, id)?;
            }
        }

        mem::take(&mut self.cursor).finish(self.scope)?;
        Ok(self.changed)
    }

    fn resolve_self(&self, ty: TypeId) -> TypeId {
        if ty == TypeId::SELF_TYPE {
            self.current_type
        } else {
            ty
        }
    }

    fn observe(&mut self, var: VarId, ty: TypeId) {
        let context = &*self.context;
        self.changed |= self.scope.var_mut(var).observe_value(ty, context);
    }

    fn default_unresolved(&mut self) -> usize {
        let mut count = 0;
        let mut settle = |info: &mut VariableInfo| {
            if info.is_unresolved() {
                info.ty = TypeId::OBJECT;
                info.inferred = true;
                count += 1;
            }
        };

        for var in self.scope.variables_mut() {
            settle(var);
        }
        let ids: Vec<TypeId> = self.context.types().map(|(id, _)| id).collect();
        for id in ids {
            let ty = self.context.ty_mut(id);
            for method in ty.methods.values_mut() {
                method.params.iter_mut().for_each(&mut settle);
                settle(&mut method.ret);
            }
            for attr in &mut ty.attributes {
                if attr.ty == TypeId::AUTO_TYPE {
                    attr.ty = TypeId::OBJECT;
                }
            }
        }
        count
    }

    fn visit_class(&mut self, decl: &mut ClassDecl, id: TypeId) -> Result<(), ScopeDrift> {
        self.current_type = id;
        let class_scope = self.cursor.enter(self.scope)?;

        for feature in &mut decl.features {
            let feature_scope = self.cursor.enter(self.scope)?;
            match feature {
                Feature::Attribute(attr) => self.visit_attribute(attr, class_scope)?,
                Feature::Method(method) => self.visit_method(method, feature_scope)?,
            }
            self.cursor.leave(self.scope)?;
        }

        // own attributes are the first locals of the class scope.
        let count = self.context.ty(id).attributes.len();
        let own: Vec<VarId> = self.scope.locals(class_scope).iter().take(count).copied().collect();
        for (i, var) in own.into_iter().enumerate() {
            let info = self.scope.var(var);
            if info.inferred && self.context.ty(id).attributes[i].ty != info.ty {
                let ty = info.ty;
                self.context.ty_mut(id).attributes[i].ty = ty;
                self.changed = true;
            }
        }

        self.cursor.leave(self.scope)
    }

    fn visit_attribute(
        &mut self,
        attr: &mut AttrDecl,
        class_scope: ScopeId,
    ) -> Result<(), ScopeDrift> {
        let Some(init) = &mut attr.init else {
            return Ok(());
        };
        let var = self.scope.find_variable(class_scope, &attr.name.name);
        let hint = var
            .map(|v| self.scope.var(v).ty)
            .filter(|ty| ty.is_concrete());

        let ty = self.visit(init, hint)?;

        // a redefined attribute does not own the slot.
        let canonical = self
            .context
            .ty(self.current_type)
            .attributes
            .iter()
            .any(|a| a.name == attr.name.name && a.pos == attr.name.pos);
        if let (true, Some(var)) = (canonical, var) {
            self.observe(var, ty);
        }
        Ok(())
    }

    fn visit_method(
        &mut self,
        method: &mut MethodDecl,
        feature_scope: ScopeId,
    ) -> Result<(), ScopeDrift> {
        let canonical = self
            .context
            .ty(self.current_type)
            .methods
            .get(&method.name.name)
            .map_or(false, |m| m.pos == method.name.pos);
        let params: Vec<VarId> = self
            .scope
            .locals(feature_scope)
            .iter()
            .skip(1)
            .copied()
            .collect();

        let ret = if canonical {
            self.sync_params(&method.name.name, &params);
            self.context
                .ty(self.current_type)
                .methods
                .get(&method.name.name)
                .map_or(TypeId::ERROR, |m| m.ret.ty)
        } else {
            self.context
                .get_type(&method.ret.name)
                .unwrap_or(TypeId::ERROR)
        };
        let hint = Some(self.resolve_self(ret)).filter(|ty| ty.is_concrete());

        let body_ty = self.visit(&mut method.body, hint)?;

        if canonical {
            self.sync_params(&method.name.name, &params);
            let context = &*self.context;
            if let Some(mut info) = context
                .ty(self.current_type)
                .methods
                .get(&method.name.name)
                .map(|m| m.ret.clone())
            {
                if info.observe_value(body_ty, context) {
                    self.set_method_ret(&method.name.name, info);
                }
            }
        }
        Ok(())
    }

    fn set_method_ret(&mut self, name: &str, info: VariableInfo) {
        if let Some(method) = self.context.method_mut(self.current_type, name) {
            method.ret = info;
            self.changed = true;
        }
    }

    /// Merge what the parameter variables and the method signature know.
    fn sync_params(&mut self, name: &str, params: &[VarId]) {
        for (i, var) in params.iter().enumerate() {
            let Some(mut declared) = self
                .context
                .ty(self.current_type)
                .methods
                .get(name)
                .and_then(|m| m.params.get(i))
                .cloned()
            else {
                continue;
            };
            let mut local = self.scope.var(*var).clone();

            let context = &*self.context;
            let local_changed = local.merge(&declared, context);
            let declared_changed = declared.merge(&local, context);

            if local_changed {
                *self.scope.var_mut(*var) = local;
                self.changed = true;
            }
            if declared_changed {
                if let Some(method) = self.context.method_mut(self.current_type, name) {
                    method.params[i] = declared;
                    self.changed = true;
                }
            }
        }
    }

    /// Observe an argument passed to an unresolved parameter.
    fn observe_param(&mut self, owner: TypeId, name: &str, index: usize, ty: TypeId) {
        let context = &*self.context;
        let Some(mut info) = context
            .ty(owner)
            .methods
            .get(name)
            .and_then(|m| m.params.get(index))
            .cloned()
        else {
            return;
        };
        if info.observe_value(ty, context) {
            if let Some(method) = self.context.method_mut(owner, name) {
                method.params[index] = info;
                self.changed = true;
            }
        }
    }

    fn visit(&mut self, expr: &mut Expr, hint: Option<TypeId>) -> Result<TypeId, ScopeDrift> {
        let ty = match &mut expr.kind {
            ExprKind::Int(..) => TypeId::INT,
            ExprKind::Str(..) => TypeId::STRING,
            ExprKind::Bool(..) => TypeId::BOOL,

            ExprKind::Identifier(name) => {
                match self.scope.find_variable(self.cursor.current(), name) {
                    Some(var) => {
                        if let Some(hint) = hint {
                            self.changed |= self.scope.var_mut(var).observe_hint(hint);
                        }
                        self.resolve_self(self.scope.var(var).ty)
                    }
                    None => TypeId::ERROR,
                }
            }

            ExprKind::Assign { name, value } => {
                let var = self.scope.find_variable(self.cursor.current(), &name.name);
                let hint = var
                    .map(|v| self.resolve_self(self.scope.var(v).ty))
                    .filter(|ty| ty.is_concrete());
                let ty = self.visit(value, hint)?;
                if let (Some(var), false) = (var, name.name == "self") {
                    self.observe(var, ty);
                }
                ty
            }

            ExprKind::Dispatch {
                receiver,
                cast,
                method,
                args,
            } => {
                let cast_ty = cast.as_ref().map(|cast| match self.context.get_type(&cast.name) {
                    Ok(ty) if ty.is_concrete() => ty,
                    _ => TypeId::ERROR,
                });
                let receiver_ty = match receiver {
                    Some(receiver) => {
                        self.visit(receiver, cast_ty.filter(|ty| ty.is_concrete()))?
                    }
                    None => self.current_type,
                };
                let lookup = cast_ty.unwrap_or(receiver_ty);

                let signature = if lookup.is_concrete() {
                    self.context
                        .get_method(lookup, &method.name)
                        .map(|(owner, m)| (owner, m.params.clone(), m.ret.ty))
                } else {
                    None
                };

                match signature {
                    Some((owner, params, ret)) if params.len() == args.len() => {
                        for (i, (arg, param)) in args.iter_mut().zip(&params).enumerate() {
                            let ty = self.visit(arg, Some(param.ty).filter(|t| t.is_concrete()))?;
                            if param.auto {
                                self.observe_param(owner, &method.name, i, ty);
                            }
                        }
                        if ret == TypeId::SELF_TYPE {
                            receiver_ty
                        } else {
                            ret
                        }
                    }
                    _ => {
                        for arg in args {
                            self.visit(arg, None)?;
                        }
                        if lookup == TypeId::AUTO_TYPE {
                            TypeId::AUTO_TYPE
                        } else {
                            TypeId::ERROR
                        }
                    }
                }
            }

            ExprKind::If { cond, then, els } => {
                self.visit(cond, Some(TypeId::BOOL))?;
                let then_ty = self.visit(then, hint)?;
                let els_ty = self.visit(els, hint)?;
                self.context.union(then_ty, els_ty)
            }

            ExprKind::While { cond, body } => {
                self.visit(cond, Some(TypeId::BOOL))?;
                self.visit(body, None)?;
                TypeId::OBJECT
            }

            ExprKind::Block(exprs) => {
                self.cursor.enter(self.scope)?;
                let mut ty = TypeId::OBJECT;
                let last = exprs.len().saturating_sub(1);
                for (i, expr) in exprs.iter_mut().enumerate() {
                    ty = self.visit(expr, if i == last { hint } else { None })?;
                }
                self.cursor.leave(self.scope)?;
                ty
            }

            ExprKind::Let { bindings, body } => {
                for binding in bindings.iter_mut() {
                    let declared = match &binding.ty {
                        None => TypeId::AUTO_TYPE,
                        Some(ty) => match self.context.get_type(&ty.name) {
                            Ok(id) => self.resolve_self(id),
                            Err(..) => TypeId::ERROR,
                        },
                    };
                    let init_ty = match &mut binding.init {
                        Some(init) => {
                            Some(self.visit(init, Some(declared).filter(|t| t.is_concrete()))?)
                        }
                        None => None,
                    };
                    let inner = self.cursor.enter(self.scope)?;
                    let var = self.scope.locals(inner).first().copied();
                    if let (Some(var), Some(ty)) = (var, init_ty) {
                        self.observe(var, ty);
                    }
                }
                let ty = self.visit(body, hint)?;
                for _ in bindings.iter() {
                    self.cursor.leave(self.scope)?;
                }
                ty
            }

            ExprKind::Case {
                scrutinee,
                branches,
            } => {
                self.visit(scrutinee, None)?;
                let mut result: Option<TypeId> = None;
                for branch in branches {
                    self.cursor.enter(self.scope)?;
                    let ty = self.visit(&mut branch.body, hint)?;
                    self.cursor.leave(self.scope)?;
                    result = Some(match result {
                        Some(acc) => self.context.union(acc, ty),
                        None => ty,
                    });
                }
                result.unwrap_or(TypeId::ERROR)
            }

            ExprKind::New(ty) => match self.context.get_type(&ty.name) {
                Ok(TypeId::SELF_TYPE) => self.current_type,
                Ok(id) if id.is_concrete() => id,
                _ => TypeId::ERROR,
            },

            ExprKind::IsVoid(operand) => {
                self.visit(operand, None)?;
                TypeId::BOOL
            }

            ExprKind::Not(operand) => {
                self.visit(operand, Some(TypeId::BOOL))?;
                TypeId::BOOL
            }

            ExprKind::Complement(operand) => {
                self.visit(operand, Some(TypeId::INT))?;
                TypeId::INT
            }

            ExprKind::Binary { op, lhs, rhs } => {
                if *op == BinOp::Equal {
                    // each side expects the type the other side had.
                    let left_hint = rhs.static_type.filter(|t| t.is_concrete());
                    let left = self.visit(lhs, left_hint)?;
                    self.visit(rhs, Some(left).filter(|t| t.is_concrete()))?;
                    TypeId::BOOL
                } else {
                    self.visit(lhs, Some(TypeId::INT))?;
                    self.visit(rhs, Some(TypeId::INT))?;
                    if op.is_arithmetic() {
                        TypeId::INT
                    } else {
                        TypeId::BOOL
                    }
                }
            }
        };

        expr.static_type = Some(ty);
        Ok(ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        grammar::CoolParser,
        lexer::tokenize,
        semantic::{builder::build, checker::check, collector::collect},
    };

    struct Inferred {
        program: Program,
        context: Context,
        scope: Scope,
        rounds: usize,
    }

    fn infer_source(source: &str) -> Inferred {
        let tokens = tokenize(source);
        let mut program = CoolParser::shared().unwrap().parse(&tokens.tokens).unwrap();
        let mut context = Context::new();
        let mut errors = vec![];
        let classes = collect(&program, &mut context, &mut errors);
        build(&program, &classes, &mut context, &mut errors);
        let mut scope = check(&mut program, &classes, &context, &mut errors);
        assert!(errors.is_empty(), "{:?}", errors);
        let rounds = infer(&mut program, &classes, &mut context, &mut scope, 16).unwrap();
        Inferred {
            program,
            context,
            scope,
            rounds,
        }
    }

    fn var_type(inferred: &Inferred, name: &str) -> TypeId {
        inferred
            .scope
            .variables()
            .find(|v| v.name == name)
            .map(|v| v.ty)
            .unwrap()
    }

    fn no_auto_left(expr: &Expr) -> bool {
        if expr.static_type == Some(TypeId::AUTO_TYPE) {
            return false;
        }
        match &expr.kind {
            ExprKind::Assign { value, .. } => no_auto_left(value),
            ExprKind::Dispatch { receiver, args, .. } => {
                receiver.as_deref().map_or(true, no_auto_left) && args.iter().all(no_auto_left)
            }
            ExprKind::If { cond, then, els } => {
                no_auto_left(cond) && no_auto_left(then) && no_auto_left(els)
            }
            ExprKind::While { cond, body } => no_auto_left(cond) && no_auto_left(body),
            ExprKind::Block(exprs) => exprs.iter().all(no_auto_left),
            ExprKind::Let { bindings, body } => {
                bindings.iter().all(|b| b.init.as_ref().map_or(true, no_auto_left))
                    && no_auto_left(body)
            }
            ExprKind::Case {
                scrutinee,
                branches,
            } => no_auto_left(scrutinee) && branches.iter().all(|b| no_auto_left(&b.body)),
            ExprKind::IsVoid(e) | ExprKind::Not(e) | ExprKind::Complement(e) => no_auto_left(e),
            ExprKind::Binary { lhs, rhs, .. } => no_auto_left(lhs) && no_auto_left(rhs),
            ExprKind::New(..)
            | ExprKind::Identifier(..)
            | ExprKind::Int(..)
            | ExprKind::Str(..)
            | ExprKind::Bool(..) => true,
        }
    }

    #[test]
    fn let_binding_from_initializer() {
        let inferred =
            infer_source("class Main { main(): Int { let x <- 5 in x + 1 }; };");
        assert_eq!(var_type(&inferred, "x"), TypeId::INT);
        assert!(inferred
            .scope
            .variables()
            .all(|v| v.ty != TypeId::AUTO_TYPE));
        assert_eq!(inferred.rounds, 3);
    }

    #[test]
    fn parameters_from_uses_and_calls() {
        let inferred = infer_source(
            "class Main {
                twice(n: AUTO_TYPE): AUTO_TYPE { n * 2 };
                greet(s: AUTO_TYPE): AUTO_TYPE { s };
                main(): Object { greet(\"hi\").length() };
            };",
        );
        let main = inferred.context.get_type("Main").unwrap();
        let (_, twice) = inferred.context.get_method(main, "twice").unwrap();
        assert_eq!(twice.params[0].ty, TypeId::INT);
        assert_eq!(twice.ret.ty, TypeId::INT);

        // the argument of a call resolves the parameter, which resolves the return.
        let (_, greet) = inferred.context.get_method(main, "greet").unwrap();
        assert_eq!(greet.params[0].ty, TypeId::STRING);
        assert_eq!(greet.ret.ty, TypeId::STRING);
        assert_eq!(var_type(&inferred, "s"), TypeId::STRING);

        for class in &inferred.program.classes {
            for feature in &class.features {
                if let Feature::Method(method) = feature {
                    assert!(no_auto_left(&method.body), "{:?}", method.name);
                }
            }
        }
    }

    #[test]
    fn attributes_and_widening() {
        let inferred = infer_source(
            "class A { };
            class B inherits A { };
            class Main {
                flag: AUTO_TYPE;
                value: AUTO_TYPE <- new B;
                main(): Object {
                    {
                        if flag then value <- new A else value fi;
                    }
                };
            };",
        );
        let main = inferred.context.get_type("Main").unwrap();
        let a = inferred.context.get_type("A").unwrap();
        let attrs = &inferred.context.ty(main).attributes;
        assert_eq!(attrs[0].ty, TypeId::BOOL);
        // B from the initializer, widened to A by the assignment.
        assert_eq!(attrs[1].ty, a);
    }

    #[test]
    fn unresolved_defaults_to_object() {
        let inferred = infer_source(
            "class Main { main(): Object { let x, y: AUTO_TYPE in x }; };",
        );
        assert_eq!(var_type(&inferred, "x"), TypeId::OBJECT);
        assert_eq!(var_type(&inferred, "y"), TypeId::OBJECT);
        let Feature::Method(method) = &inferred.program.classes[0].features[0] else {
            panic!("expected a method");
        };
        assert_eq!(method.body.static_type, Some(TypeId::OBJECT));
    }

    #[test]
    fn drift_is_detected() {
        let tokens = tokenize("class Main { main(): Object { { 1; } }; };");
        let mut program = CoolParser::shared().unwrap().parse(&tokens.tokens).unwrap();
        let mut context = Context::new();
        let mut errors = vec![];
        let classes = collect(&program, &mut context, &mut errors);
        build(&program, &classes, &mut context, &mut errors);
        // a tree missing the block scope.
        let mut scope = Scope::new();
        let class_scope = scope.create_child(ScopeId::ROOT);
        let feature_scope = scope.create_child(class_scope);
        scope.define_variable(feature_scope, VariableInfo::new("self", classes[0].unwrap()));

        let res = infer(&mut program, &classes, &mut context, &mut scope, 16);
        assert_eq!(
            res,
            Err(ScopeDrift::MissingChild {
                parent: feature_scope
            })
        );
    }
}
