//! Links the class hierarchy and resolves the signatures of every feature.

use super::types::{Context, TypeId};
use crate::{
    ast::{ClassDecl, Feature, Ident, Program},
    diagnostics::{Diagnostic, ErrorKind, Position},
};

pub fn build(
    program: &Program,
    classes: &[Option<TypeId>],
    context: &mut Context,
    errors: &mut Vec<Diagnostic>,
) {
    let mut builder = TypeBuilder { context, errors };
    let declared: Vec<(&ClassDecl, TypeId)> = program
        .classes
        .iter()
        .zip(classes)
        .filter_map(|(decl, id)| Some((decl, (*id)?)))
        .collect();

    builder.context.define_builtin_methods();
    for (decl, id) in &declared {
        builder.link_parent(decl, *id);
    }
    for (decl, id) in &declared {
        builder.break_cycle(decl, *id);
    }
    for (decl, id) in &declared {
        builder.define_features(decl, *id);
    }
    for (_, id) in &declared {
        builder.check_overrides(*id);
    }
    builder.check_main(&declared);
}

struct TypeBuilder<'a> {
    context: &'a mut Context,
    errors: &'a mut Vec<Diagnostic>,
}

impl TypeBuilder<'_> {
    fn report(&mut self, pos: Position, kind: ErrorKind) {
        tracing::trace!(%pos, %kind, "semantic error");
        self.errors.push(Diagnostic::new(pos, kind));
    }

    fn link_parent(&mut self, decl: &ClassDecl, id: TypeId) {
        let parent = match &decl.parent {
            None => TypeId::OBJECT,
            Some(parent) => match self.context.get_type(&parent.name) {
                Err(err) => {
                    self.report(parent.pos, err.into());
                    TypeId::OBJECT
                }
                Ok(ty) if !ty.is_concrete() || self.context.ty(ty).sealed => {
                    self.report(
                        parent.pos,
                        ErrorKind::InvalidParent {
                            child: decl.name.name.clone(),
                            parent: parent.name.clone(),
                        },
                    );
                    TypeId::OBJECT
                }
                Ok(ty) => ty,
            },
        };
        self.context.set_parent(id, parent);
    }

    // Rebinding the first class met on a cycle to `Object` breaks that cycle,
    // so the remaining classes on it are not reported again.
    fn break_cycle(&mut self, decl: &ClassDecl, id: TypeId) {
        let on_cycle = self.context.ancestors(id).skip(1).any(|t| t == id);
        if on_cycle {
            self.report(
                decl.pos,
                ErrorKind::CyclicInheritance(decl.name.name.clone()),
            );
            self.context.set_parent(id, TypeId::OBJECT);
        }
    }

    /// Resolve a type name written in a declaration.
    fn resolve(&mut self, ty: &Ident) -> TypeId {
        match self.context.get_type(&ty.name) {
            Ok(id) => id,
            Err(err) => {
                self.report(ty.pos, err.into());
                TypeId::ERROR
            }
        }
    }

    fn define_features(&mut self, decl: &ClassDecl, id: TypeId) {
        for feature in &decl.features {
            match feature {
                Feature::Attribute(attr) => {
                    let ty = self.resolve(&attr.ty);
                    if let Err(err) =
                        self.context
                            .define_attribute(id, &attr.name.name, ty, attr.name.pos)
                    {
                        self.report(attr.name.pos, err.into());
                    }
                }
                Feature::Method(method) => {
                    let mut params = Vec::with_capacity(method.params.len());
                    for param in &method.params {
                        let mut ty = self.resolve(&param.ty);
                        if ty == TypeId::SELF_TYPE {
                            self.report(
                                param.ty.pos,
                                ErrorKind::IllegalSelfType {
                                    ty: param.ty.name.clone(),
                                    usage: "a parameter type",
                                },
                            );
                            ty = TypeId::ERROR;
                        }
                        params.push((param.name.name.clone(), ty));
                    }
                    let ret = self.resolve(&method.ret);
                    if let Err(err) = self.context.define_method(
                        id,
                        &method.name.name,
                        params,
                        ret,
                        method.name.pos,
                    ) {
                        self.report(method.name.pos, err.into());
                    }
                }
            }
        }
    }

    fn check_overrides(&mut self, id: TypeId) {
        let Some(parent) = self.context.ty(id).parent else {
            return;
        };
        let mut found = vec![];

        let ty = self.context.ty(id);
        for attr in &ty.attributes {
            if let Some((owner, _)) = self.context.get_attribute(parent, &attr.name) {
                found.push((
                    attr.pos,
                    ErrorKind::AttributeAlreadyDefined {
                        name: attr.name.clone(),
                        class: self.context.name(owner).to_owned(),
                    },
                ));
            }
        }
        for method in ty.methods.values() {
            let Some((owner, inherited)) = self.context.get_method(parent, &method.name) else {
                continue;
            };
            let same_signature = method.params.len() == inherited.params.len()
                && method
                    .params
                    .iter()
                    .zip(&inherited.params)
                    .all(|(a, b)| same_type(a.ty, b.ty))
                && same_type(method.ret.ty, inherited.ret.ty);
            if !same_signature {
                found.push((
                    method.pos,
                    ErrorKind::WrongSignatureOverride {
                        method: method.name.clone(),
                        class: ty.name.clone(),
                        parent: self.context.name(owner).to_owned(),
                    },
                ));
            }
        }

        for (pos, kind) in found {
            self.report(pos, kind);
        }
    }

    fn check_main(&mut self, declared: &[(&ClassDecl, TypeId)]) {
        let main = declared
            .iter()
            .find(|(decl, _)| decl.name.name == "Main");
        let has_main = main.map_or(false, |(_, id)| {
            self.context
                .get_method(*id, "main")
                .map_or(false, |(_, method)| method.params.is_empty())
        });
        if !has_main {
            let pos = main.map_or(Position::new(1, 1), |(decl, _)| decl.pos);
            self.report(pos, ErrorKind::MissingMainClass);
        }
    }
}

// Unresolved and erroneous declarations never make an override mismatch.
fn same_type(a: TypeId, b: TypeId) -> bool {
    a == b
        || matches!(a, TypeId::AUTO_TYPE | TypeId::ERROR)
        || matches!(b, TypeId::AUTO_TYPE | TypeId::ERROR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{grammar::CoolParser, lexer::tokenize, semantic::collector::collect};

    fn build_source(source: &str) -> (Context, Vec<Diagnostic>) {
        let tokens = tokenize(source);
        let program = CoolParser::shared().unwrap().parse(&tokens.tokens).unwrap();
        let mut context = Context::new();
        let mut errors = vec![];
        let classes = collect(&program, &mut context, &mut errors);
        build(&program, &classes, &mut context, &mut errors);
        (context, errors)
    }

    fn kinds(errors: &[Diagnostic]) -> Vec<&ErrorKind> {
        errors.iter().map(|e| &e.kind).collect()
    }

    const MAIN: &str = "class Main { main(): Int { 0 }; };\n";

    #[test]
    fn links_parents() {
        let (context, errors) = build_source(&format!(
            "{}class A inherits B {{ }}; class B inherits IO {{ }};",
            MAIN
        ));
        assert!(errors.is_empty(), "{:?}", errors);
        let a = context.get_type("A").unwrap();
        let b = context.get_type("B").unwrap();
        assert_eq!(context.ty(a).parent, Some(b));
        assert_eq!(context.ty(b).parent, Some(TypeId::IO));
        assert!(context.get_method(a, "out_string").is_some());
    }

    #[test]
    fn invalid_parents_fall_back_to_object() {
        let (context, errors) = build_source(&format!(
            "{}class A inherits Int {{ }}; class B inherits Nope {{ }}; class C inherits SELF_TYPE {{ }};",
            MAIN
        ));
        assert_eq!(
            kinds(&errors),
            [
                &ErrorKind::InvalidParent {
                    child: "A".into(),
                    parent: "Int".into()
                },
                &ErrorKind::TypeNotFound("Nope".into()),
                &ErrorKind::InvalidParent {
                    child: "C".into(),
                    parent: "SELF_TYPE".into()
                },
            ]
        );
        for name in ["A", "B", "C"] {
            let id = context.get_type(name).unwrap();
            assert_eq!(context.ty(id).parent, Some(TypeId::OBJECT));
        }
    }

    #[test]
    fn cycles_are_reported_once_and_broken() {
        let (context, errors) = build_source(&format!(
            "{}class A inherits C {{ }}; class B inherits A {{ }}; class C inherits B {{ }}; class D inherits A {{ }};",
            MAIN
        ));
        assert_eq!(
            kinds(&errors),
            [&ErrorKind::CyclicInheritance("A".into())]
        );
        assert_eq!(errors[0].pos, Position::new(2, 1));
        for name in ["A", "B", "C", "D"] {
            let id = context.get_type(name).unwrap();
            assert!(context.conforms_to(id, TypeId::OBJECT));
        }
    }

    #[test]
    fn feature_redefinitions() {
        let (_, errors) = build_source(&format!(
            "{}class A {{ x: Int; x: String; f(): Int {{ 0 }}; f(): Int {{ 1 }}; g(a: Nope): Int {{ 0 }}; }};",
            MAIN
        ));
        assert_eq!(
            kinds(&errors),
            [
                &ErrorKind::AttributeAlreadyDefined {
                    name: "x".into(),
                    class: "A".into()
                },
                &ErrorKind::MethodAlreadyDefined {
                    name: "f".into(),
                    class: "A".into()
                },
                &ErrorKind::TypeNotFound("Nope".into()),
            ]
        );
    }

    #[test]
    fn overrides_must_keep_signature() {
        let (_, errors) = build_source(&format!(
            "{}class A {{ x: Int; f(a: Int): Int {{ a }}; g(): Object {{ 0 }}; }};
            class B inherits A {{ x: Int; f(a: String): Int {{ 0 }}; g(): Object {{ 1 }}; }};
            class C inherits B {{ f(a: AUTO_TYPE): AUTO_TYPE {{ 0 }}; type_name(): Int {{ 0 }}; }};",
            MAIN
        ));
        assert_eq!(
            kinds(&errors),
            [
                &ErrorKind::AttributeAlreadyDefined {
                    name: "x".into(),
                    class: "A".into()
                },
                &ErrorKind::WrongSignatureOverride {
                    method: "f".into(),
                    class: "B".into(),
                    parent: "A".into()
                },
                &ErrorKind::WrongSignatureOverride {
                    method: "type_name".into(),
                    class: "C".into(),
                    parent: "Object".into()
                },
            ]
        );
    }

    #[test]
    fn main_is_required() {
        let (_, errors) = build_source("class A { };");
        assert_eq!(kinds(&errors), [&ErrorKind::MissingMainClass]);
        assert_eq!(errors[0].pos, Position::new(1, 1));

        let (_, errors) = build_source("class A { main(): Int { 0 }; };\nclass Main inherits A { };");
        assert!(errors.is_empty(), "{:?}", errors);

        let (_, errors) = build_source("class Main { main(x: Int): Int { x }; };");
        assert_eq!(kinds(&errors), [&ErrorKind::MissingMainClass]);
    }
}
