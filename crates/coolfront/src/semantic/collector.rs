//! Registers the name of every class.

use super::types::{Context, TypeId};
use crate::{ast::Program, diagnostics::Diagnostic};

/// Register every class declared in `program`.
///
/// Returns the type of each class declaration, or `None` for a redefinition.
/// Later passes skip the redefinitions.
pub fn collect(
    program: &Program,
    context: &mut Context,
    errors: &mut Vec<Diagnostic>,
) -> Vec<Option<TypeId>> {
    program
        .classes
        .iter()
        .map(|class| match context.create_type(&class.name.name) {
            Ok(id) => Some(id),
            Err(err) => {
                errors.push(Diagnostic::new(class.name.pos, err.into()));
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ast::{ClassDecl, Ident},
        diagnostics::{ErrorKind, Position},
    };

    fn class(name: &str, line: usize) -> ClassDecl {
        ClassDecl {
            name: Ident {
                name: name.to_owned(),
                pos: Position::new(line, 7),
            },
            parent: None,
            features: vec![],
            pos: Position::new(line, 1),
        }
    }

    #[test]
    fn duplicates_are_reported_and_skipped() {
        let program = Program {
            classes: vec![class("A", 1), class("A", 2), class("String", 3), class("B", 4)],
        };
        let mut context = Context::new();
        let mut errors = vec![];
        let ids = collect(&program, &mut context, &mut errors);

        assert!(ids[0].is_some() && ids[3].is_some());
        assert_eq!(ids[1], None);
        assert_eq!(ids[2], None);
        assert_eq!(
            errors,
            [
                Diagnostic::new(Position::new(2, 7), ErrorKind::DuplicateType("A".into())),
                Diagnostic::new(
                    Position::new(3, 7),
                    ErrorKind::DuplicateType("String".into())
                ),
            ]
        );
    }
}
