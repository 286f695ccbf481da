//! Runs the scanner, the parser and the semantic passes over a source text.

use crate::{
    ast::Program,
    diagnostics::Diagnostic,
    grammar::{CoolParser, SyntaxError},
    lexer::tokenize,
    semantic::{builder, checker, collector, inferer, Context, Scope, ScopeDrift},
};
use lrkit::grammar::GrammarDefError;

#[derive(Debug, Clone)]
pub struct Config {
    infer: bool,
    max_inference_rounds: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub const fn new() -> Self {
        Self {
            infer: true,
            max_inference_rounds: 32,
        }
    }

    /// Enable or disable the resolution of `AUTO_TYPE` declarations.
    pub fn infer(&mut self, enabled: bool) -> &mut Self {
        self.infer = enabled;
        self
    }

    /// Bound the number of inference walks run before the unresolved
    /// declarations are defaulted.
    pub fn max_inference_rounds(&mut self, rounds: usize) -> &mut Self {
        self.max_inference_rounds = rounds.max(1);
        self
    }

    pub fn compile(&self, source: &str) -> Result<Analysis, CompileError> {
        let tokens = {
            let _span = tracing::debug_span!("scan").entered();
            tokenize(source)
        };
        let mut errors = tokens.errors;

        let parser = CoolParser::shared().map_err(CompileError::Grammar)?;
        let mut program = {
            let _span = tracing::debug_span!("parse", tokens = tokens.tokens.len()).entered();
            match parser.parse(&tokens.tokens) {
                Ok(program) => program,
                Err(SyntaxError::UnexpectedToken(error)) => {
                    return Err(CompileError::Syntax {
                        error,
                        lex_errors: errors,
                    });
                }
                Err(SyntaxError::Internal(msg)) => return Err(CompileError::Internal(msg)),
            }
        };

        let mut context = Context::new();
        let classes = {
            let _span = tracing::debug_span!("collect").entered();
            collector::collect(&program, &mut context, &mut errors)
        };
        {
            let _span = tracing::debug_span!("build").entered();
            builder::build(&program, &classes, &mut context, &mut errors);
        }
        let checked_from = errors.len();
        let mut scope = {
            let _span = tracing::debug_span!("check").entered();
            checker::check(&mut program, &classes, &context, &mut errors)
        };
        let inference_rounds = if self.infer {
            let rounds = {
                let _span = tracing::debug_span!("infer").entered();
                inferer::infer(
                    &mut program,
                    &classes,
                    &mut context,
                    &mut scope,
                    self.max_inference_rounds,
                )?
            };
            // the checker's findings are recomputed against the inferred types.
            let _span = tracing::debug_span!("verify").entered();
            errors.truncate(checked_from);
            checker::verify(&mut program, &classes, &context, &scope, &mut errors)?;
            rounds
        } else {
            0
        };

        tracing::debug!(
            classes = program.classes.len(),
            errors = errors.len(),
            inference_rounds,
            "analysis finished"
        );
        Ok(Analysis {
            program,
            errors,
            context,
            scope,
            inference_rounds,
        })
    }
}

/// Analyze `source` with the default configuration.
pub fn compile(source: &str) -> Result<Analysis, CompileError> {
    Config::new().compile(source)
}

/// The outcome of a compilation that got past the parser.
#[derive(Debug)]
pub struct Analysis {
    /// The syntax tree, annotated with static types.
    pub program: Program,
    /// Scanner and semantic diagnostics, in the order they were found.
    pub errors: Vec<Diagnostic>,
    pub context: Context,
    pub scope: Scope,
    pub inference_rounds: usize,
}

impl Analysis {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("{}", error)]
    Syntax {
        error: Diagnostic,
        /// Scanner diagnostics found before the syntax error.
        lex_errors: Vec<Diagnostic>,
    },

    #[error("failed to build the COOL grammar: {}", _0)]
    Grammar(&'static GrammarDefError),

    #[error("internal error: {}", _0)]
    Internal(String),

    #[error("the inference walk diverged from the scope tree: {}", _0)]
    ScopeDrift(#[from] ScopeDrift),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{ErrorKind, Position};

    #[test]
    fn config_builder() {
        let mut config = Config::new();
        config.infer(false).max_inference_rounds(0);
        assert!(!config.infer);
        assert_eq!(config.max_inference_rounds, 1);
    }

    #[test]
    fn lex_errors_are_kept() {
        let analysis = compile("class Main { main(): Int { 0 }; }; #").unwrap();
        assert_eq!(
            analysis.errors,
            [Diagnostic::new(
                Position::new(1, 36),
                ErrorKind::LexError("Illegal character '#'.".into())
            )]
        );
    }

    #[test]
    fn inference_can_be_disabled() {
        let source = "class Main { main(): Object { let x <- 1 in x }; };";
        let mut config = Config::new();
        let analysis = config.infer(false).compile(source).unwrap();
        assert_eq!(analysis.inference_rounds, 0);
        assert!(analysis
            .scope
            .variables()
            .any(|v| v.ty == crate::semantic::TypeId::AUTO_TYPE));
    }
}
