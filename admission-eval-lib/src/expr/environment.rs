use super::CompiledExpression;
use crate::Result;
use core::fmt::{self, Display, Formatter};
use ohno::app_err;
use std::sync::Arc;

/// A name made visible to expressions compiled in an [`Environment`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declaration {
    /// A top-level context binding such as `object` or `request`
    Binding(String),

    /// A policy variable, read as `variables.<name>`
    Variable(String),
}

impl Display for Declaration {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Binding(name) => write!(f, "{name}"),
            Self::Variable(name) => write!(f, "variables.{name}"),
        }
    }
}

/// An immutable set of declarations that expressions are compiled against
///
/// Extending an environment never alters it; each extension yields a new value
/// that shares the previous declarations.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    declarations: Arc<Vec<Declaration>>,
}

impl Environment {
    /// Create an environment declaring the given top-level bindings
    ///
    /// # Errors
    ///
    /// Returns an error if a binding name is declared twice
    pub fn with_bindings<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        names
            .into_iter()
            .try_fold(Self::default(), |env, name| env.extend(Declaration::Binding(name.into())))
    }

    /// Produce a new environment with one more declaration
    ///
    /// # Errors
    ///
    /// Returns an error if the declaration collides with an existing one
    pub fn extend(&self, declaration: Declaration) -> Result<Self> {
        if self.declarations.contains(&declaration) {
            return Err(app_err!("could not declare {declaration}: the name is already declared"));
        }

        let mut declarations = Vec::with_capacity(self.declarations.len() + 1);
        declarations.extend(self.declarations.iter().cloned());
        declarations.push(declaration);

        Ok(Self {
            declarations: Arc::new(declarations),
        })
    }

    #[must_use]
    pub fn declares(&self, declaration: &Declaration) -> bool {
        self.declarations.contains(declaration)
    }

    #[must_use]
    pub fn declares_variable(&self, name: &str) -> bool {
        self.declarations
            .iter()
            .any(|d| matches!(d, Declaration::Variable(v) if v == name))
    }

    /// Compile an expression in this environment
    ///
    /// # Errors
    ///
    /// Returns an error if the expression cannot be parsed
    pub fn compile(&self, source: &str) -> Result<CompiledExpression> {
        CompiledExpression::compile(source, |name| self.declares_variable(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extend_leaves_original_untouched() {
        let base = Environment::with_bindings(["object"]).unwrap();
        let extended = base.extend(Declaration::Variable("foo".to_string())).unwrap();

        assert!(!base.declares_variable("foo"));
        assert!(extended.declares_variable("foo"));
        assert!(extended.declares(&Declaration::Binding("object".to_string())));
    }

    #[test]
    fn test_duplicate_binding_is_rejected() {
        let err = Environment::with_bindings(["object", "object"]).unwrap_err();
        assert!(err.to_string().contains("could not declare object"));
    }

    #[test]
    fn test_duplicate_variable_is_rejected() {
        let env = Environment::default().extend(Declaration::Variable("foo".to_string())).unwrap();
        let err = env.extend(Declaration::Variable("foo".to_string())).unwrap_err();
        assert!(err.to_string().contains("could not declare variables.foo"));
    }

    #[test]
    fn test_variable_and_binding_with_same_name_coexist() {
        let env = Environment::with_bindings(["foo"]).unwrap();
        let _ = env.extend(Declaration::Variable("foo".to_string())).unwrap();
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_compile_sees_only_earlier_variables() {
        let first = Environment::default().extend(Declaration::Variable("a".to_string())).unwrap();
        let expr = first.compile("variables.a && variables.b").unwrap();
        assert_eq!(expr.variables(), ["a".to_string()]);
    }
}
