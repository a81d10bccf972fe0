use super::lazy_variable::VariableSet;
use super::report::VariableOutcome;
use crate::Result;
use crate::admission::{Inputs, NamedExpression};
use crate::authz::{self, Node, NodeArena};
use crate::expr::{self, CompiledExpression, Environment, Execution, to_cel};
use cel_interpreter::Context;
use core::fmt::{self, Debug, Formatter};
use ohno::IntoAppError;
use std::sync::Arc;

/// Which clauses a context serves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Match conditions, which cannot see `namespaceObject`
    MatchConditions,

    /// Validations and audit annotations
    Validations,
}

/// The bindings, declared variables and authorizer nodes of one run
pub struct EvaluationContext {
    environment: Environment,
    context: Context<'static>,
    variables: Arc<VariableSet>,
}

impl Debug for EvaluationContext {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvaluationContext")
            .field("environment", &self.environment)
            .field("variables", &self.variables)
            .finish_non_exhaustive()
    }
}

impl EvaluationContext {
    /// Bind the supplied inputs for the given scope
    ///
    /// Absent inputs leave their binding undeclared. `authorizer` is always
    /// bound, to an empty table when none was supplied.
    ///
    /// # Errors
    ///
    /// Returns an error if the bindings cannot be declared
    pub fn new(inputs: &Inputs, scope: Scope, request_resource: Option<&Node>) -> Result<Self> {
        let namespace = match scope {
            Scope::MatchConditions => None,
            Scope::Validations => inputs.namespace.as_ref(),
        };

        let documents = [
            ("object", inputs.object.as_ref()),
            ("oldObject", inputs.old_object.as_ref()),
            ("request", inputs.request.as_ref()),
            ("namespaceObject", namespace),
        ];

        let arena = NodeArena::new();
        let mut context = Context::default();
        expr::register_library(&mut context);
        authz::register(&mut context, &arena);

        let mut names = Vec::with_capacity(documents.len() + 1);
        for (name, document) in documents {
            if let Some(document) = document {
                context.add_variable_from_value(name, to_cel(document));
                names.push(name);
            }
        }

        let table = inputs.authorizer.clone().unwrap_or_default();
        context.add_variable_from_value("authorizer", arena.insert_root(table, request_resource.cloned()));
        names.push("authorizer");

        Ok(Self {
            environment: Environment::with_bindings(names)?,
            context,
            variables: Arc::default(),
        })
    }

    /// Declare the policy's variables, making them available to later compilations and runs
    ///
    /// # Errors
    ///
    /// Returns an error if a variable fails to parse or collides with another
    pub fn declare_variables(&mut self, declarations: &[NamedExpression]) -> Result<()> {
        let (environment, variables) = VariableSet::declare(&self.environment, declarations)?;
        variables.register(&mut self.context);
        self.environment = environment;
        self.variables = variables;
        Ok(())
    }

    /// Compile a clause against the bindings and declared variables
    ///
    /// # Errors
    ///
    /// Returns an error if the expression cannot be parsed
    pub fn compile(&self, source: &str) -> Result<CompiledExpression> {
        self.environment.compile(source)
    }

    /// Run a clause; the variables it reaches are resolved as evaluation gets to them
    #[must_use]
    pub fn execute(&self, expression: &CompiledExpression) -> Execution {
        expression.execute(&self.context)
    }

    #[must_use]
    pub fn variables(&self) -> &VariableSet {
        &self.variables
    }

    #[must_use]
    pub fn variable_outcomes(&self) -> Vec<VariableOutcome> {
        self.variables.outcomes()
    }
}

/// Resolve `authorizer.requestResource` when both a request and a table were supplied
///
/// # Errors
///
/// Returns an error if navigating to the request's resource fails
pub fn resolve_request_resource(inputs: &Inputs) -> Result<Option<Node>> {
    match (&inputs.request, &inputs.authorizer) {
        (Some(request), Some(table)) => authz::request_resource(table, request)
            .map(Some)
            .into_app_err("failed to resolve the request resource"),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cel_interpreter::Value;
    use serde_json::json;

    fn inputs() -> Inputs {
        Inputs {
            object: Some(json!({"spec": {"replicas": 2}})),
            namespace: Some(json!({"metadata": {"name": "prod"}})),
            ..Inputs::default()
        }
    }

    fn run(context: &EvaluationContext, source: &str) -> core::result::Result<Value, String> {
        context.execute(&context.compile(source).unwrap()).value
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_namespace_hidden_from_match_conditions() {
        let validations = EvaluationContext::new(&inputs(), Scope::Validations, None).unwrap();
        assert_eq!(run(&validations, "namespaceObject.metadata.name"), Ok(Value::String("prod".to_string().into())));

        let matches = EvaluationContext::new(&inputs(), Scope::MatchConditions, None).unwrap();
        let _ = run(&matches, "namespaceObject.metadata.name").unwrap_err();
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_absent_inputs_are_unbound() {
        let context = EvaluationContext::new(&inputs(), Scope::Validations, None).unwrap();
        let _ = run(&context, "oldObject == null").unwrap_err();
        assert_eq!(run(&context, "object.spec.replicas"), Ok(Value::Int(2)));
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_authorizer_always_bound() {
        let context = EvaluationContext::new(&Inputs::default(), Scope::MatchConditions, None).unwrap();
        assert_eq!(
            run(&context, "authorizer.path('/healthz').check('get').allowed()"),
            Ok(Value::Bool(false))
        );
        let _ = run(&context, "authorizer.requestResource.check('get').allowed()").unwrap_err();
    }

    #[test]
    fn test_request_resource_needs_request_and_table() {
        assert_eq!(resolve_request_resource(&inputs()).unwrap(), None);

        let with_both = Inputs {
            request: Some(json!({"resource": {"group": "apps", "resource": "deployments"}})),
            authorizer: Some(authz::AuthorizerTable::default()),
            ..Inputs::default()
        };
        assert!(resolve_request_resource(&with_both).unwrap().is_some());
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_variables_are_declared_into_the_environment() {
        let mut context = EvaluationContext::new(&inputs(), Scope::Validations, None).unwrap();
        context
            .declare_variables(&[NamedExpression {
                name: "replicas".to_string(),
                expression: "object.spec.replicas".to_string(),
            }])
            .unwrap();

        assert_eq!(run(&context, "variables.replicas < 5"), Ok(Value::Bool(true)));
        assert_eq!(context.variable_outcomes().len(), 1);
        assert_eq!(context.variables().get("replicas").unwrap().executions(), 1);
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_kubernetes_library_is_installed() {
        let context = EvaluationContext::new(&inputs(), Scope::MatchConditions, None).unwrap();
        assert_eq!(run(&context, "'A,B'.lowerAscii().split(',').join('+')"), Ok(Value::String("a+b".to_string().into())));
        assert_eq!(run(&context, "quantity('2').isGreaterThan(quantity('1500m'))"), Ok(Value::Bool(true)));
        assert_eq!(run(&context, "url('https://example.com/x').getHostname()"), Ok(Value::String("example.com".to_string().into())));
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_variables_are_resolved_only_when_reached() {
        let mut context = EvaluationContext::new(&inputs(), Scope::Validations, None).unwrap();
        context
            .declare_variables(&[NamedExpression {
                name: "missing".to_string(),
                expression: "object.spec.missing.value".to_string(),
            }])
            .unwrap();

        assert_eq!(run(&context, "has(object.spec.missing) ? variables.missing == 1 : true"), Ok(Value::Bool(true)));
        assert_eq!(context.variables().get("missing").unwrap().executions(), 0);
        assert!(context.variable_outcomes().is_empty());
    }
}
