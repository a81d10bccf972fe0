//! Policy variables, evaluated at most once and only when reached
//!
//! Reads of declared variables are compiled into calls to
//! [`VARIABLE_FUNCTION`]. A [`VariableSet`] registers that function on the
//! run's context, so a variable is resolved the first time evaluation reaches
//! one of its reads and served from its cache afterwards.

use super::report::VariableOutcome;
use crate::Result;
use crate::admission::NamedExpression;
use crate::expr::{CompiledExpression, Declaration, Environment, VARIABLE_FUNCTION, to_json};
use cel_interpreter::{Context, ExecutionError, FunctionContext, Value};
use core::sync::atomic::{AtomicU32, Ordering};
use ohno::app_err;
use serde_json::Value as JsonValue;
use std::sync::{Arc, Mutex, PoisonError};

const LOG_TARGET: &str = " variables";

/// The cached result of evaluating a variable
#[derive(Debug, Clone)]
pub struct Resolution {
    pub value: core::result::Result<Value, String>,
    pub cost: u64,
}

#[derive(Debug, Clone, Default)]
enum State {
    #[default]
    NotEvaluated,
    Evaluated(Resolution),
}

#[derive(Debug)]
pub struct LazyVariable {
    name: String,
    expression: CompiledExpression,
    state: Mutex<State>,
    executions: AtomicU32,
}

impl LazyVariable {
    fn new(name: String, expression: CompiledExpression) -> Self {
        Self {
            name,
            expression,
            state: Mutex::new(State::NotEvaluated),
            executions: AtomicU32::new(0),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// How many times the expression has run
    #[must_use]
    pub fn executions(&self) -> u32 {
        self.executions.load(Ordering::Relaxed)
    }

    fn cached(&self) -> Option<Resolution> {
        match &*self.state.lock().unwrap_or_else(PoisonError::into_inner) {
            State::Evaluated(resolution) => Some(resolution.clone()),
            State::NotEvaluated => None,
        }
    }

    fn store(&self, resolution: Resolution) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = State::Evaluated(resolution);
    }
}

/// The variables declared by a policy, in declaration order
#[derive(Debug, Default)]
pub struct VariableSet {
    variables: Vec<LazyVariable>,
}

impl VariableSet {
    /// Compile and declare each variable in turn
    ///
    /// Each variable is compiled in the environment holding only the variables
    /// declared before it. Returns the environment extended with every variable.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable fails to parse or its name is already declared
    pub fn declare(environment: &Environment, declarations: &[NamedExpression]) -> Result<(Environment, Arc<Self>)> {
        let mut environment = environment.clone();
        let mut variables = Vec::with_capacity(declarations.len());

        for declaration in declarations {
            let expression = environment
                .compile(&declaration.expression)
                .map_err(|e| app_err!("failed to parse expression for variable {}: {e}", declaration.name))?;

            environment = environment
                .extend(Declaration::Variable(declaration.name.clone()))
                .map_err(|e| app_err!("could not append variable {} to the environment: {e}", declaration.name))?;

            log::debug!(target: LOG_TARGET, "Declared variable '{}' = {}", declaration.name, declaration.expression);
            variables.push(LazyVariable::new(declaration.name.clone(), expression));
        }

        Ok((environment, Arc::new(Self { variables })))
    }

    /// Make the variables resolvable by expressions run in `context`
    pub fn register(self: &Arc<Self>, context: &mut Context<'_>) {
        let variables = Arc::clone(self);
        context.add_function(VARIABLE_FUNCTION, move |ftx: &FunctionContext, name: Arc<String>| {
            variables.read(ftx, &name)
        });
    }

    fn read(&self, ftx: &FunctionContext, name: &str) -> core::result::Result<Value, ExecutionError> {
        match self.resolve(name, ftx.ptx) {
            Some(Resolution { value: Ok(value), .. }) => Ok(value),
            Some(Resolution { value: Err(e), .. }) => Err(ExecutionError::function_error(&format!("variables.{name}"), e)),
            None => Err(ExecutionError::no_such_key(name)),
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&LazyVariable> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// Resolve a variable by name, evaluating it on first use
    #[must_use]
    pub fn resolve(&self, name: &str, context: &Context<'_>) -> Option<Resolution> {
        self.get(name).map(|variable| Self::resolve_variable(variable, context))
    }

    fn resolve_variable(variable: &LazyVariable, context: &Context<'_>) -> Resolution {
        if let Some(resolution) = variable.cached() {
            return resolution;
        }

        let execution = variable.expression.execute(context);
        let _ = variable.executions.fetch_add(1, Ordering::Relaxed);
        log::debug!(target: LOG_TARGET, "Evaluated variable '{}' with cost {}", variable.name, execution.cost);

        let resolution = Resolution {
            value: execution.value,
            cost: execution.cost,
        };
        variable.store(resolution.clone());
        resolution
    }

    /// The variables that were evaluated, in declaration order
    #[must_use]
    pub fn outcomes(&self) -> Vec<VariableOutcome> {
        self.variables
            .iter()
            .filter_map(|variable| {
                let resolution = variable.cached()?;
                let (value, error) = match resolution.value.as_ref().map_err(Clone::clone).and_then(to_json) {
                    Ok(value) => (value, None),
                    Err(e) => (JsonValue::Null, Some(e)),
                };

                Some(VariableOutcome {
                    name: variable.name.clone(),
                    value,
                    cost: resolution.cost,
                    error,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::to_cel;
    use serde_json::json;

    fn declarations(pairs: &[(&str, &str)]) -> Vec<NamedExpression> {
        pairs
            .iter()
            .map(|(name, expression)| NamedExpression {
                name: (*name).to_string(),
                expression: (*expression).to_string(),
            })
            .collect()
    }

    struct Fixture {
        env: Environment,
        set: Arc<VariableSet>,
        context: Context<'static>,
    }

    impl Fixture {
        fn new(pairs: &[(&str, &str)], object: &JsonValue) -> Self {
            let base = Environment::with_bindings(["object"]).unwrap();
            let (env, set) = VariableSet::declare(&base, &declarations(pairs)).unwrap();

            let mut context = Context::default();
            context.add_variable_from_value("object", to_cel(object));
            set.register(&mut context);

            Self { env, set, context }
        }

        fn run(&self, source: &str) -> core::result::Result<Value, String> {
            self.env.compile(source).unwrap().execute(&self.context).value
        }

        fn executions(&self, name: &str) -> u32 {
            self.set.get(name).unwrap().executions()
        }
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_unreferenced_variables_are_never_evaluated() {
        let fixture = Fixture::new(&[("a", "object.x + 1"), ("b", "object.y")], &json!({"x": 1}));

        assert_eq!(fixture.run("variables.a == 2"), Ok(Value::Bool(true)));
        assert_eq!(fixture.executions("a"), 1);
        assert_eq!(fixture.executions("b"), 0);

        let outcomes = fixture.set.outcomes();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].name, "a");
        assert_eq!(outcomes[0].value, json!(2));
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_variables_behind_untaken_branches_are_never_evaluated() {
        let fixture = Fixture::new(&[("expensive", "object.spec.missing.deep")], &json!({"spec": {}}));

        assert_eq!(
            fixture.run("has(object.spec.missing) ? variables.expensive == 1 : true"),
            Ok(Value::Bool(true))
        );
        assert_eq!(fixture.run("false && variables.expensive == 1"), Ok(Value::Bool(false)));
        assert_eq!(fixture.run("true || variables.expensive == 1"), Ok(Value::Bool(true)));

        assert_eq!(fixture.executions("expensive"), 0);
        assert!(fixture.set.outcomes().is_empty());
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_index_form_reads_the_variable() {
        let fixture = Fixture::new(&[("foo", "'x'")], &json!({}));

        assert_eq!(fixture.run("variables['foo'] == 'x'"), Ok(Value::Bool(true)));
        assert_eq!(fixture.run(r#"variables["foo"] + variables.foo"#), Ok(Value::String(Arc::new("xx".to_string()))));
        assert_eq!(fixture.executions("foo"), 1);
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_presence_of_a_declared_variable() {
        let fixture = Fixture::new(&[("foo", "object.missing")], &json!({}));

        assert_eq!(fixture.run("has(variables.foo)"), Ok(Value::Bool(true)));
        assert_eq!(fixture.executions("foo"), 0);
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_resolution_is_memoized() {
        let fixture = Fixture::new(&[("a", "object.x * 2")], &json!({"x": 21}));

        let first = fixture.set.resolve("a", &fixture.context).unwrap();
        let second = fixture.set.resolve("a", &fixture.context).unwrap();
        assert_eq!(fixture.run("variables.a + variables.a"), Ok(Value::Int(84)));

        assert_eq!(first.value, second.value);
        assert_eq!(first.cost, second.cost);
        assert_eq!(fixture.executions("a"), 1);
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_variables_can_build_on_earlier_variables() {
        let fixture = Fixture::new(&[("a", "object.x"), ("b", "variables.a + 10")], &json!({"x": 5}));

        assert_eq!(fixture.run("variables.b"), Ok(Value::Int(15)));
        let names: Vec<_> = fixture.set.outcomes().into_iter().map(|o| o.name).collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_default_when_field_missing() {
        let fixture = Fixture::new(&[("foo", r#"has(object.foo) ? object.foo : "default""#)], &json!({}));

        assert_eq!(fixture.run("variables.foo == 'default'"), Ok(Value::Bool(true)));

        let outcomes = fixture.set.outcomes();
        assert_eq!(outcomes[0].value, json!("default"));
        assert_eq!(outcomes[0].error, None);
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_failing_variable_is_reported_with_error() {
        let fixture = Fixture::new(&[("bad", "object.missing.field")], &json!({}));

        let err = fixture.run("variables.bad == 1").unwrap_err();
        assert!(err.contains("variables.bad"), "{err}");

        let outcome = &fixture.set.outcomes()[0];
        assert_eq!(outcome.value, JsonValue::Null);
        assert!(outcome.error.as_deref().unwrap().starts_with("Unexpected error evaluating expression"));
        assert!(outcome.cost > 0);
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_later_variables_are_not_visible() {
        let fixture = Fixture::new(&[("a", "variables.b"), ("b", "1")], &json!({}));

        let resolution = fixture.set.resolve("a", &fixture.context).unwrap();
        let _ = resolution.value.unwrap_err();
        assert_eq!(fixture.executions("b"), 0);
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_parse_error_names_the_variable() {
        let env = Environment::with_bindings(["object"]).unwrap();
        let err = VariableSet::declare(&env, &declarations(&[("broken", "object.(")])).unwrap_err();
        assert!(err.to_string().contains("failed to parse expression for variable broken"));
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_duplicate_variable_name() {
        let env = Environment::with_bindings(["object"]).unwrap();
        let err = VariableSet::declare(&env, &declarations(&[("a", "1"), ("a", "2")])).unwrap_err();
        assert!(err.to_string().contains("could not append variable a"));
    }
}
