//! Function registry and compiled expressions

use std::collections::HashMap;
use std::fmt;

use jmespath_ast::{Ast, JmespathError, Spanned, ToJmespath};
use once_cell::sync::Lazy;
use tracing::debug;

use crate::functions::{Function, builtins};
use crate::{Context, SearchResult, interpret};

/// Runtime holding the built-in functions, shared by `compile` and the macro.
pub static DEFAULT_RUNTIME: Lazy<Runtime> = Lazy::new(Runtime::with_builtins);

/// Registry of functions available to expressions
#[derive(Default)]
pub struct Runtime {
    functions: HashMap<String, Box<dyn Function>>,
}

impl Runtime {
    /// Create an empty runtime without any functions
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a runtime with the standard function library registered
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut runtime = Self::new();
        runtime.register_builtin_functions();
        runtime
    }

    pub fn register_builtin_functions(&mut self) {
        for (name, function) in builtins() {
            self.register_function(name, function);
        }
    }

    /// Register a function, replacing any function with the same name
    pub fn register_function(&mut self, name: &str, function: Box<dyn Function>) {
        self.functions.insert(name.to_string(), function);
    }

    /// Remove a function, returning it if it was registered
    pub fn deregister_function(&mut self, name: &str) -> Option<Box<dyn Function>> {
        self.functions.remove(name)
    }

    #[must_use]
    pub fn get_function(&self, name: &str) -> Option<&dyn Function> {
        self.functions.get(name).map(|function| &**function)
    }

    /// Parse an expression bound to this runtime
    ///
    /// # Errors
    ///
    /// Returns a parse `JmespathError` when the expression is invalid
    pub fn compile<'a>(&'a self, expression: &str) -> Result<Expression<'a>, JmespathError> {
        let ast = jmespath_parser::parse(expression)?;
        Ok(Expression::new(expression, ast, self))
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.functions.keys().collect();
        names.sort();
        f.debug_struct("Runtime").field("functions", &names).finish()
    }
}

/// A parsed expression ready to be searched against data
#[derive(Clone)]
pub struct Expression<'a> {
    expression: String,
    ast: Spanned<Ast>,
    runtime: &'a Runtime,
}

impl<'a> Expression<'a> {
    #[must_use]
    pub fn new(expression: &str, ast: Spanned<Ast>, runtime: &'a Runtime) -> Self {
        Self {
            expression: expression.to_string(),
            ast,
            runtime,
        }
    }

    /// Evaluate the expression against `data`
    ///
    /// # Errors
    ///
    /// Returns a `JmespathError` when `data` cannot be converted or evaluation fails
    pub fn search<T: ToJmespath>(&self, data: T) -> SearchResult {
        let data = data
            .to_jmespath()
            .map_err(|err| JmespathError::new(&self.expression, 0, err.reason))?;
        debug!(expression = %self.expression, "Searching");
        let mut ctx = Context::new(&self.expression, self.runtime);
        interpret(&data, &self.ast, &mut ctx)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.expression
    }

    #[must_use]
    pub const fn as_ast(&self) -> &Spanned<Ast> {
        &self.ast
    }
}

impl fmt::Display for Expression<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression)
    }
}

impl fmt::Debug for Expression<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expression")
            .field("expression", &self.expression)
            .field("ast", &self.ast)
            .finish_non_exhaustive()
    }
}

impl PartialEq for Expression<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.expression == other.expression && self.ast == other.ast
    }
}
