use std::collections::HashMap;

/// In-memory state of one interpreter run.
///
/// The environment contains:
/// - `vars`: the variable store, mapping a name to its integer value.
/// - `functions`: the function store, mapping a name to the body captured by `func`.
///
/// Variables and functions live in separate namespaces: defining a function `x`
/// never touches a variable `x` and vice versa. Nothing is ever removed; both
/// maps are dropped together with the interpreter.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    /// Variable store. Created on first assignment, overwritten afterwards.
    pub vars: HashMap<String, i32>,
    /// Function store. Bodies are kept in the order they were written.
    pub functions: HashMap<String, Vec<String>>,
}

impl Environment {
    /// Create an empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the value of a variable.
    ///
    /// Unknown variables read as `0`, the same way conditions and loops see them.
    pub fn get_var(&self, name: &str) -> i32 {
        self.vars.get(name).copied().unwrap_or_default()
    }

    /// Set or override a variable.
    pub fn set_var(&mut self, name: impl Into<String>, value: i32) {
        self.vars.insert(name.into(), value);
    }

    /// Mutable access to a variable, creating it with value `0` if it does not exist yet.
    pub fn var_mut(&mut self, name: &str) -> &mut i32 {
        self.vars.entry(name.to_string()).or_default()
    }

    /// Store a function body under `name`, replacing any earlier definition.
    pub fn define_function(&mut self, name: impl Into<String>, body: Vec<String>) {
        self.functions.insert(name.into(), body);
    }

    /// Look up the stored body of a function.
    pub fn function(&self, name: &str) -> Option<&[String]> {
        self.functions.get(name).map(Vec::as_slice)
    }
}
