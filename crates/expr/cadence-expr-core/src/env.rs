//! Compile environment: the names an expression may reference.

use hashbrown::HashMap;

/// Constants every environment built with [`Environment::with_default_constants`] knows.
pub const DEFAULT_CONSTANTS: &[(&str, f32)] = &[("PI", std::f32::consts::PI)];

/// Variables are positional: the n-th declared name compiles to `PushVariable(n)`.
/// Constants are folded to literals at compile time.
#[derive(Clone, Debug, Default)]
pub struct Environment {
    variables: Vec<String>,
    variable_index: HashMap<String, u32>,
    constants: HashMap<String, f32>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Environment declaring `names` as variables, in order.
    pub fn with_variables<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        names
            .into_iter()
            .fold(Self::new(), |env, name| env.variable(name))
    }

    /// Declare the next positional variable. Redeclaring a name keeps its first index.
    pub fn variable(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        let next = self.variables.len() as u32;
        if !self.variable_index.contains_key(&name) {
            self.variable_index.insert(name.clone(), next);
            self.variables.push(name);
        }
        self
    }

    pub fn constant(mut self, name: impl Into<String>, value: f32) -> Self {
        self.constants.insert(name.into(), value);
        self
    }

    pub fn with_default_constants(self) -> Self {
        DEFAULT_CONSTANTS
            .iter()
            .fold(self, |env, (name, value)| env.constant(*name, *value))
    }

    #[inline]
    pub fn variable_index(&self, name: &str) -> Option<u32> {
        self.variable_index.get(name).copied()
    }

    #[inline]
    pub fn constant_value(&self, name: &str) -> Option<f32> {
        self.constants.get(name).copied()
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }
}
