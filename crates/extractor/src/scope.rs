/// Traversal-local stack of enclosing class and function names.
///
/// Declared names are flat (`path::[Class.]name`), while the caller identity
/// used for call edges joins the whole function stack (`path::[Class.]outer.inner`).
#[derive(Debug, Default, Clone)]
pub struct ScopeStack {
    current_class: Option<String>,
    functions: Vec<String>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter a class body; returns the class that was active before
    pub fn enter_class(&mut self, name: &str) -> Option<String> {
        self.current_class.replace(name.to_string())
    }

    /// Leave a class body, restoring the previous class
    pub fn exit_class(&mut self, previous: Option<String>) {
        self.current_class = previous;
    }

    pub fn push_function(&mut self, name: &str) {
        self.functions.push(name.to_string());
    }

    pub fn pop_function(&mut self) {
        self.functions.pop();
    }

    pub fn current_class(&self) -> Option<&str> {
        self.current_class.as_deref()
    }

    pub fn in_function(&self) -> bool {
        !self.functions.is_empty()
    }

    /// Qualified name a class declared at this point receives
    pub fn class_name(file_path: &str, class: &str) -> String {
        format!("{file_path}::{class}")
    }

    /// Qualified name a function declared at this point receives
    pub fn declared_function(&self, file_path: &str, function: &str) -> String {
        match &self.current_class {
            Some(class) => format!("{file_path}::{class}.{function}"),
            None => format!("{file_path}::{function}"),
        }
    }

    /// Identity of the code currently executing, `None` outside any function
    pub fn caller(&self, file_path: &str) -> Option<String> {
        if self.functions.is_empty() {
            return None;
        }
        let stack = self.functions.join(".");
        Some(match &self.current_class {
            Some(class) => format!("{file_path}::{class}.{stack}"),
            None => format!("{file_path}::{stack}"),
        })
    }
}
