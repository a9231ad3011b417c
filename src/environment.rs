use rustc_hash::FxHashMap;

use crate::object::Object;
use crate::Shared;

/// One lexical scope. Lookups walk outward through `enclosing`; writes always
/// land in the innermost scope.
#[derive(Debug, Default)]
pub struct Environment {
    pub enclosing: Option<Shared<Environment>>,
    values: FxHashMap<String, Object>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enclosing(self, enclosing: Shared<Environment>) -> Self {
        Self { enclosing: Some(enclosing), ..Default::default() }
    }

    pub fn as_shared(self) -> Shared<Self> {
        std::rc::Rc::new(std::cell::RefCell::new(self))
    }

    pub fn set(&mut self, name: &str, value: Object) {
        self.values.insert(name.to_owned(), value);
    }

    pub fn get(&self, name: &str) -> Option<Object> {
        if let Some(value) = self.values.get(name) {
            return Some(value.clone());
        }

        // Ask one level above if possible
        self.enclosing.as_ref().and_then(|e| e.borrow().get(name))
    }

    /// Bindings of this scope only.
    pub fn get_all(&self) -> &FxHashMap<String, Object> {
        &self.values
    }
}
