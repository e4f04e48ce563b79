//! Macro definitions, the shared macro table, and the expansion guard
//! stack.

use std::cell::RefCell;
use std::rc::Rc;

use hashbrown::HashMap;
use symbol_table::GlobalSymbol as Symbol;

use crate::pp::token::Token;

pub const VA_ARGS: &str = "__VA_ARGS__";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MacroKind {
    Object,
    Function { params: Vec<Symbol>, variadic: bool },
}

/// A stored macro. The body is a pure token sequence with no whitespace at
/// either end; for variadic macros `__VA_ARGS__` is the last parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Macro {
    pub name: Symbol,
    pub body: Vec<Token>,
    pub kind: MacroKind,
}

impl Macro {
    pub fn object(name: Symbol, body: Vec<Token>) -> Self {
        Macro {
            name,
            body,
            kind: MacroKind::Object,
        }
    }

    pub fn function(name: Symbol, params: Vec<Symbol>, variadic: bool, body: Vec<Token>) -> Self {
        Macro {
            name,
            body,
            kind: MacroKind::Function { params, variadic },
        }
    }

    pub fn params(&self) -> &[Symbol] {
        match &self.kind {
            MacroKind::Object => &[],
            MacroKind::Function { params, .. } => params,
        }
    }

    pub fn is_function_like(&self) -> bool {
        matches!(self.kind, MacroKind::Function { .. })
    }

    pub fn is_variadic(&self) -> bool {
        matches!(self.kind, MacroKind::Function { variadic: true, .. })
    }
}

/// The identifier → macro map, shared by handle along the whole pipeline
/// and mutated only by `#define`/`#undef`.
#[derive(Debug, Clone, Default)]
pub struct MacroTable {
    entries: Rc<RefCell<HashMap<Symbol, Macro>>>,
}

impl MacroTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a macro, silently replacing any prior definition.
    pub fn define(&self, macro_def: Macro) {
        self.entries.borrow_mut().insert(macro_def.name, macro_def);
    }

    /// Removes a macro; absent names are not an error.
    pub fn undef(&self, name: Symbol) {
        self.entries.borrow_mut().remove(&name);
    }

    pub fn contains(&self, name: Symbol) -> bool {
        self.entries.borrow().contains_key(&name)
    }

    pub fn get(&self, name: Symbol) -> Option<Macro> {
        self.entries.borrow().get(&name).cloned()
    }
}

/// Names currently under expansion, used to suppress self- and mutual
/// recursion during rescan. A persistent cons list: pushing shares the
/// tail, so every nested expander holds exactly the frames above it.
#[derive(Debug, Clone, Default)]
pub struct MacroStack {
    head: Option<Rc<Frame>>,
}

#[derive(Debug)]
struct Frame {
    name: Symbol,
    parent: Option<Rc<Frame>>,
}

impl MacroStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a stack extended by `name`; the receiver is unchanged.
    pub fn push(&self, name: Symbol) -> Self {
        MacroStack {
            head: Some(Rc::new(Frame {
                name,
                parent: self.head.clone(),
            })),
        }
    }

    pub fn contains(&self, name: Symbol) -> bool {
        let mut frame = self.head.as_deref();
        while let Some(f) = frame {
            if f.name == name {
                return true;
            }
            frame = f.parent.as_deref();
        }
        false
    }
}
