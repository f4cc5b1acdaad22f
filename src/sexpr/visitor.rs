//! Generic visitor dispatching on node kind and list tag.
//!
//! A visitor registers its handlers once, at construction, in a
//! [`Handlers`] table. Dispatch then looks the node up in that table:
//! integers and strings go to their handlers, a list whose first element is
//! a symbol goes to the handler registered for that tag, and any other list
//! goes to the plain-list handler. A missing handler is not an error: the
//! walk logs a warning and yields `None` for that subtree, which is how
//! unknown DjVu tags are skipped.
//!
//! # Example
//!
//! ```
//! use djvu2pdf::sexpr::{self, Handlers, SExpr, SExprVisitor};
//!
//! struct WordCounter {
//!     handlers: Handlers<Self>,
//! }
//!
//! impl WordCounter {
//!     fn new() -> Self {
//!         let handlers = Handlers::<Self>::new()
//!             .on_tag("word", |_, _, _| Some(1))
//!             .on_tags(&["line", "page"], |v, items, ctx| {
//!                 Some(items[5..].iter().filter_map(|c| v.visit(c, ctx)).sum())
//!             });
//!         Self { handlers }
//!     }
//! }
//!
//! impl SExprVisitor for WordCounter {
//!     type Context = ();
//!     type Output = usize;
//!
//!     fn handlers(&self) -> &Handlers<Self> {
//!         &self.handlers
//!     }
//! }
//!
//! let page = sexpr::parse(br#"(page 0 0 9 9 (line 0 0 9 9 (word 0 0 1 1 "a") (word 2 0 3 1 "b")))"#).unwrap();
//! assert_eq!(WordCounter::new().visit(&page, ()), Some(2));
//! ```

use super::{ListDisplay, SExpr};
use std::collections::HashMap;
use std::fmt;

/// Handler for integer nodes.
pub type IntegerHandler<V> =
    fn(&mut V, i64, <V as SExprVisitor>::Context) -> Option<<V as SExprVisitor>::Output>;

/// Handler for string nodes; receives the raw, undecoded bytes.
pub type StringHandler<V> =
    fn(&mut V, &[u8], <V as SExprVisitor>::Context) -> Option<<V as SExprVisitor>::Output>;

/// Handler for list nodes; receives all items, the leading tag included.
pub type ListHandler<V> =
    fn(&mut V, &[SExpr], <V as SExprVisitor>::Context) -> Option<<V as SExprVisitor>::Output>;

/// Handler table of a visitor.
pub struct Handlers<V: SExprVisitor> {
    integer: Option<IntegerHandler<V>>,
    string: Option<StringHandler<V>>,
    plain_list: Option<ListHandler<V>>,
    tags: HashMap<&'static str, ListHandler<V>>,
}

impl<V: SExprVisitor> Handlers<V> {
    /// Create an empty table. Every node dispatches to the "unrecognized" path.
    pub fn new() -> Self {
        Self {
            integer: None,
            string: None,
            plain_list: None,
            tags: HashMap::new(),
        }
    }

    /// Set the integer handler.
    pub fn on_integer(mut self, handler: IntegerHandler<V>) -> Self {
        self.integer = Some(handler);
        self
    }

    /// Set the string handler.
    pub fn on_string(mut self, handler: StringHandler<V>) -> Self {
        self.string = Some(handler);
        self
    }

    /// Set the handler for empty and untagged lists.
    pub fn on_plain_list(mut self, handler: ListHandler<V>) -> Self {
        self.plain_list = Some(handler);
        self
    }

    /// Register a handler for lists tagged with `tag`.
    pub fn on_tag(mut self, tag: &'static str, handler: ListHandler<V>) -> Self {
        self.tags.insert(tag, handler);
        self
    }

    /// Register one handler for several synonymous tags.
    pub fn on_tags(mut self, tags: &[&'static str], handler: ListHandler<V>) -> Self {
        for tag in tags {
            self.tags.insert(tag, handler);
        }
        self
    }

    /// Integer handler, if any.
    pub fn integer(&self) -> Option<IntegerHandler<V>> {
        self.integer
    }

    /// String handler, if any.
    pub fn string(&self) -> Option<StringHandler<V>> {
        self.string
    }

    /// Plain-list handler, if any.
    pub fn plain_list(&self) -> Option<ListHandler<V>> {
        self.plain_list
    }

    /// Handler registered for `tag`, if any.
    pub fn tag(&self, tag: &str) -> Option<ListHandler<V>> {
        self.tags.get(tag).copied()
    }
}

impl<V: SExprVisitor> Default for Handlers<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: SExprVisitor> Clone for Handlers<V> {
    fn clone(&self) -> Self {
        Self {
            integer: self.integer,
            string: self.string,
            plain_list: self.plain_list,
            tags: self.tags.clone(),
        }
    }
}

impl<V: SExprVisitor> fmt::Debug for Handlers<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<_> = self.tags.keys().collect();
        tags.sort();
        f.debug_struct("Handlers")
            .field("integer", &self.integer.is_some())
            .field("string", &self.string.is_some())
            .field("plain_list", &self.plain_list.is_some())
            .field("tags", &tags)
            .finish()
    }
}

/// A recursive walker over S-expression trees.
///
/// Implementors supply the handler table; `visit` and `visit_list` do the
/// dispatch. Handlers recurse by calling `visit` again with a (possibly
/// changed) context.
pub trait SExprVisitor: Sized {
    /// Per-visitor state threaded through the recursion by value.
    type Context: Clone;

    /// Result of visiting one node.
    type Output;

    /// The handler table built at construction.
    fn handlers(&self) -> &Handlers<Self>;

    /// Visit any node.
    fn visit(&mut self, node: &SExpr, ctx: Self::Context) -> Option<Self::Output> {
        match node {
            SExpr::Integer(value) => {
                let handler = self.handlers().integer();
                match handler {
                    Some(handler) => handler(self, *value, ctx),
                    None => {
                        log::warn!("Don't know how to visit integer {}", value);
                        None
                    }
                }
            }
            SExpr::String(bytes) => {
                let handler = self.handlers().string();
                match handler {
                    Some(handler) => handler(self, bytes, ctx),
                    None => {
                        log::warn!("Don't know how to visit string {}", node);
                        None
                    }
                }
            }
            SExpr::List(items) => self.visit_list(items, ctx),
            SExpr::Symbol(_) => self.visit_other(node, ctx),
        }
    }

    /// Visit a list given as its items.
    fn visit_list(&mut self, items: &[SExpr], ctx: Self::Context) -> Option<Self::Output> {
        if let Some(SExpr::Symbol(tag)) = items.first() {
            let handler = self.handlers().tag(tag);
            return match handler {
                Some(handler) => handler(self, items, ctx),
                None => {
                    log::warn!("Don't know how to visit {} list {}", tag, ListDisplay(items));
                    None
                }
            };
        }

        let handler = self.handlers().plain_list();
        match handler {
            Some(handler) => handler(self, items, ctx),
            None => {
                log::warn!("Don't know how to visit list {}", ListDisplay(items));
                None
            }
        }
    }

    /// Visit a node no other path accepts (a bare symbol).
    fn visit_other(&mut self, node: &SExpr, ctx: Self::Context) -> Option<Self::Output> {
        let _ = ctx;
        log::warn!("Don't know how to visit {}", node);
        None
    }
}
