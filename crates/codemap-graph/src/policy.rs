//! Which REFERENCES edges are kept.
//!
//! Without type resolution the graph cannot tell a call from a declaration
//! that merely shares a name, so candidate edges go through a
//! [`DirectionPolicy`] before they are added.

use crate::model::{CodeNode, NodeKind};

/// Decides whether a REFERENCES edge from `source` to `target` is kept.
pub trait DirectionPolicy: Send + Sync {
    fn allows(&self, source: &CodeNode, target: &CodeNode) -> bool;
}

/// Naming-convention policy.
///
/// An edge is kept when
/// - the source is a method of a class named with the implementation suffix
///   and the target is the same-named method of the class it implements,
/// - the source is a function, or
/// - the target is a class or interface.
///
/// Everything else (for example a file naming a function) is dropped.
///
/// # Examples
///
/// ```
/// use codemap_graph::model::{CodeNode, NodeKind};
/// use codemap_graph::policy::{ConventionPolicy, DirectionPolicy};
///
/// let file = CodeNode::file("Main.java", "");
/// let mut class = CodeNode::file("Bank.java", "");
/// class.name = "Bank.java:Bank".into();
/// class.kind = NodeKind::Class;
/// let mut method = class.clone();
/// method.name = "Bank.java:Bank.transfer".into();
/// method.kind = NodeKind::Function;
///
/// let policy = ConventionPolicy::default();
/// assert!(policy.allows(&file, &class));
/// assert!(policy.allows(&method, &class));
/// assert!(!policy.allows(&file, &method));
/// ```
#[derive(Debug, Clone)]
pub struct ConventionPolicy {
    impl_suffix: String,
}

impl Default for ConventionPolicy {
    fn default() -> Self {
        Self::new("Impl")
    }
}

impl ConventionPolicy {
    pub fn new(impl_suffix: impl Into<String>) -> Self {
        Self {
            impl_suffix: impl_suffix.into(),
        }
    }

    pub fn impl_suffix(&self) -> &str {
        &self.impl_suffix
    }

    /// `FooImpl.run` pointing at `Foo.run`.
    pub fn implements(&self, source: &CodeNode, target: &CodeNode) -> bool {
        if self.impl_suffix.is_empty()
            || source.kind != NodeKind::Function
            || target.kind != NodeKind::Function
        {
            return false;
        }
        let (Some(source_owner), Some(target_owner)) =
            (source.owning_class.as_deref(), target.owning_class.as_deref())
        else {
            return false;
        };
        let Some(base) = class_name(source_owner).strip_suffix(self.impl_suffix.as_str()) else {
            return false;
        };
        base == class_name(target_owner) && member_name(source) == member_name(target)
    }
}

impl DirectionPolicy for ConventionPolicy {
    fn allows(&self, source: &CodeNode, target: &CodeNode) -> bool {
        self.implements(source, target)
            || source.kind == NodeKind::Function
            || target.kind.is_type()
    }
}

/// `Bank` for `src/Bank.java:Bank`.
fn class_name(owner: &str) -> &str {
    let symbol = owner.rsplit_once(':').map_or(owner, |(_, s)| s);
    symbol.rsplit('.').next().unwrap_or(symbol)
}

/// `transfer` for `src/Bank.java:Bank.transfer`.
fn member_name(node: &CodeNode) -> &str {
    let symbol = node.qualified_symbol();
    symbol.rsplit('.').next().unwrap_or(symbol)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str, kind: NodeKind, owner: Option<&str>) -> CodeNode {
        let file = name.split(':').next().unwrap();
        let mut node = CodeNode::file(file, "");
        node.name = name.to_string();
        node.kind = kind;
        node.owning_class = owner.map(str::to_string);
        node
    }

    #[test]
    fn function_source_is_always_valid() {
        let policy = ConventionPolicy::default();
        let caller = node("a.py:main", NodeKind::Function, None);
        let callee = node("b.py:helper", NodeKind::Function, None);
        assert!(policy.allows(&caller, &callee));
    }

    #[test]
    fn file_to_function_is_dropped() {
        let policy = ConventionPolicy::default();
        let file = node("a.py", NodeKind::File, None);
        let callee = node("b.py:helper", NodeKind::Function, None);
        assert!(!policy.allows(&file, &callee));
    }

    #[test]
    fn class_and_interface_targets_are_valid_from_anywhere() {
        let policy = ConventionPolicy::default();
        let file = node("Main.java", NodeKind::File, None);
        let class = node("Bank.java:Bank", NodeKind::Class, None);
        let iface = node("Ledger.java:Ledger", NodeKind::Interface, None);
        assert!(policy.allows(&file, &class));
        assert!(policy.allows(&class, &iface));
    }

    #[test]
    fn class_to_function_is_dropped() {
        let policy = ConventionPolicy::default();
        let class = node("Bank.java:Bank", NodeKind::Class, None);
        let method = node("Util.java:Util.log", NodeKind::Function, Some("Util.java:Util"));
        assert!(!policy.allows(&class, &method));
    }

    #[test]
    fn impl_method_implements_interface_method() {
        let policy = ConventionPolicy::default();
        let imp = node(
            "svc/AccountServiceImpl.java:AccountServiceImpl.open",
            NodeKind::Function,
            Some("svc/AccountServiceImpl.java:AccountServiceImpl"),
        );
        let decl = node(
            "svc/AccountService.java:AccountService.open",
            NodeKind::Function,
            Some("svc/AccountService.java:AccountService"),
        );
        let other = node(
            "svc/AccountService.java:AccountService.close",
            NodeKind::Function,
            Some("svc/AccountService.java:AccountService"),
        );
        assert!(policy.implements(&imp, &decl));
        assert!(!policy.implements(&imp, &other));
        assert!(!policy.implements(&decl, &imp));
    }

    #[test]
    fn custom_suffix() {
        let policy = ConventionPolicy::new("Default");
        let imp = node(
            "A.java:StoreDefault.get",
            NodeKind::Function,
            Some("A.java:StoreDefault"),
        );
        let decl = node("B.java:Store.get", NodeKind::Function, Some("B.java:Store"));
        assert!(policy.implements(&imp, &decl));
        assert!(!ConventionPolicy::default().implements(&imp, &decl));
    }

    struct ClassesOnly;

    impl DirectionPolicy for ClassesOnly {
        fn allows(&self, _source: &CodeNode, target: &CodeNode) -> bool {
            target.kind == NodeKind::Class
        }
    }

    #[test]
    fn policies_are_pluggable() {
        let policy: Box<dyn DirectionPolicy> = Box::new(ClassesOnly);
        let caller = node("a.py:main", NodeKind::Function, None);
        let callee = node("b.py:helper", NodeKind::Function, None);
        assert!(!policy.allows(&caller, &callee));
    }
}
