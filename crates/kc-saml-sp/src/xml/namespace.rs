//! Namespace scopes, namespace-aware lookup, and detached copies.

use std::collections::BTreeMap;

use super::Element;
use crate::error::{SamlError, SamlResult};

const XML_PREFIX: &str = "xml";
const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// In-scope namespace declarations, keyed by prefix (`""` is the default
/// namespace).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NsContext {
    prefixes: BTreeMap<String, String>,
}

impl Default for NsContext {
    fn default() -> Self {
        let mut prefixes = BTreeMap::new();
        prefixes.insert(XML_PREFIX.to_string(), XML_NS.to_string());
        Self { prefixes }
    }
}

impl NsContext {
    /// Returns the scope inside `el`: this scope plus the declarations on `el`.
    #[must_use]
    pub fn scoped(&self, el: &Element) -> Self {
        let mut inner = self.clone();
        for attr in &el.attributes {
            if let Some(prefix) = attr.declared_prefix() {
                inner
                    .prefixes
                    .insert(prefix.to_string(), attr.value.clone());
            }
        }
        inner
    }

    /// Resolves a prefix (`None` for the default namespace) to its URI.
    #[must_use]
    pub fn resolve(&self, prefix: Option<&str>) -> Option<&str> {
        self.prefixes
            .get(prefix.unwrap_or(""))
            .map(String::as_str)
            .filter(|uri| !uri.is_empty())
    }

    /// Returns the namespace URI of `el`'s tag in this scope (`""` when none).
    ///
    /// The scope must already include `el`'s own declarations.
    #[must_use]
    pub fn namespace_of<'a>(&'a self, el: &Element) -> &'a str {
        self.resolve(el.prefix()).unwrap_or("")
    }
}

/// An element viewed together with its namespace scope.
#[derive(Debug, Clone)]
pub struct ElementRef<'a> {
    element: &'a Element,
    scope: NsContext,
}

impl<'a> ElementRef<'a> {
    /// Views a document element (no inherited declarations).
    #[must_use]
    pub fn root(element: &'a Element) -> Self {
        Self::within(&NsContext::default(), element)
    }

    /// Views `element` as a child of an element whose scope is `parent`.
    #[must_use]
    pub fn within(parent: &NsContext, element: &'a Element) -> Self {
        Self {
            scope: parent.scoped(element),
            element,
        }
    }

    /// Returns the underlying element.
    #[must_use]
    pub const fn element(&self) -> &'a Element {
        self.element
    }

    /// Returns the namespace URI of the element.
    #[must_use]
    pub fn namespace(&self) -> &str {
        self.scope.namespace_of(self.element)
    }

    /// Returns the local tag name.
    #[must_use]
    pub fn local_name(&self) -> &'a str {
        self.element.local_name()
    }

    /// Returns whether the element is `{namespace}local`.
    #[must_use]
    pub fn is(&self, namespace: &str, local: &str) -> bool {
        self.local_name() == local && self.namespace() == namespace
    }

    /// Looks up an unqualified attribute.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&'a str> {
        self.element.attribute(name)
    }

    /// Looks up a namespace-qualified attribute such as `xsi:type`.
    #[must_use]
    pub fn attribute_ns(&self, namespace: &str, local: &str) -> Option<&'a str> {
        self.element.attributes.iter().find_map(|attr| {
            let (prefix, name) = attr.name.split_once(':')?;
            (name == local && self.scope.resolve(Some(prefix)) == Some(namespace))
                .then_some(attr.value.as_str())
        })
    }

    /// Returns the text content of the element.
    #[must_use]
    pub fn text(&self) -> String {
        self.element.text()
    }

    /// Iterates over child elements with their scopes.
    pub fn child_elements(&self) -> impl Iterator<Item = ElementRef<'a>> + '_ {
        self.element
            .child_elements()
            .map(|child| ElementRef::within(&self.scope, child))
    }

    /// Returns the first child named `{namespace}local`.
    #[must_use]
    pub fn child(&self, namespace: &str, local: &str) -> Option<ElementRef<'a>> {
        self.child_elements().find(|child| child.is(namespace, local))
    }

    /// Returns all children named `{namespace}local`.
    #[must_use]
    pub fn children(&self, namespace: &str, local: &str) -> Vec<ElementRef<'a>> {
        self.child_elements()
            .filter(|child| child.is(namespace, local))
            .collect()
    }

    /// Returns the text of the first child named `{namespace}local`.
    #[must_use]
    pub fn child_text(&self, namespace: &str, local: &str) -> Option<String> {
        self.child(namespace, local).map(|child| child.text())
    }
}

/// A match returned by [`find_direct_children`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildMatch {
    /// Position of the match in the root's `children`.
    pub index: usize,
    /// Scope of the root, used to detach the match.
    pub parent_scope: NsContext,
}

/// Finds every `{namespace}local` element in the tree rooted at `root`,
/// `root` itself included, and requires each to be a direct child of `root`.
///
/// Matches are returned in document order.
///
/// ## Errors
///
/// Returns [`SamlError::UnexpectedParent`] naming the parent of the first
/// match found anywhere else, including nested inside another match.
pub fn find_direct_children(
    root: &Element,
    namespace: &str,
    local: &str,
) -> SamlResult<Vec<ChildMatch>> {
    let outer = NsContext::default();
    let root_scope = outer.scoped(root);
    if root.local_name() == local && root_scope.namespace_of(root) == namespace {
        return Err(SamlError::UnexpectedParent {
            element: local.to_string(),
            parent: String::new(),
        });
    }

    let mut matches = Vec::new();
    for (index, node) in root.children.iter().enumerate() {
        let super::Node::Element(child) = node else {
            continue;
        };
        let child_scope = root_scope.scoped(child);
        if child.local_name() == local && child_scope.namespace_of(child) == namespace {
            matches.push(ChildMatch {
                index,
                parent_scope: root_scope.clone(),
            });
        }
        reject_nested(child, &child_scope, namespace, local)?;
    }
    Ok(matches)
}

fn reject_nested(parent: &Element, scope: &NsContext, namespace: &str, local: &str) -> SamlResult<()> {
    for child in parent.child_elements() {
        let child_scope = scope.scoped(child);
        if child.local_name() == local && child_scope.namespace_of(child) == namespace {
            return Err(SamlError::UnexpectedParent {
                element: local.to_string(),
                parent: parent.name.clone(),
            });
        }
        reject_nested(child, &child_scope, namespace, local)?;
    }
    Ok(())
}

/// Returns a copy of `el` that carries every namespace declaration in scope
/// at `el`, so it can be processed away from its parent.
///
/// Declarations on `el` are replaced by the full in-scope set (except the
/// implicit `xml` prefix), emitted in prefix order.
#[must_use]
pub fn detach(parent_scope: &NsContext, el: &Element) -> Element {
    let scope = parent_scope.scoped(el);
    let mut copy = el.clone();
    copy.attributes.retain(|attr| attr.declared_prefix().is_none());

    for (prefix, uri) in &scope.prefixes {
        match prefix.as_str() {
            XML_PREFIX => {}
            "" => copy.set_attribute("xmlns", uri.clone()),
            _ => copy.set_attribute(format!("xmlns:{prefix}"), uri.clone()),
        }
    }
    copy
}
