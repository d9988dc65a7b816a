//! Values exchanged with a browsing context: element handles, cookie records
//! and serialized DOM subtrees.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Opaque reference to a live element. May go stale after a re-render.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementHandle(String);

impl ElementHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

/// Stored browser cookie, as exported by puppeteer-style tooling.
///
/// Unknown fields (`size`, `session`, `priority`, ...) are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CookieRecord {
    pub name: String,
    pub value: String,
    pub domain: String,
    #[serde(default = "default_path")]
    pub path: String,
    #[serde(
        default,
        alias = "expiry",
        alias = "expirationDate",
        skip_serializing_if = "Option::is_none"
    )]
    pub expires: Option<f64>,
    #[serde(default, rename = "httpOnly")]
    pub http_only: bool,
    #[serde(default)]
    pub secure: bool,
    #[serde(default, rename = "sameSite", skip_serializing_if = "Option::is_none")]
    pub same_site: Option<String>,
}

fn default_path() -> String {
    "/".into()
}

/// Serialized element subtree. Only element children are kept; `text` is the
/// element's rendered text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomNode {
    /// Lowercase tag name.
    pub tag: String,
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub children: Vec<DomNode>,
}

impl DomNode {
    pub fn element(tag: &str) -> Self {
        Self {
            tag: tag.to_lowercase(),
            ..Default::default()
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.attrs.insert(name.to_string(), value.into());
        self
    }

    pub fn with_child(mut self, child: DomNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    /// Descendants in document order, excluding `self`.
    pub fn descendants(&self) -> Vec<&DomNode> {
        let mut out = Vec::new();
        fn walk<'a>(node: &'a DomNode, out: &mut Vec<&'a DomNode>) {
            for child in &node.children {
                out.push(child);
                walk(child, out);
            }
        }
        walk(self, &mut out);
        out
    }

    /// First descendant with the given tag (`querySelector(tag)`).
    pub fn find(&self, tag: &str) -> Option<&DomNode> {
        self.descendants().into_iter().find(|n| n.tag == tag)
    }

    /// All descendants with the given tag (`querySelectorAll(tag)`).
    pub fn find_all(&self, tag: &str) -> Vec<&DomNode> {
        self.descendants()
            .into_iter()
            .filter(|n| n.tag == tag)
            .collect()
    }

    /// First `inner` nested anywhere below an `outer` (`querySelector("outer inner")`).
    /// `self` counts as an `outer`.
    pub fn find_nested(&self, outer: &str, inner: &str) -> Option<&DomNode> {
        if self.tag == outer {
            if let Some(found) = self.find(inner) {
                return Some(found);
            }
        }
        self.find_all(outer)
            .into_iter()
            .find_map(|container| container.find(inner))
    }

    /// Every `child` whose parent is a `parent` (`querySelectorAll("parent > child")`).
    pub fn find_child_of(&self, parent: &str, child: &str) -> Vec<&DomNode> {
        let mut out = Vec::new();
        if self.tag == parent {
            out.extend(self.children.iter().filter(|c| c.tag == child));
        }
        for node in self.descendants() {
            if node.tag == parent {
                out.extend(node.children.iter().filter(|c| c.tag == child));
            }
        }
        out
    }
}
