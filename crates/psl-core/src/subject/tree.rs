//! Arena-backed reference subject tree

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::errors::{PslError, Result};
use crate::pattern::Scalar;

use super::{Facet, NodeId, SubjectTree};

/// Type name given to JSON arrays
pub const LIST_TYPE: &str = "list";
/// Type name given to JSON objects without a `$type` key
pub const DICT_TYPE: &str = "dict";

const TYPE_KEY: &str = "$type";
const SUPER_KEY: &str = "$super";

/// One node of a [`Tree`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeNode {
    type_name: String,
    supertypes: Vec<String>,
    value: Option<Scalar>,
    attrs: BTreeMap<String, NodeId>,
    indices: Vec<NodeId>,
    keys: BTreeMap<String, NodeId>,
}

impl TreeNode {
    fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            supertypes: Vec::new(),
            value: None,
            attrs: BTreeMap::new(),
            indices: Vec::new(),
            keys: BTreeMap::new(),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Types this node is also a kind of, nearest first
    pub fn supertypes(&self) -> &[String] {
        &self.supertypes
    }

    pub fn value(&self) -> Option<&Scalar> {
        self.value.as_ref()
    }

    /// Attributes in name order
    pub fn attrs(&self) -> impl Iterator<Item = (&str, NodeId)> {
        self.attrs.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn indices(&self) -> &[NodeId] {
        &self.indices
    }

    /// Keys in key order
    pub fn keys(&self) -> impl Iterator<Item = (&str, NodeId)> {
        self.keys.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn attr_count(&self) -> usize {
        self.attrs.len()
    }

    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    pub fn is_kind_of(&self, type_name: &str) -> bool {
        self.type_name == type_name || self.supertypes.iter().any(|t| t == type_name)
    }
}

/// Subject tree stored in an arena
///
/// Children are referenced by [`NodeId`]; attaching the same child twice or
/// closing a loop is allowed here and reported by the walker.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Tree {
    nodes: Vec<TreeNode>,
    root: Option<NodeId>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a detached node of `type_name`
    pub fn add_node(&mut self, type_name: &str) -> NodeId {
        self.push(TreeNode::new(type_name))
    }

    /// Add a detached scalar leaf; its type is the scalar's type name
    pub fn add_scalar(&mut self, value: impl Into<Scalar>) -> NodeId {
        let value = value.into();
        let mut node = TreeNode::new(value.type_name());
        node.value = Some(value);
        self.push(node)
    }

    pub fn add_list(&mut self) -> NodeId {
        self.add_node(LIST_TYPE)
    }

    pub fn add_dict(&mut self) -> NodeId {
        self.add_node(DICT_TYPE)
    }

    /// Declare the types `node` is a kind of, nearest first
    ///
    /// # Errors
    ///
    /// Returns `UnknownSubjectNode` if `node` is not in this tree.
    pub fn set_supertypes(&mut self, node: NodeId, supertypes: Vec<String>) -> Result<()> {
        self.get_mut(node)?.supertypes = supertypes;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `UnknownSubjectNode` if either node is not in this tree.
    pub fn set_attr(&mut self, owner: NodeId, name: &str, child: NodeId) -> Result<()> {
        self.get(child)?;
        self.get_mut(owner)?.attrs.insert(name.to_string(), child);
        Ok(())
    }

    /// Append `child` to the indexed children of `owner`, returning its index
    ///
    /// # Errors
    ///
    /// Returns `UnknownSubjectNode` if either node is not in this tree.
    pub fn push_indice(&mut self, owner: NodeId, child: NodeId) -> Result<usize> {
        self.get(child)?;
        let indices = &mut self.get_mut(owner)?.indices;
        indices.push(child);
        Ok(indices.len() - 1)
    }

    /// # Errors
    ///
    /// Returns `UnknownSubjectNode` if either node is not in this tree.
    pub fn set_key(&mut self, owner: NodeId, key: &str, child: NodeId) -> Result<()> {
        self.get(child)?;
        self.get_mut(owner)?.keys.insert(key.to_string(), child);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `UnknownSubjectNode` if `node` is not in this tree.
    pub fn set_root(&mut self, node: NodeId) -> Result<()> {
        self.get(node)?;
        self.root = Some(node);
        Ok(())
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// # Errors
    ///
    /// Returns `UnknownSubjectNode` if `node` is not in this tree.
    pub fn get(&self, node: NodeId) -> Result<&TreeNode> {
        self.nodes
            .get(node.index())
            .ok_or(PslError::UnknownSubjectNode { node: node.raw() })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Build a tree from a JSON document
    ///
    /// Objects carrying `"$type"` become typed nodes whose other members are
    /// attributes (`"$super"` lists supertypes); other objects are `dict`
    /// nodes with keys, arrays are `list` nodes with indices and scalars are
    /// leaves. `null` has no node form.
    ///
    /// # Errors
    ///
    /// Returns `MalformedDocument` on `null` or a non-string `$type`.
    pub fn from_json(document: &Value) -> Result<Self> {
        let mut tree = Tree::new();
        let root = tree.add_json(document)?;
        tree.root = Some(root);
        Ok(tree)
    }

    fn add_json(&mut self, value: &Value) -> Result<NodeId> {
        if let Some(scalar) = Scalar::from_json(value) {
            return Ok(self.add_scalar(scalar));
        }
        match value {
            Value::Array(items) => {
                let list = self.add_list();
                for item in items {
                    let child = self.add_json(item)?;
                    self.push_indice(list, child)?;
                }
                Ok(list)
            }
            Value::Object(members) => match members.get(TYPE_KEY) {
                Some(Value::String(type_name)) => {
                    let node = self.add_node(type_name);
                    if let Some(supers) = members.get(SUPER_KEY) {
                        let supertypes = supertypes_of(supers)?;
                        self.set_supertypes(node, supertypes)?;
                    }
                    for (name, member) in members {
                        if name == TYPE_KEY || name == SUPER_KEY {
                            continue;
                        }
                        let child = self.add_json(member)?;
                        self.set_attr(node, name, child)?;
                    }
                    Ok(node)
                }
                Some(other) => Err(PslError::MalformedDocument {
                    reason: format!("{} must be a string, found {}", TYPE_KEY, other),
                }),
                None => {
                    let dict = self.add_dict();
                    for (key, member) in members {
                        let child = self.add_json(member)?;
                        self.set_key(dict, key, child)?;
                    }
                    Ok(dict)
                }
            },
            _ => Err(PslError::MalformedDocument {
                reason: format!("no subject node for {}", value),
            }),
        }
    }

    fn push(&mut self, node: TreeNode) -> NodeId {
        let id = NodeId::from_raw(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    fn get_mut(&mut self, node: NodeId) -> Result<&mut TreeNode> {
        self.nodes
            .get_mut(node.index())
            .ok_or(PslError::UnknownSubjectNode { node: node.raw() })
    }
}

fn supertypes_of(value: &Value) -> Result<Vec<String>> {
    match value {
        Value::String(name) => Ok(vec![name.clone()]),
        Value::Array(names) => names
            .iter()
            .map(|n| {
                n.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| PslError::MalformedDocument {
                        reason: format!("{} entries must be strings, found {}", SUPER_KEY, n),
                    })
            })
            .collect(),
        other => Err(PslError::MalformedDocument {
            reason: format!("{} must be a string or a list, found {}", SUPER_KEY, other),
        }),
    }
}

impl SubjectTree for Tree {
    fn resolve(&self, owner: NodeId, facet: &Facet) -> Result<NodeId> {
        let node = self.get(owner)?;
        let child = match facet {
            Facet::Node => Some(owner),
            Facet::Attr(name) => node.attrs.get(name).copied(),
            Facet::Indice(index) => node.indices.get(*index).copied(),
            Facet::Key(key) => node.keys.get(key).copied(),
        };
        child.ok_or_else(|| PslError::MalformedDocument {
            reason: format!("node {} has no child at {}", owner, facet),
        })
    }

    fn fetch(&self, node: NodeId) -> Result<Option<Scalar>> {
        Ok(self.get(node)?.value.clone())
    }

    fn store(&mut self, node: NodeId, value: Scalar) -> Result<()> {
        let entry = self.get_mut(node)?;
        entry.type_name = value.type_name().to_string();
        entry.value = Some(value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_maps_shapes() {
        let tree = Tree::from_json(&json!({
            "$type": "Foo",
            "$super": ["Base"],
            "x": 1,
            "items": [1, "a"],
            "meta": {"k": true}
        }))
        .unwrap();

        let root = tree.get(tree.root().unwrap()).unwrap();
        assert_eq!(root.type_name(), "Foo");
        assert!(root.is_kind_of("Base"));
        assert_eq!(root.attr_count(), 3);

        let names: Vec<&str> = root.attrs().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["items", "meta", "x"]);

        let (_, items) = root.attrs().next().unwrap();
        let items = tree.get(items).unwrap();
        assert_eq!(items.type_name(), LIST_TYPE);
        assert_eq!(items.indices().len(), 2);
    }

    #[test]
    fn test_from_json_rejects_null() {
        let err = Tree::from_json(&json!({"$type": "Foo", "x": null})).unwrap_err();
        assert!(matches!(err, PslError::MalformedDocument { .. }));
    }

    #[test]
    fn test_from_json_rejects_non_string_type() {
        let err = Tree::from_json(&json!({"$type": 3})).unwrap_err();
        assert!(matches!(err, PslError::MalformedDocument { .. }));
    }

    #[test]
    fn test_resolve_and_store() {
        let mut tree = Tree::new();
        let foo = tree.add_node("Foo");
        let one = tree.add_scalar(1);
        tree.set_attr(foo, "x", one).unwrap();

        let x = tree.resolve(foo, &Facet::Attr("x".into())).unwrap();
        assert_eq!(x, one);
        tree.store(x, Scalar::from("one")).unwrap();
        assert_eq!(tree.fetch(x).unwrap(), Some(Scalar::from("one")));
        assert_eq!(tree.get(x).unwrap().type_name(), "str");

        assert!(tree.resolve(foo, &Facet::Attr("y".into())).is_err());
    }

    #[test]
    fn test_unknown_node() {
        let mut tree = Tree::new();
        let foo = tree.add_node("Foo");
        let err = tree.set_attr(foo, "x", NodeId::from_raw(9)).unwrap_err();
        assert_eq!(err, PslError::UnknownSubjectNode { node: 9 });
    }
}
