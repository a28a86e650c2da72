//! Arena backed tree with parent links held as indices.

use derive_more::derive::{Display, From, Into};

use crate::error::{Error, Result};

/// Handle to a node of a [`Tree`]
///
/// Ids of removed nodes may be handed out again to later insertions.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From, Into)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
struct Node<T> {
    value: T,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A forest of nodes, each owning an ordered list of children
#[derive(Debug, Clone)]
pub struct Tree<T> {
    nodes: Vec<Option<Node<T>>>,
    free: Vec<usize>,
}

impl<T> Default for Tree<T> {
    fn default() -> Self {
        Tree {
            nodes: Vec::new(),
            free: Vec::new(),
        }
    }
}

impl<T> Tree<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add a detached node
    pub fn insert(&mut self, value: T) -> NodeId {
        let node = Node {
            value,
            parent: None,
            children: Vec::new(),
        };
        match self.free.pop() {
            Some(index) => {
                self.nodes[index] = Some(node);
                NodeId(index)
            }
            None => {
                self.nodes.push(Some(node));
                NodeId(self.nodes.len() - 1)
            }
        }
    }

    fn node(&self, id: NodeId) -> Result<&Node<T>> {
        self.nodes
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or(Error::NodeNotFound(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node<T>> {
        self.nodes
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(Error::NodeNotFound(id))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_ok()
    }

    pub fn get(&self, id: NodeId) -> Result<&T> {
        Ok(&self.node(id)?.value)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Result<&mut T> {
        Ok(&mut self.node_mut(id)?.value)
    }

    pub fn parent(&self, id: NodeId) -> Result<Option<NodeId>> {
        Ok(self.node(id)?.parent)
    }

    pub fn children(&self, id: NodeId) -> Result<&[NodeId]> {
        Ok(&self.node(id)?.children)
    }

    /// Position of `id` among its parent's children
    pub fn index_in_parent(&self, id: NodeId) -> Result<Option<usize>> {
        match self.parent(id)? {
            Some(parent) => Ok(self.children(parent)?.iter().position(|&c| c == id)),
            None => Ok(None),
        }
    }

    /// Whether `ancestor` is `id` or one of its ancestors
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, id: NodeId) -> bool {
        id == ancestor || self.ancestors(id).any(|a| a == ancestor)
    }

    /// Make the detached node `child` the child of `parent` at `index`
    ///
    /// An `index` past the end appends.
    pub fn attach(&mut self, parent: NodeId, index: usize, child: NodeId) -> Result<()> {
        self.node(parent)?;
        if self.is_ancestor_or_self(child, parent) {
            return Err(Error::CyclicAttachment(child));
        }
        self.detach(child)?;

        let children = &mut self.node_mut(parent)?.children;
        let index = index.min(children.len());
        children.insert(index, child);
        self.node_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Append a new node under `parent`
    pub fn append(&mut self, parent: NodeId, value: T) -> Result<NodeId> {
        self.node(parent)?;
        let child = self.insert(value);
        self.node_mut(parent)?.children.push(child);
        self.node_mut(child)?.parent = Some(parent);
        Ok(child)
    }

    /// Unlink `id` from its parent, keeping its subtree
    pub fn detach(&mut self, id: NodeId) -> Result<()> {
        if let Some(parent) = self.node_mut(id)?.parent.take() {
            self.node_mut(parent)?.children.retain(|&c| c != id);
        }
        Ok(())
    }

    /// Remove `id` and its whole subtree, returning the value of `id`
    pub fn remove(&mut self, id: NodeId) -> Result<T> {
        self.detach(id)?;
        let doomed = self.descendants(id).skip(1).collect::<Vec<_>>();
        for node in doomed {
            self.nodes[node.0] = None;
            self.free.push(node.0);
        }
        let node = self.nodes[id.0].take().ok_or(Error::NodeNotFound(id))?;
        self.free.push(id.0);
        Ok(node.value)
    }

    /// Put `replacement` where `id` sits in its parent, leaving `id` detached
    pub fn replace(&mut self, id: NodeId, replacement: NodeId) -> Result<()> {
        let Some(parent) = self.parent(id)? else {
            return self.detach(replacement);
        };
        let index = self.index_in_parent(id)?.unwrap_or(0);
        self.detach(id)?;
        self.attach(parent, index, replacement)
    }

    /// Move every child of `from` to the end of `to`'s children
    pub fn move_children(&mut self, from: NodeId, to: NodeId) -> Result<()> {
        self.node(to)?;
        let children = std::mem::take(&mut self.node_mut(from)?.children);
        for &child in &children {
            self.node_mut(child)?.parent = Some(to);
        }
        self.node_mut(to)?.children.extend(children);
        Ok(())
    }

    /// Parent, grandparent and so on up to the root
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_, T> {
        Ancestors {
            tree: self,
            next: self.node(id).ok().and_then(|n| n.parent),
        }
    }

    /// `id` and all nodes below it, in pre-order
    pub fn descendants(&self, id: NodeId) -> Descendants<'_, T> {
        Descendants {
            tree: self,
            stack: if self.contains(id) { vec![id] } else { Vec::new() },
        }
    }

    /// The other children of `id`'s parent
    pub fn siblings(&self, id: NodeId) -> Result<Vec<NodeId>> {
        match self.parent(id)? {
            Some(parent) => Ok(self
                .children(parent)?
                .iter()
                .copied()
                .filter(|&c| c != id)
                .collect()),
            None => Ok(Vec::new()),
        }
    }
}

/// Iterator returned by [`Tree::ancestors`]
pub struct Ancestors<'a, T> {
    tree: &'a Tree<T>,
    next: Option<NodeId>,
}

impl<T> Iterator for Ancestors<'_, T> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.node(current).ok().and_then(|n| n.parent);
        Some(current)
    }
}

/// Iterator returned by [`Tree::descendants`]
pub struct Descendants<'a, T> {
    tree: &'a Tree<T>,
    stack: Vec<NodeId>,
}

impl<T> Iterator for Descendants<'_, T> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.stack.pop()?;
        if let Ok(node) = self.tree.node(current) {
            self.stack.extend(node.children.iter().rev());
        }
        Some(current)
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    fn sample() -> Result<(Tree<&'static str>, [NodeId; 5])> {
        let mut tree = Tree::new();
        let root = tree.insert("root");
        let a = tree.append(root, "a")?;
        let b = tree.append(root, "b")?;
        let a1 = tree.append(a, "a1")?;
        let a2 = tree.append(a, "a2")?;
        Ok((tree, [root, a, b, a1, a2]))
    }

    #[test]
    fn navigation() -> Result<()> {
        let (tree, [root, a, b, a1, a2]) = sample()?;

        assert_eq!(tree.len(), 5);
        assert_eq!(tree.children(root)?, &[a, b]);
        assert_eq!(tree.parent(a1)?, Some(a));
        assert_eq!(tree.ancestors(a2).collect::<Vec<_>>(), vec![a, root]);
        assert_eq!(tree.descendants(root).collect::<Vec<_>>(), vec![root, a, a1, a2, b]);
        assert_eq!(tree.siblings(a1)?, vec![a2]);
        assert_eq!(tree.index_in_parent(b)?, Some(1));
        Ok(())
    }

    #[test]
    fn remove_subtree() -> Result<()> {
        let (mut tree, [root, a, b, a1, _]) = sample()?;

        assert_eq!(tree.remove(a)?, "a");
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.children(root)?, &[b]);
        assert!(!tree.contains(a1));
        assert!(matches!(tree.get(a1), Err(Error::NodeNotFound(_))));

        let c = tree.append(root, "c")?;
        assert_eq!(tree.get(c)?, &"c");
        assert_eq!(tree.len(), 3);
        Ok(())
    }

    #[test]
    fn replace_keeps_position() -> Result<()> {
        let (mut tree, [root, a, b, a1, a2]) = sample()?;

        let x = tree.insert("x");
        tree.move_children(a, x)?;
        tree.replace(a, x)?;

        assert_eq!(tree.children(root)?, &[x, b]);
        assert_eq!(tree.children(x)?, &[a1, a2]);
        assert_eq!(tree.parent(a1)?, Some(x));
        assert_eq!(tree.parent(a)?, None);
        assert!(tree.children(a)?.is_empty());
        Ok(())
    }

    #[test]
    fn attach_rejects_cycles() -> Result<()> {
        let (mut tree, [root, a, _, a1, _]) = sample()?;
        assert!(matches!(tree.attach(a1, 0, root), Err(Error::CyclicAttachment(_))));
        assert!(tree.attach(a, 0, a).is_err());
        assert_eq!(tree.parent(a)?, Some(root));

        tree.attach(root, 0, a1)?;
        assert_eq!(tree.children(root)?[0], a1);
        assert_eq!(tree.parent(a1)?, Some(root));
        Ok(())
    }
}
