use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use thiserror::Error;

/// Which side of the ledger a parent category belongs to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryKind {
    #[default]
    Expense,
    Income,
}

impl fmt::Display for CategoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryKind::Expense => write!(f, "expense"),
            CategoryKind::Income => write!(f, "income"),
        }
    }
}

/// Selects which parents a flattening or lookup covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Side {
    #[default]
    Expense,
    Income,
    Both,
}

impl Side {
    fn includes(self, kind: CategoryKind) -> bool {
        match self {
            Side::Expense => kind == CategoryKind::Expense,
            Side::Income => kind == CategoryKind::Income,
            Side::Both => true,
        }
    }
}

impl From<CategoryKind> for Side {
    fn from(kind: CategoryKind) -> Self {
        match kind {
            CategoryKind::Expense => Side::Expense,
            CategoryKind::Income => Side::Income,
        }
    }
}

/// One node of the category tree as delivered by the category service.
/// Parents carry `kind`; on children it is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryNode {
    pub name: String,
    #[serde(default)]
    pub kind: CategoryKind,
    #[serde(default)]
    pub children: Vec<CategoryNode>,
}

impl CategoryNode {
    pub fn parent(name: &str, kind: CategoryKind, children: &[&str]) -> Self {
        CategoryNode {
            name: name.to_string(),
            kind,
            children: children.iter().map(|c| CategoryNode::leaf(c)).collect(),
        }
    }

    pub fn leaf(name: &str) -> Self {
        CategoryNode {
            name: name.to_string(),
            kind: CategoryKind::Expense,
            children: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HierarchyError {
    #[error("Duplicate parent category: {0}")]
    DuplicateParent(String),
    #[error("Category '{parent}/{child}' has children of its own; only two levels are supported")]
    TooDeep { parent: String, child: String },
    #[error("Parent category at position {0} has an empty name")]
    EmptyParentName(usize),
    #[error("Category name is empty (under parent '{0}')")]
    EmptyName(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct ParentEntry {
    name: String,
    kind: CategoryKind,
    children: Vec<String>,
}

/// Read-only index over a two-level category tree.
///
/// Parent order and child order are preserved from the input tree. Parent
/// names are unique; a child name may appear under several parents, in which
/// case `parent_of` resolves to the first parent in tree order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CategoryHierarchy {
    parents: Vec<ParentEntry>,
    #[serde(skip)]
    parent_index: HashMap<String, usize>,
}

impl CategoryHierarchy {
    pub fn from_tree(tree: &[CategoryNode]) -> Result<Self, HierarchyError> {
        let mut parents = Vec::with_capacity(tree.len());
        let mut parent_index = HashMap::with_capacity(tree.len());

        for (position, node) in tree.iter().enumerate() {
            if node.name.trim().is_empty() {
                return Err(HierarchyError::EmptyParentName(position));
            }
            if parent_index.contains_key(&node.name) {
                return Err(HierarchyError::DuplicateParent(node.name.clone()));
            }

            let mut children = Vec::with_capacity(node.children.len());
            let mut seen = HashSet::new();
            for child in &node.children {
                if child.name.trim().is_empty() {
                    return Err(HierarchyError::EmptyName(node.name.clone()));
                }
                if !child.children.is_empty() {
                    return Err(HierarchyError::TooDeep {
                        parent: node.name.clone(),
                        child: child.name.clone(),
                    });
                }
                // Repeated children under one parent collapse to the first.
                if seen.insert(child.name.as_str()) {
                    children.push(child.name.clone());
                }
            }

            parent_index.insert(node.name.clone(), parents.len());
            parents.push(ParentEntry {
                name: node.name.clone(),
                kind: node.kind,
                children,
            });
        }

        Ok(CategoryHierarchy {
            parents,
            parent_index,
        })
    }

    /// An absent tree indexes to an empty hierarchy.
    pub fn from_optional_tree(tree: Option<&[CategoryNode]>) -> Result<Self, HierarchyError> {
        tree.map_or_else(|| Ok(Self::default()), Self::from_tree)
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    /// Every name on `side`, each parent immediately followed by its children.
    pub fn flat_names(&self, side: Side) -> Vec<&str> {
        self.parents
            .iter()
            .filter(|p| side.includes(p.kind))
            .flat_map(|p| std::iter::once(p.name.as_str()).chain(p.children.iter().map(String::as_str)))
            .collect()
    }

    /// Parent name to ordered child names, restricted to `side`.
    pub fn children_by_parent(&self, side: Side) -> HashMap<&str, &[String]> {
        self.parents
            .iter()
            .filter(|p| side.includes(p.kind))
            .map(|p| (p.name.as_str(), p.children.as_slice()))
            .collect()
    }

    pub fn parents(&self, side: Side) -> Vec<&str> {
        self.parents
            .iter()
            .filter(|p| side.includes(p.kind))
            .map(|p| p.name.as_str())
            .collect()
    }

    pub fn children_of(&self, parent: &str) -> Option<&[String]> {
        self.parent_index
            .get(parent)
            .map(|&i| self.parents[i].children.as_slice())
    }

    pub fn kind_of(&self, parent: &str) -> Option<CategoryKind> {
        self.parent_index.get(parent).map(|&i| self.parents[i].kind)
    }

    pub fn is_parent(&self, name: &str) -> bool {
        self.parent_index.contains_key(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.parent_of(name).is_some()
    }

    /// Resolves a literal name to its parent: the name itself when it is a
    /// parent, otherwise the first parent listing it as a child.
    pub fn parent_of(&self, name: &str) -> Option<&str> {
        if let Some(&i) = self.parent_index.get(name) {
            return Some(self.parents[i].name.as_str());
        }
        self.parents
            .iter()
            .find(|p| p.children.iter().any(|c| c == name))
            .map(|p| p.name.as_str())
    }
}
