//! Named structural queries over a syntax tree.
//!
//! Each language supplies a [`QueryTable`]: for every named query, a list of
//! declarative node patterns (node kinds, field captures and an optional
//! structural predicate). Running a query walks the tree depth-first and
//! returns one [`Capture`] per matching node, in source order.
//!
//! A language with no pattern for a query simply yields no captures.

use tree_sitter::Node;

// ============ Query Names ============

/// The named queries reducers run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryName {
    Functions,
    Imports,
    Comments,
    Literals,
}

// ============ Patterns ============

/// A named capture: the child stored under a grammar field.
#[derive(Debug, Clone, Copy)]
pub struct CaptureRule {
    pub name: &'static str,
    pub field: &'static str,
}

impl CaptureRule {
    pub const fn field(name: &'static str, field: &'static str) -> Self {
        Self { name, field }
    }
}

/// Structural predicate applied to a candidate node.
pub type Predicate = fn(Node<'_>, &[u8]) -> bool;

/// One structural shape a query matches.
#[derive(Debug, Clone, Copy)]
pub struct NodePattern {
    /// Tag carried by captures from this pattern.
    pub tag: &'static str,
    /// Node kinds the pattern matches.
    pub kinds: &'static [&'static str],
    pub captures: &'static [CaptureRule],
    pub predicate: Option<Predicate>,
}

impl NodePattern {
    pub const fn new(tag: &'static str, kinds: &'static [&'static str]) -> Self {
        Self {
            tag,
            kinds,
            captures: &[],
            predicate: None,
        }
    }

    pub const fn with_captures(mut self, captures: &'static [CaptureRule]) -> Self {
        self.captures = captures;
        self
    }

    pub const fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(predicate);
        self
    }

    fn matches(&self, node: Node<'_>, source: &[u8]) -> bool {
        self.kinds.contains(&node.kind()) && self.predicate.map_or(true, |p| p(node, source))
    }
}

/// Per-language pattern lists for every named query.
#[derive(Debug, Clone, Copy)]
pub struct QueryTable {
    pub functions: &'static [NodePattern],
    pub imports: &'static [NodePattern],
    pub comments: &'static [NodePattern],
    pub literals: &'static [NodePattern],
}

impl QueryTable {
    pub const EMPTY: Self = Self {
        functions: &[],
        imports: &[],
        comments: &[],
        literals: &[],
    };

    pub fn patterns(&self, query: QueryName) -> &'static [NodePattern] {
        match query {
            QueryName::Functions => self.functions,
            QueryName::Imports => self.imports,
            QueryName::Comments => self.comments,
            QueryName::Literals => self.literals,
        }
    }
}

// ============ Captures ============

/// A query match: the matched node under `def` plus located captures.
#[derive(Debug, Clone)]
pub struct Capture<'tree> {
    tag: &'static str,
    nodes: Vec<(&'static str, Node<'tree>)>,
}

impl<'tree> Capture<'tree> {
    pub fn tag(&self) -> &'static str {
        self.tag
    }

    /// The matched node.
    pub fn def(&self) -> Node<'tree> {
        self.nodes[0].1
    }

    pub fn get(&self, name: &str) -> Option<Node<'tree>> {
        self.nodes.iter().find(|(n, _)| *n == name).map(|(_, node)| *node)
    }

    pub fn span(&self) -> (usize, usize) {
        let def = self.def();
        (def.start_byte(), def.end_byte())
    }
}

/// Run `patterns` over the subtree rooted at `root`.
///
/// Nodes are visited in pre-order, so captures come out sorted by start
/// offset with outer nodes before the nodes they contain. The first pattern
/// matching a node wins.
pub fn run<'tree>(patterns: &[NodePattern], root: Node<'tree>, source: &[u8]) -> Vec<Capture<'tree>> {
    let mut captures = Vec::new();
    if patterns.is_empty() {
        return captures;
    }

    let mut cursor = root.walk();
    loop {
        let node = cursor.node();
        if let Some(pattern) = patterns.iter().find(|p| p.matches(node, source)) {
            captures.push(capture(pattern, node));
        }
        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return captures;
            }
        }
    }
}

fn capture<'tree>(pattern: &NodePattern, node: Node<'tree>) -> Capture<'tree> {
    let mut nodes = vec![("def", node)];
    for rule in pattern.captures {
        if let Some(found) = node.child_by_field_name(rule.field) {
            nodes.push((rule.name, found));
        }
    }
    Capture {
        tag: pattern.tag,
        nodes,
    }
}
