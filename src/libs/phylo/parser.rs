use super::error::TreeError;
use super::node::NodeId;
use super::tree::Tree;
use nom::{
    branch::alt,
    bytes::complete::{is_not, take_while},
    character::complete::{char, digit1, multispace0},
    combinator::{cut, map, map_res, opt, recognize},
    error::{context, ContextError, ErrorKind, FromExternalError, ParseError},
    multi::separated_list1,
    sequence::{delimited, preceded},
    IResult, Offset, Parser,
};
use std::collections::BTreeMap;

//----------------------------
// Errors
//----------------------------

#[derive(Clone, Debug, PartialEq)]
enum DetailedErrorKind {
    Context(&'static str),
    Nom(ErrorKind),
}

/// nom error that keeps the context stack, so a failure can be reported
/// as "while parsing length" with a position.
#[derive(Clone, Debug, PartialEq)]
struct DetailedError<'a> {
    errors: Vec<(&'a str, DetailedErrorKind)>,
}

impl<'a> ParseError<&'a str> for DetailedError<'a> {
    fn from_error_kind(input: &'a str, kind: ErrorKind) -> Self {
        DetailedError {
            errors: vec![(input, DetailedErrorKind::Nom(kind))],
        }
    }

    fn append(input: &'a str, kind: ErrorKind, mut other: Self) -> Self {
        other.errors.push((input, DetailedErrorKind::Nom(kind)));
        other
    }
}

impl<'a> ContextError<&'a str> for DetailedError<'a> {
    fn add_context(input: &'a str, ctx: &'static str, mut other: Self) -> Self {
        other.errors.push((input, DetailedErrorKind::Context(ctx)));
        other
    }
}

impl<'a, E> FromExternalError<&'a str, E> for DetailedError<'a> {
    fn from_external_error(input: &'a str, kind: ErrorKind, _e: E) -> Self {
        DetailedError {
            errors: vec![(input, DetailedErrorKind::Nom(kind))],
        }
    }
}

type PResult<'a, O> = IResult<&'a str, O, DetailedError<'a>>;

//----------------------------
// Recursive intermediate
//----------------------------

/// A clade as read from the text, before it is flattened into the arena.
#[derive(Debug, Default)]
struct Clade {
    name: Option<String>,
    length: Option<f64>,
    properties: Option<BTreeMap<String, String>>,
    children: Vec<Clade>,
}

impl Clade {
    /// Nodes are appended in pre-order, so arena indices follow the text.
    fn into_arena(self, tree: &mut Tree, parent: Option<NodeId>) -> NodeId {
        let id = tree.add_node();
        {
            let node = &mut tree.nodes[id];
            node.parent = parent;
            node.name = self.name;
            node.length = self.length;
            node.properties = self.properties;
        }
        if let Some(p) = parent {
            tree.nodes[p].children.push(id);
        }
        for child in self.children {
            child.into_arena(tree, Some(id));
        }
        id
    }
}

//----------------------------
// Grammar
//----------------------------

fn ws<'a, F, O, E>(inner: F) -> impl Parser<&'a str, Output = O, Error = E>
where
    F: Parser<&'a str, Output = O, Error = E>,
    E: ParseError<&'a str>,
{
    delimited(multispace0, inner, multispace0)
}

/// Unquoted labels stop at Newick punctuation; quoted ones use doubled quotes as escapes.
fn label(input: &str) -> PResult<'_, String> {
    let unquoted = map(take_while(|c: char| !"():;,[]".contains(c)), |s: &str| {
        s.trim().to_string()
    });
    let single_quoted = delimited(
        char('\''),
        map(is_not("'"), |s: &str| s.replace("''", "'")),
        char('\''),
    );
    let double_quoted = delimited(
        char('"'),
        map(is_not("\""), |s: &str| s.replace("\"\"", "\"")),
        char('"'),
    );

    context("label", alt((single_quoted, double_quoted, unquoted))).parse(input)
}

fn length(input: &str) -> PResult<'_, f64> {
    context(
        "length",
        preceded(
            ws(char(':')),
            cut(map_res(
                recognize((
                    opt(char('-')),
                    digit1,
                    opt((char('.'), digit1)),
                    opt((
                        alt((char('e'), char('E'))),
                        opt(alt((char('+'), char('-')))),
                        digit1,
                    )),
                )),
                |s: &str| s.parse::<f64>(),
            )),
        ),
    )
    .parse(input)
}

/// Splits `&&NHX:k=v:k=v` or whitespace separated `k=v` pairs.
fn comment_properties(body: &str) -> Option<BTreeMap<String, String>> {
    let parts: Vec<&str> = match body.strip_prefix("&&NHX") {
        Some(rest) => rest.split(':').collect(),
        None => body.split_whitespace().collect(),
    };
    let props: BTreeMap<String, String> = parts
        .into_iter()
        .filter_map(|part| part.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    if props.is_empty() {
        None
    } else {
        Some(props)
    }
}

fn comment(input: &str) -> PResult<'_, Option<BTreeMap<String, String>>> {
    context(
        "comment",
        map(
            opt(delimited(ws(char('[')), is_not("]"), char(']'))),
            |body: Option<&str>| body.and_then(comment_properties),
        ),
    )
    .parse(input)
}

/// `(child,child,...)label:length[comment]`, every part optional
fn clade(input: &str) -> PResult<'_, Clade> {
    let (input, children) = context(
        "children",
        opt(delimited(
            ws(char('(')),
            separated_list1(ws(char(',')), clade),
            ws(char(')')),
        )),
    )
    .parse(input)?;

    let (input, name) = opt(label).parse(input)?;
    let (input, before) = comment(input)?;
    let (input, len) = opt(length).parse(input)?;
    let (input, after) = comment(input)?;

    let properties = match (before, after) {
        (None, None) => None,
        (a, b) => {
            let mut props = a.unwrap_or_default();
            props.extend(b.unwrap_or_default());
            Some(props)
        }
    };

    Ok((
        input,
        Clade {
            name: name.filter(|s| !s.is_empty()),
            length: len,
            properties,
            children: children.unwrap_or_default(),
        },
    ))
}

//----------------------------
// Entry point
//----------------------------

/// Parses one Newick tree terminated by `;`.
pub fn parse_newick(input: &str) -> Result<Tree, TreeError> {
    let mut parser = (ws(clade), ws(char(';')));

    match parser.parse(input) {
        Ok((_, (top, _))) => {
            let mut tree = Tree::new();
            let root = top.into_arena(&mut tree, None);
            tree.set_root(root);
            Ok(tree)
        }
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(to_tree_error(input, e)),
        Err(nom::Err::Incomplete(_)) => Err(TreeError::ParseError {
            message: "incomplete input".to_string(),
            line: 0,
            column: 0,
            snippet: String::new(),
        }),
    }
}

fn to_tree_error(input: &str, e: DetailedError) -> TreeError {
    let remaining = match e.errors.first() {
        Some((rest, _)) => *rest,
        None => input,
    };
    let offset = input.offset(remaining);

    let prefix = &input[..offset];
    let line = prefix.chars().filter(|&c| c == '\n').count() + 1;
    let line_start = prefix.rfind('\n').map(|p| p + 1).unwrap_or(0);
    let column = offset - line_start + 1;

    let mut message = String::new();
    for (_, kind) in e.errors.iter().rev() {
        match kind {
            DetailedErrorKind::Context(ctx) => message.push_str(&format!("while parsing {}; ", ctx)),
            DetailedErrorKind::Nom(k) => message.push_str(&format!("{:?}; ", k)),
        }
    }

    TreeError::ParseError {
        message,
        line,
        column,
        snippet: remaining.chars().take(50).collect(),
    }
}

impl Tree {
    /// ```
    /// use orthotree::libs::phylo::Tree;
    ///
    /// let tree = Tree::from_newick("((0_1,1_4)n1,2_7)n0;").unwrap();
    /// assert_eq!(tree.len(), 5);
    /// assert!(Tree::from_newick("(0_1,1_4:x);").is_err());
    /// ```
    pub fn from_newick(input: &str) -> Result<Self, TreeError> {
        parse_newick(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_gene_tree_labels() {
        let tree = Tree::from_newick("((0_0:0.1,1_3:0.2)0.95:0.05,2_1:0.3);").unwrap();
        let root = tree.get_node(tree.get_root().unwrap()).unwrap();
        assert_eq!(root.children.len(), 2);

        let inner = tree.get_node(root.children[0]).unwrap();
        assert_eq!(inner.support(), Some(0.95));
        assert_eq!(inner.length, Some(0.05));

        let names: Vec<_> = tree
            .get_leaves()
            .into_iter()
            .filter_map(|id| tree.get_node(id).and_then(|n| n.name.clone()))
            .collect();
        assert_eq!(names, vec!["0_0", "1_3", "2_1"]);
    }

    #[test]
    fn parse_preorder_ids() {
        let tree = Tree::from_newick("((A,B)X,(C,D)Y)Z;").unwrap();
        let names: Vec<_> = (0..tree.len())
            .map(|id| tree.get_node(id).unwrap().name.clone().unwrap())
            .collect();
        assert_eq!(names, vec!["Z", "X", "A", "B", "Y", "C", "D"]);
    }

    #[test]
    fn parse_nhx_and_whitespace() {
        let input = "
        (
            'Homo sapiens' : 0.1,
            Mus:0.2[&&NHX:S=mouse:D=N]
        ) Root ;";
        let tree = Tree::from_newick(input).unwrap();
        let root = tree.get_node(tree.get_root().unwrap()).unwrap();
        assert_eq!(root.name.as_deref(), Some("Root"));

        let human = tree.get_node(root.children[0]).unwrap();
        assert_eq!(human.name.as_deref(), Some("Homo sapiens"));

        let mouse = tree.get_node(root.children[1]).unwrap();
        let props = mouse.properties.as_ref().unwrap();
        assert_eq!(props.get("S").map(|s| s.as_str()), Some("mouse"));
        assert_eq!(props.get("D").map(|s| s.as_str()), Some("N"));
    }

    #[test]
    fn parse_errors_have_positions() {
        match Tree::from_newick("(A,B)C") {
            Err(TreeError::ParseError { line, column, .. }) => {
                assert_eq!(line, 1);
                assert_eq!(column, 7);
            }
            other => panic!("expected ParseError, got {:?}", other),
        }

        match Tree::from_newick("(A,B:oops)C;") {
            Err(TreeError::ParseError { message, .. }) => assert!(message.contains("length")),
            other => panic!("expected ParseError, got {:?}", other),
        }
    }
}
