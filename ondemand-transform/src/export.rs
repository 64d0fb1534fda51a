//! Parsing and re-rendering of exported geometry text.
//!
//! An export is read line by line into an ordered list of [`Node`]s. Vertex
//! lines (`v x y z` in OBJ, `vertex x y z` in ASCII STL) become
//! [`Node::Vertex`], which can carry transformation rules. Every other
//! non-blank line is kept verbatim as [`Node::Pass`] so the file can be
//! written back out unchanged apart from its vertices.
//!
//! A line ending in `\` followed by an indented line is joined with it before
//! matching. Surrounding whitespace is trimmed and blank lines are dropped.

use std::{collections::BTreeMap, fmt, num::ParseFloatError, str::FromStr};

use ondemand_core::{ParamError, ParamModel};
use thiserror::Error;
use tracing::debug;

use crate::{
    config::DeriveConfig,
    derive::{DeriveError, ParameterDef, derive_model},
    geometry::Vertex,
    rule::Rules,
};

/// Version stamped into the metadata of generated exports.
pub const FORMAT_VERSION: &str = "0.0.1";

/// A supported geometry file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde-derive",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum ExportFormat {
    Obj,
    Stl,
}

impl ExportFormat {
    /// Returns the file extension for this format.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Obj => "obj",
            Self::Stl => "stl",
        }
    }

    /// Returns the keyword that starts a vertex line.
    #[must_use]
    pub fn vertex_keyword(self) -> &'static str {
        match self {
            Self::Obj => "v",
            Self::Stl => "vertex",
        }
    }

    fn vertex_values(self, line: &str) -> Option<&str> {
        line.strip_prefix(self.vertex_keyword())?
            .strip_prefix(' ')
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Parses a file extension, `obj` or `stl`.
impl FromStr for ExportFormat {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "obj" => Ok(Self::Obj),
            "stl" => Ok(Self::Stl),
            other => Err(ParseError::UnknownFormat(other.to_owned())),
        }
    }
}

/// One logical line of an export.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde-derive",
    derive(serde::Serialize, serde::Deserialize),
    serde(tag = "type", rename_all = "lowercase")
)]
pub enum Node {
    /// A vertex line and the rules that adjust it.
    Vertex {
        #[cfg_attr(feature = "serde-derive", serde(rename = "geometry"))]
        vertex: Vertex,
        #[cfg_attr(
            feature = "serde-derive",
            serde(
                rename = "transformations",
                default,
                skip_serializing_if = "Rules::is_empty"
            )
        )]
        rules: Rules,
    },
    /// Any other line, kept as written.
    Pass { line: String },
}

impl Node {
    /// Returns the vertex of a vertex node.
    #[must_use]
    pub fn vertex(&self) -> Option<&Vertex> {
        match self {
            Self::Vertex { vertex, .. } => Some(vertex),
            Self::Pass { .. } => None,
        }
    }
}

/// Errors that can occur when parsing an export.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unsupported export format `{0}`")]
    UnknownFormat(String),

    /// A vertex line has fewer than three coordinates.
    #[error("line {line}: vertex needs three coordinates: `{text}`")]
    MissingCoordinate { line: usize, text: String },

    #[error("line {line}: invalid coordinate `{value}`")]
    InvalidCoordinate {
        line: usize,
        value: String,
        #[source]
        source: ParseFloatError,
    },
}

/// Errors that can occur when generating an adjustable export.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExportError {
    #[error("failed to parse base export")]
    Base(#[source] ParseError),

    #[error("failed to parse comparison export for `{param}`")]
    Comparison {
        param: String,
        #[source]
        source: ParseError,
    },

    #[error(transparent)]
    Derive(#[from] DeriveError),
}

/// Format and version information for an [`Export`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde-derive", derive(serde::Serialize, serde::Deserialize))]
pub struct Meta {
    pub format: ExportFormat,
    pub version: String,
}

/// A parsed export whose vertices carry transformation rules.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde-derive", derive(serde::Serialize, serde::Deserialize))]
pub struct Export {
    pub data: Vec<Node>,
    pub meta: Meta,
}

impl Export {
    /// Parses a base export and attaches rules derived from one comparison
    /// export per parameter.
    ///
    /// `comparisons` maps parameter names to the text of the export in which
    /// that parameter was set to its comparison value. Vertices are paired by
    /// their position among vertex lines, so other lines may differ between
    /// exports.
    ///
    /// # Errors
    ///
    /// Returns an error if any export fails to parse or if rule derivation
    /// fails.
    pub fn generate(
        format: ExportFormat,
        base: &str,
        comparisons: &BTreeMap<String, String>,
        defs: &BTreeMap<String, ParameterDef>,
        config: &DeriveConfig,
    ) -> Result<Self, ExportError> {
        let mut data = parse(base, format).map_err(ExportError::Base)?;
        let base_vertices = vertices(&data);

        let comparison_vertices = comparisons
            .iter()
            .map(|(param, text)| {
                parse(text, format)
                    .map(|nodes| (param.clone(), vertices(&nodes)))
                    .map_err(|source| ExportError::Comparison {
                        param: param.clone(),
                        source,
                    })
            })
            .collect::<Result<BTreeMap<_, _>, _>>()?;

        let derived = derive_model(defs, &base_vertices, &comparison_vertices, config)?;
        let vertex_rules = data.iter_mut().filter_map(|node| match node {
            Node::Vertex { rules, .. } => Some(rules),
            Node::Pass { .. } => None,
        });
        for (rules, new) in vertex_rules.zip(derived) {
            rules.extend(new);
        }

        Ok(Self::new(format, data))
    }

    /// Wraps parsed nodes with metadata for `format`.
    #[must_use]
    pub fn new(format: ExportFormat, data: Vec<Node>) -> Self {
        Self {
            data,
            meta: Meta {
                format,
                version: FORMAT_VERSION.to_owned(),
            },
        }
    }

    /// Writes the export back out as text with every vertex transformed by
    /// the model's current parameters.
    ///
    /// # Errors
    ///
    /// Returns a [`ParamError`] if a rule's parameter is missing from the
    /// model.
    pub fn render<M>(&self, model: &M) -> Result<String, ParamError>
    where
        M: ParamModel + ?Sized,
    {
        let keyword = self.meta.format.vertex_keyword();
        let mut out = String::new();

        for node in &self.data {
            match node {
                Node::Vertex { vertex, rules } => {
                    let Vertex { x, y, z } = rules.apply(model, *vertex)?;
                    out.push_str(&format!("{keyword} {x} {y} {z}\n"));
                }
                Node::Pass { line } => {
                    out.push_str(line);
                    out.push('\n');
                }
            }
        }
        Ok(out)
    }
}

/// Splits export text into trimmed, non-blank logical lines.
///
/// A backslash at the end of a line joins it with the following indented
/// line, dropping the backslash, the newline, and one space of indentation.
#[must_use]
pub fn logical_lines(text: &str) -> Vec<String> {
    text.replace("\r\n", "\n")
        .replace("\\\n ", "")
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Parses export text into nodes, in file order.
///
/// Coordinates beyond the third on a vertex line are ignored.
///
/// # Errors
///
/// Returns a [`ParseError`] if a vertex line has fewer than three coordinates
/// or a coordinate is not a number. Line numbers count logical lines from 1.
pub fn parse(text: &str, format: ExportFormat) -> Result<Vec<Node>, ParseError> {
    let nodes = logical_lines(text)
        .into_iter()
        .enumerate()
        .map(|(index, line)| match format.vertex_values(&line) {
            Some(values) => parse_vertex(values, index + 1, &line).map(|vertex| Node::Vertex {
                vertex,
                rules: Rules::new(),
            }),
            None => Ok(Node::Pass { line }),
        })
        .collect::<Result<Vec<_>, _>>()?;

    debug!(%format, nodes = nodes.len(), "parsed export");
    Ok(nodes)
}

/// Returns the vertices of `nodes`, in order.
#[must_use]
pub fn vertices(nodes: &[Node]) -> Vec<Vertex> {
    nodes.iter().filter_map(Node::vertex).copied().collect()
}

fn parse_vertex(values: &str, line: usize, text: &str) -> Result<Vertex, ParseError> {
    let mut parts = values.split_whitespace();
    let mut next = || -> Result<f64, ParseError> {
        let value = parts.next().ok_or_else(|| ParseError::MissingCoordinate {
            line,
            text: text.to_owned(),
        })?;
        value
            .parse::<f64>()
            .map_err(|source| ParseError::InvalidCoordinate {
                line,
                value: value.to_owned(),
                source,
            })
    };

    let x = next()?;
    let y = next()?;
    let z = next()?;
    Ok(Vertex::new(x, y, z))
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    use crate::derive::initial_model;

    const BOX_OBJ: &str = "\
# box
o Box

v 0.0 0.0 0.0
v 10.0 0.0 \\
 72.0
f 1 2
";

    #[test]
    fn joins_continued_lines_and_drops_blank_lines() {
        let lines = logical_lines("v 1.0 \\\n 2.0 3.0\n\n   \n  f 1 2 3  \r\n");

        assert_eq!(lines, ["v 1.0 2.0 3.0", "f 1 2 3"]);
    }

    #[test]
    fn keeps_nodes_in_file_order() {
        let nodes = parse(BOX_OBJ, ExportFormat::Obj).unwrap();

        assert_eq!(nodes.len(), 5);
        assert_eq!(nodes[0], Node::Pass { line: "# box".into() });
        assert_eq!(nodes[1], Node::Pass { line: "o Box".into() });
        assert_eq!(nodes[2].vertex(), Some(&Vertex::new(0.0, 0.0, 0.0)));
        assert_eq!(nodes[3].vertex(), Some(&Vertex::new(10.0, 0.0, 72.0)));
        assert_eq!(nodes[4], Node::Pass { line: "f 1 2".into() });
    }

    #[test]
    fn vertex_keyword_depends_on_format() {
        let text = "facet normal 0 0 1\n  vertex 1 2 3\nv 4 5 6\nvn 0 0 1\n";

        let stl = vertices(&parse(text, ExportFormat::Stl).unwrap());
        let obj = vertices(&parse(text, ExportFormat::Obj).unwrap());

        assert_eq!(stl, [Vertex::new(1.0, 2.0, 3.0)]);
        assert_eq!(obj, [Vertex::new(4.0, 5.0, 6.0)]);
    }

    #[test]
    fn short_vertex_line_is_an_error() {
        let error = parse("o Box\nv 1.0 2.0\n", ExportFormat::Obj).unwrap_err();

        assert_eq!(
            error,
            ParseError::MissingCoordinate {
                line: 2,
                text: "v 1.0 2.0".into(),
            }
        );
    }

    #[test]
    fn non_numeric_coordinate_is_an_error() {
        let error = parse("vertex 1.0 abc 3.0", ExportFormat::Stl).unwrap_err();

        assert!(matches!(
            error,
            ParseError::InvalidCoordinate { line: 1, ref value, .. } if value == "abc"
        ));
    }

    #[test]
    fn parses_format_from_extension() {
        assert_eq!("stl".parse::<ExportFormat>(), Ok(ExportFormat::Stl));
        assert_eq!(
            "3mf".parse::<ExportFormat>(),
            Err(ParseError::UnknownFormat("3mf".into()))
        );
    }

    fn table_defs() -> BTreeMap<String, ParameterDef> {
        BTreeMap::from([("height".to_owned(), ParameterDef::new(72.0, 80.0))])
    }

    #[test]
    fn generate_attaches_rules_to_vertex_nodes() {
        let comparison = BOX_OBJ.replace("72.0", "80.0");
        let comparisons = BTreeMap::from([("height".to_owned(), comparison)]);

        let export = Export::generate(
            ExportFormat::Obj,
            BOX_OBJ,
            &comparisons,
            &table_defs(),
            &DeriveConfig::default(),
        )
        .unwrap();

        assert_eq!(export.meta.format, ExportFormat::Obj);
        assert_eq!(export.meta.version, FORMAT_VERSION);
        match &export.data[3] {
            Node::Vertex { rules, .. } => assert!(rules.get("z_by_height").is_some()),
            Node::Pass { .. } => panic!("expected a vertex node"),
        }
        match &export.data[2] {
            Node::Vertex { rules, .. } => assert!(rules.is_empty()),
            Node::Pass { .. } => panic!("expected a vertex node"),
        }
    }

    #[test]
    fn render_applies_current_parameters() {
        let comparison = BOX_OBJ.replace("72.0", "80.0");
        let comparisons = BTreeMap::from([("height".to_owned(), comparison)]);
        let config = DeriveConfig::default();
        let export =
            Export::generate(ExportFormat::Obj, BOX_OBJ, &comparisons, &table_defs(), &config)
                .unwrap();

        let mut model = initial_model(&table_defs(), &config);
        model.set("height", 76.0).unwrap();
        let text = export.render(&model).unwrap();

        assert_eq!(text, "# box\no Box\nv 0 0 0\nv 10 0 76\nf 1 2\n");
        let moved = vertices(&parse(&text, ExportFormat::Obj).unwrap());
        assert_relative_eq!(moved[1].z, 76.0);
    }

    #[test]
    fn comparison_parse_errors_name_the_parameter() {
        let comparisons = BTreeMap::from([("height".to_owned(), "v 1 2".to_owned())]);

        let error = Export::generate(
            ExportFormat::Obj,
            BOX_OBJ,
            &comparisons,
            &table_defs(),
            &DeriveConfig::default(),
        )
        .unwrap_err();

        assert!(matches!(error, ExportError::Comparison { ref param, .. } if param == "height"));
    }

    #[test]
    fn comparison_with_different_vertex_count_is_rejected() {
        let comparisons = BTreeMap::from([("height".to_owned(), "v 0 0 0".to_owned())]);

        let error = Export::generate(
            ExportFormat::Obj,
            BOX_OBJ,
            &comparisons,
            &table_defs(),
            &DeriveConfig::default(),
        )
        .unwrap_err();

        assert!(matches!(
            error,
            ExportError::Derive(DeriveError::VertexCountMismatch {
                expected: 2,
                actual: 1,
                ..
            })
        ));
    }

    #[cfg(feature = "serde-derive")]
    #[test]
    fn serializes_as_node_list_with_meta() {
        let export = Export::new(
            ExportFormat::Stl,
            parse("solid box\nvertex 1 2 3\n", ExportFormat::Stl).unwrap(),
        );

        let value = serde_json::to_value(&export).unwrap();

        assert_eq!(
            value,
            serde_json::json!({
                "data": [
                    { "type": "pass", "line": "solid box" },
                    { "type": "vertex", "geometry": { "x": 1.0, "y": 2.0, "z": 3.0 } }
                ],
                "meta": { "format": "stl", "version": "0.0.1" }
            })
        );
    }
}
