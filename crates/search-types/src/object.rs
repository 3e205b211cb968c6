//! Domain objects: nodes of the hierarchical graph being indexed.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::entry::TargetDetail;
use crate::error::CoreError;
use crate::identifier::Identifier;

/// Object kind of the synthetic root.
pub const KIND_ROOT: &str = "root";

/// Object kind of annotations.
pub const KIND_ANNOTATION: &str = "annotation";

/// The known annotation kinds. Anything else is rejected at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnnotationKind {
    Notebook,
    PlotSpatial,
    Geospatial,
}

impl AnnotationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnnotationKind::Notebook => "notebook",
            AnnotationKind::PlotSpatial => "plot-spatial",
            AnnotationKind::Geospatial => "geospatial",
        }
    }
}

impl FromStr for AnnotationKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "notebook" => Ok(AnnotationKind::Notebook),
            "plot-spatial" => Ok(AnnotationKind::PlotSpatial),
            "geospatial" => Ok(AnnotationKind::Geospatial),
            other => Err(CoreError::InvalidInput(format!(
                "unknown annotation kind '{}'",
                other
            ))),
        }
    }
}

/// Annotation-specific payload on a domain object.
///
/// `targets` maps the key string of each annotated object to per-target
/// detail; `tags` is the ordered sequence of tag ids applied to the
/// annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationPayload {
    pub annotation_kind: AnnotationKind,
    pub targets: BTreeMap<String, TargetDetail>,
    pub tags: Vec<String>,
}

/// A node in the hierarchical object graph.
///
/// `composition`, when present, is the ordered list of child identifiers.
/// `annotation` is present only on annotation-kind objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainObject {
    pub identifier: Identifier,
    pub kind: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composition: Option<Vec<Identifier>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<AnnotationPayload>,
}

impl DomainObject {
    pub fn new(identifier: Identifier, kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            identifier,
            kind: kind.into(),
            name: name.into(),
            composition: None,
            annotation: None,
        }
    }

    pub fn with_composition(mut self, children: Vec<Identifier>) -> Self {
        self.composition = Some(children);
        self
    }

    pub fn is_root(&self) -> bool {
        self.kind == KIND_ROOT
    }

    pub fn is_annotation(&self) -> bool {
        self.kind == KIND_ANNOTATION
    }
}
