//! Vector query types.

use super::Metadata;
use serde::{Deserialize, Serialize};

/// Fields to return from a vector query.
///
/// Ids are always returned; the other fields are filled only when requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryInclude {
    /// Include chunk text.
    pub documents: bool,
    /// Include chunk metadata.
    pub metadatas: bool,
    /// Include `1 - cosine_similarity` distances.
    pub distances: bool,
}

impl QueryInclude {
    /// Requests every field.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            documents: true,
            metadatas: true,
            distances: true,
        }
    }

    /// Requests ids only.
    #[must_use]
    pub const fn ids_only() -> Self {
        Self {
            documents: false,
            metadatas: false,
            distances: false,
        }
    }

    /// Returns the Chroma `include` field names for this selection.
    #[must_use]
    pub fn field_names(&self) -> Vec<&'static str> {
        let mut names = Vec::with_capacity(3);
        if self.documents {
            names.push("documents");
        }
        if self.metadatas {
            names.push("metadatas");
        }
        if self.distances {
            names.push("distances");
        }
        names
    }
}

impl Default for QueryInclude {
    fn default() -> Self {
        Self::all()
    }
}

/// A single ranked query match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryMatch {
    /// Chunk id.
    pub id: String,
    /// Chunk text, if requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
    /// Chunk metadata, if requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    /// Cosine distance, if requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f32>,
}

/// Ranked result of a vector query, best match first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Matches in descending similarity order.
    pub matches: Vec<QueryMatch>,
}

impl QueryResult {
    /// Returns the number of matches.
    #[must_use]
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    /// Returns true if nothing matched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Returns matched ids in rank order.
    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        self.matches.iter().map(|m| m.id.as_str()).collect()
    }

    /// Returns matched documents in rank order (skipping matches without text).
    #[must_use]
    pub fn documents(&self) -> Vec<&str> {
        self.matches
            .iter()
            .filter_map(|m| m.document.as_deref())
            .collect()
    }

    /// Returns distances in rank order (skipping matches without distance).
    #[must_use]
    pub fn distances(&self) -> Vec<f32> {
        self.matches.iter().filter_map(|m| m.distance).collect()
    }
}

/// Documents and metadata returned by retrieval, in rank order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Retrieved {
    /// Retrieved chunk texts.
    pub documents: Vec<String>,
    /// Metadata for each retrieved chunk.
    pub metadatas: Vec<Metadata>,
}

impl Retrieved {
    /// Returns true when nothing was retrieved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl From<QueryResult> for Retrieved {
    fn from(result: QueryResult) -> Self {
        let mut retrieved = Self::default();
        for m in result.matches {
            retrieved.documents.push(m.document.unwrap_or_default());
            retrieved.metadatas.push(m.metadata.unwrap_or_default());
        }
        retrieved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_include_field_names() {
        assert_eq!(
            QueryInclude::all().field_names(),
            vec!["documents", "metadatas", "distances"]
        );
        assert!(QueryInclude::ids_only().field_names().is_empty());

        let docs_only = QueryInclude {
            documents: true,
            ..QueryInclude::ids_only()
        };
        assert_eq!(docs_only.field_names(), vec!["documents"]);
    }

    #[test]
    fn test_retrieved_from_query_result_keeps_order() {
        let result = QueryResult {
            matches: vec![
                QueryMatch {
                    id: "a".to_string(),
                    document: Some("first".to_string()),
                    metadata: Some(Metadata::new()),
                    distance: Some(0.1),
                },
                QueryMatch {
                    id: "b".to_string(),
                    document: Some("second".to_string()),
                    metadata: None,
                    distance: Some(0.4),
                },
            ],
        };

        assert_eq!(result.ids(), vec!["a", "b"]);
        assert_eq!(result.distances(), vec![0.1, 0.4]);

        let retrieved = Retrieved::from(result);
        assert_eq!(retrieved.documents, vec!["first", "second"]);
        assert_eq!(retrieved.metadatas.len(), 2);
    }
}
