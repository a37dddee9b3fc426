use serde::Serialize;
use serde_json::{Map, Value};

pub const VECTOR_FIELD: &str = "content_vector";
pub const VECTOR_PROFILE: &str = "content-profile";
pub const VECTOR_ALGORITHM: &str = "content-hnsw";

/// Untyped row as returned by a search backend, before mapping to a typed record.
pub type SearchRow = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FieldType {
    #[serde(rename = "Edm.String")]
    String,
    #[serde(rename = "Edm.Int32")]
    Int32,
    #[serde(rename = "Collection(Edm.Single)")]
    SingleCollection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub key: bool,
    pub searchable: bool,
    pub filterable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector_search_profile: Option<String>,
}

impl IndexField {
    fn simple(name: &str, field_type: FieldType) -> Self {
        Self {
            name: name.to_string(),
            field_type,
            key: false,
            searchable: false,
            filterable: false,
            dimensions: None,
            vector_search_profile: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VectorAlgorithm {
    pub name: String,
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VectorProfile {
    pub name: String,
    pub algorithm: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VectorSearchConfig {
    pub algorithms: Vec<VectorAlgorithm>,
    pub profiles: Vec<VectorProfile>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexSchema {
    pub name: String,
    pub fields: Vec<IndexField>,
    pub vector_search: VectorSearchConfig,
}

impl IndexSchema {
    /// The chunk index: id key, searchable content, filterable source and page,
    /// chunk position and a `dimensions`-wide HNSW vector field.
    pub fn for_chunks(name: impl Into<String>, dimensions: usize) -> Self {
        let fields = vec![
            IndexField {
                key: true,
                ..IndexField::simple("id", FieldType::String)
            },
            IndexField {
                searchable: true,
                ..IndexField::simple("content", FieldType::String)
            },
            IndexField {
                filterable: true,
                ..IndexField::simple("source_file", FieldType::String)
            },
            IndexField {
                filterable: true,
                ..IndexField::simple("page_number", FieldType::Int32)
            },
            IndexField::simple("chunk_id", FieldType::Int32),
            IndexField {
                searchable: true,
                dimensions: Some(dimensions),
                vector_search_profile: Some(VECTOR_PROFILE.to_string()),
                ..IndexField::simple(VECTOR_FIELD, FieldType::SingleCollection)
            },
        ];

        Self {
            name: name.into(),
            fields,
            vector_search: VectorSearchConfig {
                algorithms: vec![VectorAlgorithm {
                    name: VECTOR_ALGORITHM.to_string(),
                    kind: "hnsw".to_string(),
                }],
                profiles: vec![VectorProfile {
                    name: VECTOR_PROFILE.to_string(),
                    algorithm: VECTOR_ALGORITHM.to_string(),
                }],
            },
        }
    }

    pub fn vector_dimensions(&self) -> Option<usize> {
        self.fields
            .iter()
            .find(|field| field.name == VECTOR_FIELD)
            .and_then(|field| field.dimensions)
    }
}
