//! Structured metadata attached to documents and the filters matched against it

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One `<share> <project>` fragment of an allocation sentence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationRecord {
    /// Project name as written in the source
    pub project: String,
    /// Percentage token exactly as written (e.g. "60%")
    pub share: String,
}

impl AllocationRecord {
    pub fn new(project: impl Into<String>, share: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            share: share.into(),
        }
    }
}

/// Metadata stored next to each document in the vector store.
///
/// `primary_projects` is always the `", "`-join of the allocation project names in
/// parse order whenever allocations are present; the constructors keep it that way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentMetadata {
    doc_id: String,
    entity: Option<String>,
    period: Option<String>,
    primary_projects: Option<String>,
    allocations: Option<Vec<AllocationRecord>>,
}

impl DocumentMetadata {
    /// Metadata for a document with no recognized structure
    pub fn new(doc_id: impl Into<String>) -> Self {
        Self {
            doc_id: doc_id.into(),
            ..Default::default()
        }
    }

    /// Metadata for a document whose text matched the allocation pattern.
    ///
    /// An empty allocation list leaves `allocations` and `primary_projects` absent.
    pub fn with_structure(
        doc_id: impl Into<String>,
        entity: impl Into<String>,
        period: impl Into<String>,
        allocations: Vec<AllocationRecord>,
    ) -> Self {
        let mut meta = Self::new(doc_id);
        meta.entity = Some(entity.into());
        meta.period = Some(period.into());
        meta.set_allocations(allocations);
        meta
    }

    fn set_allocations(&mut self, allocations: Vec<AllocationRecord>) {
        if allocations.is_empty() {
            self.allocations = None;
            self.primary_projects = None;
        } else {
            self.primary_projects = Some(join_projects(&allocations));
            self.allocations = Some(allocations);
        }
    }

    pub fn doc_id(&self) -> &str {
        &self.doc_id
    }

    pub fn entity(&self) -> Option<&str> {
        self.entity.as_deref()
    }

    pub fn period(&self) -> Option<&str> {
        self.period.as_deref()
    }

    pub fn primary_projects(&self) -> Option<&str> {
        self.primary_projects.as_deref()
    }

    pub fn allocations(&self) -> Option<&[AllocationRecord]> {
        self.allocations.as_deref()
    }

    /// Project names in parse order
    pub fn project_names(&self) -> impl Iterator<Item = &str> {
        self.allocations
            .iter()
            .flatten()
            .map(|a| a.project.as_str())
    }

    /// Whether any structured field is present
    pub fn is_structured(&self) -> bool {
        self.entity.is_some() || self.period.is_some() || self.allocations.is_some()
    }

    /// Flatten into the scalar map persisted by vector stores.
    ///
    /// Absent fields are omitted; allocations are stored as JSON array text.
    pub fn to_store_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("doc_id".into(), Value::String(self.doc_id.clone()));
        if let Some(entity) = &self.entity {
            map.insert("entity".into(), Value::String(entity.clone()));
        }
        if let Some(period) = &self.period {
            map.insert("period".into(), Value::String(period.clone()));
        }
        if let Some(projects) = &self.primary_projects {
            map.insert("primary_projects".into(), Value::String(projects.clone()));
        }
        if let Some(allocations) = &self.allocations {
            // Serializing a Vec of two-string structs cannot fail
            let text = serde_json::to_string(allocations).unwrap_or_else(|_| "[]".to_string());
            map.insert("allocations".into(), Value::String(text));
        }
        map
    }

    /// Rebuild metadata from a stored map.
    ///
    /// `fallback_id` is used when the map carries no `doc_id`. Unreadable allocation
    /// text is dropped with a warning rather than failing the whole result.
    pub fn from_store_map(map: &Map<String, Value>, fallback_id: &str) -> Self {
        let get = |key: &str| {
            map.get(key)
                .and_then(|v| v.as_str())
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
        };

        let mut meta = Self::new(get("doc_id").unwrap_or_else(|| fallback_id.to_string()));
        meta.entity = get("entity");
        meta.period = get("period");
        meta.primary_projects = get("primary_projects");

        if let Some(text) = get("allocations") {
            match serde_json::from_str::<Vec<AllocationRecord>>(&text) {
                Ok(allocations) => meta.set_allocations(allocations),
                Err(e) => {
                    tracing::warn!("Dropping unreadable allocations for {}: {}", meta.doc_id, e);
                }
            }
        }

        meta
    }
}

fn join_projects(allocations: &[AllocationRecord]) -> String {
    allocations
        .iter()
        .map(|a| a.project.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Structured query filter produced by the metadata extractor.
///
/// All fields optional; an empty filter means "no filter".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryFilter {
    pub entity: Option<String>,
    pub period: Option<String>,
    pub project: Option<String>,
}

impl QueryFilter {
    /// Build a filter, dropping blank values
    pub fn new(
        entity: Option<String>,
        period: Option<String>,
        project: Option<String>,
    ) -> Self {
        Self {
            entity: normalize(entity),
            period: normalize(period),
            project: normalize(project),
        }
    }

    /// True when no field is set
    pub fn is_empty(&self) -> bool {
        self.entity.is_none() && self.period.is_none() && self.project.is_none()
    }

    /// Exact, case-sensitive match of every present field.
    ///
    /// `project` matches when it equals one of the allocation project names.
    pub fn matches(&self, meta: &DocumentMetadata) -> bool {
        if let Some(entity) = &self.entity {
            if meta.entity() != Some(entity.as_str()) {
                return false;
            }
        }
        if let Some(period) = &self.period {
            if meta.period() != Some(period.as_str()) {
                return false;
            }
        }
        if let Some(project) = &self.project {
            if !meta.project_names().any(|p| p == project) {
                return false;
            }
        }
        true
    }
}

fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
