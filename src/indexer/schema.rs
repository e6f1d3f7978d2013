//! Plan index schema
//!
//! One flat index holds every node of every plan. Hierarchy is expressed by
//! the `plan_join` join field:
//!
//! ```text
//! plan
//! ├── planCostShares
//! └── linkedPlanServices
//!     ├── linkedService
//!     └── planserviceCostShares
//! ```

use std::collections::BTreeMap;

use serde_json::{json, Map, Value};

/// Join field carried by every indexed node
pub const JOIN_FIELD: &str = "plan_join";

/// Relation of root documents
pub const ROOT_RELATION: &str = "plan";

/// Date format of `date` fields, in the engine's notation
pub const DATE_FORMAT: &str = "MM-dd-yyyy";

/// Type of a mapped property
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Exact-match string
    Keyword,
    /// Analyzed string
    Text,
    /// 64-bit integer
    Long,
    /// Calendar date in [`DATE_FORMAT`]
    Date,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Keyword => "keyword",
            FieldType::Text => "text",
            FieldType::Long => "long",
            FieldType::Date => "date",
        }
    }
}

/// Settings, property types and join relations of an index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSchema {
    name: String,
    shards: u32,
    replicas: u32,
    properties: BTreeMap<String, FieldType>,
    /// parent relation -> child relations
    relations: BTreeMap<String, Vec<String>>,
}

impl IndexSchema {
    /// The plan index
    pub fn plan(name: impl Into<String>, shards: u32, replicas: u32) -> Self {
        let properties = [
            ("objectId", FieldType::Keyword),
            ("objectType", FieldType::Text),
            ("planType", FieldType::Text),
            ("_org", FieldType::Text),
            ("name", FieldType::Text),
            ("copay", FieldType::Long),
            ("deductible", FieldType::Long),
            ("creationDate", FieldType::Date),
        ]
        .into_iter()
        .map(|(field, kind)| (field.to_string(), kind))
        .collect();

        let mut relations = BTreeMap::new();
        relations.insert(
            ROOT_RELATION.to_string(),
            vec!["planCostShares".to_string(), "linkedPlanServices".to_string()],
        );
        relations.insert(
            "linkedPlanServices".to_string(),
            vec!["linkedService".to_string(), "planserviceCostShares".to_string()],
        );

        Self {
            name: name.into(),
            shards,
            replicas,
            properties,
            relations,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shards(&self) -> u32 {
        self.shards
    }

    pub fn replicas(&self) -> u32 {
        self.replicas
    }

    /// Declared type of a property, if mapped
    pub fn field_type(&self, field: &str) -> Option<FieldType> {
        self.properties.get(field).copied()
    }

    /// Parent relation of a child relation
    pub fn parent_relation(&self, relation: &str) -> Option<&str> {
        self.relations
            .iter()
            .find(|(_, children)| children.iter().any(|c| c == relation))
            .map(|(parent, _)| parent.as_str())
    }

    /// Whether `relation` is the root or a declared child
    pub fn declares(&self, relation: &str) -> bool {
        relation == ROOT_RELATION || self.parent_relation(relation).is_some()
    }

    /// Index creation body: settings plus mappings
    pub fn to_mapping_json(&self) -> Value {
        let mut properties = Map::new();
        for (field, kind) in &self.properties {
            let mut property = json!({ "type": kind.as_str() });
            if *kind == FieldType::Date {
                property["format"] = json!(DATE_FORMAT);
            }
            properties.insert(field.clone(), property);
        }

        let relations: Map<String, Value> = self
            .relations
            .iter()
            .map(|(parent, children)| (parent.clone(), json!(children)))
            .collect();
        properties.insert(
            JOIN_FIELD.to_string(),
            json!({
                "type": "join",
                "eager_global_ordinals": true,
                "relations": relations,
            }),
        );

        json!({
            "settings": {
                "index": {
                    "number_of_shards": self.shards,
                    "number_of_replicas": self.replicas,
                }
            },
            "mappings": { "properties": properties }
        })
    }
}
