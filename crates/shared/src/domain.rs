use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One noun phrase the parser extracted from the prompt.
///
/// `category` is optional on the wire: the parser returns null for nouns it
/// cannot place in its category table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub name: String,
    pub category: Option<String>,
    #[serde(default)]
    pub attributes: Vec<String>,
}

impl Entity {
    /// List label: `cat (animal) - red` or `mat (object)` when no attributes.
    pub fn display_label(&self) -> String {
        let category = self.category.as_deref().unwrap_or("uncategorized");
        if self.attributes.is_empty() {
            format!("{} ({category})", self.name)
        } else {
            format!(
                "{} ({category}) - {}",
                self.name,
                self.attributes.join(", ")
            )
        }
    }
}

/// Directed relation between two entities, all fields entity names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub subject: String,
    pub name: String,
    pub object: String,
}

impl Relationship {
    /// List label: `cat sitting on mat`.
    pub fn display_label(&self) -> String {
        format!("{} {} {}", self.subject, self.name, self.object)
    }
}

/// Structured scene extracted from a free-text prompt.
///
/// Replaced wholesale on every new submission, never merged.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SceneGraph {
    pub entities: BTreeMap<String, Entity>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

impl SceneGraph {
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.relationships.is_empty()
    }
}

/// A label with the model's conditional probability for it, in [0, 1].
pub type ScoredLabel = (String, f64);

/// Per-scene output of the probability service.
///
/// `attr_probs` is keyed by entity name, `relation_probs` by a
/// `subject_object` pair key; both carry service-ranked candidate lists.
/// `evidences` is the list of feature names the model conditioned on.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProbabilityReport {
    #[serde(default)]
    pub attr_probs: BTreeMap<String, Vec<ScoredLabel>>,
    #[serde(default)]
    pub relation_probs: BTreeMap<String, Vec<ScoredLabel>>,
    #[serde(default)]
    pub co_occur_probs: Vec<ScoredLabel>,
    #[serde(default)]
    pub evidences: Vec<String>,
}

impl ProbabilityReport {
    pub fn is_empty(&self) -> bool {
        self.attr_probs.is_empty()
            && self.relation_probs.is_empty()
            && self.co_occur_probs.is_empty()
            && self.evidences.is_empty()
    }
}

/// Render a probability in [0, 1] as a percentage with one decimal place.
pub fn percent_label(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

/// Chip label: `red (92.0%)`.
pub fn scored_chip_label(name: &str, probability: f64) -> String {
    format!("{name} ({})", percent_label(probability))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_scene_graph() -> SceneGraph {
        serde_json::from_value(serde_json::json!({
            "entities": {
                "e1": {
                    "id": "e1",
                    "name": "cat",
                    "category": "animal",
                    "attributes": ["red"]
                },
                "e2": {
                    "id": "e2",
                    "name": "mat",
                    "category": "object",
                    "attributes": []
                }
            },
            "relationships": [
                {"subject": "cat", "name": "sitting on", "object": "mat"}
            ]
        }))
        .expect("sample scene graph")
    }

    #[test]
    fn deserializes_scene_graph_from_service_document() {
        let graph = sample_scene_graph();
        assert_eq!(graph.entities.len(), 2);
        assert_eq!(graph.entities["e1"].name, "cat");
        assert_eq!(graph.entities["e1"].attributes, vec!["red"]);
        assert_eq!(graph.relationships.len(), 1);
        assert_eq!(graph.relationships[0].name, "sitting on");
    }

    #[test]
    fn entity_labels_include_category_and_attributes() {
        let graph = sample_scene_graph();
        assert_eq!(graph.entities["e1"].display_label(), "cat (animal) - red");
        assert_eq!(graph.entities["e2"].display_label(), "mat (object)");
    }

    #[test]
    fn uncategorized_entities_fall_back_in_labels() {
        let entity = Entity {
            id: "e9".to_string(),
            name: "thing".to_string(),
            category: None,
            attributes: Vec::new(),
        };
        assert_eq!(entity.display_label(), "thing (uncategorized)");
    }

    #[test]
    fn relationship_label_reads_subject_name_object() {
        let graph = sample_scene_graph();
        assert_eq!(graph.relationships[0].display_label(), "cat sitting on mat");
    }

    #[test]
    fn deserializes_probability_report_with_pair_lists() {
        let report: ProbabilityReport = serde_json::from_value(serde_json::json!({
            "attr_probs": {"cat": [["red", 0.92]]},
            "relation_probs": {"cat_mat": [["sitting on", 0.8]]},
            "co_occur_probs": [["dog", 0.1]],
            "evidences": ["has_cat", "has_mat"]
        }))
        .expect("sample report");

        assert_eq!(report.attr_probs["cat"], vec![("red".to_string(), 0.92)]);
        assert_eq!(
            report.relation_probs["cat_mat"],
            vec![("sitting on".to_string(), 0.8)]
        );
        assert_eq!(report.co_occur_probs, vec![("dog".to_string(), 0.1)]);
        assert_eq!(report.evidences, vec!["has_cat", "has_mat"]);
    }

    #[test]
    fn missing_report_sections_default_to_empty() {
        let report: ProbabilityReport =
            serde_json::from_value(serde_json::json!({"evidences": ["has_cat"]}))
                .expect("partial report");
        assert!(report.attr_probs.is_empty());
        assert!(report.co_occur_probs.is_empty());
        assert!(!report.is_empty());
    }

    #[test]
    fn percent_labels_use_one_decimal_place() {
        assert_eq!(percent_label(0.92), "92.0%");
        assert_eq!(percent_label(0.8), "80.0%");
        assert_eq!(percent_label(0.1), "10.0%");
        assert_eq!(percent_label(0.1234), "12.3%");
    }

    #[test]
    fn chip_labels_combine_name_and_percentage() {
        assert_eq!(scored_chip_label("red", 0.92), "red (92.0%)");
        assert_eq!(scored_chip_label("sitting on", 0.8), "sitting on (80.0%)");
        assert_eq!(scored_chip_label("dog", 0.1), "dog (10.0%)");
    }
}
