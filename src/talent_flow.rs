use serde::Serialize;
use serde_json::Value;

use crate::source::SourceRecord;

const ROOT: &str = "flare";
const GROUP: &str = "companies";
pub const NO_DATA: &str = "No Data Available";
pub const LOAD_ERROR: &str = "Error Loading Data";

/// A parent company and the companies people left it for.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowNode {
    pub name: String,
    pub imports: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowGroup {
    pub name: String,
    pub children: Vec<FlowNode>,
}

/// Hierarchy consumed by edge-bundling charts: root -> group -> leaves.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TalentFlow {
    pub name: String,
    pub children: Vec<FlowGroup>,
}

impl TalentFlow {
    fn with_nodes(nodes: Vec<FlowNode>) -> Self {
        Self {
            name: ROOT.to_string(),
            children: vec![FlowGroup {
                name: GROUP.to_string(),
                children: nodes,
            }],
        }
    }

    fn single(name: &str) -> Self {
        Self::with_nodes(vec![FlowNode {
            name: name.to_string(),
            imports: Vec::new(),
        }])
    }

    pub fn load_error() -> Self {
        Self::single(LOAD_ERROR)
    }

    pub fn nodes(&self) -> &[FlowNode] {
        self.children
            .first()
            .map(|group| group.children.as_slice())
            .unwrap_or_default()
    }
}

fn import_path(child: &str) -> String {
    format!("{ROOT}.{GROUP}.{child}")
}

pub fn build_talent_flow(records: &[SourceRecord]) -> TalentFlow {
    let nodes: Vec<FlowNode> = records
        .iter()
        .filter_map(|record| {
            let parent = record
                .fields
                .get("parent-co")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|name| !name.is_empty())?;
            let imports: Vec<String> = record
                .fields
                .get("children")
                .and_then(Value::as_str)
                .map(|children| {
                    children
                        .split(';')
                        .map(str::trim)
                        .filter(|child| !child.is_empty())
                        .map(import_path)
                        .collect()
                })
                .unwrap_or_default();
            Some(FlowNode {
                name: parent.to_string(),
                imports,
            })
        })
        .collect();

    if nodes.is_empty() {
        return TalentFlow::single(NO_DATA);
    }
    TalentFlow::with_nodes(nodes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::tests::record;
    use serde_json::json;

    #[test]
    fn splits_children_into_import_paths() {
        let flow = build_talent_flow(&[
            record(json!({"parent-co": "Acme", "children": "Globex; Initech;;  "})),
            record(json!({"parent-co": "Globex"})),
            record(json!({"children": "Orphan"})),
        ]);

        assert_eq!(flow.name, "flare");
        assert_eq!(flow.children[0].name, "companies");
        let nodes = flow.nodes();
        assert_eq!(nodes.len(), 2);
        assert_eq!(
            nodes[0].imports,
            vec!["flare.companies.Globex", "flare.companies.Initech"]
        );
        assert!(nodes[1].imports.is_empty());
    }

    #[test]
    fn empty_input_gets_a_placeholder_node() {
        let flow = build_talent_flow(&[]);
        assert_eq!(flow.nodes()[0].name, NO_DATA);
        assert_eq!(TalentFlow::load_error().nodes()[0].name, LOAD_ERROR);
    }

    #[test]
    fn serializes_in_hierarchy_shape() {
        let flow = build_talent_flow(&[record(json!({"parent-co": "A", "children": "B"}))]);
        let value = serde_json::to_value(&flow).unwrap();
        assert_eq!(
            value,
            json!({
                "name": "flare",
                "children": [{
                    "name": "companies",
                    "children": [{"name": "A", "imports": ["flare.companies.B"]}]
                }]
            })
        );
    }
}
