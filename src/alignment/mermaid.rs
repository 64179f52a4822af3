use crate::alignment::node::AlignmentNode;

const ROOT_ID: &str = "0";

/// Mermaid `graph TD` edge statements for a resolved tree. Every non-leaf node with id
/// `id` contributes `id["left"] --> idL["left child payload"]` and the matching right
/// edge, followed by the edges of its left then right subtree.
pub fn render_edges(node: &AlignmentNode) -> Vec<String> {
    let mut edges = Vec::new();
    collect_edges(node, ROOT_ID, &mut edges);
    edges
}

/// Complete diagram source. Only meaningful after a traversal returned `Ok`.
pub fn render_diagram(node: &AlignmentNode) -> String {
    let mut diagram = String::from("graph TD;");
    for edge in render_edges(node) {
        diagram.push('\n');
        diagram.push_str(&edge);
    }
    diagram
}

fn collect_edges(node: &AlignmentNode, id: &str, edges: &mut Vec<String>) {
    if node.is_leaf() {
        return;
    }
    let Some([left, right]) = node.children.as_deref() else {
        return;
    };

    let left_id = format!("{id}L");
    let right_id = format!("{id}R");
    edges.push(format!(
        "{id}[\"{}\"] --> {left_id}[\"{}\"]",
        sanitize(&node.axis.left),
        sanitize(left.payload_str())
    ));
    edges.push(format!(
        "{id}[\"{}\"] --> {right_id}[\"{}\"]",
        sanitize(&node.axis.right),
        sanitize(right.payload_str())
    ));

    collect_edges(left, &left_id, edges);
    collect_edges(right, &right_id, edges);
}

fn sanitize(text: &str) -> String {
    text.chars().filter(|c| !matches!(c, '"' | '|')).collect()
}
