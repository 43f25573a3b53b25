//! Subtree visualization as ASCII tree.

use hydra_portal::NodeClass;
use hydra_types::SubtreeNode;

/// Format a fetched subtree as ASCII tree lines.
///
/// Follows the renderer: children are shown iff their parent is expanded.
pub fn format_subtree(root: &SubtreeNode, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    format_node(root, "", true, max_chars, &mut lines);
    lines
}

fn format_node(node: &SubtreeNode, prefix: &str, is_last: bool, max_chars: usize, lines: &mut Vec<String>) {
    let connector = if node.depth == 0 {
        ""
    } else if is_last {
        "└─ "
    } else {
        "├─ "
    };

    let class = NodeClass::of(node);
    let marker = match class {
        NodeClass::Leaf => String::new(),
        NodeClass::Parent => format!(" ({})", node.child_count),
        NodeClass::Collapsed => format!(" (+{} hidden)", node.child_count),
    };

    lines.push(format!(
        "{}{}{} [{}] \"{}\"{}",
        prefix,
        connector,
        node.id.short(),
        class.css_class(),
        summarize(&node.text, max_chars),
        marker
    ));

    if !node.is_expanded {
        return;
    }

    let child_prefix = if node.depth == 0 {
        String::new()
    } else if is_last {
        format!("{}   ", prefix)
    } else {
        format!("{}│  ", prefix)
    };

    for (i, child) in node.children.iter().enumerate() {
        let is_last_child = i + 1 == node.children.len();
        format_node(child, &child_prefix, is_last_child, max_chars, lines);
    }
}

/// First line of `text`, trimmed and cut to `max_chars`.
pub fn summarize(text: &str, max_chars: usize) -> String {
    let first_line = text.lines().next().unwrap_or("");
    let trimmed = first_line.trim();

    if trimmed.chars().count() <= max_chars {
        trimmed.to_string()
    } else {
        let truncated: String = trimmed.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hydra_blocks::MemoryHost;
    use hydra_portal::{count_visible_nodes, fetch_subtree};
    use hydra_types::{BULLET_FLAVOUR, BlockId, SourceRef, SubtreeOptions};

    #[test]
    fn test_format_tree() {
        let host = MemoryHost::new();
        let doc = host.create_document("notes").unwrap();
        let add = |id: &str, parent: Option<&str>, text: &str| {
            let parent = parent.map(BlockId::new);
            doc.insert_block_with_id(BlockId::new(id), parent.as_ref(), None, BULLET_FLAVOUR, text)
                .unwrap();
        };
        add("root", None, "Fruit");
        add("a", Some("root"), "Apple");
        add("a1", Some("a"), "Pie");
        add("b", Some("root"), "Pear");
        add("b1", Some("b"), "Poached");
        doc.set_expanded(&BlockId::new("b"), false).unwrap();

        let result = fetch_subtree(&host, &SourceRef::new("notes", "root"), SubtreeOptions::default());
        let tree = result.root.unwrap();
        let lines = format_subtree(&tree, 40);

        assert_eq!(
            lines,
            vec![
                "root [portal-node-parent] \"Fruit\" (2)",
                "├─ a [portal-node-parent] \"Apple\" (1)",
                "│  └─ a1 [portal-node-leaf] \"Pie\"",
                "└─ b [portal-node-collapsed] \"Pear\" (+1 hidden)",
            ]
        );
        assert_eq!(lines.len(), count_visible_nodes(&tree));
    }

    #[test]
    fn test_summarize() {
        assert_eq!(summarize("  short  ", 10), "short");
        assert_eq!(summarize("first\nsecond", 10), "first");
        assert_eq!(summarize("a very long bullet text", 10), "a very ...");
        assert_eq!(summarize("", 10), "");
    }
}
