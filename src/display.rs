// Debug text dump of expression graphs
//
// One line per node, children indented two spaces below their parent:
//
//     R2 -> R1 | 0x5581d2c0 | Sum
//       R2 -> R1 | 0x5581d1a0 | Parameter 0
//       R2 -> R1 | 0x5581d1e0 | Parameter 1
//
// A node that was already printed is shown once more with its address and
// `(shared)` instead of repeating its subtree. Not meant to be parsed back.
use rustc_hash::FxHashSet;
use std::fmt::{self, Write};

use crate::node::{Node, NodeKind};

/// Render the indented dump of `node` and everything below it
pub fn dump(node: &Node) -> String {
    let mut out = String::new();
    let mut printed = FxHashSet::default();
    // writing into a String cannot fail
    let _ = write_node(&mut out, node, 0, &mut printed);
    out
}

fn write_node(
    out: &mut impl Write,
    node: &Node,
    depth: usize,
    printed: &mut FxHashSet<usize>,
) -> fmt::Result {
    write!(
        out,
        "{:indent$}R{} -> R{} | {:#x} | ",
        "",
        node.num_parameters(),
        node.num_dimensions(),
        node.address(),
        indent = depth * 2
    )?;
    if !printed.insert(node.address()) {
        return writeln!(out, "{} (shared)", node.kind_name());
    }
    writeln!(out, "{}", detail(node))?;
    for child in node.children() {
        write_node(out, child, depth + 1, printed)?;
    }
    Ok(())
}

fn detail(node: &Node) -> String {
    match node.kind() {
        NodeKind::Constant { values, .. } => format!("Constant {}", format_values(values)),
        NodeKind::Parameter { index } => format!("Parameter {index}"),
        NodeKind::Scaling { scale, .. } => format!("Scaling {scale}"),
        NodeKind::Translation { offset, .. } => format!("Translation {}", format_values(offset)),
        NodeKind::Transformation { matrix, .. } => {
            let rows: Vec<String> = (0..matrix.rows())
                .map(|row| format_values(&matrix.row(row)))
                .collect();
            format!("Transformation [{}]", rows.join(", "))
        }
        NodeKind::Components { start, count, .. } => {
            format!("Components {}..{}", start, start + count)
        }
        _ => node.kind_name().to_string(),
    }
}

fn format_values(values: &[f64]) -> String {
    let parts: Vec<String> = values.iter().map(|v| format!("{v}")).collect();
    format!("[{}]", parts.join(", "))
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&dump(self))
    }
}
