use dt::fdt::writer::{FdtWriter, NodeBuilder};
use serde::Deserialize;
use std::{collections::BTreeMap, env, fs, path::PathBuf};

const DESCRIPTIONS: [&str; 3] = ["g4", "g5", "g6"];

#[derive(Deserialize)]
struct NodeDesc {
    name: String,
    #[serde(default)]
    props: BTreeMap<String, PropValue>,
    #[serde(default)]
    children: Vec<NodeDesc>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PropValue {
    /// `true` is an empty property
    Flag(bool),
    /// A string, or `<c0 c1 ...>` for 32-bit cells
    Text(String),
    List(Vec<String>),
}

fn parse_cell(cell: &str) -> u32 {
    let cell = cell.trim().replace('_', "");
    let res = match cell.strip_prefix("0x") {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => cell.parse(),
    };
    res.unwrap_or_else(|err| panic!("Bad cell '{}': {}", cell, err))
}

fn build_node(desc: &NodeDesc) -> NodeBuilder {
    let mut node = NodeBuilder::new(desc.name.as_str());
    for (name, value) in &desc.props {
        node = match value {
            PropValue::Flag(true) => node.prop_empty(name),
            PropValue::Flag(false) => node,
            PropValue::Text(text) => match text.strip_prefix('<').and_then(|x| x.strip_suffix('>')) {
                Some(cells) => {
                    let cells: Vec<u32> = cells.split_whitespace().map(parse_cell).collect();
                    node.prop_cells(name, &cells)
                }
                None => node.prop_str(name, text),
            },
            PropValue::List(list) => {
                let list: Vec<&str> = list.iter().map(String::as_str).collect();
                node.prop_strlist(name, &list)
            }
        };
    }
    for child in &desc.children {
        node.add_child(build_node(child));
    }
    node
}

fn main() {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    for name in DESCRIPTIONS {
        let src = manifest_dir.join("devicetree").join(format!("{}.json", name));
        let json = fs::read_to_string(&src).unwrap();
        let desc: NodeDesc = serde_json::from_str(&json)
            .unwrap_or_else(|err| panic!("Malformed {}: {}", src.display(), err));
        let blob = FdtWriter::write(&build_node(&desc));
        fs::write(out_dir.join(format!("{}.dtb", name)), blob).unwrap();
        println!("cargo:rerun-if-changed={}", src.display());
    }
    println!("cargo:rerun-if-changed=build.rs");
}
