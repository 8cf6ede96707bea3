use std::collections::HashMap;

use crate::{datatypes::Vertex, error::StressmapError};

/// Produces the element connectivity and node coordinate mappings for a model
pub trait GeometrySource {
    /// Loads the model geometry
    ///
    /// # Returns
    /// A tuple with the element-to-node-ids mapping and the node-to-coordinate
    /// mapping, in that order
    fn load_geometry(
        &self,
    ) -> Result<(HashMap<u32, Vec<u32>>, HashMap<u32, Vertex>), StressmapError>;
}

/// Geometry read from a Nastran BDF file through the pyNastran dump script
pub struct NastranGeometry {
    model_file: String,
    dump_script: String,
}

impl NastranGeometry {
    pub fn new(model_file: &str, dump_script: &str) -> NastranGeometry {
        NastranGeometry {
            model_file: model_file.to_owned(),
            dump_script: dump_script.to_owned(),
        }
    }
}

impl GeometrySource for NastranGeometry {
    fn load_geometry(
        &self,
    ) -> Result<(HashMap<u32, Vec<u32>>, HashMap<u32, Vertex>), StressmapError> {
        if !std::path::Path::new(&self.model_file).exists() {
            return Err(StressmapError::Input(format!(
                "Unable to open model file {}",
                self.model_file
            )));
        }

        let exchange_file = "geometry_dump.json";

        println!("info: reading model geometry with pyNastran...");
        let output = match std::process::Command::new("python")
            .arg(&self.dump_script)
            .arg("geometry")
            .arg(&self.model_file)
            .arg(exchange_file)
            .output()
        {
            Ok(out) => out,
            Err(err) => {
                return Err(StressmapError::Geometry(format!(
                    "Failed to launch geometry dump: {err}"
                )))
            }
        };

        if !output.status.success() {
            return Err(StressmapError::Geometry(format!(
                "Geometry dump exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let contents = match std::fs::read_to_string(exchange_file) {
            Ok(c) => c,
            Err(err) => {
                return Err(StressmapError::Geometry(format!(
                    "Unable to read geometry exchange file: {err}"
                )))
            }
        };

        let (elem_to_nodes, node_coords) = parse_geometry_json(&contents)?;

        if let Err(err) = std::fs::remove_file(exchange_file) {
            println!("warning: failed to delete {exchange_file}: {err}");
        }

        println!(
            "info: loaded {} elements and {} nodes",
            elem_to_nodes.len(),
            node_coords.len()
        );

        Ok((elem_to_nodes, node_coords))
    }
}

/// Geometry backed by in-memory mappings, for synthetic models and tests
pub struct InMemoryGeometry {
    pub elem_to_nodes: HashMap<u32, Vec<u32>>,
    pub node_coords: HashMap<u32, Vertex>,
}

impl GeometrySource for InMemoryGeometry {
    fn load_geometry(
        &self,
    ) -> Result<(HashMap<u32, Vec<u32>>, HashMap<u32, Vertex>), StressmapError> {
        Ok((self.elem_to_nodes.clone(), self.node_coords.clone()))
    }
}

/// Parses the geometry exchange json produced by the dump script
///
/// # Arguments
/// * `contents` - The exchange file contents
///
/// # Returns
/// The element-to-node-ids and node-to-coordinate mappings, in that order
fn parse_geometry_json(
    contents: &str,
) -> Result<(HashMap<u32, Vec<u32>>, HashMap<u32, Vertex>), StressmapError> {
    let geometry_json = match json::parse(contents) {
        Ok(j) => j,
        Err(err) => {
            return Err(StressmapError::Geometry(format!(
                "Error in geometry exchange json: {err}"
            )))
        }
    };

    if !geometry_json.has_key("nodes") {
        return Err(StressmapError::Geometry(
            "Geometry exchange json missing nodes field".to_owned(),
        ));
    }
    if !geometry_json.has_key("elements") {
        return Err(StressmapError::Geometry(
            "Geometry exchange json missing elements field".to_owned(),
        ));
    }

    let mut node_coords: HashMap<u32, Vertex> = HashMap::new();
    for (nid, coords) in geometry_json["nodes"].entries() {
        let nid: u32 = match nid.parse() {
            Ok(n) => n,
            Err(_) => {
                return Err(StressmapError::Geometry(format!(
                    "Non-integer node id '{nid}' in geometry exchange json"
                )))
            }
        };

        if coords.len() != 3 {
            return Err(StressmapError::Geometry(format!(
                "Node {} must have 3 coordinates, found {}",
                nid,
                coords.len()
            )));
        }

        let mut position = [0.0f64; 3];
        for (i, component) in position.iter_mut().enumerate() {
            *component = match coords[i].as_f64() {
                Some(c) => c,
                None => {
                    return Err(StressmapError::Geometry(format!(
                        "Non-float coordinate on node {nid}"
                    )))
                }
            };
        }

        node_coords.insert(
            nid,
            Vertex {
                x: position[0],
                y: position[1],
                z: position[2],
            },
        );
    }

    let mut elem_to_nodes: HashMap<u32, Vec<u32>> = HashMap::new();
    for (eid, nodes) in geometry_json["elements"].entries() {
        let eid: u32 = match eid.parse() {
            Ok(e) => e,
            Err(_) => {
                return Err(StressmapError::Geometry(format!(
                    "Non-integer element id '{eid}' in geometry exchange json"
                )))
            }
        };

        // Node order is preserved; it carries the polygon winding
        let mut node_ids: Vec<u32> = Vec::with_capacity(nodes.len());
        for node in nodes.members() {
            let nid = match node.as_u32() {
                Some(n) => n,
                None => {
                    return Err(StressmapError::Geometry(format!(
                        "Non-integer node reference on element {eid}"
                    )))
                }
            };

            if !node_coords.contains_key(&nid) {
                return Err(StressmapError::Geometry(format!(
                    "Element {eid} references unknown node {nid}"
                )));
            }

            node_ids.push(nid);
        }

        elem_to_nodes.insert(eid, node_ids);
    }

    Ok((elem_to_nodes, node_coords))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nodes_and_elements() {
        let contents = r#"{
            "nodes": {"1": [0.0, 0.0, 0.0], "2": [1.0, 0.0, 0.5], "3": [1.0, 1.0, 0.5]},
            "elements": {"10": [1, 2, 3]}
        }"#;

        let (elem_to_nodes, node_coords) = parse_geometry_json(contents).unwrap();

        assert_eq!(elem_to_nodes.len(), 1);
        assert_eq!(elem_to_nodes[&10], vec![1, 2, 3]);
        assert_eq!(node_coords.len(), 3);
        assert_eq!(
            node_coords[&2],
            Vertex {
                x: 1.0,
                y: 0.0,
                z: 0.5
            }
        );
    }

    #[test]
    fn rejects_missing_fields() {
        let err = parse_geometry_json(r#"{"nodes": {}}"#).unwrap_err();
        assert!(err.to_string().contains("missing elements field"));

        let err = parse_geometry_json(r#"{"elements": {}}"#).unwrap_err();
        assert!(err.to_string().contains("missing nodes field"));
    }

    #[test]
    fn rejects_unknown_node_reference() {
        let contents = r#"{
            "nodes": {"1": [0.0, 0.0, 0.0]},
            "elements": {"10": [1, 99]}
        }"#;

        let err = parse_geometry_json(contents).unwrap_err();
        let message = err.to_string();

        assert!(message.contains("10"));
        assert!(message.contains("99"));
    }

    #[test]
    fn rejects_short_coordinate_list() {
        let contents = r#"{
            "nodes": {"1": [0.0, 0.0]},
            "elements": {}
        }"#;

        assert!(parse_geometry_json(contents).is_err());
    }

    #[test]
    fn in_memory_source_round_trips() {
        let mut elem_to_nodes = HashMap::new();
        elem_to_nodes.insert(7, vec![1, 2]);
        let mut node_coords = HashMap::new();
        node_coords.insert(
            1,
            Vertex {
                x: 0.0,
                y: 0.0,
                z: 0.0,
            },
        );
        node_coords.insert(
            2,
            Vertex {
                x: 2.0,
                y: 0.0,
                z: 0.0,
            },
        );

        let source = InMemoryGeometry {
            elem_to_nodes,
            node_coords,
        };
        let (elements, nodes) = source.load_geometry().unwrap();

        assert_eq!(elements[&7], vec![1, 2]);
        assert_eq!(nodes.len(), 2);
    }
}
