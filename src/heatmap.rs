use std::collections::{BTreeMap, HashMap};

use nalgebra::Vector2;

use crate::{datatypes::Vertex, error::StressmapError};

/// Counts how often each element was flagged across all load cases
///
/// # Arguments
/// * `flagged_by_case` - The per-case flagged element lists
///
/// # Returns
/// The element-to-occurrence-count mapping. Elements that were never
/// flagged are absent.
pub fn aggregate(flagged_by_case: &BTreeMap<String, Vec<u32>>) -> HashMap<u32, usize> {
    let mut frequencies: HashMap<u32, usize> = HashMap::new();

    for elements in flagged_by_case.values() {
        for element in elements {
            *frequencies.entry(*element).or_insert(0) += 1;
        }
    }

    frequencies
}

/// Computes the 2D centroid of an element in the XY plane
///
/// # Arguments
/// * `element` - The element id, used for error reporting
/// * `node_ids` - The element's node ids
/// * `node_coords` - The node-to-coordinate mapping
///
/// # Returns
/// The mean of the element's node XY positions
fn element_centroid(
    element: u32,
    node_ids: &[u32],
    node_coords: &HashMap<u32, Vertex>,
) -> Result<Vector2<f64>, StressmapError> {
    if node_ids.is_empty() {
        return Err(StressmapError::PostProcessor(format!(
            "Element {element} has no nodes"
        )));
    }

    let mut sum = Vector2::zeros();
    for nid in node_ids {
        let vertex = match node_coords.get(nid) {
            Some(v) => v,
            None => {
                return Err(StressmapError::PostProcessor(format!(
                    "Element {element} references unknown node {nid}"
                )))
            }
        };

        sum += Vector2::new(vertex.x, vertex.y);
    }

    Ok(sum / node_ids.len() as f64)
}

/// The rows backing the heatmap CSV hand-off
#[derive(Debug)]
pub struct HeatmapData {
    /// Per element, the XY outline vertices in winding order
    pub outlines: Vec<(u32, Vec<(f64, f64)>)>,
    /// Per flagged element, centroid and normalized flag frequency
    pub overlay: Vec<(u32, f64, f64, f64)>,
}

/// Prepares the mesh outlines and flag overlay for plotting
///
/// # Arguments
/// * `flagged_by_case` - The per-case flagged element lists
/// * `elem_to_nodes` - The element-to-node-ids mapping
/// * `node_coords` - The node-to-coordinate mapping
///
/// # Returns
/// The outline and overlay rows, both in ascending element id order
pub fn prepare(
    flagged_by_case: &BTreeMap<String, Vec<u32>>,
    elem_to_nodes: &HashMap<u32, Vec<u32>>,
    node_coords: &HashMap<u32, Vertex>,
) -> Result<HeatmapData, StressmapError> {
    let mut element_ids: Vec<u32> = elem_to_nodes.keys().copied().collect();
    element_ids.sort_unstable();

    let mut outlines: Vec<(u32, Vec<(f64, f64)>)> = Vec::with_capacity(element_ids.len());
    for element in &element_ids {
        let node_ids = &elem_to_nodes[element];

        let mut corners: Vec<(f64, f64)> = Vec::with_capacity(node_ids.len());
        for nid in node_ids {
            let vertex = match node_coords.get(nid) {
                Some(v) => v,
                None => {
                    return Err(StressmapError::PostProcessor(format!(
                        "Element {element} references unknown node {nid}"
                    )))
                }
            };
            corners.push((vertex.x, vertex.y));
        }

        outlines.push((*element, corners));
    }

    let frequencies = aggregate(flagged_by_case);
    let max_count = frequencies.values().copied().max().unwrap_or(0);

    if max_count == 0 {
        println!("warning: no elements were flagged, plotting mesh outline only");
        return Ok(HeatmapData {
            outlines,
            overlay: Vec::new(),
        });
    }

    let mut flagged_ids: Vec<u32> = frequencies.keys().copied().collect();
    flagged_ids.sort_unstable();

    let mut overlay: Vec<(u32, f64, f64, f64)> = Vec::with_capacity(flagged_ids.len());
    for element in flagged_ids {
        let node_ids = match elem_to_nodes.get(&element) {
            Some(n) => n,
            None => {
                return Err(StressmapError::PostProcessor(format!(
                    "Flagged element {element} is missing from the model geometry"
                )))
            }
        };

        let centroid = element_centroid(element, node_ids, node_coords)?;
        let normalized = frequencies[&element] as f64 / max_count as f64;

        overlay.push((element, centroid.x, centroid.y, normalized));
    }

    Ok(HeatmapData { outlines, overlay })
}

/// Writes the heatmap hand-off CSV files
///
/// # Arguments
/// * `data` - The prepared outline and overlay rows
/// * `mesh_output` - The filename of the mesh outline csv
/// * `overlay_output` - The filename of the flag overlay csv
pub fn csv_output(
    data: &HeatmapData,
    mesh_output: &str,
    overlay_output: &str,
) -> Result<(), StressmapError> {
    // One row per polygon corner; the plot script regroups on element id
    let mut mesh_contents = String::from("element,x,y\n");
    for (element, corners) in &data.outlines {
        for (x, y) in corners {
            mesh_contents.push_str(&format!("{element},{x},{y}\n"));
        }
    }

    let mut overlay_contents = String::from("element,cx,cy,frequency\n");
    for (element, cx, cy, frequency) in &data.overlay {
        overlay_contents.push_str(&format!("{element},{cx},{cy},{frequency}\n"));
    }

    if let Err(err) = std::fs::write(mesh_output, mesh_contents) {
        return Err(StressmapError::PostProcessor(format!(
            "Failed to create {mesh_output}: {err}"
        )));
    }
    if let Err(err) = std::fs::write(overlay_output, overlay_contents) {
        return Err(StressmapError::PostProcessor(format!(
            "Failed to create {overlay_output}: {err}"
        )));
    }

    println!("info: wrote heatmap data to {mesh_output} and {overlay_output}");

    Ok(())
}

/// Plots the heatmap CSVs in python
///
/// # Arguments
/// * `mesh_csv` - The filename of the mesh outline csv
/// * `overlay_csv` - The filename of the flag overlay csv
/// * `title` - The plot title, naming the flagged stress measure
/// * `plotter_path` - The path to the matplotlib helper script
pub fn pyplot(
    mesh_csv: &str,
    overlay_csv: &str,
    title: &str,
    plotter_path: &str,
) -> Result<(), StressmapError> {
    println!("info: plotting in python...");
    let output = match std::process::Command::new("python")
        .arg(plotter_path)
        .arg(mesh_csv)
        .arg(overlay_csv)
        .arg(title)
        .output()
    {
        Ok(out) => out,
        Err(err) => {
            return Err(StressmapError::PostProcessor(format!(
                "Failed to launch plotter: {err}"
            )))
        }
    };

    if !output.status.success() {
        return Err(StressmapError::PostProcessor(format!(
            "Plotter exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    Ok(())
}

/// Renders the flag-frequency heatmap for a model
///
/// Prepares the outline and overlay rows, hands them to the matplotlib
/// helper over CSV files, and deletes the intermediate files afterwards.
///
/// # Arguments
/// * `flagged_by_case` - The per-case flagged element lists
/// * `elem_to_nodes` - The element-to-node-ids mapping
/// * `node_coords` - The node-to-coordinate mapping
/// * `title` - The plot title, naming the flagged stress measure
/// * `plotter_path` - The path to the matplotlib helper script
pub fn render(
    flagged_by_case: &BTreeMap<String, Vec<u32>>,
    elem_to_nodes: &HashMap<u32, Vec<u32>>,
    node_coords: &HashMap<u32, Vertex>,
    title: &str,
    plotter_path: &str,
) -> Result<(), StressmapError> {
    let mesh_csv = "heatmap_mesh.csv";
    let overlay_csv = "heatmap_flagged.csv";

    let data = prepare(flagged_by_case, elem_to_nodes, node_coords)?;

    csv_output(&data, mesh_csv, overlay_csv)?;
    pyplot(mesh_csv, overlay_csv, title, plotter_path)?;

    for file in [mesh_csv, overlay_csv] {
        if let Err(err) = std::fs::remove_file(file) {
            println!("warning: failed to delete {file}: {err}");
        }
    }

    Ok(())
}
