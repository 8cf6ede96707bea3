use crate::{
    datatypes::{LoadCase, StressRow},
    error::StressmapError,
};

/// Produces the load cases and their stress rows for a model
pub trait ResultsSource {
    /// Loads the stress results
    ///
    /// # Returns
    /// The load cases found in the results file, each with its stress rows
    fn load_cases(&self) -> Result<Vec<LoadCase>, StressmapError>;
}

/// Results read from a Nastran OP2 file through the pyNastran dump script
pub struct NastranResults {
    results_file: String,
    dump_script: String,
}

impl NastranResults {
    pub fn new(results_file: &str, dump_script: &str) -> NastranResults {
        NastranResults {
            results_file: results_file.to_owned(),
            dump_script: dump_script.to_owned(),
        }
    }
}

impl ResultsSource for NastranResults {
    fn load_cases(&self) -> Result<Vec<LoadCase>, StressmapError> {
        if !std::path::Path::new(&self.results_file).exists() {
            return Err(StressmapError::Input(format!(
                "Unable to open results file {}",
                self.results_file
            )));
        }

        let exchange_file = "results_dump.json";

        println!("info: reading stress results with pyNastran...");
        let output = match std::process::Command::new("python")
            .arg(&self.dump_script)
            .arg("results")
            .arg(&self.results_file)
            .arg(exchange_file)
            .output()
        {
            Ok(out) => out,
            Err(err) => {
                return Err(StressmapError::Results(format!(
                    "Failed to launch results dump: {err}"
                )))
            }
        };

        if !output.status.success() {
            return Err(StressmapError::Results(format!(
                "Results dump exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let contents = match std::fs::read_to_string(exchange_file) {
            Ok(c) => c,
            Err(err) => {
                return Err(StressmapError::Results(format!(
                    "Unable to read results exchange file: {err}"
                )))
            }
        };

        let cases = parse_results_json(&contents)?;

        if let Err(err) = std::fs::remove_file(exchange_file) {
            println!("warning: failed to delete {exchange_file}: {err}");
        }

        let row_total: usize = cases.iter().map(|c| c.rows.len()).sum();
        println!(
            "info: loaded {} load cases with {} stress rows",
            cases.len(),
            row_total
        );

        Ok(cases)
    }
}

/// Results backed by in-memory load cases, for synthetic models and tests
pub struct InMemoryResults {
    pub cases: Vec<LoadCase>,
}

impl ResultsSource for InMemoryResults {
    fn load_cases(&self) -> Result<Vec<LoadCase>, StressmapError> {
        Ok(self.cases.clone())
    }
}

/// Parses the results exchange json produced by the dump script
///
/// # Arguments
/// * `contents` - The exchange file contents
///
/// # Returns
/// The load cases in ascending case id order
fn parse_results_json(contents: &str) -> Result<Vec<LoadCase>, StressmapError> {
    let results_json = match json::parse(contents) {
        Ok(j) => j,
        Err(err) => {
            return Err(StressmapError::Results(format!(
                "Error in results exchange json: {err}"
            )))
        }
    };

    if !results_json.has_key("cases") {
        return Err(StressmapError::Results(
            "Results exchange json missing cases field".to_owned(),
        ));
    }

    let mut cases: Vec<LoadCase> = Vec::new();
    for (cid, rows) in results_json["cases"].entries() {
        let cid: u32 = match cid.parse() {
            Ok(c) => c,
            Err(_) => {
                return Err(StressmapError::Results(format!(
                    "Non-integer case id '{cid}' in results exchange json"
                )))
            }
        };

        let mut case = LoadCase {
            id: cid,
            rows: Vec::with_capacity(rows.len()),
        };

        for row in rows.members() {
            // Row layout: [element, node, fiber_distance, oxx, oyy, txy,
            // angle, omax, omin, von_mises]
            if row.len() != 10 {
                return Err(StressmapError::Results(format!(
                    "Case {} row must have 10 columns, found {}",
                    cid,
                    row.len()
                )));
            }

            let element = match row[0].as_u32() {
                Some(e) => e,
                None => {
                    return Err(StressmapError::Results(format!(
                        "Non-integer element id in case {cid}"
                    )))
                }
            };
            let node = match row[1].as_u32() {
                Some(n) => n,
                None => {
                    return Err(StressmapError::Results(format!(
                        "Non-integer node id on element {element} in case {cid}"
                    )))
                }
            };

            let mut values = [0.0f64; 8];
            for (i, value) in values.iter_mut().enumerate() {
                *value = match row[i + 2].as_f64() {
                    Some(v) => v,
                    None => {
                        return Err(StressmapError::Results(format!(
                            "Non-float stress value on element {element} in case {cid}"
                        )))
                    }
                };
            }

            case.rows.push(StressRow {
                element,
                node,
                fiber_distance: values[0],
                oxx: values[1],
                oyy: values[2],
                txy: values[3],
                angle: values[4],
                omax: values[5],
                omin: values[6],
                von_mises: values[7],
            });
        }

        cases.push(case);
    }

    cases.sort_by_key(|c| c.id);

    Ok(cases)
}
