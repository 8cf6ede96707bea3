use clap::Parser;

use stressmap::{
    error::StressmapError,
    flagger,
    geometry::{GeometrySource, NastranGeometry},
    heatmap, prompt,
    results::NastranResults,
};

/// Flags stress outlier elements per load case and plots a heatmap of how
/// often each element is flagged
#[derive(Parser)]
#[command(name = "stressmap")]
struct Args {
    /// Path to the Nastran BDF model file
    model_file: String,

    /// Path to the Nastran OP2 results file
    results_file: String,

    /// Directory holding the python helper scripts, located relative to
    /// the executable when omitted
    #[arg(long)]
    scripts_dir: Option<String>,
}

/// Finds the directory holding the python helper scripts
///
/// Walks up from the executable location looking for a `scripts` directory
/// that contains both helpers.
///
/// # Returns
/// The absolute scripts directory path
fn locate_scripts_dir() -> Result<std::path::PathBuf, StressmapError> {
    let current_exe = match std::env::current_exe() {
        Ok(p) => p,
        Err(err) => {
            return Err(StressmapError::Input(format!(
                "Unable to locate executable: {err}"
            )))
        }
    };

    let scripts_dir = current_exe
        .ancestors()
        .map(|p| p.join("scripts"))
        .find(|p| p.join("nastran_dump.py").exists() && p.join("heatmap_plot.py").exists());

    match scripts_dir {
        Some(dir) => Ok(dir),
        None => Err(StressmapError::Input(
            "Unable to find the scripts directory. Pass --scripts-dir explicitly".to_owned(),
        )),
    }
}

/// Resolves a helper script path inside the scripts directory
fn script_path(scripts_dir: &std::path::Path, name: &str) -> Result<String, StressmapError> {
    let path = scripts_dir.join(name);

    if !path.exists() {
        return Err(StressmapError::Input(format!(
            "Helper script {} not found in {}",
            name,
            scripts_dir.display()
        )));
    }

    Ok(path.to_string_lossy().into_owned())
}

fn run(args: Args) -> Result<(), StressmapError> {
    let scripts_dir = match args.scripts_dir {
        Some(dir) => std::path::PathBuf::from(dir),
        None => locate_scripts_dir()?,
    };
    let dump_script = script_path(&scripts_dir, "nastran_dump.py")?;
    let plot_script = script_path(&scripts_dir, "heatmap_plot.py")?;

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let measure =
        prompt::select_stress_measure(&mut stdin.lock(), &mut stdout.lock())?;

    let geometry = NastranGeometry::new(&args.model_file, &dump_script);
    let (elem_to_nodes, node_coords) = geometry.load_geometry()?;

    let results = NastranResults::new(&args.results_file, &dump_script);
    let flagged_by_case = flagger::flag_outliers(&results, measure.key())?;

    println!("info: flagged elements by load case:");
    for (label, elements) in &flagged_by_case {
        println!("  {label}: {elements:?}");
    }

    let title = format!("Heatmap of flagged elements for: {}", measure.description());
    heatmap::render(
        &flagged_by_case,
        &elem_to_nodes,
        &node_coords,
        &title,
        &plot_script,
    )?;

    Ok(())
}

fn main() {
    let args = Args::parse();

    if let Err(err) = run(args) {
        println!("{err}");
        std::process::exit(1);
    }
}
