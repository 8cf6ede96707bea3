use std::io::{BufRead, Write};

use crate::{datatypes::StressMeasure, error::StressmapError};

/// Writes one line of prompt output
fn write_line<W: Write>(output: &mut W, line: &str) -> Result<(), StressmapError> {
    if let Err(err) = writeln!(output, "{line}") {
        return Err(StressmapError::Input(format!(
            "Failed to write prompt: {err}"
        )));
    }

    Ok(())
}

/// Asks the user which stress measure to flag outliers on
///
/// Presents the measures as a 1-based numbered list and re-prompts until
/// a valid selection is made.
///
/// # Arguments
/// * `input` - The line source to read selections from
/// * `output` - The sink for prompt messages
///
/// # Returns
/// The selected measure, or an input error when the line source is
/// exhausted before a valid selection
pub fn select_stress_measure<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
) -> Result<StressMeasure, StressmapError> {
    write_line(output, "Select the stress measure to flag outliers on:")?;
    for (i, measure) in StressMeasure::ALL.iter().enumerate() {
        write_line(output, &format!("  {}. {}", i + 1, measure.description()))?;
    }

    loop {
        write_line(
            output,
            &format!("Enter a number (1-{}):", StressMeasure::ALL.len()),
        )?;

        let mut line = String::new();
        match input.read_line(&mut line) {
            Ok(0) => {
                return Err(StressmapError::Input(
                    "Input ended before a stress measure was selected".to_owned(),
                ))
            }
            Ok(_) => {}
            Err(err) => {
                return Err(StressmapError::Input(format!(
                    "Failed to read selection: {err}"
                )))
            }
        }

        let selection: i64 = match line.trim().parse() {
            Ok(n) => n,
            Err(_) => {
                write_line(output, "Invalid input. Please enter a valid number.")?;
                continue;
            }
        };

        if selection < 1 || selection > StressMeasure::ALL.len() as i64 {
            write_line(
                output,
                &format!(
                    "Please enter a number between 1 and {}.",
                    StressMeasure::ALL.len()
                ),
            )?;
            continue;
        }

        return Ok(StressMeasure::ALL[(selection - 1) as usize]);
    }
}
