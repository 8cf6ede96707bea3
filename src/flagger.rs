use std::collections::BTreeMap;

use indicatif::ProgressBar;

use crate::{
    datatypes::{LoadCase, StressMeasure},
    error::StressmapError,
    results::ResultsSource,
};

/// Computes the arithmetic mean of a set of values
fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    values.iter().sum::<f64>() / values.len() as f64
}

/// Computes the sample standard deviation of a set of values
///
/// Uses the n-1 denominator. Fewer than two values have no spread, so the
/// deviation is zero.
fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }

    let mean = mean(values);
    let sum_sq: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();

    (sum_sq / (values.len() - 1) as f64).sqrt()
}

/// Reduces a load case to the per-element maximum of the selected measure
///
/// # Arguments
/// * `case` - The load case to reduce
/// * `measure` - The stress measure to read from each row
///
/// # Returns
/// The element-to-maximum mapping in ascending element id order
fn per_element_maxima(case: &LoadCase, measure: StressMeasure) -> BTreeMap<u32, f64> {
    let mut maxima: BTreeMap<u32, f64> = BTreeMap::new();

    for row in &case.rows {
        let value = measure.component(row);
        maxima
            .entry(row.element)
            .and_modify(|current| {
                if value > *current {
                    *current = value;
                }
            })
            .or_insert(value);
    }

    maxima
}

/// Flags the outlier elements of one load case
///
/// An element is an outlier when its maximum stress exceeds the mean of all
/// element maxima by more than two sample standard deviations.
///
/// # Arguments
/// * `case` - The load case to flag
/// * `measure` - The stress measure to flag on
///
/// # Returns
/// The flagged element ids in ascending order
fn flag_case(case: &LoadCase, measure: StressMeasure) -> Vec<u32> {
    let maxima = per_element_maxima(case, measure);
    let values: Vec<f64> = maxima.values().copied().collect();

    let threshold = mean(&values) + 2.0 * sample_std(&values);

    maxima
        .iter()
        .filter(|(_, value)| **value > threshold)
        .map(|(element, _)| *element)
        .collect()
}

/// Flags the outlier elements of every load case in the results
///
/// # Arguments
/// * `source` - The results source to read load cases from
/// * `stress_measure` - The measure key to flag on, e.g. "von_mises"
///
/// # Returns
/// A mapping from case label to the flagged element ids of that case,
/// covering every load case. Cases without outliers map to an empty list.
pub fn flag_outliers<S: ResultsSource>(
    source: &S,
    stress_measure: &str,
) -> Result<BTreeMap<String, Vec<u32>>, StressmapError> {
    let measure = StressMeasure::from_key(stress_measure)?;

    let cases = source.load_cases()?;

    println!(
        "info: flagging outlier elements on {} across {} load cases...",
        measure.description().to_lowercase(),
        cases.len()
    );

    let mut flagged: BTreeMap<String, Vec<u32>> = BTreeMap::new();

    let bar = ProgressBar::new(cases.len() as u64);
    for case in &cases {
        bar.inc(1);
        flagged.insert(format!("Case_{}", case.id), flag_case(case, measure));
    }
    bar.finish();

    let flag_total: usize = flagged.values().map(|elements| elements.len()).sum();
    println!("info: flagged {flag_total} element occurrences");

    Ok(flagged)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::{datatypes::StressRow, results::InMemoryResults};

    fn row(element: u32, node: u32, value: f64) -> StressRow {
        StressRow {
            element,
            node,
            fiber_distance: 0.1,
            oxx: value,
            oyy: value / 2.0,
            txy: 0.0,
            angle: 0.0,
            omax: value,
            omin: 0.0,
            von_mises: value,
        }
    }

    #[test]
    fn mean_and_std_of_uniform_values() {
        let values = [5.0, 5.0, 5.0];

        assert_relative_eq!(mean(&values), 5.0);
        assert_relative_eq!(sample_std(&values), 0.0);
    }

    #[test]
    fn sample_std_uses_n_minus_one() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];

        // Population deviation would be 2.0; the sample flavor is larger
        assert_relative_eq!(sample_std(&values), 2.138, epsilon = 1e-3);
    }

    #[test]
    fn std_of_single_value_is_zero() {
        assert_relative_eq!(sample_std(&[42.0]), 0.0);
        assert_relative_eq!(sample_std(&[]), 0.0);
    }

    #[test]
    fn maxima_keep_largest_row_per_element() {
        let case = LoadCase {
            id: 1,
            rows: vec![row(10, 1, 3.0), row(10, 2, 8.0), row(11, 1, 5.0)],
        };

        let maxima = per_element_maxima(&case, StressMeasure::VonMises);

        assert_eq!(maxima.len(), 2);
        assert_relative_eq!(maxima[&10], 8.0);
        assert_relative_eq!(maxima[&11], 5.0);
    }

    #[test]
    fn flags_element_far_above_the_rest() {
        // Maxima [1.0 x 9, 50.0]: mean 5.9, sample std ~15.495,
        // threshold ~36.89, so only the 50.0 element is flagged
        let mut rows: Vec<StressRow> = (1..=9).map(|e| row(e, 1, 1.0)).collect();
        rows.push(row(10, 1, 50.0));

        let flagged = flag_case(&LoadCase { id: 1, rows }, StressMeasure::VonMises);

        assert_eq!(flagged, vec![10]);
    }

    #[test]
    fn does_not_flag_within_two_deviations() {
        // Maxima [10, 10, 10, 50]: mean 20, sample std 20, threshold 60
        let rows = vec![
            row(1, 1, 10.0),
            row(2, 1, 10.0),
            row(3, 1, 10.0),
            row(4, 1, 50.0),
        ];

        let flagged = flag_case(&LoadCase { id: 1, rows }, StressMeasure::VonMises);

        assert!(flagged.is_empty());
    }

    #[test]
    fn single_element_case_flags_nothing() {
        let case = LoadCase {
            id: 1,
            rows: vec![row(10, 1, 1000.0)],
        };

        assert!(flag_case(&case, StressMeasure::VonMises).is_empty());
    }

    #[test]
    fn flag_outliers_labels_every_case() {
        let mut rows: Vec<StressRow> = (1..=9).map(|e| row(e, 1, 1.0)).collect();
        rows.push(row(10, 1, 50.0));

        let source = InMemoryResults {
            cases: vec![
                LoadCase { id: 3, rows },
                LoadCase {
                    id: 7,
                    rows: vec![row(1, 1, 5.0), row(2, 1, 5.0)],
                },
            ],
        };

        let flagged = flag_outliers(&source, "von_mises").unwrap();

        assert_eq!(flagged.len(), 2);
        assert_eq!(flagged["Case_3"], vec![10]);
        assert!(flagged["Case_7"].is_empty());
    }

    #[test]
    fn flag_outliers_uses_selected_measure() {
        // oxx carries the outlier, oyy is half of it and stays uniform enough
        let mut rows: Vec<StressRow> = (1..=9).map(|e| row(e, 1, 1.0)).collect();
        rows.push(row(10, 1, 50.0));

        let source = InMemoryResults {
            cases: vec![LoadCase { id: 1, rows }],
        };

        let flagged = flag_outliers(&source, "oxx").unwrap();

        assert_eq!(flagged["Case_1"], vec![10]);
    }

    #[test]
    fn rejects_invalid_measure_before_loading() {
        struct FailingSource;

        impl ResultsSource for FailingSource {
            fn load_cases(&self) -> Result<Vec<LoadCase>, StressmapError> {
                Err(StressmapError::Results("should not be reached".to_owned()))
            }
        }

        let err = flag_outliers(&FailingSource, "bogus").unwrap_err();

        assert!(err.to_string().contains("Invalid stress measure"));
    }
}
