use crate::model::Scenario;
use std::collections::BTreeSet;

/// Turn a base scenario list into the full temperature matrix.
///
/// For each step k in 0..=N the base temperature spawns an upper variant
/// `base * (1 + 0.25k)` and a lower variant `base * (1 - 0.25k)`. Variants are
/// rounded to 3 decimals, deduplicated, and kept only when <= 1. There is no
/// lower clamp: large step counts can drive the lower variant past zero, and
/// those negative temperatures survive expansion. Pure function, result sorted
/// ascending by temperature.
pub fn expand_scenarios(base: &[Scenario], variation_steps: u32) -> Vec<Scenario> {
    let mut expanded = Vec::new();
    for scenario in base {
        for temperature in temperature_variants(scenario.temperature, variation_steps) {
            let mut variant = scenario.clone();
            variant.temperature = temperature;
            expanded.push(variant);
        }
    }
    expanded
}

fn temperature_variants(base: f64, steps: u32) -> Vec<f64> {
    // Dedup on the rounded value; f64 is not Ord so key on milli-units.
    let mut keys = BTreeSet::new();
    for k in 0..=steps {
        let spread = 0.25 * f64::from(k);
        keys.insert(to_millis(round3(base * (1.0 + spread))));
        keys.insert(to_millis(round3(base * (1.0 - spread))));
    }
    keys.into_iter()
        .map(from_millis)
        .filter(|t| *t <= 1.0)
        .collect()
}

fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}

fn to_millis(x: f64) -> i64 {
    (x * 1000.0).round() as i64
}

fn from_millis(m: i64) -> f64 {
    m as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Scenario;

    fn base_scenario(temperature: f64) -> Scenario {
        Scenario {
            prompt: "p".into(),
            task_type: "qa".into(),
            task_criteria: "c".into(),
            golden_answer: "g".into(),
            model_id: "m".into(),
            region: "us-east-1".into(),
            expected_output_tokens: 100,
            temperature,
            top_p: 1.0,
            vision_payload: None,
            input_token_cost: 1.0,
            output_token_cost: 2.0,
        }
    }

    #[test]
    fn zero_steps_yields_the_base_temperature_only() {
        let out = expand_scenarios(&[base_scenario(0.7)], 0);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].temperature, 0.7);
    }

    #[test]
    fn one_step_around_0_8_sweeps_a_quarter_each_way() {
        let out = expand_scenarios(&[base_scenario(0.8)], 1);
        let temps: Vec<f64> = out.iter().map(|s| s.temperature).collect();
        assert_eq!(temps, vec![0.6, 0.8, 1.0]);
    }

    #[test]
    fn two_steps_around_0_8_drop_the_over_one_variant() {
        // Candidates 0.8 * {0.5, 0.75, 1.0, 1.25, 1.5}: 1.2 filtered out.
        let out = expand_scenarios(&[base_scenario(0.8)], 2);
        let temps: Vec<f64> = out.iter().map(|s| s.temperature).collect();
        assert_eq!(temps, vec![0.4, 0.6, 0.8, 1.0]);
    }

    #[test]
    fn variants_are_sorted_and_deduplicated() {
        // base 0 collapses every variant onto 0.0.
        let out = expand_scenarios(&[base_scenario(0.0)], 3);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].temperature, 0.0);
    }

    #[test]
    fn large_steps_preserve_negative_temperatures() {
        // k=5 -> lower factor 1 - 1.25 = -0.25; no lower clamp by contract.
        let out = expand_scenarios(&[base_scenario(0.8)], 5);
        assert!(out.iter().any(|s| s.temperature < 0.0));
        assert!(out.iter().all(|s| s.temperature <= 1.0));
    }

    #[test]
    fn bound_holds_for_a_sweep_of_bases_and_steps() {
        for base in [0.0, 0.1, 0.35, 0.5, 0.8, 1.0] {
            for steps in 0..6 {
                let out = expand_scenarios(&[base_scenario(base)], steps);
                assert!(out.iter().all(|s| s.temperature <= 1.0));
                // Sorted ascending, strictly increasing after dedup.
                for pair in out.windows(2) {
                    assert!(pair[0].temperature < pair[1].temperature);
                }
            }
        }
    }

    #[test]
    fn every_variant_keeps_the_base_fields() {
        let out = expand_scenarios(&[base_scenario(0.8)], 1);
        assert!(out.iter().all(|s| s.model_id == "m" && s.prompt == "p"));
    }
}
