use crate::model::BenchmarkRecord;
use serde::Serialize;
use std::collections::BTreeMap;

/// Per-model cost aggregate over one experiment batch.
#[derive(Debug, Clone, Serialize)]
pub struct CostSummaryRow {
    pub model_id: String,
    pub avg_cost: f64,
    pub total_cost: f64,
    pub num_invocations: usize,
    /// Naive 30-day forecast from the mean cost and observed call volume.
    pub monthly_forecast: f64,
}

pub fn cost_summary(records: &[BenchmarkRecord], invocations_per_scenario: u32) -> Vec<CostSummaryRow> {
    let mut by_model: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for r in records {
        let entry = by_model.entry(r.scenario.model_id.clone()).or_insert((0.0, 0));
        entry.0 += r.response_cost.unwrap_or(0.0);
        entry.1 += 1;
    }

    by_model
        .into_iter()
        .map(|(model_id, (total_cost, num_invocations))| {
            let avg_cost = total_cost / num_invocations as f64;
            let monthly_forecast = avg_cost
                * (num_invocations as f64 / f64::from(invocations_per_scenario.max(1)))
                * 30.0;
            CostSummaryRow {
                model_id,
                avg_cost,
                total_cost,
                num_invocations,
                monthly_forecast,
            }
        })
        .collect()
}

pub fn print_summary(rows: &[CostSummaryRow]) {
    eprintln!("Cost summary & forecast:");
    for row in rows {
        eprintln!(
            "  {}: avg={:.6} total={:.6} invocations={} monthly_forecast={:.4}",
            row.model_id, row.avg_cost, row.total_cost, row.num_invocations, row.monthly_forecast
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Scenario;

    fn record(model_id: &str, cost: f64) -> BenchmarkRecord {
        let mut r = BenchmarkRecord::failed(
            &Scenario {
                prompt: "p".into(),
                task_type: "qa".into(),
                task_criteria: "c".into(),
                golden_answer: "g".into(),
                model_id: model_id.into(),
                region: "us-east-1".into(),
                expected_output_tokens: 10,
                temperature: 0.5,
                top_p: 1.0,
                vision_payload: None,
                input_token_cost: 1.0,
                output_token_cost: 1.0,
            },
            "n/a",
        );
        r.response_cost = Some(cost);
        r
    }

    #[test]
    fn aggregates_per_model() {
        let rows = cost_summary(
            &[record("a", 0.10), record("a", 0.30), record("b", 0.50)],
            2,
        );
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].model_id, "a");
        assert!((rows[0].avg_cost - 0.20).abs() < 1e-12);
        assert!((rows[0].total_cost - 0.40).abs() < 1e-12);
        assert_eq!(rows[0].num_invocations, 2);
        // avg * (calls / invocations_per_scenario) * 30
        assert!((rows[0].monthly_forecast - 0.20 * 1.0 * 30.0).abs() < 1e-12);
    }

    #[test]
    fn missing_costs_count_as_zero() {
        let mut r = record("a", 0.0);
        r.response_cost = None;
        let rows = cost_summary(&[r], 1);
        assert_eq!(rows[0].total_cost, 0.0);
    }
}
