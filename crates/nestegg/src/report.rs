//! Plain-text rendering of a simulation result

use std::fmt::Write;

use nestegg_core::SimulationResult;

fn dollars(value: f64) -> String {
    let whole = value.abs().round() as u64;
    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if value < 0.0 && whole > 0 {
        format!("-${grouped}")
    } else {
        format!("${grouped}")
    }
}

fn percent(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

/// Write the headline numbers, percentiles and the first `trace_rows` rows of
/// the first trial's trace
pub fn write_report<W: Write>(
    out: &mut W,
    result: &SimulationResult,
    trace_rows: usize,
) -> std::fmt::Result {
    writeln!(
        out,
        "Retirement simulation ({} trials, seed {})",
        result.num_trials, result.seed
    )?;
    writeln!(out)?;
    writeln!(
        out,
        "  Probability of success:      {}",
        percent(result.probability_of_success)
    )?;
    writeln!(
        out,
        "  Safe withdrawal rate:        {}",
        percent(result.safe_withdrawal_rate)
    )?;
    if let Some(cal) = &result.calibration {
        let note = if cal.feasible {
            format!(
                "{} rounds, {} at the calibrated rate",
                cal.rounds,
                percent(cal.achieved_success)
            )
        } else {
            format!("target {} not reachable", percent(cal.target_success))
        };
        writeln!(out, "    calibration:               {note}")?;
    }
    writeln!(
        out,
        "  Projected at retirement:     {}",
        dollars(result.projected_retirement_portfolio)
    )?;
    writeln!(
        out,
        "  Legacy goal probability:     {}",
        percent(result.legacy_goal_probability)
    )?;
    if let Some(years) = result.median_years_until_depletion {
        writeln!(out, "  Median years to depletion:   {years}")?;
    }

    let p = &result.ending_balance_percentiles;
    writeln!(out)?;
    writeln!(out, "Ending balance percentiles")?;
    for (label, value) in [
        ("10th", p.p10),
        ("25th", p.p25),
        ("50th", p.p50),
        ("75th", p.p75),
        ("90th", p.p90),
    ] {
        writeln!(out, "  {label:>5}  {:>16}", dollars(value))?;
    }

    if trace_rows > 0 && !result.cash_flows.is_empty() {
        writeln!(out)?;
        writeln!(out, "First trial")?;
        writeln!(
            out,
            "  {:>4} {:>4} {:>16} {:>14} {:>14} {:>8}",
            "year", "age", "balance", "income", "withdrawal", "regime"
        )?;
        for row in result.cash_flows.iter().take(trace_rows) {
            let regime = row
                .market_regime
                .map(|r| format!("{r:?}").to_lowercase())
                .unwrap_or_else(|| "-".to_string());
            writeln!(
                out,
                "  {:>4} {:>4} {:>16} {:>14} {:>14} {:>8}",
                row.year,
                row.age,
                dollars(row.portfolio_balance),
                dollars(row.guaranteed_income),
                dollars(row.withdrawal),
                regime
            )?;
        }
    }
    Ok(())
}
