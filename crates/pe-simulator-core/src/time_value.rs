use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::SimulatorError;
use crate::types::{with_metadata, ComputationOutput, Money, Multiple, Rate};
use crate::SimulatorResult;

const IRR_TOLERANCE: Decimal = dec!(0.000001);
const MAX_IRR_ITERATIONS: u32 = 100;
const IRR_INITIAL_GUESS: Decimal = dec!(0.10);

/// Result of a Newton-Raphson IRR solve.
///
/// `rate` is always the last estimate, converged or not. Callers that need a
/// convergence guarantee check `converged` or the residual `npv`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IrrEstimate {
    pub rate: Rate,
    pub iterations: u32,
    pub converged: bool,
    /// NPV at `rate`, the residual of the root-find.
    pub npv: Money,
}

/// Net Present Value of a series of annual cash flows (index = year).
pub fn npv(rate: Rate, cash_flows: &[Money]) -> SimulatorResult<Money> {
    if rate <= dec!(-1) {
        return Err(SimulatorError::InvalidInput {
            field: "rate".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }

    npv_with_derivative(rate, cash_flows)
        .map(|(value, _)| value)
        .ok_or_else(|| SimulatorError::DivisionByZero {
            context: "NPV discount factor overflow".into(),
        })
}

/// NPV(r) = Σ cf[t] / (1+r)^t and NPV'(r) = Σ -t·cf[t] / (1+r)^(t+1).
///
/// Returns `None` when 1 + r is not positive or the arithmetic overflows.
fn npv_with_derivative(rate: Rate, cash_flows: &[Money]) -> Option<(Money, Money)> {
    let denom = Decimal::ONE + rate;
    if denom <= Decimal::ZERO {
        return None;
    }

    let mut value = Decimal::ZERO;
    let mut derivative = Decimal::ZERO;
    // 1 / (1+r)^t, built up iteratively
    let mut discount = Decimal::ONE;

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            discount = discount.checked_div(denom)?;
        }
        value = value.checked_add(cf.checked_mul(discount)?)?;
        if t > 0 {
            let term = Decimal::from(t as u64)
                .checked_mul(*cf)?
                .checked_mul(discount)?
                .checked_div(denom)?;
            derivative = derivative.checked_sub(term)?;
        }
    }

    Some((value, derivative))
}

/// Internal Rate of Return using Newton-Raphson.
///
/// Starts at 10% and iterates `r ← r - NPV(r)/NPV'(r)` until |NPV| < 1e-6 or
/// 100 iterations. Stops early, keeping the current estimate, when |NPV'|
/// drops below the tolerance or the discounting overflows. There is no
/// bracketing fallback.
pub fn newton_irr(cash_flows: &[Money]) -> IrrEstimate {
    let mut rate = IRR_INITIAL_GUESS;
    let mut last_npv = Decimal::MAX;

    for i in 0..MAX_IRR_ITERATIONS {
        let Some((value, derivative)) = npv_with_derivative(rate, cash_flows) else {
            return IrrEstimate {
                rate,
                iterations: i,
                converged: false,
                npv: last_npv,
            };
        };
        last_npv = value;

        if value.abs() < IRR_TOLERANCE {
            return IrrEstimate {
                rate,
                iterations: i,
                converged: true,
                npv: value,
            };
        }

        if derivative.abs() < IRR_TOLERANCE {
            return IrrEstimate {
                rate,
                iterations: i,
                converged: false,
                npv: value,
            };
        }

        let Some(step) = value.checked_div(derivative) else {
            break;
        };
        rate -= step;

        // Guard against divergence
        if rate < dec!(-0.99) {
            rate = dec!(-0.99);
        } else if rate > dec!(100.0) {
            rate = dec!(100.0);
        }
    }

    let residual = npv_with_derivative(rate, cash_flows)
        .map(|(value, _)| value)
        .unwrap_or(last_npv);
    IrrEstimate {
        rate,
        iterations: MAX_IRR_ITERATIONS,
        converged: residual.abs() < IRR_TOLERANCE,
        npv: residual,
    }
}

/// Annual cash flows for a standalone IRR solve, index = year.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IrrInput {
    pub cash_flows: Vec<Money>,
}

/// Validate the series and run [`newton_irr`] inside the output envelope.
pub fn solve_irr(input: &IrrInput) -> SimulatorResult<ComputationOutput<IrrEstimate>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.cash_flows.len() < 2 {
        return Err(SimulatorError::InsufficientData(
            "IRR requires at least two cash flows".into(),
        ));
    }
    let has_outflow = input.cash_flows.iter().any(|cf| *cf < Decimal::ZERO);
    let has_inflow = input.cash_flows.iter().any(|cf| *cf > Decimal::ZERO);
    if !(has_outflow && has_inflow) {
        return Err(SimulatorError::InvalidInput {
            field: "cash_flows".into(),
            reason: "IRR requires at least one negative and one positive cash flow".into(),
        });
    }

    let estimate = newton_irr(&input.cash_flows);
    if !estimate.converged {
        warnings.push(format!(
            "IRR did not converge after {} iterations; reporting last estimate",
            estimate.iterations
        ));
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Newton-Raphson IRR on annual cash flows",
        &serde_json::json!({
            "periods": input.cash_flows.len(),
            "initial_guess": IRR_INITIAL_GUESS.to_string(),
            "tolerance": IRR_TOLERANCE.to_string(),
            "max_iterations": MAX_IRR_ITERATIONS,
        }),
        warnings,
        elapsed,
        estimate,
    ))
}

/// Simplified annualized return: (final_value / invested)^(1/years) - 1.
///
/// Returns zero when nothing was invested, the horizon is zero or the value
/// ratio is not positive.
pub fn annualized_return(final_value: Money, invested: Money, years: u32) -> Rate {
    if invested <= Decimal::ZERO || years == 0 {
        return Decimal::ZERO;
    }
    let ratio = final_value / invested;
    if ratio <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let exponent = Decimal::ONE / Decimal::from(years);
    ratio
        .checked_powd(exponent)
        .map(|root| root - Decimal::ONE)
        .unwrap_or(Decimal::ZERO)
}

/// Growth factor (1 + rate)^years for whole-year compounding.
pub fn compound_factor(rate: Rate, years: u32) -> Multiple {
    (Decimal::ONE + rate).powi(years as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_npv_basic() {
        let cfs = vec![dec!(-1000), dec!(300), dec!(400), dec!(500)];
        let result = npv(dec!(0.10), &cfs).unwrap();
        // NPV at 10%: -1000 + 300/1.1 + 400/1.21 + 500/1.331 ≈ -21.04
        assert!((result - dec!(-21.04)).abs() < dec!(1.0));
    }

    #[test]
    fn test_npv_zero_rate() {
        let cfs = vec![dec!(-100), dec!(50), dec!(50), dec!(50)];
        let result = npv(dec!(0.0), &cfs).unwrap();
        assert_eq!(result, dec!(50));
    }

    #[test]
    fn test_npv_rejects_rate_below_minus_one() {
        assert!(npv(dec!(-1), &[dec!(-100), dec!(110)]).is_err());
    }

    #[test]
    fn test_irr_basic() {
        let cfs = vec![dec!(-1000), dec!(400), dec!(400), dec!(400)];
        let result = newton_irr(&cfs);
        // IRR should be ~9.7%
        assert!(result.converged);
        assert!((result.rate - dec!(0.097)).abs() < dec!(0.01));
    }

    #[test]
    fn test_irr_bullet_matches_root_of_multiple() {
        // -C at year 0, C*M at year N => IRR = M^(1/N) - 1
        let mut cfs = vec![Decimal::ZERO; 11];
        cfs[0] = dec!(-100000);
        cfs[10] = dec!(250000);
        let result = newton_irr(&cfs);
        let expected = dec!(2.5).powd(dec!(0.1)) - Decimal::ONE;
        assert!(result.converged);
        assert!(
            (result.rate - expected).abs() < dec!(0.0001),
            "IRR {} vs expected {}",
            result.rate,
            expected
        );
    }

    #[test]
    fn test_irr_residual_within_tolerance() {
        let cfs = vec![dec!(-500), dec!(0), dec!(0), dec!(0), dec!(0), dec!(1000)];
        let result = newton_irr(&cfs);
        assert!(result.npv.abs() < dec!(0.000001));
        assert!((result.rate - dec!(0.1487)).abs() < dec!(0.001));
    }

    #[test]
    fn test_irr_no_sign_change_does_not_panic() {
        // All inflows: no root exists, the solver returns its last estimate
        let cfs = vec![dec!(100), dec!(100), dec!(100)];
        let result = newton_irr(&cfs);
        assert!(!result.converged);
    }

    #[test]
    fn test_irr_all_zero_flows_stops_on_flat_derivative() {
        let cfs = vec![Decimal::ZERO; 5];
        let result = newton_irr(&cfs);
        // NPV is identically zero, so the first evaluation already satisfies the tolerance
        assert!(result.converged);
        assert_eq!(result.rate, dec!(0.10));
    }

    #[test]
    fn test_annualized_return() {
        let r = annualized_return(dec!(200), dec!(100), 1);
        assert_eq!(r, dec!(1));
        let r10 = annualized_return(dec!(250000), dec!(100000), 10);
        assert!((r10 - dec!(0.0959)).abs() < dec!(0.0001));
    }

    #[test]
    fn test_annualized_return_degenerate_inputs() {
        assert_eq!(annualized_return(dec!(100), Decimal::ZERO, 10), Decimal::ZERO);
        assert_eq!(annualized_return(dec!(100), dec!(50), 0), Decimal::ZERO);
        assert_eq!(annualized_return(dec!(-10), dec!(50), 5), Decimal::ZERO);
    }

    #[test]
    fn test_compound_factor() {
        assert_eq!(compound_factor(dec!(0.10), 2), dec!(1.21));
        assert_eq!(compound_factor(dec!(0.15), 0), Decimal::ONE);
    }

    #[test]
    fn test_solve_irr_envelope() {
        let input = IrrInput {
            cash_flows: vec![dec!(-1000), dec!(400), dec!(400), dec!(400)],
        };
        let out = solve_irr(&input).unwrap();
        assert!(out.result.converged);
        assert!((out.result.rate - dec!(0.097)).abs() < dec!(0.001));
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_solve_irr_rejects_single_flow() {
        let input = IrrInput {
            cash_flows: vec![dec!(-1000)],
        };
        assert!(matches!(
            solve_irr(&input),
            Err(SimulatorError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_solve_irr_rejects_one_signed_series() {
        let input = IrrInput {
            cash_flows: vec![dec!(100), dec!(200)],
        };
        assert!(solve_irr(&input).is_err());
    }
}
