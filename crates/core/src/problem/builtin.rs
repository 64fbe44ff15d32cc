//! Standard benchmark functions.
//!
//! - [`Zdt1`] — two objectives, convex front, `n` real variables in `[0, 1]`
//! - [`Dtlz2`] — `m` objectives, spherical front, `n` real variables in `[0, 1]`
//! - [`Ctp1`] — two objectives and two constraints, two variables

use std::f64::consts::FRAC_PI_2;

use crate::Element;

use super::{Function, FunctionError};

/// The ZDT1 test function.
#[derive(Debug, Clone, Copy)]
pub struct Zdt1 {
    n: usize,
}

impl Zdt1 {
    /// Creates ZDT1 over `n` decision variables (at least 2).
    #[must_use]
    pub fn new(n: usize) -> Self {
        Self { n: n.max(2) }
    }
}

impl Function for Zdt1 {
    fn name(&self) -> &str {
        "strand::zdt1"
    }

    fn input_len(&self) -> usize {
        self.n
    }

    fn output_len(&self) -> usize {
        2
    }

    #[allow(clippy::cast_precision_loss)]
    fn evaluate(&self, inputs: &[Element], outputs: &mut [Element]) -> Result<(), FunctionError> {
        let x: Vec<f64> = inputs.iter().map(Element::value).collect();
        let f1 = x[0];
        let g = 1.0 + 9.0 * x[1..].iter().sum::<f64>() / (self.n - 1) as f64;
        let f2 = g * (1.0 - (f1 / g).sqrt());

        outputs[0] = Element::Real(f1);
        outputs[1] = Element::Real(f2);
        Ok(())
    }
}

/// The DTLZ2 test function.
#[derive(Debug, Clone, Copy)]
pub struct Dtlz2 {
    n: usize,
    m: usize,
}

impl Dtlz2 {
    /// Creates DTLZ2 with `n` variables and `m` objectives.
    ///
    /// `m` is raised to at least 2 and `n` to at least `m`.
    #[must_use]
    pub fn new(n: usize, m: usize) -> Self {
        let m = m.max(2);
        Self { n: n.max(m), m }
    }
}

impl Function for Dtlz2 {
    fn name(&self) -> &str {
        "strand::dtlz2"
    }

    fn input_len(&self) -> usize {
        self.n
    }

    fn output_len(&self) -> usize {
        self.m
    }

    fn evaluate(&self, inputs: &[Element], outputs: &mut [Element]) -> Result<(), FunctionError> {
        let x: Vec<f64> = inputs.iter().map(Element::value).collect();
        let m = self.m;
        let g: f64 = x[m - 1..].iter().map(|xi| (xi - 0.5).powi(2)).sum();

        for (j, out) in outputs.iter_mut().enumerate() {
            let mut f = 1.0 + g;
            for xi in &x[..m - 1 - j] {
                f *= (xi * FRAC_PI_2).cos();
            }
            if j > 0 {
                f *= (x[m - 1 - j] * FRAC_PI_2).sin();
            }
            *out = Element::Real(f);
        }
        Ok(())
    }
}

/// The CTP1 constrained test function.
///
/// Outputs are `[f1, f2, c1, c2]`. Constraints are written so that a value
/// at or below zero is feasible.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ctp1;

impl Function for Ctp1 {
    fn name(&self) -> &str {
        "strand::ctp1"
    }

    fn input_len(&self) -> usize {
        2
    }

    fn output_len(&self) -> usize {
        4
    }

    fn evaluate(&self, inputs: &[Element], outputs: &mut [Element]) -> Result<(), FunctionError> {
        let f1 = inputs[0].value();
        let g = 1.0 + inputs[1].value();
        let f2 = g * (-f1 / g).exp();

        outputs[0] = Element::Real(f1);
        outputs[1] = Element::Real(f2);
        outputs[2] = Element::Real(0.858 * (-0.541 * f1).exp() - f2);
        outputs[3] = Element::Real(0.728 * (-0.295 * f1).exp() - f2);
        Ok(())
    }
}
