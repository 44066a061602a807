//! Piecewise-linear lookup table.
//!
//! A [`Lut`] is an ordered sequence of control points with precomputed
//! segment slopes. It is built once from its textual specification at
//! configuration time and shared read-only across requests.

use crate::error::ConfigError;

/// One control point with the slope of the segment that starts at it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LutPoint {
    pub input: f64,
    pub output: f64,
    pub slope: f64,
}

/// Piecewise-linear remapping over strictly increasing control inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct Lut {
    points: Vec<LutPoint>,
}

impl Lut {
    /// Build a LUT from comma-separated `input:output` pairs in increasing
    /// input order, e.g. `"0:0,100:200,255:255"`.
    ///
    /// Rejects malformed tokens and repeated or decreasing inputs before
    /// any conversion can run.
    pub fn from_spec(spec: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidLut {
            spec: spec.to_string(),
            reason,
        };

        let mut points: Vec<LutPoint> = Vec::new();
        for token in spec.split(',') {
            let token = token.trim();
            let (input, output) = token
                .split_once(':')
                .ok_or_else(|| invalid(format!("token {:?} is not input:output", token)))?;
            let input: f64 = input
                .trim()
                .parse()
                .map_err(|_| invalid(format!("bad input value in {:?}", token)))?;
            let output: f64 = output
                .trim()
                .parse()
                .map_err(|_| invalid(format!("bad output value in {:?}", token)))?;

            if let Some(last) = points.last() {
                if input <= last.input {
                    return Err(invalid(format!(
                        "input {} does not increase past {}",
                        input, last.input
                    )));
                }
            }
            points.push(LutPoint {
                input,
                output,
                slope: 0.0,
            });
        }

        if points.len() < 2 {
            return Err(invalid("need at least two control points".to_string()));
        }

        // Precompute segment slopes. The +0.5 bias rounds interpolated
        // integer outputs instead of always truncating down; the final
        // slope stays 0 so the mapping saturates past the last point.
        for i in 0..points.len() - 1 {
            let (a, b) = (points[i], points[i + 1]);
            points[i].slope = (b.output + 0.5 - a.output) / (b.input - a.input);
        }

        Ok(Lut { points })
    }

    pub fn points(&self) -> &[LutPoint] {
        &self.points
    }

    /// Remap one sample value.
    ///
    /// Finds the greatest control point not exceeding the value; values
    /// below the first point are governed by the first segment, values at
    /// or past the last point by its zero-slope segment. An exact hit on a
    /// control input returns that point's output directly, keeping control
    /// points exact regardless of the floating path.
    pub fn lookup(&self, value: f64) -> f64 {
        let mut idx = 0;
        for (i, p) in self.points.iter().enumerate() {
            if p.input <= value {
                idx = i;
            } else {
                break;
            }
        }

        let p = self.points[idx];
        if value == p.input {
            return p.output;
        }
        p.output + (value - p.input) * p.slope
    }
}

// =============================================================================
// Tests
// =============================================================================
