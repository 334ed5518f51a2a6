//! Execution of compiled register programs.
//!
//! The register file is allocated once per call and reused for every sample
//! column. Instructions run in emission order, which is a topological order
//! of the source DAG, so every operand register is filled before it is
//! read.

use super::compiler::{CompiledExpression, Instruction};
use super::{cross, dot, squared_norm};
use crate::error::{ExprError, Result};
use crate::math::Matrix;
use crate::traits::{Scalar, as_integer};

impl CompiledExpression {
    /// Run the program on every column of `input`.
    ///
    /// Works for any [`Scalar`] domain, so the same program yields point
    /// values for `Matrix<f64>` and enclosures for `Matrix<Interval>`.
    ///
    /// [`Interval`]: crate::Interval
    pub fn evaluate<T: Scalar>(&self, input: &Matrix<T>) -> Result<Matrix<T>> {
        if input.rows() != self.num_parameters {
            return Err(ExprError::parameters(
                "evaluate",
                self.num_parameters,
                input.rows(),
            ));
        }

        let mut registers: Vec<Vec<T>> = self
            .register_sizes
            .iter()
            .map(|&size| vec![T::zero(); size])
            .collect();
        let mut result = Matrix::zeros(self.num_dimensions, input.cols());

        for col in 0..input.cols() {
            registers[0].copy_from_slice(input.column(col));
            for instruction in &self.instructions {
                let value = execute(instruction, &registers);
                registers[instruction.output()] = value;
            }
            result
                .column_mut(col)
                .copy_from_slice(&registers[self.output]);
        }
        Ok(result)
    }
}

fn execute<T: Scalar>(instruction: &Instruction, registers: &[Vec<T>]) -> Vec<T> {
    let zip = |a: usize, b: usize, f: fn(T, T) -> T| -> Vec<T> {
        registers[a]
            .iter()
            .zip(&registers[b])
            .map(|(&x, &y)| f(x, y))
            .collect()
    };

    match instruction {
        Instruction::Constant { values, bounds, .. } => values
            .iter()
            .zip(bounds)
            .map(|(&value, &bounds)| T::from_constant(value, bounds))
            .collect(),

        Instruction::Select { source, index, .. } => vec![registers[*source][*index]],

        Instruction::Sum { lhs, rhs, .. } => zip(*lhs, *rhs, |x, y| x + y),

        Instruction::Difference { lhs, rhs, .. } => zip(*lhs, *rhs, |x, y| x - y),

        Instruction::Product {
            multiplier,
            multiplicand,
            ..
        } => {
            let m = registers[*multiplier][0];
            registers[*multiplicand].iter().map(|&x| m * x).collect()
        }

        Instruction::Quotient {
            dividend, divisor, ..
        } => {
            let d = registers[*divisor][0];
            registers[*dividend].iter().map(|&x| x / d).collect()
        }

        Instruction::Negate { operand, .. } => registers[*operand].iter().map(|&x| -x).collect(),

        Instruction::Scale { scale, operand, .. } => {
            let scale = T::from_f64(*scale);
            registers[*operand].iter().map(|&x| x * scale).collect()
        }

        Instruction::Translate {
            operand, offset, ..
        } => registers[*operand]
            .iter()
            .zip(offset)
            .map(|(&x, &c)| x + T::from_f64(c))
            .collect(),

        Instruction::Transform {
            matrix, operand, ..
        } => {
            let x = &registers[*operand];
            (0..matrix.rows())
                .map(|row| {
                    (0..matrix.cols()).fold(T::zero(), |acc, col| {
                        acc + T::from_f64(matrix.get(row, col)) * x[col]
                    })
                })
                .collect()
        }

        Instruction::PowerConstant { base, exponent, .. } => {
            let b = registers[*base][0];
            let value = match as_integer(*exponent) {
                Some(n) => b.powi(n),
                None => b.powf(*exponent),
            };
            vec![value]
        }

        Instruction::Power { base, exponent, .. } => {
            vec![registers[*base][0].pow(registers[*exponent][0])]
        }

        Instruction::Concatenate { first, second, .. } => {
            let mut value = registers[*first].clone();
            value.extend_from_slice(&registers[*second]);
            value
        }

        Instruction::Slice {
            operand,
            start,
            count,
            ..
        } => registers[*operand][*start..*start + *count].to_vec(),

        Instruction::Dot { lhs, rhs, .. } => vec![dot(&registers[*lhs], &registers[*rhs])],

        Instruction::Cross { lhs, rhs, .. } => cross(&registers[*lhs], &registers[*rhs]).to_vec(),

        Instruction::Norm { operand, .. } => vec![squared_norm(&registers[*operand]).sqrt()],

        Instruction::SquaredNorm { operand, .. } => vec![squared_norm(&registers[*operand])],

        Instruction::Normalize { operand, .. } => {
            let x = &registers[*operand];
            let length = squared_norm(x).sqrt();
            x.iter().map(|&v| v / length).collect()
        }

        Instruction::Apply {
            function, operand, ..
        } => vec![function.apply(registers[*operand][0])],
    }
}
