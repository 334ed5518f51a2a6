//! Expression-to-program compilation
//!
//! Flattens a node DAG into a linear list of register instructions in
//! dependency order. Every distinct (node, parameter source) pair is emitted
//! exactly once, so shared subgraphs are computed once per sample just like
//! in the memoizing evaluator. Compositions do not get an instruction of
//! their own: the inner program's output register simply becomes the
//! parameter source of the outer program.

use rustc_hash::FxHashMap;

use crate::functions::ElementaryFunction;
use crate::math::{Interval, Matrix};
use crate::node::{NodeKind, NodeRef};

/// Index into the register file; register 0 holds the parameters
pub(crate) type Register = usize;

const PARAMETERS: Register = 0;

#[derive(Debug, Clone)]
pub(crate) enum Instruction {
    Constant {
        values: Vec<f64>,
        bounds: Vec<Interval>,
        out: Register,
    },
    Select {
        source: Register,
        index: usize,
        out: Register,
    },
    Sum {
        lhs: Register,
        rhs: Register,
        out: Register,
    },
    Difference {
        lhs: Register,
        rhs: Register,
        out: Register,
    },
    Product {
        multiplier: Register,
        multiplicand: Register,
        out: Register,
    },
    Quotient {
        dividend: Register,
        divisor: Register,
        out: Register,
    },
    Negate {
        operand: Register,
        out: Register,
    },
    Scale {
        scale: f64,
        operand: Register,
        out: Register,
    },
    Translate {
        operand: Register,
        offset: Vec<f64>,
        out: Register,
    },
    Transform {
        matrix: Matrix<f64>,
        operand: Register,
        out: Register,
    },
    PowerConstant {
        base: Register,
        exponent: f64,
        out: Register,
    },
    Power {
        base: Register,
        exponent: Register,
        out: Register,
    },
    Concatenate {
        first: Register,
        second: Register,
        out: Register,
    },
    Slice {
        operand: Register,
        start: usize,
        count: usize,
        out: Register,
    },
    Dot {
        lhs: Register,
        rhs: Register,
        out: Register,
    },
    Cross {
        lhs: Register,
        rhs: Register,
        out: Register,
    },
    Norm {
        operand: Register,
        out: Register,
    },
    SquaredNorm {
        operand: Register,
        out: Register,
    },
    Normalize {
        operand: Register,
        out: Register,
    },
    Apply {
        function: ElementaryFunction,
        operand: Register,
        out: Register,
    },
}

impl Instruction {
    pub(crate) fn output(&self) -> Register {
        use Instruction::*;
        match self {
            Constant { out, .. }
            | Select { out, .. }
            | Sum { out, .. }
            | Difference { out, .. }
            | Product { out, .. }
            | Quotient { out, .. }
            | Negate { out, .. }
            | Scale { out, .. }
            | Translate { out, .. }
            | Transform { out, .. }
            | PowerConstant { out, .. }
            | Power { out, .. }
            | Concatenate { out, .. }
            | Slice { out, .. }
            | Dot { out, .. }
            | Cross { out, .. }
            | Norm { out, .. }
            | SquaredNorm { out, .. }
            | Normalize { out, .. }
            | Apply { out, .. } => *out,
        }
    }
}

/// An expression compiled to a flat register program.
///
/// Unlike [`Evaluator`](super::Evaluator) it keeps no memo table between
/// calls, which makes it cheap to run over large batches of samples.
#[derive(Debug, Clone)]
pub struct CompiledExpression {
    pub(crate) instructions: Vec<Instruction>,
    pub(crate) register_sizes: Vec<usize>,
    pub(crate) output: Register,
    pub(crate) num_parameters: usize,
    pub(crate) num_dimensions: usize,
}

impl CompiledExpression {
    pub fn compile(node: &NodeRef) -> Self {
        let mut compiler = Compiler {
            instructions: Vec::new(),
            register_sizes: vec![node.num_parameters()],
            memo: FxHashMap::default(),
        };
        let output = compiler.compile(node, PARAMETERS);
        CompiledExpression {
            instructions: compiler.instructions,
            register_sizes: compiler.register_sizes,
            output,
            num_parameters: node.num_parameters(),
            num_dimensions: node.num_dimensions(),
        }
    }

    /// Number of emitted instructions
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn num_registers(&self) -> usize {
        self.register_sizes.len()
    }

    pub fn num_parameters(&self) -> usize {
        self.num_parameters
    }

    pub fn num_dimensions(&self) -> usize {
        self.num_dimensions
    }
}

struct Compiler {
    instructions: Vec<Instruction>,
    register_sizes: Vec<usize>,
    /// (node address, parameter source) -> register holding its value
    memo: FxHashMap<(usize, Register), Register>,
}

impl Compiler {
    fn allocate(&mut self, size: usize) -> Register {
        self.register_sizes.push(size);
        self.register_sizes.len() - 1
    }

    fn compile(&mut self, node: &NodeRef, source: Register) -> Register {
        match node.kind() {
            NodeKind::Identity => return source,
            NodeKind::Parameter { .. } if node.num_parameters() == 1 => return source,
            _ => {}
        }
        let key = (node.address(), source);
        if let Some(&register) = self.memo.get(&key) {
            return register;
        }

        let register = match node.kind() {
            NodeKind::Composition { outer, inner } => {
                let intermediate = self.compile(inner, source);
                self.compile(outer, intermediate)
            }
            _ => {
                let instruction = self.lower(node, source);
                let register = instruction.output();
                self.instructions.push(instruction);
                register
            }
        };
        self.memo.insert(key, register);
        register
    }

    /// Compile the children of `node` and build its instruction
    fn lower(&mut self, node: &NodeRef, source: Register) -> Instruction {
        let dims = node.num_dimensions();
        match node.kind() {
            NodeKind::Constant { values, bounds } => Instruction::Constant {
                values: values.clone(),
                bounds: bounds.clone(),
                out: self.allocate(dims),
            },
            NodeKind::Parameter { index } => Instruction::Select {
                source,
                index: *index,
                out: self.allocate(1),
            },
            NodeKind::Identity | NodeKind::Composition { .. } => unreachable!(),
            NodeKind::Sum(a, b) => {
                let (lhs, rhs) = (self.compile(a, source), self.compile(b, source));
                Instruction::Sum {
                    lhs,
                    rhs,
                    out: self.allocate(dims),
                }
            }
            NodeKind::Difference(a, b) => {
                let (lhs, rhs) = (self.compile(a, source), self.compile(b, source));
                Instruction::Difference {
                    lhs,
                    rhs,
                    out: self.allocate(dims),
                }
            }
            NodeKind::Product {
                multiplier,
                multiplicand,
            } => {
                let multiplier = self.compile(multiplier, source);
                let multiplicand = self.compile(multiplicand, source);
                Instruction::Product {
                    multiplier,
                    multiplicand,
                    out: self.allocate(dims),
                }
            }
            NodeKind::Quotient { dividend, divisor } => {
                let dividend = self.compile(dividend, source);
                let divisor = self.compile(divisor, source);
                Instruction::Quotient {
                    dividend,
                    divisor,
                    out: self.allocate(dims),
                }
            }
            NodeKind::Negated(x) => Instruction::Negate {
                operand: self.compile(x, source),
                out: self.allocate(dims),
            },
            NodeKind::Scaling { scale, operand } => Instruction::Scale {
                scale: *scale,
                operand: self.compile(operand, source),
                out: self.allocate(dims),
            },
            NodeKind::Translation { operand, offset } => Instruction::Translate {
                operand: self.compile(operand, source),
                offset: offset.clone(),
                out: self.allocate(dims),
            },
            NodeKind::Transformation { matrix, operand } => Instruction::Transform {
                matrix: matrix.clone(),
                operand: self.compile(operand, source),
                out: self.allocate(dims),
            },
            NodeKind::Power { base, exponent } => {
                let base = self.compile(base, source);
                match exponent.scalar_value() {
                    Some(exponent) => Instruction::PowerConstant {
                        base,
                        exponent,
                        out: self.allocate(1),
                    },
                    None => Instruction::Power {
                        base,
                        exponent: self.compile(exponent, source),
                        out: self.allocate(1),
                    },
                }
            }
            NodeKind::Concatenation(a, b) => {
                let (first, second) = (self.compile(a, source), self.compile(b, source));
                Instruction::Concatenate {
                    first,
                    second,
                    out: self.allocate(dims),
                }
            }
            NodeKind::Components {
                operand,
                start,
                count,
            } => Instruction::Slice {
                operand: self.compile(operand, source),
                start: *start,
                count: *count,
                out: self.allocate(dims),
            },
            NodeKind::DotProduct(a, b) => {
                let (lhs, rhs) = (self.compile(a, source), self.compile(b, source));
                Instruction::Dot {
                    lhs,
                    rhs,
                    out: self.allocate(1),
                }
            }
            NodeKind::CrossProduct(a, b) => {
                let (lhs, rhs) = (self.compile(a, source), self.compile(b, source));
                Instruction::Cross {
                    lhs,
                    rhs,
                    out: self.allocate(3),
                }
            }
            NodeKind::Norm(x) => Instruction::Norm {
                operand: self.compile(x, source),
                out: self.allocate(1),
            },
            NodeKind::SquaredNorm(x) => Instruction::SquaredNorm {
                operand: self.compile(x, source),
                out: self.allocate(1),
            },
            NodeKind::Normalized(x) => Instruction::Normalize {
                operand: self.compile(x, source),
                out: self.allocate(dims),
            },
            NodeKind::Function { function, operand } => Instruction::Apply {
                function: *function,
                operand: self.compile(operand, source),
                out: self.allocate(1),
            },
        }
    }
}
