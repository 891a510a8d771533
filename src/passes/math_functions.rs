use std::f32::consts::FRAC_PI_2;

use crate::error::{CompileError, CompileResult};
use crate::ir::visitor::{Pass, Rewriter};
use crate::ir::{BinaryOp, Statement, StmtId, StmtKind, StmtTag};

/// Functions a program may call, with their argument counts.
pub const FUNCTIONS: &[(&str, usize)] = &[("sin", 1), ("cos", 1)];

pub fn check_call(name: &str, args: usize) -> CompileResult<()> {
    if FUNCTIONS.iter().any(|&(known, arity)| known == name && arity == args) {
        Ok(())
    } else {
        Err(CompileError::UnknownFunction { name: name.to_string(), args })
    }
}

/// Rewrites every function call into plain arithmetic.
#[derive(Default)]
pub struct MathFunctions;

impl Pass for MathFunctions {
    const NAME: &'static str = "math_functions";
    const HANDLES: &'static [StmtTag] = &[StmtTag::FunctionCall];

    fn visit<'a>(&mut self, rw: &mut Rewriter<'a>, id: StmtId, stmt: &'a Statement) -> CompileResult<()> {
        let StmtKind::FunctionCall { name, args } = &stmt.kind else {
            return rw.keep(id).map(drop);
        };
        check_call(name, args.len())?;

        let args = args.iter().map(|&a| rw.resolve(a)).collect::<CompileResult<Vec<_>>>()?;
        let mut b = Builder { rw: &mut *rw };

        let result = match name.as_str() {
            "sin" => emit_sin(&mut b, args[0]),
            _ => {
                let half_pi = b.lit(FRAC_PI_2);
                let shifted = b.op(BinaryOp::Add, args[0], half_pi);
                emit_sin(&mut b, shifted)
            }
        };

        rw.mark_replacement(id, result);
        Ok(())
    }
}

struct Builder<'r, 'a> {
    rw: &'r mut Rewriter<'a>,
}

impl Builder<'_, '_> {
    fn lit(&mut self, value: f32) -> StmtId {
        self.rw.emit(StmtKind::Literal { value }, 1)
    }

    fn op(&mut self, op: BinaryOp, lhs: StmtId, rhs: StmtId) -> StmtId {
        let out = self.rw.output();
        let dim = out.get(lhs).dim.max(out.get(rhs).dim);
        self.rw.emit(StmtKind::BinaryOp { op, lhs, rhs }, dim)
    }

    fn mul(&mut self, lhs: StmtId, rhs: StmtId) -> StmtId {
        self.op(BinaryOp::Mul, lhs, rhs)
    }

    fn mul_lit(&mut self, lhs: StmtId, value: f32) -> StmtId {
        let rhs = self.lit(value);
        self.mul(lhs, rhs)
    }
}

/*
 * sin(x), |error| < 1e-4 on [-pi, pi]:
 *
 *   z  = x / 3
 *   s  = z * (1 - z2/6 + z2^2/120 - z2^3/5040 + z2^4/362880)   z2 = z*z
 *   sin(x) = s * (3 - 4*s*s)
 *
 * The polynomial is evaluated as a running term t, each step multiplying in
 * z2 and the next factor 1/20, 1/42, 1/72.
 */
fn emit_sin(b: &mut Builder<'_, '_>, x: StmtId) -> StmtId {
    let three = b.lit(3.0);
    let z = b.op(BinaryOp::Div, x, three);
    let z2 = b.mul(z, z);

    let mut r = b.lit(1.0);
    let mut t = b.mul_lit(z2, 1.0 / 6.0);
    r = b.op(BinaryOp::Sub, r, t);

    for (i, factor) in [1.0 / 20.0, 1.0 / 42.0, 1.0 / 72.0].into_iter().enumerate() {
        let step = b.mul_lit(z2, factor);
        t = b.mul(step, t);
        let op = if i % 2 == 0 { BinaryOp::Add } else { BinaryOp::Sub };
        r = b.op(op, r, t);
    }
    let s = b.mul(r, z);

    // sin(3z) = 3 sin(z) - 4 sin(z)^3
    let s2 = b.mul(s, s);
    let k = b.mul_lit(s2, 4.0);
    let three = b.lit(3.0);
    let k = b.op(BinaryOp::Sub, three, k);
    b.mul(s, k)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::eval::Machine;
    use crate::compiler::{build_ir, compile_to_assembly};
    use crate::options::Options;
    use std::f32::consts::PI;

    fn scalar_options() -> Options {
        Options::for_x64().with_symbol("x", 1).with_symbol("y", 1)
    }

    fn run(source: &str, options: &Options, x: f32) -> f32 {
        let program = compile_to_assembly(source, options).unwrap();
        let mut machine = Machine::new(&program);
        machine.set_symbol("x", &[x]);
        machine.run().unwrap();
        machine.symbol("y")[0]
    }

    fn samples() -> Vec<f32> {
        let mut xs: Vec<f32> = (0..=40).map(|i| -PI + 2.0 * PI * i as f32 / 40.0).collect();
        xs.extend([0.0, PI / 2.0, -PI / 2.0]);
        xs
    }

    #[test]
    fn test_sin_accuracy() {
        let options = scalar_options();
        for x in samples() {
            let y = run("y = sin(x)", &options, x);
            assert!((y - x.sin()).abs() < 1e-4, "sin({x}) = {y}, expected {}", x.sin());
        }
    }

    #[test]
    fn test_cos_accuracy() {
        let options = scalar_options();
        for x in samples() {
            let y = run("y = cos(x)", &options, x);
            assert!((y - x.cos()).abs() < 1e-4, "cos({x}) = {y}, expected {}", x.cos());
        }
    }

    #[test]
    fn test_calls_are_removed() {
        let ir = build_ir("y = sin(x) + cos(x)", &scalar_options()).unwrap();
        assert!(ir.iter().all(|(_, s)| s.kind.tag() != StmtTag::FunctionCall));
    }

    #[test]
    fn test_vector_argument() {
        // lanes are interleaved after scalarization, more than 8 values stay live
        let mut options = Options::for_x64().with_symbol("v", 3);
        options.arch_maxregs = 0;
        let program = compile_to_assembly("v = sin(v)", &options).unwrap();
        let mut machine = Machine::new(&program);
        machine.set_symbol("v", &[0.25, -1.0, 2.0]);
        machine.run().unwrap();
        for (got, x) in machine.symbol("v").iter().zip([0.25f32, -1.0, 2.0]) {
            assert!((got - x.sin()).abs() < 1e-4);
        }
    }

    #[test]
    fn test_unknown_function() {
        let err = build_ir("y = foo(x)", &scalar_options()).unwrap_err();
        assert_eq!(err, CompileError::UnknownFunction { name: "foo".into(), args: 1 });
        assert!(err.to_string().contains("foo"));

        let err = build_ir("y = sin(x, x)", &scalar_options()).unwrap_err();
        assert_eq!(err, CompileError::UnknownFunction { name: "sin".into(), args: 2 });
    }
}
