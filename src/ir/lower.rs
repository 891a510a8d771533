use crate::error::{line_column, CompileError, CompileResult};
use crate::frontend::ast;
use crate::ir::{BinaryOp, Ir, Statement, StmtId, StmtKind, UnaryOp};
use crate::options::Options;
use rustc_hash::FxHashMap;

struct Context<'a> {
    source: &'a str,
    options: &'a Options,
    locals: FxHashMap<String, StmtId>,
    ir: Ir,
}

impl<'a> Context<'a> {
    fn new(source: &'a str, options: &'a Options) -> Self {
        Self {
            source,
            options,
            locals: FxHashMap::default(),
            ir: Ir::new(),
        }
    }

    fn emit(&mut self, kind: StmtKind, dim: usize) -> StmtId {
        self.ir.push(Statement::new(kind, dim))
    }

    fn dim(&self, id: StmtId) -> usize {
        self.ir.get(id).dim
    }

    fn name_error(&self, name: &ast::Name) -> CompileError {
        let (line, column) = line_column(self.source, name.span.start);
        CompileError::Name {
            name: name.name.clone(),
            position: name.span.start,
            line,
            column,
        }
    }
}

/// Lower a parsed program into the initial IR, resolving every name against
/// the locals bound so far and the declarations in `options`.
pub fn lower(source: &str, prog: &ast::Program, options: &Options) -> CompileResult<Ir> {
    let mut ctx = Context::new(source, options);

    for stmt in &prog.statements {
        lower_statement(&mut ctx, stmt)?;
    }

    Ok(ctx.ir)
}

fn lower_statement(ctx: &mut Context, stmt: &ast::Statement) -> CompileResult<()> {
    match stmt {
        ast::Statement::Let { name, value } => {
            let value = lower_expression(ctx, value)?;
            ctx.locals.insert(name.clone(), value);
        }

        ast::Statement::Assign { target, value } => {
            let value = lower_expression(ctx, value)?;

            // Rebinding a local emits nothing, later uses see the new value
            if target.scope == ast::Scope::Any && ctx.locals.contains_key(&target.name) {
                if target.channel.is_some() {
                    return Err(CompileError::dimension(format!(
                        "cannot assign to a single channel of local `{}`",
                        target.name
                    )));
                }
                ctx.locals.insert(target.name.clone(), value);
                return Ok(());
            }

            let declared = match target.scope {
                ast::Scope::Param => None,
                _ => ctx.options.symbol_dim(&target.name),
            };
            let Some(symbol_dim) = declared else {
                return Err(ctx.name_error(target));
            };

            check_channel(target, symbol_dim)?;
            let width = if target.channel.is_some() { 1 } else { symbol_dim };
            let value_dim = ctx.dim(value);
            if value_dim != width && value_dim != 1 {
                return Err(CompileError::dimension(format!(
                    "cannot assign a {}-channel value to `{}` which has {} channel(s)",
                    value_dim, target.name, width
                )));
            }

            ctx.emit(
                StmtKind::Assign {
                    name: target.name.clone(),
                    channel: target.channel,
                    src: value,
                },
                width,
            );
        }
    }
    Ok(())
}

fn lower_expression(ctx: &mut Context, expr: &ast::Expr) -> CompileResult<StmtId> {
    match expr {
        ast::Expr::Number { value } => Ok(ctx.emit(StmtKind::Literal { value: *value }, 1)),

        ast::Expr::Name(name) => resolve_name(ctx, name),

        ast::Expr::Unary { op, operand } => {
            let src = lower_expression(ctx, operand)?;
            match op {
                ast::UnaryOp::Pos => Ok(src),
                ast::UnaryOp::Neg => {
                    let dim = ctx.dim(src);
                    Ok(ctx.emit(StmtKind::UnaryOp { op: UnaryOp::Neg, src }, dim))
                }
            }
        }

        ast::Expr::Binary { op, left, right } => {
            let lhs = lower_expression(ctx, left)?;
            let rhs = lower_expression(ctx, right)?;

            let ir_op = match op {
                ast::BinaryOp::Add => BinaryOp::Add,
                ast::BinaryOp::Sub => BinaryOp::Sub,
                ast::BinaryOp::Mul => BinaryOp::Mul,
                ast::BinaryOp::Div => BinaryOp::Div,
                ast::BinaryOp::Mod => BinaryOp::Mod,
            };

            let dim = broadcast(ctx.dim(lhs), ctx.dim(rhs), ir_op.mnemonic())?;
            Ok(ctx.emit(StmtKind::BinaryOp { op: ir_op, lhs, rhs }, dim))
        }

        ast::Expr::FnCall { name, args, .. } => {
            let mut arg_ids = Vec::new();
            for arg in args {
                arg_ids.push(lower_expression(ctx, arg)?);
            }

            if let Some(width) = pack_width(name) {
                if arg_ids.len() != width {
                    return Err(CompileError::UnknownFunction {
                        name: name.clone(),
                        args: arg_ids.len(),
                    });
                }
                if let Some(&wide) = arg_ids.iter().find(|&&a| ctx.dim(a) != 1) {
                    return Err(CompileError::dimension(format!(
                        "`{}` takes scalars, got a {}-channel argument",
                        name,
                        ctx.dim(wide)
                    )));
                }
                return Ok(ctx.emit(StmtKind::Pack { args: arg_ids }, width));
            }

            // Math functions work channel by channel
            let mut dim = 1;
            for &arg in &arg_ids {
                dim = broadcast(dim, ctx.dim(arg), name)?;
            }
            Ok(ctx.emit(StmtKind::FunctionCall { name: name.clone(), args: arg_ids }, dim))
        }
    }
}

fn resolve_name(ctx: &mut Context, name: &ast::Name) -> CompileResult<StmtId> {
    if name.scope == ast::Scope::Any {
        if let Some(&local) = ctx.locals.get(&name.name) {
            let dim = ctx.dim(local);
            check_channel(name, dim)?;
            return Ok(match name.channel {
                Some(channel) if dim > 1 => ctx.emit(StmtKind::Component { src: local, channel }, 1),
                _ => local,
            });
        }
    }

    if name.scope != ast::Scope::Param {
        if let Some(dim) = ctx.options.symbol_dim(&name.name) {
            check_channel(name, dim)?;
            let kind = StmtKind::SymbolRef { name: name.name.clone(), channel: name.channel };
            return Ok(ctx.emit(kind, width_of(name, dim)));
        }
    }

    if name.scope != ast::Scope::Symbol {
        if let Some(dim) = ctx.options.param_dim(&name.name) {
            check_channel(name, dim)?;
            let kind = StmtKind::ParamRef { name: name.name.clone(), channel: name.channel };
            return Ok(ctx.emit(kind, width_of(name, dim)));
        }
    }

    Err(ctx.name_error(name))
}

fn width_of(name: &ast::Name, dim: usize) -> usize {
    if name.channel.is_some() { 1 } else { dim }
}

fn check_channel(name: &ast::Name, dim: usize) -> CompileResult<()> {
    match name.channel {
        Some(channel) if channel >= dim => Err(CompileError::dimension(format!(
            "`{}` has {} channel(s), channel {} is out of range",
            name.name, dim, channel
        ))),
        _ => Ok(()),
    }
}

/// Width of an elementwise operation on operands of width `a` and `b`.
pub(crate) fn broadcast(a: usize, b: usize, what: &str) -> CompileResult<usize> {
    if a == b || b == 1 {
        Ok(a)
    } else if a == 1 {
        Ok(b)
    } else {
        Err(CompileError::dimension(format!(
            "mismatched widths {} and {} in `{}`",
            a, b, what
        )))
    }
}

fn pack_width(name: &str) -> Option<usize> {
    match name {
        "vec2" => Some(2),
        "vec3" => Some(3),
        "vec4" => Some(4),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::parser;

    fn lower_src(src: &str, options: &Options) -> CompileResult<Ir> {
        lower(src, &parser::parse(src)?, options)
    }

    fn options() -> Options {
        Options::for_x64()
            .with_symbol("x", 1)
            .with_symbol("y", 1)
            .with_symbol("pos", 3)
            .with_param("dt", 1)
    }

    #[test]
    fn test_end_to_end_shape() {
        let ir = lower_src("y = sin(x) * 2", &options()).unwrap();
        assert_eq!(ir.to_string(), "%0:1 @x\n%1:1 sin(%0)\n%2:1 2\n%3:1 mul %1 %2\n%4:1 @y = %3\n");
    }

    #[test]
    fn test_locals_are_shared_not_copied() {
        let ir = lower_src("let t = x * x\ny = t + t", &options()).unwrap();
        // x, x, mul, add, assign
        assert_eq!(ir.len(), 5);
        assert_eq!(
            ir.get(StmtId(3)).kind,
            StmtKind::BinaryOp { op: BinaryOp::Add, lhs: StmtId(2), rhs: StmtId(2) }
        );
    }

    #[test]
    fn test_local_rebinding_and_channels() {
        let ir = lower_src("let v = pos * dt\nv = v + 1\ny = v.z", &options()).unwrap();
        let last = ir.len() - 1;
        let StmtKind::Assign { src, .. } = ir.get(StmtId(last)).kind else {
            panic!("expected an assignment");
        };
        assert_eq!(ir.get(src).kind, StmtKind::Component { src: StmtId(src.0 - 1), channel: 2 });
        assert_eq!(ir.get(StmtId(src.0 - 1)).dim, 3);
    }

    #[test]
    fn test_name_errors() {
        let err = lower_src("y = x + nope", &options()).unwrap_err();
        assert!(matches!(&err, CompileError::Name { name, column: 9, .. } if name == "nope"), "{err:?}");

        // parameters are read-only, `@dt` is not a symbol
        assert!(matches!(lower_src("dt = 1", &options()), Err(CompileError::Name { .. })));
        assert!(matches!(lower_src("y = @dt", &options()), Err(CompileError::Name { .. })));
        assert!(lower_src("y = $dt", &options()).is_ok());
    }

    #[test]
    fn test_dimension_errors() {
        let opts = options().with_symbol("uv", 2);
        assert!(matches!(lower_src("pos = uv", &opts), Err(CompileError::Dimension { .. })));
        assert!(matches!(lower_src("y = pos + uv", &opts), Err(CompileError::Dimension { .. })));
        assert!(matches!(lower_src("y = uv.z", &opts), Err(CompileError::Dimension { .. })));
        assert!(matches!(lower_src("y = pos", &opts), Err(CompileError::Dimension { .. })));
        assert!(lower_src("pos = vec3(x, 1, uv.y)\npos.x = 2\npos = x", &opts).is_ok());
    }
}
