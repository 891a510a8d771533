use crate::error::{line_column, CompileError, CompileResult};
use crate::frontend::ast;
use chumsky::error::RichReason;
use chumsky::pratt::*;
use chumsky::prelude::*;
use chumsky::Parser;

pub fn parse(source_code: &str) -> CompileResult<ast::Program> {
    let stripped = strip_comments(source_code);

    let result = parser()
        .parse(stripped.as_str())
        .into_result()
        .map_err(|errs| syntax_error(source_code, &errs[0]));
    result
}

fn syntax_error(source_code: &str, err: &Rich<'_, char>) -> CompileError {
    let position = err.span().start;
    let (line, column) = line_column(source_code, position);

    let message = match err.reason() {
        RichReason::Custom(msg) => msg.to_string(),
        _ => match err.found() {
            Some(c) => format!("unexpected `{}`", c.escape_default()),
            None => "unexpected end of input".to_string(),
        },
    };

    CompileError::Syntax { position, line, column, message }
}

// `#` comments run to the end of the line. Blank them out byte for byte so
// spans still point into the caller's source.
fn strip_comments(source_code: &str) -> String {
    let mut out = String::with_capacity(source_code.len());
    let mut in_comment = false;

    for c in source_code.chars() {
        match c {
            '\n' => {
                in_comment = false;
                out.push(c);
            }
            '#' => {
                in_comment = true;
                out.push(' ');
            }
            _ if in_comment => {
                out.extend(std::iter::repeat(' ').take(c.len_utf8()));
            }
            _ => out.push(c),
        }
    }
    out
}

fn channel_index(c: char) -> usize {
    match c {
        'x' => 0,
        'y' => 1,
        'z' => 2,
        _ => 3,
    }
}

fn parser<'src>() -> impl Parser<'src, &'src str, ast::Program, extra::Err<Rich<'src, char>>> {
    // All of our 'atoms' (identifiers, numbers, symbols) are '.padded()'
    // to ignore whitespace around them.
    let ident = text::ident()
        .try_map(|s: &str, span| match s {
            "let" => Err(Rich::custom(span, "`let` is a keyword and cannot be used as a name")),
            _ => Ok(s.to_string()),
        });

    let op = |c: char| just(c).padded();

    // 1, 0.5, 2.5e-3
    let number = text::int(10)
        .then(just('.').then(text::digits(10)).or_not())
        .then(one_of("eE").then(one_of("+-").or_not()).then(text::digits(10)).or_not())
        .to_slice()
        .try_map(|s: &str, span| match s.parse::<f32>() {
            Ok(value) if value.is_finite() => Ok(value),
            Ok(_) => Err(Rich::custom(span, format!("number `{}` is out of range", s))),
            Err(e) => Err(Rich::custom(span, e)),
        })
        .padded();

    // @pos, $dt, t  with an optional `.x` .. `.w` channel
    let scope = just('@').to(ast::Scope::Symbol)
        .or(just('$').to(ast::Scope::Param))
        .or_not()
        .map(|scope| scope.unwrap_or(ast::Scope::Any));

    let channel = just('.')
        .ignore_then(one_of("xyzw"))
        .map(channel_index)
        .or_not();

    let name = scope
        .then(ident.clone())
        .then(channel)
        .map_with(|((scope, name), channel), e| ast::Name {
            scope,
            name,
            channel,
            span: e.span(),
        })
        .padded();

    /*
     * Expression Parser
     * An atom is a Number, FnCall, Name or parenthesised expression,
     * combined by precedence climbing.
     */
    let expr = recursive(|expr| {
        let fn_call = ident.clone()
            .then(
                expr.clone()
                    .separated_by(op(','))
                    .allow_trailing()
                    .collect()
                    .delimited_by(op('('), op(')')),
            )
            .map_with(|(name, args), e| ast::Expr::FnCall { name, args, span: e.span() })
            .padded();

        let atom = number
            .map(|value| ast::Expr::Number { value })
            .or(fn_call)
            .or(name.clone().map(ast::Expr::Name))
            .or(expr.delimited_by(op('('), op(')')));

        atom.pratt((
            prefix(3, one_of("-+").padded(), |sign: char, operand: ast::Expr, _| {
                let op = if sign == '-' { ast::UnaryOp::Neg } else { ast::UnaryOp::Pos };
                ast::Expr::Unary { op, operand: Box::new(operand) }
            }),
            infix(left(2), one_of("*/%").padded(), |left: ast::Expr, op: char, right: ast::Expr, _| {
                let op = match op {
                    '*' => ast::BinaryOp::Mul,
                    '/' => ast::BinaryOp::Div,
                    _ => ast::BinaryOp::Mod,
                };
                ast::Expr::Binary { op, left: Box::new(left), right: Box::new(right) }
            }),
            infix(left(1), one_of("+-").padded(), |left: ast::Expr, op: char, right: ast::Expr, _| {
                let op = if op == '+' { ast::BinaryOp::Add } else { ast::BinaryOp::Sub };
                ast::Expr::Binary { op, left: Box::new(left), right: Box::new(right) }
            }),
        ))
        .boxed()
    });

    /*
     * Statement Parser
     * A statement is a Let binding or an Assign, optionally ended by ';'
     */
    let let_stmt = text::keyword("let").padded()
        .ignore_then(ident.clone().padded())
        .then_ignore(op('='))
        .then(expr.clone())
        .map(|(name, value)| ast::Statement::Let { name, value });

    let assign_stmt = name
        .then_ignore(op('='))
        .then(expr)
        .map(|(target, value)| ast::Statement::Assign { target, value });

    let statement = let_stmt
        .or(assign_stmt)
        .then_ignore(op(';').or_not());

    /* Program Parser */
    statement
        .padded()
        .repeated()
        .collect()
        .map(|statements| ast::Program { statements })
        .then_ignore(end())
}
