//! Reference interpreter for generated assembly, used by tests to check that
//! rewrites preserve what a program computes.

use rustc_hash::FxHashMap;

use crate::program::Program;

pub struct Machine<'a> {
    program: &'a Program,
    registers: FxHashMap<usize, Vec<f32>>,
    symbols: Vec<Vec<f32>>,
    params: Vec<Vec<f32>>,
}

fn reg(token: &str) -> Result<usize, String> {
    token
        .strip_prefix('r')
        .and_then(|n| n.parse().ok())
        .ok_or_else(|| format!("bad register `{}`", token))
}

// `@3.1` -> (3, Some(1)), `@3` -> (3, None)
fn slot(token: &str, sigil: char) -> Result<(usize, Option<usize>), String> {
    let body = token.strip_prefix(sigil).ok_or_else(|| format!("bad slot `{}`", token))?;
    let (id, channel) = match body.split_once('.') {
        Some((id, c)) => (id, Some(c.parse().map_err(|_| format!("bad channel in `{}`", token))?)),
        None => (body, None),
    };
    let id = id.parse().map_err(|_| format!("bad slot id in `{}`", token))?;
    Ok((id, channel))
}

fn lanewise(a: &[f32], b: &[f32], f: impl Fn(f32, f32) -> f32) -> Result<Vec<f32>, String> {
    match (a.len(), b.len()) {
        (x, y) if x == y => Ok(a.iter().zip(b).map(|(&x, &y)| f(x, y)).collect()),
        (1, _) => Ok(b.iter().map(|&y| f(a[0], y)).collect()),
        (_, 1) => Ok(a.iter().map(|&x| f(x, b[0])).collect()),
        (x, y) => Err(format!("width mismatch {} vs {}", x, y)),
    }
}

impl<'a> Machine<'a> {
    pub fn new(program: &'a Program) -> Self {
        let symbols = program.symbols().iter().map(|(_, dim)| vec![0.0; *dim]).collect();
        let mut params: Vec<Vec<f32>> = program.params().iter().map(|(_, dim)| vec![0.0; *dim]).collect();
        for (name, value) in program.constants() {
            if let Some(id) = program.param_id(name, 1) {
                params[id] = vec![*value];
            }
        }
        Self {
            program,
            registers: FxHashMap::default(),
            symbols,
            params,
        }
    }

    pub fn set_symbol(&mut self, name: &str, value: &[f32]) {
        if let Some(id) = self.program.symbol_id(name, value.len()) {
            self.symbols[id] = value.to_vec();
        }
    }

    pub fn set_param(&mut self, name: &str, value: &[f32]) {
        if let Some(id) = self.program.param_id(name, value.len()) {
            self.params[id] = value.to_vec();
        }
    }

    pub fn symbol(&self, name: &str) -> &[f32] {
        let id = self
            .program
            .symbols()
            .iter()
            .position(|(n, _)| n == name)
            .unwrap_or_else(|| panic!("no symbol `{}`", name));
        &self.symbols[id]
    }

    fn read(&self, token: &str) -> Result<Vec<f32>, String> {
        let r = reg(token)?;
        self.registers.get(&r).cloned().ok_or_else(|| format!("read of unset {}", token))
    }

    fn load(table: &[Vec<f32>], id: usize, channel: Option<usize>) -> Result<Vec<f32>, String> {
        let value = table.get(id).ok_or_else(|| format!("no slot {}", id))?;
        match channel {
            Some(c) => value.get(c).map(|&v| vec![v]).ok_or_else(|| format!("no channel {}", c)),
            None => Ok(value.clone()),
        }
    }

    fn step(&mut self, line: &str) -> Result<(), String> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let (op, width) = match tokens[0].split_once('.') {
            Some((op, w)) => (op, w.parse::<usize>().map_err(|_| format!("bad width in `{}`", line))?),
            None => (tokens[0], 1),
        };
        let arg = |i: usize| tokens.get(i).copied().ok_or_else(|| format!("missing operand in `{}`", line));

        let (dest, value) = match op {
            "ldi" => (arg(1)?, vec![arg(2)?.parse::<f32>().map_err(|_| format!("bad literal in `{}`", line))?]),
            "lds" => {
                let (id, channel) = slot(arg(2)?, '@')?;
                (arg(1)?, Self::load(&self.symbols, id, channel)?)
            }
            "ldp" => {
                let (id, channel) = slot(arg(2)?, '$')?;
                (arg(1)?, Self::load(&self.params, id, channel)?)
            }
            "neg" => (arg(1)?, self.read(arg(2)?)?.iter().map(|x| -x).collect::<Vec<f32>>()),
            "add" | "sub" | "mul" | "div" | "mod" => {
                let a = self.read(arg(2)?)?;
                let b = self.read(arg(3)?)?;
                let value = match op {
                    "add" => lanewise(&a, &b, |x, y| x + y)?,
                    "sub" => lanewise(&a, &b, |x, y| x - y)?,
                    "mul" => lanewise(&a, &b, |x, y| x * y)?,
                    "div" => lanewise(&a, &b, |x, y| x / y)?,
                    _ => lanewise(&a, &b, |x, y| x % y)?,
                };
                (arg(1)?, value)
            }
            "call" => {
                let x = self.read(arg(3)?)?;
                let value: Vec<f32> = match arg(1)? {
                    "sin" => x.iter().map(|v| v.sin()).collect(),
                    "cos" => x.iter().map(|v| v.cos()).collect(),
                    other => return Err(format!("unknown function `{}`", other)),
                };
                (arg(2)?, value)
            }
            "ext" => {
                let src = self.read(arg(2)?)?;
                let c: usize = arg(3)?.parse().map_err(|_| format!("bad channel in `{}`", line))?;
                (arg(1)?, vec![*src.get(c).ok_or_else(|| format!("no channel {}", c))?])
            }
            "pack" => {
                let mut value = Vec::new();
                for token in &tokens[2..] {
                    value.extend(self.read(token)?);
                }
                (arg(1)?, value)
            }
            "sts" => {
                let (id, channel) = slot(arg(1)?, '@')?;
                let src = self.read(arg(2)?)?;
                let target = self.symbols.get_mut(id).ok_or_else(|| format!("no symbol {}", id))?;
                match channel {
                    Some(c) => target[c] = src[0],
                    None => {
                        for (i, lane) in target.iter_mut().enumerate().take(width) {
                            *lane = if src.len() == 1 { src[0] } else { src[i] };
                        }
                    }
                }
                return Ok(());
            }
            other => return Err(format!("unknown instruction `{}`", other)),
        };

        self.registers.insert(reg(dest)?, value);
        Ok(())
    }

    pub fn run(&mut self) -> Result<(), String> {
        let program = self.program;
        for line in program.assembly().lines().filter(|l| !l.trim().is_empty()) {
            self.step(line)?;
        }
        Ok(())
    }
}
