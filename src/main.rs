use std::fs;
use std::path::PathBuf;
use std::process;

use clap::{Parser, ValueEnum};

use zfx::{build_ir, compile_to_assembly, Options};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Target {
    X64,
    Cuda,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Emit {
    Asm,
    Ir,
}

/// Compile a ZFX expression program to register assembly.
#[derive(Debug, Parser)]
#[command(name = "zfxc", version)]
struct Config {
    /// Source file
    source: PathBuf,

    /// Output file, stdout when absent
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// TOML file with compile options, replaces the target preset
    #[arg(long)]
    options: Option<PathBuf>,

    #[arg(long, value_enum, default_value = "x64")]
    target: Target,

    /// Declare a symbol, e.g. `-s pos:3`
    #[arg(short, long = "symbol", value_parser = parse_decl)]
    symbols: Vec<(String, usize)>,

    /// Declare a parameter, e.g. `-p dt:1`
    #[arg(short, long = "param", value_parser = parse_decl)]
    params: Vec<(String, usize)>,

    /// Register budget, 0 for unbounded
    #[arg(long)]
    max_regs: Option<usize>,

    #[arg(long, value_enum, default_value = "asm")]
    emit: Emit,
}

fn parse_decl(arg: &str) -> Result<(String, usize), String> {
    let (name, dim) = arg.split_once(':').unwrap_or((arg, "1"));
    if name.is_empty() {
        return Err(format!("missing name in `{}`", arg));
    }
    let dim = dim.parse().map_err(|_| format!("bad dimension in `{}`", arg))?;
    Ok((name.to_string(), dim))
}

impl Config {
    fn build_options(&self) -> Result<Options, String> {
        let mut options = match &self.options {
            Some(path) => {
                let text = fs::read_to_string(path).map_err(|err| format!("{}: {}", path.display(), err))?;
                toml::from_str(&text).map_err(|err| format!("{}: {}", path.display(), err))?
            }
            None => match self.target {
                Target::X64 => Options::for_x64(),
                Target::Cuda => Options::for_cuda(),
            },
        };

        for (name, dim) in &self.symbols {
            options.define_symbol(name.clone(), *dim);
        }
        for (name, dim) in &self.params {
            options.define_param(name.clone(), *dim);
        }
        if let Some(max_regs) = self.max_regs {
            options.arch_maxregs = max_regs;
        }
        Ok(options)
    }
}

fn main() {
    env_logger::init();

    let config = Config::parse();

    let options = config.build_options().unwrap_or_else(|err| {
        eprintln!("Error loading options: {err}");
        process::exit(1);
    });

    let source_code = fs::read_to_string(&config.source).unwrap_or_else(|err| {
        eprintln!("Error reading source file: {err}");
        process::exit(1);
    });

    let result = match config.emit {
        Emit::Asm => compile_to_assembly(&source_code, &options).map(|program| program.to_string()),
        Emit::Ir => build_ir(&source_code, &options).map(|ir| ir.to_string()),
    };

    let output = result.unwrap_or_else(|err| {
        eprintln!("Error: {err}");
        process::exit(1);
    });

    match &config.output {
        Some(path) => fs::write(path, output).unwrap_or_else(|err| {
            eprintln!("Error writing to destination file: {err}");
            process::exit(1);
        }),
        None => print!("{output}"),
    }
}
