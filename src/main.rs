use std::fmt::Display;
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;

use clap::error::ErrorKind;
use clap::{Error, Parser};
use log::{error, info};
use serde_json::json;

use symtree::{CraneliftCompiler, Expression, Inputs, JitConf, OptLevel, SymResult};

const RASTRIGIN: &str =
    "(+ 20 (pow x 2) (* -10 (cos (* 2 pi x))) (pow y 2) (* -10 (cos (* 2 pi y))))";

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> SymResult<()> {
    let mut expr: Expression = cli.expr.parse()?;
    info!("Parsed {expr}");
    if cli.expand {
        expr.expand()?;
    }
    if cli.simplify {
        expr.simplify()?;
    }
    let slots = expr.put_indexes();

    if cli.json {
        let doc = json!({ "expression": expr, "infix": expr.to_string(), "slots": slots });
        println!("{}", serde_json::to_string_pretty(&doc)?);
    } else {
        println!("{expr}");
        for (name, slot) in &slots.reals {
            println!("  real {name} -> {slot}");
        }
        for (name, slot) in &slots.ints {
            println!("  int  {name} -> {slot}");
        }
        for (name, slot) in &slots.bools {
            println!("  bool {name} -> {slot}");
        }
    }

    if cli.emit_code {
        match &cli.code_file {
            Some(path) => {
                expr.save_c_code(path)?;
                info!("Wrote generated code to {}", path.display());
            }
            None => print!("{}", expr.c_code()?),
        }
    }

    if cli.reals.is_empty() && cli.ints.is_empty() && cli.bools.is_empty() {
        return Ok(());
    }
    let inputs = Inputs::new(&cli.bools, &cli.ints, &cli.reals);
    let value = match cli.backend {
        Backend::Eval => expr.evaluate(&inputs)?,
        Backend::Lambdify => expr.lambdify()?.call(&inputs)?,
        Backend::Jit => {
            let conf = JitConf::builder()
                .opt_level(cli.opt_level)
                .verify(cli.verify)
                .build();
            expr.compile_with(&CraneliftCompiler::new(conf))?
                .call(&inputs)?
        }
    };
    println!("{} = {value}", cli.backend);
    Ok(())
}

#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Expression as an s-expression
    #[arg(long, default_value = RASTRIGIN)]
    expr: String,

    /// Simplify before anything else
    #[arg(long, default_value_t = false)]
    simplify: bool,

    /// Expand products and powers, runs before simplification
    #[arg(long, default_value_t = false)]
    expand: bool,

    /// Print the generated scalar program
    #[arg(long, default_value_t = false)]
    emit_code: bool,

    /// Write the generated program to this file instead of stdout
    #[arg(long)]
    code_file: Option<PathBuf>,

    /// Print the expression and slot tables as JSON
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Real inputs in slot order
    #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
    reals: Vec<f64>,

    /// Integer inputs in slot order
    #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
    ints: Vec<i64>,

    /// Boolean inputs in slot order
    #[arg(long, value_delimiter = ',')]
    bools: Vec<bool>,

    /// How to evaluate
    #[arg(long, default_value_t = Backend::Eval)]
    backend: Backend,

    /// Cranelift optimization level
    #[arg(long, default_value_t = OptLevel::Speed)]
    opt_level: OptLevel,

    /// Run the Cranelift verifier
    #[arg(long, default_value_t = false)]
    verify: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Backend {
    Eval,
    Lambdify,
    Jit,
}

impl Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Eval => write!(f, "eval"),
            Self::Lambdify => write!(f, "lambdify"),
            Self::Jit => write!(f, "jit"),
        }
    }
}

impl FromStr for Backend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "eval" => Ok(Self::Eval),
            "lambdify" => Ok(Self::Lambdify),
            "jit" => Ok(Self::Jit),
            _ => Err(Error::new(ErrorKind::InvalidValue)),
        }
    }
}
