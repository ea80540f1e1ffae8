use std::fs::File;
use std::io::{self, Write};
use std::process;

use clap::Parser as ClapParser;
use colored::Colorize;

use idzey::interpreter::Interpreter;
use idzey::source::{parse_source, read_program};

#[derive(ClapParser)]
#[command(name = "idzey", about = "The idzey language interpreter")]
struct Cli {
    /// Program to run (must carry the .idzey suffix)
    file: String,
    /// Redirect program output to this file (truncated on open)
    output: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let source = match read_program(&cli.file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}", e.red());
            process::exit(1);
        }
    };

    let program = match parse_source(&source) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("{}", e.to_string().red());
            process::exit(1);
        }
    };

    let out: Box<dyn Write> = match &cli.output {
        Some(path) => match File::create(path) {
            Ok(f) => Box::new(f),
            Err(e) => {
                eprintln!(
                    "{}",
                    format!("Cannot open file for writing '{}': {}", path, e).red()
                );
                process::exit(1);
            }
        },
        None => Box::new(io::stdout()),
    };

    let mut interp = Interpreter::with_output(out);
    if let Err(e) = interp.run(&program) {
        eprintln!("{}", e.to_string().red());
        process::exit(1);
    }
}
