use clap::Parser;
use pl0mips::{
    analyzer::Analyzer,
    codegen::CodeGenerator,
    errors::{Pl0Error, Pl0Result},
    lexer::Lexer, parser, read,
};
use std::{path::PathBuf, process::exit};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "PL/0 compiler that generates MIPS assembly",
    long_about = "PL/0 compiler that generates MIPS assembly.\n\
                 This compiler takes PL/0 source code and generates MIPS assembly\n\
                 in the dialect accepted by the SPIM simulator. It performs lexical\n\
                 analysis, parsing, semantic analysis and code generation.\n\
                 Example usage:\n\
                 pl0mips input.pl0\n\
                 pl0mips input.pl0 -o program.s -a"
)]
struct Cli {
    /// The path to the file to compile
    path: PathBuf,

    /// Output file path (defaults to out.s in the working directory)
    #[arg(short, long, default_value = "out.s")]
    output: PathBuf,

    /// Print the generated assembly to stdout
    #[arg(short = 'a', long)]
    print_asm: bool,
}

fn compile(input_path: &PathBuf) -> Pl0Result<String> {
    let source = read(input_path)?;
    let lexer = Lexer::new(&source);
    let parser = parser::Parser::new(lexer);
    let analyzer = Analyzer::new(parser);
    let mut codegen = CodeGenerator::new(analyzer);
    codegen.generate()?;
    Ok(codegen.output().to_string())
}

fn main() {
    let args = Cli::parse();

    match compile(&args.path) {
        Ok(asm) => {
            // An empty buffer means a stage failed and already printed its
            // diagnostics; leave no output file behind.
            if asm.is_empty() {
                exit(1);
            }
            if args.print_asm {
                print!("{asm}");
            }
            if let Err(e) = std::fs::write(&args.output, &asm) {
                eprintln!("{}", Pl0Error::FileWriteError(e.to_string()));
                exit(1);
            }
            println!("Successfully compiled to: {}", args.output.display());
        }
        Err(e) => {
            eprintln!("Compilation failed: {}", e);
            exit(1);
        }
    }
}
