//! Command line front end for type1-fonts
//!
//! Assembles, disassembles and converts Type 1 fonts. Input is read from a
//! file or stdin and output written to a file or stdout; `-` names the
//! standard streams explicitly.

use std::{
    fs::File,
    io::{self, BufRead, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
    process::ExitCode,
};

use clap::Parser;
use type1_fonts::{Error, Format, Options, Report};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Log what is being done
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(clap::Args, Debug)]
struct Files {
    /// The input font or text file (default: stdin)
    input: Option<PathBuf>,

    /// The output file (default: stdout)
    output: Option<PathBuf>,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Assemble a disassembled font into PFB or PFA
    Asm {
        /// Write a PFA (hex) font instead of PFB
        #[arg(short = 'a', long)]
        pfa: bool,
        /// Maximum PFB block length
        #[arg(short, long, default_value_t = type1_fonts::MAX_BLOCK_LEN)]
        block_length: usize,
        /// Hex digits per line of PFA output
        #[arg(short, long, default_value_t = type1_fonts::DEFAULT_LINE_LEN)]
        line_length: usize,
        /// Number of random bytes before each charstring, ignoring /lenIV
        #[arg(long = "lenIV")]
        len_iv: Option<u32>,
        #[command(flatten)]
        files: Files,
    },
    /// Disassemble a PFB or PFA font into text
    Disasm {
        /// Number of random bytes before each charstring, ignoring /lenIV
        #[arg(long = "lenIV")]
        len_iv: Option<u32>,
        #[command(flatten)]
        files: Files,
    },
    /// Convert a PFB or PFA font to PFA
    Ascii {
        /// Hex digits per line of output
        #[arg(short, long, default_value_t = type1_fonts::DEFAULT_LINE_LEN)]
        line_length: usize,
        #[command(flatten)]
        files: Files,
    },
    /// Convert a PFB or PFA font to PFB
    Binary {
        /// Maximum PFB block length
        #[arg(short, long, default_value_t = type1_fonts::MAX_BLOCK_LEN)]
        block_length: usize,
        #[command(flatten)]
        files: Files,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();
    let default_level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match run(args.command) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("t1tool: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Runs a command; returns `false` if the input was damaged.
fn run(command: Command) -> Result<bool, Error> {
    let (files, options, action) = match command {
        Command::Asm {
            pfa,
            block_length,
            line_length,
            len_iv,
            files,
        } => {
            let options = Options {
                format: if pfa { Format::Pfa } else { Format::Pfb },
                block_len: block_length,
                line_len: line_length,
                len_iv,
            };
            (files, options, Action::Assemble)
        }
        Command::Disasm { len_iv, files } => {
            let options = Options {
                len_iv,
                ..Default::default()
            };
            (files, options, Action::Disassemble)
        }
        Command::Ascii { line_length, files } => {
            let options = Options {
                format: Format::Pfa,
                line_len: line_length,
                ..Default::default()
            };
            (files, options, Action::Convert)
        }
        Command::Binary {
            block_length,
            files,
        } => {
            let options = Options {
                format: Format::Pfb,
                block_len: block_length,
                ..Default::default()
            };
            (files, options, Action::Convert)
        }
    };
    let input = open_input(files.input.as_deref())?;
    let output = open_output(files.output.as_deref())?;
    let report = match action {
        Action::Assemble => type1_fonts::assemble(input, output, &options)?,
        Action::Disassemble => type1_fonts::disassemble(input, output, &options)?,
        Action::Convert => type1_fonts::convert(input, output, &options)?,
    };
    log::debug!("{report:?}");
    Ok(succeeded(action, &report))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Action {
    Assemble,
    Disassemble,
    Convert,
}

fn succeeded(action: Action, report: &Report) -> bool {
    if action == Action::Convert && !report.looks_like_font() {
        log::error!("no binary blocks written! Are you sure this was a font?");
        return false;
    }
    report.is_ok()
}

fn is_stdio(path: &Path) -> bool {
    path == Path::new("-")
}

fn open_input(path: Option<&Path>) -> io::Result<Box<dyn BufRead>> {
    match path {
        Some(path) if !is_stdio(path) => Ok(Box::new(BufReader::new(File::open(path)?))),
        _ => Ok(Box::new(io::stdin().lock())),
    }
}

fn open_output(path: Option<&Path>) -> io::Result<Box<dyn Write>> {
    match path {
        Some(path) if !is_stdio(path) => Ok(Box::new(BufWriter::new(File::create(path)?))),
        _ => Ok(Box::new(BufWriter::new(io::stdout().lock()))),
    }
}
