use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use clap::Parser;

use bfop::machine::{DEFAULT_LIMIT, OutputSink, TraceFrame, TraceHook, run};
use bfop::optimize::{OptLevel, optimize};
use bfop::profile;
use bfop::source::SourceProgram;
use bfop::{decode, encode};

#[derive(Parser, Debug)]
#[command(name = "bfop")]
#[command(about = "An optimizing interpreter and profiler for brainfuck programs")]
struct Args {
    /// Path to the program file to execute
    #[arg(value_name = "FILE", required_unless_present = "eval", conflicts_with = "eval")]
    file: Option<PathBuf>,

    /// Program text given directly on the command line
    #[arg(short, long, value_name = "CODE")]
    eval: Option<String>,

    /// Optimization level (none, basic, heavy)
    #[arg(short, long, default_value_t = OptLevel::Heavy)]
    opt: OptLevel,

    /// Write the optimized opcode stream to FILE.raw instead of running
    #[arg(long, action = clap::ArgAction::SetTrue)]
    compile: bool,

    /// Treat the source as pre-compiled opcode text, skipping the optimizer
    #[arg(long, action = clap::ArgAction::SetTrue)]
    raw: bool,

    /// Stop the run after this many iterations
    #[arg(short, long, default_value_t = DEFAULT_LIMIT)]
    limit: u64,

    /// Print an execution-count report after the run
    #[arg(short, long, action = clap::ArgAction::SetTrue)]
    profile: bool,

    /// Render the tape after every executed instruction
    #[arg(short, long, action = clap::ArgAction::SetTrue)]
    trace: bool,

    /// Milliseconds to sleep between traced steps
    #[arg(long, default_value_t = 0, value_name = "MS")]
    delay: u64,

    /// Disable ANSI colors in the trace renderer
    #[arg(long, action = clap::ArgAction::SetTrue)]
    no_color: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let text = match (&args.file, &args.eval) {
        (Some(path), None) => match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                eprintln!("failed to read {}: {e}", path.display());
                return ExitCode::FAILURE;
            }
        },
        (None, Some(code)) => code.clone(),
        _ => unreachable!(),
    };

    let code = if args.raw {
        match decode(&text) {
            Ok(code) => code,
            Err(e) => {
                eprintln!("decode error: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        optimize(&SourceProgram::filter(&text), args.opt)
    };

    if args.compile {
        let Some(path) = &args.file else {
            eprintln!("--compile needs a file path to derive the output name from");
            return ExitCode::FAILURE;
        };
        let out_path = format!("{}.raw", path.display());
        return match fs::write(&out_path, encode(&code)) {
            Ok(()) => {
                println!("wrote {out_path}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("failed to write {out_path}: {e}");
                ExitCode::FAILURE
            }
        };
    }

    let color = !args.no_color;
    let delay = Duration::from_millis(args.delay);
    let mut hook = move |frame: TraceFrame<'_>| {
        render_frame(&frame, color);
        if !delay.is_zero() {
            thread::sleep(delay);
        }
    };
    let trace: Option<TraceHook<'_>> = if args.trace { Some(&mut hook) } else { None };

    let mut input = StdinInput::new();
    let mut output = StdoutSink::new();
    let result = run(&code, args.limit, &mut input, &mut output, trace);

    // Final state is reported for every halt, fatal ones included.
    println!();
    println!("tape: {:?}", result.tape);
    println!("iterations: {} ({})", result.iterations, result.halt);
    if args.profile {
        let groups = profile::profile(&result.counts, &code, result.iterations);
        print!("{}", profile::render(&groups));
    }

    if result.halt.is_fatal() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

struct StdinInput(io::Bytes<io::Stdin>);

impl StdinInput {
    fn new() -> Self {
        Self(io::stdin().bytes())
    }
}

impl Iterator for StdinInput {
    type Item = i64;

    fn next(&mut self) -> Option<i64> {
        Some(self.0.next()?.ok()? as i64)
    }
}

struct StdoutSink(io::Stdout);

impl StdoutSink {
    fn new() -> Self {
        Self(io::stdout())
    }
}

impl OutputSink for StdoutSink {
    fn emit(&mut self, byte: u8) {
        self.0.write_all(&[byte]).unwrap();
        self.0.flush().unwrap();
    }
}

const RESET: &str = "\x1b[0m";
const CYN: &str = "\x1b[36m";
const INV: &str = "\x1b[7m";

fn render_frame(frame: &TraceFrame<'_>, color: bool) {
    let mut cells = String::new();
    for (i, cell) in frame.tape.iter().enumerate() {
        if i == frame.pointer {
            if color {
                cells.push_str(&format!("{INV}{cell:>4}{RESET}"));
            } else {
                cells.push_str(&format!("[{cell:>4}]"));
            }
        } else {
            cells.push_str(&format!("{cell:>4}"));
        }
        cells.push(' ');
    }
    let token = frame.inst.token();
    if color {
        println!("{:>5}  {CYN}{token:<8}{RESET} {cells}", frame.ip);
    } else {
        println!("{:>5}  {token:<8} {cells}", frame.ip);
    }
}
