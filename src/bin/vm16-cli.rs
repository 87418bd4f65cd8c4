//! Interactive front end: loads a program image, replays the session
//! log, and drives the machine against stdin/stdout.

use clap::Parser;
use serde::Serialize;
use std::error::Error;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use vm16_core::{ExecContext, Machine, SessionLog, StepOutcome, TraceSink};

#[derive(Parser, Debug)]
#[command(
    name = "vm16-cli",
    about = "Run a 16-bit-word program image with line input and replayable sessions."
)]
struct Args {
    /// Program image to load (little-endian 16-bit words).
    image: PathBuf,

    /// Session log used to replay previously accepted input lines.
    #[arg(long, value_name = "PATH", default_value = "session.log")]
    session_log: PathBuf,

    /// Skip replaying the session log even when it exists.
    #[arg(long, default_value_t = false)]
    no_replay: bool,

    /// Path for the per-instruction trace once debug assist is activated.
    #[arg(long, value_name = "PATH", default_value = "trace.log")]
    trace_path: PathBuf,

    /// Stop after this many executed instructions (0 = unlimited).
    #[arg(long, default_value_t = 0)]
    max_steps: u64,

    /// Dump a JSON summary of the final machine state to this path.
    #[arg(long, value_name = "PATH")]
    dump_state: Option<PathBuf>,
}

#[derive(Serialize)]
struct StateDump {
    executed: u64,
    pointer: u16,
    halted: bool,
    registers: Vec<u16>,
    stack: Vec<u16>,
    pending_input: usize,
}

/// One line from stdin with its terminator stripped; `None` on EOF.
fn read_line() -> io::Result<Option<String>> {
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    Ok(Some(line))
}

fn dump_state(path: &Path, machine: &Machine) -> Result<(), Box<dyn Error>> {
    let dump = StateDump {
        executed: machine.executed(),
        pointer: machine.state().pointer(),
        halted: machine.state().is_halted(),
        registers: machine.state().registers().to_vec(),
        stack: machine.state().stack().to_vec(),
        pending_input: machine.pending_input(),
    };
    fs::write(path, serde_json::to_vec_pretty(&dump)?)?;
    eprintln!("[vm] state dumped to {}", path.display());
    Ok(())
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let image = fs::read(&args.image)?;
    let mut machine = Machine::from_image_bytes(&image);
    eprintln!(
        "[image] {} ({} bytes, {} words)",
        args.image.display(),
        image.len(),
        machine.memory().len()
    );

    let mut session = SessionLog::new(args.session_log);
    if !args.no_replay {
        let lines = session.load()?;
        if !lines.is_empty() {
            eprintln!("[session] replaying {} lines", lines.len());
            for line in &lines {
                machine.feed_line(line);
            }
        }
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut trace: Option<TraceSink> = None;

    loop {
        if args.max_steps != 0 && machine.executed() >= args.max_steps {
            eprintln!("[vm] step budget exhausted after {} instructions", machine.executed());
            break;
        }
        let mut ctx = ExecContext {
            output: &mut out,
            trace: trace.as_mut(),
        };
        match machine.step(&mut ctx) {
            Ok(StepOutcome::Running) => {}
            Ok(StepOutcome::Halted) => {
                out.flush()?;
                eprintln!("[vm] halted after {} instructions", machine.executed());
                break;
            }
            Ok(StepOutcome::AwaitingInput) => {
                out.flush()?;
                let Some(line) = read_line()? else {
                    eprintln!("[vm] end of input while the machine awaits a line");
                    break;
                };
                match line.as_str() {
                    "save" => {
                        let written = session.persist()?;
                        eprintln!(
                            "[session] saved {written} lines to {}",
                            session.path().display()
                        );
                    }
                    "hack" => {
                        machine.set_register(7, 1);
                        if trace.is_none() {
                            trace = Some(TraceSink::create(&args.trace_path)?);
                        }
                        eprintln!(
                            "[debug] register 7 set, tracing to {}",
                            args.trace_path.display()
                        );
                    }
                    _ => {
                        if let Some(sink) = trace.as_mut() {
                            sink.record_line(&line)?;
                        }
                        session.record(&line);
                        machine.feed_line(&line);
                    }
                }
            }
            Err(err) => {
                out.flush()?;
                if let Some(sink) = trace.take() {
                    sink.finish()?;
                }
                return Err(err.into());
            }
        }
    }

    if let Some(sink) = trace.take() {
        eprintln!("[debug] {} trace records written", sink.records());
        sink.finish()?;
    }
    if let Some(path) = args.dump_state.as_ref() {
        dump_state(path, &machine)?;
    }
    Ok(())
}

fn main() {
    let args = Args::parse();
    if let Err(err) = run(args) {
        eprintln!("[vm] fatal: {err}");
        std::process::exit(1);
    }
}
