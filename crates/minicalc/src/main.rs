use std::io::{self, BufRead, Write};
use std::process;

use minicalc::{BANNER, PROMPT, Session};

fn main() {
    let mut quiet = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--quiet" | "-q" => quiet = true,
            "--help" | "-h" => {
                println!("Usage: minicalc [--quiet]");
                println!();
                println!("Reads one definition or call per line from stdin.");
                println!("  --quiet    Do not print the banner or the prompt");
                return;
            }
            other => {
                eprintln!("error: unknown argument: {other}");
                process::exit(2);
            }
        }
    }

    if let Err(e) = run(quiet) {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn run(quiet: bool) -> io::Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut session = Session::new();

    if !quiet {
        writeln!(stdout, "{BANNER}")?;
    }

    let mut lines = stdin.lock().lines();
    loop {
        if !quiet {
            write!(stdout, "{PROMPT}")?;
            stdout.flush()?;
        }

        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        let line = line.trim_end_matches('\r');
        if line.trim() == "exit" {
            break;
        }

        match session.handle_line(line) {
            Ok(Some(message)) => {
                writeln!(stdout, "{message}")?;
                stdout.flush()?;
            }
            Ok(None) => {}
            Err(e) => eprintln!("{e}"),
        }
    }
    Ok(())
}
