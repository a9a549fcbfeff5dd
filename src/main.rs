//! `snek [code] [args...]`
//!
//! Prints the argument list and runs the first argument as a snippet of
//! Python-flavoured code. The code runs with no restriction: anyone who can
//! pass arguments to this program can make it do anything the interpreter
//! can do.
#[macro_use]
extern crate log;
#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate failure;
#[macro_use]
extern crate pest_derive;

mod ast;
mod builtins;
mod dirs;
mod eval;
mod exception;
mod exec;
mod format;
mod interpreter;
mod layout;
mod logger;
mod methods;
mod modules;
mod oops;
mod ops;
mod parser;
mod value;

use crate::value::Value;
use std::io::{self, BufWriter};
use structopt::clap::AppSettings;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "snek",
    setting = AppSettings::TrailingVarArg,
    setting = AppSettings::AllowLeadingHyphen,
    setting = AppSettings::DisableHelpFlags,
    setting = AppSettings::DisableVersion
)]
struct Opt {
    /// The code to run.
    code: Option<String>,
    /// Passed through to `sys.argv`.
    args: Vec<String>,
}

/// The code is the first argument after the program name, verbatim. The
/// rest only show up in `sys.argv`.
fn code_argument(argv: &[String]) -> Option<String> {
    // clap takes a leading `--` as the end of options, not as code.
    if argv.get(1).map(String::as_str) == Some("--") {
        return Some("--".to_owned());
    }

    match Opt::from_iter_safe(argv) {
        Ok(opt) => {
            debug!("{} argument(s) after the code", opt.args.len());
            opt.code
        }
        Err(err) => {
            debug!("argument parsing: {}", err);
            argv.get(1).cloned()
        }
    }
}

fn main() {
    // The program works without a log file.
    logger::install_logger("snek").ok();

    let argv: Vec<String> = std::env::args_os()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();
    trace!("argv: {:?}", argv);

    let shown = Value::list(argv.iter().map(|arg| Value::from(arg.as_str())).collect());
    println!("sys.argv: {}", shown.repr());

    let code = match code_argument(&argv) {
        Some(code) => code,
        None => {
            println!("No code provided.");
            return;
        }
    };

    let result = exec::spawn(move || {
        let stdout = io::stdout();
        let mut out = BufWriter::new(stdout.lock());
        exec::exec(&code, &argv, &mut out)
    })
    .and_then(|result| result);

    if let Err(err) = result {
        println!("Error: {}", err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn args(args: &[&str]) -> Vec<String> {
        args.iter().map(|arg| arg.to_string()).collect()
    }

    #[test]
    fn picks_the_first_argument() {
        assert_eq!(code_argument(&args(&["snek"])), None);
        assert_eq!(
            code_argument(&args(&["snek", "print(1)", "a", "b"])),
            Some("print(1)".to_owned())
        );
        assert_eq!(code_argument(&args(&["snek", "-x"])), Some("-x".to_owned()));
        assert_eq!(code_argument(&args(&["snek", "--help"])), Some("--help".to_owned()));
        assert_eq!(code_argument(&args(&["snek", "--", "x"])), Some("--".to_owned()));
        assert_eq!(code_argument(&args(&["snek", ""])), Some("".to_owned()));
        assert_eq!(
            code_argument(&args(&["snek", "x", "--", "-v"])),
            Some("x".to_owned())
        );
    }

    #[test]
    fn options_are_not_interpreted() {
        let opt = Opt::from_iter_safe(&args(&["snek", "-V", "--version", "-h"])).unwrap();
        assert_eq!(opt.code.as_deref(), Some("-V"));
        assert_eq!(opt.args, args(&["--version", "-h"]));
    }
}
