//! Log records go to `~/.snek/log/<name>.log`. Stdout belongs to the program
//! being run, so nothing is ever logged there.
use backtrace::Backtrace;
use failure::Error;
use fern::colors::{Color, ColoredLevelConfig};
use log::Record;
use std::thread;

use crate::dirs::log_file_path;

/// `WARN [snek] src/eval.rs:12`: the interpreter runs on its own thread,
/// so the thread name tells the CLI's records from the snippet's.
fn prefix(colors: &ColoredLevelConfig, record: &Record) -> String {
    format!(
        "{} [{}] {}:{}",
        colors.color(record.level()),
        thread::current().name().unwrap_or("?"),
        record.file().unwrap_or_else(|| record.target()),
        record.line().unwrap_or(0),
    )
}

pub fn install_logger(name: &str) -> Result<(), Error> {
    let colors = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue)
        .trace(Color::BrightBlack);

    fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!("{} {}", prefix(&colors, record), message))
        })
        .level(if cfg!(debug_assertions) {
            log::LevelFilter::Trace
        } else {
            log::LevelFilter::Info
        })
        .chain(fern::log_file(log_file_path(name)?)?)
        .apply()?;

    // A panic on the interpreter thread is reported as `Error: internal
    // error: ...`; the details only go to the log.
    std::panic::set_hook(Box::new(|info| {
        error!("{}", info);
        backtrace();
    }));

    Ok(())
}

/// Frames in our own code. The toolchain's and dependencies' are noise.
fn own_frames(backtrace: &Backtrace) -> Vec<String> {
    let mut frames = Vec::new();
    for (i, frame) in backtrace.frames().iter().enumerate() {
        for symbol in frame.symbols() {
            let filename = match symbol.filename().and_then(|path| path.to_str()) {
                Some(filename) => filename,
                None => continue,
            };
            if filename.contains("/.rustup/")
                || filename.contains("/.cargo/")
                || filename.starts_with("/rustc/")
            {
                continue;
            }

            let function = symbol
                .name()
                .map(|name| name.to_string())
                .unwrap_or_else(|| "?".to_owned());
            frames.push(format!(
                "#{} {} at {}:{}",
                i,
                function,
                filename,
                symbol.lineno().unwrap_or(0)
            ));
        }
    }
    frames
}

/// Logs the current call stack.
pub fn backtrace() {
    for frame in own_frames(&Backtrace::new()) {
        error!("    {}", frame);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Level;

    #[test]
    fn record_prefix() {
        let colors = ColoredLevelConfig::new();
        let line = prefix(
            &colors,
            &Record::builder()
                .level(Level::Warn)
                .file(Some("src/eval.rs"))
                .line(Some(12))
                .build(),
        );
        assert!(line.contains("WARN"));
        assert!(line.contains(&format!("[{}]", thread::current().name().unwrap_or("?"))));
        assert!(line.ends_with(" src/eval.rs:12"));
    }

    #[test]
    fn frames_skip_the_toolchain() {
        let frames = own_frames(&Backtrace::new());
        assert!(frames.iter().all(|frame| !frame.contains("/rustc/")));
        assert!(frames.iter().all(|frame| !frame.contains("/.cargo/")));
    }
}
