use failure::Error;
use std::fs::create_dir_all;
use std::path::PathBuf;

/// `~/.snek`
pub fn snek_dir() -> Result<PathBuf, Error> {
    let dir = ::dirs::home_dir()
        .ok_or_else(|| format_err!("where's your home dir?"))?
        .join(".snek");

    create_dir_all(&dir)?;
    Ok(dir)
}

/// `~/.snek/log/<name>.log`
pub fn log_file_path(name: &str) -> Result<PathBuf, Error> {
    let log_dir = snek_dir()?.join("log");
    create_dir_all(&log_dir)?;
    Ok(log_dir.join(&format!("{}.log", name)))
}
