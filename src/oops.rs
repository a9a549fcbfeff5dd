use std::io;

/// Program output that cannot be delivered. The snippet keeps running: a
/// reader that went away (`snek ... | head -1`) is not its problem.
pub trait OopsExt {
    /// Logs the error, if any, as a failure to `what`.
    fn oops(self, what: &str);
}

impl<T> OopsExt for io::Result<T> {
    fn oops(self, what: &str) {
        let err = match self {
            Ok(_) => return,
            Err(err) => err,
        };

        if err.kind() == io::ErrorKind::BrokenPipe {
            debug!("failed to {}: stdout is closed", what);
        } else {
            warn!("oops: failed to {}: {}", what, err);
            crate::logger::backtrace();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swallows_errors() {
        Err::<(), _>(io::Error::new(io::ErrorKind::BrokenPipe, "closed")).oops("write output");
        Err::<usize, _>(io::Error::new(io::ErrorKind::Other, "disk full")).oops("flush output");
        Ok::<_, io::Error>(3).oops("write output");
    }
}
