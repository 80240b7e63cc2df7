use colored::Colorize;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use trickle_core::StreamObserver;

type Sink = Mutex<Box<dyn Write + Send>>;

/// Types characters to stdout; status and error lines go to stderr so the
/// answer itself can be piped.
pub struct TerminalObserver {
    out: Sink,
    err: Sink,
    mid_line: AtomicBool,
}

impl TerminalObserver {
    pub fn stdio() -> Self {
        Self::with_writers(Box::new(io::stdout()), Box::new(io::stderr()))
    }

    pub fn with_writers(out: Box<dyn Write + Send>, err: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
            err: Mutex::new(err),
            mid_line: AtomicBool::new(false),
        }
    }

    /// Ends a partially typed line, e.g. after a cancelled answer.
    pub fn finish_line(&self) {
        if self.mid_line.swap(false, Ordering::SeqCst) {
            let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
            // The terminal going away is not worth failing the request over.
            let _ = writeln!(out).and_then(|()| out.flush());
        }
    }

    /// Writes a dimmed notice line to stderr.
    pub fn notice(&self, message: &str) {
        self.finish_line();
        let mut err = self.err.lock().unwrap_or_else(PoisonError::into_inner);
        let _ = writeln!(err, "{}", message.dimmed());
    }
}

impl StreamObserver for TerminalObserver {
    fn on_character(&self, ch: char) {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        let _ = write!(out, "{ch}").and_then(|()| out.flush());
        self.mid_line.store(ch != '\n', Ordering::SeqCst);
    }

    fn on_status(&self, message: &str) {
        let mut err = self.err.lock().unwrap_or_else(PoisonError::into_inner);
        let _ = writeln!(err, "{} {}", "…".cyan(), message.italic());
    }

    fn on_complete(&self) {
        self.finish_line();
    }

    fn on_error(&self, message: &str) {
        self.finish_line();
        let mut err = self.err.lock().unwrap_or_else(PoisonError::into_inner);
        let _ = writeln!(err, "{} {}", "error:".red().bold(), message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn observer() -> (TerminalObserver, SharedBuffer, SharedBuffer) {
        let out = SharedBuffer::default();
        let err = SharedBuffer::default();
        let observer = TerminalObserver::with_writers(Box::new(out.clone()), Box::new(err.clone()));
        (observer, out, err)
    }

    #[test]
    fn test_characters_go_to_stdout_and_status_to_stderr() {
        let (observer, out, err) = observer();

        observer.on_status("Searching");
        for ch in "Hi!".chars() {
            observer.on_character(ch);
        }
        observer.on_complete();

        assert_eq!(out.contents(), "Hi!\n");
        assert!(err.contents().contains("Searching"));
    }

    #[test]
    fn test_completion_after_newline_adds_nothing() {
        let (observer, out, _err) = observer();

        observer.on_character('a');
        observer.on_character('\n');
        observer.on_complete();

        assert_eq!(out.contents(), "a\n");
    }

    #[test]
    fn test_error_ends_partial_line() {
        let (observer, out, err) = observer();

        observer.on_character('p');
        observer.on_error("boom");

        assert_eq!(out.contents(), "p\n");
        assert!(err.contents().contains("boom"));
    }

    #[test]
    fn test_finish_line_is_idempotent() {
        let (observer, out, _err) = observer();

        observer.on_character('x');
        observer.finish_line();
        observer.finish_line();

        assert_eq!(out.contents(), "x\n");
    }
}
