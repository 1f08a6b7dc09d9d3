use std::io::{self, BufRead, Write};
use std::thread;
use std::time::Duration;

use cogex_core::{Error, KeyChoice, Result, StimulusPair, Trial};
use cogex_experiment::{ExperimentConfig, Presenter};

const CLEAR: &str = "\x1b[2J\x1b[H";
const QUIT_KEY: char = 'q';
const GAP: &str = "          ";

/// Terminal stand-in for the display: fixation cross, two bars for the
/// exposure time, then a blank screen until one of the two keys is entered.
pub struct ConsolePresenter<R: BufRead, W: Write> {
    input: R,
    output: W,
    fixation: Duration,
    exposure: Duration,
    left_key: char,
    right_key: char,
    /// Pixels per drawn character.
    px_per_char: f64,
}

impl<R: BufRead, W: Write> ConsolePresenter<R, W> {
    pub fn new(config: &ExperimentConfig, input: R, output: W) -> Self {
        Self {
            input,
            output,
            fixation: Duration::from_millis(config.fixation_ms),
            exposure: Duration::from_millis(config.exposure_ms),
            left_key: config.left_key.to_ascii_lowercase(),
            right_key: config.right_key.to_ascii_lowercase(),
            px_per_char: 5.0,
        }
    }

    pub fn instructions(&mut self) -> Result<()> {
        write!(
            self.output,
            "{CLEAR}{} = Left is Longer\n{} = Right is Longer\n\nPress Enter to start ({QUIT_KEY} quits).\n",
            self.left_key.to_ascii_uppercase(),
            self.right_key.to_ascii_uppercase(),
        )?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(closed());
        }
        Ok(())
    }

    fn bar(&self, length_px: f64) -> String {
        let chars = (length_px / self.px_per_char).round().max(1.0) as usize;
        "━".repeat(chars)
    }

    fn draw(&mut self, pair: StimulusPair) -> io::Result<()> {
        let left = self.bar(pair.left);
        let right = self.bar(pair.right);
        let width = left.chars().count().max(right.chars().count());
        write!(
            self.output,
            "{CLEAR}\n\n{left:>width$}{GAP}{right:<width$}\n",
        )?;
        self.output.flush()
    }

    fn wait_for_key(&mut self) -> Result<KeyChoice> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.input.read_line(&mut line)? == 0 {
                return Err(closed());
            }
            match line.trim().chars().next().map(|c| c.to_ascii_lowercase()) {
                Some(c) if c == self.left_key => return Ok(KeyChoice::LeftKey),
                Some(c) if c == self.right_key => return Ok(KeyChoice::RightKey),
                Some(QUIT_KEY) => {
                    return Err(Error::Io(io::Error::new(
                        io::ErrorKind::Interrupted,
                        "session aborted by participant",
                    )));
                }
                _ => continue,
            }
        }
    }
}

fn closed() -> Error {
    Error::Io(io::Error::new(io::ErrorKind::UnexpectedEof, "input closed"))
}

impl<R: BufRead, W: Write> Presenter for ConsolePresenter<R, W> {
    fn present(&mut self, _trial: &Trial, pair: StimulusPair) -> Result<KeyChoice> {
        write!(self.output, "{CLEAR}\n\n{:>width$}\n", "+", width = 20)?;
        self.output.flush()?;
        thread::sleep(self.fixation);

        self.draw(pair)?;
        thread::sleep(self.exposure);

        write!(self.output, "{CLEAR}")?;
        self.output.flush()?;
        self.wait_for_key()
    }
}
