//! Interactive first-run setup.
//!
//! Asks for every setting with the current value as default, insists on the
//! three credentials, and leaves persisting the result to the caller.

use std::io::{self, BufRead, Write};
use std::str::FromStr;

use spark_common::ModelVersion;
use spark_config::SparkConfig;

/// Prompt for credentials and model settings, updating `config` in place.
pub fn run<R: BufRead, W: Write>(
    config: &mut SparkConfig,
    input: &mut R,
    output: &mut W,
) -> io::Result<()> {
    let mut prompter = Prompter { input, output };

    prompter.credentials(config)?;

    let versions: Vec<&str> = ModelVersion::ALL.iter().map(|v| v.as_str()).collect();
    config.model.version = prompter.parsed(
        &format!("Model version ({})", versions.join(", ")),
        config.model.version,
        |_| true,
    )?;
    config.model.temperature = prompter.parsed(
        "Sampling temperature (0.0 - 1.0)",
        config.model.temperature,
        |t| (0.0..=1.0).contains(t),
    )?;
    config.model.max_tokens = prompter.parsed(
        "Maximum reply tokens (1 - 8192)",
        config.model.max_tokens,
        |n| (1..=8192).contains(n),
    )?;
    config.model.top_k = prompter.parsed("Top k (1 - 6)", config.model.top_k, |k| {
        (1..=6).contains(k)
    })?;

    while !config.credentials.is_complete() {
        writeln!(
            prompter.output,
            "'app_id', 'api_key' and 'api_secret' must all be set. Please type again."
        )?;
        prompter.credentials(config)?;
    }
    Ok(())
}

struct Prompter<'a, R, W> {
    input: &'a mut R,
    output: &'a mut W,
}

impl<R: BufRead, W: Write> Prompter<'_, R, W> {
    fn credentials(&mut self, config: &mut SparkConfig) -> io::Result<()> {
        let creds = &mut config.credentials;
        creds.app_id = self.text("The APPID for the Spark API", &creds.app_id, false)?;
        creds.api_key = self.text("The API key for authentication", &creds.api_key, true)?;
        creds.api_secret = self.text(
            "The API secret used to sign requests",
            &creds.api_secret,
            true,
        )?;
        Ok(())
    }

    /// Ask once; an empty answer keeps `current`. Secrets are never echoed.
    fn text(&mut self, label: &str, current: &str, secret: bool) -> io::Result<String> {
        let shown = match (current.is_empty(), secret) {
            (true, _) => String::new(),
            (false, true) => " [keep current]".to_string(),
            (false, false) => format!(" [{current}]"),
        };
        write!(self.output, "{label}{shown}: ")?;
        self.output.flush()?;

        let answer = self.line()?;
        if answer.is_empty() {
            Ok(current.to_string())
        } else {
            Ok(answer)
        }
    }

    /// Ask until the answer parses and passes `accept`.
    fn parsed<T>(
        &mut self,
        label: &str,
        current: T,
        accept: impl Fn(&T) -> bool,
    ) -> io::Result<T>
    where
        T: FromStr + std::fmt::Display + Copy,
    {
        loop {
            write!(self.output, "{label} [{current}]: ")?;
            self.output.flush()?;

            let answer = self.line()?;
            if answer.is_empty() {
                return Ok(current);
            }
            match answer.parse::<T>() {
                Ok(value) if accept(&value) => return Ok(value),
                _ => writeln!(self.output, "Invalid value '{answer}'.")?,
            }
        }
    }

    fn line(&mut self) -> io::Result<String> {
        let mut buf = String::new();
        if self.input.read_line(&mut buf)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "setup aborted: input closed",
            ));
        }
        Ok(buf.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn run_with(config: &mut SparkConfig, answers: &str) -> (io::Result<()>, String) {
        let mut input = Cursor::new(answers.as_bytes().to_vec());
        let mut output = Vec::new();
        let result = run(config, &mut input, &mut output);
        (result, String::from_utf8(output).unwrap())
    }

    #[test]
    fn fills_config_from_answers() {
        let mut config = SparkConfig::default();
        let (result, _) = run_with(&mut config, "app\nkey\nsecret\n3.5\n0.8\n2048\n3\n");
        result.unwrap();

        assert_eq!(config.credentials.app_id, "app");
        assert_eq!(config.credentials.api_key, "key");
        assert_eq!(config.credentials.api_secret, "secret");
        assert_eq!(config.model.version, ModelVersion::V3_5);
        assert_eq!(config.model.temperature, 0.8);
        assert_eq!(config.model.max_tokens, 2048);
        assert_eq!(config.model.top_k, 3);
    }

    #[test]
    fn empty_answers_keep_current_values() {
        let mut config = SparkConfig::default();
        config.credentials.app_id = "app".into();
        config.credentials.api_key = "key".into();
        config.credentials.api_secret = "s3cr3t-value".into();

        let (result, output) = run_with(&mut config, "\n\n\n\n\n\n\n");
        result.unwrap();
        assert_eq!(config.credentials.api_secret, "s3cr3t-value");
        assert_eq!(config.model.version, ModelVersion::V3_0);
        assert!(output.contains("[app]"));
        assert!(!output.contains("s3cr3t"));
    }

    #[test]
    fn re_asks_for_invalid_values() {
        let mut config = SparkConfig::default();
        let (result, output) =
            run_with(&mut config, "app\nkey\nsecret\n4.0\n3.0\n1.5\n0.2\n\n9\n6\n");
        result.unwrap();
        assert_eq!(output.matches("Invalid value").count(), 3);
        assert_eq!(config.model.version, ModelVersion::V3_0);
        assert_eq!(config.model.temperature, 0.2);
        assert_eq!(config.model.top_k, 6);
    }

    #[test]
    fn insists_on_credentials() {
        let mut config = SparkConfig::default();
        let (result, output) = run_with(&mut config, "app\n\n\n\n\n\n\napp\nkey\nsecret\n");
        result.unwrap();
        assert!(output.contains("must all be set"));
        assert!(config.credentials.is_complete());
    }

    #[test]
    fn closed_input_aborts() {
        let mut config = SparkConfig::default();
        let (result, _) = run_with(&mut config, "app\n");
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::UnexpectedEof);
    }
}
