//! External converters

use std::path::{Path, PathBuf};
use std::process::Command;

use super::config::ConverterConfig;
use super::error::ConvertError;

/// Programs that turn acquisition files into mzML
pub trait ConversionTool: Send + Sync {
    /// Convert an open-format file (mzML, mzXML, mzData) into mzML at `output`
    fn convert(&self, input: &Path, output: &Path) -> Result<(), ConvertError>;

    /// Decode a vendor binary (`.raw`, `.d`, `.wiff`) into mzML at `output`
    fn decode_raw(&self, input: &Path, output: &Path) -> Result<(), ConvertError>;
}

/// `msconvert` and `ThermoRawFileParser` run as child processes
#[derive(Debug, Clone, Default)]
pub struct ExternalTools {
    config: ConverterConfig,
}

impl ExternalTools {
    /// Tools configured by `config`
    pub fn new(config: ConverterConfig) -> Self {
        Self { config }
    }
}

fn run(mut command: Command, tool: &Path, input: &Path, output: &Path) -> Result<(), ConvertError> {
    let tool_name = tool.display().to_string();
    log::debug!("Running {command:?}");
    let result = command.output().map_err(|source| ConvertError::ToolLaunch {
        tool: tool_name.clone(),
        source,
    })?;

    if !result.status.success() {
        let stderr = String::from_utf8_lossy(&result.stderr).trim().to_string();
        let reason = if stderr.is_empty() {
            format!("exit status {}", result.status)
        } else {
            stderr
        };
        return Err(ConvertError::ToolFailed {
            tool: tool_name,
            input: input.to_path_buf(),
            reason,
        });
    }
    if !output.is_file() {
        return Err(ConvertError::ToolFailed {
            tool: tool_name,
            input: input.to_path_buf(),
            reason: format!("no output at {}", output.display()),
        });
    }
    Ok(())
}

fn split_output(output: &Path) -> (PathBuf, String) {
    let dir = output
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    (dir, name)
}

impl ConversionTool for ExternalTools {
    fn convert(&self, input: &Path, output: &Path) -> Result<(), ConvertError> {
        let (dir, name) = split_output(output);
        let mut command = Command::new(&self.config.converter);
        command
            .arg(input)
            .args(&self.config.converter_args)
            .arg("-o")
            .arg(&dir)
            .arg("--outfile")
            .arg(&name);
        run(command, &self.config.converter, input, output)
    }

    fn decode_raw(&self, input: &Path, output: &Path) -> Result<(), ConvertError> {
        let mut command = Command::new(&self.config.raw_decoder);
        command
            .arg(format!("-i={}", input.display()))
            .arg(format!("-b={}", output.display()))
            .args(&self.config.raw_decoder_args);
        run(command, &self.config.raw_decoder, input, output)
    }
}

/// Tool that copies open-format input unchanged and cannot decode vendor files
///
/// Useful where no external converter is installed and inputs are already mzML.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughTool;

impl ConversionTool for PassthroughTool {
    fn convert(&self, input: &Path, output: &Path) -> Result<(), ConvertError> {
        std::fs::copy(input, output)?;
        Ok(())
    }

    fn decode_raw(&self, input: &Path, _output: &Path) -> Result<(), ConvertError> {
        Err(ConvertError::ToolFailed {
            tool: "passthrough".to_string(),
            input: input.to_path_buf(),
            reason: "vendor formats need an external decoder".to_string(),
        })
    }
}
