use std::path::{Path, PathBuf};
use std::process::Command;
use anyhow::{Result, Context, anyhow};

use crate::utils::config::ToolPaths;
use crate::utils::process::tool_responds;
use crate::vector::{TraceParams, Vectorizer};

pub struct Potrace {
    program: PathBuf,
}

impl Potrace {
    pub fn new(tools: &ToolPaths) -> Self {
        Self {
            program: tools.potrace.clone(),
        }
    }

    fn command(&self, raster: &Path, output: &Path, params: &TraceParams) -> Command {
        // potrace <bmp> -s -W <w>pt -H <h>pt [--flat] --opttolerance <t> --turnpolicy <p> -o <svg>
        let mut cmd = Command::new(&self.program);
        cmd.arg(raster)
            .arg("-s")
            .arg("-W")
            .arg(format!("{}pt", params.target_width))
            .arg("-H")
            .arg(format!("{}pt", params.target_height));
        if params.flat {
            cmd.arg("--flat");
        }
        cmd.arg("--opttolerance")
            .arg(params.opt_tolerance.to_string())
            .arg("--turnpolicy")
            .arg(params.turn_policy.to_string())
            .arg("-o")
            .arg(output);
        cmd
    }
}

impl Vectorizer for Potrace {
    fn missing_tools(&self) -> Vec<String> {
        if tool_responds(&self.program, "--version") {
            Vec::new()
        } else {
            vec!["potrace".to_string()]
        }
    }

    fn trace(&self, raster: &Path, output: &Path, params: &TraceParams) -> Result<()> {
        let out = self
            .command(raster, output, params)
            .output()
            .context("Failed to execute potrace. Is it installed?")?;

        if !out.status.success() {
            return Err(anyhow!(
                "potrace exited with {}: {}",
                out.status,
                String::from_utf8_lossy(&out.stderr).trim()
            ));
        }
        Ok(())
    }
}
