//! Worker launch specification.

use std::ffi::OsString;
use std::path::PathBuf;

/// Runtime flags passed to every worker before any user-supplied arguments.
pub const FIXED_RUNTIME_FLAGS: &[&str] = &["-Dfile.encoding=UTF-8"];

/// Immutable description of how to start the worker, captured at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    /// Runtime binary (e.g. `java`).
    pub program: PathBuf,
    /// Maximum heap size hint (`-Xmx`).
    pub heap: Option<String>,
    /// Initial heap size hint (`-Xms`).
    pub initial_heap: Option<String>,
    /// Extra runtime arguments, in the order given.
    pub runtime_args: Vec<String>,
    /// Artifact the worker is launched from.
    pub artifact: PathBuf,
    /// Arguments forwarded verbatim to the worker.
    pub worker_args: Vec<String>,
}

impl LaunchSpec {
    /// Arguments to pass to [`LaunchSpec::program`], in launch order.
    pub fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = FIXED_RUNTIME_FLAGS.iter().map(OsString::from).collect();
        if let Some(heap) = &self.heap {
            args.push(format!("-Xmx{heap}").into());
        }
        if let Some(initial_heap) = &self.initial_heap {
            args.push(format!("-Xms{initial_heap}").into());
        }
        args.extend(self.runtime_args.iter().map(OsString::from));
        args.push("-jar".into());
        args.push(self.artifact.clone().into_os_string());
        args.extend(self.worker_args.iter().map(OsString::from));
        args
    }

    /// Full command line as a display string, for logs.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args().iter().map(|a| a.to_string_lossy().into_owned()));
        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> LaunchSpec {
        LaunchSpec {
            program: PathBuf::from("java"),
            heap: None,
            initial_heap: None,
            runtime_args: Vec::new(),
            artifact: PathBuf::from("PolyBot.jar"),
            worker_args: Vec::new(),
        }
    }

    #[test]
    fn minimal_spec_runs_the_jar() {
        let args = spec().args();
        assert_eq!(args, vec!["-Dfile.encoding=UTF-8", "-jar", "PolyBot.jar"]);
    }

    #[test]
    fn args_are_ordered_flags_heap_runtime_jar_worker() {
        let spec = LaunchSpec {
            heap: Some("2G".to_string()),
            initial_heap: Some("512M".to_string()),
            runtime_args: vec!["-XX:+UseG1GC".to_string(), "-Dbot.env=prod".to_string()],
            worker_args: vec!["--token".to_string(), "abc".to_string()],
            ..spec()
        };

        assert_eq!(
            spec.args(),
            vec![
                "-Dfile.encoding=UTF-8",
                "-Xmx2G",
                "-Xms512M",
                "-XX:+UseG1GC",
                "-Dbot.env=prod",
                "-jar",
                "PolyBot.jar",
                "--token",
                "abc",
            ]
        );
    }

    #[test]
    fn display_command_starts_with_program() {
        let display = spec().display_command();
        assert_eq!(display, "java -Dfile.encoding=UTF-8 -jar PolyBot.jar");
    }
}
