use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tempo_domain::OutputFormat;

use crate::config::RunConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Stdout,
    File(PathBuf),
}

/// Picks where the result for `inputs[index]` goes. First match wins:
/// JAMS naming, an appended extension, an explicit output, then stdout.
pub fn resolve_destination(input: &Path, index: usize, config: &RunConfig) -> Destination {
    if config.format == OutputFormat::Jams {
        let path = match &config.output_dir {
            Some(dir) => dir.join(file_name(&input.with_extension("jams"))),
            None => input.with_extension("jams"),
        };
        return Destination::File(path);
    }
    if let Some(extension) = &config.extension {
        let path = match &config.output_dir {
            Some(dir) => {
                let mut name = file_name(input);
                name.push(extension);
                dir.join(name)
            }
            None => {
                let mut path = input.as_os_str().to_os_string();
                path.push(extension);
                PathBuf::from(path)
            }
        };
        return Destination::File(path);
    }
    match config.outputs.get(index) {
        Some(path) => Destination::File(path.clone()),
        None => Destination::Stdout,
    }
}

fn file_name(path: &Path) -> OsString {
    path.file_name().map(OsString::from).unwrap_or_default()
}
