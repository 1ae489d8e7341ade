use anyhow::{Context, Result};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::config::ConvertOptions;
use crate::docx::write_docx;
use crate::image::ImageLoader;
use crate::markdown::render;
use crate::source::read_markdown;
use crate::translate::translate;

/// Which side of a conversion failed, attached as error context.
#[derive(Debug)]
enum Stage {
    Read(PathBuf),
    Write(PathBuf),
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Read(p) => write!(f, "cannot read {}", p.display()),
            Stage::Write(p) => write!(f, "cannot write {}", p.display()),
        }
    }
}

/// Converts one Markdown file. Without `output` the `.docx` lands beside the
/// input with the same base name.
pub fn convert_file(input: &Path, output: Option<&Path>, opts: &ConvertOptions) -> Result<PathBuf> {
    let out_path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| input.with_extension("docx"));
    info!("converting {} -> {}", input.display(), out_path.display());

    let md = read_markdown(input).context(Stage::Read(input.to_path_buf()))?;
    let html = render(&md);
    let base_dir = input
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let images = ImageLoader::new(base_dir, opts);
    let doc = translate(&html, &images);

    write_docx(&out_path, &doc).context(Stage::Write(out_path.clone()))?;
    info!(
        "wrote {} ({} blocks)",
        out_path.display(),
        doc.blocks.len()
    );
    Ok(out_path)
}

#[derive(Debug)]
pub struct Outcome {
    pub input: PathBuf,
    pub result: std::result::Result<PathBuf, String>,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<Outcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&Path, &str)> {
        self.outcomes.iter().filter_map(|o| match &o.result {
            Ok(_) => None,
            Err(msg) => Some((o.input.as_path(), msg.as_str())),
        })
    }

    /// 0 when everything converted, 2 on partial failure, 1 when nothing did.
    pub fn exit_code(&self) -> i32 {
        let ok = self.succeeded();
        if ok == self.outcomes.len() {
            0
        } else if ok > 0 {
            2
        } else {
            1
        }
    }
}

/// Converts every input in order. A failure is recorded and the loop moves
/// on. `on_done` sees each outcome as soon as it is known.
pub fn run_batch<F>(
    inputs: &[PathBuf],
    output: Option<&Path>,
    opts: &ConvertOptions,
    mut on_done: F,
) -> BatchReport
where
    F: FnMut(&Outcome),
{
    let mut report = BatchReport::default();
    for input in inputs {
        let result = convert_file(input, output, opts).map_err(|e| {
            error!("{}: {e:#}", input.display());
            describe_error(&e)
        });
        let outcome = Outcome {
            input: input.clone(),
            result,
        };
        on_done(&outcome);
        report.outcomes.push(outcome);
    }
    report
}

/// Short user-facing cause for a failed conversion.
pub fn describe_error(err: &anyhow::Error) -> String {
    let io_kind = err
        .chain()
        .find_map(|e| e.downcast_ref::<io::Error>())
        .map(io::Error::kind);
    match (err.downcast_ref::<Stage>(), io_kind) {
        (Some(Stage::Write(out)), Some(io::ErrorKind::NotFound)) => {
            format!("cannot write {}: folder does not exist", out.display())
        }
        (Some(Stage::Write(out)), Some(io::ErrorKind::PermissionDenied)) => format!(
            "cannot write {}: permission denied; is the file open in another program?",
            out.display()
        ),
        (Some(Stage::Write(out)), _) => {
            format!("cannot write {}: {}", out.display(), err.root_cause())
        }
        (Some(Stage::Read(input)), Some(io::ErrorKind::NotFound)) => {
            format!("file not found: {}", input.display())
        }
        (Some(Stage::Read(input)), Some(io::ErrorKind::PermissionDenied)) => {
            format!("permission denied: {}", input.display())
        }
        _ => format!("{err:#}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn outcome(ok: bool) -> Outcome {
        Outcome {
            input: PathBuf::from("x.md"),
            result: if ok {
                Ok(PathBuf::from("x.docx"))
            } else {
                Err("boom".into())
            },
        }
    }

    #[test]
    fn exit_codes() {
        let report = |oks: &[bool]| BatchReport {
            outcomes: oks.iter().map(|&ok| outcome(ok)).collect(),
        };
        assert_eq!(report(&[true, true]).exit_code(), 0);
        assert_eq!(report(&[true, false]).exit_code(), 2);
        assert_eq!(report(&[false, false]).exit_code(), 1);
    }

    #[test]
    fn missing_input_is_reported_as_not_found() {
        let err = convert_file(Path::new("/no/such/input.md"), None, &ConvertOptions::default())
            .unwrap_err();
        assert_eq!(describe_error(&err), "file not found: /no/such/input.md");
    }

    #[test]
    fn output_defaults_to_sibling_docx() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("notes.md");
        fs::write(&input, "# Notes\n\nbody\n").unwrap();

        let out = convert_file(&input, None, &ConvertOptions::default()).unwrap();
        assert_eq!(out, dir.path().join("notes.docx"));
        assert!(out.is_file());
    }

    #[test]
    fn explicit_output_path_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("a.md");
        let target = dir.path().join("custom.docx");
        fs::write(&input, "text\n").unwrap();

        let out = convert_file(&input, Some(&target), &ConvertOptions::default()).unwrap();
        assert_eq!(out, target);
        assert!(target.is_file());
        assert!(!dir.path().join("a.docx").exists());
    }

    #[test]
    fn unwritable_destination_fails_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("a.md");
        fs::write(&input, "text\n").unwrap();
        let target = dir.path().join("missing-dir").join("a.docx");

        let err = convert_file(&input, Some(&target), &ConvertOptions::default()).unwrap_err();
        let cause = describe_error(&err);
        assert!(cause.starts_with(&format!("cannot write {}", target.display())), "{cause}");
        assert!(!cause.contains("file not found"), "{cause}");
    }
}
