use std::ffi::OsString;
use std::path::Path;

use crate::error::Attempt;
use crate::exec::run_checked;

use super::RemoteSource;

/// A subversion remote, optionally pinned to a revision. Shells out to the
/// `svn` binary in non-interactive mode.
pub struct SvnSource {
    url: String,
    revision: Option<String>,
    identity: String,
}

impl SvnSource {
    pub fn new(url: &str, revision: Option<&str>) -> Self {
        Self {
            url: url.to_string(),
            revision: revision.map(str::to_string),
            identity: format!("{url}@{}", revision.unwrap_or("HEAD")),
        }
    }

    fn revision_args(&self, args: &mut Vec<OsString>) {
        if let Some(revision) = &self.revision {
            args.push("--revision".into());
            args.push(revision.into());
        }
    }
}

impl RemoteSource for SvnSource {
    fn identity(&self) -> &str {
        &self.identity
    }

    fn fetch_fresh(&self, dest: &Path) -> Attempt {
        let mut args: Vec<OsString> =
            vec!["checkout".into(), "--non-interactive".into(), "--quiet".into()];
        self.revision_args(&mut args);
        args.push((&self.url).into());
        args.push(dest.into());
        run_checked("svn", &args, None)
    }

    fn pull_latest(&self, dest: &Path) -> Attempt {
        let mut args: Vec<OsString> = vec![
            "update".into(),
            "--non-interactive".into(),
            "--quiet".into(),
            "--accept".into(),
            "theirs-full".into(),
        ];
        self.revision_args(&mut args);
        run_checked("svn", &args, Some(dest))
    }
}
