use indexmap::IndexSet;

use crate::cmd;
use crate::error::ReleaseResult;

/// Merge job lines into an existing crontab, preserving first-seen
/// order and dropping duplicates.
#[must_use]
pub fn merge(existing: &str, jobs: &[String]) -> String {
    let mut all: IndexSet<String> = existing
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect();

    for job in jobs {
        all.insert(job.clone());
    }

    all.into_iter().collect::<Vec<_>>().join("\n")
}

/// Install the app's cron jobs into the host crontab.
pub fn install(jobs: &[String]) -> ReleaseResult<()> {
    if jobs.is_empty() {
        return Ok(());
    }

    // `crontab -l` exits non-zero when no crontab exists yet.
    let existing = cmd::run("crontab", &["-l"]).unwrap_or_default();
    let merged = merge(&existing, jobs);
    if merged.is_empty() {
        return Ok(());
    }

    cmd::run_with_stdin("crontab", &["-"], format!("{merged}\n").as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_new_jobs() {
        let merged = merge(
            "0 1 * * * /usr/bin/backup",
            &["0 2 * * * /usr/bin/report".into()],
        );

        assert_eq!(
            merged,
            "0 1 * * * /usr/bin/backup\n0 2 * * * /usr/bin/report"
        );
    }

    #[test]
    fn drops_duplicates_keeping_first_position() {
        let merged = merge(
            "a\nb",
            &["b".into(), "c".into(), "a".into()],
        );

        assert_eq!(merged, "a\nb\nc");
    }

    #[test]
    fn empty_crontab() {
        let merged = merge("", &["a".into()]);

        assert_eq!(merged, "a");
    }

    #[test]
    fn blank_lines_are_ignored() {
        let merged = merge("a\n\n\nb\n", &[]);

        assert_eq!(merged, "a\nb");
    }
}
