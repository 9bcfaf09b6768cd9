// Writing of the JSON fixtures.

use std::fs::{self, File};
use std::io::Write;

use crate::pipeline::{io_common::simplify_file_name, *};

pub fn to_pretty(js: &JSValue, name: &str) -> PipelineResult<String> {
    serde_json::to_string_pretty(js).context(SerializingJsonSnafu { name })
}

/// Removes a temporary file on drop unless disarmed.
struct TempFileGuard {
    path: PathBuf,
    armed: bool,
}

impl TempFileGuard {
    fn new(path: PathBuf) -> TempFileGuard {
        TempFileGuard { path, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = fs::remove_file(&self.path) {
                debug!("TempFileGuard: could not remove {:?}: {}", self.path, e);
            }
        }
    }
}

/// Writes the fixture in `dir`. The file name may contain subdirectories;
/// missing directories are created.
///
/// The content goes to a temporary file next to the target, which is then
/// renamed over it. The temporary file is removed if any step fails.
pub fn write_fixture(dir: &Path, fixture: &Fixture) -> PipelineResult<PathBuf> {
    let target = dir.join(&fixture.file_name);
    let target_s = target.display().to_string();
    let mut pretty = to_pretty(&fixture.content, &fixture.file_name)?;
    pretty.push('\n');

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).context(WritingOutputSnafu {
            path: parent.display().to_string(),
        })?;
    }
    let tmp = target.with_file_name(format!(".{}.tmp", simplify_file_name(&target)));
    let tmp_s = tmp.display().to_string();
    let mut guard = TempFileGuard::new(tmp.clone());
    {
        let mut f = File::create(&tmp).context(WritingOutputSnafu { path: tmp_s.clone() })?;
        f.write_all(pretty.as_bytes())
            .context(WritingOutputSnafu { path: tmp_s.clone() })?;
        f.sync_all().context(WritingOutputSnafu { path: tmp_s })?;
    }
    fs::rename(&tmp, &target).context(WritingOutputSnafu {
        path: target_s.clone(),
    })?;
    guard.disarm();
    info!("write_fixture: wrote {:?} ({} bytes)", target_s, pretty.len());
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parent_directories_are_created() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("docs").join("data");
        let f = Fixture {
            file_name: "viz1_data.json".to_string(),
            content: json!({"b": [1, 2], "a": null}),
        };
        let p = write_fixture(&nested, &f).unwrap();
        assert_eq!(p, nested.join("viz1_data.json"));
        let s = fs::read_to_string(&p).unwrap();
        // Keys are sorted.
        assert!(s.find("\"a\"").unwrap() < s.find("\"b\"").unwrap());
        assert!(s.ends_with("}\n"));
        assert!(!nested.join(".viz1_data.json.tmp").exists());
    }

    #[test]
    fn existing_files_are_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let f = Fixture {
            file_name: "out.json".to_string(),
            content: json!({"v": 1}),
        };
        write_fixture(dir.path(), &f).unwrap();
        let f2 = Fixture {
            content: json!({"v": 2}),
            ..f
        };
        let p = write_fixture(dir.path(), &f2).unwrap();
        let js: JSValue = serde_json::from_str(&fs::read_to_string(p).unwrap()).unwrap();
        assert_eq!(js["v"], 2);
    }

    #[test]
    fn file_names_may_hold_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        let f = Fixture {
            file_name: "charts/viz1_data.json".to_string(),
            content: json!({"v": 1}),
        };
        let p = write_fixture(dir.path(), &f).unwrap();
        assert_eq!(p, dir.path().join("charts").join("viz1_data.json"));
        assert!(p.is_file());
        assert!(!dir.path().join("charts").join(".viz1_data.json.tmp").exists());
    }

    #[test]
    fn failed_rename_leaves_no_temporary_file() {
        let dir = tempfile::tempdir().unwrap();
        // A non-empty directory where the file should go.
        let blocked = dir.path().join("out.json");
        fs::create_dir_all(blocked.join("inner")).unwrap();
        let f = Fixture {
            file_name: "out.json".to_string(),
            content: json!({"v": 1}),
        };
        let res = write_fixture(dir.path(), &f);
        assert!(matches!(res, Err(PipelineError::WritingOutput { .. })));
        assert!(!dir.path().join(".out.json.tmp").exists());
    }
}
