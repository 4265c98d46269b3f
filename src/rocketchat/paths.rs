use std::path::{Path, PathBuf};

pub const ROOMS_FILE: &str = "rocketchat_room.json";
pub const USERS_FILE: &str = "users.json";
pub const MESSAGES_FILE: &str = "rocketchat_message.json";
pub const FILES_DIR: &str = "files";

#[derive(Debug, Clone)]
pub struct ExportPaths {
    pub rooms_file: PathBuf,
    pub users_file: PathBuf,
    pub messages_file: PathBuf,
    pub files_dir: PathBuf,
}

impl ExportPaths {
    pub fn attachment(&self, attachment_id: &str) -> PathBuf {
        self.files_dir.join(attachment_id)
    }

    /// Export files that are absent on disk.
    pub fn missing(&self) -> Vec<&Path> {
        [&self.rooms_file, &self.users_file, &self.messages_file]
            .into_iter()
            .filter(|path| !path.is_file())
            .map(PathBuf::as_path)
            .collect()
    }
}

pub fn resolve_paths(inputs: &Path) -> ExportPaths {
    ExportPaths {
        rooms_file: inputs.join(ROOMS_FILE),
        users_file: inputs.join(USERS_FILE),
        messages_file: inputs.join(MESSAGES_FILE),
        files_dir: inputs.join(FILES_DIR),
    }
}

#[cfg(test)]
mod tests {
    use super::resolve_paths;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::tempdir;

    #[test]
    fn attachments_live_under_inputs_files() {
        let paths = resolve_paths(Path::new("/data/export"));
        assert_eq!(
            paths.attachment("u5Ga3vn36LCT9bfhW"),
            PathBuf::from("/data/export/files/u5Ga3vn36LCT9bfhW")
        );
        assert_eq!(
            paths.messages_file,
            PathBuf::from("/data/export/rocketchat_message.json")
        );
    }

    #[test]
    fn missing_lists_absent_export_files() {
        let tmp = tempdir().expect("tempdir");
        fs::write(tmp.path().join("users.json"), "").expect("write users");

        let paths = resolve_paths(tmp.path());
        let missing = paths.missing();
        assert_eq!(missing.len(), 2);
        assert!(missing.iter().all(|p| !p.ends_with("users.json")));
    }
}
