use std::{fs, io::Write, path::Path};

/// Replace `path` with `bytes` so readers never observe a partial file:
/// write a sibling temp file, fsync it, then rename over the target.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = path.with_extension("new");
    {
        let mut f = fs::File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    fs::rename(tmp, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_existing_file_and_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, b"old").unwrap();
        write_atomic(&path, br#"{"position":42}"#).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), r#"{"position":42}"#);
        assert!(!path.with_extension("new").exists());
    }
}
