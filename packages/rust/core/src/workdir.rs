//! Local working directories.

use std::path::Path;

use tracing::debug;

use payslip_shared::{PayslipError, Result};

/// Create `dir` (and parents) if missing.
pub fn prepare_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| PayslipError::io(dir, e))
}

/// Remove everything under `dir`, leaving it empty.
pub fn clean_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        std::fs::remove_dir_all(dir).map_err(|e| PayslipError::io(dir, e))?;
        debug!(path = %dir.display(), "directory cleaned");
    }
    prepare_dir(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::temp_dir;

    #[test]
    fn clean_dir_empties_and_recreates() {
        let tmp = temp_dir("payslip-workdir-test");
        let dir = tmp.join("out");
        std::fs::create_dir_all(dir.join("nested")).unwrap();
        std::fs::write(dir.join("old.pdf"), "x").unwrap();

        clean_dir(&dir).unwrap();
        assert!(dir.is_dir());
        assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 0);

        let fresh = tmp.join("fresh");
        clean_dir(&fresh).unwrap();
        assert!(fresh.is_dir());

        let _ = std::fs::remove_dir_all(&tmp);
    }
}
